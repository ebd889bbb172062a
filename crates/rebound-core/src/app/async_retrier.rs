//! AsyncRetrier - tokio 上で動く Retrier
//!
//! 同期版との違いは待機だけ：
//! - `tokio::time::sleep` で待つ（スレッドを止めない）
//! - `watch::Receiver<bool>` が true になったら待機を打ち切る
//!
//! 打ち切られた場合も、最後に起きたエラーをそのまま返す（ラップしない）。

use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::Instrument;

use super::sequence::{NO_ARGS, Sequence, Step, describe_args};
use crate::domain::{Classify, RetryPolicy};
use crate::ports::{LogSink, StdoutSink};

/// AsyncRetrier は非同期 operation をリトライ付きで実行する
///
/// # 使用例
/// ```ignore
/// let (cancel_tx, cancel_rx) = watch::channel(false);
/// let fetch = AsyncRetrier::new("fetch", policy, |url: &String| {
///     let url = url.clone();
///     async move { client.get(&url).await }
/// })
/// .with_cancellation(cancel_rx);
///
/// // 別タスクから: cancel_tx.send(true) で待機中のリトライを止める
/// let body = fetch.invoke("http://localhost/menu".to_string()).await?;
/// ```
pub struct AsyncRetrier<F, K: Eq + Hash> {
    name: String,
    policy: RetryPolicy<K>,
    operation: F,
    sink: Arc<dyn LogSink>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl<F, K: Copy + Eq + Hash + Debug> AsyncRetrier<F, K> {
    pub fn new(name: impl Into<String>, policy: RetryPolicy<K>, operation: F) -> Self {
        Self {
            name: name.into(),
            policy,
            operation,
            sink: Arc::new(StdoutSink),
            cancel_rx: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Interrupts the delay between attempts once the channel holds `true`.
    ///
    /// An attempt that is already running is never interrupted.
    pub fn with_cancellation(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RetryPolicy<K> {
        &self.policy
    }

    pub async fn invoke<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        F: Fn(&A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        A: Debug,
        E: Classify<Kind = K> + Display,
    {
        let rendered = describe_args(&args);
        self.run(&rendered, || (self.operation)(&args)).await
    }

    pub async fn call<T, E, Fut>(&self) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify<Kind = K> + Display,
    {
        self.run(NO_ARGS, || (self.operation)()).await
    }

    async fn run<T, E, Fut>(&self, args: &str, attempt: impl Fn() -> Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Classify<Kind = K> + Display,
    {
        let mut seq = Sequence::new(&self.name, &self.policy, self.sink.as_ref(), args);
        let span = tracing::debug_span!("retry", function = %self.name, sequence = %seq.id());

        async move {
            loop {
                seq.begin_attempt();
                let error = match attempt().await {
                    Ok(value) => {
                        tracing::debug!(attempt = seq.attempt(), "operation succeeded");
                        return Ok(value);
                    }
                    Err(error) => error,
                };
                // cancelled while the attempt ran: skip the retry message
                if self.is_cancelled() && seq.would_retry(&error) {
                    seq.cancelled(seq.attempt());
                    return Err(error);
                }
                match seq.on_error(&error) {
                    Step::Retry(delay) => {
                        if !self.wait(delay).await {
                            seq.cancelled(seq.attempt() - 1);
                            return Err(error);
                        }
                    }
                    Step::Propagate => return Err(error),
                }
            }
        }
        .instrument(span)
        .await
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Returns `false` if the wait was cancelled.
    async fn wait(&self, delay: Duration) -> bool {
        let Some(cancel_rx) = &self.cancel_rx else {
            tokio::time::sleep(delay).await;
            return true;
        };

        let mut rx = cancel_rx.clone();
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            if *rx.borrow_and_update() {
                return false;
            }
            tokio::select! {
                _ = &mut sleep => return true,
                changed = rx.changed() => {
                    if changed.is_err() {
                        // sender dropped: nobody can cancel any more
                        (&mut sleep).await;
                        return true;
                    }
                }
            }
        }
    }
}
