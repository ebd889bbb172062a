//! Retrier - 失敗した呼び出しを指数バックオフで再実行する
//!
//! # フロー
//! 1. "{n}. try:" をシンクに書く
//! 2. operation を呼ぶ → 成功ならそのまま返す
//! 3. リトライ対象外のエラー → そのまま返す（待機もログもなし）
//! 4. リトライ対象で試行が残っている → メッセージを書き、待機して 1 に戻る
//! 5. 最後の試行でも失敗 → 失敗メッセージを書き、元のエラーをそのまま返す

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;

use super::sequence::{NO_ARGS, Sequence, Step, describe_args};
use crate::domain::{Classify, RetryPolicy};
use crate::ports::{LogSink, Sleeper, StdoutSink, ThreadSleeper};

/// Retrier は operation をラップしてリトライ付きで実行する
///
/// # 使用例
/// ```ignore
/// let policy = RetryPolicy::builder(RetryOn::only([ErrorKind::ConnectionRefused]))
///     .max_attempts(3)
///     .build()?;
/// let fetch = Retrier::new("fetch", policy, |url: &String| get(url));
/// let body = fetch.invoke("http://localhost/menu".to_string())?;
/// ```
///
/// # Thread Safety
/// `invoke` は `&self` なので `Arc<Retrier<..>>` を複数スレッドで共有できる。
/// 呼び出しごとに独立した試行列になり、カウンタは共有しない。
pub struct Retrier<F, K: Eq + Hash> {
    name: String,
    policy: RetryPolicy<K>,
    operation: F,
    sink: Arc<dyn LogSink>,
    sleeper: Arc<dyn Sleeper>,
}

impl<F, K: Copy + Eq + Hash + Debug> Retrier<F, K> {
    /// Logs to stdout and blocks the calling thread between attempts.
    pub fn new(name: impl Into<String>, policy: RetryPolicy<K>, operation: F) -> Self {
        Self {
            name: name.into(),
            policy,
            operation,
            sink: Arc::new(StdoutSink),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RetryPolicy<K> {
        &self.policy
    }

    /// Runs the operation with `args`, retrying qualifying failures.
    pub fn invoke<A, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(&A) -> Result<T, E>,
        A: Debug,
        E: Classify<Kind = K> + Display,
    {
        let rendered = describe_args(&args);
        self.run(&rendered, || (self.operation)(&args))
    }

    /// Zero-argument form of [`Retrier::invoke`].
    pub fn call<T, E>(&self) -> Result<T, E>
    where
        F: Fn() -> Result<T, E>,
        E: Classify<Kind = K> + Display,
    {
        self.run(NO_ARGS, || (self.operation)())
    }

    fn run<T, E>(&self, args: &str, mut attempt: impl FnMut() -> Result<T, E>) -> Result<T, E>
    where
        E: Classify<Kind = K> + Display,
    {
        let mut seq = Sequence::new(&self.name, &self.policy, self.sink.as_ref(), args);
        let span = tracing::debug_span!("retry", function = %self.name, sequence = %seq.id());
        let _enter = span.enter();

        loop {
            seq.begin_attempt();
            let error = match attempt() {
                Ok(value) => {
                    tracing::debug!(attempt = seq.attempt(), "operation succeeded");
                    return Ok(value);
                }
                Err(error) => error,
            };
            match seq.on_error(&error) {
                Step::Retry(delay) => self.sleeper.sleep(delay),
                Step::Propagate => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApiError, RetryOn};
    use crate::ports::{MemorySink, RecordingSleeper, SinkError};
    use rstest::rstest;
    use std::io::{self, ErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Harness {
        sink: Arc<MemorySink>,
        sleeper: Arc<RecordingSleeper>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                sink: Arc::new(MemorySink::new()),
                sleeper: Arc::new(RecordingSleeper::new()),
            }
        }

        fn wrap<F, K: Copy + Eq + Hash + Debug>(
            &self,
            policy: RetryPolicy<K>,
            operation: F,
        ) -> Retrier<F, K> {
            Retrier::new("fetch_menu", policy, operation)
                .with_sink(self.sink.clone())
                .with_sleeper(self.sleeper.clone())
        }
    }

    fn connection_policy(max_attempts: u32) -> RetryPolicy<ErrorKind> {
        RetryPolicy::builder(RetryOn::only([ErrorKind::ConnectionRefused]))
            .max_attempts(max_attempts)
            .initial_delay(Duration::from_secs(1))
            .backoff_multiplier(2.0)
            .build()
            .unwrap()
    }

    fn refused() -> io::Error {
        io::Error::new(ErrorKind::ConnectionRefused, "connection refused")
    }

    #[rstest]
    #[case::single(1)]
    #[case::three(3)]
    #[case::default_count(5)]
    fn always_failing_operation_runs_max_attempts_times(#[case] max_attempts: u32) {
        let h = Harness::new();
        let calls = AtomicU32::new(0);
        let retrier = h.wrap(connection_policy(max_attempts), || -> io::Result<()> {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(refused())
        });

        let err = retrier.call().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
        assert_eq!(calls.load(Ordering::Relaxed), max_attempts);
        assert_eq!(h.sleeper.delays().len() as u32, max_attempts - 1);
    }

    #[test]
    fn delays_grow_by_multiplier() {
        let h = Harness::new();
        let retrier = h.wrap(connection_policy(5), || -> io::Result<()> { Err(refused()) });

        let _ = retrier.call();

        assert_eq!(
            h.sleeper.delays(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn three_attempts_connection_error_scenario() {
        let h = Harness::new();
        let calls = AtomicU32::new(0);
        let retrier = h.wrap(connection_policy(3), || -> io::Result<()> {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(refused())
        });

        let err = retrier.call().unwrap_err();

        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(
            h.sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn non_qualifying_error_propagates_immediately() {
        let h = Harness::new();
        let calls = AtomicU32::new(0);
        let retrier = h.wrap(connection_policy(3), || -> io::Result<()> {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(io::Error::new(ErrorKind::InvalidData, "bad topping"))
        });

        let err = retrier.call().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert!(h.sleeper.delays().is_empty());
        // Only the attempt trace, no retry or exhaustion message.
        assert_eq!(h.sink.lines(), vec!["1. try:"]);
    }

    #[test]
    fn single_attempt_fails_without_delay() {
        let h = Harness::new();
        let retrier = h.wrap(connection_policy(1), || -> io::Result<()> { Err(refused()) });

        let err = retrier.call().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
        assert!(h.sleeper.delays().is_empty());
        assert_eq!(
            h.sink.lines(),
            vec![
                "1. try:".to_string(),
                "Function: fetch_menu\nFailed despite best efforts after 1 tries.\nargs: no args"
                    .to_string(),
            ]
        );
    }

    #[rstest]
    #[case::first(1)]
    #[case::second(2)]
    #[case::last(4)]
    fn success_on_attempt_k_stops_there(#[case] succeed_on: u32) {
        let h = Harness::new();
        let calls = AtomicU32::new(0);
        let retrier = h.wrap(connection_policy(4), |slice: &u32| -> io::Result<String> {
            let n = calls.fetch_add(1, Ordering::Relaxed) + 1;
            if n < succeed_on {
                Err(refused())
            } else {
                Ok(format!("slice {slice} served on try {n}"))
            }
        });

        let served = retrier.invoke(8).unwrap();

        assert_eq!(served, format!("slice 8 served on try {succeed_on}"));
        assert_eq!(calls.load(Ordering::Relaxed), succeed_on);
        assert_eq!(h.sleeper.delays().len() as u32, succeed_on - 1);
    }

    #[test]
    fn non_qualifying_error_after_retries_stops_sequence() {
        let h = Harness::new();
        let calls = AtomicU32::new(0);
        let retrier = h.wrap(connection_policy(5), || -> io::Result<()> {
            let n = calls.fetch_add(1, Ordering::Relaxed) + 1;
            if n < 2 {
                Err(refused())
            } else {
                Err(io::Error::new(ErrorKind::PermissionDenied, "denied"))
            }
        });

        let err = retrier.call().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert_eq!(h.sleeper.delays(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn log_lines_carry_function_error_delay_and_args() {
        let h = Harness::new();
        let retrier = h.wrap(connection_policy(2), |order: &(&str, u8)| -> io::Result<()> {
            let _ = order;
            Err(refused())
        });

        let _ = retrier.invoke(("margherita", 2));

        assert_eq!(
            h.sink.lines(),
            vec![
                "1. try:".to_string(),
                "Function: fetch_menu\nException: connection refused\nRetrying in 1 seconds!, args: (\"margherita\", 2)\n"
                    .to_string(),
                "2. try:".to_string(),
                "Function: fetch_menu\nFailed despite best efforts after 2 tries.\nargs: (\"margherita\", 2)"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn api_errors_are_preserved_on_exhaustion() {
        let h = Harness::new();
        let policy = RetryPolicy::builder(RetryOn::only([ApiError::Request]))
            .max_attempts(2)
            .build()
            .unwrap();
        let retrier = h.wrap(policy, || -> Result<(), ApiError> { Err(ApiError::Request) });

        assert_eq!(retrier.call(), Err(ApiError::Request));
        assert_eq!(h.sleeper.delays(), vec![Duration::from_millis(500)]);
    }

    struct BrokenSink;

    impl LogSink for BrokenSink {
        fn warn(&self, _message: &str) -> Result<(), SinkError> {
            Err(SinkError::Io(io::Error::new(ErrorKind::BrokenPipe, "closed")))
        }
    }

    #[test]
    fn failing_sink_does_not_mask_result() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let calls = AtomicU32::new(0);
        let retrier = Retrier::new("fetch_menu", connection_policy(3), || -> io::Result<u32> {
            let n = calls.fetch_add(1, Ordering::Relaxed) + 1;
            if n < 3 { Err(refused()) } else { Ok(n) }
        })
        .with_sink(Arc::new(BrokenSink))
        .with_sleeper(sleeper.clone());

        assert_eq!(retrier.call().unwrap(), 3);
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[test]
    fn attempts_run_inside_retry_span() {
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());
        let h = Harness::new();
        let retrier = h.wrap(connection_policy(2), || -> io::Result<Option<&'static str>> {
            Ok(tracing::Span::current().metadata().map(|m| m.name()))
        });

        assert_eq!(retrier.call().unwrap(), Some("retry"));
    }

    #[test]
    fn concurrent_invocations_run_independent_sequences() {
        let h = Harness::new();
        let calls = AtomicU32::new(0);
        let retrier = h.wrap(connection_policy(3), |_: &usize| -> io::Result<()> {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(refused())
        });

        std::thread::scope(|s| {
            for i in 0..4 {
                let retrier = &retrier;
                s.spawn(move || {
                    let _ = retrier.invoke(i);
                });
            }
        });

        // Every sequence gets its own 3 attempts.
        assert_eq!(calls.load(Ordering::Relaxed), 12);
        assert_eq!(h.sleeper.delays().len(), 8);
        let exhausted = h
            .sink
            .lines()
            .iter()
            .filter(|l| l.contains("Failed despite best efforts after 3 tries."))
            .count();
        assert_eq!(exhausted, 4);
    }
}
