//! Sequence - 1 回の invoke における試行カウンタと判断
//!
//! Retrier（同期）と AsyncRetrier（非同期）が共有するロジック。
//! 待機そのものは呼び出し側が行い、ここでは「次にどうするか」だけを決める。

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Duration;

use crate::domain::{AttemptRecord, Classify, RetryEvent, RetryPolicy, SequenceId};
use crate::ports::LogSink;

/// Step は失敗した試行の後に取る行動
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Wait for the delay, then run the next attempt.
    Retry(Duration),
    /// Hand the error back to the caller unchanged.
    Propagate,
}

pub(crate) struct Sequence<'a, K: Eq + Hash> {
    id: SequenceId,
    function: &'a str,
    policy: &'a RetryPolicy<K>,
    sink: &'a dyn LogSink,
    args: &'a str,
    attempt: u32,
}

impl<'a, K: Copy + Eq + Hash + Debug> Sequence<'a, K> {
    pub(crate) fn new(
        function: &'a str,
        policy: &'a RetryPolicy<K>,
        sink: &'a dyn LogSink,
        args: &'a str,
    ) -> Self {
        Self {
            id: SequenceId::generate(),
            function,
            policy,
            sink,
            args,
            attempt: 1,
        }
    }

    pub(crate) fn id(&self) -> SequenceId {
        self.id
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Emits the per-attempt trace line. Call right before invoking.
    pub(crate) fn begin_attempt(&self) {
        self.emit(RetryEvent::Attempt {
            attempt: self.attempt,
        });
    }

    pub(crate) fn on_error<E>(&mut self, error: &E) -> Step
    where
        E: Classify<Kind = K> + Display,
    {
        let kind = error.kind();
        if !self.policy.is_retryable(&kind) {
            tracing::debug!(
                sequence = %self.id,
                attempt = self.attempt,
                kind = ?kind,
                "error is not retryable"
            );
            return Step::Propagate;
        }

        if self.attempt >= self.policy.max_attempts() {
            self.emit(RetryEvent::Exhausted {
                function: self.function,
                attempts: self.attempt,
                args: self.args,
            });
            return Step::Propagate;
        }

        let delay = self.policy.delay_before(self.attempt + 1);
        let record = AttemptRecord::failed(self.attempt, error, Some(delay));
        self.emit(RetryEvent::Retrying {
            function: self.function,
            record: &record,
            args: self.args,
        });
        self.attempt += 1;
        Step::Retry(delay)
    }

    /// True when `on_error` would answer `Step::Retry` for this error.
    pub(crate) fn would_retry<E>(&self, error: &E) -> bool
    where
        E: Classify<Kind = K>,
    {
        self.policy.is_retryable(&error.kind()) && self.attempt < self.policy.max_attempts()
    }

    /// No further attempt will run; `attempts` is how many already did.
    pub(crate) fn cancelled(&self, attempts: u32) {
        self.emit(RetryEvent::Cancelled {
            function: self.function,
            attempts,
            args: self.args,
        });
    }

    fn emit(&self, event: RetryEvent<'_>) {
        if let Err(e) = self.sink.warn(&event.to_string()) {
            tracing::debug!(sequence = %self.id, error = %e, "log sink rejected message");
        }
    }
}

/// Renders call arguments for the retry and exhaustion messages.
pub(crate) fn describe_args<A: Debug>(args: &A) -> String {
    format!("{args:?}")
}

pub(crate) const NO_ARGS: &str = "no args";
