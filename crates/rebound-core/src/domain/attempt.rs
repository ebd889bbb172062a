//! Attempt records and the log lines rendered from them.
//!
//! Nothing here is persisted: an [`AttemptRecord`] lives for one failed
//! attempt, is rendered into a [`RetryEvent`] for the log sink, and dropped.

use std::fmt;
use std::time::Duration;

use ulid::Ulid;

/// SequenceId は 1 回の invoke（試行列）を識別する
///
/// 同じ Retrier を複数スレッドから呼んだ場合でも、tracing のログで
/// 試行列ごとに区別できるようにする。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(Ulid);

impl SequenceId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq-{}", self.0)
    }
}

/// A single failed attempt of a wrapped operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// 1-indexed.
    pub attempt: u32,

    /// The error raised by this attempt, rendered with `Display`.
    pub error: Option<String>,

    /// Delay applied before the next attempt. `None` when no attempt follows.
    pub next_delay: Option<Duration>,
}

impl AttemptRecord {
    pub fn failed(attempt: u32, error: impl fmt::Display, next_delay: Option<Duration>) -> Self {
        Self {
            attempt,
            error: Some(error.to_string()),
            next_delay,
        }
    }
}

/// RetryEvent はログシンクに渡す 1 行（複数行）のメッセージ
///
/// `Display` がそのままシンクに書かれる文言になる。
#[derive(Debug, Clone, Copy)]
pub enum RetryEvent<'a> {
    /// Emitted before every invocation, the first one included.
    Attempt { attempt: u32 },

    /// A qualifying error with attempts left.
    Retrying {
        function: &'a str,
        record: &'a AttemptRecord,
        args: &'a str,
    },

    /// A qualifying error on the last permitted attempt.
    Exhausted {
        function: &'a str,
        attempts: u32,
        args: &'a str,
    },

    /// The delay was interrupted before the next attempt could run.
    Cancelled {
        function: &'a str,
        attempts: u32,
        args: &'a str,
    },
}

impl fmt::Display for RetryEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryEvent::Attempt { attempt } => write!(f, "{attempt}. try:"),
            RetryEvent::Retrying {
                function,
                record,
                args,
            } => {
                let error = record.error.as_deref().unwrap_or("unknown error");
                let delay = record.next_delay.unwrap_or_default().as_secs_f64();
                write!(
                    f,
                    "Function: {function}\nException: {error}\nRetrying in {delay} seconds!, args: {args}\n"
                )
            }
            RetryEvent::Exhausted {
                function,
                attempts,
                args,
            } => write!(
                f,
                "Function: {function}\nFailed despite best efforts after {attempts} tries.\nargs: {args}"
            ),
            RetryEvent::Cancelled {
                function,
                attempts,
                args,
            } => write!(
                f,
                "Function: {function}\nCancelled after {attempts} tries.\nargs: {args}"
            ),
        }
    }
}
