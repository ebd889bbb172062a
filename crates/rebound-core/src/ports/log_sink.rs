//! LogSink port - リトライログの出力先の抽象化
//!
//! # 実装
//! - **StdoutSink**: 標準出力（シンク未指定時のデフォルト）
//! - **TracingSink**: `tracing::warn!` に流す
//! - **MemorySink**: メモリに溜める（テスト・レポート用）
//! - **Tee**: 2 つのシンクに同じ行を書く

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// SinkError はシンクへの書き込み失敗
///
/// Retrier はこのエラーを握りつぶす（操作自身のエラーを隠さない）。
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write log line: {0}")]
    Io(#[from] std::io::Error),

    #[error("log sink lock poisoned")]
    Poisoned,
}

/// LogSink は warning レベルのテキストを受け取る
///
/// # Thread Safety
/// - `Send + Sync` を要求（独立した試行列が同時に書き込む）
/// - `&self` で書き込むので、内部状態を持つ実装は自前で同期する
pub trait LogSink: Send + Sync {
    fn warn(&self, message: &str) -> Result<(), SinkError>;
}

/// Writes each message to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn warn(&self, message: &str) -> Result<(), SinkError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{message}")?;
        Ok(())
    }
}

/// Forwards each message to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn warn(&self, message: &str) -> Result<(), SinkError> {
        tracing::warn!(target: "rebound", "{message}");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn warn(&self, message: &str) -> Result<(), SinkError> {
        let mut lines = self.lines.lock().map_err(|_| SinkError::Poisoned)?;
        lines.push(message.to_string());
        Ok(())
    }
}

/// Writes every message to both sinks.
///
/// Both sinks are always tried; the first error is returned.
#[derive(Debug, Clone, Default)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: LogSink, B: LogSink> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: LogSink, B: LogSink> LogSink for Tee<A, B> {
    fn warn(&self, message: &str) -> Result<(), SinkError> {
        let first = self.first.warn(message);
        let second = self.second.warn(message);
        first.and(second)
    }
}

impl<S: LogSink + ?Sized> LogSink for std::sync::Arc<S> {
    fn warn(&self, message: &str) -> Result<(), SinkError> {
        (**self).warn(message)
    }
}
