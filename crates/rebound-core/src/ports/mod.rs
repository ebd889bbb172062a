//! Ports - 抽象化レイヤー
//!
//! Retrier が外部に依存する 2 点（ログの出力先と待機）を trait として定義し、
//! 実装を差し替え可能にします。

pub mod log_sink;
pub mod sleeper;

pub use self::log_sink::{LogSink, MemorySink, SinkError, StdoutSink, Tee, TracingSink};
pub use self::sleeper::{RecordingSleeper, Sleeper, ThreadSleeper};
