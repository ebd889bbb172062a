//! rebound-core
//!
//! Retry-with-backoff for arbitrary operations.
//!
//! # モジュール構成
//! - **domain**: ポリシー、エラー種別フィルタ、試行レコード、API エラー
//! - **ports**: 抽象化レイヤー（LogSink, Sleeper）
//! - **app**: Retrier（同期）、AsyncRetrier（tokio）、プリセット
//! - **config**: TOML からのリトライ設定読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod ports;

pub use app::{AsyncRetrier, Retrier, retry_request};
pub use config::{ConfigError, RetryConfig};
pub use domain::{ApiError, Classify, PolicyError, RetryOn, RetryPolicy};
pub use ports::{LogSink, Sleeper};
