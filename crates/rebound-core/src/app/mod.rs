//! App - Retrier 本体とプリセット
//!
//! - **retrier**: 同期版（呼び出しスレッドを止めて待つ）
//! - **async_retrier**: tokio 版（待機をキャンセル可能）
//! - **presets**: よく使う組み合わせ

pub mod async_retrier;
pub mod presets;
pub mod retrier;
mod sequence;

pub use self::async_retrier::AsyncRetrier;
pub use self::presets::{DEFAULT_REQUEST_RETRIES, request_sink, retry_request};
pub use self::retrier::Retrier;
