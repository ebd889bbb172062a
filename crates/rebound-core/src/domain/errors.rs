use thiserror::Error;

/// PolicyError は RetryPolicy の構築時エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retry_on lists no error kinds, nothing would ever be retried")]
    EmptyFilter,

    #[error("backoff_multiplier must be finite and non-negative (got {0})")]
    InvalidMultiplier(f64),
}
