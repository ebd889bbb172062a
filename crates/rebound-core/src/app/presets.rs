//! Ready-made retriers for common call sites.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use super::retrier::Retrier;
use crate::domain::{PolicyError, RetryOn, RetryPolicy};
use crate::ports::{LogSink, StdoutSink, Tee, TracingSink};

/// Retries after the first call for [`retry_request`].
pub const DEFAULT_REQUEST_RETRIES: u32 = 3;

/// Prints every line and also forwards it to `tracing`.
pub fn request_sink() -> Arc<dyn LogSink> {
    Arc::new(Tee::new(StdoutSink, TracingSink))
}

/// Wraps a request-style call: `total_retries` retries after the first call,
/// default backoff (0.5s doubling), logged through [`request_sink`].
///
/// Pass `RetryOn::any()` to retry every failure.
pub fn retry_request<F, K>(
    name: impl Into<String>,
    retry_on: RetryOn<K>,
    total_retries: u32,
    operation: F,
) -> Result<Retrier<F, K>, PolicyError>
where
    K: Copy + Eq + Hash + Debug,
{
    let policy = RetryPolicy::builder(retry_on)
        .total_tries(total_retries)
        .build()?;
    Ok(Retrier::new(name, policy, operation).with_sink(request_sink()))
}
