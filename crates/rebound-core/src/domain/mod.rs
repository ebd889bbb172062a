//! Domain model (policy, error kinds, attempt records, errors).

pub mod api_error;
pub mod attempt;
pub mod errors;
pub mod kind;
pub mod policy;

pub use api_error::ApiError;
pub use attempt::{AttemptRecord, RetryEvent, SequenceId};
pub use errors::PolicyError;
pub use kind::{Classify, RetryOn};
pub use policy::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_TOTAL_TRIES,
    RetryPolicy, RetryPolicyBuilder,
};
