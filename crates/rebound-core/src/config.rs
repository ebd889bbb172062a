//! Retry configuration loaded from TOML.
//!
//! ```toml
//! max_attempts = 3
//! initial_delay_ms = 250
//! backoff_multiplier = 1.5
//! ```
//!
//! Missing fields fall back to the retrier defaults.

use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, PolicyError, RetryOn,
    RetryPolicy,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid retry config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Serializable form of a [`RetryPolicy`] without its error-kind filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total invocations, the first call included.
    pub max_attempts: u32,

    /// Delay, in milliseconds, before the first retry.
    pub initial_delay_ms: u64,

    /// Factor applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY.as_millis() as u64,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn into_policy<K>(self, retry_on: RetryOn<K>) -> Result<RetryPolicy<K>, PolicyError>
    where
        K: Copy + Eq + Hash + Debug,
    {
        RetryPolicy::builder(retry_on)
            .max_attempts(self.max_attempts)
            .initial_delay(self.initial_delay())
            .backoff_multiplier(self.backoff_multiplier)
            .build()
    }
}
