//! Configuration
//!
//! A single TOML document configures the cache location, retention
//! limits, retry behavior, and the optional export account:
//!
//! ```toml
//! cache_root = "/var/cache/heliodata"
//! account = "observer@example.org"
//! fail_fast = false
//! transfer_timeout_secs = 120
//!
//! [retention]
//! max_total_bytes = 10737418240
//! max_entry_age_secs = 604800
//!
//! [retry]
//! max_attempts = 3
//! backoff_ms = 500
//! ```
//!
//! Every section and field is optional; absent values fall back to the
//! defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use helio_cache::RetentionPolicy;
use helio_tasks::RetryPolicy;

use crate::error::Result;

/// Retry section of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per record (first try included)
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds; doubles per
    /// further attempt
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        RetryConfig {
            max_attempts: policy.max_attempts,
            backoff_ms: policy.initial_backoff.as_millis() as u64,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelioConfig {
    /// Cache root directory
    pub cache_root: PathBuf,
    /// Default account/contact identifier for account-aware backends;
    /// requests carrying their own account keep it
    pub account: Option<String>,
    /// Stop a task at its first record failure
    pub fail_fast: bool,
    /// Bound on one transfer attempt, in seconds; enforced by the backend
    /// implementations (an overrun surfaces as a transient fetch failure),
    /// `None` for unbounded
    pub transfer_timeout_secs: Option<u64>,
    /// Retention limits applied after every cache insert
    pub retention: RetentionPolicy,
    /// Retry behavior for transient fetch failures
    pub retry: RetryConfig,
}

impl Default for HelioConfig {
    fn default() -> Self {
        HelioConfig {
            cache_root: default_cache_root(),
            account: None,
            fail_fast: false,
            transfer_timeout_secs: None,
            retention: RetentionPolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl HelioConfig {
    /// Parse a configuration document from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Per-attempt transfer bound as a [`Duration`], for handing to
    /// backend constructors. `None` means unbounded.
    pub fn transfer_timeout(&self) -> Option<Duration> {
        self.transfer_timeout_secs.map(Duration::from_secs)
    }
}

/// `$HOME/.cache/heliodata` when a home directory is known, otherwise a
/// cache directory under the working directory.
fn default_cache_root() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".cache").join("heliodata"),
        None => PathBuf::from("heliodata-cache"),
    }
}
