//! The facade client
//!
//! [`Helio`] wires the archive adapter, cache store, and task coordinator
//! together behind one handle. Build one through [`HelioBuilder`],
//! registering the backends the deployment actually has; nothing here
//! opens network connections on its own.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use helio_archive::{ArchiveAdapter, ArchiveBackend};
use helio_cache::{CacheStore, CacheUsage, EvictionReport, RetentionPolicy};
use helio_core::{Fingerprint, RetrievalRequest};
use helio_tasks::{RetryPolicy, Submission, TaskCoordinator};

use crate::config::HelioConfig;
use crate::error::Result;

/// Builder for [`Helio`].
pub struct HelioBuilder {
    config: HelioConfig,
    backends: Vec<Box<dyn ArchiveBackend>>,
}

impl HelioBuilder {
    /// Start from the given configuration.
    pub fn from_config(config: HelioConfig) -> Self {
        HelioBuilder {
            config,
            backends: Vec::new(),
        }
    }

    /// Override the cache root.
    pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.cache_root = root.into();
        self
    }

    /// Override the retention policy.
    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.config.retention = policy;
        self
    }

    /// Override the retry behavior for transient fetch failures.
    pub fn retry(mut self, retry: crate::config::RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the default account/contact identifier.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.config.account = Some(account.into());
        self
    }

    /// Stop tasks at their first record failure.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    /// Register an archive backend.
    pub fn backend(mut self, backend: Box<dyn ArchiveBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Open the cache and start the coordinator.
    pub fn open(self) -> Result<Helio> {
        let store = Arc::new(CacheStore::open(&self.config.cache_root)?);
        let mut adapter = ArchiveAdapter::new();
        for backend in self.backends {
            adapter.register(backend);
        }
        let retry: RetryPolicy = self.config.retry.into();
        let coordinator = TaskCoordinator::new(Arc::new(adapter), store)
            .with_retention(self.config.retention)
            .with_retry(retry)
            .with_fail_fast(self.config.fail_fast);
        info!(cache_root = %self.config.cache_root.display(), "client opened");
        Ok(Helio {
            coordinator,
            account: self.config.account,
        })
    }
}

/// Handle to the retrieval subsystem.
///
/// Dropping the client shuts the coordinator down, cancelling and
/// joining every running task.
pub struct Helio {
    coordinator: TaskCoordinator,
    account: Option<String>,
}

impl Helio {
    /// Builder with default configuration.
    pub fn builder() -> HelioBuilder {
        HelioBuilder::from_config(HelioConfig::default())
    }

    /// Apply the configured default account to a request lacking one.
    ///
    /// [`Helio::submit`] does this itself; callers that need the
    /// effective fingerprint (the account is part of the cache key) can
    /// apply it first and submit the result.
    pub fn with_default_account(&self, request: RetrievalRequest) -> RetrievalRequest {
        match (&self.account, request.account()) {
            (Some(account), None) => request.with_account(account.clone()),
            _ => request,
        }
    }

    /// Submit a retrieval request.
    ///
    /// A request without its own account inherits the configured default,
    /// which also steers SDO requests toward the export backend.
    pub fn submit(&self, request: RetrievalRequest) -> Result<Submission> {
        let request = self.with_default_account(request);
        Ok(self.coordinator.submit(request)?)
    }

    /// Cancel the task serving `fingerprint`, if one is running.
    pub fn cancel(&self, fingerprint: &Fingerprint) -> bool {
        self.coordinator.cancel(fingerprint)
    }

    /// Cancel every running task.
    pub fn cancel_all(&self) {
        self.coordinator.cancel_all()
    }

    /// Number of tasks that have not reached a terminal state.
    pub fn active_tasks(&self) -> usize {
        self.coordinator.active_count()
    }

    /// Aggregate cache usage.
    pub fn cache_usage(&self) -> CacheUsage {
        self.coordinator.store().usage()
    }

    /// Remove every cache entry; returns the number removed.
    pub fn clear_cache(&self) -> Result<u64> {
        Ok(self.coordinator.store().clear()?)
    }

    /// Replace the retention policy for subsequent eviction passes.
    pub fn set_retention(&self, policy: RetentionPolicy) {
        self.coordinator.set_retention(policy);
    }

    /// Run one retention pass immediately, outside any task.
    pub fn enforce_retention(&self) -> EvictionReport {
        let policy = self.coordinator.retention();
        self.coordinator.store().enforce_retention(&policy, None)
    }

    /// Shut down: cancel and join every worker, reject further submits.
    pub fn shutdown(&self) {
        self.coordinator.shutdown()
    }
}
