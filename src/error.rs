//! Unified error type for the facade

use thiserror::Error;

/// Any failure the facade can surface.
///
/// Layer errors convert losslessly via `From`, so `?` works across the
/// whole stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Request construction or parameter validation failure
    #[error(transparent)]
    Validation(#[from] helio_core::ValidationError),

    /// Archive resolution failure
    #[error(transparent)]
    Archive(#[from] helio_archive::ArchiveError),

    /// Cache store failure
    #[error(transparent)]
    Cache(#[from] helio_cache::CacheError),

    /// Coordinator failure (shutdown, spawn)
    #[error(transparent)]
    Task(#[from] helio_tasks::TaskError),

    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result alias used throughout the facade.
pub type Result<T> = std::result::Result<T, Error>;
