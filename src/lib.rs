//! Remote data retrieval and cache management for solar observatory
//! imagery
//!
//! `heliodata` fetches observational products (SDO/AIA, SDO/HMI, IRIS,
//! SOHO, Learmonth radio spectra) from their archives and keeps them in a
//! durable on-disk cache keyed by request fingerprint. Downloads run as
//! cancellable background tasks; retention limits are enforced after
//! every insert.
//!
//! The workspace is layered:
//! - [`helio_core`]: requests, records, fingerprints, instrument tables
//! - [`helio_archive`]: query construction and backend selection
//! - [`helio_cache`]: the durable cache store and retention engine
//! - [`helio_tasks`]: download tasks and the coordinator
//!
//! This crate is the facade: [`Helio`] wires the layers together and is
//! the only handle most callers need.
//!
//! ```no_run
//! use heliodata::prelude::*;
//!
//! # fn main() -> heliodata::Result<()> {
//! let client = Helio::builder()
//!     .cache_root("/var/cache/heliodata")
//!     .retention(RetentionPolicy::max_bytes(10 * 1024 * 1024 * 1024))
//!     .open()?;
//!
//! let range = TimeRange::new(
//!     "2024-01-01T00:00:00Z".parse().unwrap(),
//!     "2024-01-01T01:00:00Z".parse().unwrap(),
//! )?;
//! let request = RetrievalRequest::new(InstrumentId::Aia, range)
//!     .with_param("wavelength", "171")
//!     .with_param("cadence", "12s");
//!
//! match client.submit(request)? {
//!     Submission::Cached(entries) => println!("already have {} files", entries.len()),
//!     Submission::Started(handle) | Submission::Joined(handle) => {
//!         let outcome = handle.wait();
//!         println!("finished: {:?}", outcome);
//!     }
//! }
//! client.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;

pub use client::{Helio, HelioBuilder};
pub use config::HelioConfig;
pub use error::{Error, Result};
