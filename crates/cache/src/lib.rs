//! On-disk cache for fetched observational products
//!
//! Layout under the configurable cache root:
//!
//! ```text
//! <root>/cache_index.json          durable index (single JSON document)
//! <root>/objects/<xx>/<fingerprint> one file per cache entry
//! <root>/staging/                   private per-record staging files
//! ```
//!
//! The index is the single source of truth for what is cached. Every
//! mutating operation holds one mutex, so usage accounting and index
//! updates are never observed torn. Lookups validate the backing file
//! before returning a hit and purge stale entries as a side effect, which
//! makes the index self-healing across process restarts.

pub mod entry;
pub mod error;
pub mod index;
pub mod retention;
pub mod store;

pub use entry::{CacheEntry, CacheUsage, EntryOrigin};
pub use error::{CacheError, CacheResult};
pub use index::CacheIndex;
pub use retention::{EvictionOrder, EvictionPlan, EvictionReport, RetentionPolicy};
pub use store::CacheStore;
