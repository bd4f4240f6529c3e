//! The cache store
//!
//! [`CacheStore`] owns the cache root directory and serializes every
//! mutating sequence (lookup-with-purge, insert, evict, retention) behind
//! one mutex, so usage accounting and index updates are never observed
//! torn by a concurrent reader. Temporary staging files are private to
//! one owner per record in flight, so no file-level locking is needed.
//!
//! Atomicity discipline:
//! - insert moves the staged file into place first, then updates and
//!   persists the index; a failed move leaves the index unchanged
//! - evict removes file and index entry as one unit under the lock
//! - the index document itself is rewritten via temp-file rename

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use helio_core::{Fingerprint, InstrumentId};

use crate::entry::{CacheEntry, CacheUsage, EntryOrigin};
use crate::error::{CacheError, CacheResult};
use crate::index::CacheIndex;
use crate::retention::{select_evictions, EvictionReport, RetentionPolicy};

/// Subdirectory holding entry files, sharded by fingerprint prefix.
const OBJECTS_DIR: &str = "objects";
/// Subdirectory for private per-record staging files.
const STAGING_DIR: &str = "staging";

/// Durable, mutex-serialized cache of fetched files.
pub struct CacheStore {
    root: PathBuf,
    index: Mutex<CacheIndex>,
}

impl CacheStore {
    /// Open (or create) a cache rooted at `root`, reloading the index.
    ///
    /// Leftover staging files from a previous crash are removed; they are
    /// never referenced by the index.
    pub fn open(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(OBJECTS_DIR))?;
        let staging = root.join(STAGING_DIR);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let index = CacheIndex::load(&root);
        let usage = index.usage();
        info!(
            root = %root.display(),
            entries = usage.entry_count,
            bytes = usage.total_bytes,
            "cache opened"
        );
        Ok(CacheStore {
            root,
            index: Mutex::new(index),
        })
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a private staging path for a record in flight.
    ///
    /// The caller owns the file until it is inserted or discarded; nothing
    /// else will touch it. Callers that may race another fetch of the
    /// same fingerprint must use [`CacheStore::staging_path_for`].
    pub fn staging_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(format!("{}.part", fingerprint))
    }

    /// Staging path scoped to one owner.
    ///
    /// Two tasks whose record sets overlap fetch the same fingerprint
    /// concurrently; scoping the staging name by owner keeps their
    /// in-flight files disjoint, so neither can promote the other's
    /// half-written bytes.
    pub fn staging_path_for(&self, owner: &str, fingerprint: &Fingerprint) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(format!("{}-{}.part", owner, fingerprint))
    }

    /// Look up an entry, validating its backing file.
    ///
    /// A hit bumps `last_accessed` and persists the index. An entry whose
    /// file is missing or mis-sized is purged and reported as a miss.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let mut index = self.index.lock();
        let entry = index.get(fingerprint)?.clone();
        let file = self.root.join(&entry.relative_path);

        let valid = fs::metadata(&file)
            .map(|meta| meta.len() == entry.size)
            .unwrap_or(false);
        if !valid {
            warn!(fingerprint = %fingerprint, "purging stale cache entry on lookup");
            index.remove(fingerprint);
            let _ = fs::remove_file(&file);
            self.persist(&index);
            return None;
        }

        if let Some(live) = index.get_mut(fingerprint) {
            live.last_accessed = Utc::now();
        }
        let refreshed = index.get(fingerprint).cloned();
        self.persist(&index);
        refreshed
    }

    /// Absolute path of a cached entry's file.
    pub fn absolute_path(&self, entry: &CacheEntry) -> PathBuf {
        self.root.join(&entry.relative_path)
    }

    /// Insert a staged file under `fingerprint`.
    ///
    /// Fails with [`CacheError::DuplicateFingerprint`] when the key is
    /// already present; any I/O failure leaves the index unchanged.
    pub fn insert(
        &self,
        fingerprint: &Fingerprint,
        staged: &Path,
        origin: EntryOrigin,
    ) -> CacheResult<CacheEntry> {
        let mut index = self.index.lock();
        if index.contains(fingerprint) {
            return Err(CacheError::DuplicateFingerprint(fingerprint.clone()));
        }

        let size = fs::metadata(staged)?.len();
        let relative_path = format!("{}/{}/{}", OBJECTS_DIR, fingerprint.shard_prefix(), fingerprint);
        let dest = self.root.join(&relative_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(staged, &dest)?;

        let now = Utc::now();
        let entry = CacheEntry {
            fingerprint: fingerprint.clone(),
            relative_path,
            size,
            created_at: now,
            last_accessed: now,
            origin,
        };
        index.insert(entry.clone());
        self.persist(&index);
        debug!(fingerprint = %fingerprint, size, "cache entry inserted");
        Ok(entry)
    }

    /// Insert a request manifest: a JSON document listing the member
    /// record fingerprints, keyed by the request fingerprint.
    ///
    /// Manifests have no staged download file; the document is written
    /// here and promoted like any other entry.
    pub fn insert_manifest(
        &self,
        fingerprint: &Fingerprint,
        instrument: InstrumentId,
        members: Vec<Fingerprint>,
    ) -> CacheResult<CacheEntry> {
        let body = serde_json::to_vec_pretty(&members)?;
        let staged = self.staging_path(fingerprint);
        fs::write(&staged, body)?;
        let origin = EntryOrigin::Manifest {
            instrument,
            members,
        };
        let result = self.insert(fingerprint, &staged, origin);
        if result.is_err() {
            let _ = fs::remove_file(&staged);
        }
        result
    }

    /// Evict an entry: file and index record removed as one unit.
    pub fn evict(&self, fingerprint: &Fingerprint) -> CacheResult<CacheEntry> {
        let mut index = self.index.lock();
        let entry = index
            .get(fingerprint)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(fingerprint.clone()))?;

        // A file already missing is tolerated; the entry is stale either way.
        let file = self.root.join(&entry.relative_path);
        match fs::remove_file(&file) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(CacheError::Io(err)),
        }
        index.remove(fingerprint);
        self.persist(&index);
        debug!(fingerprint = %fingerprint, "cache entry evicted");
        Ok(entry)
    }

    /// Aggregate usage, consistent with live entries.
    pub fn usage(&self) -> CacheUsage {
        self.index.lock().usage()
    }

    /// Run one retention pass, protecting `protect` from eviction.
    ///
    /// Over-quota is reported, never an error: the insert that triggered
    /// the pass has already succeeded and stays cached.
    pub fn enforce_retention(
        &self,
        policy: &RetentionPolicy,
        protect: Option<&Fingerprint>,
    ) -> EvictionReport {
        let mut index = self.index.lock();
        let entries: Vec<CacheEntry> = index.entries().cloned().collect();
        let plan = select_evictions(&entries, index.usage(), policy, protect, Utc::now());

        let mut report = EvictionReport {
            over_quota_bytes: plan.over_quota_bytes,
            ..Default::default()
        };
        for fingerprint in plan.victims {
            if let Some(entry) = index.remove(&fingerprint) {
                let file = self.root.join(&entry.relative_path);
                if let Err(err) = fs::remove_file(&file) {
                    if err.kind() != std::io::ErrorKind::NotFound {
                        warn!(fingerprint = %fingerprint, error = %err, "failed to remove evicted file");
                    }
                }
                report.freed_bytes += entry.size;
                report.evicted.push(fingerprint);
            }
        }
        if !report.evicted.is_empty() {
            self.persist(&index);
            info!(
                evicted = report.evicted.len(),
                freed = report.freed_bytes,
                "retention pass complete"
            );
        }
        if let Some(excess) = report.over_quota_bytes {
            warn!(
                excess_bytes = excess,
                "cache remains over quota after retention pass"
            );
        }
        report
    }

    /// Drop every entry and its file.
    pub fn clear(&self) -> CacheResult<u64> {
        let mut index = self.index.lock();
        let mut removed = 0u64;
        for fingerprint in index.fingerprints() {
            if let Some(entry) = index.remove(&fingerprint) {
                let _ = fs::remove_file(self.root.join(&entry.relative_path));
                removed += 1;
            }
        }
        self.persist(&index);
        info!(removed, "cache cleared");
        Ok(removed)
    }

    /// Persist the index, logging rather than propagating failures.
    ///
    /// The in-memory index stays authoritative for this process; a
    /// write failure costs durability across restarts, not correctness.
    fn persist(&self, index: &CacheIndex) {
        if let Err(err) = index.save(&self.root) {
            warn!(error = %err, "failed to persist cache index");
        }
    }
}
