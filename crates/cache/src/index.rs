//! The durable cache index
//!
//! A single JSON document mapping fingerprint to [`CacheEntry`], plus the
//! incrementally maintained aggregate usage. The in-memory map is the
//! working copy; [`CacheIndex::save`] rewrites the document through a
//! temp-file rename so a crash mid-save never corrupts the index.
//!
//! Loading is self-healing: an unreadable or unparseable index starts
//! empty, and entries whose backing files are missing or mis-sized are
//! dropped at load time.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use helio_core::Fingerprint;

use crate::entry::{CacheEntry, CacheUsage};
use crate::error::CacheResult;

/// On-disk index file name, kept at the cache root.
pub const INDEX_FILE: &str = "cache_index.json";

/// In-memory cache index with incremental usage accounting.
#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: HashMap<Fingerprint, CacheEntry>,
    usage: CacheUsage,
}

impl CacheIndex {
    /// Empty index.
    pub fn new() -> Self {
        CacheIndex::default()
    }

    /// Load the index from `root`, dropping invalid entries.
    ///
    /// `root` is the cache root; entry paths are resolved against it when
    /// validating that backing files exist with the recorded size.
    pub fn load(root: &Path) -> Self {
        let index_path = root.join(INDEX_FILE);
        let raw = match fs::read_to_string(&index_path) {
            Ok(raw) => raw,
            Err(_) => return CacheIndex::new(),
        };
        let persisted: HashMap<Fingerprint, CacheEntry> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "cache index unparseable, starting fresh");
                return CacheIndex::new();
            }
        };

        let mut index = CacheIndex::new();
        for (fingerprint, entry) in persisted {
            let file = root.join(&entry.relative_path);
            match fs::metadata(&file) {
                Ok(meta) if meta.len() == entry.size => {
                    index.usage.total_bytes += entry.size;
                    index.usage.entry_count += 1;
                    index.entries.insert(fingerprint, entry);
                }
                Ok(meta) => {
                    warn!(
                        fingerprint = %fingerprint,
                        recorded = entry.size,
                        actual = meta.len(),
                        "dropping mis-sized cache entry at load"
                    );
                }
                Err(_) => {
                    debug!(fingerprint = %fingerprint, "dropping cache entry with missing file");
                }
            }
        }
        index
    }

    /// Persist the index to `root` atomically (write temp, rename).
    pub fn save(&self, root: &Path) -> CacheResult<()> {
        let index_path = root.join(INDEX_FILE);
        let tmp_path = tmp_sibling(&index_path);
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &index_path)?;
        Ok(())
    }

    /// Entry by fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&CacheEntry> {
        self.entries.get(fingerprint)
    }

    /// Mutable entry by fingerprint (for access-time bumps).
    pub fn get_mut(&mut self, fingerprint: &Fingerprint) -> Option<&mut CacheEntry> {
        self.entries.get_mut(fingerprint)
    }

    /// Whether a fingerprint is present.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Add an entry, updating usage. The caller guarantees uniqueness.
    pub fn insert(&mut self, entry: CacheEntry) {
        debug_assert!(!self.entries.contains_key(&entry.fingerprint));
        self.usage.total_bytes += entry.size;
        self.usage.entry_count += 1;
        self.entries.insert(entry.fingerprint.clone(), entry);
    }

    /// Remove an entry, updating usage.
    pub fn remove(&mut self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let removed = self.entries.remove(fingerprint);
        if let Some(entry) = &removed {
            self.usage.total_bytes = self.usage.total_bytes.saturating_sub(entry.size);
            self.usage.entry_count = self.usage.entry_count.saturating_sub(1);
        }
        removed
    }

    /// Aggregate usage (always consistent with live entries).
    pub fn usage(&self) -> CacheUsage {
        self.usage
    }

    /// Iterate over all live entries.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    /// All fingerprints, for bulk operations.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.entries.keys().cloned().collect()
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryOrigin;
    use chrono::{TimeZone, Utc};
    use helio_core::{InstrumentId, RecordId};

    fn entry(tag: &str, size: u64, relative_path: &str) -> CacheEntry {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        CacheEntry {
            fingerprint: Fingerprint::digest(tag.as_bytes()),
            relative_path: relative_path.to_string(),
            size,
            created_at: ts,
            last_accessed: ts,
            origin: EntryOrigin::Record {
                instrument: InstrumentId::Aia,
                record_id: RecordId::new(tag),
                timestamp: ts,
            },
        }
    }

    #[test]
    fn test_usage_tracks_insert_and_remove() {
        let mut index = CacheIndex::new();
        let a = entry("a", 100, "objects/aa/a");
        let b = entry("b", 50, "objects/bb/b");
        let fp_a = a.fingerprint.clone();

        index.insert(a);
        index.insert(b);
        assert_eq!(index.usage().total_bytes, 150);
        assert_eq!(index.usage().entry_count, 2);

        index.remove(&fp_a);
        assert_eq!(index.usage().total_bytes, 50);
        assert_eq!(index.usage().entry_count, 1);
    }

    #[test]
    fn test_remove_missing_is_none() {
        let mut index = CacheIndex::new();
        assert!(index.remove(&Fingerprint::digest(b"missing")).is_none());
        assert_eq!(index.usage(), CacheUsage::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("objects/aa")).unwrap();
        std::fs::write(root.join("objects/aa/a"), vec![0u8; 100]).unwrap();

        let mut index = CacheIndex::new();
        index.insert(entry("a", 100, "objects/aa/a"));
        index.save(root).unwrap();

        let reloaded = CacheIndex::load(root);
        assert_eq!(reloaded.usage().entry_count, 1);
        assert_eq!(reloaded.usage().total_bytes, 100);
    }

    #[test]
    fn test_load_drops_missing_and_missized_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("objects/aa")).unwrap();
        // "good" exists with the right size; "short" is truncated;
        // "gone" has no file at all.
        std::fs::write(root.join("objects/aa/good"), vec![0u8; 10]).unwrap();
        std::fs::write(root.join("objects/aa/short"), vec![0u8; 3]).unwrap();

        let mut index = CacheIndex::new();
        index.insert(entry("good", 10, "objects/aa/good"));
        index.insert(entry("short", 10, "objects/aa/short"));
        index.insert(entry("gone", 10, "objects/aa/gone"));
        index.save(root).unwrap();

        let reloaded = CacheIndex::load(root);
        assert_eq!(reloaded.usage().entry_count, 1);
        assert!(reloaded.contains(&Fingerprint::digest(b"good")));
    }

    #[test]
    fn test_load_corrupt_index_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{ not json").unwrap();
        let index = CacheIndex::load(dir.path());
        assert_eq!(index.usage(), CacheUsage::default());
    }

    #[test]
    fn test_load_absent_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = CacheIndex::load(dir.path());
        assert_eq!(index.usage().entry_count, 0);
    }
}
