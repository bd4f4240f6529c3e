//! Retention policy engine
//!
//! Decides which cached entries to evict given a usage snapshot and the
//! configured limits. Two independent passes:
//!
//! 1. **Age**: entries older than the maximum entry age are always
//!    selected, regardless of usage.
//! 2. **Size**: while projected usage exceeds the byte limit, entries are
//!    selected in eviction order (least recently accessed first by
//!    default, ties broken by oldest creation time).
//!
//! The entry protected by the caller (the insert that triggered the pass)
//! is never selected; if usage still exceeds the limit once everything
//! else is gone, the plan reports the excess instead of failing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use helio_core::Fingerprint;

use crate::entry::{CacheEntry, CacheUsage};

/// Order in which the size pass selects victims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionOrder {
    /// Least recently accessed first; ties broken by oldest creation
    #[default]
    LeastRecentlyUsed,
    /// Oldest creation time first
    OldestFirst,
}

/// Configured retention limits.
///
/// Set once at coordinator startup; reconfiguration only affects
/// subsequent eviction passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Byte ceiling for total cache usage, `None` for unlimited
    pub max_total_bytes: Option<u64>,
    /// Maximum entry age in seconds, `None` for unlimited
    pub max_entry_age_secs: Option<u64>,
    /// Victim selection order for the size pass
    pub order: EvictionOrder,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy {
            max_total_bytes: None,
            max_entry_age_secs: None,
            order: EvictionOrder::LeastRecentlyUsed,
        }
    }
}

impl RetentionPolicy {
    /// Policy with only a byte ceiling.
    pub fn max_bytes(limit: u64) -> Self {
        RetentionPolicy {
            max_total_bytes: Some(limit),
            ..Default::default()
        }
    }

    /// Set the maximum entry age (builder style).
    pub fn with_max_age_secs(mut self, secs: u64) -> Self {
        self.max_entry_age_secs = Some(secs);
        self
    }

    /// Set the eviction order (builder style).
    pub fn with_order(mut self, order: EvictionOrder) -> Self {
        self.order = order;
        self
    }
}

/// Output of one eviction planning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionPlan {
    /// Fingerprints to evict, in eviction order
    pub victims: Vec<Fingerprint>,
    /// Bytes still over the limit after evicting every victim
    pub over_quota_bytes: Option<u64>,
}

impl EvictionPlan {
    /// Whether the pass selected nothing and found nothing over quota.
    pub fn is_noop(&self) -> bool {
        self.victims.is_empty() && self.over_quota_bytes.is_none()
    }
}

/// Result of executing an eviction plan against the store.
#[derive(Debug, Clone, Default)]
pub struct EvictionReport {
    /// Entries actually removed
    pub evicted: Vec<Fingerprint>,
    /// Bytes freed
    pub freed_bytes: u64,
    /// Excess bytes that could not be freed without evicting the
    /// protected entry
    pub over_quota_bytes: Option<u64>,
}

/// Select the entries to evict.
///
/// `protect` names the entry that must never be selected (the one whose
/// insert triggered the pass). `now` is injected for testability.
pub fn select_evictions(
    entries: &[CacheEntry],
    usage: CacheUsage,
    policy: &RetentionPolicy,
    protect: Option<&Fingerprint>,
    now: DateTime<Utc>,
) -> EvictionPlan {
    let mut victims: Vec<Fingerprint> = Vec::new();
    let mut projected = usage.total_bytes;

    let is_protected =
        |entry: &CacheEntry| protect.map(|fp| *fp == entry.fingerprint).unwrap_or(false);

    // Age pass runs first and is independent of the byte limit.
    if let Some(max_age) = policy.max_entry_age_secs {
        let cutoff = now - Duration::seconds(max_age as i64);
        for entry in entries {
            if entry.created_at < cutoff && !is_protected(entry) {
                projected = projected.saturating_sub(entry.size);
                victims.push(entry.fingerprint.clone());
            }
        }
    }

    let mut over_quota_bytes = None;
    if let Some(limit) = policy.max_total_bytes {
        if projected > limit {
            let mut candidates: Vec<&CacheEntry> = entries
                .iter()
                .filter(|e| !is_protected(e) && !victims.contains(&e.fingerprint))
                .collect();
            match policy.order {
                EvictionOrder::LeastRecentlyUsed => candidates.sort_by(|a, b| {
                    a.last_accessed
                        .cmp(&b.last_accessed)
                        .then(a.created_at.cmp(&b.created_at))
                }),
                EvictionOrder::OldestFirst => {
                    candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at))
                }
            }
            for entry in candidates {
                if projected <= limit {
                    break;
                }
                projected = projected.saturating_sub(entry.size);
                victims.push(entry.fingerprint.clone());
            }
            if projected > limit {
                // Only the protected entry remains; report, never evict it.
                over_quota_bytes = Some(projected - limit);
            }
        }
    }

    EvictionPlan {
        victims,
        over_quota_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryOrigin;
    use chrono::TimeZone;
    use helio_core::{InstrumentId, RecordId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn entry(tag: &str, size: u64, created_min_ago: i64, accessed_min_ago: i64) -> CacheEntry {
        CacheEntry {
            fingerprint: Fingerprint::digest(tag.as_bytes()),
            relative_path: format!("objects/aa/{}", tag),
            size,
            created_at: now() - Duration::minutes(created_min_ago),
            last_accessed: now() - Duration::minutes(accessed_min_ago),
            origin: EntryOrigin::Record {
                instrument: InstrumentId::Aia,
                record_id: RecordId::new(tag),
                timestamp: now(),
            },
        }
    }

    fn usage(entries: &[CacheEntry]) -> CacheUsage {
        CacheUsage {
            total_bytes: entries.iter().map(|e| e.size).sum(),
            entry_count: entries.len() as u64,
        }
    }

    #[test]
    fn test_no_limits_is_noop() {
        let entries = vec![entry("a", 100, 60, 10)];
        let plan = select_evictions(
            &entries,
            usage(&entries),
            &RetentionPolicy::default(),
            None,
            now(),
        );
        assert!(plan.is_noop());
    }

    #[test]
    fn test_lru_order_with_created_tie_break() {
        // 95 used, limit 100, inserting 10 -> must free at least 5.
        let entries = vec![
            entry("old_access", 40, 50, 40),
            entry("tie_older", 30, 60, 20),
            entry("tie_newer", 25, 10, 20),
            entry("fresh", 10, 0, 0),
        ];
        let policy = RetentionPolicy::max_bytes(100);
        let protect = Fingerprint::digest(b"fresh");
        let plan = select_evictions(&entries, usage(&entries), &policy, Some(&protect), now());
        // 105 total; evicting old_access (LRU) brings usage to 65 <= 100.
        assert_eq!(plan.victims, vec![Fingerprint::digest(b"old_access")]);
        assert!(plan.over_quota_bytes.is_none());
    }

    #[test]
    fn test_tie_break_prefers_oldest_created() {
        let entries = vec![
            entry("tie_newer", 50, 10, 20),
            entry("tie_older", 50, 60, 20),
            entry("keep", 10, 0, 0),
        ];
        let policy = RetentionPolicy::max_bytes(60);
        let plan = select_evictions(&entries, usage(&entries), &policy, None, now());
        assert_eq!(plan.victims[0], Fingerprint::digest(b"tie_older"));
    }

    #[test]
    fn test_stops_once_under_limit() {
        let entries = vec![
            entry("a", 30, 30, 30),
            entry("b", 30, 20, 20),
            entry("c", 30, 10, 10),
        ];
        let policy = RetentionPolicy::max_bytes(60);
        let plan = select_evictions(&entries, usage(&entries), &policy, None, now());
        // 90 total; evicting "a" reaches exactly 60, which satisfies <=.
        assert_eq!(plan.victims, vec![Fingerprint::digest(b"a")]);
    }

    #[test]
    fn test_protected_entry_never_selected_and_over_quota_reported() {
        // A single 10-byte entry against a 5-byte limit: pathological
        // configuration from the retention contract.
        let entries = vec![entry("huge", 10, 0, 0)];
        let policy = RetentionPolicy::max_bytes(5);
        let protect = Fingerprint::digest(b"huge");
        let plan = select_evictions(&entries, usage(&entries), &policy, Some(&protect), now());
        assert!(plan.victims.is_empty());
        assert_eq!(plan.over_quota_bytes, Some(5));
    }

    #[test]
    fn test_age_pass_runs_before_size_pass() {
        let entries = vec![
            entry("ancient", 10, 24 * 60, 5), // recently accessed but old
            entry("young", 10, 5, 5),
        ];
        let policy = RetentionPolicy {
            max_total_bytes: None,
            max_entry_age_secs: Some(3600),
            order: EvictionOrder::LeastRecentlyUsed,
        };
        let plan = select_evictions(&entries, usage(&entries), &policy, None, now());
        assert_eq!(plan.victims, vec![Fingerprint::digest(b"ancient")]);
    }

    #[test]
    fn test_age_evictions_count_toward_size_projection() {
        let entries = vec![
            entry("ancient", 50, 24 * 60, 0),
            entry("young_a", 30, 30, 30),
            entry("young_b", 30, 5, 5),
        ];
        let policy = RetentionPolicy::max_bytes(70).with_max_age_secs(3600);
        let plan = select_evictions(&entries, usage(&entries), &policy, None, now());
        // Age pass removes "ancient" (110 -> 60), already under the limit;
        // size pass selects nothing more.
        assert_eq!(plan.victims, vec![Fingerprint::digest(b"ancient")]);
    }

    #[test]
    fn test_oldest_first_order() {
        let entries = vec![
            entry("created_old", 50, 60, 0), // accessed just now
            entry("created_new", 50, 5, 55),
            entry("keep", 10, 1, 1),
        ];
        let policy = RetentionPolicy::max_bytes(60).with_order(EvictionOrder::OldestFirst);
        let plan = select_evictions(&entries, usage(&entries), &policy, None, now());
        assert_eq!(plan.victims[0], Fingerprint::digest(b"created_old"));
    }
}
