//! Persistent cache bookkeeping: per-entry records and the metadata index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Version string written into new metadata files.
pub const METADATA_VERSION: &str = "1.0";

/// Index record for one stored payload.
///
/// Timestamps are Unix seconds. Only `last_accessed` changes after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the payload was written.
    pub created: f64,
    /// Last successful read (or `created` if never read).
    pub last_accessed: f64,
    /// Time-to-live in seconds.
    pub ttl: u64,
    /// Serialized payload size in bytes.
    pub size: u64,
}

impl CacheEntry {
    pub fn new(now: f64, ttl: u64, size: u64) -> Self {
        Self {
            created: now,
            last_accessed: now,
            ttl,
            size,
        }
    }

    /// An entry is expired once strictly more than `ttl` seconds have passed.
    pub fn is_expired(&self, now: f64) -> bool {
        now - self.created > self.ttl as f64
    }
}

/// Durable index of everything in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(default)]
    pub items: BTreeMap<String, CacheEntry>,
    /// When this index was first created (or last cleared).
    pub created: f64,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    METADATA_VERSION.to_string()
}

impl CacheMetadata {
    /// An empty index stamped with `now`.
    pub fn empty(now: f64) -> Self {
        Self {
            items: BTreeMap::new(),
            created: now,
            version: default_version(),
        }
    }

    /// Sum of payload sizes.
    pub fn total_size(&self) -> u64 {
        self.items.values().map(|e| e.size).sum()
    }

    /// Keys ordered oldest-created first (ties broken by key).
    pub fn keys_by_age(&self) -> Vec<String> {
        let mut keys: Vec<(&String, f64)> =
            self.items.iter().map(|(k, e)| (k, e.created)).collect();
        keys.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        keys.into_iter().map(|(k, _)| k.clone()).collect()
    }

    /// Keys whose entries are expired at `now`.
    pub fn expired_keys(&self, now: f64) -> Vec<String> {
        self.items
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strict() {
        let entry = CacheEntry::new(100.0, 10, 5);
        assert!(!entry.is_expired(110.0));
        assert!(entry.is_expired(110.001));
    }

    #[test]
    fn keys_by_age_sorts_on_creation() {
        let mut meta = CacheMetadata::empty(0.0);
        meta.items.insert("b".into(), CacheEntry::new(3.0, 60, 1));
        meta.items.insert("a".into(), CacheEntry::new(2.0, 60, 1));
        meta.items.insert("c".into(), CacheEntry::new(1.0, 60, 1));
        assert_eq!(meta.keys_by_age(), vec!["c", "a", "b"]);
    }

    #[test]
    fn parses_legacy_file_without_version() {
        let json = r#"{"items": {"k": {"created": 1.0, "last_accessed": 2.0, "ttl": 60, "size": 9}}, "created": 0.5}"#;
        let meta: CacheMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.version, METADATA_VERSION);
        assert_eq!(meta.total_size(), 9);
    }
}
