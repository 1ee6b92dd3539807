//! Disk-backed prediction cache.
//!
//! [`CacheStore`] keeps one JSON payload file per key plus a metadata index
//! (`cache_metadata.json`) recording timestamps, TTL and size for every
//! entry. Payloads are sharded into subdirectories named after the first
//! two characters of their file stem. Keys that are not filesystem-safe are
//! stored as `<sha256>.h.json`.
//!
//! # Durability
//!
//! Every file is written to a `.tmp` sibling, fsynced, then renamed over
//! the final path, so a reader (or a restarted process) never sees a torn
//! file. The index lives in memory and is flushed every
//! [`CacheConfig::flush_interval`] writes, on [`CacheStore::flush`], and
//! when the store is dropped. On open, the index and the payload files are
//! reconciled: entries whose payload vanished are dropped, and payloads or
//! temp files the index does not know about are deleted.
//!
//! # Expiry and eviction
//!
//! Reads check TTL lazily. Writes additionally sweep all expired entries
//! every [`CacheConfig::sweep_interval`] calls, and evict oldest-created
//! entries once the count exceeds [`CacheConfig::max_entries`].
//!
//! # Failure handling
//!
//! Per-entry I/O problems never escape [`CacheStore::get`]: a missing or
//! unreadable payload is logged, purged, and reported as a miss. Write
//! failures are logged and returned to the caller, who may ignore them.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, CacheMetadata};
use super::key::{CacheKey, hex_digest};
use crate::clock::{Clock, SystemClock};
use crate::telemetry;
use crate::{GenoscoreError, Result};

/// Name of the metadata index inside the cache root.
pub const METADATA_FILE: &str = "cache_metadata.json";

const PAYLOAD_EXT: &str = "json";
const TMP_SUFFIX: &str = ".tmp";
const MAX_PLAIN_STEM_LEN: usize = 128;
const HASHED_STEM_SUFFIX: &str = ".h";

/// Configuration for [`CacheStore`].
///
/// ```rust
/// # use genoscore::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .default_ttl(Duration::from_secs(24 * 3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied by [`CacheStore::set`]. Default: 7 days.
    pub default_ttl: Duration,
    /// Maximum number of entries kept. Default: 1,000.
    pub max_entries: usize,
    /// Sweep expired entries every N writes. Default: 100.
    pub sweep_interval: u64,
    /// Flush the metadata index every N writes. Default: 10.
    pub flush_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(7 * 24 * 3600),
            max_entries: 1_000,
            sweep_interval: 100,
            flush_interval: 10,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    pub fn sweep_interval(mut self, writes: u64) -> Self {
        self.sweep_interval = writes;
        self
    }

    pub fn flush_interval(mut self, writes: u64) -> Self {
        self.flush_interval = writes;
        self
    }

    /// Reject settings the store cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(GenoscoreError::Validation(
                "cache max_entries must be at least 1".into(),
            ));
        }
        if self.sweep_interval == 0 {
            return Err(GenoscoreError::Validation(
                "cache sweep_interval must be at least 1".into(),
            ));
        }
        if self.flush_interval == 0 {
            return Err(GenoscoreError::Validation(
                "cache flush_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Percentage of lookups that hit (0–100).
    pub hit_rate: f64,
    pub sets: u64,
    pub total_items: usize,
    pub total_size_bytes: u64,
    pub expirations: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    sets: u64,
    expirations: u64,
    evictions: u64,
}

#[derive(Debug)]
struct State {
    metadata: CacheMetadata,
    counters: Counters,
    writes_since_flush: u64,
    writes_since_sweep: u64,
    dirty: bool,
}

/// Content-addressed, TTL-bound, size-bounded persistent store.
///
/// All operations take `&self`; an internal mutex serialises index
/// mutation and file writes, so a store can be shared behind an `Arc`.
pub struct CacheStore {
    root: PathBuf,
    metadata_path: PathBuf,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Open (or create) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, config: CacheConfig) -> Result<Self> {
        Self::open_with_clock(root, config, Arc::new(SystemClock))
    }

    /// Open with an explicit clock.
    pub fn open_with_clock(
        root: impl Into<PathBuf>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            GenoscoreError::Configuration(format!(
                "failed to create cache dir {}: {e}",
                root.display()
            ))
        })?;
        let metadata_path = root.join(METADATA_FILE);
        let metadata = load_metadata(&metadata_path, clock.now());

        let store = Self {
            root,
            metadata_path,
            config,
            clock,
            state: Mutex::new(State {
                metadata,
                counters: Counters::default(),
                writes_since_flush: 0,
                writes_since_sweep: 0,
                dirty: false,
            }),
        };

        let mut st = store.lock();
        if store.reconcile(&mut st) {
            if let Err(e) = store.flush_locked(&mut st) {
                warn!(error = %e, "failed to persist reconciled cache metadata");
            }
        }
        info!(
            root = %store.root.display(),
            entries = st.metadata.items.len(),
            "opened prediction cache"
        );
        drop(st);
        Ok(store)
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a value.
    ///
    /// Returns `None` for unknown, expired, missing, or corrupt entries;
    /// the latter three are purged as a side effect.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let mut st = self.lock();
        let now = self.clock.now();

        let expired = match st.metadata.items.get(key.as_str()) {
            None => return self.miss(&mut st),
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            debug!(key = %key, "cache entry expired");
            self.remove_locked(&mut st, key.as_str());
            st.counters.expirations += 1;
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL).increment(1);
            return self.miss(&mut st);
        }

        let path = self.payload_path(key.as_str());
        match read_payload::<T>(&path) {
            Ok(value) => {
                if let Some(entry) = st.metadata.items.get_mut(key.as_str()) {
                    entry.last_accessed = now;
                }
                st.dirty = true;
                st.counters.hits += 1;
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(value)
            }
            Err(GenoscoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key = %key, path = %path.display(), "cache payload missing, dropping entry");
                st.metadata.items.remove(key.as_str());
                st.dirty = true;
                self.miss(&mut st)
            }
            Err(e @ GenoscoreError::CacheCorruption { .. }) => {
                warn!(key = %key, error = %e, "purging corrupt cache entry");
                self.remove_locked(&mut st, key.as_str());
                self.miss(&mut st)
            }
            Err(e) => {
                warn!(key = %key, path = %path.display(), error = %e, "failed to read cache payload");
                self.miss(&mut st)
            }
        }
    }

    /// Store a value with the default TTL.
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.config.default_ttl)
    }

    /// Store a value with an explicit TTL, rounded up to whole seconds.
    pub fn set_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) -> Result<()> {
        if key.as_str().is_empty() {
            return Err(GenoscoreError::Validation("cache key is empty".into()));
        }
        let bytes = serde_json::to_vec(value)?;

        let mut st = self.lock();
        let now = self.clock.now();

        st.writes_since_sweep += 1;
        if st.writes_since_sweep >= self.config.sweep_interval {
            st.writes_since_sweep = 0;
            self.sweep_locked(&mut st, now);
        }

        let path = self.payload_path(key.as_str());
        if let Err(e) = write_atomic(&path, &bytes) {
            warn!(key = %key, path = %path.display(), error = %e, "failed to write cache payload");
            return Err(e);
        }

        st.metadata.items.insert(
            key.as_str().to_string(),
            CacheEntry::new(now, ttl_secs(ttl), bytes.len() as u64),
        );
        st.counters.sets += 1;
        st.dirty = true;
        self.evict_locked(&mut st, key.as_str());

        st.writes_since_flush += 1;
        if st.writes_since_flush >= self.config.flush_interval {
            if let Err(e) = self.flush_locked(&mut st) {
                warn!(error = %e, "failed to flush cache metadata");
            }
        }
        Ok(())
    }

    /// Whether `key` is present and unexpired. Does not touch statistics.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let st = self.lock();
        let now = self.clock.now();
        st.metadata
            .items
            .get(key.as_str())
            .is_some_and(|e| !e.is_expired(now))
            && self.payload_path(key.as_str()).exists()
    }

    /// Remove one entry. Returns whether it was indexed.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut st = self.lock();
        let known = st.metadata.items.contains_key(key.as_str());
        self.remove_locked(&mut st, key.as_str());
        known
    }

    /// Number of indexed entries (expired ones included until swept).
    pub fn len(&self) -> usize {
        self.lock().metadata.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every payload and reset the index.
    ///
    /// Statistics counters are kept.
    pub fn clear(&self) -> Result<()> {
        let mut st = self.lock();
        let result = self.clear_locked(&mut st);
        match &result {
            Ok(()) => info!(root = %self.root.display(), "cache cleared"),
            Err(e) => warn!(root = %self.root.display(), error = %e, "failed to clear cache"),
        }
        result
    }

    /// Purge every expired entry now and persist the index.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> Result<usize> {
        let mut st = self.lock();
        let now = self.clock.now();
        let removed = self.sweep_locked(&mut st, now);
        self.flush_locked(&mut st)?;
        info!(removed, "cache sweep completed");
        Ok(removed)
    }

    /// Persist the metadata index.
    pub fn flush(&self) -> Result<()> {
        let mut st = self.lock();
        self.flush_locked(&mut st)
    }

    pub fn stats(&self) -> CacheStats {
        let st = self.lock();
        let c = &st.counters;
        let lookups = c.hits + c.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            c.hits as f64 / lookups as f64 * 100.0
        };
        CacheStats {
            hits: c.hits,
            misses: c.misses,
            hit_rate,
            sets: c.sets,
            total_items: st.metadata.items.len(),
            total_size_bytes: st.metadata.total_size(),
            expirations: c.expirations,
            evictions: c.evictions,
        }
    }

    // ------------------------------------------------------------------
    // Internals (callers hold the state lock)
    // ------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is never left half-updated across a panic point.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn miss<T>(&self, st: &mut State) -> Option<T> {
        st.counters.misses += 1;
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        None
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        let stem = file_stem(key);
        let shard: String = stem.chars().take(2).collect();
        self.root.join(shard).join(format!("{stem}.{PAYLOAD_EXT}"))
    }

    fn remove_locked(&self, st: &mut State, key: &str) {
        let path = self.payload_path(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to delete cache payload");
            }
        }
        if st.metadata.items.remove(key).is_some() {
            st.dirty = true;
        }
    }

    fn sweep_locked(&self, st: &mut State, now: f64) -> usize {
        let expired = st.metadata.expired_keys(now);
        for key in &expired {
            self.remove_locked(st, key);
        }
        let n = expired.len();
        if n > 0 {
            st.counters.expirations += n as u64;
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL).increment(n as u64);
            debug!(removed = n, "swept expired cache entries");
        }
        n
    }

    /// Remove oldest-created entries until the bound holds. The entry just
    /// written is never chosen.
    fn evict_locked(&self, st: &mut State, just_written: &str) {
        let excess = st
            .metadata
            .items
            .len()
            .saturating_sub(self.config.max_entries);
        if excess == 0 {
            return;
        }
        let victims: Vec<String> = st
            .metadata
            .keys_by_age()
            .into_iter()
            .filter(|k| k != just_written)
            .take(excess)
            .collect();
        for key in &victims {
            self.remove_locked(st, key);
        }
        st.counters.evictions += victims.len() as u64;
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(victims.len() as u64);
        debug!(evicted = victims.len(), "evicted oldest cache entries");
    }

    fn flush_locked(&self, st: &mut State) -> Result<()> {
        persist_metadata(&self.metadata_path, &st.metadata)?;
        st.dirty = false;
        st.writes_since_flush = 0;
        Ok(())
    }

    fn clear_locked(&self, st: &mut State) -> Result<()> {
        for dirent in fs::read_dir(&self.root)? {
            let path = dirent?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else if path != self.metadata_path {
                fs::remove_file(&path)?;
            }
        }
        st.metadata = CacheMetadata::empty(self.clock.now());
        st.dirty = true;
        self.flush_locked(st)
    }

    /// Restore the index/payload correspondence. Returns whether the index
    /// changed.
    fn reconcile(&self, st: &mut State) -> bool {
        let before = st.metadata.items.len();
        st.metadata
            .items
            .retain(|key, _| self.payload_path(key).is_file());
        let dangling = before - st.metadata.items.len();

        let expected: HashSet<PathBuf> = st
            .metadata
            .items
            .keys()
            .map(|k| self.payload_path(k))
            .collect();
        let mut orphans = 0usize;
        let mut temps = 0usize;
        for path in walk_cache_files(&self.root) {
            if path == self.metadata_path {
                continue;
            }
            let is_temp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TMP_SUFFIX));
            if !is_temp && expected.contains(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) if is_temp => temps += 1,
                Ok(()) => orphans += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete stray cache file"),
            }
        }

        if dangling + orphans + temps > 0 {
            info!(
                dangling_entries = dangling,
                orphan_payloads = orphans,
                temp_files = temps,
                "reconciled cache directory with metadata"
            );
        }
        dangling > 0
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        let st = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !st.dirty {
            return;
        }
        match persist_metadata(&self.metadata_path, &st.metadata) {
            Ok(()) => st.dirty = false,
            Err(e) => warn!(error = %e, "failed to flush cache metadata on shutdown"),
        }
    }
}

/// File stem for a key: the key itself when it is filesystem-safe,
/// otherwise its SHA-256 followed by [`HASHED_STEM_SUFFIX`]. Safe keys never
/// contain `.`, so the two forms cannot name the same file.
fn file_stem(key: &str) -> String {
    let safe = !key.is_empty()
        && key.len() <= MAX_PLAIN_STEM_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        key.to_string()
    } else {
        format!("{}{HASHED_STEM_SUFFIX}", hex_digest(key.as_bytes()))
    }
}

/// TTL in whole seconds. A non-zero remainder rounds up so short TTLs are
/// never shortened to zero.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

/// Load the metadata index, starting fresh on a missing or corrupt file.
fn load_metadata(path: &Path, now: f64) -> CacheMetadata {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheMetadata::empty(now),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache metadata, starting fresh");
            return CacheMetadata::empty(now);
        }
    };
    match serde_json::from_str(&content) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid cache metadata file, starting fresh");
            CacheMetadata::empty(now)
        }
    }
}

fn persist_metadata(path: &Path, metadata: &CacheMetadata) -> Result<()> {
    let json = serde_json::to_vec_pretty(metadata)?;
    write_atomic(path, &json)
}

fn read_payload<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| GenoscoreError::CacheCorruption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write `bytes` to `path` via a fsynced temp file and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path(path);
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Temp sibling used while writing `path` (`foo.json` → `foo.json.tmp`).
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

/// Regular files in the root and one level of shard directories.
fn walk_cache_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(root) else {
        return files;
    };
    for dirent in entries.flatten() {
        let path = dirent.path();
        if path.is_dir() {
            if let Ok(shard) = fs::read_dir(&path) {
                files.extend(
                    shard
                        .flatten()
                        .map(|e| e.path())
                        .filter(|p| p.is_file()),
                );
            }
        } else if path.is_file() {
            files.push(path);
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_keys_are_used_verbatim() {
        assert_eq!(file_stem("abc123_-"), "abc123_-");
    }

    #[test]
    fn unsafe_keys_are_hashed() {
        let stem = file_stem("../../etc/passwd");
        assert_eq!(stem, format!("{}.h", hex_digest(b"../../etc/passwd")));
        assert!(!stem.contains('/'));
    }

    #[test]
    fn hashed_stems_never_match_a_plain_key() {
        let digest = hex_digest(b"a/b");
        assert_ne!(file_stem("a/b"), file_stem(&digest));
    }

    #[test]
    fn sub_second_ttls_round_up() {
        assert_eq!(ttl_secs(Duration::from_millis(1)), 1);
        assert_eq!(ttl_secs(Duration::from_millis(1_500)), 2);
        assert_eq!(ttl_secs(Duration::from_secs(60)), 60);
        assert_eq!(ttl_secs(Duration::ZERO), 0);
    }

    #[test]
    fn temp_path_appends_suffix() {
        let p = temp_path(Path::new("/tmp/ab/abcdef.json"));
        assert_eq!(p, Path::new("/tmp/ab/abcdef.json.tmp"));
    }

    #[test]
    fn payloads_are_sharded_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path(), CacheConfig::default()).unwrap();
        let path = store.payload_path("deadbeef");
        assert_eq!(path, dir.path().join("de").join("deadbeef.json"));
    }

    #[test]
    fn config_validation() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(CacheConfig::new().max_entries(0).validate().is_err());
        assert!(CacheConfig::new().sweep_interval(0).validate().is_err());
        assert!(CacheConfig::new().flush_interval(0).validate().is_err());
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x").join("value.json");
        write_atomic(&path, b"{\"a\":1}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{\"a\":1}");
        assert!(!temp_path(&path).exists());
    }
}
