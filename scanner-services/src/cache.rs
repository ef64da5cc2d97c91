//! TTL-bounded key/value cache
//!
//! The single shared mutable store of the pipeline: market snapshots,
//! scan results, and alert cooldown markers all live here under the key
//! namespaces in [`keys`]. Values are stored as JSON documents, which
//! keeps decimal prices and timestamps bit-exact across round-trips
//! (decimals serialize as strings, instants as ISO-8601).

use parking_lot::RwLock;
use scanner_core::Platform;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cache key namespaces and TTLs used by the core pipeline.
pub mod keys {
    use super::*;

    /// TTL for per-platform market snapshots
    pub const MARKETS_TTL: Duration = Duration::from_secs(120);
    /// TTL for the latest-opportunities snapshot
    pub const OPPORTUNITIES_TTL: Duration = Duration::from_secs(120);
    /// TTL for timestamped scan results
    pub const SCAN_RESULTS_TTL: Duration = Duration::from_secs(3600);

    /// `markets:<PLATFORM>`
    pub fn markets(platform: Platform) -> String {
        format!("markets:{}", platform.short_name())
    }

    /// `opportunities:latest`
    pub fn opportunities_latest() -> String {
        "opportunities:latest".to_string()
    }

    /// `scan:results:<epochMs>`
    pub fn scan_results(epoch_ms: i64) -> String {
        format!("scan:results:{epoch_ms}")
    }

    /// `alert:sent:<idA>:<idB>`
    pub fn alert_sent(id_a: &str, id_b: &str) -> String {
        format!("alert:sent:{id_a}:{id_b}")
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
    approx_bytes: usize,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process TTL cache.
///
/// Reads of expired entries behave as misses; expired entries are swept
/// opportunistically on writes. Safe for concurrent access.
#[derive(Debug, Default)]
pub struct Cache {
    entries: RwLock<HashMap<String, Entry>>,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub keys: usize,
    pub memory_human: String,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key` for `ttl`. Serialization failures are
    /// logged and the write is dropped (callers treat the cache as
    /// best-effort).
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache write for '{}' dropped: {}", key, e);
                return;
            }
        };
        let approx_bytes = value.to_string().len();

        let mut entries = self.entries.write();
        entries.retain(|_, entry| !entry.is_expired());
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
                approx_bytes,
            },
        );
    }

    /// Fetch and rehydrate the value under `key`. Expired or missing keys
    /// return `None`; so do stored values that no longer deserialize.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = {
            let entries = self.entries.read();
            let entry = entries.get(key)?;
            if entry.is_expired() {
                return None;
            }
            entry.value.clone()
        };

        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Cache read for '{}' treated as miss: {}", key, e);
                None
            }
        }
    }

    /// Whether a live entry exists under `key`.
    pub fn exists(&self, key: &str) -> bool {
        let entries = self.entries.read();
        entries.get(key).map(|e| !e.is_expired()).unwrap_or(false)
    }

    /// Remove `key`. Returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        matches!(entries.remove(key), Some(entry) if !entry.is_expired())
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Occupancy snapshot: live key count and an approximate footprint.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let live: Vec<&Entry> = entries.values().filter(|e| !e.is_expired()).collect();
        let bytes: usize = live.iter().map(|e| e.approx_bytes).sum();
        CacheStats {
            keys: live.len(),
            memory_human: human_bytes(bytes),
        }
    }

    /// Lifecycle shutdown: drop all held state.
    pub fn close(&self) {
        debug!("Closing cache ({} keys dropped)", self.entries.read().len());
        self.clear();
    }
}

fn human_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
