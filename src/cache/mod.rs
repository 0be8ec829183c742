//! Time-bounded cache of risk assessments
//!
//! Expired entries are never returned. They are dropped lazily when read, or
//! in bulk through [`RiskCache::evict_expired`].

pub mod clock;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;
use solana_pubkey::Pubkey;

use crate::models::RiskMetrics;

pub use self::clock::{Clock, ManualClock, SystemClock};

/// A cached assessment
#[derive(Debug, Clone)]
struct CacheEntry {
    metrics: RiskMetrics,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.created_at + self.ttl <= now
    }
}

/// Snapshot of one live entry
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub asset: String,
    pub age_ms: u64,
    pub expires_in_ms: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of live entries
    pub size: usize,
    /// Live entries, sorted by asset
    pub entries: Vec<CacheEntryInfo>,
    /// Reads answered from the cache
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
}

/// Cache for risk metrics keyed by asset address
pub struct RiskCache {
    entries: RwLock<HashMap<Pubkey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for RiskCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskCache")
            .field("entries", &self.read().len())
            .finish_non_exhaustive()
    }
}

impl RiskCache {
    /// Cache driven by the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Cache driven by `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Pubkey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Pubkey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Get the cached metrics for an asset, if present and not expired
    pub fn get(&self, asset: &Pubkey) -> Option<RiskMetrics> {
        let now = self.clock.now();

        let expired = match self.read().get(asset) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.metrics.clone());
            }
            Some(_) => true,
            None => false,
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        if expired {
            let mut entries = self.write();
            // Re-check: another writer may have refreshed it meanwhile
            if entries.get(asset).map(|e| e.is_expired(now)).unwrap_or(false) {
                entries.remove(asset);
                debug!("Evicted expired risk entry for {}", asset);
            }
        }
        None
    }

    /// Store metrics for an asset, replacing any previous entry
    pub fn put(&self, asset: Pubkey, metrics: RiskMetrics, ttl: Duration) {
        let entry = CacheEntry {
            metrics,
            created_at: self.clock.now(),
            ttl,
        };
        self.write().insert(asset, entry);
        debug!("Cached risk metrics for {} (ttl {:?})", asset, ttl);
    }

    /// Drop every expired entry, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Evicted {} expired risk entries", removed);
        }
        removed
    }

    /// Statistics over live entries
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.read();

        let mut live: Vec<CacheEntryInfo> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(asset, entry)| {
                let age = now.saturating_duration_since(entry.created_at);
                CacheEntryInfo {
                    asset: asset.to_string(),
                    age_ms: age.as_millis() as u64,
                    expires_in_ms: entry.ttl.saturating_sub(age).as_millis() as u64,
                }
            })
            .collect();
        live.sort_by(|a, b| a.asset.cmp(&b.asset));

        CacheStats {
            size: live.len(),
            entries: live,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.write().clear();
        debug!("Cleared risk cache");
    }
}
