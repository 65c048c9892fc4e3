//! Cached per-target estimates with a fixed time to live.
//!
//! Running the block-building simulation takes the host's chainstate and
//! mempool locks, so repeated estimate calls within a short span reuse the
//! previous result instead. Many readers may consult the cache
//! concurrently; an update replaces the whole map under the exclusive
//! lock so no stale per-target entries linger.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use ebb_core::constants::CACHE_LIFE_SECS;
use ebb_core::types::BlockPercentiles;

struct CacheInner {
    estimates: BTreeMap<u32, BlockPercentiles>,
    last_updated: Instant,
}

/// A target → percentile map that goes stale [`CACHE_LIFE_SECS`] after the
/// last update.
///
/// Shared behind an `Arc`; it is never cloned or moved once handed out.
pub struct EstimateCache {
    inner: RwLock<CacheInner>,
    life: Duration,
}

impl EstimateCache {
    /// Cache with the default 30-second lifetime.
    pub fn new() -> Self {
        Self::with_life(Duration::from_secs(CACHE_LIFE_SECS))
    }

    /// Cache with a custom lifetime. Starts out stale.
    pub fn with_life(life: Duration) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                estimates: BTreeMap::new(),
                // Checked-sub keeps very short test lifetimes from
                // underflowing process start on some platforms.
                last_updated: Instant::now()
                    .checked_sub(life + Duration::from_secs(1))
                    .unwrap_or_else(Instant::now),
            }),
            life,
        }
    }

    /// The cached percentiles for `target`, if present and fresh.
    pub fn get(&self, target: u32) -> Option<BlockPercentiles> {
        let inner = self.inner.read();
        if inner.last_updated.elapsed() > self.life {
            return None;
        }
        let hit = inner.estimates.get(&target).copied();
        if hit.is_some() {
            debug!(target, "estimate cache hit");
        }
        hit
    }

    /// Replace the entire estimate map and restart the clock.
    pub fn update(&self, estimates: BTreeMap<u32, BlockPercentiles>) {
        let mut inner = self.inner.write();
        inner.estimates = estimates;
        inner.last_updated = Instant::now();
        debug!(targets = inner.estimates.len(), "estimate cache updated");
    }
}

impl Default for EstimateCache {
    fn default() -> Self {
        Self::new()
    }
}
