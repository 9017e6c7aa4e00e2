//! Cache that never caches.

use batchwise_core::{CacheKey, CachedValue, DataCache};
use std::sync::Arc;

/// A cache with no entries.
///
/// Every lookup misses, so every fetch reaches its data source. Used by
/// `batchwise_engine::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopCache;

impl DataCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<CachedValue> {
        None
    }

    fn update(self: Arc<Self>, _key: CacheKey, _value: CachedValue) -> Arc<dyn DataCache> {
        self
    }
}
