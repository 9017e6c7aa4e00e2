//! In-memory mapping cache.

use batchwise_core::{CacheKey, CachedValue, DataCache, DataSource, Identifier, SourceId};
use std::collections::HashMap;
use std::sync::Arc;

/// Copy-on-write map from `(source, id)` to value.
///
/// `update` reuses the map when the caller held the only reference to the
/// cache and clones it otherwise, so earlier handles never see later writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: HashMap<CacheKey, CachedValue>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this cache with one more entry.
    pub fn with_entry(mut self, key: CacheKey, value: CachedValue) -> Self {
        self.entries.insert(key, value);
        self
    }

    /// Prime the cache with a typed value for `id` under `source_id`.
    pub fn with_value<I, V>(self, source_id: impl Into<SourceId>, id: I, value: V) -> Self
    where
        I: Identifier,
        V: Clone + Send + Sync + 'static,
    {
        self.with_entry(CacheKey::typed(source_id, id), CachedValue::new(value))
    }

    /// Prime the cache with a value as `source` would have produced it.
    pub fn with_source_value<S: DataSource>(self, source: &S, id: S::Id, value: S::Value) -> Self {
        self.with_entry(CacheKey::for_source(id, source), CachedValue::new(value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }
}

impl DataCache for InMemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.entries.get(key).cloned()
    }

    fn update(self: Arc<Self>, key: CacheKey, value: CachedValue) -> Arc<dyn DataCache> {
        Arc::new(Arc::unwrap_or_clone(self).with_entry(key, value))
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }
}
