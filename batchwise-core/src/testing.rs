//! In-crate test doubles. The reference caches live in `batchwise-cache`.

use crate::{CacheKey, CachedValue, DataCache};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct MapCache {
    entries: HashMap<CacheKey, CachedValue>,
}

impl DataCache for MapCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.entries.get(key).cloned()
    }

    fn update(self: Arc<Self>, key: CacheKey, value: CachedValue) -> Arc<dyn DataCache> {
        let mut next = Arc::unwrap_or_clone(self);
        next.entries.insert(key, value);
        Arc::new(next)
    }
}
