//! The environment threaded through interpretation.
//!
//! Every interpretation step consumes an [`Environment`] and returns the next
//! one. Nothing is mutated behind a shared reference: the cache is updated
//! persistently and the round history is owned by the environment value, so a
//! clone taken before a step is unaffected by it.

use crate::{AnyId, CacheKey, CachedValue, DataCache, FetchStats, Round};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

/// Cache, round history and the identifiers touched by the latest step.
#[derive(Debug, Clone)]
pub struct Environment {
    run_id: Uuid,
    cache: Arc<dyn DataCache>,
    rounds: Vec<Round>,
    last_ids: Vec<AnyId>,
    stats: FetchStats,
}

impl Environment {
    /// Create the environment for a new run.
    pub fn new<C: DataCache>(cache: C) -> Self {
        Self::from_shared(Arc::new(cache))
    }

    /// Create the environment for a new run from an already shared cache,
    /// such as the cache of a previous run's environment.
    pub fn from_shared(cache: Arc<dyn DataCache>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            cache,
            rounds: Vec::new(),
            last_ids: Vec::new(),
            stats: FetchStats::default(),
        }
    }

    /// Identifier of the run this environment belongs to (UUIDv7).
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cache(&self) -> &Arc<dyn DataCache> {
        &self.cache
    }

    /// Rounds in evaluation order.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Identifiers the most recent step had to request from its source.
    ///
    /// Empty after a step answered entirely from the cache, including a
    /// single-identifier hit. A failed single-identifier fetch leaves that
    /// identifier here, and its miss is already counted in [`Self::stats`].
    pub fn last_ids(&self) -> &[AnyId] {
        &self.last_ids
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.cache.get(key)
    }

    /// Typed peek into the cache.
    pub fn cached<V: Any + Clone>(&self, key: &CacheKey) -> Option<V> {
        self.cache.get(key).and_then(|value| value.downcast::<V>())
    }

    /// Append a round and record the identifiers it touched.
    pub fn with_round(mut self, round: Round, last_ids: Vec<AnyId>) -> Self {
        self.rounds.push(round);
        self.last_ids = last_ids;
        self
    }

    /// Replace the identifiers touched by the latest step.
    pub fn with_last_ids(mut self, last_ids: Vec<AnyId>) -> Self {
        self.last_ids = last_ids;
        self
    }

    /// Persistently add one entry to the cache.
    pub fn with_cached(mut self, key: CacheKey, value: CachedValue) -> Self {
        self.cache = self.cache.update(key, value);
        self
    }

    /// Persistently add every entry to the cache, in order.
    pub fn with_all_cached<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (CacheKey, CachedValue)>,
    {
        self.cache = entries
            .into_iter()
            .fold(self.cache, |cache, (key, value)| cache.update(key, value));
        self
    }

    /// Account for cache hits, misses and dispatches of one step.
    pub fn with_stats(mut self, hits: usize, misses: usize, dispatches: usize) -> Self {
        self.stats = self.stats.record(hits, misses, dispatches);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MapCache;
    use crate::SourceId;

    #[test]
    fn test_new_environment_is_empty() {
        let env = Environment::new(MapCache::default());
        assert!(env.rounds().is_empty());
        assert!(env.last_ids().is_empty());
        assert_eq!(env.stats(), FetchStats::default());
        assert_eq!(env.run_id().get_version_num(), 7);
    }

    #[test]
    fn test_steps_do_not_affect_earlier_clones() {
        let before = Environment::new(MapCache::default());
        let key = CacheKey::typed("users", 1u64);

        let after = before
            .clone()
            .with_round(
                Round::one(SourceId::new("users"), AnyId::new(1u64)),
                vec![AnyId::new(1u64)],
            )
            .with_cached(key.clone(), CachedValue::new("x".to_string()))
            .with_stats(0, 1, 1);

        assert!(before.rounds().is_empty());
        assert!(before.get(&key).is_none());
        assert_eq!(before.stats().dispatches, 0);

        assert_eq!(after.rounds().len(), 1);
        assert_eq!(after.cached::<String>(&key).as_deref(), Some("x"));
        assert_eq!(after.last_ids(), &[AnyId::new(1u64)]);
        assert_eq!(after.run_id(), before.run_id());
    }

    #[test]
    fn test_with_all_cached_folds_in_order() {
        let key = CacheKey::typed("users", 1u64);
        let env = Environment::new(MapCache::default()).with_all_cached(vec![
            (key.clone(), CachedValue::new(1u32)),
            (key.clone(), CachedValue::new(2u32)),
        ]);
        assert_eq!(env.cached::<u32>(&key), Some(2));
        assert_eq!(env.cached::<String>(&key), None);
    }
}
