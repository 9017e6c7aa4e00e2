//! batchwise Test Utilities
//!
//! Shared test infrastructure for the batchwise workspace:
//! - Mock data sources that record every call
//! - An instrumented cache that counts reads and writes
//! - Proptest generators for identifier lists
//! - Tracing setup for tests

pub use batchwise_cache::InMemoryCache;
pub use batchwise_core::{
    AnyId, CacheKey, CachedValue, DataCache, DataSource, Environment, FetchError, FetchResult,
    Identifier, SourceId,
};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// MOCK DATA SOURCE
// ============================================================================

/// Error returned by a [`MockSource`] configured to fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mock source {source_id} failed: {message}")]
pub struct MockSourceError {
    pub source_id: SourceId,
    pub message: String,
}

/// In-memory data source with scripted answers.
///
/// Answers every requested identifier it has an entry for, except the ones
/// marked as omitted, and appends any configured extra entries to every
/// response.
#[derive(Debug)]
pub struct MockSource<I, V> {
    source_id: SourceId,
    entries: HashMap<I, V>,
    omitted: HashSet<I>,
    extras: HashMap<I, V>,
    failure: Option<String>,
    calls: Mutex<Vec<Vec<I>>>,
    identity_calls: AtomicUsize,
}

impl<I: Identifier, V: Clone + Send + Sync + 'static> MockSource<I, V> {
    pub fn new(source_id: impl Into<SourceId>) -> Self {
        Self {
            source_id: source_id.into(),
            entries: HashMap::new(),
            omitted: HashSet::new(),
            extras: HashMap::new(),
            failure: None,
            calls: Mutex::new(Vec::new()),
            identity_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entry(mut self, id: I, value: V) -> Self {
        self.entries.insert(id, value);
        self
    }

    pub fn with_entries(mut self, entries: impl IntoIterator<Item = (I, V)>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Leave `id` out of every response even though an entry exists.
    pub fn omitting(mut self, id: I) -> Self {
        self.omitted.insert(id);
        self
    }

    /// Add an unrequested entry to every response.
    pub fn with_extra(mut self, id: I, value: V) -> Self {
        self.extras.insert(id, value);
        self
    }

    /// Fail every `fetch_batch` call with `message`.
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Identifiers passed to each `fetch_batch` call, in call order.
    pub fn calls(&self) -> Vec<Vec<I>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of times `identity()` was called.
    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    /// The error this source fails with, if configured to fail.
    pub fn error(&self) -> Option<MockSourceError> {
        self.failure.as_ref().map(|message| MockSourceError {
            source_id: self.source_id.clone(),
            message: message.clone(),
        })
    }
}

#[async_trait]
impl<I: Identifier, V: Clone + Send + Sync + 'static> DataSource for MockSource<I, V> {
    type Id = I;
    type Value = V;
    type Error = MockSourceError;

    fn identity(&self) -> SourceId {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        self.source_id.clone()
    }

    async fn fetch_batch(&self, ids: &[I]) -> Result<HashMap<I, V>, MockSourceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ids.to_vec());

        if let Some(err) = self.error() {
            return Err(err);
        }

        let mut response: HashMap<I, V> = ids
            .iter()
            .filter(|id| !self.omitted.contains(*id))
            .filter_map(|id| self.entries.get(id).map(|value| (id.clone(), value.clone())))
            .collect();
        response.extend(self.extras.iter().map(|(id, value)| (id.clone(), value.clone())));
        Ok(response)
    }
}

// ============================================================================
// INSTRUMENTED CACHE
// ============================================================================

/// Shared read/write counters of a [`CountingCache`] and its descendants.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    gets: Arc<AtomicUsize>,
    updates: Arc<AtomicUsize>,
}

impl CacheCounters {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

/// [`InMemoryCache`] that counts `get` and `update` calls.
///
/// Caches produced by `update` share the counters of the cache they came
/// from, so a handle taken before a run sees the whole run.
#[derive(Debug, Clone, Default)]
pub struct CountingCache {
    inner: InMemoryCache,
    counters: CacheCounters,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value<I, V>(mut self, source_id: impl Into<SourceId>, id: I, value: V) -> Self
    where
        I: Identifier,
        V: Clone + Send + Sync + 'static,
    {
        self.inner = self.inner.with_value(source_id, id, value);
        self
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters.clone()
    }
}

impl DataCache for CountingCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.counters.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn update(self: Arc<Self>, key: CacheKey, value: CachedValue) -> Arc<dyn DataCache> {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        let CountingCache { inner, counters } = Arc::unwrap_or_clone(self);
        Arc::new(CountingCache {
            inner: inner.with_entry(key, value),
            counters,
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use proptest::prelude::*;

    /// Identifier lists drawn from a small range, so duplicates are common.
    pub fn ids_with_duplicates(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(0u32..8, 0..=max_len)
    }

    /// A non-empty request list plus the identifiers to pre-cache.
    pub fn request_and_cached() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
        (
            proptest::collection::vec(0u32..8, 1..12),
            proptest::collection::vec(0u32..8, 0..6),
        )
    }
}

// ============================================================================
// TRACING
// ============================================================================

/// Install a fmt subscriber writing through the test harness.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_scripts_responses() {
        let source = MockSource::new("users")
            .with_entries([(1u32, "a"), (2, "b")])
            .omitting(2)
            .with_extra(9, "z");

        let response = source.fetch_batch(&[1, 2, 3]).await.unwrap();

        assert_eq!(response.get(&1), Some(&"a"));
        assert!(!response.contains_key(&2));
        assert!(!response.contains_key(&3));
        assert_eq!(response.get(&9), Some(&"z"));
        assert_eq!(source.calls(), vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_mock_source_failure_records_call() {
        let source = MockSource::<u32, String>::new("users").fail_with("offline");

        let err = source.fetch_batch(&[1]).await.unwrap_err();
        assert_eq!(err.message, "offline");
        assert_eq!(err.source_id, SourceId::new("users"));
        assert_eq!(source.call_count(), 1);
    }

    #[test]
    fn test_counting_cache_shares_counters() {
        let cache = CountingCache::new().with_value("users", 1u32, "a".to_string());
        let counters = cache.counters();
        let key = CacheKey::typed("users", 2u32);

        let updated = Arc::new(cache).update(key.clone(), CachedValue::new("b".to_string()));
        assert!(updated.get(&key).is_some());
        assert!(updated.get(&CacheKey::typed("users", 1u32)).is_some());

        assert_eq!(counters.updates(), 1);
        assert_eq!(counters.gets(), 2);
    }

    #[test]
    fn test_init_test_tracing_is_repeatable() {
        init_test_tracing();
        init_test_tracing();
    }
}
