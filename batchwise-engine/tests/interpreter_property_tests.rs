//! Property-Based Tests for the Round-Batching Interpreter
//!
//! Driven with `futures::executor::block_on`; the interpreter spawns nothing
//! and needs no particular runtime.

use batchwise_cache::InMemoryCache;
use batchwise_core::{many, one, CacheKey, Environment, Fetch};
use batchwise_engine::{run_in, run_with_env, BatchCompleteness, InterpreterConfig, RoundBatchingInterpreter};
use batchwise_test_utils::generators::{ids_with_duplicates, request_and_cached};
use batchwise_test_utils::MockSource;
use futures::executor::block_on;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn squares() -> Arc<MockSource<u32, u64>> {
    Arc::new(MockSource::new("squares").with_entries((0u32..8).map(|id| (id, u64::from(id * id)))))
}

fn distinct(ids: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

proptest! {
    /// Property: a batch dispatches each uncached identifier exactly once, in
    /// first-occurrence order, and answers every requested position.
    #[test]
    fn prop_batch_dispatches_distinct_ids(ids in ids_with_duplicates(16)) {
        let source = squares();
        let env = Environment::new(InMemoryCache::new());

        let (env, values) = block_on(run_in(many(ids.clone(), &source), env))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let expected: Vec<u64> = ids.iter().map(|id| u64::from(id * id)).collect();
        prop_assert_eq!(values, expected);
        prop_assert_eq!(env.rounds().len(), 1);
        if ids.is_empty() {
            prop_assert_eq!(source.call_count(), 0);
        } else {
            prop_assert_eq!(source.calls(), vec![distinct(&ids)]);
        }
    }

    /// Property: with merge-cached completeness, only identifiers absent from
    /// the cache reach the source, and afterwards every identifier is cached.
    #[test]
    fn prop_cached_ids_are_never_dispatched((ids, cached) in request_and_cached()) {
        let source = squares();
        let cache = cached.iter().fold(InMemoryCache::new(), |cache, id| {
            cache.with_value("squares", *id, u64::from(id * id))
        });
        let interpreter = RoundBatchingInterpreter::with_config(
            InterpreterConfig::new().with_completeness(BatchCompleteness::MergeCached),
        )
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let (env, _) = block_on(run_with_env(many(ids.clone(), &source), &interpreter, Environment::new(cache)))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let cached: HashSet<u32> = cached.into_iter().collect();
        let dispatched: Vec<u32> = source.calls().into_iter().flatten().collect();
        prop_assert!(dispatched.iter().all(|id| !cached.contains(id)));
        prop_assert!(ids.iter().all(|id| env.get(&CacheKey::typed("squares", *id)).is_some()));
    }

    /// Property: rounds grow by one per fetch node and never for pure values.
    #[test]
    fn prop_rounds_grow_one_per_node(ids in ids_with_duplicates(8), pures in 0usize..4) {
        let source = squares();
        let fetch = ids.iter().fold(Fetch::pure(0u64), |acc, id| {
            let next = one(*id, &source);
            acc.and_then(move |sum| next.clone().map(move |v| sum + v))
        });
        let fetch = (0..pures).fold(fetch, |acc, _| acc.and_then(Fetch::pure));

        let (env, _) = block_on(run_in(fetch, Environment::new(InMemoryCache::new())))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(env.rounds().len(), ids.len());
        prop_assert_eq!(source.call_count(), distinct(&ids).len());
    }
}
