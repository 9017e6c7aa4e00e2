//! Run entry points.
//!
//! Each entry point creates (or resumes) an [`Environment`], evaluates the
//! expression inside a `fetch_run` span and reports completion.

use crate::RoundBatchingInterpreter;
use batchwise_cache::NoopCache;
use batchwise_core::{DataCache, Environment, Fetch, FetchResult, FetchValue, Handler};
use tracing::{debug, debug_span, warn, Instrument};

/// Evaluate `fetch` with the standard interpreter and no caching across nodes.
pub async fn run<T: FetchValue>(fetch: Fetch<T>) -> FetchResult<T> {
    run_cached(fetch, NoopCache).await
}

/// Evaluate `fetch` starting from `cache`.
pub async fn run_cached<T, C>(fetch: Fetch<T>, cache: C) -> FetchResult<T>
where
    T: FetchValue,
    C: DataCache,
{
    let (_, value) = run_in(fetch, Environment::new(cache)).await?;
    Ok(value)
}

/// Evaluate `fetch` starting from `cache` and return the final environment.
pub async fn run_env<T, C>(fetch: Fetch<T>, cache: C) -> FetchResult<Environment>
where
    T: FetchValue,
    C: DataCache,
{
    let (env, _) = run_in(fetch, Environment::new(cache)).await?;
    Ok(env)
}

/// Evaluate `fetch` from a caller-supplied environment.
///
/// Useful to resume after a structural failure: take the environment out of
/// the error, prime its cache, and run a clone of the same expression again.
pub async fn run_in<T: FetchValue>(
    fetch: Fetch<T>,
    env: Environment,
) -> FetchResult<(Environment, T)> {
    run_with_env(fetch, &RoundBatchingInterpreter::new(), env).await
}

/// Evaluate `fetch` with a caller-supplied handler and no caching.
pub async fn run_with<T, H>(fetch: Fetch<T>, handler: &H) -> FetchResult<T>
where
    T: FetchValue,
    H: Handler,
{
    let (_, value) = run_with_env(fetch, handler, Environment::new(NoopCache)).await?;
    Ok(value)
}

/// Evaluate `fetch` with a caller-supplied handler from `env`.
pub async fn run_with_env<T, H>(
    fetch: Fetch<T>,
    handler: &H,
    env: Environment,
) -> FetchResult<(Environment, T)>
where
    T: FetchValue,
    H: Handler,
{
    let span = debug_span!("fetch_run", run_id = %env.run_id());
    let rounds_before = env.rounds().len();

    let result = fetch.run_in(handler, env).instrument(span.clone()).await;

    span.in_scope(|| match &result {
        Ok((env, _)) => {
            let stats = env.stats();
            debug!(
                rounds = env.rounds().len().saturating_sub(rounds_before),
                cache_hits = stats.cache_hits,
                cache_misses = stats.cache_misses,
                dispatches = stats.dispatches,
                hit_rate = stats.hit_rate(),
                "fetch run completed"
            );
        }
        Err(err) => {
            warn!(
                structural = err.is_structural(),
                rounds = err.environment().map(|env| env.rounds().len()),
                error = %err,
                "fetch run failed"
            );
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchwise_cache::InMemoryCache;
    use async_trait::async_trait;
    use batchwise_core::{AnyId, CacheKey, CachedValue, FetchError, FetchMany, FetchOne, Round};
    use batchwise_test_utils::MockSource;
    use std::sync::Arc;

    /// Drops the incoming environment and answers from a fresh one.
    struct Forgetful;

    #[async_trait]
    impl Handler for Forgetful {
        async fn fetch_one(
            &self,
            _request: FetchOne,
            _env: Environment,
        ) -> FetchResult<(Environment, CachedValue)> {
            Ok((Environment::new(NoopCache), CachedValue::new("fresh".to_string())))
        }

        async fn fetch_many(
            &self,
            request: FetchMany,
            _env: Environment,
        ) -> FetchResult<(Environment, Vec<CachedValue>)> {
            let values = request.ids().iter().map(|_| CachedValue::new("fresh".to_string())).collect();
            Ok((Environment::new(NoopCache), values))
        }
    }

    #[tokio::test]
    async fn test_run_pure_without_rounds() {
        let env = run_env(Fetch::pure(3), NoopCache).await.unwrap();
        assert!(env.rounds().is_empty());
        assert_eq!(run(Fetch::pure(3)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_with_noop_cache_refetches() {
        let users = Arc::new(MockSource::new("users").with_entries([(1u32, "a".to_string())]));
        let fetch = Fetch::one(1, &users).zip(Fetch::one(1, &users));

        assert_eq!(run(fetch).await.unwrap(), ("a".to_string(), "a".to_string()));
        assert_eq!(users.call_count(), 2);
    }

    #[tokio::test]
    async fn test_run_cached_reuses_values() {
        let users = Arc::new(MockSource::new("users").with_entries([(1u32, "a".to_string())]));
        let fetch = Fetch::one(1, &users).zip(Fetch::one(1, &users));

        let value = run_cached(fetch, InMemoryCache::new()).await.unwrap();
        assert_eq!(value.1, "a");
        assert_eq!(users.call_count(), 1);
    }

    #[tokio::test]
    async fn test_run_in_keeps_run_id_and_history() {
        let users = Arc::new(MockSource::new("users").with_entries([(1u32, "a".to_string())]));
        let start = Environment::new(InMemoryCache::new());
        let run_id = start.run_id();

        let (env, _) = run_in(Fetch::one(1, &users), start).await.unwrap();
        let (env, _) = run_in(Fetch::one(1, &users), env).await.unwrap();

        assert_eq!(env.run_id(), run_id);
        assert_eq!(env.rounds().len(), 2);
        assert_eq!(env.cached::<String>(&CacheKey::typed("users", 1u32)).as_deref(), Some("a"));
        assert_eq!(users.call_count(), 1);
    }

    #[tokio::test]
    async fn test_run_surfaces_structural_failure() {
        let users = Arc::new(MockSource::<u32, String>::new("users"));
        let err = run(Fetch::one(1, &users)).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingIdentities { .. }));
    }

    #[tokio::test]
    async fn test_handler_returning_shorter_history_is_logged() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let users = Arc::new(MockSource::<u32, String>::new("users"));
        let start = Environment::new(NoopCache).with_round(
            Round::one("users".into(), AnyId::new(9u32)),
            vec![AnyId::new(9u32)],
        );

        let (env, value) = run_with_env(Fetch::one(1, &users), &Forgetful, start).await.unwrap();

        assert_eq!(value, "fresh");
        assert!(env.rounds().is_empty());
        assert_eq!(users.call_count(), 0);
    }
}
