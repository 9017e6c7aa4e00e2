//! Round-batching interpreter.
//!
//! Every `one` / `many` node becomes exactly one [`Round`]. Cache hits are
//! answered without touching the source; everything else is sent to
//! `fetch_batch` once per node, deduplicated, and folded back into the cache.

use crate::config::{BatchCompleteness, BatchExecution, InterpreterConfig};
use async_trait::async_trait;
use batchwise_core::{
    AnyId, AppError, CacheKey, CachedValue, Environment, FetchError, FetchMany, FetchOne, FetchResult,
    Handler, Round,
};
use futures::future::try_join_all;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// The standard [`Handler`]: cache-first, one dispatch per node.
#[derive(Debug, Clone, Default)]
pub struct RoundBatchingInterpreter {
    config: InterpreterConfig,
}

impl RoundBatchingInterpreter {
    /// Create an interpreter with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interpreter with a validated configuration.
    pub fn with_config(config: InterpreterConfig) -> FetchResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Send `needed` to the source, split into chunks per the configuration.
    ///
    /// Responses of all chunks are merged. The first failing chunk's error is
    /// returned as is.
    async fn dispatch_chunks(
        &self,
        request: &FetchMany,
        needed: &[AnyId],
    ) -> Result<HashMap<AnyId, CachedValue>, AppError> {
        let chunks: Vec<&[AnyId]> = needed.chunks(self.config.chunk_size(needed.len())).collect();

        let responses = match self.config.batch_execution {
            BatchExecution::Sequential => {
                let mut responses = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    responses.push(request.dispatch(chunk).await?);
                }
                responses
            }
            BatchExecution::Parallel => {
                try_join_all(chunks.iter().map(|chunk| request.dispatch(chunk))).await?
            }
        };

        Ok(responses.into_iter().flatten().collect())
    }

    fn chunk_count(&self, needed: usize) -> usize {
        needed.div_ceil(self.config.chunk_size(needed))
    }
}

#[async_trait]
impl Handler for RoundBatchingInterpreter {
    async fn fetch_one(
        &self,
        request: FetchOne,
        env: Environment,
    ) -> FetchResult<(Environment, CachedValue)> {
        let source_id = request.source_id();
        let key = CacheKey::new(source_id.clone(), request.id().clone());
        let round = Round::one(source_id.clone(), request.id().clone());

        if let Some(value) = env.get(&key) {
            trace!(source = %source_id, id = ?request.id(), "cache hit");
            let env = env.with_round(round, Vec::new()).with_stats(1, 0, 0);
            return Ok((env, value));
        }

        let env = env
            .with_round(round, vec![request.id().clone()])
            .with_stats(0, 1, 1);
        debug!(source = %source_id, ids = 1, chunks = 1, "dispatching fetch");

        let mut response = request.dispatch().await.map_err(|err| {
            warn!(source = %source_id, error = %err, "data source failed");
            FetchError::Application(err)
        })?;

        match response.remove(request.id()) {
            Some(value) => Ok((env.with_cached(key, value.clone()), value)),
            None => {
                warn!(source = %source_id, id = ?request.id(), "data source omitted identifier");
                Err(FetchError::missing(source_id, vec![request.id().clone()], env))
            }
        }
    }

    async fn fetch_many(
        &self,
        request: FetchMany,
        env: Environment,
    ) -> FetchResult<(Environment, Vec<CachedValue>)> {
        let source_id = request.source_id();
        let key = |id: &AnyId| CacheKey::new(source_id.clone(), id.clone());
        let distinct = request.distinct_ids();
        let needed: Vec<AnyId> = distinct
            .iter()
            .filter(|id| !env.cache().contains(&key(id)))
            .cloned()
            .collect();

        let hits = distinct.len() - needed.len();
        let dispatches = if needed.is_empty() { 0 } else { self.chunk_count(needed.len()) };
        let env = env
            .with_round(
                Round::many(source_id.clone(), request.ids().to_vec()),
                needed.clone(),
            )
            .with_stats(hits, needed.len(), dispatches);

        if needed.is_empty() {
            trace!(source = %source_id, ids = distinct.len(), "batch served from cache");
            let mut values = Vec::with_capacity(request.ids().len());
            let mut missing = Vec::new();
            for id in request.ids() {
                match env.get(&key(id)) {
                    Some(value) => values.push(value),
                    None => missing.push(id.clone()),
                }
            }
            if !missing.is_empty() {
                warn!(source = %source_id, missing = missing.len(), "cache lost entries mid-round");
                return Err(FetchError::missing(source_id, dedup(missing), env));
            }
            return Ok((env, values));
        }

        debug!(
            source = %source_id,
            ids = needed.len(),
            cached = hits,
            chunks = dispatches,
            "dispatching batch"
        );

        let response = self.dispatch_chunks(&request, &needed).await.map_err(|err| {
            warn!(source = %source_id, error = %err, "data source failed");
            FetchError::Application(err)
        })?;

        let mut values = Vec::with_capacity(request.ids().len());
        let mut missing = Vec::new();
        for id in request.ids() {
            let found = match response.get(id) {
                Some(value) => Some(value.clone()),
                None => match self.config.completeness {
                    BatchCompleteness::FetchedOnly => None,
                    BatchCompleteness::MergeCached => env.get(&key(id)),
                },
            };
            match found {
                Some(value) => values.push(value),
                None => missing.push(id.clone()),
            }
        }

        if !missing.is_empty() {
            let missing = dedup(missing);
            warn!(
                source = %source_id,
                missing = missing.len(),
                requested = needed.len(),
                "data source response incomplete"
            );
            return Err(FetchError::missing(source_id, missing, env));
        }

        // Every requested id the source answered, including ids that were
        // already cached, so later nodes see the values this batch returned.
        let fetched: Vec<_> = distinct
            .iter()
            .filter_map(|id| Some((key(id), response.get(id)?.clone())))
            .collect();
        Ok((env.with_all_cached(fetched), values))
    }
}

fn dedup(ids: Vec<AnyId>) -> Vec<AnyId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
