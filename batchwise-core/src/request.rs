//! Fetch requests and the handler that executes them.
//!
//! [`FetchOne`] and [`FetchMany`] are the leaves of an expression that need a
//! data source. A [`Handler`] decides how they are satisfied: the standard
//! round-batching interpreter lives in `batchwise-engine`, and callers can
//! supply their own for testing or alternative policies.

use crate::{AnyId, AppError, CachedValue, Environment, FetchResult, SharedSource, SourceId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// A single-identifier request against one source.
#[derive(Clone)]
pub struct FetchOne {
    source: SharedSource,
    id: AnyId,
}

impl FetchOne {
    pub fn new(source: SharedSource, id: AnyId) -> Self {
        Self { source, id }
    }

    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    /// Ask the source for its identity. Each call reaches the source, so
    /// handlers resolve it once per request.
    pub fn source_id(&self) -> SourceId {
        self.source.source_id()
    }

    pub fn id(&self) -> &AnyId {
        &self.id
    }

    /// Call the source for this request's identifier.
    pub async fn dispatch(&self) -> Result<HashMap<AnyId, CachedValue>, AppError> {
        self.source.fetch_any(std::slice::from_ref(&self.id)).await
    }
}

impl fmt::Debug for FetchOne {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOne").field("id", &self.id).finish_non_exhaustive()
    }
}

/// A batched request for several identifiers against one source.
///
/// Identifiers are kept exactly as given, duplicates included.
#[derive(Clone)]
pub struct FetchMany {
    source: SharedSource,
    ids: Vec<AnyId>,
}

impl FetchMany {
    pub fn new(source: SharedSource, ids: Vec<AnyId>) -> Self {
        Self { source, ids }
    }

    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    /// Ask the source for its identity. Each call reaches the source, so
    /// handlers resolve it once per request.
    pub fn source_id(&self) -> SourceId {
        self.source.source_id()
    }

    pub fn ids(&self) -> &[AnyId] {
        &self.ids
    }

    /// Identifiers with duplicates removed, in first-occurrence order.
    pub fn distinct_ids(&self) -> Vec<AnyId> {
        let mut seen = std::collections::HashSet::with_capacity(self.ids.len());
        self.ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Call the source for an arbitrary subset of identifiers.
    pub async fn dispatch(&self, ids: &[AnyId]) -> Result<HashMap<AnyId, CachedValue>, AppError> {
        self.source.fetch_any(ids).await
    }
}

impl fmt::Debug for FetchMany {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchMany").field("ids", &self.ids).finish_non_exhaustive()
    }
}

/// Low-level node handler.
///
/// Receives the environment produced by the previous step and returns the
/// next one together with the fetched value(s). For [`FetchMany`] the values
/// must line up with [`FetchMany::ids`], duplicates included.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn fetch_one(
        &self,
        request: FetchOne,
        env: Environment,
    ) -> FetchResult<(Environment, CachedValue)>;

    async fn fetch_many(
        &self,
        request: FetchMany,
        env: Environment,
    ) -> FetchResult<(Environment, Vec<CachedValue>)>;
}
