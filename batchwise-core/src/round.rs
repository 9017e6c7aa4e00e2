//! Round records and fetch statistics

use crate::{AnyId, SourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Shape of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundKind {
    /// A single identifier.
    One(AnyId),
    /// A batch, recorded with the identifiers exactly as requested
    /// (duplicates and order preserved).
    Many(Vec<AnyId>),
}

impl RoundKind {
    /// Identifiers in this round, as requested.
    pub fn ids(&self) -> &[AnyId] {
        match self {
            RoundKind::One(id) => std::slice::from_ref(id),
            RoundKind::Many(ids) => ids,
        }
    }

    pub fn is_one(&self) -> bool {
        matches!(self, RoundKind::One(_))
    }

    pub fn is_many(&self) -> bool {
        matches!(self, RoundKind::Many(_))
    }
}

/// One attempt to satisfy identifiers from one data source.
///
/// Recorded for cache hits as well as real dispatches, and for attempts that
/// end in a structural failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    source_id: SourceId,
    kind: RoundKind,
    started_at: Timestamp,
}

impl Round {
    pub fn new(source_id: SourceId, kind: RoundKind) -> Self {
        Self {
            source_id,
            kind,
            started_at: Utc::now(),
        }
    }

    pub fn one(source_id: SourceId, id: AnyId) -> Self {
        Self::new(source_id, RoundKind::One(id))
    }

    pub fn many(source_id: SourceId, ids: Vec<AnyId>) -> Self {
        Self::new(source_id, RoundKind::Many(ids))
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    pub fn kind(&self) -> &RoundKind {
        &self.kind
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// Distinct identifiers served from the cache.
    pub cache_hits: u64,
    /// Distinct identifiers that had to be requested from a source.
    pub cache_misses: u64,
    /// Number of `fetch_batch` calls issued.
    pub dispatches: u64,
}

impl FetchStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    pub fn record(self, hits: usize, misses: usize, dispatches: usize) -> Self {
        Self {
            cache_hits: self.cache_hits + hits as u64,
            cache_misses: self.cache_misses + misses as u64,
            dispatches: self.dispatches + dispatches as u64,
        }
    }
}
