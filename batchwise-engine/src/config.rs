//! Interpreter configuration

use batchwise_core::{ConfigError, FetchResult};
use serde::{Deserialize, Serialize};

/// How the chunks of one batched round are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchExecution {
    /// One chunk after another.
    #[default]
    Sequential,
    /// All chunks at once; the first error wins.
    Parallel,
}

/// What a batched round checks before declaring an identifier missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchCompleteness {
    /// Every requested identifier must be in the fresh response, including
    /// identifiers that were already cached and therefore not requested.
    /// A batch mixing cached and uncached identifiers fails unless the source
    /// also returns the cached ones.
    #[default]
    FetchedOnly,
    /// Identifiers absent from the fresh response are looked up in the cache
    /// before the round is declared incomplete.
    MergeCached,
}

/// Configuration for [`crate::RoundBatchingInterpreter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Largest number of identifiers passed to one `fetch_batch` call.
    /// `None` sends every needed identifier of a round in one call.
    pub max_batch_size: Option<usize>,
    pub batch_execution: BatchExecution,
    pub completeness: BatchCompleteness,
}

impl InterpreterConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum batch size.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = Some(max);
        self
    }

    /// Set how chunks are dispatched.
    pub fn with_batch_execution(mut self, execution: BatchExecution) -> Self {
        self.batch_execution = execution;
        self
    }

    /// Set the completeness check for batched rounds.
    pub fn with_completeness(mut self, completeness: BatchCompleteness) -> Self {
        self.completeness = completeness;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_batch_size, when set, is > 0
    pub fn validate(&self) -> FetchResult<()> {
        if self.max_batch_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_batch_size".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Chunk size for a round that needs `needed` identifiers.
    pub(crate) fn chunk_size(&self, needed: usize) -> usize {
        self.max_batch_size.unwrap_or(needed).max(1)
    }
}
