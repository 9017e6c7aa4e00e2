//! Error types for batchwise operations

use crate::{AnyId, Environment, SourceId};
use std::sync::Arc;
use thiserror::Error;

/// Opaque application error.
///
/// Produced by [`crate::raise`] or by a data source whose `fetch_batch`
/// failed. The original error value is kept intact and can be recovered with
/// `downcast_ref`.
pub type AppError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for a fetch run.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Raised explicitly or propagated from a data source. Never wrapped.
    #[error(transparent)]
    Application(AppError),

    /// A data source response did not cover every requested identifier.
    ///
    /// Carries the environment as of the failing attempt: the cache before
    /// the round, and the round history including the round that failed.
    #[error("Data source {source_id} did not return identifiers {missing:?}")]
    MissingIdentities {
        source_id: SourceId,
        missing: Vec<AnyId>,
        environment: Box<Environment>,
    },

    #[error("Value from {source_id} has type {found}, expected {expected}")]
    TypeMismatch {
        source_id: SourceId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Handler returned {found} values for {source_id}, expected {expected}")]
    UnexpectedResultCount {
        source_id: SourceId,
        expected: usize,
        found: usize,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl FetchError {
    /// Wrap any error as an application error.
    pub fn application<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FetchError::Application(Arc::new(error))
    }

    /// Build a structural failure from the environment of the failing round.
    pub fn missing(source_id: SourceId, missing: Vec<AnyId>, environment: Environment) -> Self {
        FetchError::MissingIdentities {
            source_id,
            missing,
            environment: Box::new(environment),
        }
    }

    /// True for under-fetch failures raised by the interpreter itself.
    pub fn is_structural(&self) -> bool {
        matches!(self, FetchError::MissingIdentities { .. })
    }

    /// True for errors raised by the caller or a data source.
    pub fn is_application(&self) -> bool {
        matches!(self, FetchError::Application(_))
    }

    /// Environment snapshot carried by a structural failure.
    pub fn environment(&self) -> Option<&Environment> {
        match self {
            FetchError::MissingIdentities { environment, .. } => Some(environment.as_ref()),
            _ => None,
        }
    }

    /// Consume the error, returning the environment snapshot if there is one.
    pub fn into_environment(self) -> Option<Environment> {
        match self {
            FetchError::MissingIdentities { environment, .. } => Some(*environment),
            _ => None,
        }
    }
}

/// Result type alias for batchwise operations.
pub type FetchResult<T> = Result<T, FetchError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("backend offline: {0}")]
    struct Offline(&'static str);

    #[test]
    fn test_application_error_is_transparent() {
        let err = FetchError::application(Offline("users"));
        assert!(err.is_application());
        assert!(!err.is_structural());
        assert_eq!(err.to_string(), "backend offline: users");

        match err {
            FetchError::Application(inner) => {
                assert_eq!(inner.downcast_ref::<Offline>(), Some(&Offline("users")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_identities_carries_environment() {
        let env = Environment::new(crate::testing::MapCache::default());
        let run_id = env.run_id();
        let err = FetchError::missing(SourceId::new("users"), vec![AnyId::new(7u64)], env);

        assert!(err.is_structural());
        let msg = err.to_string();
        assert!(msg.contains("users"));
        assert!(msg.contains('7'));
        assert_eq!(err.environment().map(|e| e.run_id()), Some(run_id));
        assert_eq!(err.into_environment().map(|e| e.run_id()), Some(run_id));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "max_batch_size".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        let msg = format!("{}", FetchError::from(err));
        assert!(msg.contains("max_batch_size"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = FetchError::TypeMismatch {
            source_id: SourceId::new("posts"),
            expected: "u32",
            found: "alloc::string::String",
        };
        let msg = err.to_string();
        assert!(msg.contains("posts"));
        assert!(msg.contains("u32"));
        assert!(err.environment().is_none());
    }
}
