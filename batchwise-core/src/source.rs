//! DataSource capability.
//!
//! `fetch_batch` is the only place batchwise performs I/O. Everything else is
//! bookkeeping over the expression tree and the environment.

use crate::{AnyId, AppError, CachedValue, Identifier, SourceId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A named source of values that can be fetched in batches.
///
/// # Contract
///
/// - `identity()` is stable and unique among the sources used in one run
/// - `fetch_batch` may omit requested identifiers; an omission means the
///   value could not be fetched
/// - entries for identifiers that were not requested are ignored
///
/// # Example
///
/// ```ignore
/// struct Users { db: Pool }
///
/// #[async_trait]
/// impl DataSource for Users {
///     type Id = UserId;
///     type Value = User;
///     type Error = sqlx::Error;
///
///     fn identity(&self) -> SourceId {
///         SourceId::new("users")
///     }
///
///     async fn fetch_batch(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, sqlx::Error> {
///         let rows = self.db.users_by_ids(ids).await?;
///         Ok(rows.into_iter().map(|u| (u.id, u)).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Identifier type for requests against this source.
    type Id: Identifier;

    /// Value type produced for each identifier.
    type Value: Clone + Send + Sync + 'static;

    /// Error type of a failed batch.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Cache namespace for this source.
    fn identity(&self) -> SourceId;

    /// Fetch every identifier in `ids` in one call.
    async fn fetch_batch(
        &self,
        ids: &[Self::Id],
    ) -> Result<HashMap<Self::Id, Self::Value>, Self::Error>;
}

/// Type-erased view of a [`DataSource`], as stored in expression nodes.
///
/// Blanket-implemented for every `DataSource`. Custom handlers use it to
/// dispatch requests without knowing the concrete source type.
#[async_trait]
pub trait DynDataSource: Send + Sync {
    fn source_id(&self) -> SourceId;

    /// Fetch erased identifiers. Identifiers of a foreign type are skipped.
    async fn fetch_any(&self, ids: &[AnyId]) -> Result<HashMap<AnyId, CachedValue>, AppError>;
}

#[async_trait]
impl<S: DataSource> DynDataSource for S {
    fn source_id(&self) -> SourceId {
        DataSource::identity(self)
    }

    async fn fetch_any(&self, ids: &[AnyId]) -> Result<HashMap<AnyId, CachedValue>, AppError> {
        let typed: Vec<S::Id> = ids
            .iter()
            .filter_map(|id| id.downcast_ref::<S::Id>().cloned())
            .collect();

        let fetched = self
            .fetch_batch(&typed)
            .await
            .map_err(|err| Arc::new(err) as AppError)?;

        Ok(fetched
            .into_iter()
            .map(|(id, value)| (AnyId::new(id), CachedValue::new(value)))
            .collect())
    }
}

/// Shared handle to an erased data source.
pub type SharedSource = Arc<dyn DynDataSource>;
