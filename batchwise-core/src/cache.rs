//! Cache capability and composite cache keys.
//!
//! A cache maps `(source identity, request identifier)` pairs to fetched
//! values. Updates are persistent: [`DataCache::update`] hands back the cache
//! that reflects the write, and any other handle to the previous cache keeps
//! observing the old contents.
//!
//! Values are stored type-erased as [`CachedValue`], which remembers the
//! concrete type name. Typed retrieval goes through
//! [`CachedValue::downcast`]; this is the only place a dynamic cast happens,
//! and a mismatch is reported rather than papered over.

use crate::{AnyId, DataSource, Identifier, SourceId};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Composite cache key.
///
/// The source identity namespaces the identifier, so two sources may use the
/// same identifier without colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source_id: SourceId,
    id: AnyId,
}

impl CacheKey {
    pub fn new(source_id: SourceId, id: AnyId) -> Self {
        Self { source_id, id }
    }

    /// Build the key for `id` as requested from `source`.
    pub fn for_source<S: DataSource>(id: S::Id, source: &S) -> Self {
        Self::new(source.identity(), AnyId::new(id))
    }

    /// Build a key from a source identity and a typed identifier.
    pub fn typed<I: Identifier>(source_id: impl Into<SourceId>, id: I) -> Self {
        Self::new(source_id.into(), AnyId::new(id))
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    pub fn id(&self) -> &AnyId {
        &self.id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.source_id, self.id)
    }
}

/// A fetched value with its concrete type erased.
#[derive(Clone)]
pub struct CachedValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CachedValue {
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<V>(),
        }
    }

    /// Name of the concrete type stored in this value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<V: Any>(&self) -> bool {
        self.value.is::<V>()
    }

    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref::<V>()
    }

    /// Clone the value out as `V`, or `None` if it holds another type.
    pub fn downcast<V: Any + Clone>(&self) -> Option<V> {
        self.downcast_ref::<V>().cloned()
    }
}

impl fmt::Debug for CachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Pluggable cache consulted before any data source is called.
///
/// # Laws
///
/// - `cache.update(k, v).get(&k) == Some(v)` for every key and value
/// - `update` never changes what other holders of the old cache observe
///
/// `update` takes the cache by `Arc`. An implementation may reuse the
/// allocation when it holds the only reference (nobody else can observe the
/// old value) and must copy otherwise.
pub trait DataCache: fmt::Debug + Send + Sync + 'static {
    /// Look up a cached value.
    fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    /// Return a cache that additionally maps `key` to `value`.
    fn update(self: Arc<Self>, key: CacheKey, value: CachedValue) -> Arc<dyn DataCache>;

    /// True if `key` has a cached value.
    fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }
}

/// Build the composite key for `id` against `source`.
pub fn make_key<S: DataSource>(id: S::Id, source: &S) -> CacheKey {
    CacheKey::for_source(id, source)
}
