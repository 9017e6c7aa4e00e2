//! Identity types for data sources and request identifiers

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable token naming one logical data source.
///
/// Used as the cache namespace, so it must be unique per data source within
/// an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SourceId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// Bound for request identifiers.
///
/// Blanket-implemented; any hashable, cloneable, thread-safe type qualifies.
pub trait Identifier: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Identifier for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Object-safe view of an [`Identifier`].
trait DynIdentifier: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynIdentifier) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<I: Identifier> DynIdentifier for I {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynIdentifier) -> bool {
        other
            .as_any()
            .downcast_ref::<I>()
            .map_or(false, |other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<I>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// A request identifier with its concrete type erased.
///
/// Expressions against different sources carry identifiers of different
/// types through one environment. Equality and hashing take the concrete type
/// into account, so `1u32` and `1u64` never compare equal.
#[derive(Clone)]
pub struct AnyId(Arc<dyn DynIdentifier>);

impl AnyId {
    pub fn new<I: Identifier>(id: I) -> Self {
        Self(Arc::new(id))
    }

    /// Borrow the identifier as `I`, if that is its concrete type.
    pub fn downcast_ref<I: Identifier>(&self) -> Option<&I> {
        (*self.0).as_any().downcast_ref::<I>()
    }

    pub fn is<I: Identifier>(&self) -> bool {
        (*self.0).as_any().is::<I>()
    }
}

impl PartialEq for AnyId {
    fn eq(&self, other: &Self) -> bool {
        (*self.0).dyn_eq(&*other.0)
    }
}

impl Eq for AnyId {}

impl Hash for AnyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.0).dyn_hash(state);
    }
}

impl fmt::Debug for AnyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
