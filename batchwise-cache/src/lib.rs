//! batchwise Cache - Reference Cache Implementations
//!
//! Two implementations of [`batchwise_core::DataCache`]:
//!
//! - [`NoopCache`]: never holds anything; `update` hands back the same cache
//! - [`InMemoryCache`]: a copy-on-write map from `(source, id)` to value
//!
//! Both honour the persistence law: an update is only visible through the
//! cache it returns.

pub mod in_memory;
pub mod noop;

pub use in_memory::InMemoryCache;
pub use noop::NoopCache;
