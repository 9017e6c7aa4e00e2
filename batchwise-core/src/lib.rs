//! batchwise Core - Fetch Algebra and Capabilities
//!
//! Describes data requests as values and defines the capabilities an
//! interpreter needs to execute them. This crate performs no I/O of its own.
//!
//! # Architecture
//!
//! ```text
//! Fetch<T> ──run_in──▶ Handler ──▶ DataSource::fetch_batch
//!     │                   │
//!     └── Environment ◀───┴── DataCache (persistent updates)
//! ```
//!
//! # Key Types
//!
//! - [`Fetch<T>`]: expression tree (pure, raise, one, many, and_then, zip)
//! - [`DataSource`]: named batch-fetch capability, the only I/O boundary
//! - [`DataCache`]: `(source, id)`-keyed cache with persistent update
//! - [`Environment`]: cache, round history and last-touched ids for one run
//! - [`Round`]: one attempt against one source (cache hits included)
//! - [`Handler`]: low-level node handler; the standard one is in
//!   `batchwise-engine`
//! - [`FetchError`]: application errors vs. structural under-fetch failures

mod cache;
mod combinators;
mod env;
mod error;
mod fetch;
mod identity;
mod request;
mod round;
mod source;

#[cfg(test)]
mod testing;

pub use cache::{make_key, CacheKey, CachedValue, DataCache};
pub use combinators::{coalesce, collect, join, many, one, pure, raise, sequence, traverse};
pub use env::Environment;
pub use error::{AppError, ConfigError, FetchError, FetchResult};
pub use fetch::{Fetch, FetchValue};
pub use identity::{AnyId, Identifier, SourceId};
pub use request::{FetchMany, FetchOne, Handler};
pub use round::{FetchStats, Round, RoundKind, Timestamp};
pub use source::{DataSource, DynDataSource, SharedSource};
