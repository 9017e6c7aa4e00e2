//! batchwise Engine - Round-Batching Interpreter
//!
//! Executes [`batchwise_core::Fetch`] expressions: cache-first lookups,
//! one deduplicated `fetch_batch` per node, and a round history in the
//! returned environment.
//!
//! # Example
//!
//! ```ignore
//! use batchwise_core::{many, one};
//! use batchwise_engine::run_cached;
//! use batchwise_cache::InMemoryCache;
//!
//! let posts = Arc::new(PostSource::new(pool.clone()));
//! let users = Arc::new(UserSource::new(pool));
//! let authors = many(vec![1, 2, 2], &posts).and_then(move |posts| {
//!     many(posts.into_iter().map(|p| p.author_id), &users)
//! });
//!
//! let authors = run_cached(authors, InMemoryCache::new()).await?;
//! ```

mod config;
mod interpreter;
mod run;

pub use config::{BatchCompleteness, BatchExecution, InterpreterConfig};
pub use interpreter::RoundBatchingInterpreter;
pub use run::{run, run_cached, run_env, run_in, run_with, run_with_env};
