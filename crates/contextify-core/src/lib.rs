//! # contextify-core
//!
//! Pure logic for contextify: data models, line chunking, the vector-store,
//! embedding and extractor collaborator traits, the sync planner, the sync
//! executor, and the query service.
//!
//! This crate does no filesystem, network, or database I/O of its own.
//! Every collaborator is passed in explicitly, so tests run against
//! [`store::memory::InMemoryStore`] and simple doubles.
//!
//! ## Flow
//!
//! ```text
//! scan (app) ──▶ plan::plan ──▶ sync::SyncExecutor ──▶ VectorStore
//!                   │                 │
//!                   └── VectorStore   ├── ContentExtractor
//!                                     ├── chunk::chunk_lines
//!                                     └── EmbeddingProvider
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod models;
pub mod plan;
pub mod query;
pub mod store;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use error::IndexError;
