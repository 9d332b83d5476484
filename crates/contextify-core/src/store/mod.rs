//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is everything the planner, executor and query
//! service need from a vector database: keyed collections, lookup by the
//! `source` metadata field, add/update/delete, and nearest-neighbour query.
//! Backends: [`memory::InMemoryStore`] here, `SqliteStore` in the app crate.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexRecord, QueryMatch, StoredRecord};

/// Handle to one collection. A context maps 1:1 to a collection of the
/// same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionHandle {
    name: String,
}

impl CollectionHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Abstract vector store backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_or_create_collection`](VectorStore::get_or_create_collection) | Open a collection, creating it if needed |
/// | [`get_collection`](VectorStore::get_collection) | Open a collection only if it exists |
/// | [`get_by_source`](VectorStore::get_by_source) | All records whose `source` equals a path |
/// | [`list_sources`](VectorStore::list_sources) | Distinct `source` values in a collection |
/// | [`add`](VectorStore::add) | Insert new records |
/// | [`update`](VectorStore::update) | Overwrite records of an already-indexed source |
/// | [`delete_by_source`](VectorStore::delete_by_source) | Remove every record of a source |
/// | [`query`](VectorStore::query) | Nearest-neighbour search |
/// | [`count`](VectorStore::count) | Number of records in a collection |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get_or_create_collection(&self, name: &str) -> Result<CollectionHandle>;

    /// Returns `None` when the collection has never been created.
    async fn get_collection(&self, name: &str) -> Result<Option<CollectionHandle>>;

    /// Records with `source == source`, ordered by `chunk_id`.
    async fn get_by_source(
        &self,
        collection: &CollectionHandle,
        source: &str,
    ) -> Result<Vec<StoredRecord>>;

    /// Distinct sources in the collection, sorted.
    async fn list_sources(&self, collection: &CollectionHandle) -> Result<Vec<String>>;

    /// Insert records. Fails with `IndexError::DuplicateRecord` if any id
    /// already exists, in which case nothing is written.
    async fn add(&self, collection: &CollectionHandle, records: &[IndexRecord]) -> Result<()>;

    /// Overwrite records by id. Fails with `IndexError::UpdateOfUnindexedFile`
    /// if any record's source has no existing records, in which case nothing
    /// is written.
    ///
    /// The sync executor does not call this: a changed file can have fewer
    /// chunks than before, so it is replaced with `delete_by_source` + `add`.
    async fn update(&self, collection: &CollectionHandle, records: &[IndexRecord]) -> Result<()>;

    /// Delete every record with `source == source`. Returns how many were removed.
    async fn delete_by_source(&self, collection: &CollectionHandle, source: &str)
        -> Result<usize>;

    /// Up to `n_results` records closest to `embedding`, nearest first.
    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryMatch>>;

    async fn count(&self, collection: &CollectionHandle) -> Result<usize>;
}
