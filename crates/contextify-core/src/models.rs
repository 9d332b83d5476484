//! Core data models used throughout contextify.
//!
//! These types represent the files, index records, and query matches that
//! flow through the scan → plan → sync → query pipeline.

use std::path::PathBuf;

use serde::Serialize;

/// A file discovered by the tree scanner.
///
/// Created fresh on every scan and consumed by the sync planner; never
/// persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Fully-resolved location used for reading the file.
    pub absolute_path: PathBuf,
    /// Path relative to the scan root, `/`-separated. This is the stable
    /// identity of the indexed document (`source` in record metadata).
    pub relative_path: String,
    /// Lowercase 64-hex SHA-256 of the raw file bytes.
    pub content_hash: String,
}

/// Build the store key for one chunk of a source: `"{relative_path}_{chunk_id}"`.
pub fn record_id(source: &str, chunk_id: usize) -> String {
    format!("{}_{}", source, chunk_id)
}

/// A fully-typed record to be written to the vector store.
///
/// One per `(source, chunk_id)` pair within a collection. Every record of a
/// source carries the hash of the whole file at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub source: String,
    pub chunk_id: usize,
    pub total_chunks: usize,
    pub hash: String,
    pub document: String,
    pub embedding: Vec<f32>,
}

impl IndexRecord {
    /// Build the record for chunk `chunk_id` of `file`.
    pub fn for_chunk(
        file: &MatchedFile,
        chunk_id: usize,
        total_chunks: usize,
        document: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: record_id(&file.relative_path, chunk_id),
            source: file.relative_path.clone(),
            chunk_id,
            total_chunks,
            hash: file.content_hash.clone(),
            document,
            embedding,
        }
    }

    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            source: self.source.clone(),
            chunk_id: Some(self.chunk_id),
            total_chunks: Some(self.total_chunks),
            hash: Some(self.hash.clone()),
        }
    }
}

/// Metadata as read back from the store.
///
/// Everything except `source` is optional: rows written by older versions
/// or by hand may lack fields, and the planner must see that rather than
/// a placeholder value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    pub source: String,
    pub chunk_id: Option<usize>,
    pub total_chunks: Option<usize>,
    pub hash: Option<String>,
}

/// A record returned by a store lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    pub metadata: RecordMetadata,
    pub document: Option<String>,
    pub has_embedding: bool,
}

/// A ranked nearest-neighbour match. Lower `distance` is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    pub id: String,
    pub source: String,
    pub chunk_id: Option<usize>,
    pub distance: f32,
    pub document: Option<String>,
}
