//! In-memory [`VectorStore`] implementation for tests and embedding in
//! other tools.
//!
//! Collections are `BTreeMap`s keyed by record id behind a single
//! `std::sync::RwLock`. Query is brute-force cosine distance.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::IndexError;
use crate::models::{IndexRecord, QueryMatch, RecordMetadata, StoredRecord};

use super::{CollectionHandle, VectorStore};

struct StoredEntry {
    metadata: RecordMetadata,
    document: Option<String>,
    embedding: Option<Vec<f32>>,
}

impl StoredEntry {
    fn from_record(record: &IndexRecord) -> Self {
        Self {
            metadata: record.metadata(),
            document: Some(record.document.clone()),
            embedding: Some(record.embedding.clone()),
        }
    }

    fn to_stored(&self, id: &str) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            metadata: self.metadata.clone(),
            document: self.document.clone(),
            has_embedding: self.embedding.is_some(),
        }
    }
}

type Collection = BTreeMap<String, StoredEntry>;

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record exactly as given, bypassing every consistency check.
    ///
    /// Lets tests reproduce rows written by older or foreign writers
    /// (missing hash, gaps in chunk ids, no vector).
    pub fn insert_raw(
        &self,
        collection: &str,
        id: &str,
        metadata: RecordMetadata,
        embedding: Option<Vec<f32>>,
    ) -> Result<()> {
        let mut collections = self.write()?;
        collections.entry(collection.to_string()).or_default().insert(
            id.to_string(),
            StoredEntry {
                metadata,
                document: None,
                embedding,
            },
        );
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

fn missing_collection(collection: &CollectionHandle) -> anyhow::Error {
    IndexError::ContextNotFound {
        name: collection.name().to_string(),
    }
    .into()
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn get_or_create_collection(&self, name: &str) -> Result<CollectionHandle> {
        self.write()?.entry(name.to_string()).or_default();
        Ok(CollectionHandle::new(name))
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionHandle>> {
        Ok(self
            .read()?
            .contains_key(name)
            .then(|| CollectionHandle::new(name)))
    }

    async fn get_by_source(
        &self,
        collection: &CollectionHandle,
        source: &str,
    ) -> Result<Vec<StoredRecord>> {
        let collections = self.read()?;
        let Some(entries) = collections.get(collection.name()) else {
            return Ok(Vec::new());
        };
        let mut records: Vec<StoredRecord> = entries
            .iter()
            .filter(|(_, entry)| entry.metadata.source == source)
            .map(|(id, entry)| entry.to_stored(id))
            .collect();
        records.sort_by_key(|r| r.metadata.chunk_id);
        Ok(records)
    }

    async fn list_sources(&self, collection: &CollectionHandle) -> Result<Vec<String>> {
        let collections = self.read()?;
        let sources: BTreeSet<String> = collections
            .get(collection.name())
            .map(|entries| {
                entries
                    .values()
                    .map(|entry| entry.metadata.source.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(sources.into_iter().collect())
    }

    async fn add(&self, collection: &CollectionHandle, records: &[IndexRecord]) -> Result<()> {
        let mut collections = self.write()?;
        let entries = collections
            .get_mut(collection.name())
            .ok_or_else(|| missing_collection(collection))?;

        let mut batch_ids = HashSet::new();
        for record in records {
            if entries.contains_key(&record.id) || !batch_ids.insert(record.id.as_str()) {
                return Err(IndexError::DuplicateRecord {
                    id: record.id.clone(),
                }
                .into());
            }
        }

        for record in records {
            entries.insert(record.id.clone(), StoredEntry::from_record(record));
        }
        Ok(())
    }

    async fn update(&self, collection: &CollectionHandle, records: &[IndexRecord]) -> Result<()> {
        let mut collections = self.write()?;
        let entries = collections
            .get_mut(collection.name())
            .ok_or_else(|| missing_collection(collection))?;

        for record in records {
            let indexed = entries
                .values()
                .any(|entry| entry.metadata.source == record.source);
            if !indexed {
                return Err(IndexError::UpdateOfUnindexedFile {
                    relative_path: record.source.clone(),
                }
                .into());
            }
        }

        for record in records {
            entries.insert(record.id.clone(), StoredEntry::from_record(record));
        }
        Ok(())
    }

    async fn delete_by_source(
        &self,
        collection: &CollectionHandle,
        source: &str,
    ) -> Result<usize> {
        let mut collections = self.write()?;
        let Some(entries) = collections.get_mut(collection.name()) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.metadata.source != source);
        Ok(before - entries.len())
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryMatch>> {
        let collections = self.read()?;
        let entries = collections
            .get(collection.name())
            .ok_or_else(|| missing_collection(collection))?;

        let mut matches: Vec<QueryMatch> = entries
            .iter()
            .filter_map(|(id, entry)| {
                let vector = entry.embedding.as_ref()?;
                Some(QueryMatch {
                    id: id.clone(),
                    source: entry.metadata.source.clone(),
                    chunk_id: entry.metadata.chunk_id,
                    distance: cosine_distance(embedding, vector),
                    document: entry.document.clone(),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(n_results);
        Ok(matches)
    }

    async fn count(&self, collection: &CollectionHandle) -> Result<usize> {
        Ok(self
            .read()?
            .get(collection.name())
            .map(|entries| entries.len())
            .unwrap_or(0))
    }
}
