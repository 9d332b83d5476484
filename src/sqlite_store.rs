//! SQLite-backed [`VectorStore`] implementation.
//!
//! One `collections` row per context and one `records` row per
//! `(collection, id)`. Vectors are little-endian f32 BLOBs and query is a
//! brute-force cosine scan over the collection.
//!
//! `add` and `update` run inside a transaction, so a rejected batch writes
//! nothing.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use contextify_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use contextify_core::models::{IndexRecord, QueryMatch, RecordMetadata, StoredRecord};
use contextify_core::store::{CollectionHandle, VectorStore};
use contextify_core::IndexError;

use crate::{db, migrate};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `db_path` and make sure the schema exists.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::connect_path(db_path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn ensure_collection(&self, collection: &CollectionHandle) -> Result<()> {
        if self.get_collection(collection.name()).await?.is_none() {
            return Err(IndexError::ContextNotFound {
                name: collection.name().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Negative or absent integers read back as `None`.
fn opt_usize(row: &SqliteRow, column: &str) -> Option<usize> {
    row.get::<Option<i64>, _>(column)
        .and_then(|v| usize::try_from(v).ok())
}

fn stored_from_row(row: &SqliteRow) -> StoredRecord {
    StoredRecord {
        id: row.get("id"),
        metadata: RecordMetadata {
            source: row.get("source"),
            chunk_id: opt_usize(row, "chunk_id"),
            total_chunks: opt_usize(row, "total_chunks"),
            hash: row.get("hash"),
        },
        document: row.get("document"),
        has_embedding: row.get::<i64, _>("has_embedding") != 0,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn get_or_create_collection(&self, name: &str) -> Result<CollectionHandle> {
        sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(CollectionHandle::new(name))
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionHandle>> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT name FROM collections WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.map(CollectionHandle::new))
    }

    async fn get_by_source(
        &self,
        collection: &CollectionHandle,
        source: &str,
    ) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, source, chunk_id, total_chunks, hash, document,
                   (embedding IS NOT NULL) AS has_embedding
            FROM records
            WHERE collection = ? AND source = ?
            ORDER BY chunk_id, id
            "#,
        )
        .bind(collection.name())
        .bind(source)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(stored_from_row).collect())
    }

    async fn list_sources(&self, collection: &CollectionHandle) -> Result<Vec<String>> {
        let sources: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT source FROM records WHERE collection = ? ORDER BY source",
        )
        .bind(collection.name())
        .fetch_all(&self.pool)
        .await?;
        Ok(sources)
    }

    async fn add(&self, collection: &CollectionHandle, records: &[IndexRecord]) -> Result<()> {
        self.ensure_collection(collection).await?;
        let mut tx = self.pool.begin().await?;

        for record in records {
            let inserted = sqlx::query(
                r#"
                INSERT INTO records (collection, id, source, chunk_id, total_chunks,
                                     hash, document, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(collection.name())
            .bind(&record.id)
            .bind(&record.source)
            .bind(record.chunk_id as i64)
            .bind(record.total_chunks as i64)
            .bind(&record.hash)
            .bind(&record.document)
            .bind(vec_to_blob(&record.embedding))
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(IndexError::DuplicateRecord {
                        id: record.id.clone(),
                    }
                    .into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, collection: &CollectionHandle, records: &[IndexRecord]) -> Result<()> {
        self.ensure_collection(collection).await?;
        let mut tx = self.pool.begin().await?;

        let sources: BTreeSet<&str> = records.iter().map(|r| r.source.as_str()).collect();
        for source in sources {
            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM records WHERE collection = ? AND source = ?",
            )
            .bind(collection.name())
            .bind(source)
            .fetch_one(&mut *tx)
            .await?;
            if existing == 0 {
                return Err(IndexError::UpdateOfUnindexedFile {
                    relative_path: source.to_string(),
                }
                .into());
            }
        }

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, source, chunk_id, total_chunks,
                                     hash, document, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    source = excluded.source,
                    chunk_id = excluded.chunk_id,
                    total_chunks = excluded.total_chunks,
                    hash = excluded.hash,
                    document = excluded.document,
                    embedding = excluded.embedding
                "#,
            )
            .bind(collection.name())
            .bind(&record.id)
            .bind(&record.source)
            .bind(record.chunk_id as i64)
            .bind(record.total_chunks as i64)
            .bind(&record.hash)
            .bind(&record.document)
            .bind(vec_to_blob(&record.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_by_source(
        &self,
        collection: &CollectionHandle,
        source: &str,
    ) -> Result<usize> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND source = ?")
            .bind(collection.name())
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryMatch>> {
        self.ensure_collection(collection).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, source, chunk_id, document, embedding
            FROM records
            WHERE collection = ? AND embedding IS NOT NULL
            "#,
        )
        .bind(collection.name())
        .fetch_all(&self.pool)
        .await?;

        let mut matches: Vec<QueryMatch> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                QueryMatch {
                    id: row.get("id"),
                    source: row.get("source"),
                    chunk_id: opt_usize(row, "chunk_id"),
                    distance: cosine_distance(embedding, &blob_to_vec(&blob)),
                    document: row.get("document"),
                }
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(collection.name())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
