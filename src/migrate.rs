//! Idempotent schema setup for the SQLite vector store.
//!
//! `records.hash` and `records.total_chunks` are nullable on purpose:
//! rows missing them are still readable and get reprocessed.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            source TEXT NOT NULL,
            chunk_id INTEGER,
            total_chunks INTEGER,
            hash TEXT,
            document TEXT,
            embedding BLOB,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_records_collection_source ON records(collection, source)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
