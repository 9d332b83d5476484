//! Sync executor: bring a collection in line with a [`SyncPlan`].
//!
//! - **new** files are extracted, chunked, embedded chunk by chunk, and
//!   written as one full record set.
//! - **changed** files have every record of their source deleted first,
//!   then are saved exactly like new files.
//! - **removed** sources are deleted.
//!
//! Work is strictly sequential: one file at a time, each collaborator call
//! awaited before the next. A failure affects only the file it happened
//! on; it is recorded in [`SyncReport::failures`] and the batch continues.
//!
//! A file's records are written with a single [`VectorStore::add`] after
//! every chunk has been embedded, so a failure part-way through a file
//! leaves no records for it and the next run classifies it as new.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::chunk::{chunk_lines, DEFAULT_MAX_LINES};
use crate::embedding::EmbeddingProvider;
use crate::extract::ContentExtractor;
use crate::models::{IndexRecord, MatchedFile};
use crate::plan::{FileFailure, SyncPlan};
use crate::store::{CollectionHandle, VectorStore};

/// What happened when a single file was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// `records` chunks were embedded and written.
    Written { records: usize },
    /// Extraction produced no text; nothing was embedded or written.
    Empty,
}

/// Outcome of [`SyncExecutor::apply`] / [`SyncExecutor::apply_plan`].
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Sources saved for the first time.
    pub added: Vec<String>,
    /// Sources deleted and re-saved.
    pub updated: Vec<String>,
    /// Sources deleted because the file is gone.
    pub removed: Vec<String>,
    /// Sources whose extracted text was empty.
    pub empty: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub records_written: usize,
    pub records_deleted: usize,
    pub embedding_calls: usize,
}

impl SyncReport {
    fn record_save(&mut self, source: &str, outcome: SaveOutcome, is_update: bool) {
        match outcome {
            SaveOutcome::Written { records } => {
                self.records_written += records;
                self.embedding_calls += records;
                if is_update {
                    self.updated.push(source.to_string());
                } else {
                    self.added.push(source.to_string());
                }
            }
            SaveOutcome::Empty => self.empty.push(source.to_string()),
        }
    }

    fn record_failure(&mut self, source: &str, error: anyhow::Error) {
        warn!(source = %source, error = %format!("{:#}", error), "skipping file");
        self.failures.push(FileFailure {
            relative_path: source.to_string(),
            error,
        });
    }
}

/// Called before each new or changed file is processed with
/// `(n, total, source)`, `n` counting from 1.
pub type FileHook<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

/// Applies sync plans against explicitly supplied collaborators.
pub struct SyncExecutor<'a> {
    store: &'a dyn VectorStore,
    embedder: &'a dyn EmbeddingProvider,
    extractor: &'a dyn ContentExtractor,
    max_lines: usize,
    on_file: Option<FileHook<'a>>,
}

impl<'a> SyncExecutor<'a> {
    pub fn new(
        store: &'a dyn VectorStore,
        embedder: &'a dyn EmbeddingProvider,
        extractor: &'a dyn ContentExtractor,
    ) -> Self {
        Self {
            store,
            embedder,
            extractor,
            max_lines: DEFAULT_MAX_LINES,
            on_file: None,
        }
    }

    /// Override the number of lines per chunk (default [`DEFAULT_MAX_LINES`]).
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines.max(1);
        self
    }

    pub fn with_file_hook(mut self, hook: FileHook<'a>) -> Self {
        self.on_file = Some(hook);
        self
    }

    fn notify(&self, n: usize, total: usize, source: &str) {
        if let Some(hook) = self.on_file {
            hook(n, total, source);
        }
    }

    /// Save `new` files and delete-then-save `changed` files.
    pub async fn apply(
        &self,
        collection: &CollectionHandle,
        new: &[MatchedFile],
        changed: &[MatchedFile],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let total = new.len() + changed.len();

        for (i, file) in new.iter().enumerate() {
            self.notify(i + 1, total, &file.relative_path);
            match self.save_file(collection, file).await {
                Ok(outcome) => report.record_save(&file.relative_path, outcome, false),
                Err(e) => report.record_failure(&file.relative_path, e),
            }
        }

        for (i, file) in changed.iter().enumerate() {
            self.notify(new.len() + i + 1, total, &file.relative_path);
            match self.replace_file(collection, file, &mut report).await {
                Ok(outcome) => report.record_save(&file.relative_path, outcome, true),
                Err(e) => report.record_failure(&file.relative_path, e),
            }
        }

        report
    }

    /// Apply a full plan. Removed sources are deleted only when `prune_removed`.
    pub async fn apply_plan(
        &self,
        collection: &CollectionHandle,
        plan: &SyncPlan,
        prune_removed: bool,
    ) -> SyncReport {
        let mut report = self.apply(collection, &plan.new, &plan.changed).await;
        if prune_removed {
            self.remove(collection, &plan.removed, &mut report).await;
        }
        report
    }

    /// Delete every record of each source in `removed`.
    pub async fn remove(
        &self,
        collection: &CollectionHandle,
        removed: &[String],
        report: &mut SyncReport,
    ) {
        for source in removed {
            match self.store.delete_by_source(collection, source).await {
                Ok(deleted) => {
                    info!(source = %source, deleted, "removed from index");
                    report.records_deleted += deleted;
                    report.removed.push(source.clone());
                }
                Err(e) => report.record_failure(
                    source,
                    e.context(format!("failed to delete records for {}", source)),
                ),
            }
        }
    }

    /// Delete all records of `file`'s source, then save it as new.
    ///
    /// The delete completes before any write starts, so old and new chunk
    /// ids never coexist.
    async fn replace_file(
        &self,
        collection: &CollectionHandle,
        file: &MatchedFile,
        report: &mut SyncReport,
    ) -> Result<SaveOutcome> {
        let deleted = self
            .store
            .delete_by_source(collection, &file.relative_path)
            .await
            .with_context(|| format!("failed to delete records for {}", file.relative_path))?;
        report.records_deleted += deleted;
        debug!(source = %file.relative_path, deleted, "deleted previous version");
        self.save_file(collection, file).await
    }

    /// Extract, chunk, embed and write one file.
    pub async fn save_file(
        &self,
        collection: &CollectionHandle,
        file: &MatchedFile,
    ) -> Result<SaveOutcome> {
        let text = self.extractor.extract(&file.absolute_path)?;
        let chunks = chunk_lines(&text, self.max_lines);
        if chunks.is_empty() {
            debug!(source = %file.relative_path, "no text extracted, nothing to embed");
            return Ok(SaveOutcome::Empty);
        }

        let total_chunks = chunks.len();
        let mut records = Vec::with_capacity(total_chunks);
        for (chunk_id, chunk) in chunks.into_iter().enumerate() {
            let embedding = self.embedder.embed(&chunk).await.with_context(|| {
                format!(
                    "embedding chunk {}/{} of {} with {}",
                    chunk_id + 1,
                    total_chunks,
                    file.relative_path,
                    self.embedder.model_name()
                )
            })?;
            records.push(IndexRecord::for_chunk(
                file,
                chunk_id,
                total_chunks,
                chunk,
                embedding,
            ));
        }

        self.store
            .add(collection, &records)
            .await
            .with_context(|| format!("failed to write records for {}", file.relative_path))?;

        info!(source = %file.relative_path, chunks = total_chunks, "indexed");
        Ok(SaveOutcome::Written {
            records: total_chunks,
        })
    }
}
