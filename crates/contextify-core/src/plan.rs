//! Sync planner: classify scanned files against what the store holds.
//!
//! For every discovered file the planner looks up the records whose
//! `source` equals the file's relative path and compares the stored hash
//! to the freshly computed one:
//!
//! | Stored records | Stored hash | Status |
//! |----------------|-------------|--------|
//! | none | - | [`FileStatus::New`] |
//! | complete set | equal | [`FileStatus::Unchanged`] |
//! | complete set | different | [`FileStatus::Changed`] |
//! | malformed or incomplete set | any | [`FileStatus::Changed`] |
//!
//! Sources present in the store but absent from the scan are reported as
//! `removed`, unless they sit under a path the scanner could not read (see
//! [`SyncPlan::keep_unreadable`]). Unchanged files get no action at all.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, warn};

use crate::models::{MatchedFile, StoredRecord};
use crate::store::{CollectionHandle, VectorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Changed,
    Unchanged,
}

/// A per-file failure. The file is skipped and the batch continues.
#[derive(Debug)]
pub struct FileFailure {
    pub relative_path: String,
    pub error: anyhow::Error,
}

/// Classified output of [`plan`].
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub new: Vec<MatchedFile>,
    pub changed: Vec<MatchedFile>,
    pub unchanged: Vec<MatchedFile>,
    /// Sources in the store that the scan no longer found, sorted.
    pub removed: Vec<String>,
    /// Files whose relative path was already claimed by an earlier root.
    pub duplicates: Vec<MatchedFile>,
    /// Files whose store lookup failed.
    pub failures: Vec<FileFailure>,
    /// Stored sources missing from the scan because their location could
    /// not be read. They are left in the index.
    pub unreadable: Vec<String>,
}

impl SyncPlan {
    /// True when applying the plan would touch the store.
    pub fn has_work(&self) -> bool {
        !self.new.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Move removed sources at or below any of `skipped` into
    /// [`SyncPlan::unreadable`].
    ///
    /// `skipped` holds relative paths (files or directories) the scanner
    /// had to skip. An empty path stands for a whole root.
    pub fn keep_unreadable(&mut self, skipped: &[String]) {
        if skipped.is_empty() {
            return;
        }
        let (kept, removed): (Vec<String>, Vec<String>) = std::mem::take(&mut self.removed)
            .into_iter()
            .partition(|source| skipped.iter().any(|path| is_at_or_under(source, path)));
        for source in &kept {
            warn!(source = %source, "not removing source: its location could not be read");
        }
        self.removed = removed;
        self.unreadable.extend(kept);
    }
}

fn is_at_or_under(source: &str, path: &str) -> bool {
    path.is_empty()
        || source == path
        || (source.starts_with(path) && source[path.len()..].starts_with('/'))
}

/// Classify one file given the records stored for its source.
pub fn classify(records: &[StoredRecord], content_hash: &str) -> FileStatus {
    if records.is_empty() {
        return FileStatus::New;
    }
    match stored_hash(records) {
        Some(stored) if stored == content_hash => FileStatus::Unchanged,
        _ => FileStatus::Changed,
    }
}

/// The hash shared by a source's record set, or `None` when the set is
/// malformed.
///
/// A set is well-formed when every record has a hash and a total, all
/// hashes and totals agree, and the chunk ids are exactly `0..total`.
pub fn stored_hash(records: &[StoredRecord]) -> Option<&str> {
    let first = records.first()?;
    let hash = first.metadata.hash.as_deref()?;
    let total = first.metadata.total_chunks?;
    if records.len() != total {
        return None;
    }

    let mut seen = vec![false; total];
    for record in records {
        if record.metadata.hash.as_deref() != Some(hash)
            || record.metadata.total_chunks != Some(total)
        {
            return None;
        }
        let chunk_id = record.metadata.chunk_id?;
        if chunk_id >= total || std::mem::replace(&mut seen[chunk_id], true) {
            return None;
        }
    }

    Some(hash)
}

/// Build the sync plan for one collection.
///
/// `discovered` is expected in scan order (roots in configured order).
/// When two files share a relative path the first one wins and the rest
/// land in [`SyncPlan::duplicates`].
///
/// A failed lookup for one file is recorded in [`SyncPlan::failures`];
/// only a failure to list the collection's sources aborts the plan.
pub async fn plan(
    store: &dyn VectorStore,
    collection: &CollectionHandle,
    discovered: Vec<MatchedFile>,
) -> Result<SyncPlan> {
    let mut sync_plan = SyncPlan::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(discovered.len());

    for file in discovered {
        if !seen.insert(file.relative_path.clone()) {
            warn!(
                source = %file.relative_path,
                path = %file.absolute_path.display(),
                "duplicate source, skipping"
            );
            sync_plan.duplicates.push(file);
            continue;
        }

        let records = match store.get_by_source(collection, &file.relative_path).await {
            Ok(records) => records,
            Err(error) => {
                sync_plan.failures.push(FileFailure {
                    relative_path: file.relative_path.clone(),
                    error,
                });
                continue;
            }
        };

        let status = classify(&records, &file.content_hash);
        debug!(source = %file.relative_path, ?status, records = records.len(), "classified");
        match status {
            FileStatus::New => sync_plan.new.push(file),
            FileStatus::Changed => sync_plan.changed.push(file),
            FileStatus::Unchanged => sync_plan.unchanged.push(file),
        }
    }

    sync_plan.removed = store
        .list_sources(collection)
        .await?
        .into_iter()
        .filter(|source| !seen.contains(source))
        .collect();

    Ok(sync_plan)
}
