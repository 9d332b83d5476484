//! `contextify scan`: bring every configured context in line with disk.
//!
//! Per context, strictly in order: scan roots → plan against the store →
//! apply the plan. Contexts run one after another. Failures of a root or
//! a file are reported in the summary and never stop the run; only
//! configuration and store-level errors are fatal.

use anyhow::Result;
use tracing::{info, warn};

use contextify_core::embedding::EmbeddingProvider;
use contextify_core::extract::ContentExtractor;
use contextify_core::plan::{plan, SyncPlan};
use contextify_core::store::{CollectionHandle, VectorStore};
use contextify_core::sync::{SyncExecutor, SyncReport};

use crate::config::{Config, ContextConfig};
use crate::embedding::OllamaProvider;
use crate::extract::FsExtractor;
use crate::progress::{ProgressMode, ScanProgressEvent, ScanProgressReporter};
use crate::scan::{scan_roots, ContextScan};
use crate::sqlite_store::SqliteStore;

/// Everything that happened to one context during a scan.
#[derive(Debug)]
pub struct ContextOutcome {
    pub context: String,
    pub roots: usize,
    pub scan: ContextScan,
    pub plan: SyncPlan,
    /// `None` for dry runs.
    pub report: Option<SyncReport>,
    /// Whether removed sources were deleted this run.
    pub pruned: bool,
}

impl ContextOutcome {
    /// Total number of problems reported for this context.
    pub fn failure_count(&self) -> usize {
        self.scan.failed_roots.len()
            + self.scan.diagnostics.len()
            + self.plan.failures.len()
            + self.report.as_ref().map_or(0, |r| r.failures.len())
    }
}

/// Collaborators for a scan run.
pub struct SyncDeps<'a> {
    pub store: &'a dyn VectorStore,
    pub embedder: &'a dyn EmbeddingProvider,
    pub extractor: &'a dyn ContentExtractor,
    pub progress: &'a dyn ScanProgressReporter,
}

/// Scan, plan and (unless `dry_run`) apply one context.
pub async fn sync_context(
    deps: &SyncDeps<'_>,
    config: &Config,
    ctx: &ContextConfig,
    dry_run: bool,
) -> Result<ContextOutcome> {
    let include = ctx.include_regex()?;

    deps.progress.report(ScanProgressEvent::Discovering {
        context: ctx.name.clone(),
    });
    let scan = scan_roots(&ctx.roots, &include);

    // A dry run must not create the collection; planning against a missing
    // collection sees no records, so every file is new.
    let collection = if dry_run {
        CollectionHandle::new(ctx.name.as_str())
    } else {
        deps.store.get_or_create_collection(&ctx.name).await?
    };

    let mut sync_plan = plan(deps.store, &collection, scan.files.clone()).await?;
    sync_plan.keep_unreadable(&scan.skipped_paths());
    info!(
        context = %ctx.name,
        new = sync_plan.new.len(),
        changed = sync_plan.changed.len(),
        unchanged = sync_plan.unchanged.len(),
        removed = sync_plan.removed.len(),
        "planned"
    );

    let mut outcome = ContextOutcome {
        context: ctx.name.clone(),
        roots: ctx.roots.len(),
        scan,
        plan: sync_plan,
        report: None,
        pruned: false,
    };
    if dry_run {
        return Ok(outcome);
    }

    let prune = config.sync.prune_removed && outcome.scan.is_complete();
    if config.sync.prune_removed && !outcome.scan.is_complete() && !outcome.plan.removed.is_empty()
    {
        warn!(
            context = %ctx.name,
            candidates = outcome.plan.removed.len(),
            "not removing missing files: a root could not be scanned"
        );
    }

    let hook = |n: usize, total: usize, source: &str| {
        deps.progress.report(ScanProgressEvent::Ingesting {
            context: ctx.name.clone(),
            n: n as u64,
            total: total as u64,
            source: source.to_string(),
        });
    };
    let executor = SyncExecutor::new(deps.store, deps.embedder, deps.extractor)
        .with_max_lines(config.chunking.max_lines)
        .with_file_hook(&hook);

    outcome.report = Some(executor.apply_plan(&collection, &outcome.plan, prune).await);
    outcome.pruned = prune;
    Ok(outcome)
}

/// Entry point for `contextify scan`.
pub async fn run_scan(
    config: &Config,
    context: Option<&str>,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let contexts: Vec<&ContextConfig> = match context {
        Some(name) => vec![config.context(name)?],
        None => config.contexts.iter().collect(),
    };

    let store = SqliteStore::open(&config.db.path).await?;
    let embedder = OllamaProvider::new(&config.embedding)?;
    let extractor = FsExtractor::new();
    let reporter = progress.reporter();
    let deps = SyncDeps {
        store: &store,
        embedder: &embedder,
        extractor: &extractor,
        progress: reporter.as_ref(),
    };

    for ctx in contexts {
        let outcome = sync_context(&deps, config, ctx, dry_run).await?;
        print_summary(&outcome);
    }

    store.close().await;
    Ok(())
}

fn print_summary(outcome: &ContextOutcome) {
    let plan = &outcome.plan;
    let scan = &outcome.scan;

    if outcome.report.is_none() {
        println!("scan {} (dry-run)", outcome.context);
    } else {
        println!("scan {}", outcome.context);
    }
    println!(
        "  roots: {} ({} failed)",
        outcome.roots,
        scan.failed_roots.len()
    );
    println!("  files matched: {}", scan.files.len());
    println!("  new: {}", plan.new.len());
    println!("  changed: {}", plan.changed.len());
    println!("  unchanged: {}", plan.unchanged.len());
    println!("  removed: {}", plan.removed.len());
    if !plan.duplicates.is_empty() {
        println!("  duplicates skipped: {}", plan.duplicates.len());
    }
    if !plan.unreadable.is_empty() {
        println!("  kept (unreadable): {}", plan.unreadable.len());
    }

    if let Some(report) = &outcome.report {
        println!("  added: {}", report.added.len());
        println!("  updated: {}", report.updated.len());
        println!("  deleted: {}", report.removed.len());
        if !report.empty.is_empty() {
            println!("  empty: {}", report.empty.len());
        }
        println!("  records written: {}", report.records_written);
        println!("  records deleted: {}", report.records_deleted);
        if !outcome.pruned && !plan.removed.is_empty() {
            println!("  removal skipped: {}", plan.removed.len());
        }
    }

    let failures = outcome.failure_count();
    if failures > 0 {
        println!("  failed: {}", failures);
        for root in &scan.failed_roots {
            println!("    {}: {:#}", root.root.display(), root.error);
        }
        for diag in &scan.diagnostics {
            println!("    {}: {:#}", diag.path.display(), diag.error);
        }
        for failure in &plan.failures {
            println!("    {}: {:#}", failure.relative_path, failure.error);
        }
        if let Some(report) = &outcome.report {
            for failure in &report.failures {
                println!("    {}: {:#}", failure.relative_path, failure.error);
            }
        }
    }
    println!("ok");
}
