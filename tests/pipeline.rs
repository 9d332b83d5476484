//! Library-level tests: real scanner, extractor and SQLite store, with a
//! deterministic embedder standing in for the HTTP service.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use contextify::config::{load_config, Config};
use contextify::extract::FsExtractor;
use contextify::progress::NoProgress;
use contextify::sqlite_store::SqliteStore;
use contextify::sync::{sync_context, ContextOutcome, SyncDeps};
use contextify_core::embedding::EmbeddingProvider;
use contextify_core::plan::stored_hash;
use contextify_core::query::query;
use contextify_core::store::VectorStore;
use contextify_core::IndexError;

/// 26-dim letter histogram; counts calls.
struct HistogramEmbedder {
    calls: AtomicUsize,
}

impl HistogramEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HistogramEmbedder {
    fn model_name(&self) -> &str {
        "histogram"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0.0f32; 26];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }
}

/// Minimal single-page PDF whose only text is `phrase`.
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
        format!("<< /Length {} >> stream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn lines(n: usize, word: &str) -> String {
    (0..n).map(|i| format!("{} {}\n", word, i)).collect()
}

struct Env {
    tmp: TempDir,
    config: Config,
    store: SqliteStore,
    embedder: HistogramEmbedder,
}

impl Env {
    async fn new(max_lines: usize, roots: &[&str]) -> Env {
        let tmp = TempDir::new().unwrap();
        let root_paths: Vec<PathBuf> = roots.iter().map(|r| tmp.path().join(r)).collect();
        for root in &root_paths {
            fs::create_dir_all(root).unwrap();
        }
        let roots_toml = root_paths
            .iter()
            .map(|r| format!("\"{}\"", r.display()))
            .collect::<Vec<_>>()
            .join(", ");
        let config_path = tmp.path().join("contextify.toml");
        fs::write(
            &config_path,
            format!(
                r#"[db]
path = "{}/contextify.sqlite"

[embedding]
model = "histogram"

[chunking]
max_lines = {}

[[contexts]]
name = "docs"
roots = [{}]
include_pattern = '\.(txt|md|pdf|docx)$'
"#,
                tmp.path().display(),
                max_lines,
                roots_toml
            ),
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        let store = SqliteStore::open(&config.db.path).await.unwrap();
        Env {
            tmp,
            config,
            store,
            embedder: HistogramEmbedder::new(),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.tmp.path().join(relative)
    }

    fn write(&self, relative: &str, contents: impl AsRef<[u8]>) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    async fn scan(&self) -> ContextOutcome {
        let deps = SyncDeps {
            store: &self.store,
            embedder: &self.embedder,
            extractor: &FsExtractor,
            progress: &NoProgress,
        };
        sync_context(&deps, &self.config, &self.config.contexts[0], false)
            .await
            .unwrap()
    }

    async fn records_for(&self, source: &str) -> Vec<contextify_core::models::StoredRecord> {
        let col = self.store.get_collection("docs").await.unwrap().unwrap();
        self.store.get_by_source(&col, source).await.unwrap()
    }
}

fn sources(paths: &[contextify_core::models::MatchedFile]) -> Vec<&str> {
    paths.iter().map(|f| f.relative_path.as_str()).collect()
}

fn assert_complete_set(records: &[contextify_core::models::StoredRecord], chunks: usize) {
    assert_eq!(records.len(), chunks);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.metadata.chunk_id, Some(i));
        assert_eq!(record.metadata.total_chunks, Some(chunks));
    }
    assert!(stored_hash(records).is_some(), "hash must be shared by every chunk");
}

#[tokio::test]
async fn test_first_scan_new_then_rescan_is_a_no_op() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/notes.txt", lines(500, "note"));
    env.write("docs/report.pdf", minimal_pdf("quarterly report"));

    let first = env.scan().await;
    assert_eq!(sources(&first.plan.new), vec!["notes.txt", "report.pdf"]);
    let report = first.report.unwrap();
    assert_eq!(report.added, vec!["notes.txt", "report.pdf"]);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    let calls_after_first = env.embedder.calls();
    assert_eq!(calls_after_first, 2);

    let second = env.scan().await;
    assert_eq!(sources(&second.plan.unchanged), vec!["notes.txt", "report.pdf"]);
    assert!(second.plan.new.is_empty());
    assert!(second.plan.changed.is_empty());
    let report = second.report.unwrap();
    assert_eq!(report.records_written, 0);
    assert_eq!(report.records_deleted, 0);
    assert_eq!(env.embedder.calls(), calls_after_first);
}

#[tokio::test]
async fn test_large_file_is_chunked_and_stored_in_order() {
    let env = Env::new(1000, &["docs"]).await;
    let text = lines(2500, "line");
    env.write("docs/big.txt", &text);

    env.scan().await;
    let records = env.records_for("big.txt").await;
    assert_complete_set(&records, 3);
    let reassembled: String = records
        .iter()
        .map(|r| r.document.clone().unwrap())
        .collect();
    assert_eq!(reassembled, text);
    assert_eq!(records[2].document.as_ref().unwrap().lines().count(), 500);
    assert_eq!(records[1].id, "big.txt_1");
}

#[tokio::test]
async fn test_edited_file_is_replaced_without_orphans() {
    let env = Env::new(2, &["docs"]).await;
    env.write("docs/notes.txt", lines(6, "old"));
    env.scan().await;
    assert_complete_set(&env.records_for("notes.txt").await, 3);

    env.write("docs/notes.txt", lines(1, "new"));
    let outcome = env.scan().await;
    assert_eq!(sources(&outcome.plan.changed), vec!["notes.txt"]);
    let report = outcome.report.unwrap();
    assert_eq!(report.updated, vec!["notes.txt"]);
    assert_eq!(report.records_deleted, 3);

    let records = env.records_for("notes.txt").await;
    assert_complete_set(&records, 1);
    assert_eq!(records[0].document.as_deref(), Some("new 0\n"));
}

#[tokio::test]
async fn test_one_byte_edit_forces_changed() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/a.txt", "hello world\n");
    env.scan().await;
    let before = env.records_for("a.txt").await[0].metadata.hash.clone();

    env.write("docs/a.txt", "hello worle\n");
    let outcome = env.scan().await;
    assert_eq!(outcome.plan.changed.len(), 1);
    let after = env.records_for("a.txt").await[0].metadata.hash.clone();
    assert_ne!(before, after);
}

#[tokio::test]
async fn test_docx_is_indexed_and_queryable() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/memo.docx", minimal_docx(&["zebra zoo", "quiz zigzag"]));
    env.write("docs/plain.txt", "ordinary text about nothing\n");

    let outcome = env.scan().await;
    assert!(outcome.report.unwrap().failures.is_empty());

    let records = env.records_for("memo.docx").await;
    assert_eq!(records[0].document.as_deref(), Some("zebra zoo\nquiz zigzag"));

    let matches = query(&env.store, &env.embedder, "docs", "zzz zebra", 1)
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].source, "memo.docx");
}

#[tokio::test]
async fn test_query_result_count_is_bounded() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/a.txt", "alpha\n");
    env.write("docs/b.txt", "beta\n");
    env.write("docs/c.txt", "gamma\n");
    env.scan().await;

    let two = query(&env.store, &env.embedder, "docs", "alpha", 2).await.unwrap();
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].source, "a.txt");
    assert!(two[0].distance <= two[1].distance);

    let all = query(&env.store, &env.embedder, "docs", "alpha", 10).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_query_unscanned_context_is_not_found() {
    let env = Env::new(1000, &["docs"]).await;
    let err = query(&env.store, &env.embedder, "docs", "anything", 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::ContextNotFound { .. })
    ));
    assert_eq!(env.embedder.calls(), 0);
}

#[tokio::test]
async fn test_scanned_but_empty_context_returns_no_matches() {
    let env = Env::new(1000, &["docs"]).await;
    env.scan().await;
    let matches = query(&env.store, &env.embedder, "docs", "anything", 3)
        .await
        .unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_bad_file_is_skipped_and_retried() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/binary.txt", [0xffu8, 0xfe, 0xfd]);
    env.write("docs/broken.pdf", b"not a pdf at all");
    env.write("docs/good.md", "fine\n");

    let outcome = env.scan().await;
    let report = outcome.report.unwrap();
    assert_eq!(report.added, vec!["good.md"]);
    let failed: Vec<_> = report
        .failures
        .iter()
        .map(|f| f.relative_path.as_str())
        .collect();
    assert_eq!(failed, vec!["binary.txt", "broken.pdf"]);

    let again = env.scan().await;
    assert_eq!(sources(&again.plan.new), vec!["binary.txt", "broken.pdf"]);
    assert_eq!(sources(&again.plan.unchanged), vec!["good.md"]);
}

#[tokio::test]
async fn test_duplicate_relative_path_across_roots_first_wins() {
    let env = Env::new(1000, &["one", "two"]).await;
    env.write("one/readme.md", "from the first root\n");
    env.write("two/readme.md", "from the second root\n");
    env.write("two/only.md", "second only\n");

    let outcome = env.scan().await;
    assert_eq!(outcome.plan.duplicates.len(), 1);
    assert_eq!(outcome.plan.duplicates[0].absolute_path, env.path("two/readme.md"));

    let records = env.records_for("readme.md").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document.as_deref(), Some("from the first root\n"));
    assert_eq!(env.records_for("only.md").await.len(), 1);

    let again = env.scan().await;
    assert!(!again.plan.has_work());
}

#[tokio::test]
async fn test_removed_file_records_are_deleted() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/keep.txt", "keep\n");
    env.write("docs/sub/drop.txt", "drop\n");
    env.scan().await;

    fs::remove_file(env.path("docs/sub/drop.txt")).unwrap();
    let outcome = env.scan().await;
    assert_eq!(outcome.plan.removed, vec!["sub/drop.txt"]);
    assert!(env.records_for("sub/drop.txt").await.is_empty());
    assert_eq!(env.records_for("keep.txt").await.len(), 1);
}

#[tokio::test]
async fn test_file_emptied_after_indexing_ends_with_no_records() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/a.txt", "something\n");
    env.scan().await;

    env.write("docs/a.txt", "");
    let outcome = env.scan().await;
    let report = outcome.report.unwrap();
    assert_eq!(report.empty, vec!["a.txt"]);
    assert!(env.records_for("a.txt").await.is_empty());
}

#[tokio::test]
async fn test_index_survives_reopening_the_database() {
    let env = Env::new(1000, &["docs"]).await;
    env.write("docs/a.txt", "persisted\n");
    env.scan().await;
    let calls = env.embedder.calls();

    let Env {
        tmp,
        config,
        store,
        embedder,
    } = env;
    store.close().await;
    let env = Env {
        store: SqliteStore::open(&config.db.path).await.unwrap(),
        tmp,
        config,
        embedder,
    };

    let outcome = env.scan().await;
    assert_eq!(outcome.plan.unchanged.len(), 1);
    assert_eq!(env.embedder.calls(), calls);
}
