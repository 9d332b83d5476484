//! Tree scanner: walk context roots, filter by basename, hash contents.
//!
//! Each matched file becomes a [`MatchedFile`] whose `relative_path` is
//! computed against the root it was found under, with `/` separators on
//! every platform. Files are returned sorted by relative path within a
//! root, and roots keep their configured order.
//!
//! Errors are isolated as narrowly as possible:
//! - a root that is missing or not a directory fails that root only
//!   ([`IndexError::InvalidRoot`]);
//! - a file (or subdirectory) that cannot be read or hashed is skipped and
//!   reported as a [`ScanDiagnostic`]. Its indexed records are left alone.
//!
//! Symbolic links are followed; a dangling link or a link cycle is a
//! diagnostic like any other unreadable entry.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use contextify_core::models::MatchedFile;
use contextify_core::IndexError;

const HASH_BLOCK_SIZE: usize = 64 * 1024;

/// A file or directory the scanner had to skip.
#[derive(Debug)]
pub struct ScanDiagnostic {
    pub path: PathBuf,
    /// `path` relative to its root, `/`-separated. Empty for the root itself.
    pub relative_path: String,
    pub error: anyhow::Error,
}

/// Result of scanning a single root.
#[derive(Debug, Default)]
pub struct RootScan {
    pub files: Vec<MatchedFile>,
    pub diagnostics: Vec<ScanDiagnostic>,
}

/// A root that could not be scanned at all.
#[derive(Debug)]
pub struct RootFailure {
    pub root: PathBuf,
    pub error: anyhow::Error,
}

/// Result of scanning every root of a context.
#[derive(Debug, Default)]
pub struct ContextScan {
    /// Matched files, roots in the order given.
    pub files: Vec<MatchedFile>,
    pub diagnostics: Vec<ScanDiagnostic>,
    pub failed_roots: Vec<RootFailure>,
}

impl ContextScan {
    /// True when every root was scanned. Removed-file pruning is only
    /// safe for complete scans.
    pub fn is_complete(&self) -> bool {
        self.failed_roots.is_empty()
    }

    /// Relative paths of every skipped file or directory.
    pub fn skipped_paths(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| d.relative_path.clone())
            .collect()
    }
}

/// SHA-256 of the file's bytes as lowercase hex, read in fixed-size blocks.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Scan one root. Fails only when the root itself is unusable.
pub fn scan_root(root: &Path, include: &Regex) -> Result<RootScan> {
    if !root.is_dir() {
        return Err(IndexError::InvalidRoot {
            root: root.to_path_buf(),
        }
        .into());
    }

    let mut scan = RootScan::default();
    let walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                scan.diagnostics.push(ScanDiagnostic {
                    relative_path: relative_path(root, &path),
                    path,
                    error: e.into(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let basename = entry.file_name().to_string_lossy();
        if !include.is_match(&basename) {
            continue;
        }

        let path = entry.path();
        let content_hash = match hash_file(path) {
            Ok(hash) => hash,
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{:#}", error), "skipping file");
                scan.diagnostics.push(ScanDiagnostic {
                    path: path.to_path_buf(),
                    relative_path: relative_path(root, path),
                    error,
                });
                continue;
            }
        };

        scan.files.push(MatchedFile {
            absolute_path: path.to_path_buf(),
            relative_path: relative_path(root, path),
            content_hash,
        });
    }

    scan.files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    debug!(
        root = %root.display(),
        files = scan.files.len(),
        skipped = scan.diagnostics.len(),
        "scanned root"
    );
    Ok(scan)
}

/// Scan every root, isolating failures per root.
pub fn scan_roots(roots: &[PathBuf], include: &Regex) -> ContextScan {
    let mut scan = ContextScan::default();
    for root in roots {
        match scan_root(root, include) {
            Ok(root_scan) => {
                scan.files.extend(root_scan.files);
                scan.diagnostics.extend(root_scan.diagnostics);
            }
            Err(error) => {
                warn!(root = %root.display(), error = %error, "skipping root");
                scan.failed_roots.push(RootFailure {
                    root: root.clone(),
                    error,
                });
            }
        }
    }
    scan
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
