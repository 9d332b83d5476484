//! Domain error kinds.
//!
//! Collaborator traits return `anyhow::Result`; these values travel inside
//! `anyhow::Error` and callers that need the kind recover it with
//! `err.downcast_ref::<IndexError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// A scan root is missing or is not a directory.
    #[error("scan root does not exist or is not a directory: {}", root.display())]
    InvalidRoot { root: PathBuf },

    /// Text could not be extracted from a file. The file is skipped.
    #[error("failed to extract text from {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// An update-style write targeted a source with no existing records.
    /// The planner never produces this; it means planner and executor disagree.
    #[error("cannot update '{relative_path}': it has no indexed records")]
    UpdateOfUnindexedFile { relative_path: String },

    /// The named context has never been indexed (no collection exists).
    #[error("no such context: '{name}' has not been indexed yet")]
    ContextNotFound { name: String },

    /// The configuration does not define the named context.
    #[error("unknown context: '{name}' is not defined in the configuration")]
    UnknownContext { name: String },

    /// An add would create a second record for the same `(source, chunk)` key.
    #[error("record '{id}' already exists")]
    DuplicateRecord { id: String },
}

impl IndexError {
    /// Build an [`IndexError::Extraction`] from any displayable failure.
    pub fn extraction(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        IndexError::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
