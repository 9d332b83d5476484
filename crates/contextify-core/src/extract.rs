//! Content extractor trait.
//!
//! The sync executor asks an extractor for the plain text of each file it
//! saves. A failure is reported for that file only; there is no partial text.

use std::path::Path;

use crate::error::IndexError;

pub trait ContentExtractor: Send + Sync {
    /// Return the extracted plain text of `path`, or [`IndexError::Extraction`].
    fn extract(&self, path: &Path) -> Result<String, IndexError>;
}
