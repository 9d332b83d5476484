//! Query service: embed a question and return the nearest chunks of one context.
//!
//! Read-only. A context that was never scanned has no collection and
//! yields [`IndexError::ContextNotFound`], which is distinct from a query
//! that simply matches nothing.

use anyhow::{Context, Result};

use crate::embedding::EmbeddingProvider;
use crate::error::IndexError;
use crate::models::QueryMatch;
use crate::store::VectorStore;

/// Number of matches returned when the caller does not ask for more.
pub const DEFAULT_N_RESULTS: usize = 1;

/// Return up to `n_results` matches for `text` in `context`, nearest first.
///
/// The collection is checked before the embedding call, so an unscanned
/// context costs no provider round-trip.
pub async fn query(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    context: &str,
    text: &str,
    n_results: usize,
) -> Result<Vec<QueryMatch>> {
    let collection = store
        .get_collection(context)
        .await?
        .ok_or_else(|| IndexError::ContextNotFound {
            name: context.to_string(),
        })?;

    let embedding = embedder
        .embed(text)
        .await
        .with_context(|| format!("embedding query with {}", embedder.model_name()))?;

    store.query(&collection, &embedding, n_results).await
}
