//! `contextify query`: nearest chunks of one context as JSON on stdout.

use anyhow::Result;
use serde::Serialize;

use contextify_core::models::QueryMatch;
use contextify_core::query::query;

use crate::config::Config;
use crate::embedding::OllamaProvider;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Serialize)]
pub struct QueryOutput<'a> {
    pub context: &'a str,
    pub query: &'a str,
    pub results: Vec<QueryMatch>,
}

/// Run a query and print the ranked matches.
///
/// A context missing from the configuration fails with
/// `IndexError::UnknownContext`; a configured context that was never
/// scanned fails with `IndexError::ContextNotFound`. A query that matches
/// nothing prints an empty `results` list.
pub async fn run_query(config: &Config, context: &str, text: &str, n_results: usize) -> Result<()> {
    config.context(context)?;

    let store = SqliteStore::open(&config.db.path).await?;
    let embedder = OllamaProvider::new(&config.embedding)?;
    let result = query(&store, &embedder, context, text, n_results).await;
    store.close().await;

    let output = QueryOutput {
        context,
        query: text,
        results: result?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
