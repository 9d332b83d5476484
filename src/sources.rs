use anyhow::Result;

use contextify_core::store::VectorStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Print every configured context with root health and what is indexed.
pub async fn list_sources(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db.path).await?;

    println!(
        "{:<16} {:<8} {:<8} {:<8} HEALTHY",
        "CONTEXT", "ROOTS", "SOURCES", "RECORDS"
    );
    for ctx in &config.contexts {
        let healthy_roots = ctx.roots.iter().filter(|r| r.is_dir()).count();
        let (sources, records) = match store.get_collection(&ctx.name).await? {
            Some(col) => (
                store.list_sources(&col).await?.len().to_string(),
                store.count(&col).await?.to_string(),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:<16} {:<8} {:<8} {:<8} {}",
            ctx.name,
            format!("{}/{}", healthy_roots, ctx.roots.len()),
            sources,
            records,
            healthy_roots == ctx.roots.len()
        );
        for root in &ctx.roots {
            let status = if root.is_dir() { "OK" } else { "MISSING" };
            println!("  {:<8} {}", status, root.display());
        }
    }

    store.close().await;
    Ok(())
}
