//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/contextify.sqlite"
//!
//! [embedding]
//! url = "http://localhost:11434"
//! model = "nomic-embed-text"
//!
//! [chunking]
//! max_lines = 1000
//!
//! [sync]
//! prune_removed = true
//!
//! [[contexts]]
//! name = "docs"
//! roots = ["/home/me/docs"]
//! include_pattern = '\.(md|txt|pdf|docx)$'
//! ```
//!
//! Every validation failure is fatal: no scan or query starts with a
//! configuration that [`load_config`] rejects.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use contextify_core::chunk::DEFAULT_MAX_LINES;
use contextify_core::IndexError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub contexts: Vec<ContextConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service (Ollama-compatible `/api/embed`).
    #[serde(default = "default_embedding_url")]
    pub url: String,
    pub model: String,
    /// Request timeout. Absent means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Delete records of files that are no longer on disk.
    #[serde(default = "default_prune_removed")]
    pub prune_removed: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            prune_removed: true,
        }
    }
}

fn default_prune_removed() -> bool {
    true
}

/// A named logical index: one collection, fed by one or more roots.
#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    pub name: String,
    pub roots: Vec<PathBuf>,
    /// Regex searched (not anchored) against file basenames.
    pub include_pattern: String,
}

impl ContextConfig {
    pub fn include_regex(&self) -> Result<Regex> {
        Regex::new(&self.include_pattern).with_context(|| {
            format!(
                "contexts.{}: invalid include_pattern '{}'",
                self.name, self.include_pattern
            )
        })
    }
}

impl Config {
    /// Look up a configured context by name.
    pub fn context(&self, name: &str) -> Result<&ContextConfig> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                IndexError::UnknownContext {
                    name: name.to_string(),
                }
                .into()
            })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.embedding.model.trim().is_empty() {
        bail!("embedding.model must not be empty");
    }
    if config.embedding.url.trim().is_empty() {
        bail!("embedding.url must not be empty");
    }

    if config.chunking.max_lines == 0 {
        bail!("chunking.max_lines must be >= 1");
    }

    if config.contexts.is_empty() {
        bail!("at least one [[contexts]] entry is required");
    }

    let mut names = HashSet::new();
    for ctx in &config.contexts {
        if ctx.name.trim().is_empty() {
            bail!("context names must not be empty");
        }
        if !names.insert(ctx.name.as_str()) {
            bail!("duplicate context name: '{}'", ctx.name);
        }
        if ctx.roots.is_empty() {
            bail!("contexts.{}: at least one root is required", ctx.name);
        }
        ctx.include_regex()?;
    }

    Ok(())
}
