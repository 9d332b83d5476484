//! Test doubles for the embedding and extraction collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::IndexError;
use crate::extract::ContentExtractor;

/// Deterministic embedder: a 26-dim letter histogram of the text.
/// Records every text it is asked to embed.
pub struct CountingEmbedder {
    texts: Mutex<Vec<String>>,
    fail_after: Option<usize>,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail_after: None,
        }
    }

    /// Succeeds `n` times, then every call fails.
    pub fn failing_after(n: usize) -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail_after: Some(n),
        }
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

pub fn letter_histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
        v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn model_name(&self) -> &str {
        "letter-histogram"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut texts = self.texts.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if texts.len() >= limit {
                bail!("embedding service unavailable");
            }
        }
        texts.push(text.to_string());
        Ok(letter_histogram(text))
    }
}

/// Extractor backed by a path → text map; unknown paths fail.
pub struct MapExtractor {
    texts: HashMap<PathBuf, String>,
}

impl MapExtractor {
    pub fn new() -> Self {
        Self {
            texts: HashMap::new(),
        }
    }

    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.texts.insert(PathBuf::from(path), text.to_string());
        self
    }
}

impl ContentExtractor for MapExtractor {
    fn extract(&self, path: &Path) -> Result<String, IndexError> {
        self.texts
            .get(path)
            .cloned()
            .ok_or_else(|| IndexError::extraction(path, "unsupported or corrupt file"))
    }
}
