//! HTTP embedding client for an Ollama-compatible `/api/embed` endpoint.
//!
//! Request: `POST {url}/api/embed` with `{"model": ..., "input": ...}`.
//! Response: `{"embeddings": [[f32, ...]]}`; exactly one vector is expected
//! per call.
//!
//! Each call is made once. There is no retry or backoff; a failed call
//! fails the file (or query) that needed it. A timeout applies only when
//! `embedding.timeout_secs` is configured.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;

use contextify_core::embedding::EmbeddingProvider;

use crate::config::EmbeddingConfig;

pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("Failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", config.url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "embedding service unreachable (is it running at {}?)",
                    self.endpoint
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("embedding service error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("embedding service returned invalid JSON")?;
        parse_embed_response(&json)
    }
}

/// Extract the single vector from an `/api/embed` response.
fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid embed response: missing embeddings array"))?;

    let first = match embeddings.as_slice() {
        [only] => only,
        [] => bail!("Invalid embed response: no embedding returned"),
        many => bail!(
            "Invalid embed response: expected 1 embedding, got {}",
            many.len()
        ),
    };

    first
        .as_array()
        .ok_or_else(|| anyhow!("Invalid embed response: embedding is not an array"))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow!("Invalid embed response: non-numeric component"))
        })
        .collect()
}
