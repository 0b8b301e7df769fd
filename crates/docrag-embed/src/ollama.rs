use std::time::Duration;

use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from an Ollama server (`POST <endpoint>/api/embed`).
///
/// Blocking: call it from a worker thread, never from an async task.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    dim: usize,
    timeout: Duration,
}

impl OllamaEmbedder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dim: usize) -> Self {
        Self { endpoint: endpoint.into(), model: model.into(), dim, timeout: Duration::from_secs(120) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self { self.timeout = timeout; self }

    fn url(&self) -> String { format!("{}/api/embed", self.endpoint.trim_end_matches('/')) }
}

impl Embedder for OllamaEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(vec![]); }
        // A blocking client must be created and dropped off the async runtime.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Embedding(e.to_string()))?;
        debug!(model = %self.model, batch = texts.len(), "requesting embeddings");
        let resp = client
            .post(self.url())
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Embedding(format!("Ollama request failed: {}", e)))?;
        let body: EmbedResponse = resp.json().map_err(|e| Error::Embedding(format!("Invalid Ollama response: {}", e)))?;
        if body.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!("expected {} embeddings, got {}", texts.len(), body.embeddings.len())));
        }
        if let Some(bad) = body.embeddings.iter().find(|v| v.len() != self.dim) {
            return Err(Error::Embedding(format!("expected dimension {}, got {}", self.dim, bad.len())));
        }
        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint() {
        let e = OllamaEmbedder::new("http://localhost:11434/", "m", 8);
        assert_eq!(e.url(), "http://localhost:11434/api/embed");
    }

    #[test]
    fn empty_batch_needs_no_server() {
        let e = OllamaEmbedder::new("http://127.0.0.1:9", "m", 8);
        assert!(e.embed_batch(&[]).unwrap().is_empty());
    }
}
