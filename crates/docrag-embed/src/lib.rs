pub mod hash;
pub mod ollama;
pub mod tokenize;

use docrag_core::config::{EmbeddingConfig, EmbeddingProvider};
use docrag_core::error::Result;
use docrag_core::traits::Embedder;
use tracing::info;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;
pub use tokenize::{get_default_token_counter, HeuristicTokenCounter, HfTokenCounter};

/// `APP_USE_FAKE_EMBEDDINGS=1` forces [`HashEmbedder`] regardless of the configured provider.
pub fn get_default_embedder(conf: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake || conf.provider == EmbeddingProvider::Hash {
        info!(dim = conf.dim, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(conf.dim)));
    }
    info!(endpoint = %conf.endpoint, model = %conf.model, "using ollama embedder");
    Ok(Box::new(OllamaEmbedder::new(conf.endpoint.clone(), conf.model.clone(), conf.dim)))
}
