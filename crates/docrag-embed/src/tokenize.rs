use std::path::{Path, PathBuf};

use docrag_core::config::{expand_path, TokenizerConfig};
use docrag_core::error::{Error, Result};
use docrag_core::traits::TokenCounter;
use tokenizers::Tokenizer;
use tracing::info;

/// Subword token counts from a Hugging Face `tokenizer.json`.
///
/// Truncation is disabled: `model_max_length`/`max_length` are kept for
/// reporting only and never shorten the counted text. Empty text counts as
/// zero even when special tokens are added.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
    add_special_tokens: bool,
    model_name: String,
    model_max_length: usize,
    max_length: usize,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path, conf: &TokenizerConfig) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| Error::TokenizerUnavailable(format!("Failed to load tokenizer from {}: {}", path.display(), e)))?;
        tokenizer.with_truncation(None).map_err(|e| Error::TokenizerUnavailable(e.to_string()))?;
        tokenizer.with_padding(None);
        Ok(Self {
            tokenizer,
            add_special_tokens: conf.add_special_tokens,
            model_name: conf.model.clone(),
            model_max_length: conf.model_max_length,
            max_length: conf.max_length,
        })
    }

    pub fn model_name(&self) -> &str { &self.model_name }

    pub fn limits(&self) -> (usize, usize) { (self.model_max_length, self.max_length) }
}

impl TokenCounter for HfTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        if text.is_empty() { return Ok(0); }
        let enc = self.tokenizer.encode(text, self.add_special_tokens).map_err(|e| Error::TokenizerUnavailable(format!("Tokenization failed: {}", e)))?;
        Ok(enc.get_ids().len())
    }
}

/// Deterministic stand-in for a subword tokenizer: one token per run of ASCII
/// letters/digits and one per any other non-whitespace character (so each CJK
/// character counts once).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        let mut count = 0;
        let mut in_word = false;
        for c in text.chars() {
            if c.is_ascii_alphanumeric() {
                if !in_word { count += 1; }
                in_word = true;
            } else {
                in_word = false;
                if !c.is_whitespace() { count += 1; }
            }
        }
        Ok(count)
    }
}

/// `APP_USE_FAKE_TOKENIZER=1` selects [`HeuristicTokenCounter`]; otherwise the
/// `tokenizer.json` of the configured model is loaded.
pub fn get_default_token_counter(conf: &TokenizerConfig) -> Result<Box<dyn TokenCounter>> {
    let use_fake = std::env::var("APP_USE_FAKE_TOKENIZER").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake {
        info!("using heuristic token counter");
        return Ok(Box::new(HeuristicTokenCounter));
    }
    let path = resolve_tokenizer_file(conf)?;
    info!(model = %conf.model, path = %path.display(), "loading tokenizer");
    Ok(Box::new(HfTokenCounter::from_file(&path, conf)?))
}

fn resolve_tokenizer_file(conf: &TokenizerConfig) -> Result<PathBuf> {
    if let Some(file) = &conf.file {
        let p = expand_path(file);
        if p.exists() { return Ok(p); }
        return Err(Error::TokenizerUnavailable(format!("tokenizer file {} does not exist", p.display())));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(dir).join(&conf.model).join("tokenizer.json");
            if p.exists() { return Ok(p); }
        }
    }
    let local = Path::new("models").join(&conf.model).join("tokenizer.json");
    if local.exists() { return Ok(local); }
    Err(Error::TokenizerUnavailable(format!("Could not locate tokenizer.json for {}", conf.model)))
}
