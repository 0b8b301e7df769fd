//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_GATEWAY__PORT=8000`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::SplitterConf;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current directory.
    pub fn load() -> Result<Self> { Self::load_from(Path::new(".")) }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base_dir: dir.to_path_buf() })
    }

    pub fn from_figment(figment: Figment, base_dir: &Path) -> Self {
        Self { figment, base_dir: base_dir.to_path_buf() }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// The typed settings, validated.
    pub fn settings(&self) -> Result<AppConfig> {
        let settings: AppConfig = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn base_dir(&self) -> &Path { &self.base_dir }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub splitter: SplitterConf,
    pub tokenizer: TokenizerConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
    pub sources: Vec<SourceConfig>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.splitter.validate()?;
        if !(0.0..=1.0).contains(&self.store.alpha) {
            return Err(Error::InvalidConfig(format!("store.alpha must be within [0, 1], got {}", self.store.alpha)));
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub model: String,
    /// Local `tokenizer.json`; when unset, `<model>/tokenizer.json` under `APP_MODEL_DIR`.
    pub file: Option<String>,
    pub model_max_length: usize,
    pub max_length: usize,
    /// Count the special tokens the model's post-processor adds (e.g. BOS).
    pub add_special_tokens: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-ai/DeepSeek-R1-0528".to_string(),
            file: None,
            model_max_length: 128_000,
            max_length: 100_000,
            add_special_tokens: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Hash,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub endpoint: String,
    pub model: String,
    pub dim: usize,
    /// Prepended to queries (never to documents) before embedding.
    pub query_instruct: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            endpoint: "http://localhost:11434".to_string(),
            model: "dengcao/Qwen3-Embedding-0.6B:F16".to_string(),
            dim: 1024,
            query_instruct: "Instruct: Given a Chinese search query, retrieve relevant passages that answer the question. Query: ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub index_dir: String,
    /// Share of the vector score in the fused score.
    pub alpha: f32,
    /// Cut results after this many score jumps; `0` disables.
    pub autocut: usize,
    pub candidate_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { index_dir: "data/indexes".to_string(), alpha: 0.75, autocut: 2, candidate_limit: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Accepted bearer keys; empty accepts any well-formed header.
    pub api_keys: Vec<String>,
    /// Known knowledge ids; empty accepts any id.
    pub knowledge_ids: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 7000, api_keys: vec![], knowledge_ids: vec![] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Prefix of every doc id from this source (e.g. `svn`).
    pub kind: String,
    pub dir: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Directory name -> project name. Non-empty maps skip unlisted projects.
    #[serde(default)]
    pub projects: BTreeMap<String, String>,
}

fn default_encoding() -> String { "utf-8".to_string() }

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
