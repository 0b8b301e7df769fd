use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn index(e: impl std::fmt::Display) -> Self { Error::Index(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, Error>;
