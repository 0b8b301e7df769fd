use crate::error::Result;
use crate::source::SourceDocument;
use crate::types::{Chunk, DocMeta, DocumentChunk, RetrievedChunk, SearchFilter, SearchHit};

/// Counts model tokens. Must be deterministic and callable from many
/// document pipelines at once.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

impl<T: TokenCounter + ?Sized> TokenCounter for &T {
    fn count_tokens(&self, text: &str) -> Result<usize> { (**self).count_tokens(text) }
}

impl<T: TokenCounter + ?Sized> TokenCounter for Box<T> {
    fn count_tokens(&self, text: &str) -> Result<usize> { (**self).count_tokens(text) }
}

impl<T: TokenCounter + ?Sized> TokenCounter for std::sync::Arc<T> {
    fn count_tokens(&self, text: &str) -> Result<usize> { (**self).count_tokens(text) }
}

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub trait TextIndexer: Send + Sync {
    fn index(&self, chunks: &[DocumentChunk]) -> Result<()>;
    fn delete_doc(&self, doc_id: &str) -> Result<()>;
    fn replace_doc(&self, doc_id: &str, chunks: &[DocumentChunk]) -> Result<()> {
        self.delete_doc(doc_id)?;
        self.index(chunks)
    }
    fn search(&self, query: &str, filter: &SearchFilter, k: usize) -> Result<Vec<SearchHit>>;
    fn get(&self, id: &str) -> Result<Option<DocumentChunk>>;
}

pub trait VectorIndexer: Send + Sync {
    fn index(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()>;
    fn delete_doc(&self, doc_id: &str) -> Result<()>;
    fn replace_doc(&self, doc_id: &str, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
        self.delete_doc(doc_id)?;
        self.index(chunks, embeddings)
    }
    fn search_vec(&self, query_vec: &[f32], filter: &SearchFilter, k: usize) -> Result<Vec<SearchHit>>;
}

/// Persists chunks and answers ranked queries over them.
pub trait ChunkStore: Send + Sync {
    /// Replace every chunk of `doc` with `chunks`. Returns the number stored.
    fn write(&self, doc: &DocMeta, chunks: &[Chunk]) -> Result<usize>;
    fn delete_doc(&self, doc_id: &str) -> Result<()>;
    fn search(&self, query: &str, filter: &SearchFilter, top_k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Yields the documents to ingest.
pub trait DocumentSource: Send + Sync {
    fn documents(&self) -> Result<Vec<SourceDocument>>;
}
