//! Hybrid chunk store: a keyword index and a vector index written together
//! and queried together, with relative score fusion and autocut.

pub mod fusion;

use std::path::Path;

use tracing::{debug, info, warn};

use docrag_core::config::{EmbeddingConfig, StoreConfig};
use docrag_core::error::{Error, Result};
use docrag_core::traits::{ChunkStore, Embedder, TextIndexer, VectorIndexer};
use docrag_core::types::{Chunk, DocMeta, DocumentChunk, RetrievedChunk, SearchFilter};
use docrag_embed::get_default_embedder;
use docrag_text::TantivyIndexer;
use docrag_vector::{LanceVectorIndexer, DEFAULT_TABLE};

use crate::fusion::{autocut, fuse};

pub struct HybridStore<TI, VI> where TI: TextIndexer, VI: VectorIndexer {
    text: TI,
    vector: VI,
    embedder: Box<dyn Embedder>,
    conf: StoreConfig,
    query_instruct: String,
}

impl<TI, VI> HybridStore<TI, VI> where TI: TextIndexer, VI: VectorIndexer {
    pub fn new(text: TI, vector: VI, embedder: Box<dyn Embedder>, conf: StoreConfig) -> Self {
        Self { text, vector, embedder, conf, query_instruct: String::new() }
    }

    /// Prefix prepended to queries before they are embedded. Documents are embedded as-is.
    pub fn with_query_instruct(mut self, instruct: impl Into<String>) -> Self {
        self.query_instruct = instruct.into();
        self
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embedder.embed_batch(texts)?;
        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!("{} texts but {} embeddings", texts.len(), embeddings.len())));
        }
        Ok(embeddings)
    }
}

/// The on-disk store: tantivy under `<index_dir>/tantivy`, LanceDB under `<index_dir>/lancedb`.
pub type DiskStore = HybridStore<TantivyIndexer, LanceVectorIndexer>;

impl DiskStore {
    pub fn open(index_dir: &Path, store: &StoreConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        let embedder = get_default_embedder(embedding)?;
        let text = TantivyIndexer::open_or_create(&index_dir.join("tantivy"))?;
        let vector = LanceVectorIndexer::open(&index_dir.join("lancedb"), DEFAULT_TABLE, embedder.dim())?;
        info!(dir = %index_dir.display(), chunks = text.num_chunks(), "opened hybrid store");
        Ok(Self::new(text, vector, embedder, store.clone()).with_query_instruct(embedding.query_instruct.clone()))
    }
}

impl<TI, VI> ChunkStore for HybridStore<TI, VI> where TI: TextIndexer, VI: VectorIndexer {
    fn write(&self, doc: &DocMeta, chunks: &[Chunk]) -> Result<usize> {
        let chunks = DocumentChunk::from_chunks(doc, chunks);
        if chunks.is_empty() {
            warn!(doc_id = %doc.id, "document has no content, removing it from the store");
            self.delete_doc(&doc.id)?;
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embed(&texts)?;
        // Text first: a failed vector write then takes the document out of
        // both halves instead of leaving them on different versions.
        self.text.replace_doc(&doc.id, &chunks)?;
        if let Err(e) = self.vector.replace_doc(&doc.id, &chunks, &embeddings) {
            warn!(doc_id = %doc.id, error = %e, "vector write failed, removing document");
            if let Err(cleanup) = self.delete_doc(&doc.id) {
                warn!(doc_id = %doc.id, error = %cleanup, "could not remove partially written document");
            }
            return Err(e);
        }
        info!(doc_id = %doc.id, chunks = chunks.len(), "stored document");
        Ok(chunks.len())
    }

    fn delete_doc(&self, doc_id: &str) -> Result<()> {
        self.vector.delete_doc(doc_id)?;
        self.text.delete_doc(doc_id)
    }

    fn search(&self, query: &str, filter: &SearchFilter, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(vec![]);
        }
        let k = self.conf.candidate_limit.max(top_k);
        let keyword_hits = self.text.search(query, filter, k)?;
        let query_vec = self.embed(&[format!("{}{}", self.query_instruct, query)])?.remove(0);
        let vector_hits = self.vector.search_vec(&query_vec, filter, k)?;

        let mut fused = fuse(&vector_hits, &keyword_hits, self.conf.alpha);
        let scores: Vec<f32> = fused.iter().map(|h| h.score).collect();
        fused.truncate(autocut(&scores, self.conf.autocut).min(top_k));
        debug!(keyword = keyword_hits.len(), vector = vector_hits.len(), kept = fused.len(), "hybrid search");

        let mut results = Vec::with_capacity(fused.len());
        for hit in fused {
            match self.text.get(&hit.id)? {
                Some(chunk) => results.push(RetrievedChunk {
                    body: chunk.content,
                    score: hit.score,
                    title: chunk.doc_title,
                    doc_id: chunk.doc_id,
                    doc_project: chunk.doc_project,
                    doc_url: chunk.doc_url,
                }),
                None => warn!(id = %hit.id, "vector hit has no stored chunk"),
            }
        }
        Ok(results)
    }
}
