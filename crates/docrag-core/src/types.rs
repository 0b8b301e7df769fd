//! Domain types shared by the splitter, the stores and the gateway.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type ChunkId = String;

/// Window parameters for the Markdown splitter, all measured in tokens.
///
/// - `segment_trigger_split_length`: a segment body above this is cut
/// - `segment_best_length`: target body size for the cut pieces
/// - `split_best_min`/`split_best_max`: desired chunk window; the midpoint
///   is the target and the half-width the tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConf {
    pub segment_trigger_split_length: usize,
    pub segment_best_length: usize,
    pub split_best_min: usize,
    pub split_best_max: usize,
}

impl SplitterConf {
    pub fn new(
        segment_trigger_split_length: usize,
        segment_best_length: usize,
        split_best_min: usize,
        split_best_max: usize,
    ) -> Self {
        Self { segment_trigger_split_length, segment_best_length, split_best_min, split_best_max }
    }

    pub fn validate(&self) -> Result<()> {
        if self.segment_trigger_split_length == 0 {
            return Err(Error::InvalidConfig("segment_trigger_split_length must be positive".into()));
        }
        if self.segment_best_length == 0 {
            return Err(Error::InvalidConfig("segment_best_length must be positive".into()));
        }
        if self.split_best_max == 0 {
            return Err(Error::InvalidConfig("split_best_max must be positive".into()));
        }
        if self.split_best_min > self.split_best_max {
            return Err(Error::InvalidConfig(format!(
                "split_best_min ({}) exceeds split_best_max ({})",
                self.split_best_min, self.split_best_max
            )));
        }
        Ok(())
    }
}

impl Default for SplitterConf {
    fn default() -> Self { Self::new(2000, 1200, 750, 1250) }
}

/// One rendered chunk of a document: Markdown text plus its token count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub markdown: String,
    pub tokens: usize,
}

impl Chunk {
    /// Debug listing: a `-----token:<tokens> (<chars>)-----` banner line
    /// followed by the chunk text and a newline, for every chunk.
    pub fn dump(chunks: &[Chunk]) -> String {
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&format!("-----token:{} ({})-----\n", chunk.tokens, chunk.markdown.chars().count()));
            out.push_str(&chunk.markdown);
            out.push('\n');
        }
        out
    }
}

/// Document-level metadata attached to every stored chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub id: String,
    pub title: String,
    pub project: String,
    pub url: String,
}

/// A chunk of a source document as it is indexed.
///
/// - `id`: content-addressed chunk identifier (see [`DocumentChunk::from_chunks`])
/// - `doc_*`: copied from the parent [`DocMeta`]
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_title: String,
    pub doc_project: String,
    pub doc_url: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl DocumentChunk {
    /// Attach document metadata to rendered chunks. Blank chunks are skipped.
    pub fn from_chunks(doc: &DocMeta, chunks: &[Chunk]) -> Vec<DocumentChunk> {
        let kept: Vec<&Chunk> = chunks.iter().filter(|c| !c.markdown.trim().is_empty()).collect();
        let total_chunks = kept.len();
        kept.into_iter()
            .enumerate()
            .map(|(chunk_index, c)| DocumentChunk {
                id: chunk_id(&doc.id, chunk_index, &c.markdown),
                doc_id: doc.id.clone(),
                doc_title: doc.title.clone(),
                doc_project: doc.project.clone(),
                doc_url: doc.url.clone(),
                content: c.markdown.clone(),
                chunk_index,
                total_chunks,
            })
            .collect()
    }
}

/// Stable id of a chunk; identical input re-ingested yields identical ids.
pub fn chunk_id(doc_id: &str, chunk_index: usize, content: &str) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(doc_id.as_bytes());
    hasher.update(&(chunk_index as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
    Hybrid,
}

/// The minimal surface returned by the keyword and vector engines.
///
/// `id` matches `DocumentChunk::id`. `score` is engine-specific but
/// higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// A ranked chunk as returned by a [`crate::traits::ChunkStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub body: String,
    pub score: f32,
    pub title: String,
    pub doc_id: String,
    pub doc_project: String,
    pub doc_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub project: Option<String>,
}

impl SearchFilter {
    pub fn project(project: impl Into<String>) -> Self { Self { project: Some(project.into()) } }

    pub fn accepts(&self, doc_project: &str) -> bool {
        self.project.as_deref().map_or(true, |p| p == doc_project)
    }
}
