use docrag_core::error::Result;
use docrag_core::traits::TokenCounter;
use docrag_core::types::{Chunk, SplitterConf};
use tracing::debug;

use crate::chunk::render_chunks;
use crate::cut::refine;
use crate::dp::{find_best_split, ScoreWeights};
use crate::segment::{segment, Segment};

/// Markdown document to token-bounded chunks.
///
/// Holds no per-document state; one instance can serve many threads as long
/// as the token counter can.
pub struct Splitter<C: TokenCounter> {
    counter: C,
    conf: SplitterConf,
    weights: ScoreWeights,
}

impl<C: TokenCounter> Splitter<C> {
    /// Fails with `InvalidConfig` before any work when `conf` is inconsistent.
    pub fn new(counter: C, conf: SplitterConf) -> Result<Self> {
        conf.validate()?;
        Ok(Self { counter, conf, weights: ScoreWeights::default() })
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn conf(&self) -> &SplitterConf { &self.conf }

    pub fn counter(&self) -> &C { &self.counter }

    pub fn split_markdown(&self, markdown: &str, title: &str) -> Result<Vec<Chunk>> {
        let segments = segment(markdown, title, &self.counter)?;
        self.split_segments(&segments)
    }

    /// Group already counted segments into chunks.
    pub fn split_segments(&self, segments: &[Segment]) -> Result<Vec<Chunk>> {
        let refined = refine(segments, &self.conf, &self.weights, &self.counter)?;
        let tokens: Vec<usize> = refined.iter().map(Segment::tokens).collect();
        let levels: Vec<u8> = refined.iter().map(|s| s.level).collect();
        let points = find_best_split(&tokens, &levels, self.conf.split_best_min, self.conf.split_best_max, &self.weights);
        debug!(segments = segments.len(), refined = refined.len(), chunks = points.len() + 1, "split document");
        Ok(render_chunks(&refined, &points))
    }
}
