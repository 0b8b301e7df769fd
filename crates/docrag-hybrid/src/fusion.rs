//! Score fusion and result cut-off for hybrid retrieval.

use std::cmp::Ordering;
use std::collections::HashMap;

use docrag_core::types::{ChunkId, SearchHit, SourceKind};

/// Min-max normalize `hits` into `[0, 1]`. A list whose scores are all equal maps to `1`.
pub fn normalize(hits: &[SearchHit]) -> HashMap<ChunkId, f32> {
    let (min, max) = hits.iter().fold((f32::MAX, f32::MIN), |(lo, hi), h| (lo.min(h.score), hi.max(h.score)));
    let span = max - min;
    hits.iter()
        .map(|h| {
            let score = if span > f32::EPSILON { (h.score - min) / span } else { 1.0 };
            (h.id.clone(), score)
        })
        .collect()
}

/// Relative score fusion: `alpha * vector + (1 - alpha) * keyword` over the
/// normalized lists, sorted by descending score (ties by id).
pub fn fuse(vector: &[SearchHit], keyword: &[SearchHit], alpha: f32) -> Vec<SearchHit> {
    let mut fused: HashMap<ChunkId, f32> = HashMap::new();
    for (id, score) in normalize(vector) {
        *fused.entry(id).or_default() += alpha * score;
    }
    for (id, score) in normalize(keyword) {
        *fused.entry(id).or_default() += (1.0 - alpha) * score;
    }
    let mut hits: Vec<SearchHit> = fused.into_iter().map(|(id, score)| SearchHit { id, score, source: SourceKind::Hybrid }).collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id)));
    hits
}

/// Number of leading results to keep. Scores (descending) are compared
/// with the straight line from the first to the last score; every local
/// maximum of the height above that line ends a group of similar scores,
/// and the list is cut after the `cut_off`-th group. `cut_off == 0` keeps
/// everything.
pub fn autocut(scores: &[f32], cut_off: usize) -> usize {
    let n = scores.len();
    if n <= 2 || cut_off == 0 {
        return n;
    }
    let (first, last) = (scores[0], scores[n - 1]);
    if (first - last).abs() <= f32::EPSILON {
        return n;
    }
    let step = 1.0 / (n as f32 - 1.0);
    let height: Vec<f32> = scores.iter().enumerate()
        .map(|(i, &y)| (y - last) / (first - last) - (1.0 - i as f32 * step))
        .collect();

    let mut groups = 0;
    for i in 1..n - 1 {
        if height[i] > height[i - 1] && height[i] > height[i + 1] {
            groups += 1;
            if groups >= cut_off {
                return i + 1;
            }
        }
    }
    n
}
