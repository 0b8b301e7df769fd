use docrag_core::types::Chunk;

use crate::segment::Segment;

/// Join the Markdown of `segments` without separators. Blank renderings are
/// left out of the text but their tokens still count.
pub fn render_chunk(segments: &[Segment]) -> Chunk {
    let mut markdown = String::new();
    let mut tokens = 0;
    for segment in segments {
        let text = segment.to_markdown();
        if !text.trim().is_empty() {
            markdown.push_str(&text);
        }
        tokens += segment.tokens();
    }
    Chunk { markdown, tokens }
}

/// One chunk per slice between consecutive split points.
pub fn render_chunks(segments: &[Segment], split_points: &[usize]) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(split_points.len() + 1);
    let mut from = 0;
    for &point in split_points {
        chunks.push(render_chunk(&segments[from..point]));
        from = point;
    }
    chunks.push(render_chunk(&segments[from..]));
    chunks
}
