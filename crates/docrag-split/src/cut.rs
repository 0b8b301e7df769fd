//! Subdivision of segments whose body is too large to fit any chunk.

use std::borrow::Cow;

use docrag_core::error::Result;
use docrag_core::traits::TokenCounter;
use docrag_core::types::SplitterConf;
use tracing::debug;

use crate::dp::ScoreWeights;
use crate::segment::Segment;

/// Replace every segment whose body exceeds `segment_trigger_split_length`
/// by line-packed pieces of about `segment_best_length` tokens each.
/// Returns the input untouched when nothing is oversize.
pub fn refine<'a>(
    segments: &'a [Segment],
    conf: &SplitterConf,
    weights: &ScoreWeights,
    counter: &impl TokenCounter,
) -> Result<Cow<'a, [Segment]>> {
    let trigger = conf.segment_trigger_split_length;
    if segments.iter().all(|s| s.body_tokens <= trigger) {
        return Ok(Cow::Borrowed(segments));
    }

    let mut refined = Vec::with_capacity(segments.len() + 2);
    for segment in segments {
        if segment.body_tokens <= trigger {
            refined.push(segment.clone());
        } else {
            let before = refined.len();
            cut_segment(segment, conf.segment_best_length, weights.cut_slack, counter, &mut refined)?;
            debug!(header = %segment.header, tokens = segment.body_tokens, pieces = refined.len() - before, "cut oversize segment");
        }
    }
    Ok(Cow::Owned(refined))
}

fn cut_segment(
    segment: &Segment,
    best_length: usize,
    slack: usize,
    counter: &impl TokenCounter,
    out: &mut Vec<Segment>,
) -> Result<()> {
    let total = segment.body_tokens;
    let best = best_length.max(1);
    let pieces = ((total + best).saturating_sub(slack) / best).max(1);
    let limit = (total / pieces).max(1);

    let mut lines: Vec<&str> = Vec::new();
    let mut tokens = 0;
    for line in segment.body.lines() {
        // Blank lines are dropped, including those inside code fences.
        if line.trim().is_empty() {
            continue;
        }
        let line_tokens = counter.count_tokens(line)?;
        if tokens + line_tokens < limit {
            lines.push(line);
            tokens += line_tokens;
        } else {
            if !lines.is_empty() {
                out.push(segment.with_body(lines.join("\n"), tokens));
            }
            lines = vec![line];
            tokens = line_tokens;
        }
    }
    if !lines.is_empty() {
        out.push(segment.with_body(lines.join("\n"), tokens));
    }
    Ok(())
}
