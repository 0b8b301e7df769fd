//! Heading-delimited segments of a normalized document.

use docrag_core::error::Result;
use docrag_core::traits::TokenCounter;

use crate::normalize::normalize_tree;
use crate::tree::{MarkdownTree, NodeId, NodeKind};

/// One heading's worth of content.
///
/// `level` is `0` only for the synthetic title segment that opens every
/// document; `1..=6` follow the Markdown heading depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub header: String,
    pub level: u8,
    pub body: String,
    pub header_tokens: usize,
    pub body_tokens: usize,
}

impl Segment {
    pub fn new(header: impl Into<String>, level: u8, body: impl Into<String>) -> Self {
        Self { header: header.into(), level, body: body.into(), header_tokens: 0, body_tokens: 0 }
    }

    pub fn tokens(&self) -> usize { self.header_tokens + self.body_tokens }

    /// A piece of this segment: same heading, different body.
    pub fn with_body(&self, body: String, body_tokens: usize) -> Self {
        Self { header: self.header.clone(), level: self.level, body, header_tokens: self.header_tokens, body_tokens }
    }

    /// The heading is restored for `level > 0`; the title segment renders as its body alone.
    pub fn to_markdown(&self) -> String {
        if self.level == 0 {
            return self.body.clone();
        }
        format!("{} {}\n{}", "#".repeat(usize::from(self.level)), self.header, self.body)
    }

    pub fn count_tokens(&mut self, counter: &impl TokenCounter) -> Result<()> {
        self.header_tokens = counter.count_tokens(&self.header)?;
        self.body_tokens = counter.count_tokens(&self.body)?;
        Ok(())
    }
}

/// Cut the top-level blocks of `tree` at every heading. Token counts are left at zero.
pub fn split_by_headings(tree: &MarkdownTree, title: &str) -> Vec<Segment> {
    let mut segments = vec![Segment::new(title, 0, "")];
    let mut body: Vec<NodeId> = Vec::new();

    for block in tree.children(tree.root()) {
        if let NodeKind::Heading { level } = tree.kind(block) {
            close_body(tree, &mut segments, &mut body);
            segments.push(Segment::new(tree.plain_text(block).trim(), level, ""));
        } else {
            body.push(block);
        }
    }
    close_body(tree, &mut segments, &mut body);
    segments
}

fn close_body(tree: &MarkdownTree, segments: &mut [Segment], body: &mut Vec<NodeId>) {
    if let Some(current) = segments.last_mut() {
        current.body = tree.render_markdown(body);
    }
    body.clear();
}

/// Normalize, split by headings and count tokens for every header and body.
pub fn segment(markdown: &str, title: &str, counter: &impl TokenCounter) -> Result<Vec<Segment>> {
    let tree = normalize_tree(markdown);
    let mut segments = split_by_headings(&tree, title);
    for segment in &mut segments {
        segment.count_tokens(counter)?;
    }
    Ok(segments)
}
