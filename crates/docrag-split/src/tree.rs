//! Arena-backed Markdown syntax tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`], so
//! detaching a subtree is a constant-time relink with no reference counting.
//! Every node remembers the source span it was parsed from; rendering back to
//! Markdown slices the source text and leaves out the spans of detached
//! nodes, which keeps fences, list markers and emphasis exactly as written.

use pulldown_cmark::{Event, Options, Parser, Tag};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Heading { level: u8 },
    Paragraph,
    BlockQuote,
    CodeBlock,
    List { ordered: bool },
    Item,
    Table,
    HtmlBlock,
    ThematicBreak,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    LinkReferenceDefinition,
    Text,
    Code,
    InlineHtml,
    SoftBreak,
    HardBreak,
    Other,
}

impl NodeKind {
    /// Kinds that may hold other blocks (and therefore link reference definitions).
    fn is_container(self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::BlockQuote | NodeKind::List { .. } | NodeKind::Item)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Range<usize>,
    /// Decoded text for `Text`, `Code` and raw HTML leaves.
    pub literal: Option<String>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MarkdownTree {
    source: String,
    nodes: Vec<Node>,
    cuts: Vec<Range<usize>>,
}

impl MarkdownTree {
    /// Parse CommonMark (plus tables and strikethrough). Never fails: any
    /// input is some Markdown document.
    pub fn parse(source: &str) -> Self {
        let mut tree = Self { source: source.to_string(), nodes: Vec::new(), cuts: Vec::new() };
        let root = tree.alloc(NodeKind::Document, 0..source.len(), None);

        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let mut events = Parser::new_ext(source, options).into_offset_iter();
        let mut stack = vec![root];
        for (event, span) in &mut events {
            let parent = stack.last().copied().unwrap_or(root);
            match event {
                Event::Start(tag) => {
                    let id = tree.alloc(kind_of(&tag), span, None);
                    tree.append_child(parent, id);
                    stack.push(id);
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                other => {
                    let (kind, literal) = match other {
                        Event::Text(t) => (NodeKind::Text, Some(t.to_string())),
                        Event::Code(t) => (NodeKind::Code, Some(t.to_string())),
                        Event::InlineHtml(t) => (NodeKind::InlineHtml, Some(t.to_string())),
                        Event::Html(t) => (NodeKind::Other, Some(t.to_string())),
                        Event::SoftBreak => (NodeKind::SoftBreak, None),
                        Event::HardBreak => (NodeKind::HardBreak, None),
                        Event::Rule => (NodeKind::ThematicBreak, None),
                        _ => (NodeKind::Other, None),
                    };
                    let id = tree.alloc(kind, span, literal);
                    tree.append_child(parent, id);
                }
            }
        }

        // Definitions produce no events; graft them where they were written.
        let mut defs: Vec<Range<usize>> =
            events.reference_definitions().iter().map(|(_, def)| def.span.clone()).collect();
        defs.sort_by_key(|r| r.start);
        for span in defs {
            let container = tree.innermost_container(&span);
            let id = tree.alloc(NodeKind::LinkReferenceDefinition, span, None);
            tree.insert_ordered(container, id);
        }
        tree
    }

    pub fn root(&self) -> NodeId { NodeId(0) }

    pub fn source(&self) -> &str { &self.source }

    pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id.0] }

    pub fn kind(&self, id: NodeId) -> NodeKind { self.nodes[id.0].kind }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.nodes[id.0].parent }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> { self.nodes[id.0].first_child }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> { self.nodes[id.0].next }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children { tree: self, next: self.first_child(id) }
    }

    /// Unlink `id` (with its subtree) from its parent. Its source span is
    /// excluded from every later Markdown rendering.
    pub fn detach(&mut self, id: NodeId) {
        let Node { parent, prev, next, .. } = self.nodes[id.0].clone();
        let Some(parent) = parent else { return };
        match prev {
            Some(p) => self.nodes[p.0].next = next,
            None => self.nodes[parent.0].first_child = next,
        }
        match next {
            Some(n) => self.nodes[n.0].prev = prev,
            None => self.nodes[parent.0].last_child = prev,
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev = None;
        node.next = None;
        let span = node.span.clone();
        self.cuts.push(span);
    }

    /// Markdown for a run of block nodes: each block ends with a newline and
    /// consecutive blocks are separated by one blank line. Blocks that are
    /// empty once detached spans are removed are skipped.
    pub fn render_markdown(&self, blocks: &[NodeId]) -> String {
        let rendered: Vec<String> = blocks
            .iter()
            .map(|&id| self.render_block(id))
            .filter(|text| !text.trim().is_empty())
            .map(|text| format!("{}\n", text.trim_end()))
            .collect();
        rendered.join("\n")
    }

    /// Concatenated text content of the attached descendants of `id`.
    pub fn plain_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text | NodeKind::Code => out.push_str(node.literal.as_deref().unwrap_or_default()),
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push('\n'),
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn render_block(&self, id: NodeId) -> String {
        let span = &self.node(id).span;
        let start = self.source[..span.start].rfind('\n').map_or(0, |i| i + 1);
        let end = span.end.min(self.source.len());

        let mut cuts: Vec<&Range<usize>> = self.cuts.iter().filter(|c| c.start < end && c.end > start).collect();
        cuts.sort_by_key(|c| c.start);

        let mut out = String::with_capacity(end - start);
        let mut pos = start;
        for cut in cuts {
            if cut.start > pos {
                out.push_str(&self.source[pos..cut.start]);
            }
            pos = pos.max(cut.end);
        }
        if pos < end {
            out.push_str(&self.source[pos..end]);
        }
        out
    }

    fn alloc(&mut self, kind: NodeKind, span: Range<usize>, literal: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            span,
            literal,
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
        });
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let last = self.nodes[parent.0].last_child;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev = last;
        match last {
            Some(l) => self.nodes[l.0].next = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Insert `child` among `parent`'s children keeping source order.
    fn insert_ordered(&mut self, parent: NodeId, child: NodeId) {
        let start = self.nodes[child.0].span.start;
        let Some(before) = self.children(parent).find(|&c| self.nodes[c.0].span.start > start) else {
            self.append_child(parent, child);
            return;
        };
        let prev = self.nodes[before.0].prev;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev = prev;
        self.nodes[child.0].next = Some(before);
        self.nodes[before.0].prev = Some(child);
        match prev {
            Some(p) => self.nodes[p.0].next = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
    }

    fn innermost_container(&self, span: &Range<usize>) -> NodeId {
        let mut current = self.root();
        'descend: loop {
            for child in self.children(current) {
                let node = self.node(child);
                if node.kind.is_container() && node.span.start <= span.start && span.end <= node.span.end {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }
}

pub struct Children<'a> {
    tree: &'a MarkdownTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

fn kind_of(tag: &Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading { level: *level as u8 },
        Tag::BlockQuote { .. } => NodeKind::BlockQuote,
        Tag::CodeBlock { .. } => NodeKind::CodeBlock,
        Tag::HtmlBlock => NodeKind::HtmlBlock,
        Tag::List(start) => NodeKind::List { ordered: start.is_some() },
        Tag::Item => NodeKind::Item,
        Tag::Table { .. } => NodeKind::Table,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link { .. } => NodeKind::Link,
        Tag::Image { .. } => NodeKind::Image,
        _ => NodeKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_level(tree: &MarkdownTree) -> Vec<NodeKind> {
        tree.children(tree.root()).map(|id| tree.kind(id)).collect()
    }

    #[test]
    fn builds_block_structure() {
        let tree = MarkdownTree::parse("# Title\n\npara\n\n- a\n- b\n\n```rust\nfn x() {}\n```\n\n---\n");
        assert_eq!(
            top_level(&tree),
            vec![
                NodeKind::Heading { level: 1 },
                NodeKind::Paragraph,
                NodeKind::List { ordered: false },
                NodeKind::CodeBlock,
                NodeKind::ThematicBreak,
            ]
        );
    }

    #[test]
    fn detach_relinks_siblings() {
        let mut tree = MarkdownTree::parse("a\n\nb\n\nc\n");
        let ids: Vec<NodeId> = tree.children(tree.root()).collect();
        tree.detach(ids[1]);
        assert_eq!(tree.children(tree.root()).collect::<Vec<_>>(), vec![ids[0], ids[2]]);
        assert_eq!(tree.parent(ids[1]), None);
        tree.detach(ids[0]);
        tree.detach(ids[2]);
        assert_eq!(tree.first_child(tree.root()), None);
    }

    #[test]
    fn reference_definitions_are_grafted_in_order() {
        let tree = MarkdownTree::parse("intro\n\n[home]: https://example.com\n\nouter\n\n> [q]: /quote\n> quoted\n");
        let kinds = top_level(&tree);
        assert_eq!(kinds[1], NodeKind::LinkReferenceDefinition);
        assert_eq!(kinds[2], NodeKind::Paragraph);
        let quote = tree.children(tree.root()).last().unwrap();
        let inner: Vec<NodeKind> = tree.children(quote).map(|id| tree.kind(id)).collect();
        assert_eq!(inner[0], NodeKind::LinkReferenceDefinition);
    }

    #[test]
    fn render_skips_detached_spans() {
        let mut tree = MarkdownTree::parse("see [docs](http://x.y) now\n");
        let para = tree.first_child(tree.root()).unwrap();
        let link = tree.children(para).find(|&c| tree.kind(c) == NodeKind::Link).unwrap();
        tree.detach(link);
        assert_eq!(tree.render_markdown(&[para]), "see  now\n");
        assert_eq!(tree.plain_text(para), "see  now");
    }

    #[test]
    fn heading_plain_text_joins_inline_content() {
        let tree = MarkdownTree::parse("## Use `cargo` *now*\n");
        let heading = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.plain_text(heading).trim(), "Use cargo now");
    }
}
