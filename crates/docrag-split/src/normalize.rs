//! Removal of embedded images and hyperlinks before segmentation.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::tree::{MarkdownTree, NodeId, NodeKind};

static DATA_URI_IMAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)!\[[^\]]*\]\(data:image/[^)]+\)").ok());

/// Drop inline `data:image/...` images. Runs on raw text because some
/// converters emit image syntax the parser would not recognise as an image.
pub fn strip_data_uri_images(markdown: &str) -> Cow<'_, str> {
    match DATA_URI_IMAGE.as_ref() {
        Some(re) => re.replace_all(markdown, ""),
        None => Cow::Borrowed(markdown),
    }
}

/// Parse `markdown` with data-URI images removed, then detach every link,
/// image and link reference definition (children go with them).
///
/// Text left around a removed link can itself read as a link
/// (`[[a](b)](c)` leaves `[](c)`), so the result is re-parsed until no such
/// node remains. Each extra round removes at least one non-blank character.
pub fn normalize_tree(markdown: &str) -> MarkdownTree {
    let mut tree = MarkdownTree::parse(&strip_data_uri_images(markdown));
    loop {
        let root = tree.root();
        if remove_links(&mut tree, root) == 0 {
            return tree;
        }
        let next = MarkdownTree::parse(&strip_data_uri_images(&render_document(&tree)));
        if !has_links(&next, next.root()) {
            return tree;
        }
        tree = next;
    }
}

/// Normalized Markdown text. Applying it twice gives the same result as once.
pub fn normalize(markdown: &str) -> String {
    render_document(&normalize_tree(markdown))
}

fn render_document(tree: &MarkdownTree) -> String {
    let blocks: Vec<NodeId> = tree.children(tree.root()).collect();
    tree.render_markdown(&blocks)
}

fn is_link(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Link | NodeKind::Image | NodeKind::LinkReferenceDefinition)
}

/// Detach link-like nodes below `id`; returns how many were removed.
fn remove_links(tree: &mut MarkdownTree, id: NodeId) -> usize {
    if is_link(tree.kind(id)) {
        tree.detach(id);
        return 1;
    }
    let mut removed = 0;
    let mut child = tree.first_child(id);
    while let Some(c) = child {
        child = tree.next_sibling(c);
        removed += remove_links(tree, c);
    }
    removed
}

fn has_links(tree: &MarkdownTree, id: NodeId) -> bool {
    is_link(tree.kind(id)) || tree.children(id).any(|c| has_links(tree, c))
}
