//! Host content-tree abstraction.
//!
//! The engine never owns nodes. It reads the host tree through
//! [`ContentTree`] and tags nodes in its own side tables keyed by
//! [`NodeId`].

use core::fmt;

use crate::error::ReadifyError;
use crate::fragment::Fragment;

/// Opaque handle into the host content tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw arena index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw arena index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Host node category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Tree root (owns children, never eligible itself).
    Document,
    /// Element with tag and attributes.
    Element,
    /// Text-bearing leaf.
    Text,
    /// Anything the host cannot type more precisely (comments, instructions).
    Other,
}

/// Axis-aligned rectangle in viewport coordinates (CSS px).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Zero-sized rectangles are not rendered.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Rectangle offset vertically by `dy`.
    pub fn translated_y(&self, dy: f32) -> Self {
        Self::new(self.x, self.y + dy, self.width, self.height)
    }
}

/// Visible window of the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Read/replace access to the host content tree.
pub trait ContentTree {
    /// Node category, or `None` when the id is unknown to the host.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Lowercase tag name for elements.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Character data for text nodes.
    fn text(&self, node: NodeId) -> Option<&str>;

    /// Resolved value of a style property on an element.
    fn computed_style(&self, node: NodeId, property: &str) -> Option<&str>;

    /// On-screen box relative to the current viewport, `None` if not laid out.
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    fn viewport(&self) -> Viewport;

    /// True when `node` is reachable from the tree root.
    fn is_connected(&self, node: NodeId) -> bool;

    /// Replace text node `node` with the structure described by `fragment`.
    fn replace_text(&mut self, node: NodeId, fragment: &Fragment) -> Result<(), ReadifyError>;
}

/// Iterator over the direct children of a node.
pub struct Children<'a, T: ContentTree + ?Sized> {
    tree: &'a T,
    next: Option<NodeId>,
}

impl<T: ContentTree + ?Sized> Iterator for Children<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

pub fn children<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> Children<'_, T> {
    Children {
        tree,
        next: tree.first_child(node),
    }
}

/// Next node in pre-order below `root`.
///
/// With `descend == false` the subtree of `current` is skipped.
pub fn next_in_subtree<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    current: NodeId,
    descend: bool,
) -> Option<NodeId> {
    if descend {
        if let Some(child) = tree.first_child(current) {
            return Some(child);
        }
    }
    let mut node = current;
    loop {
        if node == root {
            return None;
        }
        if let Some(sibling) = tree.next_sibling(node) {
            return Some(sibling);
        }
        node = tree.parent(node)?;
    }
}

/// Pre-order iterator over `root` and all of its descendants.
pub struct Descendants<'a, T: ContentTree + ?Sized> {
    tree: &'a T,
    root: NodeId,
    next: Option<NodeId>,
}

impl<T: ContentTree + ?Sized> Iterator for Descendants<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = next_in_subtree(self.tree, self.root, current, true);
        Some(current)
    }
}

pub fn descendants<T: ContentTree + ?Sized>(tree: &T, root: NodeId) -> Descendants<'_, T> {
    Descendants {
        tree,
        root,
        next: Some(root),
    }
}

/// Nearest element at or above `node`.
pub fn element_of<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    match tree.kind(node)? {
        NodeKind::Element => Some(node),
        NodeKind::Text | NodeKind::Other => {
            let parent = tree.parent(node)?;
            (tree.kind(parent) == Some(NodeKind::Element)).then_some(parent)
        }
        NodeKind::Document => None,
    }
}

/// True when `ancestor` strictly contains `node`.
pub fn is_ancestor_of<T: ContentTree + ?Sized>(tree: &T, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = tree.parent(node);
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = tree.parent(parent);
    }
    false
}

/// True when any text below `node` contains an ASCII letter.
pub fn has_alphabetic_text<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    descendants(tree, node).any(|id| {
        tree.kind(id) == Some(NodeKind::Text)
            && tree
                .text(id)
                .is_some_and(|text| text.chars().any(|ch| ch.is_ascii_alphabetic()))
    })
}

/// Text that carries readable content: not blank, not only whitespace/ellipsis.
pub fn is_meaningful_text(text: &str) -> bool {
    text.chars()
        .any(|ch| !ch.is_whitespace() && ch != '\u{2026}')
}

/// Concatenated text of `node` and its descendants.
pub fn text_content<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> String {
    let mut out = String::new();
    for id in descendants(tree, node) {
        if tree.kind(id) == Some(NodeKind::Text) {
            if let Some(text) = tree.text(id) {
                out.push_str(text);
            }
        }
    }
    out
}
