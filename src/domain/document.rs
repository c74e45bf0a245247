//! Arena-backed render tree standing in for the live document view.
//!
//! The host owns the tree; the engine only holds [`NodeId`] handles into it.
//! Handles are weak: removing a subtree bumps the generation of every freed
//! slot, so a stale handle reports `is_alive() == false` instead of aliasing a
//! newer node. Element rectangles are stored in page coordinates and converted
//! to viewport coordinates on every read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::geometry::{Rect, Viewport};

/// Attribute carried by every node the engine injects for display purposes.
/// Resolution and marking skip anything underneath such a node.
pub const OVERLAY_ATTR: &str = "data-al-overlay";

/// Weak handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Element payload
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    /// Page-space bounding box
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The live document: a tree of elements and text runs plus the viewport
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    viewport: Viewport,
}

impl Document {
    /// Create an empty document whose root is a `body` element covering the viewport
    pub fn new(viewport: Viewport) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            viewport,
        };
        let root = doc.create_element("body");
        doc.set_rect(root, Rect::new(0.0, 0.0, viewport.width, viewport.height));
        doc.root = root;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }))
    }

    /// Create a detached text run
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Whether the handle still refers to a node
    pub fn exists(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Whether the node exists and is attached under the root
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.exists(id) && self.contains(self.root, id)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, moving it if already attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.exists(parent) || !self.exists(child) || self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        if let Some(n) = self.node_mut(child) {
            n.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        true
    }

    /// Replace `old` in its parent with `replacements`, leaving `old` detached
    fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        for r in replacements {
            self.detach(*r);
            if let Some(n) = self.node_mut(*r) {
                n.parent = Some(parent);
            }
        }
        if let Some(p) = self.node_mut(parent) {
            if let Some(pos) = p.children.iter().position(|c| *c == old) {
                p.children.splice(pos..=pos, replacements.iter().copied());
            }
        }
        if let Some(n) = self.node_mut(old) {
            n.parent = None;
        }
        true
    }

    /// Detach a node and free its whole subtree. Outstanding handles go stale.
    pub fn remove(&mut self, id: NodeId) {
        if !self.exists(id) || id == self.root {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
        }
    }

    /// Ancestor-or-self test
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return self.exists(id);
            }
            current = self.parent(id);
        }
        false
    }

    /// All nodes under `root` in document order, excluding `root` itself
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Element descendants of `root` in document order
    pub fn elements_under(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.element(*id).is_some())
            .collect()
    }

    /// Text-run descendants of `root` in document order
    pub fn text_nodes(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.text(*id).is_some())
            .collect()
    }

    /// Nearest ancestor-or-self element satisfying `pred` (text nodes start at their parent)
    pub fn closest<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Element) -> bool,
    {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(el) = self.element(node) {
                if pred(el) {
                    return Some(node);
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// The element owning a text node, or the element itself
    pub fn owning_element(&self, id: NodeId) -> Option<NodeId> {
        if self.element(id).is_some() {
            Some(id)
        } else {
            self.parent(id)
        }
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// Concatenated text of every run under the node
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(t) = self.text(node) {
                out.push_str(t);
            }
        }
        out
    }

    pub fn find_by_id(&self, dom_id: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|id| {
                self.element(*id)
                    .and_then(|e| e.id.as_deref())
                    .is_some_and(|v| v == dom_id)
            })
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            if !el.classes.iter().any(|c| c == class) {
                el.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.classes.retain(|c| c != class);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|e| e.attrs.get(name))
            .map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.remove(name);
        }
    }

    /// Whether the node sits inside something the engine injected
    pub fn is_overlay(&self, id: NodeId) -> bool {
        self.closest(id, |e| e.attrs.contains_key(OVERLAY_ATTR))
            .is_some()
    }

    // ------------------------------------------------------------------
    // Text wrapping
    // ------------------------------------------------------------------

    /// Wrap bytes `start..end` of a text run in a new `tag` element.
    ///
    /// The run is split into up to three siblings; the wrapper takes the
    /// parent's rectangle. Returns the wrapper, or `None` if the range is
    /// empty, out of bounds, or not on char boundaries.
    pub fn wrap_text_range(
        &mut self,
        text_node: NodeId,
        start: usize,
        end: usize,
        tag: &str,
    ) -> Option<NodeId> {
        let text = self.text(text_node)?.to_string();
        if start >= end
            || end > text.len()
            || !text.is_char_boundary(start)
            || !text.is_char_boundary(end)
        {
            return None;
        }
        let parent = self.parent(text_node)?;
        let parent_rect = self.page_rect(parent).unwrap_or_default();

        let mut pieces = Vec::with_capacity(3);
        if start > 0 {
            pieces.push(self.create_text(&text[..start]));
        }
        let wrapper = self.create_element(tag);
        let inner = self.create_text(&text[start..end]);
        self.append_child(wrapper, inner);
        self.set_rect(wrapper, parent_rect);
        pieces.push(wrapper);
        if end < text.len() {
            pieces.push(self.create_text(&text[end..]));
        }

        self.replace_with(text_node, &pieces);
        self.remove(text_node);
        Some(wrapper)
    }

    /// Replace an element with a plain text run of its content and merge
    /// adjacent runs in the parent
    pub fn unwrap(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if self.element(id).is_none() {
            return false;
        }
        let text = self.text_content(id);
        let replacement = self.create_text(&text);
        self.replace_with(id, &[replacement]);
        self.remove(id);
        self.normalize(parent);
        true
    }

    /// Merge adjacent text children and drop empty ones
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            match self.text(child).map(str::to_string) {
                Some(t) if t.is_empty() => self.remove(child),
                Some(t) => {
                    if let Some(prev) = previous_text {
                        if let Some(Node {
                            kind: NodeKind::Text(existing),
                            ..
                        }) = self.node_mut(prev)
                        {
                            existing.push_str(&t);
                        }
                        self.remove(child);
                    } else {
                        previous_text = Some(child);
                    }
                }
                None => previous_text = None,
            }
        }
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        if let Some(el) = self.element_mut(id) {
            el.rect = rect;
        }
    }

    /// Page-space rectangle; text runs report their parent's
    pub fn page_rect(&self, id: NodeId) -> Option<Rect> {
        let el = self.owning_element(id)?;
        self.element(el).map(|e| e.rect)
    }

    /// Viewport-space rectangle, recomputed from the current scroll offset.
    /// `None` once the node has detached.
    pub fn client_rect(&self, id: NodeId) -> Option<Rect> {
        if !self.is_alive(id) {
            return None;
        }
        self.page_rect(id)
            .map(|r| r.offset(self.viewport.scroll_x, self.viewport.scroll_y))
    }

    /// Place an element at a viewport-space rectangle (fixed positioning)
    pub fn set_client_rect(&mut self, id: NodeId, client: Rect) {
        let vp = self.viewport;
        self.set_rect(id, client.offset(-vp.scroll_x, -vp.scroll_y));
    }

    fn max_scroll_y(&self) -> f64 {
        let doc_bottom = self
            .element(self.root)
            .map(|e| e.rect.bottom)
            .unwrap_or(self.viewport.height);
        (doc_bottom - self.viewport.height).max(0.0)
    }

    /// Scroll vertically, clamped to the document extent. Returns the applied offset.
    pub fn scroll_to(&mut self, y: f64) -> f64 {
        let clamped = y.clamp(0.0, self.max_scroll_y());
        self.viewport.scroll_y = clamped;
        clamped
    }

    /// Center the node vertically in the viewport
    pub fn scroll_into_view(&mut self, id: NodeId) -> Option<f64> {
        let rect = self.page_rect(id)?;
        Some(self.scroll_to(rect.mid_y() - self.viewport.height / 2.0))
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        let max = self.max_scroll_y();
        if self.viewport.scroll_y > max {
            self.viewport.scroll_y = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new(Viewport::default());
        let p = doc.create_element("p");
        let t = doc.create_text("hello brave world");
        doc.append_child(p, t);
        let root = doc.root();
        doc.append_child(root, p);
        doc.set_rect(p, Rect::new(0.0, 1000.0, 400.0, 1040.0));
        (doc, p, t)
    }

    #[test]
    fn test_removed_handles_go_stale() {
        let (mut doc, p, t) = sample();
        assert!(doc.is_alive(t));
        doc.remove(p);
        assert!(!doc.is_alive(p));
        assert!(!doc.exists(t));

        // Slot reuse must not resurrect the old handle
        let fresh = doc.create_element("div");
        assert!(doc.exists(fresh));
        assert!(!doc.exists(p));
    }

    #[test]
    fn test_wrap_then_unwrap_restores_text() {
        let (mut doc, p, t) = sample();
        let mark = doc.wrap_text_range(t, 6, 11, "mark").unwrap();
        assert_eq!(doc.text_content(mark), "brave");
        assert_eq!(doc.children(p).len(), 3);
        assert_eq!(doc.text_content(p), "hello brave world");

        assert!(doc.unwrap(mark));
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), "hello brave world");
    }

    #[test]
    fn test_wrap_rejects_non_boundary() {
        let mut doc = Document::new(Viewport::default());
        let t = doc.create_text("목적");
        let root = doc.root();
        doc.append_child(root, t);
        assert!(doc.wrap_text_range(t, 1, 3, "mark").is_none());
        assert!(doc.wrap_text_range(t, 0, 3, "mark").is_some());
    }

    #[test]
    fn test_client_rect_tracks_scroll() {
        let (mut doc, p, _) = sample();
        let root = doc.root();
        doc.set_rect(root, Rect::new(0.0, 0.0, 1280.0, 4000.0));
        doc.scroll_to(600.0);
        assert_eq!(doc.client_rect(p).unwrap().top, 400.0);

        doc.scroll_into_view(p);
        let client = doc.client_rect(p).unwrap();
        assert!((client.mid_y() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let (mut doc, _, _) = sample();
        assert_eq!(doc.scroll_to(500.0), 0.0);
        assert_eq!(doc.scroll_to(-20.0), 0.0);
    }
}
