//! Arena document model.
//!
//! Widgets live in a [`Document`]: a slotmap of element and text nodes with
//! parent/child links. [`NodeId`]s stay valid until the node is removed and
//! are never reused for a different node, so side tables keyed by them
//! (`SecondaryMap`) never alias.

mod html;
mod selector;

pub use selector::{Selector, SelectorError};

use slotmap::{new_key_type, SlotMap};
use webdesk_engine::coords::Rect;

new_key_type! {
    /// Stable identity of a node in a [`Document`].
    pub struct NodeId;
}

// ── Node data ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementData {
    pub tag: String,
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    style: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout: Rect,
}

/// Owned copy of a subtree, used to clone within or across documents.
struct Snapshot {
    kind: NodeKind,
    layout: Rect,
    children: Vec<Snapshot>,
}

// ── Document ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Document {
    nodes: SlotMap<NodeId, NodeData>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(NodeData { kind, parent: None, children: Vec::new(), layout: Rect::default() })
    }

    /// Creates a detached element. The tag is lower-cased.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert(NodeKind::Element(ElementData { tag: tag.to_ascii_lowercase(), ..ElementData::default() }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.insert(NodeKind::Text(text.into()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn el(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    fn el_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.el(id).map(|el| el.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.el(id).is_some()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element(_) => None,
        }
    }

    // ── Attributes ────────────────────────────────────────────────────────

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.el(id)?.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        self.el(id).map(|el| el.attrs.as_slice()).unwrap_or(&[])
    }

    /// Sets an attribute. `class` and `style` are routed to the class list
    /// and style map so selectors and serialization see one source of truth.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        match name {
            "class" => {
                if let Some(el) = self.el_mut(id) {
                    el.classes = value.split_whitespace().map(str::to_string).collect();
                }
            }
            "style" => {
                if let Some(el) = self.el_mut(id) {
                    el.style = parse_style(&value);
                }
            }
            _ => {
                if let Some(el) = self.el_mut(id) {
                    match el.attrs.iter_mut().find(|(k, _)| k == name) {
                        Some(slot) => slot.1 = value,
                        None => el.attrs.push((name.to_string(), value)),
                    }
                }
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.el_mut(id) {
            el.attrs.retain(|(k, _)| k != name);
        }
    }

    // ── Classes ───────────────────────────────────────────────────────────

    pub fn classes(&self, id: NodeId) -> &[String] {
        self.el(id).map(|el| el.classes.as_slice()).unwrap_or(&[])
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.el_mut(id) {
            if !el.classes.iter().any(|c| c == class) {
                el.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.el_mut(id) {
            el.classes.retain(|c| c != class);
        }
    }

    pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
        if on { self.add_class(id, class) } else { self.remove_class(id, class) }
    }

    // ── Inline style ──────────────────────────────────────────────────────

    pub fn style(&self, id: NodeId, prop: &str) -> Option<&str> {
        self.el(id)?.style.iter().find(|(k, _)| k == prop).map(|(_, v)| v.as_str())
    }

    pub fn set_style(&mut self, id: NodeId, prop: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(el) = self.el_mut(id) {
            match el.style.iter_mut().find(|(k, _)| k == prop) {
                Some(slot) => slot.1 = value,
                None => el.style.push((prop.to_string(), value)),
            }
        }
    }

    pub fn remove_style(&mut self, id: NodeId, prop: &str) {
        if let Some(el) = self.el_mut(id) {
            el.style.retain(|(k, _)| k != prop);
        }
    }

    pub fn style_text(&self, id: NodeId) -> String {
        self.el(id)
            .map(|el| el.style.iter().map(|(k, v)| format!("{}: {};", k, v)).collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    // ── Layout ────────────────────────────────────────────────────────────

    pub fn layout(&self, id: NodeId) -> Rect {
        self.nodes.get(id).map(|n| n.layout).unwrap_or_default()
    }

    /// Records a measured layout box. Hosts with a real layout engine call
    /// this; without it the runtime falls back to its geometry model.
    pub fn set_layout(&mut self, id: NodeId, rect: Rect) {
        if let Some(n) = self.nodes.get_mut(id) {
            n.layout = rect;
        }
    }

    // ── Tree navigation ───────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).iter().copied().filter(|&c| self.is_element(c)).collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.is_element(c))
    }

    /// First element child with the given tag.
    pub fn child_by_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.tag(c) == Some(tag))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.element_children(self.parent(id)?);
        let pos = siblings.iter().position(|&s| s == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Position among the parent's element children.
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        self.element_children(self.parent(id)?).iter().position(|&s| s == id)
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.parent(id);
        std::iter::from_fn(move || {
            let here = cur?;
            cur = self.parent(here);
            Some(here)
        })
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Nearest node, starting at `id` itself, that satisfies `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Document, NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(id).chain(self.ancestors(id)).find(|&n| pred(self, n))
    }

    /// Preorder descendants of `id`, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev());
        }
        out
    }

    /// `id` followed by its preorder descendants.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        out.extend(self.descendants(id));
        out
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(t)) => t.clone(),
            Some(NodeKind::Element(_)) => self.descendants(id)
                .into_iter()
                .filter_map(|n| self.text(n))
                .collect(),
            None => String::new(),
        }
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Unlinks `id` from its parent. The subtree stays alive.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        if let Some(n) = self.nodes.get_mut(id) {
            n.parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Inserts `child` before `reference`, or appends when `reference` is
    /// `None` or not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || self.is_ancestor(child, parent) {
            log::warn!("refusing to insert a node into its own subtree");
            return;
        }
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        let Some(p) = self.nodes.get_mut(parent) else { return };
        let pos = reference
            .and_then(|r| p.children.iter().position(|&c| c == r))
            .unwrap_or(p.children.len());
        p.children.insert(pos, child);
        if let Some(n) = self.nodes.get_mut(child) {
            n.parent = Some(parent);
        }
    }

    /// Detaches and frees `id` with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        for n in self.subtree(id) {
            self.nodes.remove(n);
        }
    }

    pub fn empty(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Moves every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from).to_vec() {
            self.append_child(to, child);
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(id) {
            if let NodeKind::Text(t) = &mut n.kind {
                *t = text.into();
            }
        }
    }

    /// Replaces the children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        self.empty(id);
        let t = self.create_text(text);
        self.append_child(id, t);
    }

    // ── Cloning ───────────────────────────────────────────────────────────

    fn snapshot(&self, id: NodeId) -> Option<Snapshot> {
        let n = self.nodes.get(id)?;
        Some(Snapshot {
            kind: n.kind.clone(),
            layout: n.layout,
            children: n.children.iter().filter_map(|&c| self.snapshot(c)).collect(),
        })
    }

    fn instantiate(&mut self, snap: Snapshot) -> NodeId {
        let id = self.insert(snap.kind);
        if let Some(n) = self.nodes.get_mut(id) {
            n.layout = snap.layout;
        }
        for child in snap.children {
            let c = self.instantiate(child);
            self.append_child(id, c);
        }
        id
    }

    /// Deep copy of `id`, detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let snap = self.snapshot(id)?;
        Some(self.instantiate(snap))
    }

    /// Deep copy of a node owned by another document, detached.
    pub fn import(&mut self, other: &Document, id: NodeId) -> Option<NodeId> {
        let snap = other.snapshot(id)?;
        Some(self.instantiate(snap))
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// All descendants of `root` matching `selector`, in document order.
    ///
    /// An invalid selector is logged and matches nothing.
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(sel) => self.select_all(root, &sel),
            Err(e) => {
                log::warn!("{}", e);
                Vec::new()
            }
        }
    }

    pub fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        self.query_selector_all(root, selector).into_iter().next()
    }

    pub fn select_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> bool {
        Selector::parse(selector).is_ok_and(|s| s.matches(self, id))
    }
}

fn parse_style(src: &str) -> Vec<(String, String)> {
    src.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let a = doc.create_element("gui-list-view-row");
        let b = doc.create_element("gui-list-view-row");
        doc.append_child(root, a);
        doc.append_child(root, b);
        (doc, root, a, b)
    }

    #[test]
    fn insert_before_reorders() {
        let (mut doc, root, a, b) = tree();
        doc.insert_before(root, b, Some(a));
        assert_eq!(doc.children(root), &[b, a]);
        assert_eq!(doc.element_index(a), Some(1));
    }

    #[test]
    fn remove_frees_subtree() {
        let (mut doc, root, a, _) = tree();
        let t = doc.create_text("x");
        doc.append_child(a, t);
        doc.remove(a);
        assert!(!doc.contains(a));
        assert!(!doc.contains(t));
        assert_eq!(doc.children(root).len(), 1);
    }

    #[test]
    fn refuses_cycles() {
        let (mut doc, root, a, _) = tree();
        doc.append_child(a, root);
        assert_eq!(doc.parent(root), None);
        assert_eq!(doc.parent(a), Some(root));
    }

    #[test]
    fn class_attr_routes_to_class_list() {
        let (mut doc, _, a, _) = tree();
        doc.set_attr(a, "class", "gui-active  gui-element");
        assert!(doc.has_class(a, "gui-active"));
        doc.toggle_class(a, "gui-active", false);
        assert_eq!(doc.classes(a), &["gui-element".to_string()]);
    }

    #[test]
    fn import_copies_across_documents() {
        let (src, root, a, _) = tree();
        let mut dst = Document::new();
        let copy = dst.import(&src, root).unwrap();
        assert_eq!(dst.children(copy).len(), 2);
        assert_eq!(dst.tag(dst.children(copy)[0]), src.tag(a));
        assert_eq!(dst.parent(copy), None);
    }

    #[test]
    fn text_content_concatenates() {
        let (mut doc, root, a, b) = tree();
        let t1 = doc.create_text("a.txt");
        let t2 = doc.create_text("b.txt");
        doc.append_child(a, t1);
        doc.append_child(b, t2);
        assert_eq!(doc.text_content(root), "a.txtb.txt");
    }
}
