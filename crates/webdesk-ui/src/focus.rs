//! Keyboard focus.
//!
//! [`FocusManager`] lives on the [`crate::gui::Gui`] and records which node
//! holds focus. [`next_element`] implements Tab traversal over widgets
//! marked `gui-element` by the scheme parser.
//!
//! # How focus moves
//!
//! 1. Clicking a DataView focuses its hidden `gui-focus-element` proxy so
//!    arrow keys reach the view.
//! 2. `Handle::focus` focuses the widget's [`focus_target`].
//! 3. An unconsumed Tab calls [`crate::gui::Gui::focus_next`], which cycles
//!    through [`focusable_elements`] in document order.

use crate::dom::{Document, NodeId};

/// Roles whose members are reached with arrow keys, not Tab.
const SKIPPED_ROLES: &[&str] = &["menu", "menuitem", "grid", "gridcell", "listitem"];

// ── FocusManager ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FocusManager {
    focused: Option<NodeId>,
}

impl FocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    #[inline]
    pub fn is_focused(&self, id: NodeId) -> bool {
        self.focused == Some(id)
    }

    /// Moves focus to `id`; returns the node that lost it, if any.
    pub fn set(&mut self, id: NodeId) -> Option<NodeId> {
        if self.focused == Some(id) {
            return None;
        }
        self.focused.replace(id)
    }

    pub fn clear(&mut self) -> Option<NodeId> {
        self.focused.take()
    }
}

// ── Traversal ─────────────────────────────────────────────────────────────

pub fn is_focusable(doc: &Document, node: NodeId) -> bool {
    doc.has_class(node, "gui-element")
        && !doc.has_class(node, "gui-focus-element")
        && !doc.attr(node, "role").is_some_and(|r| SKIPPED_ROLES.contains(&r))
        && doc.attr(node, "data-disabled") != Some("true")
}

pub fn focusable_elements(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.descendants(root).into_iter().filter(|&n| is_focusable(doc, n)).collect()
}

/// The widget after (or before, if `reverse`) `current`, wrapping around.
/// When `current` is not a focusable widget, its nearest focusable
/// ancestor is used; failing that, traversal starts at the ends.
pub fn next_element(doc: &Document, root: NodeId, current: Option<NodeId>, reverse: bool) -> Option<NodeId> {
    let list = focusable_elements(doc, root);
    if list.is_empty() {
        return None;
    }
    let n = list.len();
    let pos = current.and_then(|c| {
        doc.closest(c, |d, x| is_focusable(d, x)).and_then(|w| list.iter().position(|&x| x == w))
    });
    Some(match pos {
        None => list[if reverse { n - 1 } else { 0 }],
        Some(i) if reverse => list[(i + n - 1) % n],
        Some(i) => list[(i + 1) % n],
    })
}

/// The node inside a widget that actually takes keyboard focus.
pub fn focus_target(doc: &Document, widget: NodeId) -> NodeId {
    doc.query_selector(widget, "textarea.gui-focus-element")
        .or_else(|| doc.query_selector(widget, "input, textarea, select, button"))
        .unwrap_or(widget)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> (Document, NodeId, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let mut ids = Vec::new();
        for (tag, extra) in [
            ("gui-button", None),
            ("gui-text", Some(("data-disabled", "true"))),
            ("gui-menu", Some(("role", "menu"))),
            ("gui-checkbox", None),
        ] {
            let n = doc.create_element(tag);
            doc.add_class(n, "gui-element");
            if let Some((k, v)) = extra {
                doc.set_attr(n, k, v);
            }
            doc.append_child(root, n);
            ids.push(n);
        }
        (doc, root, ids)
    }

    #[test]
    fn skips_disabled_and_menus() {
        let (doc, root, ids) = widgets();
        assert_eq!(focusable_elements(&doc, root), vec![ids[0], ids[3]]);
    }

    #[test]
    fn wraps_both_ways() {
        let (doc, root, ids) = widgets();
        assert_eq!(next_element(&doc, root, Some(ids[3]), false), Some(ids[0]));
        assert_eq!(next_element(&doc, root, Some(ids[0]), true), Some(ids[3]));
        assert_eq!(next_element(&doc, root, None, false), Some(ids[0]));
    }

    #[test]
    fn starts_from_enclosing_widget() {
        let (mut doc, root, ids) = widgets();
        let inner = doc.create_element("button");
        doc.append_child(ids[0], inner);
        assert_eq!(next_element(&doc, root, Some(inner), false), Some(ids[3]));
    }

    #[test]
    fn manager_reports_previous_focus() {
        let (_, _, ids) = widgets();
        let mut fm = FocusManager::new();
        assert_eq!(fm.set(ids[0]), None);
        assert_eq!(fm.set(ids[0]), None);
        assert_eq!(fm.set(ids[3]), Some(ids[0]));
        assert!(fm.is_focused(ids[3]));
    }
}
