//! DataView engine: selection, keyboard navigation and row reconciliation
//! shared by the list, tree and icon views (and, through its child view,
//! the file view).
//!
//! # Structure of a view
//!
//! ```text
//! <gui-list-view class="gui-data-view">
//!   <gui-list-view-head>…</gui-list-view-head>      list views only
//!   <gui-list-view-body>
//!     <gui-list-view-row data-id=… data-value=…>  entries
//!   </gui-list-view-body>
//!   <textarea class="gui-focus-element">           focus proxy
//! </gui-list-view>
//! ```
//!
//! Entries are the elements whose tag is [`ViewKind::entry_tag`] anywhere
//! under the body. Their index is their position in document order, so
//! tree entries are numbered in flattened preorder.
//!
//! # State
//!
//! Selection lives in a [`DataViewState`] side table on the [`Gui`]. Every
//! mutation goes through [`handle_item_selection`] or
//! [`update_active_selection`], which keep the `gui-active` class on the
//! rows and the index list in lockstep.

mod layout;
mod selection;

pub use layout::{measured_row_size, scroll_target, ViewGeometry};
pub use selection::{cursor_for_key, select_index};

use serde_json::Value;
use webdesk_engine::coords::Rect;
use webdesk_engine::input::{Key, Modifiers};

use crate::dom::NodeId;
use crate::drag::{self, DraggableArgs};
use crate::entry::{Entry, EntrySet, RemoveTarget, SelectedEntry};
use crate::error::{GuiError, Result};
use crate::event::{EventDetail, EventResult, UiEvent};
use crate::gui::Gui;
use crate::helpers;
use crate::registry::ElementCall;
use crate::services::{ClipboardData, FileRef};

pub const ACTIVE_CLASS: &str = "gui-active";
pub const FOCUSED_CLASS: &str = "gui-element-focused";
pub const FOCUS_PROXY: &str = "gui-focus-element";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    List,
    Tree,
    Icon,
}

impl ViewKind {
    pub fn from_tag(tag: &str) -> Option<ViewKind> {
        match tag {
            "gui-list-view" => Some(ViewKind::List),
            "gui-tree-view" => Some(ViewKind::Tree),
            "gui-icon-view" => Some(ViewKind::Icon),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ViewKind::List => "gui-list-view",
            ViewKind::Tree => "gui-tree-view",
            ViewKind::Icon => "gui-icon-view",
        }
    }

    pub fn entry_tag(self) -> &'static str {
        match self {
            ViewKind::List => "gui-list-view-row",
            ViewKind::Tree => "gui-tree-view-entry",
            ViewKind::Icon => "gui-icon-view-entry",
        }
    }

    pub fn body_tag(self) -> &'static str {
        match self {
            ViewKind::List => "gui-list-view-body",
            ViewKind::Tree => "gui-tree-view-body",
            ViewKind::Icon => "gui-icon-view-body",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataViewState {
    pub kind: ViewKind,
    /// Sorted, duplicate free, always mirrors the `gui-active` rows.
    pub selected: Vec<usize>,
    pub scroll_top: f32,
    pub focused: bool,
    pub multiple: bool,
    pub single_click: bool,
    pub geometry: ViewGeometry,
}

impl DataViewState {
    pub fn new(kind: ViewKind) -> Self {
        Self {
            kind,
            selected: Vec::new(),
            scroll_top: 0.0,
            focused: false,
            multiple: true,
            single_click: false,
            geometry: ViewGeometry::default(),
        }
    }
}

/// Row construction, supplied by each view family.
pub trait RowFactory {
    /// Builds the detached node for `entry`, nested entries included.
    fn create_row(&self, gui: &mut Gui, view: NodeId, entry: &Entry) -> NodeId;

    /// Where a new row for `entry` is attached.
    fn container_for(&self, gui: &Gui, view: NodeId, entry: &Entry) -> Option<NodeId> {
        entry.parent.filter(|&p| gui.document.contains(p)).or_else(|| body(gui, view))
    }
}

// ── Accessors ─────────────────────────────────────────────────────────────

pub fn state(gui: &Gui, view: NodeId) -> Option<&DataViewState> {
    gui.views.get(view)
}

pub fn state_mut(gui: &mut Gui, view: NodeId) -> Option<&mut DataViewState> {
    gui.views.get_mut(view)
}

pub fn kind(gui: &Gui, view: NodeId) -> Option<ViewKind> {
    gui.views.get(view).map(|s| s.kind).or_else(|| ViewKind::from_tag(gui.document.tag(view)?))
}

pub fn selected(gui: &Gui, view: NodeId) -> Vec<usize> {
    state(gui, view).map(|s| s.selected.clone()).unwrap_or_default()
}

pub fn body(gui: &Gui, view: NodeId) -> Option<NodeId> {
    gui.document.child_by_tag(view, kind(gui, view)?.body_tag())
}

pub fn proxy(gui: &Gui, view: NodeId) -> Option<NodeId> {
    gui.document
        .children(view)
        .iter()
        .copied()
        .find(|&c| gui.document.has_class(c, FOCUS_PROXY))
}

/// Entry nodes in index order.
pub fn entries(gui: &Gui, view: NodeId) -> Vec<NodeId> {
    let (Some(kind), Some(body)) = (kind(gui, view), body(gui, view)) else { return Vec::new() };
    gui.document
        .descendants(body)
        .into_iter()
        .filter(|&n| gui.document.tag(n) == Some(kind.entry_tag()))
        .collect()
}

pub fn entry_index(gui: &Gui, view: NodeId, entry: NodeId) -> Option<usize> {
    entries(gui, view).iter().position(|&e| e == entry)
}

// ── Build ─────────────────────────────────────────────────────────────────

/// Shared part of every view's `build`: state, classes and focus proxy.
/// The family-specific body must exist before this runs.
pub fn build(gui: &mut Gui, view: NodeId, kind: ViewKind) {
    let mut st = DataViewState::new(kind);
    st.single_click = helpers::is_true(gui.document.attr(view, "data-single-click"));
    st.multiple = gui.document.attr(view, "data-multiple").is_none_or(|v| v == "true");
    gui.views.insert(view, st);
    gui.document.add_class(view, "gui-data-view");

    if proxy(gui, view).is_none() && !gui.document.has_attr(view, "no-selection") {
        let underlay = gui.document.create_element("textarea");
        gui.document.set_attr(underlay, "aria-label", "");
        gui.document.set_attr(underlay, "aria-hidden", "true");
        gui.document.set_attr(underlay, "readonly", "true");
        gui.document.add_class(underlay, FOCUS_PROXY);
        gui.document.append_child(view, underlay);
    }
}

/// Per-row setup after insertion: drag source, tooltip, `render` signal.
fn init_row(gui: &mut Gui, view: NodeId, row: NodeId) {
    let data = helpers::get_view_node_value(&gui.document, row);

    if helpers::is_true(gui.document.attr(view, "data-draggable")) {
        let kind = gui.document
            .attr(view, "data-draggable-type")
            .or_else(|| gui.document.attr(row, "data-draggable-type"))
            .map(str::to_string);
        drag::create_draggable(gui, row, DraggableArgs { kind, data: data.clone(), ..DraggableArgs::default() });

        let tooltip = gui.document.attr(row, "data-tooltip").map(str::to_string);
        if let Some(tooltip) = tooltip.filter(|t| !t.is_empty()) {
            if !gui.document.has_attr(row, "title") {
                gui.document.set_attr(row, "title", tooltip);
            }
        }
    }

    gui.emit(view, "render", EventDetail::Render { element: row, data });
}

fn init_subtree(gui: &mut Gui, view: NodeId, row: NodeId) {
    let Some(kind) = kind(gui, view) else { return };
    let rows: Vec<NodeId> = gui.document
        .subtree(row)
        .into_iter()
        .filter(|&n| gui.document.tag(n) == Some(kind.entry_tag()))
        .collect();
    for r in rows {
        init_row(gui, view, r);
    }
}

// ── Entry operations ──────────────────────────────────────────────────────

pub fn clear(gui: &mut Gui, view: NodeId) {
    if let Some(body) = body(gui, view) {
        gui.empty_node(body);
    }
    if let Some(st) = state_mut(gui, view) {
        st.scroll_top = 0.0;
        st.selected.clear();
    }
}

/// Appends every entry. No deduplication.
pub fn add(gui: &mut Gui, view: NodeId, factory: &dyn RowFactory, entries: EntrySet) {
    for entry in entries.into_vec() {
        let Some(container) = factory.container_for(gui, view, &entry) else {
            log::warn!("view has no body to add entries to");
            return;
        };
        let row = factory.create_row(gui, view, &entry);
        gui.document.append_child(container, row);
        init_subtree(gui, view, row);
    }
    // Rows nested under an earlier entry shift every later index.
    update_active_selection(gui, view);
}

/// Reconciles rows by `data-id`.
///
/// Matching rows are rebuilt in place and keep their active flag; unknown
/// ids are appended. A full listing (`EntrySet::Many`) also removes rows
/// whose id was not mentioned; a single entry leaves them alone.
pub fn patch(gui: &mut Gui, view: NodeId, factory: &dyn RowFactory, entries: EntrySet) {
    let single = entries.is_single();
    let mut in_view: Vec<(String, NodeId)> = self::entries(gui, view)
        .into_iter()
        .filter_map(|row| gui.document.attr(row, "data-id").map(|id| (id.to_string(), row)))
        .collect();

    for entry in entries.into_vec() {
        let Some(id) = entry.id.clone() else { continue };
        let old = in_view.iter().position(|(k, _)| *k == id).map(|i| in_view.remove(i).1);

        let row = factory.create_row(gui, view, &entry);
        match old {
            Some(old) => {
                if gui.document.has_class(old, ACTIVE_CLASS) {
                    gui.document.add_class(row, ACTIVE_CLASS);
                }
                let parent = gui.document.parent(old);
                match parent {
                    Some(parent) => gui.document.insert_before(parent, row, Some(old)),
                    None => log::warn!("patched row `{}` was detached", id),
                }
                // Rows nested under the replaced one are gone with it.
                in_view.retain(|(_, n)| !gui.document.is_ancestor(old, *n));
                gui.remove_node(old);
            }
            None => match factory.container_for(gui, view, &entry) {
                Some(container) => gui.document.append_child(container, row),
                None => {
                    gui.remove_node(row);
                    continue;
                }
            },
        }
        init_subtree(gui, view, row);
    }

    if !single {
        for (_, stale) in in_view {
            gui.remove_node(stale);
        }
    }
    update_active_selection(gui, view);
}

/// Removes rows by node, index, or `data-<key>` match.
pub fn remove(gui: &mut Gui, view: NodeId, target: RemoveTarget) {
    let rows = entries(gui, view);
    let doomed: Vec<NodeId> = match target {
        RemoveTarget::Node(n) if rows.contains(&n) => vec![n],
        RemoveTarget::Node(_) => Vec::new(),
        RemoveTarget::Index(i) => rows.get(i).copied().into_iter().collect(),
        RemoveTarget::Key { key, value } => {
            let attr = format!("data-{key}");
            rows.into_iter().filter(|&r| gui.document.attr(r, &attr) == Some(value.as_str())).collect()
        }
    };
    if doomed.is_empty() {
        log::debug!("remove matched no entries");
    }
    for n in doomed {
        gui.remove_node(n);
    }
    update_active_selection(gui, view);
}

/// Re-derives the selection from the rows carrying `gui-active`.
pub fn update_active_selection(gui: &mut Gui, view: NodeId) {
    let active: Vec<usize> = entries(gui, view)
        .into_iter()
        .enumerate()
        .filter(|&(_, n)| gui.document.has_class(n, ACTIVE_CLASS))
        .map(|(i, _)| i)
        .collect();
    if let Some(st) = state_mut(gui, view) {
        st.selected = active;
    }
}

// ── Selection ─────────────────────────────────────────────────────────────

/// Applies a selection gesture at `index` and syncs the row classes.
pub fn handle_item_selection(gui: &mut Gui, view: NodeId, index: Option<usize>, shift: bool) -> Vec<usize> {
    let rows = entries(gui, view);
    let index = index.filter(|&i| i < rows.len());
    let Some(st) = state_mut(gui, view) else { return Vec::new() };
    let extend = st.multiple && shift;
    st.selected = select_index(&st.selected, index, extend);
    let selected = st.selected.clone();
    for (i, row) in rows.into_iter().enumerate() {
        gui.document.toggle_class(row, ACTIVE_CLASS, selected.binary_search(&i).is_ok());
    }
    selected
}

pub fn get_selected(gui: &Gui, view: NodeId) -> Vec<SelectedEntry> {
    entries(gui, view)
        .into_iter()
        .enumerate()
        .filter(|&(_, n)| gui.document.has_class(n, ACTIVE_CLASS))
        .map(|(index, n)| SelectedEntry { index, data: helpers::get_view_node_value(&gui.document, n) })
        .collect()
}

pub fn values(gui: &Gui, view: NodeId) -> Value {
    serde_json::to_value(get_selected(gui, view)).unwrap_or(Value::Null)
}

fn matches_value(gui: &Gui, row: NodeId, index: usize, value: &Value, key: Option<&str>) -> bool {
    let raw = gui.document.attr(row, "data-value");
    match key {
        None => match value {
            Value::Number(n) => n.as_u64() == Some(index as u64),
            Value::String(s) => raw == Some(s.as_str()),
            other => raw.is_some_and(|r| serde_json::from_str::<Value>(r).is_ok_and(|v| v == *other)),
        },
        Some(key) => {
            let Some(parsed) = raw.and_then(|r| serde_json::from_str::<Value>(r).ok()) else { return false };
            match (parsed.get(key), value) {
                (Some(found), Value::String(s)) => helpers::value_to_attr(found) == *s,
                (Some(found), other) => found == other,
                (None, _) => false,
            }
        }
    }
}

/// First entry whose value (or `value[key]`) equals `value`.
pub fn get_entry(gui: &Gui, view: NodeId, value: &Value, key: Option<&str>) -> Option<NodeId> {
    entries(gui, view)
        .into_iter()
        .enumerate()
        .find(|&(i, n)| matches_value(gui, n, i, value, key))
        .map(|(_, n)| n)
}

/// Values of every entry, in index order.
pub fn entry_values(gui: &Gui, view: NodeId) -> Vec<Value> {
    entries(gui, view)
        .into_iter()
        .map(|n| helpers::get_view_node_value(&gui.document, n))
        .collect()
}

/// Selects exactly the entries matching `value`.
pub fn set_selected(gui: &mut Gui, view: NodeId, value: &Value, key: Option<&str>, scroll: bool) {
    let rows = entries(gui, view);
    let mut picked = Vec::new();
    for (i, &row) in rows.iter().enumerate() {
        let hit = matches_value(gui, row, i, value, key);
        gui.document.toggle_class(row, ACTIVE_CLASS, hit);
        if hit {
            picked.push(i);
            if scroll {
                scroll_into_view(gui, view, row);
            }
        }
    }
    if let Some(st) = state_mut(gui, view) {
        st.selected = picked;
    }
}

// ── Scrolling ─────────────────────────────────────────────────────────────

fn header_height(gui: &Gui, view: NodeId, st: &DataViewState) -> f32 {
    if st.kind != ViewKind::List {
        return 0.0;
    }
    match gui.document.child_by_tag(view, "gui-list-view-head") {
        Some(head) if !gui.document.layout(head).is_empty() => gui.document.layout(head).size.y,
        Some(_) => st.geometry.header_height,
        None => 0.0,
    }
}

/// Scrolls `entry` to the top of the view when it is not fully visible.
/// Returns whether the offset changed.
pub fn scroll_into_view(gui: &mut Gui, view: NodeId, entry: NodeId) -> bool {
    let Some(st) = state(gui, view) else { return false };
    let Some(index) = entry_index(gui, view, entry) else { return false };
    let margin = header_height(gui, view, st);

    let measured = gui.document.layout(entry);
    let row = match body(gui, view) {
        Some(b) if !measured.is_empty() => {
            let origin = gui.document.layout(b).origin;
            Rect::from_origin_size(measured.origin - origin, measured.size)
        }
        _ => st.geometry.row_rect(index, st.kind == ViewKind::Icon),
    };
    let view_box = gui.document.layout(view);
    let height = if view_box.is_empty() { st.geometry.viewport.y } else { view_box.size.y };

    let Some(top) = scroll_target(row, st.scroll_top, height - margin) else { return false };
    if let Some(st) = state_mut(gui, view) {
        st.scroll_top = top;
    }
    true
}

/// Icon cells per line: measured when the host laid the view out,
/// otherwise from the geometry model.
pub fn row_size(gui: &Gui, view: NodeId) -> usize {
    let Some(st) = state(gui, view) else { return 1 };
    if st.kind != ViewKind::Icon {
        return 1;
    }
    let boxes: Vec<_> = entries(gui, view).into_iter().map(|n| gui.document.layout(n)).collect();
    measured_row_size(&boxes).unwrap_or_else(|| st.geometry.columns()).max(1)
}

// ── Input ─────────────────────────────────────────────────────────────────

fn emit_entries(gui: &mut Gui, view: NodeId, name: &str) {
    let entries = get_selected(gui, view);
    gui.emit(view, name, EventDetail::Entries(entries));
}

/// The entry a pointer event landed on, if any.
fn entry_from_target(gui: &Gui, view: NodeId, target: NodeId) -> Option<NodeId> {
    let kind = kind(gui, view)?;
    let body = body(gui, view)?;
    let doc = &gui.document;
    doc.closest(target, |d, n| n == body || n == view || d.tag(n) == Some(kind.entry_tag()))
        .filter(|&n| n != body && n != view)
}

fn is_expander(gui: &Gui, view: NodeId, target: NodeId) -> Option<NodeId> {
    let expander = gui.document.closest(target, |d, n| n == view || d.tag(n) == Some("gui-tree-view-expander"))?;
    if expander == view {
        return None;
    }
    gui.document.parent(expander)
}

fn select(gui: &mut Gui, view: NodeId, target: NodeId, modifiers: Modifiers) -> bool {
    if let Some(entry) = is_expander(gui, view, target) {
        call_view(gui, view, ElementCall::Expand { entry, expanded: None });
        return false;
    }
    let index = entry_from_target(gui, view, target).and_then(|e| entry_index(gui, view, e));
    handle_item_selection(gui, view, index, modifiers.shift);
    emit_entries(gui, view, "select");
    if let Some(proxy) = proxy(gui, view) {
        if !state(gui, view).is_some_and(|s| s.focused) {
            gui.focus(proxy);
        }
    }
    true
}

fn call_view(gui: &mut Gui, view: NodeId, call: ElementCall) {
    let Some(descriptor) = gui.descriptor(view) else { return };
    if let Err(e) = descriptor.call(gui, view, call) {
        log::warn!("view call failed: {}", e);
    }
}

/// Pointer, keyboard and focus handling for a built view.
pub fn on_event(gui: &mut Gui, view: NodeId, event: &UiEvent) -> EventResult {
    let Some(st) = state(gui, view) else { return EventResult::Ignored };
    let single_click = st.single_click;
    let has_proxy = proxy(gui, view).is_some();

    match event {
        UiEvent::Click { target, modifiers, .. } if has_proxy => {
            if select(gui, view, *target, *modifiers) && single_click {
                emit_entries(gui, view, "activate");
            }
            EventResult::Consumed
        }
        UiEvent::DoubleClick { .. } if has_proxy && !single_click => {
            emit_entries(gui, view, "activate");
            EventResult::Consumed
        }
        UiEvent::ContextMenu { target, pos, modifiers } if has_proxy => {
            select(gui, view, *target, *modifiers);
            let entries = get_selected(gui, view);
            gui.emit(view, "contextmenu", EventDetail::ContextMenu { entries, pos: *pos });
            EventResult::Consumed
        }
        UiEvent::KeyDown { key, modifiers, .. } if has_proxy => handle_key(gui, view, key, *modifiers),
        UiEvent::Focus { target } | UiEvent::Blur { target } if proxy(gui, view) == Some(*target) => {
            let focused = matches!(event, UiEvent::Focus { .. });
            gui.document.toggle_class(view, FOCUSED_CLASS, focused);
            if let Some(st) = state_mut(gui, view) {
                st.focused = focused;
            }
            EventResult::Consumed
        }
        _ => EventResult::Ignored,
    }
}

/// Enter activates, Ctrl+C copies file references, arrows move the
/// selection.
pub fn handle_key(gui: &mut Gui, view: NodeId, key: &Key, modifiers: Modifiers) -> EventResult {
    let rows = entries(gui, view);
    let count = rows.len();
    let Some(kind) = kind(gui, view) else { return EventResult::Ignored };
    if key == &Key::Tab {
        return EventResult::Ignored;
    }
    if count == 0 {
        return EventResult::Consumed;
    }

    match key {
        Key::Enter => {
            emit_entries(gui, view, "activate");
            return EventResult::Consumed;
        }
        Key::Character(c) if c.eq_ignore_ascii_case(&'c') && modifiers.ctrl => {
            copy_selection(gui, view);
            return EventResult::Consumed;
        }
        _ => {}
    }

    let current = selected(gui, view);
    let Some(cursor) = cursor_for_key(kind, key, &current, row_size(gui, view)) else {
        return EventResult::Ignored;
    };
    let Some(&row) = rows.get(cursor) else { return EventResult::Consumed };
    handle_item_selection(gui, view, Some(cursor), modifiers.shift);
    scroll_into_view(gui, view, row);
    emit_entries(gui, view, "select");
    EventResult::Consumed
}

fn copy_selection(gui: &mut Gui, view: NodeId) {
    let files: Vec<FileRef> = get_selected(gui, view)
        .into_iter()
        .filter_map(|s| {
            let path = s.data.get("path")?.as_str()?.to_string();
            let mime = s.data.get("mime").and_then(Value::as_str).unwrap_or_default().to_string();
            Some(FileRef { path, mime })
        })
        .collect();
    if files.is_empty() {
        return;
    }
    log::debug!("copying {} file reference(s)", files.len());
    gui.services().clipboard.set_clipboard(ClipboardData::Files(files));
}

/// Shared `call` dispatch for the view families.
pub fn call(gui: &mut Gui, view: NodeId, factory: &dyn RowFactory, call: ElementCall) -> Result<Value> {
    match call {
        ElementCall::Clear => clear(gui, view),
        ElementCall::Add(entries) => add(gui, view, factory, entries),
        ElementCall::Patch(entries) => patch(gui, view, factory, entries),
        ElementCall::Remove(target) => remove(gui, view, target),
        other => {
            return Err(GuiError::InvalidArgument(format!("`{}` is not a data view method", other.name())));
        }
    }
    Ok(Value::Null)
}

/// Shared `get`: `value`/`selected` give the selection, `entry` looks one
/// up by `data-value`, `entries` lists all values.
pub fn get(gui: &Gui, view: NodeId, param: &str) -> Option<Value> {
    match param {
        "value" | "selected" => Some(values(gui, view)),
        "entries" => Some(Value::Array(entry_values(gui, view))),
        _ => None,
    }
}

/// Shared `set("value", v, [key, {scroll}])`.
pub fn set_value(gui: &mut Gui, view: NodeId, value: &Value, extra: &[Value]) {
    let key = extra.first().and_then(Value::as_str);
    let scroll = extra.get(1).and_then(|o| o.get("scroll")).and_then(Value::as_bool).unwrap_or(false);
    set_selected(gui, view, value, key, scroll);
}
