//! List, tree and icon views.
//!
//! Each family only knows how to lay out its chrome and build one row;
//! selection, keyboard handling and reconciliation come from
//! [`crate::dataview`].

use serde_json::Value;

use crate::dataview::{self, RowFactory, ViewKind};
use crate::dom::NodeId;
use crate::entry::{Column, Entry, EntrySet, SelectedEntry};
use crate::error::{GuiError, Result};
use crate::event::{EventDetail, EventResult, UiEvent};
use crate::gui::Gui;
use crate::helpers;
use crate::registry::{ElementCall, ElementDescriptor, ElementRegistry};

pub fn register(reg: &mut ElementRegistry) {
    reg.register("gui-list-view", ListView);
    reg.register("gui-tree-view", TreeView);
    reg.register("gui-icon-view", IconView);
}

/// `data-id`, `data-value` and `data-tooltip` of a fresh row.
fn row_base(gui: &mut Gui, tag: &str, entry: &Entry) -> NodeId {
    let row = gui.document.create_element(tag);
    if let Some(id) = &entry.id {
        gui.document.set_attr(row, "data-id", id.clone());
    }
    if !entry.value.is_null() {
        gui.document.set_attr(row, "data-value", helpers::value_to_attr(&entry.value));
    }
    if let Some(tooltip) = &entry.tooltip {
        gui.document.set_attr(row, "data-tooltip", tooltip.clone());
    }
    row
}

fn icon_img(gui: &mut Gui, src: &str) -> Option<NodeId> {
    let src = helpers::resolve_icon(gui.services().icons.as_ref(), src, None)?;
    let img = gui.document.create_element("img");
    gui.document.set_attr(img, "src", src);
    gui.document.set_attr(img, "alt", "");
    Some(img)
}

fn ensure_child(gui: &mut Gui, parent: NodeId, tag: &str) -> NodeId {
    match gui.document.child_by_tag(parent, tag) {
        Some(n) => n,
        None => {
            let n = gui.document.create_element(tag);
            gui.document.append_child(parent, n);
            n
        }
    }
}

// ── List view ─────────────────────────────────────────────────────────────

pub struct ListView;

impl ListView {
    fn create_column(gui: &mut Gui, column: &Column, header: bool) -> NodeId {
        let cell = gui.document.create_element("gui-list-view-column");
        if let Some(align) = &column.textalign {
            gui.document.add_class(cell, &format!("gui-align-{align}"));
        }
        if let Some(img) = column.icon.as_deref().and_then(|i| icon_img(gui, i)) {
            gui.document.append_child(cell, img);
        }
        let text = gui.document.create_text(column.label.clone());
        gui.document.append_child(cell, text);
        if header {
            if let Some(size) = column.size.as_deref().filter(|s| !s.is_empty() && *s != "-") {
                gui.document.set_attr(cell, "data-size", size);
                gui.document.set_style(cell, "width", size);
            }
            if column.resizable {
                gui.document.set_attr(cell, "data-resizable", "true");
            }
        }
        cell
    }

    /// Rebuilds the header row from `columns`.
    pub fn set_columns(gui: &mut Gui, view: NodeId, columns: &[Column]) {
        let head = ensure_child(gui, view, "gui-list-view-head");
        gui.empty_node(head);
        let row = gui.document.create_element("gui-list-view-row");
        for column in columns {
            let cell = Self::create_column(gui, column, true);
            gui.document.append_child(row, cell);
        }
        gui.document.append_child(head, row);
    }
}

impl RowFactory for ListView {
    fn create_row(&self, gui: &mut Gui, _view: NodeId, entry: &Entry) -> NodeId {
        let row = row_base(gui, "gui-list-view-row", entry);
        let columns = if entry.columns.is_empty() {
            vec![Column { label: entry.display_label(), icon: entry.icon.clone(), ..Column::default() }]
        } else {
            entry.columns.clone()
        };
        for column in &columns {
            let cell = Self::create_column(gui, column, false);
            gui.document.append_child(row, cell);
        }
        row
    }
}

impl ElementDescriptor for ListView {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<(), GuiError> {
        let head = ensure_child(gui, node, "gui-list-view-head");
        let body = ensure_child(gui, node, "gui-list-view-body");
        // Head before body, whatever the markup said.
        gui.document.insert_before(node, head, Some(body));

        let columns = gui.document.attr(node, "data-columns").map(str::to_string);
        if let Some(raw) = columns {
            let columns: Vec<Column> = serde_json::from_str(&raw)?;
            Self::set_columns(gui, node, &columns);
        }
        dataview::build(gui, node, ViewKind::List);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, extra: &[Value]) -> bool {
        match param {
            "columns" => match serde_json::from_value::<Vec<Column>>(value.clone()) {
                Ok(columns) => {
                    Self::set_columns(gui, node, &columns);
                    true
                }
                Err(e) => {
                    log::warn!("ignoring malformed list columns: {}", e);
                    true
                }
            },
            "zebra" => {
                let on = value.as_bool().unwrap_or_else(|| value.as_str() == Some("true"));
                gui.document.toggle_class(node, "gui-list-view-zebra", on);
                gui.document.set_attr(node, "data-zebra", on.to_string());
                true
            }
            "value" | "selected" => {
                dataview::set_value(gui, node, value, extra);
                true
            }
            _ => false,
        }
    }

    fn get(&self, gui: &Gui, node: NodeId, param: &str) -> Option<Value> {
        dataview::get(gui, node, param)
    }

    fn call(&self, gui: &mut Gui, node: NodeId, call: ElementCall) -> Result<Value> {
        dataview::call(gui, node, self, call)
    }

    fn values(&self, gui: &Gui, node: NodeId) -> Value {
        dataview::values(gui, node)
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        dataview::on_event(gui, node, event)
    }
}

// ── Tree view ─────────────────────────────────────────────────────────────

pub struct TreeView;

impl TreeView {
    pub fn is_expanded(gui: &Gui, entry: NodeId) -> bool {
        helpers::is_true(gui.document.attr(entry, "data-expanded"))
    }

    /// Sets (or toggles, with `None`) the expanded flag of `entry` and
    /// fires `expand`.
    pub fn expand(gui: &mut Gui, view: NodeId, entry: NodeId, expanded: Option<bool>) -> Result<()> {
        if !gui.document.contains(entry) {
            return Err(GuiError::not_found("tree entry"));
        }
        let expanded = expanded.unwrap_or(!Self::is_expanded(gui, entry));
        gui.document.set_attr(entry, "data-expanded", expanded.to_string());
        gui.document.toggle_class(entry, "gui-expanded", expanded);

        let index = dataview::entry_index(gui, view, entry).unwrap_or(0);
        let data = helpers::get_view_node_value(&gui.document, entry);
        gui.emit(view, "expand", EventDetail::Expand {
            element: entry,
            expanded,
            entries: vec![SelectedEntry { index, data }],
        });
        Ok(())
    }

    fn ensure_expander(gui: &mut Gui, entry: NodeId) {
        if gui.document.child_by_tag(entry, "gui-tree-view-expander").is_none() {
            let expander = gui.document.create_element("gui-tree-view-expander");
            let first = gui.document.children(entry).first().copied();
            gui.document.insert_before(entry, expander, first);
        }
    }
}

impl RowFactory for TreeView {
    fn create_row(&self, gui: &mut Gui, view: NodeId, entry: &Entry) -> NodeId {
        let row = row_base(gui, "gui-tree-view-entry", entry);
        gui.document.set_attr(row, "data-expanded", "false");
        if !entry.entries.is_empty() {
            Self::ensure_expander(gui, row);
        }

        let label = gui.document.create_element("gui-tree-view-label");
        if let Some(img) = entry.icon.as_deref().and_then(|i| icon_img(gui, i)) {
            gui.document.append_child(label, img);
        }
        let text = gui.document.create_text(entry.display_label());
        gui.document.append_child(label, text);
        gui.document.append_child(row, label);

        for child in &entry.entries {
            let node = self.create_row(gui, view, child);
            gui.document.append_child(row, node);
        }
        row
    }
}

impl ElementDescriptor for TreeView {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<(), GuiError> {
        ensure_child(gui, node, "gui-tree-view-body");
        dataview::build(gui, node, ViewKind::Tree);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, extra: &[Value]) -> bool {
        if param == "value" || param == "selected" {
            dataview::set_value(gui, node, value, extra);
            return true;
        }
        false
    }

    fn get(&self, gui: &Gui, node: NodeId, param: &str) -> Option<Value> {
        dataview::get(gui, node, param)
    }

    fn call(&self, gui: &mut Gui, node: NodeId, call: ElementCall) -> Result<Value> {
        match call {
            ElementCall::Expand { entry, expanded } => {
                Self::expand(gui, node, entry, expanded)?;
                Ok(Value::Null)
            }
            ElementCall::Add(entries) => {
                // Children added under an existing entry make it expandable.
                let parents: Vec<NodeId> = match &entries {
                    EntrySet::Single(e) => e.parent.into_iter().collect(),
                    EntrySet::Many(v) => v.iter().filter_map(|e| e.parent).collect(),
                };
                for parent in parents {
                    if !gui.document.contains(parent) {
                        continue;
                    }
                    Self::ensure_expander(gui, parent);
                }
                dataview::call(gui, node, self, ElementCall::Add(entries))
            }
            other => dataview::call(gui, node, self, other),
        }
    }

    fn values(&self, gui: &Gui, node: NodeId) -> Value {
        dataview::values(gui, node)
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        dataview::on_event(gui, node, event)
    }
}

// ── Icon view ─────────────────────────────────────────────────────────────

pub struct IconView;

impl RowFactory for IconView {
    fn create_row(&self, gui: &mut Gui, _view: NodeId, entry: &Entry) -> NodeId {
        let row = row_base(gui, "gui-icon-view-entry", entry);

        let icon = gui.document.create_element("div");
        gui.document.add_class(icon, "gui-icon-view-entry-icon");
        if let Some(img) = entry.icon.as_deref().and_then(|i| icon_img(gui, i)) {
            gui.document.append_child(icon, img);
        }
        let label = gui.document.create_element("div");
        gui.document.add_class(label, "gui-icon-view-entry-label");
        gui.document.set_text_content(label, entry.display_label());

        gui.document.append_child(row, icon);
        gui.document.append_child(row, label);
        row
    }
}

impl ElementDescriptor for IconView {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<(), GuiError> {
        ensure_child(gui, node, "gui-icon-view-body");
        dataview::build(gui, node, ViewKind::Icon);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, extra: &[Value]) -> bool {
        if param == "value" || param == "selected" {
            dataview::set_value(gui, node, value, extra);
            return true;
        }
        false
    }

    fn get(&self, gui: &Gui, node: NodeId, param: &str) -> Option<Value> {
        dataview::get(gui, node, param)
    }

    fn call(&self, gui: &mut Gui, node: NodeId, call: ElementCall) -> Result<Value> {
        dataview::call(gui, node, self, call)
    }

    fn values(&self, gui: &Gui, node: NodeId) -> Value {
        dataview::values(gui, node)
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        dataview::on_event(gui, node, event)
    }
}

/// Row factory for a built view of any family.
pub fn factory_for(kind: ViewKind) -> &'static dyn RowFactory {
    match kind {
        ViewKind::List => &ListView,
        ViewKind::Tree => &TreeView,
        ViewKind::Icon => &IconView,
    }
}
