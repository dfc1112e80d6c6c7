//! Entry model shared by every DataView family.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dom::NodeId;

/// One row, tree node, or icon in a DataView.
///
/// `id` correlates the entry with its rendered node (`data-id`) and is
/// what `patch` reconciles on. `value` is stored as JSON in `data-value`
/// and handed back in selection events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub id: Option<String>,
    pub value: Value,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
    pub columns: Vec<Column>,
    /// Tree children.
    pub entries: Vec<Entry>,
    /// Tree node to attach under instead of the view body.
    #[serde(skip)]
    pub parent: Option<NodeId>,
}

impl Entry {
    pub fn new(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { id: Some(id.into()), value: value.into(), ..Self::default() }
    }

    pub fn labelled(label: impl Into<String>) -> Self {
        Self { label: Some(label.into()), ..Self::default() }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_children(mut self, entries: Vec<Entry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn under(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Text shown for the entry: the label, else the first column label,
    /// else the value when it is a plain string.
    pub fn display_label(&self) -> String {
        self.label.clone()
            .or_else(|| self.columns.first().map(|c| c.label.clone()))
            .or_else(|| self.value.as_str().map(str::to_string))
            .unwrap_or_default()
    }
}

/// A list-view cell, or a header column when used with `set("columns")`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    pub label: String,
    pub icon: Option<String>,
    pub textalign: Option<String>,
    pub size: Option<String>,
    pub resizable: bool,
}

impl Column {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), ..Self::default() }
    }

    pub fn align(mut self, textalign: &str) -> Self {
        self.textalign = Some(textalign.to_string());
        self
    }
}

/// Argument of `add`/`patch`.
///
/// `Single` is the in-place edit form: `patch` leaves rows that are not
/// mentioned alone. `Many` is a full listing and removes stale rows.
#[derive(Debug, Clone, PartialEq)]
pub enum EntrySet {
    Single(Entry),
    Many(Vec<Entry>),
}

impl EntrySet {
    pub fn is_single(&self) -> bool {
        matches!(self, EntrySet::Single(_))
    }

    pub fn into_vec(self) -> Vec<Entry> {
        match self {
            EntrySet::Single(e) => vec![e],
            EntrySet::Many(v) => v,
        }
    }
}

impl From<Entry> for EntrySet {
    fn from(e: Entry) -> Self {
        EntrySet::Single(e)
    }
}

impl From<Vec<Entry>> for EntrySet {
    fn from(v: Vec<Entry>) -> Self {
        EntrySet::Many(v)
    }
}

/// What `remove` should drop.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveTarget {
    Node(NodeId),
    Index(usize),
    /// First entry whose `data-<key>` attribute equals `value`.
    Key { key: String, value: String },
}

impl RemoveTarget {
    pub fn id(value: impl Into<String>) -> Self {
        RemoveTarget::Key { key: "id".into(), value: value.into() }
    }
}

/// `{index, data}` pair reported by selection events and `values()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEntry {
    pub index: usize,
    pub data: Value,
}
