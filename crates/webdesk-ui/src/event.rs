use std::rc::Rc;

use serde_json::Value;
use webdesk_engine::coords::Vec2;
use webdesk_engine::input::{Key, MouseButton};

pub use webdesk_engine::input::Modifiers;

use crate::dom::NodeId;
use crate::drag::DropDetail;
use crate::entry::SelectedEntry;
use crate::fileview::ScanSummary;
use crate::gui::Gui;

// ── Input ─────────────────────────────────────────────────────────────────

/// Input events a host feeds into [`Gui::handle_input`].
///
/// `target` is the node the host hit-tested. Routing walks from there up
/// through the ancestors until a built widget consumes the event.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Click { target: NodeId, pos: Vec2, modifiers: Modifiers },
    DoubleClick { target: NodeId, pos: Vec2, modifiers: Modifiers },
    ContextMenu { target: NodeId, pos: Vec2, modifiers: Modifiers },
    KeyDown { target: NodeId, key: Key, modifiers: Modifiers },
    /// Committed value of a native control (text typed, option picked,
    /// slider moved).
    Input { target: NodeId, value: Value },
    /// Button pressed. A left press on a drag source starts a drag.
    PointerDown { target: NodeId, pos: Vec2, button: MouseButton },
    /// Window-level pointer motion.
    PointerMove { pos: Vec2 },
    /// Window-level button release.
    PointerUp { pos: Vec2 },
    Focus { target: NodeId },
    Blur { target: NodeId },
}

impl UiEvent {
    pub fn target(&self) -> Option<NodeId> {
        match self {
            UiEvent::Click { target, .. }
            | UiEvent::DoubleClick { target, .. }
            | UiEvent::ContextMenu { target, .. }
            | UiEvent::KeyDown { target, .. }
            | UiEvent::Input { target, .. }
            | UiEvent::PointerDown { target, .. }
            | UiEvent::Focus { target }
            | UiEvent::Blur { target } => Some(*target),
            UiEvent::PointerMove { .. } | UiEvent::PointerUp { .. } => None,
        }
    }
}

/// Result returned by [`crate::registry::ElementDescriptor::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled; stop routing to ancestors.
    Consumed,
    /// Event was not handled; keep routing.
    Ignored,
}

impl EventResult {
    #[inline]
    pub fn is_consumed(self) -> bool {
        self == EventResult::Consumed
    }
}

// ── Signals ───────────────────────────────────────────────────────────────

/// Payload of a widget signal.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    None,
    /// `select`, `activate`.
    Entries(Vec<SelectedEntry>),
    ContextMenu { entries: Vec<SelectedEntry>, pos: Vec2 },
    Expand { element: NodeId, expanded: bool, entries: Vec<SelectedEntry> },
    /// Fired once per row created by `add`/`patch`.
    Render { element: NodeId, data: Value },
    /// Paned view divider released.
    Resize { index: usize, size: f32 },
    /// `change` of inputs and expanders, `click` of buttons.
    Value(Value),
    Drop(DropDetail),
    /// Completion of a queued file view navigation.
    Chdir { path: String, result: Result<ScanSummary, String> },
}

/// A signal emitted by a widget, delivered to listeners by
/// [`Gui::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct GuiEvent {
    pub target: NodeId,
    pub name: String,
    pub detail: EventDetail,
}

impl GuiEvent {
    /// Entries carried by `select`/`activate`/`contextmenu`/`expand`.
    pub fn entries(&self) -> &[SelectedEntry] {
        match &self.detail {
            EventDetail::Entries(e)
            | EventDetail::ContextMenu { entries: e, .. }
            | EventDetail::Expand { entries: e, .. } => e,
            _ => &[],
        }
    }
}

pub type Listener = Rc<dyn Fn(&mut Gui, &GuiEvent)>;
