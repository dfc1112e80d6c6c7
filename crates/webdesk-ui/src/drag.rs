//! Pointer gestures: press-move-release drags and typed drag-and-drop.
//!
//! A drag source is registered with [`create_drag`]. When the host reports
//! `PointerDown` on it, the [`Gui`] keeps the handler as its single active
//! drag and routes the window-level `PointerMove`/`PointerUp` events to it
//! until release. [`DragState`] is the bookkeeping shared by every source.
//!
//! [`create_draggable`]/[`create_droppable`] wrap platform drag-and-drop:
//! a typed JSON payload travels in a [`DataTransfer`], and drops tell OS
//! file drops apart from in-app items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use webdesk_engine::coords::Vec2;

use crate::dom::NodeId;
use crate::event::EventDetail;
use crate::gui::Gui;
use crate::helpers;

// ── Press / move / release ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    start: Option<Vec2>,
    current: Vec2,
}

impl DragState {
    pub fn press(&mut self, pos: Vec2) {
        self.start = Some(pos);
        self.current = pos;
    }

    /// Offset from the press position, or `None` when not dragging.
    pub fn motion(&mut self, pos: Vec2) -> Option<Vec2> {
        let start = self.start?;
        self.current = pos;
        Some(pos - start)
    }

    pub fn release(&mut self, pos: Vec2) -> Option<Vec2> {
        let diff = self.motion(pos);
        self.start = None;
        diff
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    pub fn current(&self) -> Vec2 {
        self.current
    }
}

/// Callbacks of a drag source.
pub trait DragHandler {
    /// Returning `false` cancels the gesture before it starts.
    fn on_down(&mut self, _gui: &mut Gui, _pos: Vec2) -> bool {
        true
    }

    fn on_move(&mut self, gui: &mut Gui, diff: Vec2, pos: Vec2);

    fn on_up(&mut self, _gui: &mut Gui, _pos: Vec2) {}
}

pub(crate) struct ActiveDrag {
    pub(crate) source: NodeId,
    pub(crate) state: DragState,
    pub(crate) handler: Box<dyn DragHandler>,
}

/// Makes `node` a drag source.
pub fn create_drag(gui: &mut Gui, node: NodeId, handler: Box<dyn DragHandler>) {
    gui.drags.insert(node, handler);
}

// ── Drag and drop ─────────────────────────────────────────────────────────

/// Where an in-app drag came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragSource {
    pub wid: Option<u32>,
}

/// JSON carried between a draggable and a droppable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<DragSource>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraggableArgs {
    pub kind: Option<String>,
    pub effect: String,
    pub data: Value,
    pub mime: String,
}

impl Default for DraggableArgs {
    fn default() -> Self {
        Self { kind: None, effect: "move".into(), data: Value::Null, mime: "application/json".into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppableArgs {
    /// Only accept payloads of this type.
    pub accept: Option<String>,
    pub effect: String,
    pub mime: String,
    /// Accept OS file drops.
    pub files: bool,
}

impl Default for DroppableArgs {
    fn default() -> Self {
        Self { accept: None, effect: "move".into(), mime: "application/json".into(), files: true }
    }
}

/// A file dropped from outside the desktop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeFile {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// What the host carries from drag start to drop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTransfer {
    pub effect: Option<String>,
    pub items: BTreeMap<String, String>,
    pub files: Vec<NativeFile>,
}

impl DataTransfer {
    pub fn from_files(files: Vec<NativeFile>) -> Self {
        Self { files, ..Self::default() }
    }

    pub fn get(&self, mime: &str) -> Option<&str> {
        self.items.get(mime).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropDetail {
    Files(Vec<NativeFile>),
    Item(DragPayload),
}

pub fn create_draggable(gui: &mut Gui, node: NodeId, args: DraggableArgs) {
    gui.document.set_attr(node, "draggable", "true");
    gui.document.set_attr(node, "aria-grabbed", "false");
    gui.draggables.insert(node, args);
}

pub fn create_droppable(gui: &mut Gui, node: NodeId, args: DroppableArgs) {
    gui.document.set_attr(node, "aria-dropeffect", args.effect.clone());
    gui.droppables.insert(node, args);
}

impl Gui {
    /// Host reports a native drag starting on `node`. Returns the transfer
    /// to hand to the platform, or `None` when nothing draggable is there.
    pub fn begin_drag(&mut self, node: NodeId) -> Option<DataTransfer> {
        let source = self.document.closest(node, |_, n| self.draggables.contains_key(n))?;
        let args = self.draggables.get(source)?.clone();
        let payload = DragPayload {
            kind: args.kind.clone(),
            source: Some(DragSource { wid: helpers::get_window_id(&self.document, source) }),
            data: args.data.clone(),
        };
        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("drag payload not serializable: {}", e);
                return None;
            }
        };
        self.document.set_attr(source, "aria-grabbed", "true");
        self.document.set_style(source, "opacity", "0.4");
        let mut transfer = DataTransfer { effect: Some(args.effect), ..DataTransfer::default() };
        transfer.items.insert(args.mime, json);
        Some(transfer)
    }

    pub fn end_drag(&mut self, node: NodeId) {
        if let Some(source) = self.document.closest(node, |_, n| self.draggables.contains_key(n)) {
            self.document.set_attr(source, "aria-grabbed", "false");
            self.document.remove_style(source, "opacity");
        }
    }

    /// Host reports a drop on `node`. Fires `drop` on the droppable and
    /// returns what was accepted.
    pub fn drop_on(&mut self, node: NodeId, transfer: &DataTransfer) -> Option<DropDetail> {
        let target = self.document.closest(node, |_, n| self.droppables.contains_key(n))?;
        let args = self.droppables.get(target)?.clone();

        let detail = if args.files && !transfer.files.is_empty() {
            DropDetail::Files(transfer.files.clone())
        } else {
            let raw = transfer.get(&args.mime)?;
            let payload: DragPayload = match serde_json::from_str(raw) {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("ignoring drop with unreadable payload: {}", e);
                    return None;
                }
            };
            if args.accept.is_some() && payload.kind != args.accept {
                log::debug!("drop of {:?} rejected, expecting {:?}", payload.kind, args.accept);
                return None;
            }
            DropDetail::Item(payload)
        };
        self.emit(target, "drop", EventDetail::Drop(detail.clone()));
        self.dispatch();
        Some(detail)
    }
}
