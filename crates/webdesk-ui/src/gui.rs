//! The runtime: document, registry, collaborators and widget state.
//!
//! A [`Gui`] owns the [`Document`] every window renders into, plus side
//! tables keyed by [`NodeId`] for state that does not fit in attributes
//! (DataView selection, file view navigation, listeners, drag sources).
//! Removing a node through [`Gui::remove_node`] clears all of them.
//!
//! Hosts feed input through [`Gui::handle_input`]. Widgets answer with
//! named [`GuiEvent`]s, which are queued and delivered to listeners by
//! [`Gui::dispatch`]. Listeners receive `&mut Gui` and may emit further
//! events; those are delivered in the same dispatch loop.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use slotmap::SecondaryMap;
use webdesk_engine::coords::Vec2;
use webdesk_engine::input::{Key, MouseButton};

use crate::dataview::DataViewState;
use crate::dom::{Document, NodeId};
use crate::drag::{ActiveDrag, DragHandler, DragState, DraggableArgs, DroppableArgs};
use crate::error::Result;
use crate::event::{EventDetail, EventResult, GuiEvent, Listener, UiEvent};
use crate::fileview::FileViewState;
use crate::focus::{self, FocusManager};
use crate::handle::Instance;
use crate::helpers;
use crate::registry::{ElementDescriptor, ElementRegistry, Params};
use crate::services::Services;

/// A `Gui` shared with async tasks. Borrows are never held across an
/// `.await`.
pub type SharedGui = Rc<RefCell<Gui>>;

/// Deferred async work requested by a synchronous entry point.
///
/// Widgets cannot await inside `set`/`call`/`on_event`; they queue a task
/// and the host drives it with [`crate::fileview::drive_tasks`].
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Chdir { view: NodeId, path: Option<String> },
    /// Lazy population of a tree node in a file view.
    Expand { view: NodeId, entry: NodeId, path: String },
}

pub struct Gui {
    pub document: Document,
    registry: Rc<ElementRegistry>,
    services: Services,
    root: NodeId,
    built: SecondaryMap<NodeId, ()>,
    pub(crate) views: SecondaryMap<NodeId, DataViewState>,
    pub(crate) file_views: SecondaryMap<NodeId, FileViewState>,
    listeners: SecondaryMap<NodeId, HashMap<String, Vec<Listener>>>,
    queue: VecDeque<GuiEvent>,
    tasks: Vec<Task>,
    focus: FocusManager,
    pub(crate) drags: SecondaryMap<NodeId, Box<dyn DragHandler>>,
    active_drag: Option<ActiveDrag>,
    pub(crate) draggables: SecondaryMap<NodeId, DraggableArgs>,
    pub(crate) droppables: SecondaryMap<NodeId, DroppableArgs>,
    /// `display` value to restore on `show`.
    pub(crate) display: SecondaryMap<NodeId, Option<String>>,
}

impl Gui {
    pub fn new(registry: ElementRegistry, services: Services) -> Self {
        let mut document = Document::new();
        let root = document.create_element("body");
        Self {
            document,
            registry: Rc::new(registry),
            services,
            root,
            built: SecondaryMap::new(),
            views: SecondaryMap::new(),
            file_views: SecondaryMap::new(),
            listeners: SecondaryMap::new(),
            queue: VecDeque::new(),
            tasks: Vec::new(),
            focus: FocusManager::new(),
            drags: SecondaryMap::new(),
            active_drag: None,
            draggables: SecondaryMap::new(),
            droppables: SecondaryMap::new(),
            display: SecondaryMap::new(),
        }
    }

    /// Built-in widgets and in-memory collaborators.
    pub fn with_defaults() -> Self {
        Self::new(ElementRegistry::with_defaults(), Services::new())
    }

    pub fn into_shared(self) -> SharedGui {
        Rc::new(RefCell::new(self))
    }

    /// The `<body>` every window content root hangs off.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    /// Descriptor registered for the tag of `node`.
    pub fn descriptor(&self, node: NodeId) -> Option<Rc<dyn ElementDescriptor>> {
        self.registry.lookup(self.document.tag(node)?)
    }

    pub fn is_built(&self, node: NodeId) -> bool {
        self.built.contains_key(node)
    }

    /// Runs the descriptor's `build` for `node` once. Nodes without a
    /// registered tag are left as plain markup.
    pub fn build_element(&mut self, node: NodeId, args: &Value) -> Result<()> {
        if self.is_built(node) {
            return Ok(());
        }
        let Some(descriptor) = self.descriptor(node) else { return Ok(()) };
        self.built.insert(node, ());
        descriptor.build(self, node, args)
    }

    /// Creates a widget from code: custom or generic construction, attach
    /// under `parent`, then build.
    pub fn create(&mut self, tag: &str, params: &Params, parent: Option<NodeId>) -> Result<Instance> {
        let descriptor = self.registry.lookup(tag);
        let node = descriptor
            .as_ref()
            .and_then(|d| d.create(self, tag, params))
            .unwrap_or_else(|| helpers::create_element(&mut self.document, tag, params));
        if let Some(parent) = parent {
            self.document.append_child(parent, node);
        }
        self.build_element(node, &Value::Null)?;
        Ok(Instance::of(self, node))
    }

    pub fn instance(&self, node: NodeId) -> Instance {
        Instance::of(self, node)
    }

    // ── Signals ───────────────────────────────────────────────────────────

    pub fn listen(&mut self, node: NodeId, event: &str, listener: Listener) {
        if !self.document.contains(node) {
            return;
        }
        if let Some(entry) = self.listeners.entry(node) {
            entry.or_default().entry(event.to_string()).or_default().push(listener);
        }
    }

    /// Drops every listener of `event` on `node`.
    pub fn unlisten(&mut self, node: NodeId, event: &str) {
        if let Some(map) = self.listeners.get_mut(node) {
            map.remove(event);
        }
    }

    pub fn has_listeners(&self, node: NodeId, event: &str) -> bool {
        self.listeners.get(node).is_some_and(|m| m.get(event).is_some_and(|l| !l.is_empty()))
    }

    /// Queues `name` on `node`. Delivered by the next [`Gui::dispatch`].
    pub fn emit(&mut self, node: NodeId, name: &str, detail: EventDetail) {
        self.queue.push_back(GuiEvent { target: node, name: name.to_string(), detail });
    }

    /// Delivers queued events until the queue is empty.
    pub fn dispatch(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            let listeners = self.listeners
                .get(event.target)
                .and_then(|m| m.get(&event.name))
                .cloned()
                .unwrap_or_default();
            log::trace!("dispatch `{}` to {} listener(s)", event.name, listeners.len());
            for listener in listeners {
                listener(self, &event);
            }
        }
    }

    pub fn queue_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn take_tasks(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    // ── Input ─────────────────────────────────────────────────────────────

    /// Routes host input to the widgets, then dispatches resulting signals.
    pub fn handle_input(&mut self, event: &UiEvent) -> EventResult {
        let result = match event {
            UiEvent::PointerDown { target, pos, button: MouseButton::Left } => self.pointer_down(*target, *pos),
            UiEvent::PointerDown { .. } => EventResult::Ignored,
            UiEvent::PointerMove { pos } => self.pointer_move(*pos),
            UiEvent::PointerUp { pos } => self.pointer_up(*pos),
            _ => self.route(event),
        };
        let result = match event {
            UiEvent::KeyDown { key: Key::Tab, modifiers, .. } if !result.is_consumed() => {
                self.focus_next(modifiers.shift);
                EventResult::Consumed
            }
            _ => result,
        };
        self.dispatch();
        result
    }

    /// Offers `event` to the built widgets from the target upwards.
    fn route(&mut self, event: &UiEvent) -> EventResult {
        let Some(target) = event.target() else { return EventResult::Ignored };
        if !self.document.contains(target) {
            return EventResult::Ignored;
        }
        let path: Vec<NodeId> = std::iter::once(target).chain(self.document.ancestors(target)).collect();
        for node in path {
            if !self.is_built(node) || !self.document.contains(node) {
                continue;
            }
            let Some(descriptor) = self.descriptor(node) else { continue };
            if descriptor.on_event(self, node, event).is_consumed() {
                return EventResult::Consumed;
            }
        }
        EventResult::Ignored
    }

    fn pointer_down(&mut self, target: NodeId, pos: Vec2) -> EventResult {
        let source = self.document.closest(target, |_, n| self.drags.contains_key(n));
        let Some(source) = source else { return EventResult::Ignored };
        let Some(mut handler) = self.drags.remove(source) else { return EventResult::Ignored };
        let started = handler.on_down(self, pos);
        if !started {
            self.drags.insert(source, handler);
            return EventResult::Ignored;
        }
        let mut state = DragState::default();
        state.press(pos);
        self.active_drag = Some(ActiveDrag { source, state, handler });
        EventResult::Consumed
    }

    fn pointer_move(&mut self, pos: Vec2) -> EventResult {
        let Some(mut drag) = self.active_drag.take() else { return EventResult::Ignored };
        if let Some(diff) = drag.state.motion(pos) {
            drag.handler.on_move(self, diff, pos);
        }
        if self.document.contains(drag.source) {
            self.active_drag = Some(drag);
        }
        EventResult::Consumed
    }

    fn pointer_up(&mut self, pos: Vec2) -> EventResult {
        let Some(mut drag) = self.active_drag.take() else { return EventResult::Ignored };
        if let Some(diff) = drag.state.release(pos) {
            drag.handler.on_move(self, diff, pos);
        }
        drag.handler.on_up(self, pos);
        if self.document.contains(drag.source) {
            self.drags.insert(drag.source, drag.handler);
        }
        EventResult::Consumed
    }

    pub fn is_dragging(&self) -> bool {
        self.active_drag.is_some()
    }

    // ── Focus ─────────────────────────────────────────────────────────────

    pub fn focused(&self) -> Option<NodeId> {
        self.focus.focused()
    }

    /// Moves keyboard focus to `node`, delivering `Blur` to the previous
    /// holder and `Focus` to the new one.
    pub fn focus(&mut self, node: NodeId) {
        if !self.document.contains(node) || self.focus.is_focused(node) {
            return;
        }
        if let Some(prev) = self.focus.set(node) {
            if self.document.contains(prev) {
                self.route(&UiEvent::Blur { target: prev });
            }
        }
        self.route(&UiEvent::Focus { target: node });
    }

    pub fn blur(&mut self, node: NodeId) {
        if self.focus.is_focused(node) {
            self.focus.clear();
            self.route(&UiEvent::Blur { target: node });
        }
    }

    /// Tab traversal within the window holding focus.
    pub fn focus_next(&mut self, reverse: bool) {
        let current = self.focus.focused();
        let scope = current
            .and_then(|c| self.document.closest(c, |d, n| d.tag(n) == Some("application-window-content")))
            .unwrap_or(self.root);
        if let Some(next) = focus::next_element(&self.document, scope, current, reverse) {
            let target = focus::focus_target(&self.document, next);
            self.focus(target);
        }
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    /// Removes `node` and its subtree together with all runtime state.
    pub fn remove_node(&mut self, node: NodeId) {
        if !self.document.contains(node) {
            return;
        }
        for n in self.document.subtree(node) {
            self.built.remove(n);
            self.views.remove(n);
            self.file_views.remove(n);
            self.listeners.remove(n);
            self.drags.remove(n);
            self.draggables.remove(n);
            self.droppables.remove(n);
            self.display.remove(n);
            if self.focus.is_focused(n) {
                self.focus.clear();
            }
            if self.active_drag.as_ref().is_some_and(|d| d.source == n) {
                self.active_drag = None;
            }
        }
        self.document.remove(node);
    }

    /// Removes every child of `node` through [`Gui::remove_node`].
    pub fn empty_node(&mut self, node: NodeId) {
        for child in self.document.children(node).to_vec() {
            self.remove_node(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn listeners_may_emit_during_dispatch() {
        let mut gui = Gui::with_defaults();
        let a = gui.document.create_element("div");
        let b = gui.document.create_element("div");
        let hits = Rc::new(Cell::new(0));
        gui.listen(a, "ping", Rc::new(move |gui: &mut Gui, _: &GuiEvent| gui.emit(b, "pong", EventDetail::None)));
        let h = hits.clone();
        gui.listen(b, "pong", Rc::new(move |_: &mut Gui, _: &GuiEvent| h.set(h.get() + 1)));

        gui.emit(a, "ping", EventDetail::None);
        gui.dispatch();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn removing_a_subtree_drops_its_listeners() {
        let mut gui = Gui::with_defaults();
        let root = gui.root();
        let parent = gui.document.create_element("div");
        let child = gui.document.create_element("div");
        gui.document.append_child(root, parent);
        gui.document.append_child(parent, child);
        gui.listen(child, "x", Rc::new(|_: &mut Gui, _: &GuiEvent| {}));
        gui.focus(child);

        gui.remove_node(parent);
        assert!(!gui.has_listeners(child, "x"));
        assert_eq!(gui.focused(), None);
    }

    #[test]
    fn unregistered_tags_build_as_plain_markup() {
        let mut gui = Gui::with_defaults();
        let n = gui.document.create_element("span");
        assert!(gui.build_element(n, &Value::Null).is_ok());
        assert!(!gui.is_built(n));
    }

    struct Recorder(Rc<RefCell<Vec<Vec2>>>);

    impl DragHandler for Recorder {
        fn on_move(&mut self, _gui: &mut Gui, diff: Vec2, _pos: Vec2) {
            self.0.borrow_mut().push(diff);
        }
    }

    #[test]
    fn drag_follows_pointer_until_release() {
        let mut gui = Gui::with_defaults();
        let root = gui.root();
        let handle = gui.document.create_element("div");
        gui.document.append_child(root, handle);
        let moves = Rc::new(RefCell::new(Vec::new()));
        crate::drag::create_drag(&mut gui, handle, Box::new(Recorder(moves.clone())));

        gui.handle_input(&UiEvent::PointerDown { target: handle, pos: Vec2::new(0.0, 0.0), button: MouseButton::Left });
        assert!(gui.is_dragging());
        gui.handle_input(&UiEvent::PointerMove { pos: Vec2::new(4.0, 0.0) });
        gui.handle_input(&UiEvent::PointerUp { pos: Vec2::new(6.0, 1.0) });
        assert!(!gui.is_dragging());
        assert_eq!(*moves.borrow(), vec![Vec2::new(4.0, 0.0), Vec2::new(6.0, 1.0)]);

        // Released handlers stay registered for the next gesture.
        gui.handle_input(&UiEvent::PointerDown { target: handle, pos: Vec2::new(0.0, 0.0), button: MouseButton::Left });
        assert!(gui.is_dragging());
    }

    #[test]
    fn only_left_button_starts_a_drag() {
        let mut gui = Gui::with_defaults();
        let root = gui.root();
        let handle = gui.document.create_element("div");
        gui.document.append_child(root, handle);
        crate::drag::create_drag(&mut gui, handle, Box::new(Recorder(Rc::new(RefCell::new(Vec::new())))));

        let press = UiEvent::PointerDown { target: handle, pos: Vec2::zero(), button: MouseButton::Right };
        assert_eq!(gui.handle_input(&press), EventResult::Ignored);
        assert!(!gui.is_dragging());
    }
}
