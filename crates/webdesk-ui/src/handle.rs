//! Handles: how application code talks to a built widget.
//!
//! A [`Handle`] names one node and caches the descriptor of its tag, so
//! every `set`/`get`/`call` dispatches without a string lookup. Handles
//! are cheap to clone and compare equal when they name the same node.
//!
//! [`Instance::of`] picks the right wrapper: DataView-family tags get a
//! [`DataViewHandle`] with `clear`/`add`/`patch`/`remove`; everything
//! else gets a plain [`Handle`]. Both dereference to [`Handle`].

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::dom::NodeId;
use crate::entry::{EntrySet, RemoveTarget};
use crate::error::Result;
use crate::event::GuiEvent;
use crate::focus;
use crate::gui::Gui;
use crate::helpers;
use crate::registry::{ElementCall, ElementDescriptor};
use crate::scheme::{self, ParseArgs};
use crate::window::Window;

static DATA_VIEW_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^gui-(list|tree|icon|file)-view$|^gui-(select|tabs)").expect("static regex")
});

// ── Handle ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Handle {
    node: NodeId,
    descriptor: Option<Rc<dyn ElementDescriptor>>,
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("node", &self.node)
            .field("has_descriptor", &self.descriptor.is_some())
            .finish()
    }
}

/// Content accepted by [`Handle::append`].
pub enum Child {
    Node(NodeId),
    Text(String),
}

impl From<NodeId> for Child {
    fn from(n: NodeId) -> Self {
        Child::Node(n)
    }
}

impl From<&Handle> for Child {
    fn from(h: &Handle) -> Self {
        Child::Node(h.node)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(s.to_string())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(s)
    }
}

impl Handle {
    pub fn new(gui: &Gui, node: NodeId) -> Self {
        Self { node, descriptor: gui.descriptor(node) }
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_alive(&self, gui: &Gui) -> bool {
        gui.document.contains(self.node)
    }

    /// Sets a parameter: the widget's own setter first, then the generic
    /// attribute setter.
    pub fn set(&self, gui: &mut Gui, param: &str, value: impl Into<Value>) -> &Self {
        self.set_with(gui, param, value, &[])
    }

    pub fn set_with(&self, gui: &mut Gui, param: &str, value: impl Into<Value>, extra: &[Value]) -> &Self {
        let value = value.into();
        let claimed = self.descriptor.as_ref().is_some_and(|d| d.set(gui, self.node, param, &value, extra));
        if !claimed {
            helpers::set_property(&mut gui.document, self.node, param, &value);
        }
        self
    }

    pub fn get(&self, gui: &Gui, param: &str) -> Value {
        self.descriptor
            .as_ref()
            .and_then(|d| d.get(gui, self.node, param))
            .unwrap_or_else(|| helpers::get_property(gui, self.node, param))
    }

    pub fn values(&self, gui: &Gui) -> Value {
        match &self.descriptor {
            Some(d) => d.values(gui, self.node),
            None => Value::Null,
        }
    }

    pub fn call(&self, gui: &mut Gui, call: ElementCall) -> Result<Value> {
        let Some(descriptor) = self.descriptor.clone() else {
            log::debug!("`{}` on a node without a descriptor", call.name());
            return Ok(Value::Null);
        };
        let out = descriptor.call(gui, self.node, call)?;
        gui.dispatch();
        Ok(out)
    }

    /// Binds `listener` to a widget signal.
    pub fn on(&self, gui: &mut Gui, event: &str, listener: impl Fn(&mut Gui, &GuiEvent) + 'static) -> &Self {
        let listener = Rc::new(listener);
        match &self.descriptor {
            Some(d) => d.bind(gui, self.node, event, listener),
            None => gui.listen(self.node, event, listener),
        }
        self
    }

    /// Binds a method of `this`, passing the handle along. Lets a window
    /// route many widget signals to its own methods.
    pub fn son<T: 'static>(
        &self,
        gui: &mut Gui,
        event: &str,
        this: &Rc<T>,
        method: fn(&T, &Handle, &mut Gui, &GuiEvent),
    ) -> &Self {
        let this = Rc::clone(this);
        let handle = self.clone();
        self.on(gui, event, move |gui, ev| method(&this, &handle, gui, ev))
    }

    /// Appends a node or text, building any widgets inside it.
    pub fn append(&self, gui: &mut Gui, child: impl Into<Child>) -> &Self {
        let outer = gui.document.create_element("div");
        let node = match child.into() {
            Child::Node(n) => n,
            Child::Text(t) => gui.document.create_text(t),
        };
        gui.document.append_child(outer, node);
        self.adopt(gui, outer, None, &ParseArgs::default());
        self
    }

    /// Parses `html` and appends the resulting widgets.
    pub fn append_html(&self, gui: &mut Gui, html: &str, window: Option<&Window>, args: &Value) -> Result<&Self> {
        let markup = webdesk_markup::parse_str(&webdesk_markup::normalize_self_closing(html))?;
        let outer = gui.document.create_element("div");
        gui.document.append_markup(Some(outer), &markup.nodes);
        let parse_args = ParseArgs { build_args: args.clone(), ..ParseArgs::default() };
        self.adopt(gui, outer, window, &parse_args);
        Ok(self)
    }

    fn adopt(&self, gui: &mut Gui, outer: NodeId, window: Option<&Window>, args: &ParseArgs) {
        scheme::parse_node(gui, None, outer, window, args);
        gui.document.move_children(outer, self.node);
        gui.remove_node(outer);
        gui.dispatch();
    }

    pub fn query_selector(&self, gui: &Gui, selector: &str) -> Option<Instance> {
        gui.document.query_selector(self.node, selector).map(|n| Instance::of(gui, n))
    }

    pub fn query_selector_all(&self, gui: &Gui, selector: &str) -> Vec<Instance> {
        gui.document
            .query_selector_all(self.node, selector)
            .into_iter()
            .map(|n| Instance::of(gui, n))
            .collect()
    }

    pub fn remove(self, gui: &mut Gui) {
        gui.remove_node(self.node);
    }

    pub fn empty(&self, gui: &mut Gui) -> &Self {
        gui.empty_node(self.node);
        self
    }

    pub fn hide(&self, gui: &mut Gui) -> &Self {
        if !gui.display.contains_key(self.node) {
            let old = gui.document.style(self.node, "display").map(str::to_string);
            gui.display.insert(self.node, old);
        }
        gui.document.set_style(self.node, "display", "none");
        self
    }

    pub fn show(&self, gui: &mut Gui) -> &Self {
        match gui.display.remove(self.node).flatten() {
            Some(old) => gui.document.set_style(self.node, "display", old),
            None => gui.document.remove_style(self.node, "display"),
        }
        self
    }

    pub fn focus(&self, gui: &mut Gui) -> &Self {
        let target = focus::focus_target(&gui.document, self.node);
        gui.focus(target);
        gui.dispatch();
        self
    }

    pub fn blur(&self, gui: &mut Gui) -> &Self {
        let target = focus::focus_target(&gui.document, self.node);
        gui.blur(target);
        gui.dispatch();
        self
    }
}

// ── DataViewHandle ────────────────────────────────────────────────────────

/// Handle of a list, tree, icon or file view (and option lists).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataViewHandle(Handle);

impl Deref for DataViewHandle {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.0
    }
}

impl DataViewHandle {
    pub fn clear(&self, gui: &mut Gui) -> Result<&Self> {
        self.0.call(gui, ElementCall::Clear)?;
        Ok(self)
    }

    pub fn add(&self, gui: &mut Gui, entries: impl Into<EntrySet>) -> Result<&Self> {
        self.0.call(gui, ElementCall::Add(entries.into()))?;
        Ok(self)
    }

    pub fn patch(&self, gui: &mut Gui, entries: impl Into<EntrySet>) -> Result<&Self> {
        self.0.call(gui, ElementCall::Patch(entries.into()))?;
        Ok(self)
    }

    pub fn remove(&self, gui: &mut Gui, target: RemoveTarget) -> Result<&Self> {
        self.0.call(gui, ElementCall::Remove(target))?;
        Ok(self)
    }
}

// ── Instance ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instance {
    Element(Handle),
    DataView(DataViewHandle),
}

impl Instance {
    pub fn of(gui: &Gui, node: NodeId) -> Self {
        let handle = Handle::new(gui, node);
        match gui.document.tag(node) {
            Some(tag) if DATA_VIEW_TAG.is_match(tag) => Instance::DataView(DataViewHandle(handle)),
            _ => Instance::Element(handle),
        }
    }

    pub fn as_data_view(&self) -> Option<&DataViewHandle> {
        match self {
            Instance::DataView(v) => Some(v),
            Instance::Element(_) => None,
        }
    }

    pub fn handle(&self) -> &Handle {
        self
    }

    pub fn into_handle(self) -> Handle {
        match self {
            Instance::Element(h) => h,
            Instance::DataView(v) => v.0,
        }
    }
}

impl Deref for Instance {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        match self {
            Instance::Element(h) => h,
            Instance::DataView(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use crate::event::EventDetail;

    #[test]
    fn instances_pick_wrapper_by_tag() {
        let mut gui = Gui::with_defaults();
        let list = gui.document.create_element("gui-list-view");
        let select = gui.document.create_element("gui-select-list");
        let button = gui.document.create_element("gui-button");
        assert!(Instance::of(&gui, list).as_data_view().is_some());
        assert!(Instance::of(&gui, select).as_data_view().is_some());
        assert!(Instance::of(&gui, button).as_data_view().is_none());
        assert_eq!(Instance::of(&gui, button).into_handle(), Handle::new(&gui, button));
    }

    #[test]
    fn generic_setter_stores_data_attributes() {
        let mut gui = Gui::with_defaults();
        let n = gui.document.create_element("gui-custom");
        let h = Handle::new(&gui, n);
        h.set(&mut gui, "columns", json!([1, 2])).set(&mut gui, "zebra", true);
        assert_eq!(gui.document.attr(n, "data-columns"), Some("[1,2]"));
        assert_eq!(h.get(&gui, "columns"), json!([1, 2]));
        assert_eq!(h.get(&gui, "zebra"), json!(true));
    }

    #[test]
    fn hide_and_show_restore_display() {
        let mut gui = Gui::with_defaults();
        let n = gui.document.create_element("div");
        gui.document.set_style(n, "display", "flex");
        let h = Handle::new(&gui, n);
        h.hide(&mut gui).hide(&mut gui);
        assert_eq!(gui.document.style(n, "display"), Some("none"));
        h.show(&mut gui);
        assert_eq!(gui.document.style(n, "display"), Some("flex"));
    }

    #[test]
    fn append_html_builds_widgets() {
        let mut gui = Gui::with_defaults();
        let root = gui.root();
        let h = Handle::new(&gui, root);
        h.append_html(&mut gui, r#"<gui-button data-id="ok">OK</gui-button>"#, None, &Value::Null).unwrap();
        let button = h.query_selector(&gui, "gui-button").unwrap();
        assert!(gui.is_built(button.node()));
        assert!(gui.document.has_class(button.node(), "gui-element"));
        assert!(gui.document.query_selector(root, "div").is_none());
    }

    #[test]
    fn append_text_and_nodes() {
        let mut gui = Gui::with_defaults();
        let root = gui.root();
        let h = Handle::new(&gui, root);
        let span = gui.document.create_element("span");
        h.append(&mut gui, "hello").append(&mut gui, span);
        assert_eq!(gui.document.text_content(root), "hello");
        assert_eq!(gui.document.parent(span), Some(root));
    }

    struct Window2 {
        seen: RefCell<Vec<String>>,
    }

    impl Window2 {
        fn on_click(&self, handle: &Handle, _gui: &mut Gui, ev: &GuiEvent) {
            self.seen.borrow_mut().push(format!("{:?}:{}", handle.node() == ev.target, ev.name));
        }
    }

    #[test]
    fn son_passes_the_handle() {
        let mut gui = Gui::with_defaults();
        let n = gui.document.create_element("div");
        let win = Rc::new(Window2 { seen: RefCell::new(Vec::new()) });
        let h = Handle::new(&gui, n);
        h.son(&mut gui, "click", &win, Window2::on_click);
        gui.emit(n, "click", EventDetail::None);
        gui.dispatch();
        assert_eq!(*win.seen.borrow(), vec!["true:click".to_string()]);
    }
}
