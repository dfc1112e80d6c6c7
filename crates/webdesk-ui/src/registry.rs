//! Element registry: tag name to behavior descriptor.
//!
//! Each `gui-*` tag is backed by one [`ElementDescriptor`]. The registry
//! is built once per session and handed to the [`Gui`]; the scheme parser
//! walks it in registration order when building a parsed fragment.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::dom::NodeId;
use crate::entry::{EntrySet, RemoveTarget};
use crate::error::GuiError;
use crate::event::{EventResult, Listener, UiEvent};
use crate::gui::Gui;

/// Creation parameters for the generic element factory.
pub type Params = Map<String, Value>;

/// Method-style operations on a widget.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementCall {
    Clear,
    Add(EntrySet),
    Patch(EntrySet),
    Remove(RemoveTarget),
    /// Tree nodes: set or toggle (`None`) the expanded state of `entry`.
    Expand { entry: NodeId, expanded: Option<bool> },
    /// File views: navigate. `None` reloads the current path.
    Chdir { path: Option<String> },
    Custom { method: String, args: Value },
}

impl ElementCall {
    pub fn name(&self) -> &str {
        match self {
            ElementCall::Clear => "clear",
            ElementCall::Add(_) => "add",
            ElementCall::Patch(_) => "patch",
            ElementCall::Remove(_) => "remove",
            ElementCall::Expand { .. } => "expand",
            ElementCall::Chdir { .. } => "chdir",
            ElementCall::Custom { method, .. } => method,
        }
    }
}

/// Lifecycle hooks of one widget type.
///
/// Only `build` is required. The defaults describe a widget that stores
/// everything in attributes and reacts to no input.
pub trait ElementDescriptor {
    /// Custom root construction; `None` uses the generic factory.
    fn create(&self, _gui: &mut Gui, _tag: &str, _params: &Params) -> Option<NodeId> {
        None
    }

    /// Turns a parsed node into a live widget. Runs once per node.
    fn build(&self, gui: &mut Gui, node: NodeId, args: &Value) -> Result<(), GuiError>;

    fn bind(&self, gui: &mut Gui, node: NodeId, event: &str, listener: Listener) {
        gui.listen(node, event, listener);
    }

    /// Returns `true` when the parameter was handled here; otherwise the
    /// handle falls back to the generic attribute setter.
    fn set(&self, _gui: &mut Gui, _node: NodeId, _param: &str, _value: &Value, _extra: &[Value]) -> bool {
        false
    }

    fn get(&self, _gui: &Gui, _node: NodeId, _param: &str) -> Option<Value> {
        None
    }

    fn call(&self, _gui: &mut Gui, _node: NodeId, call: ElementCall) -> Result<Value, GuiError> {
        log::debug!("`{}` is not supported here", call.name());
        Ok(Value::Null)
    }

    fn values(&self, _gui: &Gui, _node: NodeId) -> Value {
        Value::Null
    }

    fn on_event(&self, _gui: &mut Gui, _node: NodeId, _event: &UiEvent) -> EventResult {
        EventResult::Ignored
    }
}

/// Ordered tag → descriptor table.
#[derive(Default)]
pub struct ElementRegistry {
    entries: Vec<(String, Rc<dyn ElementDescriptor>)>,
    index: HashMap<String, usize>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in widget: containers first, then inputs, then views.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        crate::containers::register(&mut reg);
        crate::inputs::register(&mut reg);
        crate::views::register(&mut reg);
        crate::fileview::register(&mut reg);
        reg
    }

    /// Registers `descriptor` for `tag`. Re-registering keeps the original
    /// build position.
    pub fn register(&mut self, tag: &str, descriptor: impl ElementDescriptor + 'static) {
        self.register_rc(tag, Rc::new(descriptor));
    }

    pub fn register_rc(&mut self, tag: &str, descriptor: Rc<dyn ElementDescriptor>) {
        let tag = tag.to_ascii_lowercase();
        match self.index.get(&tag) {
            Some(&i) => self.entries[i].1 = descriptor,
            None => {
                self.index.insert(tag.clone(), self.entries.len());
                self.entries.push((tag, descriptor));
            }
        }
    }

    pub fn lookup(&self, tag: &str) -> Option<Rc<dyn ElementDescriptor>> {
        let i = match self.index.get(tag) {
            Some(&i) => i,
            None => *self.index.get(&tag.to_ascii_lowercase())?,
        };
        Some(self.entries[i].1.clone())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.lookup(tag).is_some()
    }

    /// Registered tags in build order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;
    impl ElementDescriptor for Nop {
        fn build(&self, _gui: &mut Gui, _node: NodeId, _args: &Value) -> Result<(), GuiError> {
            Ok(())
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut reg = ElementRegistry::new();
        reg.register("GUI-Thing", Nop);
        assert!(reg.contains("gui-thing"));
        assert!(reg.contains("GUI-THING"));
    }

    #[test]
    fn reregistering_keeps_order() {
        let mut reg = ElementRegistry::new();
        reg.register("a", Nop);
        reg.register("b", Nop);
        reg.register("a", Nop);
        assert_eq!(reg.tags().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn defaults_build_views_after_containers() {
        let reg = ElementRegistry::with_defaults();
        let tags: Vec<_> = reg.tags().collect();
        let pos = |t: &str| tags.iter().position(|x| *x == t).unwrap();
        assert!(pos("gui-paned-view") < pos("gui-list-view"));
        assert!(pos("gui-list-view") < pos("gui-file-view"));
    }
}
