//! Layout containers: paned views, boxes, grids, expanders and toolbars.

use serde_json::{Value, json};
use webdesk_engine::coords::Vec2;

use crate::dom::NodeId;
use crate::drag::{self, DragHandler};
use crate::error::Result;
use crate::event::{EventDetail, EventResult, UiEvent};
use crate::gui::Gui;
use crate::helpers;
use crate::registry::{ElementDescriptor, ElementRegistry};

const MIN_PANE: f32 = 16.0;
const HANDLE_SIZE: f32 = 8.0;

pub fn register(reg: &mut ElementRegistry) {
    reg.register("gui-paned-view", PanedView);
    reg.register("gui-paned-view-container", FlexContainer);
    reg.register("gui-button-bar", Toolbar);
    reg.register("gui-toolbar", Toolbar);
    reg.register("gui-grid", Grid);
    reg.register("gui-grid-row", Plain);
    reg.register("gui-grid-entry", Plain);
    reg.register("gui-vbox", Plain);
    reg.register("gui-vbox-container", FlexContainer);
    reg.register("gui-hbox", Plain);
    reg.register("gui-hbox-container", FlexContainer);
    reg.register("gui-expander", Expander);
}

/// Markup-only elements.
pub struct Plain;

impl ElementDescriptor for Plain {
    fn build(&self, _gui: &mut Gui, _node: NodeId, _args: &Value) -> Result<()> {
        Ok(())
    }
}

/// Box and pane children sized through `flex`.
pub struct FlexContainer;

impl ElementDescriptor for FlexContainer {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        helpers::set_flexbox(&mut gui.document, node, None, None, None, None);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, _extra: &[Value]) -> bool {
        if !matches!(param, "grow" | "shrink" | "basis" | "align") {
            return false;
        }
        helpers::set_property(&mut gui.document, node, param, value);
        helpers::set_flexbox(&mut gui.document, node, None, None, None, None);
        true
    }
}

pub struct Toolbar;

impl ElementDescriptor for Toolbar {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        gui.document.set_attr(node, "role", "toolbar");
        Ok(())
    }
}

/// Rows share the height equally.
pub struct Grid;

impl ElementDescriptor for Grid {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        let rows = gui.document.query_selector_all(node, "gui-grid-row");
        if rows.is_empty() {
            return Ok(());
        }
        let share = 100.0 / rows.len() as f32;
        for row in rows {
            gui.document.set_style(row, "height", format!("{share}%"));
        }
        Ok(())
    }
}

// ── Paned view ────────────────────────────────────────────────────────────

/// Drags a handle to resize the pane before it.
struct PaneResizer {
    view: NodeId,
    handle: NodeId,
    container: NodeId,
    index: usize,
    horizontal: bool,
    start: f32,
    size: f32,
    min: f32,
    max: f32,
}

impl PaneResizer {
    fn pane(&self, gui: &Gui) -> Option<NodeId> {
        gui.document.previous_element_sibling(self.handle)
    }
}

impl DragHandler for PaneResizer {
    fn on_down(&mut self, gui: &mut Gui, _pos: Vec2) -> bool {
        let Some(pane) = self.pane(gui) else { return false };
        self.start = gui.document.layout(pane).size.along(self.horizontal);
        self.size = self.start;

        let (container, handle, horizontal) = (self.container, self.handle, self.horizontal);
        let read = |attr: &str| {
            gui.document.attr(container, attr)
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| *v > 0.0)
        };
        self.min = read("data-min-size").unwrap_or(MIN_PANE);
        self.max = read("data-max-size").unwrap_or_else(|| {
            let Some(parent) = gui.document.parent(handle) else { return f32::MAX };
            let total = gui.document.layout(parent).size.along(horizontal);
            if total <= 0.0 {
                return f32::MAX;
            }
            let containers = gui.document.query_selector_all(parent, "gui-paned-view-container").len();
            let handles = gui.document.query_selector_all(parent, "gui-paned-view-handle").len();
            total - containers as f32 * MIN_PANE - handles as f32 * HANDLE_SIZE
        });
        true
    }

    fn on_move(&mut self, gui: &mut Gui, diff: Vec2, _pos: Vec2) {
        let Some(pane) = self.pane(gui) else { return };
        let size = self.start + diff.along(self.horizontal);
        if size.is_finite() && size > 0.0 && size >= self.min && size <= self.max {
            self.size = size;
            gui.document.set_style(pane, "flex-basis", format!("{size}px"));
        }
    }

    fn on_up(&mut self, gui: &mut Gui, _pos: Vec2) {
        log::debug!("pane {} resized to {}px", self.index, self.size);
        gui.emit(self.view, "resize", EventDetail::Resize { index: self.index, size: self.size });
    }
}

pub struct PanedView;

impl ElementDescriptor for PanedView {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        let horizontal = gui.document.attr(node, "data-orientation").unwrap_or("horizontal") == "horizontal";
        let containers = gui.document.query_selector_all(node, "gui-paned-view-container");
        for (index, container) in containers.into_iter().enumerate() {
            if index % 2 == 0 {
                continue;
            }
            let Some(parent) = gui.document.parent(container) else { continue };
            let handle = gui.document.create_element("gui-paned-view-handle");
            gui.document.set_attr(handle, "role", "separator");
            gui.document.insert_before(parent, handle, Some(container));
            if gui.document.previous_element_sibling(handle).is_none() {
                continue;
            }
            drag::create_drag(gui, handle, Box::new(PaneResizer {
                view: node,
                handle,
                container,
                index,
                horizontal,
                start: 0.0,
                size: 0.0,
                min: MIN_PANE,
                max: f32::MAX,
            }));
        }
        Ok(())
    }
}

// ── Expander ──────────────────────────────────────────────────────────────

pub struct Expander;

impl Expander {
    /// Sets (or toggles, with `None`) the expanded state.
    fn toggle(gui: &mut Gui, node: NodeId, expanded: Option<bool>) -> bool {
        let expanded = expanded.unwrap_or_else(|| gui.document.attr(node, "data-expanded") == Some("false"));
        gui.document.set_attr(node, "aria-expanded", expanded.to_string());
        gui.document.set_attr(node, "data-expanded", expanded.to_string());
        expanded
    }
}

impl ElementDescriptor for Expander {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        let text = helpers::get_label(&gui.document, node);
        let label = gui.document.create_element("gui-expander-label");
        let text = gui.document.create_text(text);
        gui.document.append_child(label, text);

        gui.document.set_attr(node, "role", "toolbar");
        gui.document.set_attr(node, "aria-expanded", "true");
        gui.document.set_attr(node, "data-expanded", "true");
        let first = gui.document.first_element_child(node);
        gui.document.insert_before(node, label, first);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, _extra: &[Value]) -> bool {
        if param != "expanded" {
            return false;
        }
        Self::toggle(gui, node, Some(value.as_bool() == Some(true)));
        true
    }

    fn get(&self, gui: &Gui, node: NodeId, param: &str) -> Option<Value> {
        (param == "expanded").then(|| json!(gui.document.attr(node, "data-expanded") != Some("false")))
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        let UiEvent::Click { target, .. } = event else { return EventResult::Ignored };
        let on_label = gui.document
            .closest(*target, |d, n| d.tag(n) == Some("gui-expander-label"))
            .is_some_and(|label| gui.document.parent(label) == Some(node));
        if !on_label {
            return EventResult::Ignored;
        }
        let expanded = Self::toggle(gui, node, None);
        gui.emit(node, "change", EventDetail::Value(json!({ "expanded": expanded })));
        EventResult::Consumed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use webdesk_engine::coords::Rect;
    use webdesk_engine::input::MouseButton;
    use webdesk_markup::parse_str;

    use super::*;
    use crate::event::{GuiEvent, Modifiers};

    fn mount(gui: &mut Gui, html: &str) -> NodeId {
        let markup = parse_str(html).unwrap();
        let root = gui.root();
        let top = gui.document.append_markup(Some(root), &markup.nodes)[0];
        for node in gui.document.subtree(top) {
            gui.build_element(node, &Value::Null).unwrap();
        }
        top
    }

    fn record(gui: &mut Gui, node: NodeId, name: &str) -> Rc<RefCell<Vec<EventDetail>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        gui.listen(node, name, Rc::new(move |_: &mut Gui, ev: &GuiEvent| sink.borrow_mut().push(ev.detail.clone())));
        seen
    }

    const PANES: &str = "<gui-paned-view>\
        <gui-paned-view-container data-basis=\"100px\">a</gui-paned-view-container>\
        <gui-paned-view-container data-grow=\"1\" data-shrink=\"1\">b</gui-paned-view-container>\
        <gui-paned-view-container>c</gui-paned-view-container>\
        </gui-paned-view>";

    #[test]
    fn paned_view_inserts_handles_before_odd_containers() {
        let mut gui = Gui::with_defaults();
        let view = mount(&mut gui, PANES);
        let tags: Vec<_> = gui.document.element_children(view)
            .into_iter()
            .map(|n| gui.document.tag(n).unwrap().to_string())
            .collect();
        assert_eq!(tags, ["gui-paned-view-container", "gui-paned-view-handle", "gui-paned-view-container", "gui-paned-view-container"]);
        let first = gui.document.first_element_child(view).unwrap();
        assert_eq!(gui.document.style(first, "flex"), Some("0 0 100px"));
    }

    #[test]
    fn dragging_handle_resizes_previous_pane() {
        let mut gui = Gui::with_defaults();
        let view = mount(&mut gui, PANES);
        let children = gui.document.element_children(view);
        let (pane, handle) = (children[0], children[1]);
        gui.document.set_layout(view, Rect::new(0.0, 0.0, 600.0, 400.0));
        gui.document.set_layout(pane, Rect::new(0.0, 0.0, 100.0, 400.0));
        let resized = record(&mut gui, view, "resize");

        gui.handle_input(&UiEvent::PointerDown { target: handle, pos: Vec2::new(100.0, 10.0), button: MouseButton::Left });
        assert!(gui.is_dragging());
        gui.handle_input(&UiEvent::PointerMove { pos: Vec2::new(150.0, 10.0) });
        assert_eq!(gui.document.style(pane, "flex-basis"), Some("150px"));

        // Below the minimum: ignored.
        gui.handle_input(&UiEvent::PointerMove { pos: Vec2::new(5.0, 10.0) });
        assert_eq!(gui.document.style(pane, "flex-basis"), Some("150px"));

        // Past 600 - 3 * 16 - 1 * 8: ignored.
        gui.handle_input(&UiEvent::PointerMove { pos: Vec2::new(560.0, 10.0) });
        assert_eq!(gui.document.style(pane, "flex-basis"), Some("150px"));

        gui.handle_input(&UiEvent::PointerUp { pos: Vec2::new(180.0, 10.0) });
        assert!(!gui.is_dragging());
        assert_eq!(gui.document.style(pane, "flex-basis"), Some("180px"));
        assert_eq!(*resized.borrow(), [EventDetail::Resize { index: 1, size: 180.0 }]);
    }

    #[test]
    fn min_size_comes_from_the_container() {
        let mut gui = Gui::with_defaults();
        let view = mount(&mut gui, "<gui-paned-view>\
            <gui-paned-view-container>a</gui-paned-view-container>\
            <gui-paned-view-container data-min-size=\"80\">b</gui-paned-view-container>\
            </gui-paned-view>");
        let children = gui.document.element_children(view);
        gui.document.set_layout(children[0], Rect::new(0.0, 0.0, 100.0, 50.0));

        gui.handle_input(&UiEvent::PointerDown { target: children[1], pos: Vec2::zero(), button: MouseButton::Left });
        gui.handle_input(&UiEvent::PointerMove { pos: Vec2::new(-30.0, 0.0) });
        assert_eq!(gui.document.style(children[0], "flex-basis"), None);
        gui.handle_input(&UiEvent::PointerMove { pos: Vec2::new(-10.0, 0.0) });
        assert_eq!(gui.document.style(children[0], "flex-basis"), Some("90px"));
        gui.handle_input(&UiEvent::PointerUp { pos: Vec2::new(-10.0, 0.0) });
    }

    #[test]
    fn expander_label_toggles() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-expander data-label=\"More\"><gui-label>x</gui-label></gui-expander>");
        let label = gui.document.first_element_child(node).unwrap();
        assert_eq!(gui.document.tag(label), Some("gui-expander-label"));
        assert_eq!(gui.document.text_content(label), "More");
        assert_eq!(gui.document.attr(node, "data-expanded"), Some("true"));

        let changes = record(&mut gui, node, "change");
        let click = UiEvent::Click { target: label, pos: Vec2::zero(), modifiers: Modifiers::NONE };
        gui.handle_input(&click);
        assert_eq!(gui.document.attr(node, "aria-expanded"), Some("false"));
        gui.handle_input(&click);
        assert_eq!(
            *changes.borrow(),
            [EventDetail::Value(json!({"expanded": false})), EventDetail::Value(json!({"expanded": true}))],
        );

        let d = gui.descriptor(node).unwrap();
        d.set(&mut gui, node, "expanded", &json!(false), &[]);
        assert_eq!(d.get(&gui, node, "expanded"), Some(json!(false)));
    }

    #[test]
    fn grid_rows_share_height() {
        let mut gui = Gui::with_defaults();
        let grid = mount(&mut gui, "<gui-grid><gui-grid-row></gui-grid-row><gui-grid-row></gui-grid-row>\
            <gui-grid-row></gui-grid-row><gui-grid-row></gui-grid-row></gui-grid>");
        for row in gui.document.element_children(grid) {
            assert_eq!(gui.document.style(row, "height"), Some("25%"));
        }
    }

    #[test]
    fn toolbars_get_a_role() {
        let mut gui = Gui::with_defaults();
        let bar = mount(&mut gui, "<gui-button-bar></gui-button-bar>");
        assert_eq!(gui.document.attr(bar, "role"), Some("toolbar"));
    }
}
