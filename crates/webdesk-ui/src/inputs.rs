//! Form widgets.
//!
//! Each widget wraps one native control (`input`, `textarea`, `select` or
//! `button`) built from its `data-*` attributes. Hosts report committed
//! values with `UiEvent::Input` and clicks with `UiEvent::Click`; widgets
//! mirror the value onto the control and fire `change` (or `click` for
//! buttons, `enter` for text fields).

use std::cell::Cell;

use serde_json::{Value, json};
use webdesk_engine::input::Key;

use crate::dom::NodeId;
use crate::entry::RemoveTarget;
use crate::error::{GuiError, Result};
use crate::event::{EventDetail, EventResult, UiEvent};
use crate::gui::Gui;
use crate::helpers;
use crate::registry::{ElementCall, ElementDescriptor, ElementRegistry, Params};
use crate::services::ClipboardData;

pub fn register(reg: &mut ElementRegistry) {
    reg.register("gui-label", Label);
    reg.register("gui-textarea", Input(InputKind::Textarea));
    reg.register("gui-text", Input(InputKind::Text));
    reg.register("gui-password", Input(InputKind::Password));
    reg.register("gui-radio", Input(InputKind::Radio));
    reg.register("gui-checkbox", Input(InputKind::Checkbox));
    reg.register("gui-switch", Switch);
    reg.register("gui-button", Button::default());
    reg.register("gui-select", Select);
    reg.register("gui-select-list", Select);
    reg.register("gui-slider", Input(InputKind::Range));
}

fn within_window(gui: &Gui, node: NodeId) -> NodeId {
    gui.document
        .closest(node, |d, n| d.tag(n) == Some("application-window-content"))
        .unwrap_or_else(|| gui.root())
}

fn is_disabled(gui: &Gui, node: NodeId) -> bool {
    helpers::is_true(gui.document.attr(node, "data-disabled"))
}

// ── Label ─────────────────────────────────────────────────────────────────

pub struct Label;

impl Label {
    fn set_text(gui: &mut Gui, node: NodeId, text: &str) {
        gui.document.set_attr(node, "data-label", text);
        if let Some(lbl) = gui.document.child_by_tag(node, "label") {
            gui.document.set_text_content(lbl, text);
        }
    }
}

impl ElementDescriptor for Label {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        let text = helpers::get_value_label(&mut gui.document, node, true);
        let lbl = gui.document.create_element("label");
        gui.document.set_text_content(lbl, text.clone());
        gui.document.set_attr(node, "role", "heading");
        gui.document.set_attr(node, "data-label", text);
        gui.document.append_child(node, lbl);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, _extra: &[Value]) -> bool {
        if param != "value" && param != "label" {
            return false;
        }
        Self::set_text(gui, node, &helpers::value_to_attr(value));
        true
    }

    fn get(&self, gui: &Gui, node: NodeId, param: &str) -> Option<Value> {
        (param == "value").then(|| json!(helpers::get_label(&gui.document, node)))
    }
}

// ── Text, check and range inputs ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Password,
    Textarea,
    Checkbox,
    Radio,
    Range,
}

impl InputKind {
    fn type_name(self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Password => "password",
            InputKind::Textarea => "textarea",
            InputKind::Checkbox => "checkbox",
            InputKind::Radio => "radio",
            InputKind::Range => "range",
        }
    }

    fn role(self) -> &'static str {
        match self {
            InputKind::Text | InputKind::Password | InputKind::Textarea => "textbox",
            InputKind::Range => "slider",
            InputKind::Checkbox => "checkbox",
            InputKind::Radio => "radio",
        }
    }

    fn is_textual(self) -> bool {
        matches!(self, InputKind::Text | InputKind::Password | InputKind::Textarea)
    }

    fn is_check(self) -> bool {
        matches!(self, InputKind::Checkbox | InputKind::Radio)
    }
}

/// Replaces the content of `node` with a native control of `kind`.
fn create_input(gui: &mut Gui, node: NodeId, kind: InputKind) -> NodeId {
    let doc = &mut gui.document;
    let group = doc.attr(node, "data-group").map(str::to_string);
    let placeholder = doc.attr(node, "data-placeholder").map(str::to_string);
    let disabled = helpers::is_true(doc.attr(node, "data-disabled"));
    let text = doc.children(node).first().and_then(|&c| doc.text(c)).map(str::to_string);
    doc.empty(node);

    let control = doc.create_element(if kind == InputKind::Textarea { "textarea" } else { "input" });
    if kind != InputKind::Textarea {
        doc.set_attr(control, "type", kind.type_name());
    }
    doc.set_attr(control, "tabindex", "-1");
    if let Some(placeholder) = placeholder {
        doc.set_attr(control, "placeholder", placeholder);
    }
    if disabled {
        doc.set_attr(control, "disabled", "disabled");
    }
    if let Some(group) = &group {
        doc.set_attr(control, "name", format!("{group}[]"));
    }
    for flag in ["autocomplete", "autocorrect", "autocapitalize", "spellcheck"] {
        let value = doc.attr(node, &format!("data-{flag}")).unwrap_or("false").to_string();
        doc.set_attr(control, flag, value);
    }

    match kind {
        InputKind::Range => {
            for bound in ["min", "max", "step"] {
                if let Some(v) = doc.attr(node, &format!("data-{bound}")).map(str::to_string) {
                    doc.set_attr(control, bound, v);
                }
            }
            if let Some(v) = doc.attr(node, "data-value").map(str::to_string) {
                doc.set_attr(control, "value", v);
            }
        }
        InputKind::Checkbox | InputKind::Radio => {
            if helpers::is_true(doc.attr(node, "data-value")) {
                doc.set_attr(control, "checked", "checked");
            }
        }
        _ => doc.set_attr(control, "value", text.unwrap_or_default()),
    }

    helpers::create_input_label(doc, node, kind.type_name(), control, None);

    doc.set_attr(control, "role", kind.role());
    let title = doc.attr(node, "title").unwrap_or_default().to_string();
    doc.set_attr(control, "aria-label", title);
    doc.set_attr(node, "role", "region");
    doc.set_attr(node, "aria-disabled", disabled.to_string());
    control
}

fn control(gui: &Gui, node: NodeId) -> Option<NodeId> {
    gui.document.query_selector(node, "textarea, input, select")
}

/// Checks `radio` and unchecks the other radios of its group in the same
/// window.
fn check_radio(gui: &mut Gui, node: NodeId, radio: NodeId) {
    if let Some(name) = gui.document.attr(radio, "name").map(str::to_string) {
        let scope = within_window(gui, node);
        let peers: Vec<NodeId> = gui.document
            .descendants(scope)
            .into_iter()
            .filter(|&n| gui.document.tag(n) == Some("input") && gui.document.attr(n, "name") == Some(name.as_str()))
            .collect();
        for other in peers {
            gui.document.remove_attr(other, "checked");
        }
    }
    gui.document.set_attr(radio, "checked", "checked");
}

pub struct Input(pub InputKind);

impl Input {
    fn commit(&self, gui: &mut Gui, node: NodeId, value: &Value) {
        let Some(control) = control(gui, node) else { return };
        let detail = match self.0 {
            InputKind::Radio => {
                check_radio(gui, node, control);
                Value::Bool(true)
            }
            InputKind::Checkbox => {
                let on = value.as_bool().unwrap_or(false);
                if on {
                    gui.document.set_attr(control, "checked", "checked");
                } else {
                    gui.document.remove_attr(control, "checked");
                }
                Value::Bool(on)
            }
            _ => {
                let text = helpers::value_to_attr(value);
                gui.document.set_attr(control, "value", text.clone());
                if self.0 == InputKind::Range { json!(text.parse::<f64>().unwrap_or(0.0)) } else { Value::String(text) }
            }
        };
        gui.emit(node, "change", EventDetail::Value(detail));
    }

    fn on_key(&self, gui: &mut Gui, node: NodeId, key: &Key, ctrl: bool) -> EventResult {
        let Some(control) = control(gui, node) else { return EventResult::Ignored };
        let value = gui.document.attr(control, "value").unwrap_or_default().to_string();
        match key {
            Key::Enter if self.0 != InputKind::Textarea => {
                gui.emit(node, "enter", EventDetail::Value(Value::String(value)));
                EventResult::Consumed
            }
            Key::Character('c') if ctrl => {
                gui.services().clipboard.set_clipboard(ClipboardData::Text(value));
                EventResult::Consumed
            }
            Key::Tab if self.0 == InputKind::Textarea => {
                gui.document.set_attr(control, "value", format!("{value}\t"));
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }
}

impl ElementDescriptor for Input {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        create_input(gui, node, self.0);
        Ok(())
    }

    fn get(&self, gui: &Gui, node: NodeId, param: &str) -> Option<Value> {
        if param != "value" || self.0 != InputKind::Range {
            return None;
        }
        let raw = helpers::get_property(gui, node, param);
        Some(json!(raw.as_str().and_then(|s| s.parse::<f64>().ok()).map_or(0, |v| v as i64)))
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        if is_disabled(gui, node) {
            return EventResult::Ignored;
        }
        match event {
            UiEvent::Input { value, .. } => {
                self.commit(gui, node, value);
                EventResult::Consumed
            }
            UiEvent::Click { .. } if self.0.is_check() => {
                let checked = control(gui, node).is_some_and(|c| gui.document.has_attr(c, "checked"));
                if self.0 == InputKind::Radio && checked {
                    return EventResult::Consumed;
                }
                self.commit(gui, node, &Value::Bool(!checked));
                EventResult::Consumed
            }
            UiEvent::KeyDown { key, modifiers, .. } if self.0.is_textual() => self.on_key(gui, node, key, modifiers.ctrl),
            _ => EventResult::Ignored,
        }
    }
}

// ── Switch ────────────────────────────────────────────────────────────────

pub struct Switch;

impl Switch {
    fn set_value(gui: &mut Gui, node: NodeId, on: bool) {
        let doc = &mut gui.document;
        let (Some(input), Some(button)) = (doc.query_selector(node, "input"), doc.query_selector(node, "button")) else {
            return;
        };
        if on {
            doc.set_attr(input, "checked", "checked");
        } else {
            doc.remove_attr(input, "checked");
        }
        doc.toggle_class(button, "gui-active", on);
        doc.set_text_content(button, if on { "1" } else { "0" });
    }
}

impl ElementDescriptor for Switch {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        let input = gui.document.create_element("input");
        gui.document.set_attr(input, "type", "checkbox");
        gui.document.append_child(node, input);

        let inner = gui.document.create_element("div");
        let button = gui.document.create_element("button");
        gui.document.append_child(inner, button);
        helpers::create_input_label(&mut gui.document, node, "switch", inner, None);
        Self::set_value(gui, node, false);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, _extra: &[Value]) -> bool {
        if param != "value" {
            return false;
        }
        Self::set_value(gui, node, value.as_bool() == Some(true));
        true
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        let UiEvent::Click { target, .. } = event else { return EventResult::Ignored };
        let on_toggle = gui.document.closest(*target, |d, n| d.tag(n) == Some("div")).is_some_and(|d| gui.document.is_ancestor(node, d));
        if !on_toggle || gui.document.has_attr(node, "data-disabled") {
            return EventResult::Ignored;
        }
        let on = !gui.document.query_selector(node, "input").is_some_and(|i| gui.document.has_attr(i, "checked"));
        Self::set_value(gui, node, on);
        gui.emit(node, "change", EventDetail::Value(Value::Bool(on)));
        EventResult::Consumed
    }
}

// ── Button ────────────────────────────────────────────────────────────────

/// Buttons number themselves so grouped buttons get distinct names.
#[derive(Default)]
pub struct Button {
    count: Cell<usize>,
}

impl Button {
    fn button(gui: &Gui, node: NodeId) -> Option<NodeId> {
        gui.document.child_by_tag(node, "button")
    }

    fn set_label(gui: &mut Gui, node: NodeId, label: &str) {
        let Some(button) = Self::button(gui, node) else { return };
        let img = gui.document.child_by_tag(button, "img");
        if let Some(img) = img {
            gui.document.detach(img);
        }
        gui.document.empty(button);
        if let Some(img) = img {
            gui.document.append_child(button, img);
        }
        let text = gui.document.create_text(label);
        gui.document.append_child(button, text);
        gui.document.set_attr(button, "aria-label", label);
    }

    /// Marks `button` active and clears the other buttons of `group`.
    fn activate_in_group(gui: &mut Gui, node: NodeId, button: NodeId, group: &str) {
        let scope = within_window(gui, node);
        let name = gui.document.attr(button, "name").map(str::to_string);
        let peers: Vec<NodeId> = gui.document
            .descendants(scope)
            .into_iter()
            .filter(|&n| gui.document.tag(n) == Some("gui-button") && gui.document.attr(n, "data-group") == Some(group))
            .filter_map(|n| Self::button(gui, n))
            .collect();
        for other in peers {
            if gui.document.attr(other, "name") != name.as_deref() {
                gui.document.remove_class(other, "gui-active");
            }
        }
        gui.document.add_class(button, "gui-active");
    }
}

impl ElementDescriptor for Button {
    fn create(&self, gui: &mut Gui, tag: &str, params: &Params) -> Option<NodeId> {
        let mut params = params.clone();
        let label = params.remove("label");
        let el = helpers::create_element(&mut gui.document, tag, &params);
        if let Some(label) = label.filter(|l| !l.is_null()) {
            let text = gui.document.create_text(helpers::value_to_attr(&label));
            gui.document.append_child(el, text);
        }
        Some(el)
    }

    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        let disabled = gui.document.has_attr(node, "data-disabled");
        let group = gui.document.attr(node, "data-group").map(str::to_string);
        let label = helpers::get_value_label(&mut gui.document, node, false);
        let icon = helpers::get_icon(gui, node, None);
        let tooltip = gui.document.attr(node, "data-tooltip").map(|t| gui.services().translate(t));

        let button = gui.document.create_element("button");
        if disabled {
            gui.document.set_attr(button, "disabled", "disabled");
        }

        if !label.is_empty() {
            gui.document.add_class(node, "gui-has-label");
        }
        let text = gui.document.create_text(label.clone());
        gui.document.append_child(button, text);
        gui.document.set_attr(button, "aria-label", label);

        if let Some(icon) = icon {
            let tip = tooltip.unwrap_or_default();
            let img = gui.document.create_element("img");
            gui.document.set_attr(img, "src", icon);
            gui.document.set_attr(img, "alt", tip.clone());
            gui.document.set_attr(img, "title", tip);
            let first = gui.document.children(button).first().copied();
            gui.document.insert_before(button, img, first);
            gui.document.add_class(node, "gui-has-image");
        }

        let n = self.count.get();
        self.count.set(n + 1);
        if let Some(group) = group {
            gui.document.set_attr(button, "name", format!("{group}[{n}]"));
        }

        gui.document.set_attr(node, "role", "navigation");
        gui.document.append_child(node, button);
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, _extra: &[Value]) -> bool {
        if param != "value" && param != "label" {
            return false;
        }
        Self::set_label(gui, node, &helpers::value_to_attr(value));
        true
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        let UiEvent::Click { .. } = event else { return EventResult::Ignored };
        let Some(button) = Self::button(gui, node) else { return EventResult::Ignored };
        if gui.document.has_attr(button, "disabled") {
            return EventResult::Consumed;
        }
        if let Some(group) = gui.document.attr(node, "data-group").map(str::to_string) {
            Self::activate_in_group(gui, node, button, &group);
        }
        gui.emit(node, "click", EventDetail::None);
        EventResult::Consumed
    }
}

// ── Select ────────────────────────────────────────────────────────────────

/// `gui-select` and `gui-select-list`.
pub struct Select;

impl Select {
    fn select(gui: &Gui, node: NodeId) -> Option<NodeId> {
        gui.document.child_by_tag(node, "select")
    }

    fn option(gui: &mut Gui, value: &str, label: &str) -> NodeId {
        let opt = gui.document.create_element("option");
        gui.document.set_attr(opt, "role", "option");
        gui.document.set_attr(opt, "value", value);
        let text = gui.document.create_text(label);
        gui.document.append_child(opt, text);
        opt
    }

    /// Marks the option holding `value` as selected and mirrors it on the
    /// `select`.
    fn choose(gui: &mut Gui, select: NodeId, value: &str) {
        let multiple = gui.document.has_attr(select, "multiple");
        for opt in gui.document.element_children(select) {
            if gui.document.attr(opt, "value") == Some(value) {
                gui.document.set_attr(opt, "selected", "selected");
            } else if !multiple {
                gui.document.remove_attr(opt, "selected");
            }
        }
        gui.document.set_attr(select, "value", value);
    }
}

impl ElementDescriptor for Select {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        let list = gui.document.tag(node) == Some("gui-select-list");
        let disabled = gui.document.has_attr(node, "data-disabled");
        let selected = gui.document.attr(node, "data-selected").and_then(|s| s.parse::<usize>().ok());

        let select = gui.document.create_element("select");
        if list {
            let size = gui.document.attr(node, "data-size").unwrap_or("2").to_string();
            gui.document.set_attr(select, "size", size);
            if helpers::is_true(gui.document.attr(node, "data-multiple")) {
                gui.document.set_attr(select, "multiple", "multiple");
            }
        }
        if disabled {
            gui.document.set_attr(select, "disabled", "disabled");
        }

        for source in gui.document.query_selector_all(node, "gui-select-option") {
            let value = gui.document.attr(source, "data-value").unwrap_or_default().to_string();
            let label = gui.document.children(source).first().and_then(|&c| gui.document.text(c)).unwrap_or_default().to_string();
            let preselected = gui.document.has_attr(source, "selected");
            let opt = Self::option(gui, &value, &label);
            if preselected {
                gui.document.set_attr(opt, "selected", "selected");
                gui.document.set_attr(select, "value", value);
            }
            gui.document.append_child(select, opt);
            gui.remove_node(source);
        }
        if let Some(value) = selected
            .and_then(|i| gui.document.element_children(select).get(i).copied())
            .and_then(|opt| gui.document.attr(opt, "value").map(str::to_string))
        {
            Self::choose(gui, select, &value);
        }

        gui.document.set_attr(select, "role", "listbox");
        let title = gui.document.attr(node, "title").unwrap_or_default().to_string();
        gui.document.set_attr(select, "aria-label", title);
        gui.document.set_attr(node, "aria-disabled", disabled.to_string());
        gui.document.set_attr(node, "role", "region");
        gui.document.append_child(node, select);
        Ok(())
    }

    fn call(&self, gui: &mut Gui, node: NodeId, call: ElementCall) -> Result<Value> {
        let select = Self::select(gui, node).ok_or_else(|| GuiError::not_found("select control"))?;
        match call {
            ElementCall::Add(entries) => {
                for entry in entries.into_vec() {
                    let opt = Self::option(gui, &helpers::value_to_attr(&entry.value), &entry.display_label());
                    gui.document.append_child(select, opt);
                }
            }
            ElementCall::Remove(target) => {
                let options = gui.document.element_children(select);
                let found = match target {
                    RemoveTarget::Node(n) => options.into_iter().find(|&o| o == n),
                    RemoveTarget::Index(i) => options.get(i).copied(),
                    RemoveTarget::Key { value, .. } => options
                        .into_iter()
                        .find(|&o| gui.document.attr(o, "value") == Some(value.as_str())),
                };
                if let Some(opt) = found {
                    gui.remove_node(opt);
                }
            }
            ElementCall::Clear => gui.empty_node(select),
            other => log::debug!("`{}` is not supported by selects", other.name()),
        }
        Ok(Value::Null)
    }

    fn on_event(&self, gui: &mut Gui, node: NodeId, event: &UiEvent) -> EventResult {
        let UiEvent::Input { value, .. } = event else { return EventResult::Ignored };
        let Some(select) = Self::select(gui, node) else { return EventResult::Ignored };
        if gui.document.has_attr(select, "disabled") {
            return EventResult::Ignored;
        }
        let value = helpers::value_to_attr(value);
        Self::choose(gui, select, &value);
        gui.emit(node, "change", EventDetail::Value(Value::String(value)));
        EventResult::Consumed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use webdesk_engine::coords::Vec2;
    use webdesk_markup::parse_str;

    use super::*;
    use crate::entry::{Entry, EntrySet};
    use crate::event::{GuiEvent, Modifiers};
    use crate::services::{Clipboard, MemoryClipboard, Services};

    fn mount(gui: &mut Gui, html: &str) -> NodeId {
        let markup = parse_str(html).unwrap();
        let root = gui.root();
        let top = gui.document.append_markup(Some(root), &markup.nodes)[0];
        for node in gui.document.subtree(top) {
            gui.build_element(node, &Value::Null).unwrap();
        }
        top
    }

    fn changes(gui: &mut Gui, node: NodeId, name: &str) -> Rc<RefCell<Vec<EventDetail>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        gui.listen(node, name, Rc::new(move |_: &mut Gui, ev: &GuiEvent| sink.borrow_mut().push(ev.detail.clone())));
        seen
    }

    fn click(target: NodeId) -> UiEvent {
        UiEvent::Click { target, pos: Vec2::zero(), modifiers: Modifiers::NONE }
    }

    #[test]
    fn text_input_takes_its_content_as_value() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-text data-label=\"Name\" data-placeholder=\"you\">Ada</gui-text>");
        let input = gui.document.query_selector(node, "input").unwrap();
        assert_eq!(gui.document.attr(input, "type"), Some("text"));
        assert_eq!(gui.document.attr(input, "value"), Some("Ada"));
        assert_eq!(gui.document.attr(input, "placeholder"), Some("you"));
        assert_eq!(gui.document.attr(input, "role"), Some("textbox"));
        let label = gui.document.child_by_tag(node, "label").unwrap();
        assert_eq!(gui.document.text_content(label), "Name");
        assert_eq!(helpers::get_property(&gui, node, "value"), json!("Ada"));
    }

    #[test]
    fn input_commits_value_and_fires_change() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-text></gui-text>");
        let input = gui.document.query_selector(node, "input").unwrap();
        let seen = changes(&mut gui, node, "change");
        gui.handle_input(&UiEvent::Input { target: input, value: json!("hello") });
        assert_eq!(gui.document.attr(input, "value"), Some("hello"));
        assert_eq!(*seen.borrow(), [EventDetail::Value(json!("hello"))]);
    }

    #[test]
    fn enter_and_copy_on_text_fields() {
        let clipboard = Rc::new(MemoryClipboard::default());
        let mut gui = Gui::new(ElementRegistry::with_defaults(), Services::new().with_clipboard(clipboard.clone()));
        let node = mount(&mut gui, "<gui-password>secret</gui-password>");
        let input = gui.document.query_selector(node, "input").unwrap();
        let entered = changes(&mut gui, node, "enter");

        gui.handle_input(&UiEvent::KeyDown { target: input, key: Key::Enter, modifiers: Modifiers::NONE });
        gui.handle_input(&UiEvent::KeyDown { target: input, key: Key::Character('c'), modifiers: Modifiers::CTRL });
        assert_eq!(*entered.borrow(), [EventDetail::Value(json!("secret"))]);
        assert_eq!(clipboard.get_clipboard(), ClipboardData::Text("secret".into()));
    }

    #[test]
    fn textarea_keeps_tab() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-textarea>a</gui-textarea>");
        let area = gui.document.query_selector(node, "textarea").unwrap();
        let result = gui.handle_input(&UiEvent::KeyDown { target: area, key: Key::Tab, modifiers: Modifiers::NONE });
        assert!(result.is_consumed());
        assert_eq!(gui.document.attr(area, "value"), Some("a\t"));
    }

    #[test]
    fn checkbox_click_toggles() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-checkbox data-value=\"true\" data-label=\"On\"></gui-checkbox>");
        let input = gui.document.query_selector(node, "input").unwrap();
        assert!(gui.document.has_attr(input, "checked"));
        // Checkbox sits before its text.
        let label = gui.document.child_by_tag(node, "label").unwrap();
        assert_eq!(gui.document.first_element_child(label), Some(input));

        let seen = changes(&mut gui, node, "change");
        gui.handle_input(&click(input));
        assert!(!gui.document.has_attr(input, "checked"));
        assert_eq!(*seen.borrow(), [EventDetail::Value(json!(false))]);
        assert_eq!(helpers::get_property(&gui, node, "value"), json!(false));
    }

    #[test]
    fn radios_of_a_group_exclude_each_other() {
        let mut gui = Gui::with_defaults();
        let form = mount(&mut gui, "<gui-vbox>\
            <gui-radio data-group=\"g\" data-value=\"true\"></gui-radio>\
            <gui-radio data-group=\"g\"></gui-radio>\
            </gui-vbox>");
        let radios = gui.document.element_children(form);
        let a = gui.document.query_selector(radios[0], "input").unwrap();
        let b = gui.document.query_selector(radios[1], "input").unwrap();
        assert_eq!(gui.document.attr(b, "name"), Some("g[]"));
        gui.handle_input(&click(b));
        assert!(gui.document.has_attr(b, "checked"));
        assert!(!gui.document.has_attr(a, "checked"));
    }

    #[test]
    fn disabled_inputs_ignore_events() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-text data-disabled=\"true\">x</gui-text>");
        let input = gui.document.query_selector(node, "input").unwrap();
        assert_eq!(gui.document.attr(input, "disabled"), Some("disabled"));
        assert_eq!(gui.document.attr(node, "aria-disabled"), Some("true"));
        let result = gui.handle_input(&UiEvent::Input { target: input, value: json!("y") });
        assert!(!result.is_consumed());
        assert_eq!(gui.document.attr(input, "value"), Some("x"));
    }

    #[test]
    fn switch_toggles_on_click() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-switch></gui-switch>");
        let button = gui.document.query_selector(node, "button").unwrap();
        assert_eq!(gui.document.text_content(button), "0");
        gui.handle_input(&click(button));
        assert_eq!(gui.document.text_content(button), "1");
        assert!(gui.document.has_class(button, "gui-active"));
        assert_eq!(helpers::get_property(&gui, node, "value"), json!(true));
    }

    #[test]
    fn button_label_icon_and_click() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-button data-icon=\"stock://places/folder.png\" data-tooltip=\"Open\">Open</gui-button>");
        let button = gui.document.child_by_tag(node, "button").unwrap();
        assert!(gui.document.has_class(node, "gui-has-label"));
        assert!(gui.document.has_class(node, "gui-has-image"));
        let img = gui.document.first_element_child(button).unwrap();
        assert_eq!(gui.document.attr(img, "src"), Some("/themes/icons/default/16x16/places/folder.png"));
        assert_eq!(gui.document.text_content(button), "Open");

        let clicks = changes(&mut gui, node, "click");
        gui.handle_input(&click(button));
        assert_eq!(clicks.borrow().len(), 1);

        let d = gui.descriptor(node).unwrap();
        d.set(&mut gui, node, "label", &json!("Close"), &[]);
        assert_eq!(gui.document.text_content(button), "Close");
        assert_eq!(gui.document.first_element_child(button), Some(img));
    }

    #[test]
    fn grouped_buttons_share_one_active() {
        let mut gui = Gui::with_defaults();
        let bar = mount(&mut gui, "<gui-button-bar>\
            <gui-button data-group=\"align\">L</gui-button>\
            <gui-button data-group=\"align\">R</gui-button>\
            </gui-button-bar>");
        let buttons: Vec<NodeId> = gui.document.query_selector_all(bar, "button");
        gui.handle_input(&click(buttons[0]));
        gui.handle_input(&click(buttons[1]));
        assert!(!gui.document.has_class(buttons[0], "gui-active"));
        assert!(gui.document.has_class(buttons[1], "gui-active"));
    }

    #[test]
    fn created_button_takes_label_param() {
        let mut gui = Gui::with_defaults();
        let mut params = Params::new();
        params.insert("label".into(), json!("Save"));
        let root = gui.root();
        let button = gui.create("gui-button", &params, Some(root)).unwrap();
        assert!(!gui.document.has_attr(button.node(), "data-label"));
        assert_eq!(gui.document.text_content(button.node()), "Save");
    }

    #[test]
    fn select_options_and_calls() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-select>\
            <gui-select-option data-value=\"a\">A</gui-select-option>\
            <gui-select-option data-value=\"b\" selected=\"selected\">B</gui-select-option>\
            </gui-select>");
        let select = gui.document.child_by_tag(node, "select").unwrap();
        assert!(gui.document.query_selector(node, "gui-select-option").is_none());
        assert_eq!(helpers::get_property(&gui, node, "value"), json!("b"));

        let d = gui.descriptor(node).unwrap();
        d.call(&mut gui, node, ElementCall::Add(EntrySet::Single(Entry::new("c", "c").with_label("C")))).unwrap();
        assert_eq!(gui.document.element_children(select).len(), 3);
        d.call(&mut gui, node, ElementCall::Remove(RemoveTarget::Key { key: "value".into(), value: "a".into() })).unwrap();
        assert_eq!(gui.document.text_content(select), "BC");

        let seen = changes(&mut gui, node, "change");
        gui.handle_input(&UiEvent::Input { target: select, value: json!("c") });
        assert_eq!(helpers::get_property(&gui, node, "value"), json!("c"));
        assert_eq!(*seen.borrow(), [EventDetail::Value(json!("c"))]);

        d.call(&mut gui, node, ElementCall::Clear).unwrap();
        assert!(gui.document.element_children(select).is_empty());
    }

    #[test]
    fn select_list_is_sized_and_multiple() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-select-list data-multiple=\"true\" data-size=\"5\"></gui-select-list>");
        let select = gui.document.child_by_tag(node, "select").unwrap();
        assert_eq!(gui.document.attr(select, "size"), Some("5"));
        assert_eq!(gui.document.attr(select, "multiple"), Some("multiple"));
    }

    #[test]
    fn slider_value_is_an_integer() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-slider data-min=\"0\" data-max=\"10\" data-value=\"4\"></gui-slider>");
        let d = gui.descriptor(node).unwrap();
        assert_eq!(d.get(&gui, node, "value"), Some(json!(4)));
        let input = gui.document.query_selector(node, "input").unwrap();
        assert_eq!(gui.document.attr(input, "role"), Some("slider"));
        gui.handle_input(&UiEvent::Input { target: input, value: json!("7") });
        assert_eq!(d.get(&gui, node, "value"), Some(json!(7)));
    }

    #[test]
    fn label_reads_text_and_updates() {
        let mut gui = Gui::with_defaults();
        let node = mount(&mut gui, "<gui-label>Hello</gui-label>");
        assert_eq!(gui.document.attr(node, "data-label"), Some("Hello"));
        assert_eq!(gui.document.attr(node, "role"), Some("heading"));
        let d = gui.descriptor(node).unwrap();
        d.set(&mut gui, node, "value", &json!("Bye"), &[]);
        assert_eq!(gui.document.text_content(node), "Bye");
    }
}
