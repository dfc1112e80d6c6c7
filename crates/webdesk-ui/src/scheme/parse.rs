//! The passes that turn a freshly inserted subtree into live widgets.
//!
//! Order matters: fragments are expanded first so everything they bring
//! in sees the remaining passes, then the generic class, the dynamic
//! attribute pass, the caller's hook, and finally the build pass in
//! registry order.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::dom::NodeId;
use crate::gui::Gui;
use crate::helpers;
use crate::services::Translator;
use crate::window::Window;

use super::Scheme;

/// Fragments may pull in fragments; past this depth the rest are dropped.
pub const MAX_FRAGMENT_PASSES: usize = 32;

/// Layout-only tags that do not get the `gui-element` class.
static LAYOUT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-container|-(h|v)box|-columns?|-rows?|(status|tool)bar|(button|menu)-bar|bar-entry)$")
        .expect("static regex")
});

/// Tags whose text content is a translatable label.
const LABELLED_TAGS: &[&str] = &[
    "gui-label",
    "gui-button",
    "gui-list-view-column",
    "gui-select-option",
    "gui-select-list-option",
];

pub type ParseHook = Rc<dyn Fn(&mut Gui, NodeId)>;

/// Options for [`parse_node`].
#[derive(Clone)]
pub struct ParseArgs {
    /// Expand `gui-fragment` placeholders (needs a scheme).
    pub resolve: bool,
    /// Runs after the dynamic pass, before any widget is built.
    pub on_parse: Option<ParseHook>,
    /// Handed to every descriptor's `build`.
    pub build_args: Value,
    /// Overrides the session translator for labels.
    pub translator: Option<Rc<dyn Translator>>,
}

impl Default for ParseArgs {
    fn default() -> Self {
        Self { resolve: true, on_parse: None, build_args: Value::Null, translator: None }
    }
}

/// Runs every parse pass over the descendants of `node`.
///
/// Build failures are logged and skipped; one broken widget never stops
/// the rest of the subtree from being built.
pub fn parse_node(gui: &mut Gui, scheme: Option<&Scheme>, node: NodeId, window: Option<&Window>, args: &ParseArgs) {
    if args.resolve {
        if let Some(scheme) = scheme {
            resolve_fragments(gui, scheme, node);
        }
    }

    add_generic_class(gui, node);
    parse_dynamic(gui, node, window, args);

    if let Some(hook) = &args.on_parse {
        hook(gui, node);
    }

    build_all(gui, node, &args.build_args);
}

fn placeholders(gui: &Gui, root: NodeId) -> Vec<NodeId> {
    gui.document
        .descendants(root)
        .into_iter()
        .filter(|&n| gui.document.tag(n) == Some("gui-fragment"))
        .collect()
}

/// Replaces each `gui-fragment[data-fragment-id]` with a copy of the
/// children of the scheme's matching `application-fragment`, in place.
pub fn resolve_fragments(gui: &mut Gui, scheme: &Scheme, root: NodeId) {
    for _ in 0..MAX_FRAGMENT_PASSES {
        let found = placeholders(gui, root);
        if found.is_empty() {
            return;
        }
        for placeholder in found {
            if !gui.document.contains(placeholder) {
                continue;
            }
            let id = gui.document.attr(placeholder, "data-fragment-id").map(str::to_string);
            if let (Some(id), Some(parent)) = (id, gui.document.parent(placeholder)) {
                match scheme.get_fragment(&id, Some("application-fragment")) {
                    Some(fragment) => {
                        for &child in scheme.doc.children(fragment) {
                            if let Some(copy) = gui.document.import(&scheme.doc, child) {
                                gui.document.insert_before(parent, copy, Some(placeholder));
                            }
                        }
                    }
                    None => log::warn!("fragment {:?} not found in {}", id, scheme.url()),
                }
            }
            gui.remove_node(placeholder);
        }
    }

    let leftover = placeholders(gui, root);
    if !leftover.is_empty() {
        log::warn!("fragments nested deeper than {} levels in {}; dropping {}", MAX_FRAGMENT_PASSES, scheme.url(), leftover.len());
        for placeholder in leftover {
            gui.remove_node(placeholder);
        }
    }
}

pub fn is_layout_tag(tag: &str) -> bool {
    LAYOUT_TAG.is_match(tag)
}

fn add_generic_class(gui: &mut Gui, root: NodeId) {
    for n in gui.document.descendants(root) {
        let widget = gui.document.tag(n).is_some_and(|t| t.starts_with("gui-") && !is_layout_tag(t));
        if widget {
            gui.document.add_class(n, "gui-element");
        }
    }
}

fn parse_dynamic(gui: &mut Gui, root: NodeId, window: Option<&Window>, args: &ParseArgs) {
    let translator = args.translator.clone().unwrap_or_else(|| gui.services().translator.clone());
    let app = window.and_then(|w| w.app.as_ref());

    for n in gui.document.descendants(root) {
        if let Some(label) = gui.document.attr(n, "data-label") {
            let translated = translator.translate(label, &[]);
            gui.document.set_attr(n, "data-label", translated);
        }

        let labelled = gui.document.tag(n).is_some_and(|t| LABELLED_TAGS.contains(&t));
        if labelled && gui.document.element_children(n).is_empty() && !gui.document.has_attr(n, "data-no-translate") {
            let label = helpers::get_value_label(&mut gui.document, n, false);
            if !label.is_empty() {
                let text = gui.document.create_text(translator.translate(&label, &[]));
                gui.document.append_child(n, text);
            }
        }

        if gui.document.has_attr(n, "data-icon") {
            if let Some(icon) = helpers::get_icon(gui, n, app) {
                gui.document.set_attr(n, "data-icon", icon);
            }
        }

        if let Some(app) = app {
            let resource = gui
                .document
                .attr(n, "data-src")
                .and_then(|src| src.strip_prefix("app://"))
                .map(|rest| app.resource(rest));
            if let Some(resource) = resource {
                gui.document.set_attr(n, "data-src", resource);
            }
        }
    }
}

fn build_all(gui: &mut Gui, root: NodeId, args: &Value) {
    let tags: Vec<String> = gui.registry().tags().map(str::to_string).collect();
    for tag in &tags {
        let found: Vec<NodeId> = gui
            .document
            .descendants(root)
            .into_iter()
            .filter(|&n| gui.document.tag(n) == Some(tag.as_str()))
            .collect();
        for n in found {
            if !gui.document.contains(n) || gui.is_built(n) {
                continue;
            }
            if let Err(e) = gui.build_element(n, args) {
                log::warn!("{}", e);
            }
        }
    }
}
