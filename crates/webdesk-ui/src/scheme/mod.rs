//! Schemes: HTML documents of named window and fragment templates.
//!
//! A scheme is loaded once into its own detached [`Document`]. Rendering
//! imports a copy of one template into the live document, runs the parse
//! passes over it, and moves the result under a window's content root.
//!
//! ```text
//! <application-window data-id="main" data-width="400">
//!   <gui-fragment data-fragment-id="toolbar"></gui-fragment>
//!   <gui-file-view data-id="files"></gui-file-view>
//! </application-window>
//! <application-fragment data-id="toolbar">
//!   <gui-button data-id="up">Up</gui-button>
//! </application-fragment>
//! ```

mod parse;

pub use parse::{is_layout_tag, parse_node, resolve_fragments, ParseArgs, ParseHook, MAX_FRAGMENT_PASSES};

use std::rc::Rc;

use crate::dom::{Document, NodeId};
use crate::error::{GuiError, Result};
use crate::gui::Gui;
use crate::handle::Instance;
use crate::registry::Params;
use crate::services::ResourceLoader;
use crate::window::{Initable, Window};

/// Called with the content root after every render.
pub type RenderTrigger = Rc<dyn Fn(&mut Gui, NodeId)>;

const EXTERNAL_SELECTOR: &str = "gui-fragment[data-fragment-external]";

pub struct Scheme {
    url: String,
    doc: Document,
    /// Detached wrapper holding the loaded templates.
    root: Option<NodeId>,
    triggers: Vec<RenderTrigger>,
}

impl Scheme {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), doc: Document::new(), root: None, triggers: Vec::new() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_loaded(&self) -> bool {
        self.root.is_some()
    }

    /// Replaces the templates with `html`.
    pub fn load_string(&mut self, html: &str) -> Result<()> {
        let (doc, root) = parse_document(html)?;
        self.doc = doc;
        self.root = Some(root);
        log::debug!("scheme {} loaded ({} nodes)", self.url, self.doc.len());
        Ok(())
    }

    /// Fetches the scheme, splices in external fragments, and loads the
    /// result. Returns the resolved HTML.
    ///
    /// External fragments are resolved one level deep relative to the
    /// scheme's own URL. A fragment that fails to fetch or parse is
    /// skipped with a warning.
    pub async fn load(&mut self, loader: &dyn ResourceLoader) -> Result<String> {
        let html = loader.fetch(&self.url).await?;
        let (mut doc, root) = parse_document(&html)?;

        for placeholder in doc.query_selector_all(root, EXTERNAL_SELECTOR) {
            let uri = doc.attr(placeholder, "data-fragment-external").unwrap_or_default();
            let uri = uri.strip_prefix('/').unwrap_or(uri).to_string();
            if uri.len() < 3 {
                log::warn!("invalid external fragment {:?} in {}", uri, self.url);
                continue;
            }

            let url = join_url(&self.url, &uri);
            let nodes = match loader.fetch(&url).await {
                Ok(src) => parse_markup(&src),
                Err(e) => Err(e),
            };
            match nodes {
                Ok(markup) => {
                    let Some(parent) = doc.parent(placeholder) else { continue };
                    for n in doc.append_markup(None, &markup.nodes) {
                        doc.insert_before(parent, n, Some(placeholder));
                    }
                    doc.remove(placeholder);
                }
                Err(e) => log::warn!("skipping external fragment {}: {}", url, e),
            }
        }

        let resolved = doc.inner_html(root);
        self.doc = doc;
        self.root = Some(root);
        log::debug!("scheme {} loaded", self.url);
        Ok(resolved)
    }

    /// The template `kind[data-id=id]`. Without a kind, windows are
    /// searched before fragments.
    pub fn get_fragment(&self, id: &str, kind: Option<&str>) -> Option<NodeId> {
        let root = self.root?;
        let find = |tag: &str| {
            self.doc
                .descendants(root)
                .into_iter()
                .find(|&n| self.doc.tag(n) == Some(tag) && self.doc.attr(n, "data-id") == Some(id))
        };
        match kind {
            Some(kind) => find(kind),
            None => find("application-window").or_else(|| find("application-fragment")),
        }
    }

    /// Imports a copy of template `id` into the live document and parses
    /// it. The copy is returned detached.
    pub fn parse(&self, gui: &mut Gui, id: &str, kind: Option<&str>, window: Option<&Window>, args: &ParseArgs) -> Option<NodeId> {
        let Some(template) = self.get_fragment(id, kind) else {
            log::error!("template {:?} not found in {}", id, self.url);
            return None;
        };
        let copy = gui.document.import(&self.doc, template)?;
        parse_node(gui, Some(self), copy, window, args);
        Some(copy)
    }

    /// Renders template `id` into `root` (the window's content root when
    /// `None`) and fires the render triggers.
    pub fn render(
        &self,
        gui: &mut Gui,
        window: &mut Window,
        id: &str,
        root: Option<NodeId>,
        kind: Option<&str>,
        args: &ParseArgs,
    ) -> Result<NodeId> {
        let root = match root {
            Some(r) => r,
            None => window.init(gui)?,
        };
        let content = self
            .parse(gui, id, kind, Some(&*window), args)
            .ok_or_else(|| GuiError::not_found(format!("template {:?}", id)))?;

        gui.document.move_children(content, root);
        gui.remove_node(content);
        for stray in gui.document.query_selector_all(root, "application-fragment") {
            gui.remove_node(stray);
        }

        if !window.restored {
            if let Some(template) = self.get_fragment(id, kind) {
                self.apply_window_properties(template, window);
            }
        }

        for trigger in self.triggers.clone() {
            trigger(gui, root);
        }
        gui.dispatch();
        log::debug!("rendered {:?} into window {}", id, window.id);
        Ok(root)
    }

    fn apply_window_properties(&self, template: NodeId, window: &mut Window) {
        let size = |name: &str| self.doc.attr(template, name).and_then(|v| v.parse::<f32>().ok()).filter(|v| *v > 0.0);
        let flag = |name: &str| match self.doc.attr(template, name) {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };
        let props = &mut window.properties;
        props.width = size("data-width").or(props.width);
        props.height = size("data-height").or(props.height);
        props.allow_maximize = flag("data-allow_maximize").or(props.allow_maximize);
        props.allow_minimize = flag("data-allow_minimize").or(props.allow_minimize);
        props.allow_close = flag("data-allow_close").or(props.allow_close);
        props.allow_resize = flag("data-allow_resize").or(props.allow_resize);
    }

    /// Registers a render trigger. `render` is the only event schemes emit.
    pub fn on(&mut self, event: &str, trigger: impl Fn(&mut Gui, NodeId) + 'static) {
        if event == "render" {
            self.triggers.push(Rc::new(trigger));
        } else {
            log::warn!("schemes do not emit {:?}", event);
        }
    }

    /// Creates a widget under `parent`, or the window's content root.
    pub fn create(&self, gui: &mut Gui, window: &mut Window, tag: &str, params: &Params, parent: Option<NodeId>) -> Result<Instance> {
        let parent = match parent {
            Some(p) => p,
            None => window.init(gui)?,
        };
        gui.create(tag, params, Some(parent))
    }

    /// The widget with `data-id` = `id` inside `root` (or the window).
    pub fn find(&self, gui: &Gui, window: &Window, id: &str, root: Option<NodeId>) -> Option<Instance> {
        self.find_dom(gui, window, id, root).map(|n| Instance::of(gui, n))
    }

    pub fn find_by_query(&self, gui: &Gui, window: &Window, query: &str, root: Option<NodeId>) -> Option<Instance> {
        let root = root.or_else(|| window.root())?;
        gui.document.query_selector(root, query).map(|n| Instance::of(gui, n))
    }

    pub fn find_all_by_query(&self, gui: &Gui, window: &Window, query: &str, root: Option<NodeId>) -> Vec<Instance> {
        let Some(root) = root.or_else(|| window.root()) else { return Vec::new() };
        gui.document
            .query_selector_all(root, query)
            .into_iter()
            .map(|n| Instance::of(gui, n))
            .collect()
    }

    pub fn find_dom(&self, gui: &Gui, window: &Window, id: &str, root: Option<NodeId>) -> Option<NodeId> {
        let root = root.or_else(|| window.root())?;
        let doc = &gui.document;
        doc.descendants(root).into_iter().find(|&n| doc.attr(n, "data-id") == Some(id))
    }

    pub fn get(&self, gui: &Gui, node: NodeId) -> Instance {
        Instance::of(gui, node)
    }

    /// The loaded templates as HTML.
    pub fn get_html(&self) -> String {
        self.root.map(|r| self.doc.inner_html(r)).unwrap_or_default()
    }

    /// Drops the templates and triggers.
    pub fn destroy(&mut self) {
        self.doc = Document::new();
        self.root = None;
        self.triggers.clear();
    }
}

/// The shared scheme for system dialogs, loaded on first use.
#[derive(Default)]
pub struct DialogScheme {
    scheme: Option<Scheme>,
}

impl DialogScheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `url` unless a scheme is already held. A failed load is
    /// logged and leaves an empty scheme behind, so it is not retried.
    pub async fn init(&mut self, loader: &dyn ResourceLoader, url: &str) -> &Scheme {
        if self.scheme.is_none() {
            let mut scheme = Scheme::new(url);
            if let Err(e) = scheme.load(loader).await {
                log::warn!("failed to load dialog scheme {}: {}", url, e);
            }
            self.scheme = Some(scheme);
        }
        self.scheme.get_or_insert_with(|| Scheme::new(url))
    }

    pub fn get(&self) -> Option<&Scheme> {
        self.scheme.as_ref()
    }

    pub fn destroy(&mut self) {
        if let Some(mut scheme) = self.scheme.take() {
            scheme.destroy();
        }
    }
}

fn parse_markup(html: &str) -> Result<webdesk_markup::Markup> {
    Ok(webdesk_markup::parse_str(&webdesk_markup::normalize_self_closing(html))?)
}

fn parse_document(html: &str) -> Result<(Document, NodeId)> {
    let markup = parse_markup(html)?;
    let mut doc = Document::new();
    let root = doc.create_element("div");
    doc.append_markup(Some(root), &markup.nodes);
    Ok((doc, root))
}

/// `uri` relative to the directory of `base`.
fn join_url(base: &str, uri: &str) -> String {
    match base.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, uri),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests;
