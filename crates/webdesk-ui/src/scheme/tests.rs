use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use super::*;
use crate::error::GuiError;
use crate::registry::{ElementDescriptor, ElementRegistry};
use crate::services::{Services, Translator};
use crate::window::AppContext;

const MAIN: &str = r#"
<application-window data-id="main" data-width="400" data-height="300" data-allow_resize="false">
  <gui-vbox>
    <gui-fragment data-fragment-id="bar"></gui-fragment>
    <gui-label data-id="status">Ready</gui-label>
  </gui-vbox>
</application-window>
<application-fragment data-id="bar">
  <gui-button data-id="up">Up</gui-button>
  <gui-button data-id="home" data-icon="stock://16x16/home.png">Home</gui-button>
</application-fragment>
"#;

fn loaded(html: &str) -> Scheme {
    let mut scheme = Scheme::new("/apps/test/scheme.html");
    scheme.load_string(html).unwrap();
    scheme
}

fn ids(gui: &Gui, root: NodeId) -> Vec<String> {
    gui.document
        .descendants(root)
        .into_iter()
        .filter_map(|n| gui.document.attr(n, "data-id").map(str::to_string))
        .collect()
}

#[test]
fn renders_window_with_fragments_in_place() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(MAIN);

    let root = scheme.render(&mut gui, &mut window, "main", None, None, &ParseArgs::default()).unwrap();

    assert_eq!(Some(root), window.root());
    assert_eq!(ids(&gui, root), ["up", "home", "status"]);
    assert!(gui.document.query_selector(root, "gui-fragment").is_none());

    let up = scheme.find_dom(&gui, &window, "up", None).unwrap();
    assert!(gui.is_built(up));
    assert!(gui.document.has_class(up, "gui-element"));
    let vbox = gui.document.query_selector(root, "gui-vbox").unwrap();
    assert!(!gui.document.has_class(vbox, "gui-element"));
}

#[test]
fn window_properties_follow_template_unless_restored() {
    let mut gui = Gui::with_defaults();
    let scheme = loaded(MAIN);

    let mut fresh = Window::new(1, "Fresh");
    scheme.render(&mut gui, &mut fresh, "main", None, None, &ParseArgs::default()).unwrap();
    assert_eq!(fresh.properties.width, Some(400.0));
    assert_eq!(fresh.properties.height, Some(300.0));
    assert_eq!(fresh.properties.allow_resize, Some(false));
    assert_eq!(fresh.properties.allow_close, None);

    let mut restored = Window::new(2, "Restored");
    restored.restored = true;
    restored.properties.width = Some(640.0);
    scheme.render(&mut gui, &mut restored, "main", None, None, &ParseArgs::default()).unwrap();
    assert_eq!(restored.properties.width, Some(640.0));
    assert_eq!(restored.properties.allow_resize, None);
}

#[test]
fn render_triggers_run_with_content_root() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let mut scheme = loaded(MAIN);
    let seen = Rc::new(Cell::new(None));
    let s = seen.clone();
    scheme.on("render", move |_, root| s.set(Some(root)));
    scheme.on("bogus", |_, _| panic!("not a scheme event"));

    let root = scheme.render(&mut gui, &mut window, "main", None, None, &ParseArgs::default()).unwrap();
    assert_eq!(seen.get(), Some(root));
}

#[test]
fn missing_template_is_an_error() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(MAIN);
    let err = scheme.render(&mut gui, &mut window, "nope", None, None, &ParseArgs::default()).unwrap_err();
    assert!(matches!(err, GuiError::NotFound { .. }));
}

#[test]
fn missing_fragment_placeholder_is_dropped() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(
        r#"<application-window data-id="w">
             <gui-fragment data-fragment-id="ghost"></gui-fragment>
             <gui-fragment></gui-fragment>
             <gui-label data-id="after">x</gui-label>
           </application-window>"#,
    );
    let root = scheme.render(&mut gui, &mut window, "w", None, None, &ParseArgs::default()).unwrap();
    assert!(gui.document.query_selector(root, "gui-fragment").is_none());
    assert_eq!(ids(&gui, root), ["after"]);
}

#[test]
fn nested_fragments_resolve() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(
        r#"<application-window data-id="w"><gui-fragment data-fragment-id="outer"></gui-fragment></application-window>
           <application-fragment data-id="outer">
             <gui-hbox data-id="row"><gui-fragment data-fragment-id="inner"></gui-fragment></gui-hbox>
           </application-fragment>
           <application-fragment data-id="inner"><gui-button data-id="deep">Deep</gui-button></application-fragment>"#,
    );
    let root = scheme.render(&mut gui, &mut window, "w", None, None, &ParseArgs::default()).unwrap();
    assert_eq!(ids(&gui, root), ["row", "deep"]);
    let deep = scheme.find_dom(&gui, &window, "deep", None).unwrap();
    assert!(gui.is_built(deep));
}

#[test]
fn self_referencing_fragment_terminates() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(
        r#"<application-window data-id="w"><gui-fragment data-fragment-id="loop"></gui-fragment></application-window>
           <application-fragment data-id="loop">
             <gui-label>x</gui-label><gui-fragment data-fragment-id="loop"></gui-fragment>
           </application-fragment>"#,
    );
    let root = scheme.render(&mut gui, &mut window, "w", None, None, &ParseArgs::default()).unwrap();
    assert!(gui.document.query_selector(root, "gui-fragment").is_none());
    assert_eq!(gui.document.query_selector_all(root, "gui-label").len(), MAX_FRAGMENT_PASSES);
}

#[test]
fn stray_application_fragments_are_removed_from_root() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(
        r#"<application-window data-id="w">
             <gui-label>x</gui-label>
             <application-fragment data-id="inline"><gui-label>y</gui-label></application-fragment>
           </application-window>"#,
    );
    let root = scheme.render(&mut gui, &mut window, "w", None, None, &ParseArgs::default()).unwrap();
    assert!(gui.document.query_selector(root, "application-fragment").is_none());
    assert_eq!(gui.document.text_content(root).trim(), "x");
}

struct Shout;

impl Translator for Shout {
    fn translate(&self, key: &str, _args: &[&str]) -> String {
        key.to_uppercase()
    }
}

#[test]
fn dynamic_pass_translates_and_resolves_resources() {
    let services = Services::new().with_translator(Rc::new(Shout));
    let mut gui = Gui::new(ElementRegistry::with_defaults(), services);
    let mut window = Window::new(1, "Test").with_app(AppContext::new("Demo", "/apps/demo"));
    let scheme = loaded(
        r#"<application-window data-id="w">
             <gui-label data-id="plain">hello</gui-label>
             <gui-label data-id="raw" data-no-translate="true">keep</gui-label>
             <gui-expander data-id="exp" data-label="more"></gui-expander>
             <img data-id="pic" data-src="app://logo.png">
           </application-window>"#,
    );
    scheme.render(&mut gui, &mut window, "w", None, None, &ParseArgs::default()).unwrap();
    let doc = &gui.document;
    let node = |id: &str| scheme.find_dom(&gui, &window, id, None).unwrap();

    assert_eq!(doc.text_content(node("plain")), "HELLO");
    assert_eq!(doc.text_content(node("raw")), "keep");
    assert_eq!(doc.attr(node("exp"), "data-label"), Some("MORE"));
    assert_eq!(doc.attr(node("pic"), "data-src"), Some("/apps/demo/logo.png"));
}

#[test]
fn parse_args_translator_overrides_session() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(r#"<application-window data-id="w"><gui-label data-id="l">quiet</gui-label></application-window>"#);
    let args = ParseArgs { translator: Some(Rc::new(Shout)), ..ParseArgs::default() };
    scheme.render(&mut gui, &mut window, "w", None, None, &args).unwrap();
    let l = scheme.find_dom(&gui, &window, "l", None).unwrap();
    assert_eq!(gui.document.text_content(l), "QUIET");
}

#[test]
fn on_parse_runs_before_build() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(r#"<application-window data-id="w"><gui-button data-id="b">Go</gui-button></application-window>"#);
    let built_at_hook = Rc::new(Cell::new(true));
    let seen = built_at_hook.clone();
    let args = ParseArgs {
        on_parse: Some(Rc::new(move |gui: &mut Gui, node: NodeId| {
            let b = gui.document.query_selector(node, "gui-button").unwrap();
            seen.set(gui.is_built(b));
            gui.document.set_attr(b, "data-disabled", "true");
        })),
        ..ParseArgs::default()
    };
    scheme.render(&mut gui, &mut window, "w", None, None, &args).unwrap();
    assert!(!built_at_hook.get());
    let b = scheme.find_dom(&gui, &window, "b", None).unwrap();
    let button = gui.document.query_selector(b, "button").unwrap();
    assert!(gui.document.has_attr(button, "disabled"));
}

struct Broken;

impl ElementDescriptor for Broken {
    fn build(&self, _gui: &mut Gui, _node: NodeId, _args: &Value) -> Result<()> {
        Err(GuiError::build("gui-broken", "always fails"))
    }
}

#[test]
fn build_failures_do_not_stop_siblings() {
    let mut registry = ElementRegistry::new();
    registry.register("gui-broken", Broken);
    crate::inputs::register(&mut registry);
    let mut gui = Gui::new(registry, Services::new());
    let mut window = Window::new(1, "Test");
    let scheme = loaded(
        r#"<application-window data-id="w">
             <gui-broken data-id="x"></gui-broken><gui-button data-id="b">Go</gui-button>
           </application-window>"#,
    );
    scheme.render(&mut gui, &mut window, "w", None, None, &ParseArgs::default()).unwrap();
    let b = scheme.find_dom(&gui, &window, "b", None).unwrap();
    assert!(gui.is_built(b));
}

#[test]
fn find_helpers_and_create() {
    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let scheme = loaded(MAIN);
    scheme.render(&mut gui, &mut window, "main", None, None, &ParseArgs::default()).unwrap();

    let home = scheme.find(&gui, &window, "home", None).unwrap();
    assert_eq!(gui.document.attr(home.node(), "data-id"), Some("home"));
    assert!(scheme.find(&gui, &window, "nope", None).is_none());
    assert_eq!(scheme.find_all_by_query(&gui, &window, "gui-button", None).len(), 2);
    assert!(scheme.find_by_query(&gui, &window, "gui-label", None).is_some());

    let created = scheme.create(&mut gui, &mut window, "gui-label", &Params::new(), None).unwrap();
    assert_eq!(gui.document.parent(created.node()), window.root());
}

#[test]
fn destroy_drops_templates() {
    let mut scheme = loaded(MAIN);
    assert!(scheme.get_html().contains("application-fragment"));
    scheme.on("render", |_, _| {});
    scheme.destroy();
    assert!(!scheme.is_loaded());
    assert_eq!(scheme.get_html(), "");
    assert!(scheme.get_fragment("main", None).is_none());
}

#[test]
fn get_fragment_prefers_windows() {
    let scheme = loaded(
        r#"<application-fragment data-id="x"><i></i></application-fragment>
           <application-window data-id="x"><b></b></application-window>"#,
    );
    let w = scheme.get_fragment("x", None).unwrap();
    assert_eq!(scheme.doc.tag(w), Some("application-window"));
    let f = scheme.get_fragment("x", Some("application-fragment")).unwrap();
    assert_eq!(scheme.doc.tag(f), Some("application-fragment"));
}

// ── Loading ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct MapLoader {
    files: HashMap<String, String>,
    fetched: RefCell<Vec<String>>,
}

impl MapLoader {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.files.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait(?Send)]
impl ResourceLoader for MapLoader {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetched.borrow_mut().push(url.to_string());
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| GuiError::Fetch { url: url.to_string(), message: "404".into() })
    }
}

#[tokio::test]
async fn load_splices_external_fragments() {
    let loader = MapLoader::default()
        .with(
            "/apps/test/scheme.html",
            r#"<application-window data-id="w">
                 <gui-fragment data-fragment-external="/parts/toolbar.html"></gui-fragment>
                 <gui-fragment data-fragment-external="/x"></gui-fragment>
                 <gui-fragment data-fragment-external="missing.html"></gui-fragment>
               </application-window>"#,
        )
        .with("/apps/test/parts/toolbar.html", r#"<gui-button data-id="ext">Ext</gui-button>"#);

    let mut scheme = Scheme::new("/apps/test/scheme.html");
    let html = scheme.load(&loader).await.unwrap();

    assert!(html.contains(r#"data-id="ext""#));
    assert!(!html.contains("toolbar.html"));
    assert!(html.contains(r#"data-fragment-external="/x""#));
    assert_eq!(
        *loader.fetched.borrow(),
        ["/apps/test/scheme.html", "/apps/test/parts/toolbar.html", "/apps/test/missing.html"]
    );

    let mut gui = Gui::with_defaults();
    let mut window = Window::new(1, "Test");
    let root = scheme.render(&mut gui, &mut window, "w", None, None, &ParseArgs::default()).unwrap();
    assert_eq!(ids(&gui, root), ["ext"]);
}

#[tokio::test]
async fn load_propagates_scheme_fetch_failure() {
    let loader = MapLoader::default();
    let mut scheme = Scheme::new("/nowhere.html");
    assert!(matches!(scheme.load(&loader).await, Err(GuiError::Fetch { .. })));
    assert!(!scheme.is_loaded());
}

#[tokio::test]
async fn dialog_scheme_loads_once() {
    let loader = MapLoader::default().with("/dialogs.html", r#"<application-window data-id="alert"></application-window>"#);
    let mut dialogs = DialogScheme::new();
    assert!(dialogs.get().is_none());

    assert!(dialogs.init(&loader, "/dialogs.html").await.get_fragment("alert", None).is_some());
    dialogs.init(&loader, "/dialogs.html").await;
    assert_eq!(loader.fetched.borrow().len(), 1);

    dialogs.destroy();
    assert!(dialogs.get().is_none());
}
