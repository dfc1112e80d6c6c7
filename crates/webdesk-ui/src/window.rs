//! Windows as the scheme renderer sees them.
//!
//! The window manager proper lives outside this crate. What the runtime
//! needs is a content root to render into, the owning application's
//! resource root, and a place to put the sizing and permission
//! attributes a fragment declares.

use crate::dom::NodeId;
use crate::error::GuiError;
use crate::gui::Gui;

/// Something that owns runtime resources and must release them.
pub trait Destroyable {
    fn destroy(&mut self, gui: &mut Gui);
}

/// Something that materializes its nodes on demand.
pub trait Initable {
    fn init(&mut self, gui: &mut Gui) -> Result<NodeId, GuiError>;
}

/// The application a window belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub name: String,
    pub resource_root: String,
}

impl AppContext {
    pub fn new(name: impl Into<String>, resource_root: impl Into<String>) -> Self {
        Self { name: name.into(), resource_root: resource_root.into() }
    }

    /// URL of a file shipped with the application.
    pub fn resource(&self, path: &str) -> String {
        format!("{}/{}", self.resource_root.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowProperties {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub allow_maximize: Option<bool>,
    pub allow_minimize: Option<bool>,
    pub allow_close: Option<bool>,
    pub allow_resize: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Window {
    pub id: u32,
    pub title: String,
    pub app: Option<AppContext>,
    /// Set when the window was recreated from a saved session; rendering
    /// then keeps the saved geometry instead of the fragment's.
    pub restored: bool,
    pub properties: WindowProperties,
    root: Option<NodeId>,
}

impl Window {
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            app: None,
            restored: false,
            properties: WindowProperties::default(),
            root: None,
        }
    }

    pub fn with_app(mut self, app: AppContext) -> Self {
        self.app = Some(app);
        self
    }

    /// Content root; `None` until [`Initable::init`] ran.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }
}

impl Initable for Window {
    fn init(&mut self, gui: &mut Gui) -> Result<NodeId, GuiError> {
        if let Some(root) = self.root.filter(|&r| gui.document.contains(r)) {
            return Ok(root);
        }
        let root = gui.document.create_element("application-window-content");
        gui.document.set_attr(root, "data-window-id", self.id.to_string());
        let body = gui.root();
        gui.document.append_child(body, root);
        self.root = Some(root);
        log::debug!("window {} initialized", self.id);
        Ok(root)
    }
}

impl Destroyable for Window {
    fn destroy(&mut self, gui: &mut Gui) {
        if let Some(root) = self.root.take() {
            gui.remove_node(root);
        }
    }
}
