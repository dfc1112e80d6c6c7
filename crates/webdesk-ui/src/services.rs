//! Collaborators the runtime consumes but does not implement.
//!
//! Everything here is injected through [`Services`], which the [`Gui`]
//! owns. Defaults are in-memory or logging stand-ins so a runtime can be
//! constructed without a desktop shell around it.
//!
//! [`Gui`]: crate::gui::Gui

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GuiError;
use crate::vfs::{FileEntry, NullVfs, Vfs};
use crate::window::AppContext;

// ── Translator ────────────────────────────────────────────────────────────

pub trait Translator {
    fn translate(&self, key: &str, args: &[&str]) -> String;
}

/// Returns the key itself, substituting `%s` placeholders in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, key: &str, args: &[&str]) -> String {
        let mut out = key.to_string();
        for arg in args {
            match out.find("%s") {
                Some(i) => out.replace_range(i..i + 2, arg),
                None => break,
            }
        }
        out
    }
}

// ── Icons ─────────────────────────────────────────────────────────────────

pub trait IconResolver {
    /// Resolves a theme icon name (`places/folder.png`) at a size (`16x16`).
    /// Names starting with `./` are application resources.
    fn resolve_icon(&self, name: &str, size: &str, app: Option<&AppContext>) -> String;

    fn file_icon(&self, file: &FileEntry, size: &str) -> String {
        let name = if file.is_dir() {
            "places/folder.png".to_string()
        } else if file.mime.is_empty() {
            "mimetypes/gnome-fs-regular.png".to_string()
        } else {
            format!("mimetypes/{}.png", file.mime.replace('/', "-"))
        };
        self.resolve_icon(&name, size, None)
    }
}

#[derive(Debug, Clone)]
pub struct StockIcons {
    pub theme: String,
}

impl Default for StockIcons {
    fn default() -> Self {
        Self { theme: "default".into() }
    }
}

impl IconResolver for StockIcons {
    fn resolve_icon(&self, name: &str, size: &str, app: Option<&AppContext>) -> String {
        if let (Some(app), Some(rel)) = (app, name.strip_prefix("./")) {
            return app.resource(rel);
        }
        format!("/themes/icons/{}/{}/{}", self.theme, size, name.trim_start_matches('/'))
    }
}

// ── Settings ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

pub type SettingsWatcher = Rc<dyn Fn(&Value)>;

/// Namespaced settings store. Values are JSON objects per namespace.
pub trait Settings {
    /// The namespace object, or `Value::Null` when nothing is stored.
    fn get(&self, namespace: &str) -> Value;
    fn set(&self, namespace: &str, key: &str, value: Value, persist: bool);
    fn watch(&self, namespace: &str, on_change: SettingsWatcher) -> WatchId;
    fn unwatch(&self, id: WatchId);
}

/// Settings kept in memory. `persist` requests are counted so tests and
/// hosts can tell when a save would have happened.
#[derive(Default)]
pub struct MemorySettings {
    store: RefCell<HashMap<String, Map<String, Value>>>,
    watchers: RefCell<Vec<(WatchId, String, SettingsWatcher)>>,
    next_watch: Cell<u64>,
    saves: Cell<usize>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a namespace. Builder-style for setup code.
    pub fn with(self, namespace: &str, value: Value) -> Self {
        if let Value::Object(map) = value {
            self.store.borrow_mut().insert(namespace.to_string(), map);
        }
        self
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

impl Settings for MemorySettings {
    fn get(&self, namespace: &str) -> Value {
        self.store.borrow().get(namespace).cloned().map(Value::Object).unwrap_or(Value::Null)
    }

    fn set(&self, namespace: &str, key: &str, value: Value, persist: bool) {
        let snapshot = {
            let mut store = self.store.borrow_mut();
            let ns = store.entry(namespace.to_string()).or_default();
            ns.insert(key.to_string(), value);
            Value::Object(ns.clone())
        };
        if persist {
            self.saves.set(self.saves.get() + 1);
        }
        let watchers: Vec<SettingsWatcher> = self.watchers.borrow()
            .iter()
            .filter(|(_, ns, _)| ns == namespace)
            .map(|(_, _, w)| w.clone())
            .collect();
        for w in watchers {
            w(&snapshot);
        }
    }

    fn watch(&self, namespace: &str, on_change: SettingsWatcher) -> WatchId {
        let id = WatchId(self.next_watch.get());
        self.next_watch.set(id.0 + 1);
        self.watchers.borrow_mut().push((id, namespace.to_string(), on_change));
        id
    }

    fn unwatch(&self, id: WatchId) {
        self.watchers.borrow_mut().retain(|(w, _, _)| *w != id);
    }
}

// ── Clipboard ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClipboardData {
    #[default]
    Empty,
    Text(String),
    Files(Vec<FileRef>),
}

pub trait Clipboard {
    fn set_clipboard(&self, data: ClipboardData);
    fn get_clipboard(&self) -> ClipboardData;
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    data: RefCell<ClipboardData>,
}

impl Clipboard for MemoryClipboard {
    fn set_clipboard(&self, data: ClipboardData) {
        *self.data.borrow_mut() = data;
    }

    fn get_clipboard(&self) -> ClipboardData {
        self.data.borrow().clone()
    }
}

/// The operating system clipboard. File references are written as one
/// path per line, which is what file managers accept on paste.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_clipboard(&self, data: ClipboardData) {
        let text = match data {
            ClipboardData::Empty => String::new(),
            ClipboardData::Text(t) => t,
            ClipboardData::Files(files) => {
                files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>().join("\n")
            }
        };
        let result = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text));
        if let Err(e) = result {
            log::warn!("clipboard write failed: {}", e);
        }
    }

    fn get_clipboard(&self) -> ClipboardData {
        match arboard::Clipboard::new().and_then(|mut cb| cb.get_text()) {
            Ok(text) if !text.is_empty() => ClipboardData::Text(text),
            Ok(_) => ClipboardData::Empty,
            Err(e) => {
                log::debug!("clipboard read failed: {}", e);
                ClipboardData::Empty
            }
        }
    }
}

// ── Resources ─────────────────────────────────────────────────────────────

/// Fetches scheme files and external fragments.
#[async_trait(?Send)]
pub trait ResourceLoader {
    async fn fetch(&self, url: &str) -> Result<String, GuiError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoader;

#[async_trait(?Send)]
impl ResourceLoader for NoLoader {
    async fn fetch(&self, url: &str) -> Result<String, GuiError> {
        Err(GuiError::Fetch { url: url.to_string(), message: "no resource loader configured".into() })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// The single sink for user-visible failures.
pub trait ErrorPresenter {
    fn present_error(&self, title: &str, message: &str, cause: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorPresenter;

impl ErrorPresenter for LogErrorPresenter {
    fn present_error(&self, title: &str, message: &str, cause: &str) {
        log::error!("{}: {} ({})", title, message, cause);
    }
}

// ── Services ──────────────────────────────────────────────────────────────

/// Bundle of collaborators handed to the runtime.
#[derive(Clone)]
pub struct Services {
    pub translator: Rc<dyn Translator>,
    pub icons: Rc<dyn IconResolver>,
    pub settings: Rc<dyn Settings>,
    pub clipboard: Rc<dyn Clipboard>,
    pub vfs: Rc<dyn Vfs>,
    pub loader: Rc<dyn ResourceLoader>,
    pub errors: Rc<dyn ErrorPresenter>,
}

impl Services {
    pub fn new() -> Self {
        Self {
            translator: Rc::new(IdentityTranslator),
            icons: Rc::new(StockIcons::default()),
            settings: Rc::new(MemorySettings::new()),
            clipboard: Rc::new(MemoryClipboard::default()),
            vfs: Rc::new(NullVfs),
            loader: Rc::new(NoLoader),
            errors: Rc::new(LogErrorPresenter),
        }
    }

    pub fn with_translator(mut self, t: Rc<dyn Translator>) -> Self {
        self.translator = t;
        self
    }

    pub fn with_icons(mut self, icons: Rc<dyn IconResolver>) -> Self {
        self.icons = icons;
        self
    }

    pub fn with_settings(mut self, settings: Rc<dyn Settings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Rc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_vfs(mut self, vfs: Rc<dyn Vfs>) -> Self {
        self.vfs = vfs;
        self
    }

    pub fn with_loader(mut self, loader: Rc<dyn ResourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_errors(mut self, errors: Rc<dyn ErrorPresenter>) -> Self {
        self.errors = errors;
        self
    }

    pub fn translate(&self, key: &str) -> String {
        self.translator.translate(key, &[])
    }

    /// Reads `namespace.key` from settings.
    pub fn setting(&self, namespace: &str, key: &str) -> Value {
        self.settings.get(namespace).get(key).cloned().unwrap_or(Value::Null)
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_translator_formats() {
        assert_eq!(IdentityTranslator.translate("Open %s in %s", &["a", "b"]), "Open a in b");
        assert_eq!(IdentityTranslator.translate("LBL_SIZE", &[]), "LBL_SIZE");
    }

    #[test]
    fn settings_notify_watchers_of_their_namespace() {
        let settings = MemorySettings::new().with("VFS", json!({"scandir": {}}));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = settings.watch("VFS", Rc::new(move |v: &Value| sink.borrow_mut().push(v.clone())));
        settings.set("VFS", "x", json!(1), true);
        settings.set("Other", "y", json!(2), false);
        settings.unwatch(id);
        settings.set("VFS", "x", json!(3), false);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0]["x"], json!(1));
        assert_eq!(settings.saves(), 1);
        assert_eq!(settings.get("VFS")["x"], json!(3));
    }

    #[test]
    fn stock_icons() {
        let icons = StockIcons::default();
        assert_eq!(icons.resolve_icon("places/folder.png", "16x16", None), "/themes/icons/default/16x16/places/folder.png");
        assert_eq!(
            icons.file_icon(&FileEntry::file("home:///a.txt", 1, "text/plain"), "32x32"),
            "/themes/icons/default/32x32/mimetypes/text-plain.png",
        );
    }
}
