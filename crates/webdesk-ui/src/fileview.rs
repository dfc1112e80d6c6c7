//! `gui-file-view`: a DataView bound to a directory of the VFS.
//!
//! The file view owns one child view (list, tree or icon, picked by
//! `data-type`) and fills it from `Vfs::scandir`. Navigation is async and
//! debounced: every `chdir` bumps a per-view generation, sleeps, and only
//! the newest call scans and applies its listing.

use std::rc::Rc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::dataview::{self, ViewKind};
use crate::dom::NodeId;
use crate::entry::{Column, Entry, EntrySet};
use crate::error::{GuiError, Result};
use crate::event::{EventDetail, GuiEvent};
use crate::gui::{Gui, SharedGui, Task};
use crate::helpers;
use crate::registry::{ElementCall, ElementDescriptor, ElementRegistry, Params};
use crate::vfs::{self, FileEntry, FileType, ScanOptions};
use crate::views::ListView;

const DEBOUNCE: Duration = Duration::from_millis(50);
const DEFAULT_PATH: &str = "home:///";
const DEFAULT_COLUMNS: &[&str] = &["filename", "mime", "size"];
const FORWARDED: &[&str] = &["select", "activate", "contextmenu", "expand"];

pub const SHOW_HIDDEN_FILES: &str = "showHiddenFiles";
pub const SHOW_FILE_EXTENSIONS: &str = "showFileExtensions";

/// Navigation state of one file view.
#[derive(Debug, Clone, Default)]
pub struct FileViewState {
    generation: u64,
    child: Option<NodeId>,
}

/// Totals of an applied listing. `..` is not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub size: u64,
    pub directories: usize,
    pub files: usize,
    pub hidden: usize,
}

impl ScanSummary {
    fn of(files: &[FileEntry]) -> Self {
        let mut summary = Self::default();
        for f in files.iter().filter(|f| f.filename != "..") {
            if f.is_dir() {
                summary.directories += 1;
            } else {
                summary.files += 1;
                summary.size += f.size;
            }
            if f.is_hidden() {
                summary.hidden += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChdirOutcome {
    Applied(ScanSummary),
    /// A newer `chdir` on the same view took over.
    Superseded,
}

/// An entry of the file view's own context menu.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub title: String,
    pub checked: bool,
    pub setting: &'static str,
}

pub fn register(reg: &mut ElementRegistry) {
    reg.register("gui-file-view", FileView);
}

/// The child view of `view`, if it is still alive.
pub fn child(gui: &Gui, view: NodeId) -> Option<NodeId> {
    gui.file_views
        .get(view)
        .and_then(|s| s.child)
        .filter(|&c| gui.document.contains(c))
}

fn child_kind(gui: &Gui, view: NodeId) -> Option<(NodeId, ViewKind)> {
    let child = child(gui, view)?;
    Some((child, dataview::kind(gui, child)?))
}

fn view_type(gui: &Gui, view: NodeId) -> String {
    let raw = gui.document.attr(view, "data-type").unwrap_or("list-view");
    if raw.starts_with("gui-") { raw.to_string() } else { format!("gui-{raw}") }
}

fn build_child(gui: &mut Gui, view: NodeId) -> Result<NodeId> {
    let tag = view_type(gui, view);
    let mut params = Params::new();
    params.insert("draggable".into(), Value::Bool(true));
    params.insert("draggable-type".into(), Value::String("file".into()));
    for flag in ["multiple", "single-click"] {
        if let Some(v) = gui.document.attr(view, &format!("data-{flag}")) {
            params.insert(flag.into(), helpers::attr_to_value(v));
        }
    }
    let child = helpers::create_element(&mut gui.document, &tag, &params);
    let first = gui.document.children(view).first().copied();
    gui.document.insert_before(view, child, first);
    gui.build_element(child, &Value::Null)?;
    if dataview::kind(gui, child).is_none() {
        gui.remove_node(child);
        return Err(GuiError::build("gui-file-view", format!("`{tag}` is not a data view")));
    }

    for &name in FORWARDED {
        gui.listen(child, name, Rc::new(move |gui: &mut Gui, ev: &GuiEvent| {
            gui.emit(view, name, ev.detail.clone());
        }));
    }
    gui.listen(child, "expand", Rc::new(move |gui: &mut Gui, ev: &GuiEvent| {
        on_child_expand(gui, view, ev);
    }));

    if let Some(state) = gui.file_views.get_mut(view) {
        state.child = Some(child);
    }
    log::debug!("file view child <{}> built", tag);
    Ok(child)
}

/// First expansion of a directory entry schedules a scan of that path.
fn on_child_expand(gui: &mut Gui, view: NodeId, ev: &GuiEvent) {
    let EventDetail::Expand { element, expanded: true, .. } = &ev.detail else { return };
    let entry = *element;
    if helpers::is_true(gui.document.attr(entry, "data-was-rendered")) {
        return;
    }
    let data = helpers::get_view_node_value(&gui.document, entry);
    let Ok(file) = serde_json::from_value::<FileEntry>(data) else { return };
    if !file.is_dir() || file.filename == ".." {
        return;
    }
    gui.document.set_attr(entry, "data-was-rendered", "true");
    gui.queue_task(Task::Expand { view, entry, path: file.path });
}

// ── Listing options ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct ListingOptions {
    scan: ScanOptions,
    columns: Vec<&'static str>,
    mime_mapping: Map<String, Value>,
}

fn flag(gui: &Gui, view: NodeId, attr: &str, setting: &str) -> bool {
    match gui.document.attr(view, attr) {
        Some(v) => v == "true",
        None => gui.services().setting("VFS", "scandir").get(setting).and_then(Value::as_bool).unwrap_or(false),
    }
}

fn listing_options(gui: &Gui, view: NodeId, backlink: bool) -> ListingOptions {
    let mime_filter = gui.document
        .attr(view, "data-filter")
        .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
        .unwrap_or_default();
    let scan = ScanOptions {
        show_dot_files: flag(gui, view, "data-dotfiles", SHOW_HIDDEN_FILES),
        show_file_extensions: flag(gui, view, "data-extensions", SHOW_FILE_EXTENSIONS),
        mime_filter,
        type_filter: gui.document.attr(view, "data-filetype").and_then(FileType::parse),
        backlink,
    };

    let configured: Option<Vec<String>> = if helpers::is_true(gui.document.attr(view, "data-defaultcolumns")) {
        None
    } else {
        serde_json::from_value(gui.services().setting("VFS", "scandir").get("columns").cloned().unwrap_or(Value::Null)).ok()
    };
    let columns = match configured {
        Some(names) => names.iter().filter_map(|n| column_key(n)).collect(),
        None => DEFAULT_COLUMNS.to_vec(),
    };

    let mime_mapping = gui.services()
        .setting("MIME", "mapping")
        .as_object()
        .cloned()
        .unwrap_or_default();
    ListingOptions { scan, columns, mime_mapping }
}

fn column_key(name: &str) -> Option<&'static str> {
    ["filename", "mime", "mtime", "ctime", "size"].into_iter().find(|k| *k == name)
}

fn column_header(key: &str) -> (&'static str, &'static str) {
    match key {
        "mime" => ("LBL_MIME", "100px"),
        "mtime" => ("LBL_MODIFIED", "160px"),
        "ctime" => ("LBL_CREATED", "160px"),
        "size" => ("LBL_SIZE", "120px"),
        _ => ("LBL_FILENAME", "-"),
    }
}

fn header_columns(gui: &Gui, keys: &[&str]) -> Vec<Column> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            let (label, size) = column_header(key);
            Column {
                label: gui.services().translate(label),
                size: Some(size.to_string()),
                resizable: i > 0,
                ..Column::default()
            }
            .align(if i == 0 { "left" } else { "right" })
        })
        .collect()
}

// ── Entries ───────────────────────────────────────────────────────────────

fn display_name(file: &FileEntry, options: &ListingOptions) -> String {
    if options.scan.show_file_extensions || file.is_dir() {
        return file.filename.clone();
    }
    match vfs::extension(&file.filename) {
        Some(ext) if options.mime_mapping.contains_key(&ext) => {
            file.filename[..file.filename.len() - ext.len()].to_string()
        }
        _ => file.filename.clone(),
    }
}

fn file_size(file: &FileEntry) -> String {
    if file.is_dir() { String::new() } else { helpers::human_file_size(file.size, false) }
}

fn tooltip(file: &FileEntry) -> String {
    format!("{}\n{}\n{} {}", file.kind.as_str().to_uppercase(), file.filename, file_size(file), file.mime)
}

fn file_to_entry(gui: &Gui, kind: ViewKind, file: &FileEntry, options: &ListingOptions) -> Entry {
    let size = if kind == ViewKind::Icon { "32x32" } else { "16x16" };
    let icon = gui.services().icons.file_icon(file, size);
    let value = serde_json::to_value(file).unwrap_or(Value::Null);
    let name = display_name(file, options);

    if kind != ViewKind::List {
        let mut entry = Entry::new(name, value)
            .with_label(file.filename.clone())
            .with_icon(icon)
            .with_tooltip(tooltip(file));
        if kind == ViewKind::Tree && file.is_dir() && file.filename != ".." {
            entry = entry.with_children(vec![Entry::labelled("Loading...")]);
        }
        return entry;
    }

    let columns = options.columns
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let column = match *key {
                "filename" => Column { label: name.clone(), icon: Some(icon.clone()), ..Column::default() },
                "mime" => Column::new(file.mime.clone()),
                "mtime" => Column::new(file.mtime.as_deref().map(helpers::format_date).unwrap_or_default()),
                "ctime" => Column::new(file.ctime.as_deref().map(helpers::format_date).unwrap_or_default()),
                _ => Column::new(file_size(file)),
            };
            column.align(if i == 0 { "left" } else { "right" })
        })
        .collect();
    Entry::new(file.filename.clone(), value)
        .with_tooltip(tooltip(file))
        .with_columns(columns)
}

fn is_current(gui: &Gui, view: NodeId, generation: u64) -> bool {
    gui.document.contains(view) && gui.file_views.get(view).is_some_and(|s| s.generation == generation)
}

// ── Navigation ────────────────────────────────────────────────────────────

/// Lists `path` (or the current `data-path`) into the child view.
///
/// Calls arriving within the debounce window supersede each other; only
/// the last one scans. A listing that comes back after another `chdir`
/// started, or for a path that is no longer `data-path`, is dropped.
pub async fn chdir(gui: &SharedGui, view: NodeId, path: Option<String>) -> Result<ChdirOutcome> {
    let generation = {
        let mut g = gui.borrow_mut();
        let state = g.file_views.get_mut(view).ok_or_else(|| GuiError::not_found("file view"))?;
        state.generation += 1;
        state.generation
    };

    tokio::time::sleep(DEBOUNCE).await;

    let (dir, vfs, options) = {
        let mut g = gui.borrow_mut();
        if !is_current(&g, view, generation) {
            return Ok(ChdirOutcome::Superseded);
        }
        let dir = path
            .or_else(|| g.document.attr(view, "data-path").map(str::to_string))
            .unwrap_or_else(|| DEFAULT_PATH.to_string());
        g.document.set_attr(view, "data-path", dir.clone());
        let options = listing_options(&g, view, true);
        (dir, g.services().vfs.clone(), options)
    };

    log::debug!("scandir {}", dir);
    let listing = vfs.scandir(&dir, &options.scan).await;

    let mut g = gui.borrow_mut();
    if !is_current(&g, view, generation) || g.document.attr(view, "data-path") != Some(dir.as_str()) {
        log::debug!("discarding stale listing of {}", dir);
        return Ok(ChdirOutcome::Superseded);
    }

    let files = match listing {
        Ok(files) => files,
        Err(e) => {
            let title = g.services().translate("ERR_VFSMODULE_XHR_ERROR");
            let message = g.services().translator.translate("ERR_VFSMODULE_SCANDIR_FMT", &[&dir]);
            g.services().errors.present_error(&title, &message, &e.to_string());
            return Err(e.into());
        }
    };
    let files: Vec<FileEntry> = files.into_iter().filter(|f| options.scan.accepts(f)).collect();

    let (child, kind) = child_kind(&g, view).ok_or_else(|| GuiError::not_found("file view child"))?;
    let descriptor = g.descriptor(child).ok_or_else(|| GuiError::not_found("file view child descriptor"))?;
    if kind == ViewKind::List {
        descriptor.set(&mut g, child, "zebra", &Value::Bool(true), &[]);
        let columns = header_columns(&g, &options.columns);
        ListView::set_columns(&mut g, child, &columns);
    }

    let entries: Vec<Entry> = files.iter().map(|f| file_to_entry(&g, kind, f, &options)).collect();
    descriptor.call(&mut g, child, ElementCall::Clear)?;
    descriptor.call(&mut g, child, ElementCall::Add(EntrySet::Many(entries)))?;
    g.dispatch();

    let summary = ScanSummary::of(&files);
    log::debug!("{}: {} dirs, {} files", dir, summary.directories, summary.files);
    Ok(ChdirOutcome::Applied(summary))
}

/// Fills a tree entry with the listing of `path`, replacing the
/// placeholder children.
pub async fn expand_entry(gui: &SharedGui, view: NodeId, entry: NodeId, path: &str) -> Result<()> {
    let (vfs, options) = {
        let g = gui.borrow();
        (g.services().vfs.clone(), listing_options(&g, view, false))
    };
    let files = vfs.scandir(path, &options.scan).await?;

    let mut g = gui.borrow_mut();
    if !g.document.contains(entry) {
        return Ok(());
    }
    let (child, kind) = child_kind(&g, view).ok_or_else(|| GuiError::not_found("file view child"))?;
    let descriptor = g.descriptor(child).ok_or_else(|| GuiError::not_found("file view child descriptor"))?;

    let stale: Vec<NodeId> = g.document
        .element_children(entry)
        .into_iter()
        .filter(|&n| g.document.tag(n) == Some(kind.entry_tag()))
        .collect();
    for node in stale {
        g.remove_node(node);
    }
    dataview::update_active_selection(&mut g, child);
    let entries: Vec<Entry> = files
        .iter()
        .filter(|f| options.scan.accepts(f))
        .map(|f| file_to_entry(&g, kind, f, &options).under(entry))
        .collect();
    descriptor.call(&mut g, child, ElementCall::Add(EntrySet::Many(entries)))?;
    g.dispatch();
    Ok(())
}

async fn run_task(gui: &SharedGui, task: Task) {
    match task {
        Task::Chdir { view, path } => {
            let result = match chdir(gui, view, path).await {
                Ok(ChdirOutcome::Superseded) => return,
                Ok(ChdirOutcome::Applied(summary)) => Ok(summary),
                Err(e) => Err(e.to_string()),
            };
            let mut g = gui.borrow_mut();
            let path = g.document.attr(view, "data-path").unwrap_or_default().to_string();
            g.emit(view, "chdir", EventDetail::Chdir { path, result });
            g.dispatch();
        }
        Task::Expand { view, entry, path } => {
            if let Err(e) = expand_entry(gui, view, entry, &path).await {
                log::warn!("failed to expand {}: {}", path, e);
            }
        }
    }
}

/// Runs queued tasks until none are left. Tasks queued while draining
/// (by listeners, for instance) run in the next round.
pub async fn drive_tasks(gui: &SharedGui) {
    loop {
        let tasks = gui.borrow_mut().take_tasks();
        if tasks.is_empty() {
            break;
        }
        join_all(tasks.into_iter().map(|t| run_task(gui, t))).await;
    }
}

// ── Context menu ──────────────────────────────────────────────────────────

/// Setting toggles a host shows when the file view has no `contextmenu`
/// listener of its own.
pub fn context_menu_items(gui: &Gui) -> Vec<MenuItem> {
    let scandir = gui.services().setting("VFS", "scandir");
    let checked = |key: &str| scandir.get(key).and_then(Value::as_bool).unwrap_or(false);
    vec![
        MenuItem {
            title: gui.services().translate("LBL_SHOW_HIDDENFILES"),
            checked: checked(SHOW_HIDDEN_FILES),
            setting: SHOW_HIDDEN_FILES,
        },
        MenuItem {
            title: gui.services().translate("LBL_SHOW_FILEEXTENSIONS"),
            checked: checked(SHOW_FILE_EXTENSIONS),
            setting: SHOW_FILE_EXTENSIONS,
        },
    ]
}

/// Flips `VFS.scandir.<setting>`, persists it and reloads `view`.
pub fn toggle_setting(gui: &mut Gui, view: NodeId, setting: &str) {
    let mut scandir = gui.services().setting("VFS", "scandir").as_object().cloned().unwrap_or_default();
    let current = scandir.get(setting).and_then(Value::as_bool).unwrap_or(false);
    scandir.insert(setting.to_string(), Value::Bool(!current));
    gui.services().settings.set("VFS", "scandir", Value::Object(scandir), true);
    gui.queue_task(Task::Chdir { view, path: None });
}

// ── Descriptor ────────────────────────────────────────────────────────────

pub struct FileView;

const OWN_PARAMS: &[&str] = &["filter", "dotfiles", "filetype", "extensions", "defaultcolumns"];

impl ElementDescriptor for FileView {
    fn build(&self, gui: &mut Gui, node: NodeId, _args: &Value) -> Result<()> {
        gui.file_views.insert(node, FileViewState::default());
        gui.document.set_attr(node, "role", "region");
        build_child(gui, node)?;
        Ok(())
    }

    fn set(&self, gui: &mut Gui, node: NodeId, param: &str, value: &Value, extra: &[Value]) -> bool {
        if param == "type" {
            let requested = helpers::value_to_attr(value);
            let requested = if requested.starts_with("gui-") { requested } else { format!("gui-{requested}") };
            let current = child(gui, node).and_then(|c| gui.document.tag(c).map(str::to_string));
            if current.as_deref() == Some(requested.as_str()) {
                return true;
            }
            gui.empty_node(node);
            gui.document.set_attr(node, "data-type", requested);
            if let Err(e) = build_child(gui, node) {
                log::warn!("{}", e);
                return true;
            }
            if extra.first() != Some(&Value::Bool(false)) {
                gui.queue_task(Task::Chdir { view: node, path: None });
            }
            return true;
        }
        if OWN_PARAMS.contains(&param) {
            helpers::set_property(&mut gui.document, node, param, value);
            return true;
        }
        let Some(child) = child(gui, node) else { return false };
        match gui.descriptor(child) {
            Some(d) if d.set(gui, child, param, value, extra) => true,
            _ => {
                helpers::set_property(&mut gui.document, child, param, value);
                true
            }
        }
    }

    fn get(&self, gui: &Gui, node: NodeId, param: &str) -> Option<Value> {
        if param == "path" {
            return gui.document.attr(node, "data-path").map(|p| json!(p));
        }
        let child = child(gui, node)?;
        gui.descriptor(child)?.get(gui, child, param)
    }

    fn call(&self, gui: &mut Gui, node: NodeId, call: ElementCall) -> Result<Value> {
        if let ElementCall::Chdir { path } = call {
            gui.queue_task(Task::Chdir { view: node, path });
            return Ok(Value::Null);
        }
        let child = child(gui, node).ok_or_else(|| GuiError::not_found("file view child"))?;
        let descriptor = gui.descriptor(child).ok_or_else(|| GuiError::not_found("file view child descriptor"))?;
        descriptor.call(gui, child, call)
    }

    fn values(&self, gui: &Gui, node: NodeId) -> Value {
        match child(gui, node) {
            Some(c) => dataview::values(gui, c),
            None => Value::Array(Vec::new()),
        }
    }
}
