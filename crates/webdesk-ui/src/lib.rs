//! webdesk UI: scheme-driven widgets on an arena document.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use webdesk_ui::prelude::*;
//!
//! let mut gui = Gui::with_defaults();
//! let mut window = Window::new(1, "Files");
//!
//! let mut scheme = Scheme::new("/apps/files/scheme.html");
//! scheme.load_string(include_str!("scheme.html"))?;
//! scheme.render(&mut gui, &mut window, "FileManagerWindow", None, None, &ParseArgs::default())?;
//!
//! let files = scheme.find(&gui, &window, "FileView", None).unwrap();
//! files.on(&mut gui, "activate", |_, ev| println!("{:?}", ev.entries()));
//! files.call(&mut gui, ElementCall::Chdir { path: Some("home:///".into()) })?;
//!
//! // Widgets queue async work; the host drains it.
//! let gui = gui.into_shared();
//! webdesk_ui::fileview::drive_tasks(&gui).await;
//! ```
//!
//! # Custom widgets
//!
//! Implement [`registry::ElementDescriptor`] and register it for a tag
//! before handing the registry to [`gui::Gui::new`]. The parse pass builds
//! every registered tag it finds, in registration order.

pub mod connection;
pub mod containers;
pub mod dataview;
pub mod dom;
pub mod drag;
pub mod entry;
pub mod error;
pub mod event;
pub mod fileview;
pub mod focus;
pub mod gui;
pub mod handle;
pub mod helpers;
pub mod inputs;
pub mod registry;
pub mod scheme;
pub mod services;
pub mod vfs;
pub mod views;
pub mod window;

pub use gui::{Gui, SharedGui};

/// Everything an application needs to render schemes and talk to widgets.
pub mod prelude {
    pub use crate::dom::{Document, NodeId};
    pub use crate::entry::{Column, Entry, EntrySet, RemoveTarget, SelectedEntry};
    pub use crate::error::{GuiError, Result};
    pub use crate::event::{EventDetail, EventResult, GuiEvent, UiEvent};
    pub use crate::fileview::{ChdirOutcome, ScanSummary};
    pub use crate::gui::{Gui, SharedGui, Task};
    pub use crate::handle::{DataViewHandle, Handle, Instance};
    pub use crate::registry::{ElementCall, ElementDescriptor, ElementRegistry, Params};
    pub use crate::scheme::{DialogScheme, ParseArgs, Scheme};
    pub use crate::services::{ResourceLoader, Services};
    pub use crate::vfs::{FileEntry, ScanOptions, Vfs, VfsError};
    pub use crate::window::{AppContext, Destroyable, Initable, Window};

    pub use webdesk_engine::coords::{Rect, Vec2};
    pub use webdesk_engine::input::{Key, Modifiers};
}
