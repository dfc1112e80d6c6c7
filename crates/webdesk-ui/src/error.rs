use thiserror::Error;
use webdesk_markup::ParseError;

use crate::dom::SelectorError;
use crate::vfs::VfsError;

/// Errors surfaced by the GUI runtime.
///
/// Build errors are normally swallowed (logged) by the scheme parser so a
/// single broken widget never aborts a render; the variant exists so
/// descriptors can report what went wrong.
#[derive(Debug, Error)]
pub enum GuiError {
    #[error("failed to build <{tag}>: {message}")]
    Build { tag: String, message: String },

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl GuiError {
    pub fn build(tag: impl Into<String>, message: impl Into<String>) -> Self {
        GuiError::Build { tag: tag.into(), message: message.into() }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        GuiError::NotFound { what: what.into() }
    }
}

pub type Result<T, E = GuiError> = std::result::Result<T, E>;
