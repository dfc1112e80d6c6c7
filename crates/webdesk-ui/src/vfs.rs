//! Virtual filesystem collaborator.
//!
//! The runtime never touches storage itself. File views ask a [`Vfs`] for
//! directory listings; everything else (`read`, `write`, …) is exposed for
//! applications that hold the same collaborator.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    #[error("{0}: no such file or directory")]
    NotFound(String),
    #[error("{0}: permission denied")]
    PermissionDenied(String),
    #[error("{0}: mountpoint is read-only")]
    ReadOnly(String),
    #[error("{0}")]
    Io(String),
    #[error("no filesystem is mounted")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Dir,
    File,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Dir => "dir",
            FileType::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<FileType> {
        match s {
            "dir" => Some(FileType::Dir),
            "file" => Some(FileType::File),
            _ => None,
        }
    }
}

/// One directory listing item, as delivered by `scandir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileType,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub mtime: Option<String>,
    #[serde(default)]
    pub ctime: Option<String>,
}

impl FileEntry {
    pub fn file(path: &str, size: u64, mime: &str) -> Self {
        Self {
            filename: basename(path).to_string(),
            path: path.to_string(),
            kind: FileType::File,
            size,
            mime: mime.to_string(),
            mtime: None,
            ctime: None,
        }
    }

    pub fn dir(path: &str) -> Self {
        Self { kind: FileType::Dir, mime: String::new(), ..Self::file(path, 0, "") }
    }

    /// The `..` entry pointing at the parent of `dir`.
    pub fn backlink(dir: &str) -> Self {
        Self { filename: "..".into(), ..Self::dir(&dirname(dir)) }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileType::Dir
    }

    pub fn is_hidden(&self) -> bool {
        self.filename.starts_with('.') && self.filename != ".."
    }
}

/// Options derived from a file view's attributes and the `VFS` settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanOptions {
    pub show_dot_files: bool,
    pub show_file_extensions: bool,
    /// Regular expressions matched against file MIME types.
    pub mime_filter: Vec<String>,
    pub type_filter: Option<FileType>,
    pub backlink: bool,
}

impl ScanOptions {
    /// Applies the filters a backend would otherwise have to implement.
    /// Directories always pass the MIME filter.
    pub fn accepts(&self, entry: &FileEntry) -> bool {
        if entry.filename == ".." {
            return self.backlink;
        }
        if !self.show_dot_files && entry.is_hidden() {
            return false;
        }
        if self.type_filter.is_some_and(|t| t != entry.kind) {
            return false;
        }
        if entry.is_dir() || self.mime_filter.is_empty() {
            return true;
        }
        self.mime_filter.iter().any(|pattern| match Regex::new(pattern) {
            Ok(re) => re.is_match(&entry.mime),
            Err(_) => pattern == &entry.mime,
        })
    }
}

#[async_trait(?Send)]
pub trait Vfs {
    async fn scandir(&self, dir: &str, options: &ScanOptions) -> Result<Vec<FileEntry>, VfsError>;
    async fn read(&self, path: &str) -> Result<Vec<u8>, VfsError>;
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError>;
    async fn copy(&self, src: &str, dest: &str) -> Result<(), VfsError>;
    async fn move_file(&self, src: &str, dest: &str) -> Result<(), VfsError>;
    async fn mkdir(&self, path: &str) -> Result<(), VfsError>;
    async fn exists(&self, path: &str) -> Result<bool, VfsError>;
    /// A URL the host can load the file from.
    async fn url(&self, path: &str) -> Result<String, VfsError>;
}

/// Placeholder used until a host mounts a real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVfs;

#[async_trait(?Send)]
impl Vfs for NullVfs {
    async fn scandir(&self, _dir: &str, _options: &ScanOptions) -> Result<Vec<FileEntry>, VfsError> {
        Err(VfsError::Unavailable)
    }
    async fn read(&self, _path: &str) -> Result<Vec<u8>, VfsError> {
        Err(VfsError::Unavailable)
    }
    async fn write(&self, _path: &str, _data: &[u8]) -> Result<(), VfsError> {
        Err(VfsError::Unavailable)
    }
    async fn copy(&self, _src: &str, _dest: &str) -> Result<(), VfsError> {
        Err(VfsError::Unavailable)
    }
    async fn move_file(&self, _src: &str, _dest: &str) -> Result<(), VfsError> {
        Err(VfsError::Unavailable)
    }
    async fn mkdir(&self, _path: &str) -> Result<(), VfsError> {
        Err(VfsError::Unavailable)
    }
    async fn exists(&self, _path: &str) -> Result<bool, VfsError> {
        Err(VfsError::Unavailable)
    }
    async fn url(&self, _path: &str) -> Result<String, VfsError> {
        Err(VfsError::Unavailable)
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────
//
// VFS paths look like `home:///Documents/a.txt`: a mountpoint scheme
// followed by an absolute path.

fn split_root(path: &str) -> (&str, &str) {
    match path.find(":///") {
        Some(i) => path.split_at(i + 4),
        None if path.starts_with('/') => path.split_at(1),
        None => ("", path),
    }
}

pub fn basename(path: &str) -> &str {
    let (_, rest) = split_root(path);
    rest.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Parent directory; the root is its own parent.
pub fn dirname(path: &str) -> String {
    let (root, rest) = split_root(path);
    let rest = rest.trim_end_matches('/');
    match rest.rfind('/') {
        Some(i) => format!("{}{}", root, &rest[..i]),
        None => root.to_string(),
    }
}

pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name.trim_start_matches('/'))
    } else {
        format!("{}/{}", dir, name.trim_start_matches('/'))
    }
}

/// Extension including the dot, lower-cased.
pub fn extension(filename: &str) -> Option<String> {
    let dot = filename.rfind('.').filter(|&i| i > 0)?;
    Some(filename[dot..].to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(basename("home:///Documents/a.txt"), "a.txt");
        assert_eq!(dirname("home:///Documents/a.txt"), "home:///Documents");
        assert_eq!(dirname("home:///Documents"), "home:///");
        assert_eq!(dirname("home:///"), "home:///");
        assert_eq!(join("home:///", "x"), "home:///x");
        assert_eq!(join("/apps/writer", "dialogs.html"), "/apps/writer/dialogs.html");
        assert_eq!(extension("notes.TXT").as_deref(), Some(".txt"));
        assert_eq!(extension(".bashrc"), None);
    }

    #[test]
    fn options_filter_listing() {
        let opts = ScanOptions { mime_filter: vec!["^image/".into()], ..ScanOptions::default() };
        assert!(opts.accepts(&FileEntry::file("home:///a.png", 1, "image/png")));
        assert!(!opts.accepts(&FileEntry::file("home:///a.txt", 1, "text/plain")));
        assert!(opts.accepts(&FileEntry::dir("home:///pics")));
        assert!(!opts.accepts(&FileEntry::file("home:///.hidden", 1, "image/png")));
        assert!(!opts.accepts(&FileEntry::backlink("home:///pics")));
    }

    #[test]
    fn type_filter_and_dotfiles() {
        let opts = ScanOptions {
            show_dot_files: true,
            type_filter: Some(FileType::Dir),
            backlink: true,
            ..ScanOptions::default()
        };
        assert!(opts.accepts(&FileEntry::dir("home:///.config")));
        assert!(!opts.accepts(&FileEntry::file("home:///a.txt", 1, "text/plain")));
        assert!(opts.accepts(&FileEntry::backlink("home:///x")));
    }
}
