//! Disk-backed collaborators for running schemes outside a browser shell.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use webdesk_ui::error::GuiError;
use webdesk_ui::services::ResourceLoader;
use webdesk_ui::vfs::{self, FileEntry, ScanOptions, Vfs, VfsError};

/// Scheme and fragment URLs are plain filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

#[async_trait(?Send)]
impl ResourceLoader for FileLoader {
    async fn fetch(&self, url: &str) -> Result<String, GuiError> {
        tokio::fs::read_to_string(url)
            .await
            .map_err(|e| GuiError::Fetch { url: url.to_string(), message: e.to_string() })
    }
}

pub const MOUNTPOINT: &str = "local:///";

/// One directory of the host filesystem mounted as `local:///`.
#[derive(Debug, Clone)]
pub struct LocalVfs {
    root: PathBuf,
}

impl LocalVfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, VfsError> {
        let rest = path.strip_prefix(MOUNTPOINT).ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        if rest.split('/').any(|part| part == "..") {
            return Err(VfsError::PermissionDenied(path.to_string()));
        }
        Ok(self.root.join(rest))
    }
}

fn io_error(path: &str, e: io::Error) -> VfsError {
    match e.kind() {
        io::ErrorKind::NotFound => VfsError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => VfsError::PermissionDenied(path.to_string()),
        _ => VfsError::Io(format!("{}: {}", path, e)),
    }
}

fn timestamp(time: io::Result<SystemTime>) -> Option<String> {
    time.ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}

pub fn mime_for(filename: &str) -> &'static str {
    match vfs::extension(filename).as_deref() {
        Some(".txt" | ".md" | ".log") => "text/plain",
        Some(".html" | ".htm") => "text/html",
        Some(".css") => "text/css",
        Some(".js") => "application/javascript",
        Some(".json") => "application/json",
        Some(".png") => "image/png",
        Some(".jpg" | ".jpeg") => "image/jpeg",
        Some(".gif") => "image/gif",
        Some(".svg") => "image/svg+xml",
        Some(".pdf") => "application/pdf",
        Some(".zip") => "application/zip",
        Some(".mp3") => "audio/mpeg",
        Some(".ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

#[async_trait(?Send)]
impl Vfs for LocalVfs {
    async fn scandir(&self, dir: &str, options: &ScanOptions) -> Result<Vec<FileEntry>, VfsError> {
        let real = self.resolve(dir)?;
        let mut reader = tokio::fs::read_dir(&real).await.map_err(|e| io_error(dir, e))?;

        let mut list = Vec::new();
        while let Some(item) = reader.next_entry().await.map_err(|e| io_error(dir, e))? {
            let name = item.file_name().to_string_lossy().into_owned();
            let path = vfs::join(dir, &name);
            let meta = match item.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    log::debug!("skipping {}: {}", path, e);
                    continue;
                }
            };
            let mut entry = if meta.is_dir() {
                FileEntry::dir(&path)
            } else {
                FileEntry::file(&path, meta.len(), mime_for(&name))
            };
            entry.mtime = timestamp(meta.modified());
            entry.ctime = timestamp(meta.created());
            list.push(entry);
        }

        list.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.filename.cmp(&b.filename)));
        if options.backlink && dir.trim_end_matches('/') != MOUNTPOINT.trim_end_matches('/') {
            list.insert(0, FileEntry::backlink(dir));
        }
        Ok(list)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        tokio::fs::read(self.resolve(path)?).await.map_err(|e| io_error(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        tokio::fs::write(self.resolve(path)?, data).await.map_err(|e| io_error(path, e))
    }

    async fn copy(&self, src: &str, dest: &str) -> Result<(), VfsError> {
        tokio::fs::copy(self.resolve(src)?, self.resolve(dest)?)
            .await
            .map(|_| ())
            .map_err(|e| io_error(src, e))
    }

    async fn move_file(&self, src: &str, dest: &str) -> Result<(), VfsError> {
        tokio::fs::rename(self.resolve(src)?, self.resolve(dest)?).await.map_err(|e| io_error(src, e))
    }

    async fn mkdir(&self, path: &str) -> Result<(), VfsError> {
        tokio::fs::create_dir(self.resolve(path)?).await.map_err(|e| io_error(path, e))
    }

    async fn exists(&self, path: &str) -> Result<bool, VfsError> {
        tokio::fs::try_exists(self.resolve(path)?).await.map_err(|e| io_error(path, e))
    }

    async fn url(&self, path: &str) -> Result<String, VfsError> {
        let real = self.resolve(path)?;
        Ok(format!("file://{}", display(&real)))
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
