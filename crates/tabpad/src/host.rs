use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::close_gate::SaveChoice;
use crate::config::{AppConfig, WindowBounds};
use crate::preferences::ThemeConfig;
use crate::session::SessionSnapshot;

/// A file read through the host, ready to become a tab.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePayload {
    pub path: PathBuf,
    pub name: String,
    pub content: String,
    pub encoding: String,
}

/// Where a save landed.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub name: String,
}

/// File name shown on a tab for `path`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Everything the editor core needs from the outside world: file access,
/// dialogs, persistent settings and the window.
///
/// `Ok(None)` means the user cancelled or the file could not be read; it is
/// never an error for the caller to report twice.
#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn open_file_dialog(&self) -> Result<Option<FilePayload>>;

    async fn read_file(&self, path: &Path) -> Result<Option<FilePayload>>;

    /// Write `content` to `path`, or ask for a destination when there is none.
    async fn save_file(&self, content: &str, path: Option<&Path>) -> Result<Option<SavedFile>>;

    async fn save_file_as(&self, content: &str) -> Result<Option<SavedFile>>;

    async fn get_config(&self) -> Result<AppConfig>;

    async fn save_theme_config(&self, theme: &ThemeConfig) -> Result<()>;

    async fn save_last_open_files(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Called after the window is moved or resized.
    async fn save_window_bounds(&self, bounds: &WindowBounds) -> Result<()>;

    /// "Do you want to save changes to `name`?"
    async fn ask_save_changes(&self, name: &str) -> SaveChoice;

    fn minimize(&self);

    /// Toggles between maximized and restored.
    fn maximize(&self);

    fn close_window(&self);
}
