//! In-memory host used by the `App` and command tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::app::App;
use crate::close_gate::SaveChoice;
use crate::config::{AppConfig, WindowBounds};
use crate::host::{display_name, FilePayload, HostBridge, SavedFile};
use crate::preferences::ThemeConfig;
use crate::session::SessionSnapshot;

#[derive(Default)]
pub struct MockHost {
    pub files: Mutex<HashMap<PathBuf, FilePayload>>,
    pub open_dialog: Mutex<VecDeque<Option<FilePayload>>>,
    pub save_dialog: Mutex<VecDeque<Option<PathBuf>>>,
    pub choices: Mutex<VecDeque<SaveChoice>>,
    pub prompts: Mutex<Vec<String>>,
    pub written: Mutex<Vec<(PathBuf, String)>>,
    pub config: Mutex<AppConfig>,
    pub snapshots: Mutex<Vec<SessionSnapshot>>,
    pub fail_writes: AtomicBool,
    pub fail_config: AtomicBool,
    pub minimized: AtomicBool,
    pub maximized: AtomicBool,
    pub closed: AtomicBool,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_config(config: AppConfig) -> Arc<Self> {
        let host = Self::default();
        *host.config.lock().unwrap() = config;
        Arc::new(host)
    }

    pub fn add_file(&self, path: &str, content: &str) {
        let path = PathBuf::from(path);
        let payload = FilePayload {
            name: display_name(&path),
            path: path.clone(),
            content: content.to_string(),
            encoding: "UTF-8".to_string(),
        };
        self.files.lock().unwrap().insert(path, payload);
    }

    pub fn queue_choice(&self, choice: SaveChoice) {
        self.choices.lock().unwrap().push_back(choice);
    }

    pub fn queue_save_path(&self, path: Option<&str>) {
        self.save_dialog.lock().unwrap().push_back(path.map(PathBuf::from));
    }

    pub fn queue_open(&self, path: &str) {
        let payload = self.files.lock().unwrap().get(Path::new(path)).cloned();
        self.open_dialog.lock().unwrap().push_back(payload);
    }

    pub fn last_snapshot(&self) -> Option<SessionSnapshot> {
        self.snapshots.lock().unwrap().last().cloned()
    }

    pub fn written_to(&self, path: &str) -> Option<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == Path::new(path))
            .map(|(_, content)| content.clone())
    }

    pub fn stored_theme(&self) -> ThemeConfig {
        self.config.lock().unwrap().theme.clone()
    }

    fn write(&self, path: PathBuf, content: &str) -> Result<Option<SavedFile>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("disk full"));
        }
        self.written
            .lock()
            .unwrap()
            .push((path.clone(), content.to_string()));
        Ok(Some(SavedFile {
            name: display_name(&path),
            path,
        }))
    }
}

#[async_trait]
impl HostBridge for MockHost {
    async fn open_file_dialog(&self) -> Result<Option<FilePayload>> {
        Ok(self.open_dialog.lock().unwrap().pop_front().flatten())
    }

    async fn read_file(&self, path: &Path) -> Result<Option<FilePayload>> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    async fn save_file(&self, content: &str, path: Option<&Path>) -> Result<Option<SavedFile>> {
        match path {
            Some(path) => self.write(path.to_path_buf(), content),
            None => self.save_file_as(content).await,
        }
    }

    async fn save_file_as(&self, content: &str) -> Result<Option<SavedFile>> {
        let picked = self.save_dialog.lock().unwrap().pop_front().flatten();
        match picked {
            Some(path) => self.write(path, content),
            None => Ok(None),
        }
    }

    async fn get_config(&self) -> Result<AppConfig> {
        if self.fail_config.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("config unavailable"));
        }
        Ok(self.config.lock().unwrap().clone())
    }

    async fn save_theme_config(&self, theme: &ThemeConfig) -> Result<()> {
        self.config.lock().unwrap().theme = theme.clone();
        Ok(())
    }

    async fn save_last_open_files(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn save_window_bounds(&self, bounds: &WindowBounds) -> Result<()> {
        if self.fail_config.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("config unavailable"));
        }
        self.config.lock().unwrap().window_bounds = *bounds;
        Ok(())
    }

    async fn ask_save_changes(&self, name: &str) -> SaveChoice {
        self.prompts.lock().unwrap().push(name.to_string());
        self.choices
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SaveChoice::Cancel)
    }

    fn minimize(&self) {
        self.minimized.store(true, Ordering::SeqCst);
    }

    fn maximize(&self) {
        let now = !self.maximized.load(Ordering::SeqCst);
        self.maximized.store(now, Ordering::SeqCst);
    }

    fn close_window(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// An `App` started against `host`.
pub async fn start_app(host: &Arc<MockHost>) -> App {
    App::start(host.clone()).await
}
