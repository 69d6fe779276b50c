use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;

use crate::close_gate::SaveChoice;
use crate::config::{AppConfig, ConfigStore, WindowBounds};
use crate::host::{display_name, FilePayload, HostBridge, SavedFile};
use crate::preferences::ThemeConfig;
use crate::session::SessionSnapshot;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// The interactive half of the host: whatever front end is running asks the
/// user these questions.
#[async_trait]
pub trait Dialogs: Send + Sync {
    async fn pick_open_path(&self) -> Option<PathBuf>;

    async fn pick_save_path(&self) -> Option<PathBuf>;

    async fn ask_save_changes(&self, name: &str) -> SaveChoice;
}

/// Host bridge backed by the local file system and a JSON config file.
pub struct FsHost {
    config: ConfigStore,
    dialogs: Box<dyn Dialogs>,
    maximized: AtomicBool,
    minimized: AtomicBool,
    closed: AtomicBool,
}

impl FsHost {
    pub fn new(config: ConfigStore, dialogs: Box<dyn Dialogs>) -> Self {
        Self {
            config,
            dialogs,
            maximized: AtomicBool::new(false),
            minimized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized.load(Ordering::SeqCst)
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn write_to(&self, path: &Path, content: &str) -> Result<Option<SavedFile>> {
        write_with_retry(path, content).await?;
        Ok(Some(SavedFile {
            path: path.to_path_buf(),
            name: display_name(path),
        }))
    }

    async fn read_or_none(&self, path: &Path) -> Option<FilePayload> {
        match load_payload(path).await {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Refusing to open {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Read a text file for a tab. A missing file is `Ok(None)`; anything we
/// cannot show as text is an error.
pub async fn load_payload(path: &Path) -> Result<Option<FilePayload>> {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("File not found: {}", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(anyhow::anyhow!(
                "ファイル情報の取得に失敗しました: {} - {}",
                path.display(),
                e
            ));
        }
    };

    if !metadata.is_file() {
        return Err(anyhow::anyhow!(
            "指定されたパスはファイルではありません: {}",
            path.display()
        ));
    }

    if metadata.len() > LARGE_FILE_THRESHOLD {
        log::warn!(
            "Large file detected ({} bytes): {}",
            metadata.len(),
            path.display()
        );
    }

    let bytes = fs::read(path).await.map_err(|e| {
        let message = match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("ファイルへのアクセス権限がありません: {}", path.display())
            }
            _ => format!("ファイル読み込みエラー: {} - {}", path.display(), e),
        };
        anyhow::anyhow!(message)
    })?;

    let (body, encoding) = if bytes.starts_with(UTF8_BOM) {
        (bytes[UTF8_BOM.len()..].to_vec(), "UTF-8 BOM")
    } else {
        (bytes, "UTF-8")
    };

    let content = String::from_utf8(body).map_err(|_| {
        anyhow::anyhow!(
            "ファイルのエンコーディングが無効です (UTF-8ではありません): {}",
            path.display()
        )
    })?;

    if content.contains('\0') {
        return Err(anyhow::anyhow!(
            "ファイルがバイナリ形式の可能性があります: {}",
            path.display()
        ));
    }

    log::info!("Successfully opened file: {}", path.display());
    Ok(Some(FilePayload {
        path: path.to_path_buf(),
        name: display_name(path),
        content,
        encoding: encoding.to_string(),
    }))
}

/// Write `content` as UTF-8, retrying transient failures with a growing
/// delay.
pub async fn write_with_retry(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await.map_err(|e| {
                anyhow::anyhow!(
                    "ディレクトリの作成に失敗しました: {} - {}",
                    parent.display(),
                    e
                )
            })?;
            log::info!("Created directory: {}", parent.display());
        }
    }

    let mut attempts = 0;
    loop {
        match fs::write(path, content.as_bytes()).await {
            Ok(_) => {
                log::info!("Successfully saved file: {}", path.display());
                return Ok(());
            }
            Err(e) => {
                attempts += 1;
                if attempts >= MAX_WRITE_ATTEMPTS {
                    let message = match e.kind() {
                        std::io::ErrorKind::PermissionDenied => {
                            format!("ファイルへの書き込み権限がありません: {}", path.display())
                        }
                        std::io::ErrorKind::WriteZero => {
                            format!("ディスク容量が不足している可能性があります: {}", path.display())
                        }
                        _ => format!("ファイル書き込みエラー: {} - {}", path.display(), e),
                    };
                    return Err(anyhow::anyhow!(message));
                }

                tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempts as u64)).await;
                log::warn!("Save attempt {} failed for {}, retrying...", attempts, path.display());
            }
        }
    }
}

#[async_trait]
impl HostBridge for FsHost {
    async fn open_file_dialog(&self) -> Result<Option<FilePayload>> {
        match self.dialogs.pick_open_path().await {
            Some(path) => Ok(self.read_or_none(&path).await),
            None => Ok(None),
        }
    }

    async fn read_file(&self, path: &Path) -> Result<Option<FilePayload>> {
        Ok(self.read_or_none(path).await)
    }

    async fn save_file(&self, content: &str, path: Option<&Path>) -> Result<Option<SavedFile>> {
        match path {
            Some(path) => self.write_to(path, content).await,
            None => self.save_file_as(content).await,
        }
    }

    async fn save_file_as(&self, content: &str) -> Result<Option<SavedFile>> {
        match self.dialogs.pick_save_path().await {
            Some(path) => self.write_to(&path, content).await,
            None => {
                log::info!("Save dialog cancelled");
                Ok(None)
            }
        }
    }

    async fn get_config(&self) -> Result<AppConfig> {
        Ok(self.config.load().await)
    }

    async fn save_theme_config(&self, theme: &ThemeConfig) -> Result<()> {
        self.config.merge_key("theme", serde_json::to_value(theme)?).await
    }

    async fn save_last_open_files(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.config
            .merge_key("lastOpenFiles", serde_json::to_value(snapshot)?)
            .await
    }

    async fn save_window_bounds(&self, bounds: &WindowBounds) -> Result<()> {
        self.config
            .merge_key("windowBounds", serde_json::to_value(bounds)?)
            .await
    }

    async fn ask_save_changes(&self, name: &str) -> SaveChoice {
        self.dialogs.ask_save_changes(name).await
    }

    fn minimize(&self) {
        self.minimized.store(true, Ordering::SeqCst);
        log::debug!("Window minimized");
    }

    fn maximize(&self) {
        let now = !self.maximized.load(Ordering::SeqCst);
        self.maximized.store(now, Ordering::SeqCst);
        self.minimized.store(false, Ordering::SeqCst);
        log::debug!("Window maximized: {}", now);
    }

    fn close_window(&self) {
        self.closed.store(true, Ordering::SeqCst);
        log::info!("Window close requested");
    }
}
