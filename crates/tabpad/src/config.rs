use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs::try_exists;

use crate::preferences::ThemeConfig;
use crate::session::SessionSnapshot;

pub const DEFAULT_WIDTH: u32 = 1000;
pub const DEFAULT_HEIGHT: u32 = 700;
const MIN_WIDTH: u32 = 200;
const MIN_HEIGHT: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            x: None,
            y: None,
        }
    }
}

impl WindowBounds {
    /// Large enough to show a tab strip and a few lines of text.
    pub fn is_usable(&self) -> bool {
        self.width >= MIN_WIDTH && self.height >= MIN_HEIGHT
    }
}

/// Contents of `config.json`. Keys this crate does not know about are kept
/// in `extra` so they survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub window_bounds: WindowBounds,
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Parsed lazily so a damaged session never costs the whole config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_open_files: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConfig {
    /// The stored session, if there is one and it parses.
    pub fn session(&self) -> Option<SessionSnapshot> {
        let raw = self.last_open_files.as_ref()?;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value::<SessionSnapshot>(raw.clone()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("Ignoring unreadable lastOpenFiles entry: {}", e);
                None
            }
        }
    }

    /// Fix values that would make the window unusable.
    pub fn validate(&mut self) {
        let bounds = &mut self.window_bounds;
        if !bounds.is_usable() {
            log::warn!(
                "Invalid window size {}x{}, using default",
                bounds.width,
                bounds.height
            );
            bounds.width = DEFAULT_WIDTH;
            bounds.height = DEFAULT_HEIGHT;
        }
    }
}

/// Reads and merges the JSON config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location from `TABPAD_CONFIG_PATH`, `TABPAD_CONFIG_DIR`, or the
    /// platform config directory.
    pub fn resolve() -> Result<Self> {
        if let Ok(path) = std::env::var("TABPAD_CONFIG_PATH") {
            return Ok(Self::new(path));
        }

        if let Ok(dir) = std::env::var("TABPAD_CONFIG_DIR") {
            return Ok(Self::new(PathBuf::from(dir).join("config.json")));
        }

        let dirs = ProjectDirs::from("com", "tabpad", "tabpad")
            .ok_or_else(|| anyhow::anyhow!("設定ディレクトリを特定できませんでした"))?;
        Ok(Self::new(dirs.config_dir().join("config.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config. Any failure is logged and answered with defaults.
    pub async fn load(&self) -> AppConfig {
        match try_exists(&self.path).await {
            Ok(true) => {}
            Ok(false) => {
                log::info!("Config file does not exist, using defaults");
                return AppConfig::default();
            }
            Err(e) => {
                log::error!("Failed to check config file {}: {}", self.path.display(), e);
                return AppConfig::default();
            }
        }

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                log::error!("Failed to read config file: {}", e);
                return AppConfig::default();
            }
        };

        if content.trim().is_empty() {
            log::warn!("Config file is empty, using defaults");
            return AppConfig::default();
        }

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(mut config) => {
                config.validate();
                log::info!("Successfully loaded config from: {}", self.path.display());
                config
            }
            Err(json_err) => {
                log::error!("Failed to parse config file: {}", json_err);

                let backup_path = self.path.with_extension("bak");
                if let Err(e) = tokio::fs::copy(&self.path, &backup_path).await {
                    log::warn!("Failed to backup broken config: {}", e);
                } else {
                    log::info!("Backed up broken config to: {}", backup_path.display());
                }
                AppConfig::default()
            }
        }
    }

    /// Merge top-level keys into the stored object and write it back.
    /// Everything not named in `patch` is left as it was.
    pub async fn merge(&self, patch: Map<String, Value>) -> Result<()> {
        let mut current = match self.read_object().await {
            Some(object) => object,
            None => match serde_json::to_value(AppConfig::default())? {
                Value::Object(object) => object,
                _ => Map::new(),
            },
        };
        for (key, value) in patch {
            current.insert(key, value);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("設定ディレクトリの作成に失敗しました: {}", parent.display())
                })?;
            }
        }

        let content = serde_json::to_string_pretty(&Value::Object(current))
            .context("設定のシリアライズに失敗しました")?;
        tokio::fs::write(&self.path, content).await.with_context(|| {
            format!("設定ファイルの書き込みに失敗しました: {}", self.path.display())
        })?;
        log::debug!("Saved config to: {}", self.path.display());
        Ok(())
    }

    pub async fn merge_key(&self, key: &str, value: Value) -> Result<()> {
        let mut patch = Map::new();
        patch.insert(key.to_string(), value);
        self.merge(patch).await
    }

    async fn read_object(&self) -> Option<Map<String, Value>> {
        let content = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(object)) => Some(object),
            Ok(_) | Err(_) => {
                log::warn!("Existing config is not a JSON object, starting from defaults");
                None
            }
        }
    }
}
