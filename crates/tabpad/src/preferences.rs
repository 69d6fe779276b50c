use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const WORD_WRAP_KEY: &str = "wordWrap";
pub const ZOOM_KEY: &str = "zoom";

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;

/// Built-in colours; a theme stores only the variables the user changed.
pub const DEFAULT_THEME: [(&str, &str); 9] = [
    ("--bg0", "#111111"),
    ("--panel", "#181818"),
    ("--accent", "#d8d8d8"),
    ("--text", "#eeeeee"),
    ("--titlebar-bg", "#0f0f0f"),
    ("--topbar-bg", "#131313"),
    ("--statusbar-bg", "#131313"),
    ("--tab-bg", "#151515"),
    ("--tab-active-bg", "#181818"),
];

/// The persisted `theme` object: CSS variable overrides plus the `wordWrap`
/// and `zoom` settings. Unknown entries are kept as they are.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeConfig(Map<String, Value>);

impl ThemeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Set a CSS variable override. Names must look like `--something`.
    pub fn set_var(&mut self, name: &str, value: &str) -> Result<()> {
        if !name.starts_with("--") || name.len() <= 2 {
            return Err(anyhow::anyhow!("テーマ変数名が無効です: {}", name));
        }
        if value.trim().is_empty() {
            return Err(anyhow::anyhow!("テーマ変数 {} の値が空です", name));
        }
        self.0.insert(name.to_string(), Value::String(value.trim().to_string()));
        Ok(())
    }

    /// The override for `name`, falling back to the built-in default.
    pub fn resolved(&self, name: &str) -> Option<String> {
        self.var(name)
            .map(str::to_string)
            .or_else(|| {
                DEFAULT_THEME
                    .iter()
                    .find(|(var, _)| *var == name)
                    .map(|(_, value)| value.to_string())
            })
    }

    /// CSS variable overrides only, in stored order.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(k, _)| k.starts_with("--"))
            .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
    }

    pub fn word_wrap(&self) -> bool {
        self.0.get(WORD_WRAP_KEY).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn set_word_wrap(&mut self, enabled: bool) {
        self.0.insert(WORD_WRAP_KEY.to_string(), Value::Bool(enabled));
    }

    pub fn zoom(&self) -> f64 {
        self.0
            .get(ZOOM_KEY)
            .and_then(Value::as_f64)
            .filter(|z| z.is_finite())
            .unwrap_or(1.0)
    }

    /// Store a zoom factor clamped to `MIN_ZOOM..=MAX_ZOOM`; returns the
    /// stored value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        let zoom = if zoom.is_finite() { zoom.clamp(MIN_ZOOM, MAX_ZOOM) } else { 1.0 };
        if let Some(number) = serde_json::Number::from_f64(zoom) {
            self.0.insert(ZOOM_KEY.to_string(), Value::Number(number));
        }
        zoom
    }
}
