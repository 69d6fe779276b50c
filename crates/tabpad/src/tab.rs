use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Process-unique tab identifier, handed out in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl TabId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the Markdown preview pane is shown for a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    #[default]
    Off,
    Full,
    Split,
}

impl PreviewMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "full" => Some(Self::Full),
            "split" => Some(Self::Split),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Full => "full",
            Self::Split => "split",
        }
    }
}

/// One open document.
#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub name: String,
    pub path: Option<PathBuf>,
    /// Authoritative only while the tab is inactive; the active tab's text
    /// lives in the document buffer.
    pub content: String,
    pub dirty: bool,
    pub cursor_start: usize,
    pub cursor_end: usize,
    pub preview: PreviewMode,
    pub markdown: bool,
    pub encoding: String,
}

impl Tab {
    pub fn new(id: TabId, name: String, path: Option<PathBuf>, content: String) -> Self {
        Self {
            id,
            name,
            path,
            content,
            dirty: false,
            cursor_start: 0,
            cursor_end: 0,
            preview: PreviewMode::Off,
            markdown: false,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// No path, no edits, no text: the tab a fresh window starts with.
    pub fn is_pristine(&self) -> bool {
        self.path.is_none() && !self.dirty && self.content.is_empty()
    }

    /// Sticky Markdown detection: once set, never cleared.
    pub(crate) fn refresh_markdown(&mut self, text: &str) {
        if !self.markdown && mdcore::detect(self.path.as_deref(), text) {
            log::debug!("Tab {} switched to Markdown mode", self.id);
            self.markdown = true;
        }
    }

    /// Label for the tab strip, with a `*` for unsaved edits.
    pub fn label(&self) -> String {
        if self.dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}
