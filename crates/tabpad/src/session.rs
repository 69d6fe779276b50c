//! 開いているタブとアクティブなタブを JSON に保存し、起動時に復元するモジュール。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tab::{PreviewMode, Tab, TabId, DEFAULT_ENCODING};
use crate::tab_manager::TabManager;

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

/// Serializable projection of one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTab {
    pub name: String,
    pub path: Option<PathBuf>,
    pub content: String,
    pub is_dirty: bool,
    /// Hint only; detection runs again on restore.
    #[serde(default)]
    pub markdown_mode: bool,
    #[serde(default)]
    pub preview_mode: PreviewMode,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

/// Stored under `lastOpenFiles` in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub tabs: Vec<SessionTab>,
    #[serde(default)]
    pub active_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn stamped(mut self) -> Self {
        self.saved_at = Some(Utc::now());
        self
    }

    /// `active_index` as a usable index: negative or out-of-range becomes 0.
    pub fn clamped_active_index(&self) -> usize {
        usize::try_from(self.active_index)
            .ok()
            .filter(|&i| i < self.tabs.len())
            .unwrap_or(0)
    }
}

/// Project the manager's state. The active tab's text comes from the buffer.
pub fn snapshot(manager: &TabManager) -> SessionSnapshot {
    let tabs = manager
        .tabs()
        .iter()
        .map(|tab| SessionTab {
            name: tab.name.clone(),
            path: tab.path.clone(),
            content: manager
                .content_of(tab.id)
                .unwrap_or_else(|| tab.content.clone()),
            is_dirty: tab.dirty,
            markdown_mode: tab.markdown,
            preview_mode: tab.preview,
            encoding: tab.encoding.clone(),
        })
        .collect();

    SessionSnapshot {
        tabs,
        active_index: manager.active_index() as i64,
        saved_at: None,
    }
}

/// Build the startup tab set. No snapshot, or one without tabs, gives a
/// single `Untitled-1`.
pub fn restore(snapshot: Option<SessionSnapshot>) -> TabManager {
    let Some(snapshot) = snapshot.filter(|s| !s.tabs.is_empty()) else {
        log::info!("No previous session, starting with an empty tab");
        return TabManager::new();
    };

    let active_index = snapshot.clamped_active_index();
    let tabs: Vec<Tab> = snapshot
        .tabs
        .into_iter()
        .map(|saved| {
            let mut tab = Tab::new(TabId::new(0), saved.name, saved.path, saved.content)
                .with_encoding(saved.encoding);
            tab.dirty = saved.is_dirty;
            tab.preview = saved.preview_mode;
            tab
        })
        .collect();

    log::info!("Restoring {} tab(s), active index {}", tabs.len(), active_index);
    TabManager::from_tabs(tabs, active_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FilePayload;

    fn sample_manager() -> TabManager {
        let mut manager = TabManager::new();
        manager.buffer_mut().insert("scratch");
        manager.on_buffer_edited();
        manager.open_or_focus(FilePayload {
            path: PathBuf::from("/notes/plan.md"),
            name: "plan.md".into(),
            content: "# Plan".into(),
            encoding: "UTF-8 BOM".into(),
        });
        manager.create_tab("Untitled-3", None, "", DEFAULT_ENCODING);
        let plan = manager.find_by_path(std::path::Path::new("/notes/plan.md")).unwrap();
        manager.set_preview_mode(plan, PreviewMode::Split);
        manager.switch_to(plan);
        manager
    }

    #[test]
    fn test_snapshot_uses_live_buffer() {
        let mut manager = TabManager::new();
        manager.buffer_mut().insert("not yet mirrored");
        let snap = snapshot(&manager);
        assert_eq!(snap.tabs[0].content, "not yet mirrored");
        assert_eq!(snap.active_index, 0);
    }

    #[test]
    fn test_round_trip_reproduces_tabs() {
        let manager = sample_manager();
        let before = snapshot(&manager);

        let json = serde_json::to_string(&before).unwrap();
        let parsed: SessionSnapshot = serde_json::from_str(&json).unwrap();
        let restored = restore(Some(parsed));
        let after = snapshot(&restored);

        assert_eq!(after, before);
        assert_eq!(restored.active_tab().unwrap().name, "plan.md");
        assert_eq!(restored.buffer().content(), "# Plan");
        assert!(restored.active_tab().unwrap().markdown);
    }

    #[test]
    fn test_restore_without_session() {
        let manager = restore(None);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.tabs()[0].name, "Untitled-1");

        let empty = SessionSnapshot {
            tabs: Vec::new(),
            active_index: 3,
            saved_at: None,
        };
        assert_eq!(restore(Some(empty)).len(), 1);
    }

    #[test]
    fn test_restore_clamps_active_index() {
        let mut snap = snapshot(&sample_manager());
        snap.active_index = -1;
        assert_eq!(restore(Some(snap.clone())).active_index(), 0);
        snap.active_index = 42;
        assert_eq!(restore(Some(snap)).active_index(), 0);
    }

    #[test]
    fn test_reads_legacy_session_json() {
        let json = r#"{
            "tabs": [
                {"name": "a.txt", "path": "/a.txt", "content": "x", "isDirty": true},
                {"name": "Untitled-2", "path": null, "content": "- item", "isDirty": false}
            ],
            "activeIndex": 1
        }"#;
        let snap: SessionSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.tabs[0].encoding, "UTF-8");
        assert_eq!(snap.tabs[1].preview_mode, PreviewMode::Off);

        let manager = restore(Some(snap));
        assert!(manager.tabs()[0].dirty);
        assert!(!manager.tabs()[0].markdown);
        assert!(manager.tabs()[1].markdown);
        assert_eq!(manager.buffer().content(), "- item");
    }

    #[test]
    fn test_markdown_hint_is_rederived() {
        let snap = SessionSnapshot {
            tabs: vec![SessionTab {
                name: "n.txt".into(),
                path: Some(PathBuf::from("/n.txt")),
                content: "plain words".into(),
                is_dirty: false,
                markdown_mode: true,
                preview_mode: PreviewMode::Full,
                encoding: "UTF-8".into(),
            }],
            active_index: 0,
            saved_at: None,
        };
        let manager = restore(Some(snap));
        assert!(!manager.tabs()[0].markdown);
    }

    #[test]
    fn test_field_names_are_camel_case() {
        let json = serde_json::to_value(snapshot(&TabManager::new()).stamped()).unwrap();
        assert!(json.get("activeIndex").is_some());
        assert!(json.get("savedAt").is_some());
        let tab = &json["tabs"][0];
        assert_eq!(tab["isDirty"], serde_json::json!(false));
        assert_eq!(tab["previewMode"], serde_json::json!("off"));
        assert_eq!(tab["path"], serde_json::Value::Null);
    }
}
