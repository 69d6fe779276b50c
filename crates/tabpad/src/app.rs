use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::close_gate::{CloseGate, GateState, SaveChoice};
use crate::config::WindowBounds;
use crate::host::{FilePayload, HostBridge, SavedFile};
use crate::preferences::ThemeConfig;
use crate::search::{SearchEngine, SearchMatch};
use crate::session;
use crate::status::{StatusBar, StatusMessage};
use crate::tab::{PreviewMode, TabId};
use crate::tab_manager::{OpenOutcome, TabManager};

/// The editor core: tabs, search, preferences and the close protocol, all
/// driven through a host bridge.
pub struct App {
    tabs: TabManager,
    search: SearchEngine,
    status: StatusBar,
    theme: ThemeConfig,
    window_bounds: WindowBounds,
    gate: CloseGate,
    host: Arc<dyn HostBridge>,
    should_quit: bool,
}

impl App {
    /// Load the config and restore the previous session.
    pub async fn start(host: Arc<dyn HostBridge>) -> Self {
        let config = match host.get_config().await {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load config, using defaults: {}", e);
                Default::default()
            }
        };

        let tabs = session::restore(config.session());
        let mut app = Self {
            tabs,
            search: SearchEngine::new(),
            status: StatusBar::new(),
            theme: config.theme,
            window_bounds: config.window_bounds,
            gate: CloseGate::new(),
            host,
            should_quit: false,
        };
        app.persist_session().await;
        log::info!("Application initialized with {} tab(s)", app.tabs.len());
        app
    }

    pub fn tabs(&self) -> &TabManager {
        &self.tabs
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    pub fn theme(&self) -> &ThemeConfig {
        &self.theme
    }

    pub fn window_bounds(&self) -> WindowBounds {
        self.window_bounds
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn update_status(&mut self) {
        self.status.update();
    }

    pub fn take_status(&mut self) -> Option<StatusMessage> {
        self.status.take()
    }

    /// Write the session through the host. Failures only get logged.
    pub async fn persist_session(&self) {
        let snapshot = session::snapshot(&self.tabs).stamped();
        if let Err(e) = self.host.save_last_open_files(&snapshot).await {
            log::warn!("Failed to save session: {}", e);
        }
    }

    // Tabs

    pub async fn new_tab(&mut self) -> TabId {
        let id = self.tabs.create_untitled();
        self.after_switch();
        self.persist_session().await;
        id
    }

    pub fn switch_tab(&mut self, id: TabId) -> bool {
        let switched = self.tabs.switch_to(id);
        if switched {
            self.after_switch();
        } else {
            log::warn!("Cannot switch to unknown tab {}", id);
        }
        switched
    }

    pub fn cycle_tab(&mut self, forward: bool) -> TabId {
        let id = self.tabs.cycle(forward);
        self.after_switch();
        id
    }

    pub async fn reorder_tabs(&mut self, from: usize, to: usize) -> bool {
        let moved = self.tabs.reorder(from, to);
        if moved {
            self.persist_session().await;
        }
        moved
    }

    /// Set the active tab's preview mode and return what will be shown.
    pub fn set_preview_mode(&mut self, mode: PreviewMode) -> PreviewMode {
        let id = self.tabs.active_id();
        self.tabs.set_preview_mode(id, mode);
        let shown = self.tabs.effective_preview();
        if shown != mode {
            self.status.set_info("プレビューは Markdown ファイルでのみ表示されます");
        }
        shown
    }

    fn after_switch(&mut self) {
        if self.search.is_active() {
            let text = self.tabs.buffer().content();
            self.search.refresh(&text, self.tabs.buffer().cursor());
        }
    }

    // Files

    /// A file handed over from outside (command line, OS, drag-and-drop).
    pub async fn on_external_file_open(&mut self, file: FilePayload) -> OpenOutcome {
        let name = file.name.clone();
        let outcome = self.tabs.open_or_focus(file);
        self.after_switch();
        self.persist_session().await;
        self.status.set_info(format!("ファイルを読み込みました: {}", name));
        log::info!("Opened {} ({:?})", name, outcome);
        outcome
    }

    pub async fn open_file(&mut self) -> Option<OpenOutcome> {
        match self.host.open_file_dialog().await {
            Ok(Some(file)) => Some(self.on_external_file_open(file).await),
            Ok(None) => None,
            Err(e) => {
                log::error!("Open dialog failed: {}", e);
                self.status.set_error(format!("ファイル読み込みエラー: {}", e));
                None
            }
        }
    }

    pub async fn open_path(&mut self, path: &Path) -> Option<OpenOutcome> {
        match self.host.read_file(path).await {
            Ok(Some(file)) => Some(self.on_external_file_open(file).await),
            Ok(None) => {
                self.status
                    .set_warning(format!("ファイルを開けませんでした: {}", path.display()));
                None
            }
            Err(e) => {
                log::error!("Failed to read {}: {}", path.display(), e);
                self.status.set_error(format!("ファイル読み込みエラー: {}", e));
                None
            }
        }
    }

    pub async fn save(&mut self) -> bool {
        self.save_tab(self.tabs.active_id()).await
    }

    /// Save a tab to its path, asking for one when it has none.
    pub async fn save_tab(&mut self, id: TabId) -> bool {
        let Some(content) = self.tabs.content_of(id) else {
            return false;
        };
        let path = self.tabs.get(id).and_then(|tab| tab.path.clone());
        let result = self.host.save_file(&content, path.as_deref()).await;
        self.apply_save(id, result, &content).await
    }

    pub async fn save_as(&mut self) -> bool {
        let id = self.tabs.active_id();
        let Some(content) = self.tabs.content_of(id) else {
            return false;
        };
        let result = self.host.save_file_as(&content).await;
        self.apply_save(id, result, &content).await
    }

    async fn apply_save(&mut self, id: TabId, result: Result<Option<SavedFile>>, content: &str) -> bool {
        match result {
            Ok(Some(saved)) => {
                let name = saved.name.clone();
                self.tabs.mark_saved(id, saved.path, saved.name, content);
                self.persist_session().await;
                self.status.set_success(format!("保存しました: {}", name));
                true
            }
            Ok(None) => {
                self.status.set_info("保存をキャンセルしました");
                false
            }
            Err(e) => {
                log::error!("Failed to save tab {}: {}", id, e);
                self.status.set_error(format!("保存に失敗しました: {}", e));
                false
            }
        }
    }

    // Closing

    /// Close a tab, asking first when it has unsaved edits. Returns whether
    /// the tab is gone.
    pub async fn close_tab(&mut self, id: TabId) -> bool {
        let Some(tab) = self.tabs.get(id) else {
            log::warn!("Cannot close unknown tab {}", id);
            return false;
        };

        if tab.dirty {
            let name = tab.name.clone();
            self.gate.begin();
            let choice = self.host.ask_save_changes(&name).await;
            let proceed = self.resolve_close(id, choice).await;
            self.gate.reset();
            if !proceed {
                log::info!("Close of tab {} cancelled", id);
                return false;
            }
        }

        if self.tabs.remove(id).is_some() {
            self.after_switch();
            self.persist_session().await;
        }
        true
    }

    async fn resolve_close(&mut self, id: TabId, choice: SaveChoice) -> bool {
        match self.gate.choose(choice) {
            GateState::Saving => {
                let saved = self.save_tab(id).await;
                self.gate.save_finished(saved);
                self.gate.allows_close()
            }
            GateState::Discarding => true,
            _ => false,
        }
    }

    pub async fn close_active(&mut self) -> bool {
        self.close_tab(self.tabs.active_id()).await
    }

    /// Run the close protocol over every dirty tab, then close the window.
    /// Stops at the first tab the user keeps open and leaves it active.
    pub async fn exit(&mut self) -> bool {
        for id in self.tabs.dirty_ids() {
            self.switch_tab(id);
            if !self.close_tab(id).await {
                self.status.set_info("終了をキャンセルしました");
                return false;
            }
        }

        self.persist_session().await;
        self.host.close_window();
        self.should_quit = true;
        log::info!("Application shutdown requested");
        true
    }

    // Editing

    pub async fn insert_text(&mut self, text: &str) {
        self.tabs.buffer_mut().insert(text);
        self.after_edit().await;
    }

    pub async fn backspace(&mut self) -> bool {
        let changed = self.tabs.buffer_mut().delete_backward();
        if changed {
            self.after_edit().await;
        }
        changed
    }

    pub fn select(&mut self, start: usize, end: usize) {
        self.tabs.buffer_mut().set_selection(start, end);
    }

    async fn after_edit(&mut self) {
        self.tabs.on_buffer_edited();
        self.after_switch();
        self.persist_session().await;
    }

    // Search

    /// Start a search in the active buffer and select the nearest match.
    pub fn find(&mut self, query: &str) -> usize {
        let text = self.tabs.buffer().content();
        let cursor = self.tabs.buffer().cursor();
        let case_sensitive = self.search.is_case_sensitive();
        let count = self.search.search(&text, query, case_sensitive, cursor).len();
        self.search.select_current(self.tabs.buffer_mut());
        count
    }

    pub fn find_next(&mut self) -> Option<SearchMatch> {
        let found = self.search.next();
        self.search.select_current(self.tabs.buffer_mut());
        found
    }

    pub fn find_prev(&mut self) -> Option<SearchMatch> {
        let found = self.search.prev();
        self.search.select_current(self.tabs.buffer_mut());
        found
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.search.set_case_sensitive(case_sensitive);
        self.after_switch();
    }

    pub async fn replace_one(&mut self, replacement: &str) -> bool {
        let replaced = self.search.replace_one(self.tabs.buffer_mut(), replacement);
        if replaced {
            self.tabs.on_buffer_edited();
            self.persist_session().await;
        }
        replaced
    }

    pub async fn replace_all(&mut self, replacement: &str) -> usize {
        let count = self.search.replace_all(self.tabs.buffer_mut(), replacement);
        if count > 0 {
            self.tabs.on_buffer_edited();
            self.persist_session().await;
            self.status.set_success(format!("{} 件置換しました", count));
        }
        count
    }

    // Preferences

    /// Read the stored theme, apply `change`, and write it back.
    async fn update_theme<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut ThemeConfig) -> Result<()>,
    {
        let mut theme = match self.host.get_config().await {
            Ok(config) => config.theme,
            Err(e) => {
                log::warn!("Failed to read config, editing the in-memory theme: {}", e);
                self.theme.clone()
            }
        };
        change(&mut theme)?;
        if let Err(e) = self.host.save_theme_config(&theme).await {
            log::error!("Failed to save theme: {}", e);
            self.status.set_error(format!("テーマの保存に失敗しました: {}", e));
        }
        self.theme = theme;
        Ok(())
    }

    pub async fn set_theme_var(&mut self, name: &str, value: &str) -> Result<()> {
        self.update_theme(|theme| theme.set_var(name, value)).await
    }

    /// Set word wrap, or flip it when `enabled` is `None`. Returns the new value.
    pub async fn toggle_word_wrap(&mut self, enabled: Option<bool>) -> bool {
        let mut result = self.theme.word_wrap();
        let outcome = self
            .update_theme(|theme| {
                result = enabled.unwrap_or(!theme.word_wrap());
                theme.set_word_wrap(result);
                Ok(())
            })
            .await;
        if let Err(e) = outcome {
            log::error!("Failed to update word wrap: {}", e);
        }
        result
    }

    pub async fn set_zoom(&mut self, zoom: f64) -> f64 {
        let mut stored = self.theme.zoom();
        let outcome = self
            .update_theme(|theme| {
                stored = theme.set_zoom(zoom);
                Ok(())
            })
            .await;
        if let Err(e) = outcome {
            log::error!("Failed to update zoom: {}", e);
        }
        stored
    }

    pub async fn reset_theme(&mut self) {
        let theme = ThemeConfig::new();
        if let Err(e) = self.host.save_theme_config(&theme).await {
            log::error!("Failed to reset theme: {}", e);
            self.status.set_error(format!("テーマの保存に失敗しました: {}", e));
        }
        self.theme = theme;
    }

    // Window

    /// Record a move or resize. Sizes below the minimum are refused and the
    /// previous bounds stay in place.
    pub async fn set_window_bounds(&mut self, bounds: WindowBounds) -> bool {
        if !bounds.is_usable() {
            log::warn!(
                "Ignoring window size {}x{} below the minimum",
                bounds.width,
                bounds.height
            );
            return false;
        }
        self.window_bounds = bounds;
        if let Err(e) = self.host.save_window_bounds(&bounds).await {
            log::error!("Failed to save window bounds: {}", e);
            self.status.set_error(format!("ウィンドウ位置の保存に失敗しました: {}", e));
        }
        true
    }

    pub fn minimize(&self) {
        self.host.minimize();
    }

    pub fn maximize(&self) {
        self.host.maximize();
    }
}
