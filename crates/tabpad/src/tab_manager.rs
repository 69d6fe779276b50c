use std::path::Path;

use crate::buffer::DocumentBuffer;
use crate::host::FilePayload;
use crate::tab::{PreviewMode, Tab, TabId, DEFAULT_ENCODING};

/// What `open_or_focus` did with the incoming file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Focused(TabId),
    Replaced(TabId),
    Created(TabId),
}

impl OpenOutcome {
    pub fn id(self) -> TabId {
        match self {
            Self::Focused(id) | Self::Replaced(id) | Self::Created(id) => id,
        }
    }
}

/// Ordered set of open tabs plus the buffer of the active one.
///
/// The set is never empty and exactly one tab is active. Session snapshots
/// are the caller's job.
pub struct TabManager {
    tabs: Vec<Tab>,
    active: TabId,
    next_id: u64,
    buffer: DocumentBuffer,
}

impl TabManager {
    /// A manager holding a single `Untitled-1` tab.
    pub fn new() -> Self {
        let first = Tab::new(TabId::new(1), untitled_name(1), None, String::new());
        let active = first.id;
        Self {
            tabs: vec![first],
            active,
            next_id: 2,
            buffer: DocumentBuffer::new(),
        }
    }

    /// Rebuild from restored tabs. Ids are reassigned in order and the tab at
    /// `active_index` is loaded into the buffer; an empty list yields `new()`.
    pub(crate) fn from_tabs(tabs: Vec<Tab>, active_index: usize) -> Self {
        if tabs.is_empty() {
            return Self::new();
        }

        let mut manager = Self {
            tabs: Vec::with_capacity(tabs.len()),
            active: TabId::new(1),
            next_id: 1,
            buffer: DocumentBuffer::new(),
        };
        for mut tab in tabs {
            tab.id = manager.allocate_id();
            tab.markdown = false;
            let text = tab.content.clone();
            tab.refresh_markdown(&text);
            manager.tabs.push(tab);
        }

        let index = if active_index < manager.tabs.len() { active_index } else { 0 };
        manager.active = manager.tabs[index].id;
        manager.load_active();
        manager
    }

    fn allocate_id(&mut self) -> TabId {
        let id = TabId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn active_id(&self) -> TabId {
        self.active
    }

    pub fn active_index(&self) -> usize {
        self.position(self.active).unwrap_or(0)
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.get(self.active)
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn position(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<TabId> {
        self.tabs
            .iter()
            .find(|t| t.path.as_deref() == Some(path))
            .map(|t| t.id)
    }

    pub fn buffer(&self) -> &DocumentBuffer {
        &self.buffer
    }

    /// Callers that edit through this must follow up with `on_buffer_edited`.
    pub fn buffer_mut(&mut self) -> &mut DocumentBuffer {
        &mut self.buffer
    }

    /// Current text of a tab; the live buffer for the active one.
    pub fn content_of(&self, id: TabId) -> Option<String> {
        if id == self.active {
            return Some(self.buffer.content());
        }
        self.get(id).map(|t| t.content.clone())
    }

    /// Name for the next untitled tab, counting the tabs already open.
    pub fn next_untitled_name(&self) -> String {
        untitled_name(self.tabs.len() + 1)
    }

    pub fn dirty_ids(&self) -> Vec<TabId> {
        self.tabs.iter().filter(|t| t.dirty).map(|t| t.id).collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tabs.iter().any(|t| t.dirty)
    }

    /// Append a tab and make it active. Never deduplicates.
    pub fn create_tab(
        &mut self,
        name: impl Into<String>,
        path: Option<std::path::PathBuf>,
        content: impl Into<String>,
        encoding: impl Into<String>,
    ) -> TabId {
        let id = self.allocate_id();
        let tab = Tab::new(id, name.into(), path, content.into()).with_encoding(encoding);
        log::debug!("Created tab {} ({})", id, tab.name);
        self.tabs.push(tab);
        self.switch_to(id);
        id
    }

    pub fn create_untitled(&mut self) -> TabId {
        let name = self.next_untitled_name();
        self.create_tab(name, None, String::new(), DEFAULT_ENCODING)
    }

    /// Focus the tab already showing `file.path`, reuse a lone pristine tab,
    /// or append a new one, in that order.
    pub fn open_or_focus(&mut self, file: FilePayload) -> OpenOutcome {
        if let Some(existing) = self.find_by_path(&file.path) {
            self.switch_to(existing);
            return OpenOutcome::Focused(existing);
        }

        if self.tabs.len() == 1 && self.pristine_for_replace() {
            let id = self.tabs[0].id;
            let was_active = id == self.active;
            if let Some(tab) = self.get_mut(id) {
                tab.name = file.name;
                tab.path = Some(file.path);
                tab.content = file.content;
                tab.encoding = file.encoding;
                tab.cursor_start = 0;
                tab.cursor_end = 0;
            }
            if was_active {
                self.load_active();
            } else {
                self.switch_to(id);
            }
            log::debug!("Replaced pristine tab {} with opened file", id);
            return OpenOutcome::Replaced(id);
        }

        OpenOutcome::Created(self.create_tab(file.name, Some(file.path), file.content, file.encoding))
    }

    fn pristine_for_replace(&self) -> bool {
        let Some(tab) = self.tabs.first() else {
            return false;
        };
        // The active tab's text lives in the buffer, not in `content`.
        let empty = if tab.id == self.active {
            self.buffer.is_empty()
        } else {
            tab.content.is_empty()
        };
        tab.path.is_none() && !tab.dirty && empty
    }

    /// Activate `id`. Unknown ids are ignored and return `false`.
    pub fn switch_to(&mut self, id: TabId) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        if id == self.active {
            // Already showing; the buffer is the newest copy of this tab.
            let text = self.buffer.content();
            if let Some(tab) = self.get_mut(id) {
                tab.refresh_markdown(&text);
            }
            return true;
        }
        self.checkpoint_active();
        self.active = id;
        self.load_active();
        true
    }

    /// Next or previous tab in strip order, wrapping around.
    pub fn cycle(&mut self, forward: bool) -> TabId {
        let len = self.tabs.len();
        let index = self.active_index();
        let target = if forward {
            (index + 1) % len
        } else if index == 0 {
            len - 1
        } else {
            index - 1
        };
        let id = self.tabs[target].id;
        self.switch_to(id);
        id
    }

    /// Copy the buffer's text and selection into the active tab's record.
    fn checkpoint_active(&mut self) {
        let content = self.buffer.content();
        let (start, end) = self.buffer.selection();
        let active = self.active;
        if let Some(tab) = self.get_mut(active) {
            tab.content = content;
            tab.cursor_start = start;
            tab.cursor_end = end;
        }
    }

    /// Load the active tab into the buffer and re-run Markdown detection.
    fn load_active(&mut self) {
        let active = self.active;
        let Some(index) = self.position(active) else {
            return;
        };
        let tab = &mut self.tabs[index];
        self.buffer.set_content(&tab.content);
        self.buffer.set_selection(tab.cursor_start, tab.cursor_end);
        self.buffer.scroll_to_char(tab.cursor_start);
        let text = tab.content.clone();
        tab.refresh_markdown(&text);
    }

    /// Remove a tab after the unsaved-changes gate let it go.
    ///
    /// An emptied set gets a fresh `Untitled-1`; closing the active tab
    /// activates its left neighbour (or the new first tab).
    pub fn remove(&mut self, id: TabId) -> Option<Tab> {
        let index = self.position(id)?;
        let was_active = id == self.active;
        let removed = self.tabs.remove(index);
        log::debug!("Removed tab {} ({})", id, removed.name);

        if self.tabs.is_empty() {
            let fresh = self.allocate_id();
            self.tabs.push(Tab::new(fresh, untitled_name(1), None, String::new()));
            self.active = fresh;
            self.load_active();
        } else if was_active {
            let neighbour = self.tabs[index.saturating_sub(1)].id;
            self.active = neighbour;
            self.load_active();
        }
        Some(removed)
    }

    /// Move the tab at `from` so it lands where `to` pointed before removal.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.tabs.len();
        if from == to || from >= len || to > len {
            return false;
        }
        let tab = self.tabs.remove(from);
        let insert_at = if from < to { to - 1 } else { to };
        self.tabs.insert(insert_at, tab);
        true
    }

    /// Record an edit of the active buffer: dirty flag, mirrored content,
    /// Markdown detection.
    pub fn on_buffer_edited(&mut self) {
        let content = self.buffer.content();
        let (start, end) = self.buffer.selection();
        let active = self.active;
        if let Some(tab) = self.get_mut(active) {
            tab.dirty = true;
            tab.cursor_start = start;
            tab.cursor_end = end;
            tab.refresh_markdown(&content);
            tab.content = content;
        }
    }

    pub fn mark_dirty(&mut self, id: TabId) -> bool {
        match self.get_mut(id) {
            Some(tab) => {
                tab.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Apply a completed save. The dirty flag is cleared only if the tab
    /// still holds exactly what was written.
    pub fn mark_saved(&mut self, id: TabId, path: std::path::PathBuf, name: String, saved: &str) -> bool {
        let unchanged = self.content_of(id).map(|c| c == saved).unwrap_or(false);
        let Some(tab) = self.get_mut(id) else {
            return false;
        };
        tab.path = Some(path);
        tab.name = name;
        if unchanged {
            tab.dirty = false;
        } else {
            log::info!("Tab {} changed while saving; keeping it dirty", id);
        }
        tab.refresh_markdown(saved);
        true
    }

    pub fn set_preview_mode(&mut self, id: TabId, mode: PreviewMode) -> bool {
        match self.get_mut(id) {
            Some(tab) => {
                tab.preview = mode;
                true
            }
            None => false,
        }
    }

    /// Preview mode to present for the active tab; plain-text tabs never
    /// show a preview.
    pub fn effective_preview(&self) -> PreviewMode {
        match self.active_tab() {
            Some(tab) if tab.markdown => tab.preview,
            _ => PreviewMode::Off,
        }
    }
}

impl Default for TabManager {
    fn default() -> Self {
        Self::new()
    }
}

fn untitled_name(n: usize) -> String {
    format!("Untitled-{}", n)
}
