use std::time::{Duration, Instant};

use crate::tab_manager::TabManager;

/// How loud a status message is; louder messages stay up longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn lifetime(self) -> Duration {
        let secs = match self {
            Severity::Success => 2,
            Severity::Info => 3,
            Severity::Warning => 5,
            Severity::Error => 7,
        };
        Duration::from_secs(secs)
    }

    /// Warnings and errors go to stderr in the terminal front end.
    pub fn is_problem(self) -> bool {
        matches!(self, Severity::Warning | Severity::Error)
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
    shown_at: Instant,
    lifetime: Duration,
}

impl StatusMessage {
    fn posted(severity: Severity, text: String, lifetime: Duration) -> Self {
        Self {
            text,
            severity,
            shown_at: Instant::now(),
            lifetime,
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) > self.lifetime
    }
}

/// Transient message line plus the fixed status fields of the window.
#[derive(Debug, Clone, Default)]
pub struct StatusBar {
    current_message: Option<StatusMessage>,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current message; it expires after the severity's lifetime.
    pub fn post(&mut self, severity: Severity, text: impl Into<String>) {
        let message = StatusMessage::posted(severity, text.into(), severity.lifetime());
        self.current_message = Some(message);
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.post(Severity::Info, text);
    }

    pub fn set_success(&mut self, text: impl Into<String>) {
        self.post(Severity::Success, text);
    }

    pub fn set_warning(&mut self, text: impl Into<String>) {
        self.post(Severity::Warning, text);
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.post(Severity::Error, text);
    }

    pub fn clear(&mut self) {
        self.current_message = None;
    }

    /// Drop the message once it has been on screen long enough.
    pub fn update(&mut self) {
        let now = Instant::now();
        if self.current_message.as_ref().is_some_and(|m| m.is_stale(now)) {
            self.current_message = None;
        }
    }

    /// Hand the pending message to a front end that prints it once.
    pub fn take(&mut self) -> Option<StatusMessage> {
        self.current_message.take()
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.current_message.as_ref()
    }

    pub fn has_message(&self) -> bool {
        self.current_message.is_some()
    }
}

/// `"Ln 3, Col 7"` for the caret of the active buffer.
pub fn cursor_label(tabs: &TabManager) -> String {
    let buffer = tabs.buffer();
    let (line, col) = buffer.line_col(buffer.cursor());
    format!("Ln {}, Col {}", line, col)
}

pub fn char_count_label(tabs: &TabManager) -> String {
    format!("{} characters", tabs.buffer().len_chars())
}

/// Window title: the active file's path, or its tab name.
pub fn window_title(tabs: &TabManager) -> String {
    match tabs.active_tab() {
        Some(tab) => match &tab.path {
            Some(path) => path.display().to_string(),
            None => tab.name.clone(),
        },
        None => String::new(),
    }
}

/// One line per tab: `"> 2 notes.md*"` marks the active, dirty tab.
pub fn tab_strip(tabs: &TabManager) -> Vec<String> {
    let active = tabs.active_id();
    tabs.tabs()
        .iter()
        .map(|tab| {
            let marker = if tab.id == active { ">" } else { " " };
            format!("{} {} {}", marker, tab.id, tab.label())
        })
        .collect()
}

/// The bottom status line: caret, size, encoding and preview mode.
pub fn render_line(tabs: &TabManager) -> String {
    let encoding = tabs
        .active_tab()
        .map(|tab| tab.encoding.as_str())
        .unwrap_or(crate::tab::DEFAULT_ENCODING);
    let mut line = format!(
        "{} | {} | {}",
        cursor_label(tabs),
        char_count_label(tabs),
        encoding
    );
    if tabs.active_tab().is_some_and(|tab| tab.markdown) {
        line.push_str(&format!(" | Markdown ({})", tabs.effective_preview().as_str()));
    }
    line
}
