// Tabpad library exports

pub mod app;
pub mod buffer;
pub mod close_gate;
pub mod command;
pub mod config;
pub mod fs_host;
pub mod host;
pub mod preferences;
pub mod search;
pub mod session;
pub mod status;
pub mod tab;
pub mod tab_manager;

#[cfg(test)]
mod test_support;

pub use app::App;
pub use buffer::DocumentBuffer;
pub use close_gate::{CloseGate, GateState, SaveChoice};
pub use command::{CommandProcessor, CommandTable};
pub use config::{AppConfig, ConfigStore, WindowBounds};
pub use fs_host::{Dialogs, FsHost};
pub use host::{FilePayload, HostBridge, SavedFile};
pub use preferences::ThemeConfig;
pub use search::{SearchEngine, SearchMatch};
pub use session::{SessionSnapshot, SessionTab};
pub use tab::{PreviewMode, Tab, TabId};
pub use tab_manager::{OpenOutcome, TabManager};
