//! Save-before-close confirmation for dirty tabs.

use std::fmt;

/// Answer to "Do you want to save changes?". The numeric codes are the ones
/// the dialog buttons report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Save = 0,
    DontSave = 1,
    Cancel = 2,
}

impl SaveChoice {
    /// Unknown codes are treated as `Cancel`, which never loses data.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Save,
            1 => Self::DontSave,
            _ => Self::Cancel,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    AwaitingUserChoice,
    Saving,
    Discarding,
    Cancelled,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::AwaitingUserChoice => "awaiting choice",
            Self::Saving => "saving",
            Self::Discarding => "discarding",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Tracks one close request through the confirmation protocol.
#[derive(Debug, Default)]
pub struct CloseGate {
    state: GateState,
}

impl CloseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// A dirty tab asked to close: the prompt is now showing.
    pub fn begin(&mut self) {
        self.state = GateState::AwaitingUserChoice;
    }

    /// Apply the user's answer and return the new state.
    pub fn choose(&mut self, choice: SaveChoice) -> GateState {
        if self.state != GateState::AwaitingUserChoice {
            log::warn!("Ignoring {:?} while the close gate is {}", choice, self.state);
            return self.state;
        }
        self.state = match choice {
            SaveChoice::Save => GateState::Saving,
            SaveChoice::DontSave => GateState::Discarding,
            SaveChoice::Cancel => GateState::Cancelled,
        };
        self.state
    }

    /// Result of the save started by `Save`. A save that did not happen
    /// cancels the close.
    pub fn save_finished(&mut self, saved: bool) -> GateState {
        if self.state == GateState::Saving && !saved {
            self.state = GateState::Cancelled;
        }
        self.state
    }

    /// Whether the tab may now be removed.
    pub fn allows_close(&self) -> bool {
        matches!(self.state, GateState::Saving | GateState::Discarding)
    }

    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }
}
