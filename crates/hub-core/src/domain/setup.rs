//! Setup flow vocabulary.

use serde::{Deserialize, Serialize};

/// What the next `set_driver_user_data` submission on a socket means.
///
/// This is not the whole flow history, only the pending question.  A socket
/// with no registered step has either not started setup or already finished
/// it; that terminal state is represented by the step's *absence* in the
/// session registry, not by a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupStep {
    /// The user is filling in the driver's "new entity" form.
    NewEntity,
    /// The user is choosing a device and an action to apply to it.
    ReconfigureEntity,
    /// The user is editing the settings of the device chosen for `configure`.
    SaveReconfiguredEntity,
}

/// Actions offered on the reconfiguration page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupAction {
    Add,
    Configure,
    Delete,
    Reset,
}

impl SetupAction {
    /// All actions, in the order they are offered to the user.
    pub const ALL: [SetupAction; 4] = [
        SetupAction::Add,
        SetupAction::Configure,
        SetupAction::Delete,
        SetupAction::Reset,
    ];

    /// Parses a submitted action value, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SetupAction::Add => "add",
            SetupAction::Configure => "configure",
            SetupAction::Delete => "delete",
            SetupAction::Reset => "reset",
        }
    }

    /// Label shown in the action dropdown.
    pub fn label(self) -> &'static str {
        match self {
            SetupAction::Add => "Add a new device",
            SetupAction::Configure => "Configure selected device",
            SetupAction::Delete => "Delete selected device",
            SetupAction::Reset => "Reset all configured devices",
        }
    }
}

/// Outcome reported by every step handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupResult {
    /// The flow is complete and succeeded.
    Finalized,
    /// The handler sent a follow-up prompt; wait for the next message.
    Handled,
    /// The flow is complete and failed.
    Error,
}
