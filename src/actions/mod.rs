//! Action execution
//!
//! Buttons are bound to abstract action identifiers; what an identifier
//! actually does is up to the [`ActionExecutor`] the engine was started with.
//! - [`DesktopActions`]: real side effects (media keys, processes, overlay)
//! - [`ConsoleActions`]: logs each action, used for dry runs

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod console;
pub mod desktop;

pub use console::ConsoleActions;
pub use desktop::DesktopActions;

/// Abstract operation a button can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    /// Bound but does nothing
    None,
    ToggleOverlay,
    VolumeUp,
    VolumeDown,
    VolumeMute,
    BrightnessUp,
    BrightnessDown,
    PowerShutdown,
    PowerSleep,
    /// Launch the program named by the payload
    LaunchApp,
    NextDisplay,
    TvPower,
    TvInput,
    BrowserBack,
    BrowserForward,
    /// Close the on-screen keyboard if open, open it otherwise
    ToggleOsk,
    /// Run the payload as a shell command
    CustomCommand,
}

impl ActionId {
    pub fn name(self) -> &'static str {
        match self {
            ActionId::None => "none",
            ActionId::ToggleOverlay => "toggle_overlay",
            ActionId::VolumeUp => "volume_up",
            ActionId::VolumeDown => "volume_down",
            ActionId::VolumeMute => "volume_mute",
            ActionId::BrightnessUp => "brightness_up",
            ActionId::BrightnessDown => "brightness_down",
            ActionId::PowerShutdown => "power_shutdown",
            ActionId::PowerSleep => "power_sleep",
            ActionId::LaunchApp => "launch_app",
            ActionId::NextDisplay => "next_display",
            ActionId::TvPower => "tv_power",
            ActionId::TvInput => "tv_input",
            ActionId::BrowserBack => "browser_back",
            ActionId::BrowserForward => "browser_forward",
            ActionId::ToggleOsk => "toggle_osk",
            ActionId::CustomCommand => "custom_command",
        }
    }

    /// Actions that can shut down or suspend the machine
    pub fn is_power(self) -> bool {
        matches!(self, ActionId::PowerShutdown | ActionId::PowerSleep)
    }

    /// Actions that cannot run without a payload
    pub fn needs_payload(self) -> bool {
        matches!(self, ActionId::LaunchApp | ActionId::CustomCommand)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned by an action executor
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action '{0}' is not supported on this system")]
    Unsupported(ActionId),

    #[error("action '{0}' requires a payload")]
    MissingPayload(ActionId),

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("action '{action}' failed: {reason}")]
    Failed { action: ActionId, reason: String },
}

/// Runs actions on behalf of the dispatcher
///
/// Called synchronously from the poll thread, so implementations must return
/// promptly: spawn processes, never wait on them.
pub trait ActionExecutor: Send {
    /// Execute `action` with the mapping's optional payload
    fn execute(&mut self, action: ActionId, payload: Option<&str>) -> Result<(), ActionError>;
}

/// Non-empty payload or `MissingPayload`
pub(crate) fn require_payload(action: ActionId, payload: Option<&str>) -> Result<&str, ActionError> {
    match payload.map(str::trim) {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(ActionError::MissingPayload(action)),
    }
}
