//! Interaction mode and overlay visibility
//!
//! The overlay window itself lives outside this crate. What the input engine
//! needs from it is a handful of flags: whether the overlay is showing, which
//! interaction mode is current, and a way to request either to flip.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// What the controller drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Controller input goes to games; only mapped actions fire
    #[default]
    Gamepad,
    /// Sticks, triggers and d-pad drive the mouse
    DesktopControl,
}

impl ControlMode {
    pub fn display_name(self) -> &'static str {
        match self {
            ControlMode::Gamepad => "Gamepad Mode",
            ControlMode::DesktopControl => "Desktop Control",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ControlMode::Gamepad => ControlMode::DesktopControl,
            ControlMode::DesktopControl => ControlMode::Gamepad,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Mode/overlay state as seen by the engine
///
/// Implementations are shared between the poll thread and whatever owns the
/// overlay, so every method takes `&self`.
pub trait ModeControl: Send + Sync {
    fn is_overlay_visible(&self) -> bool;

    fn current_mode(&self) -> ControlMode;

    /// Flip between gamepad and desktop-control mode
    fn request_mode_toggle(&self);

    /// Show the overlay if hidden, hide it if shown
    fn request_overlay_toggle(&self);
}

fn mode_from_flag(desktop_control: bool) -> ControlMode {
    if desktop_control {
        ControlMode::DesktopControl
    } else {
        ControlMode::Gamepad
    }
}

/// Lock-free `ModeControl` backed by two atomics
#[derive(Debug, Default)]
pub struct SharedMode {
    overlay_visible: AtomicBool,
    desktop_control: AtomicBool,
}

impl SharedMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_overlay_visible(&self, visible: bool) {
        self.overlay_visible.store(visible, Ordering::SeqCst);
    }
}

impl ModeControl for SharedMode {
    fn is_overlay_visible(&self) -> bool {
        self.overlay_visible.load(Ordering::SeqCst)
    }

    fn current_mode(&self) -> ControlMode {
        mode_from_flag(self.desktop_control.load(Ordering::SeqCst))
    }

    fn request_mode_toggle(&self) {
        let was_desktop = self.desktop_control.fetch_xor(true, Ordering::SeqCst);
        info!("🔀 Mode changed to {}", mode_from_flag(was_desktop).toggled());
    }

    fn request_overlay_toggle(&self) {
        let was_visible = self.overlay_visible.fetch_xor(true, Ordering::SeqCst);
        info!("🪟 Overlay {}", if was_visible { "hidden" } else { "shown" });
    }
}
