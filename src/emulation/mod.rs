//! Pointer and keyboard emulation primitives
//!
//! The pointer emulator and desktop actions never talk to the OS directly;
//! they go through an [`InputSink`]. On Windows that is [`WindowsSink`]
//! (`SendInput` and friends). Everywhere else, and in dry runs, a
//! [`VirtualSink`] keeps a virtual cursor and logs what would have been sent.

use std::sync::Arc;
use tracing::debug;

pub mod virtual_sink;
#[cfg(windows)]
pub mod win32;

pub use virtual_sink::{SinkEvent, VirtualSink};
#[cfg(windows)]
pub use win32::WindowsSink;

/// Wheel units per notch
pub const WHEEL_DELTA: i32 = 120;

/// Emulated mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonDirection {
    Down,
    Up,
}

/// Keys the desktop actions can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    VolumeUp,
    VolumeDown,
    VolumeMute,
    BrowserBack,
    BrowserForward,
}

impl Key {
    /// Windows virtual-key code
    pub fn virtual_key(self) -> u16 {
        match self {
            Key::BrowserBack => 0xA6,
            Key::BrowserForward => 0xA7,
            Key::VolumeMute => 0xAD,
            Key::VolumeDown => 0xAE,
            Key::VolumeUp => 0xAF,
        }
    }
}

/// OS input injection used by the pointer emulator and desktop actions
///
/// Errors from the OS are logged by the implementation; emulation is
/// fire-and-forget from the caller's point of view.
pub trait InputSink: Send + Sync {
    /// Current cursor position, `None` when it cannot be read
    fn cursor_position(&self) -> Option<(i32, i32)>;

    /// Primary screen size in pixels
    fn screen_size(&self) -> (i32, i32);

    fn move_cursor_to(&self, x: i32, y: i32);

    fn mouse_button(&self, button: MouseButton, direction: ButtonDirection);

    /// Vertical wheel in wheel units (positive scrolls up)
    fn wheel(&self, delta: i32);

    fn key(&self, key: Key, direction: ButtonDirection);

    /// Press and release a key
    fn tap_key(&self, key: Key) {
        self.key(key, ButtonDirection::Down);
        self.key(key, ButtonDirection::Up);
    }
}

/// Pick the sink for this platform and run mode
///
/// # Arguments
/// * `dry_run` - Force the virtual sink even where real injection exists
/// * `bounds` - Virtual screen size used by the virtual sink
pub fn platform_sink(dry_run: bool, bounds: (i32, i32)) -> Arc<dyn InputSink> {
    #[cfg(windows)]
    if !dry_run {
        debug!("Using Windows input sink");
        return Arc::new(WindowsSink::new());
    }

    debug!(
        "Using virtual input sink ({}x{}, dry_run={})",
        bounds.0, bounds.1, dry_run
    );
    Arc::new(VirtualSink::new(bounds.0, bounds.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_key_sends_down_then_up() {
        let sink = VirtualSink::new(100, 100);
        sink.tap_key(Key::BrowserBack);
        assert_eq!(
            sink.take_events(),
            vec![
                SinkEvent::Key(Key::BrowserBack, ButtonDirection::Down),
                SinkEvent::Key(Key::BrowserBack, ButtonDirection::Up),
            ]
        );
    }

    #[test]
    fn test_dry_run_sink_is_virtual() {
        let sink = platform_sink(true, (640, 480));
        assert_eq!(sink.screen_size(), (640, 480));
    }
}
