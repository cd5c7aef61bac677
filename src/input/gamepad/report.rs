//! Raw controller report
//!
//! One poll's worth of controller state. Values are kept raw (unconditioned)
//! so the slot store holds exactly what the driver returned.

use super::buttons::Button;

/// Raw controller state at one poll, tagged with the driver's packet sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadReport {
    /// Driver-assigned sequence, bumped on every physical state change
    pub packet_number: u32,
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl GamepadReport {
    /// Whether `button` is held in this report
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    /// Same physical state, ignoring the packet sequence
    pub fn same_state(&self, other: &GamepadReport) -> bool {
        GamepadReport {
            packet_number: other.packet_number,
            ..*self
        } == *other
    }
}
