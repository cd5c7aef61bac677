//! gilrs device backend
//!
//! Covers controllers XInput cannot see and every non-Windows platform.
//! gilrs is event driven, so this backend:
//! - drains gilrs events at the start of each tick (keeps gamepad state fresh)
//! - pins each connected gamepad to the lowest free slot until it disconnects
//! - synthesizes a report from current button/axis state on each query
//! - bumps its own packet sequence whenever the synthesized state changes
//!
//! Face buttons follow the positional Xbox layout gilrs reports
//! (South = A, East = B, West = X, North = Y).

use gilrs::{Axis, Button as GilrsButton, Event, EventType, Gamepad, GamepadId, Gilrs};
use tracing::{debug, info, trace, warn};

use super::buttons::Button;
use super::device::{DeviceBackend, DeviceError};
use super::report::GamepadReport;
use super::slot::MAX_CONTROLLERS;

/// Map a gilrs button to the report button it sets
pub fn gilrs_button_to_button(button: GilrsButton) -> Option<Button> {
    match button {
        GilrsButton::South => Some(Button::A),
        GilrsButton::East => Some(Button::B),
        GilrsButton::West => Some(Button::X),
        GilrsButton::North => Some(Button::Y),
        GilrsButton::LeftTrigger => Some(Button::LeftShoulder),
        GilrsButton::RightTrigger => Some(Button::RightShoulder),
        GilrsButton::Select => Some(Button::Back),
        GilrsButton::Start => Some(Button::Start),
        GilrsButton::LeftThumb => Some(Button::LeftThumb),
        GilrsButton::RightThumb => Some(Button::RightThumb),
        GilrsButton::DPadUp => Some(Button::DpadUp),
        GilrsButton::DPadDown => Some(Button::DpadDown),
        GilrsButton::DPadLeft => Some(Button::DpadLeft),
        GilrsButton::DPadRight => Some(Button::DpadRight),
        // Triggers are analog in the report; Mode/C/Z have no report bit
        _ => None,
    }
}

const MAPPED_BUTTONS: [GilrsButton; 14] = [
    GilrsButton::South,
    GilrsButton::East,
    GilrsButton::West,
    GilrsButton::North,
    GilrsButton::LeftTrigger,
    GilrsButton::RightTrigger,
    GilrsButton::Select,
    GilrsButton::Start,
    GilrsButton::LeftThumb,
    GilrsButton::RightThumb,
    GilrsButton::DPadUp,
    GilrsButton::DPadDown,
    GilrsButton::DPadLeft,
    GilrsButton::DPadRight,
];

/// Convert a normalized gilrs axis value to raw stick units
fn axis_to_raw(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Convert a normalized trigger value to raw trigger units
fn trigger_to_raw(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Build a report (without sequence) from a gamepad's current state
fn read_gamepad(gamepad: &Gamepad<'_>) -> GamepadReport {
    let buttons = MAPPED_BUTTONS
        .iter()
        .filter(|b| gamepad.is_pressed(**b))
        .filter_map(|b| gilrs_button_to_button(*b))
        .fold(0u16, |mask, b| mask | b.mask());

    let trigger = |b: GilrsButton| gamepad.button_data(b).map_or(0.0, |d| d.value());

    GamepadReport {
        packet_number: 0,
        buttons,
        left_trigger: trigger_to_raw(trigger(GilrsButton::LeftTrigger2)),
        right_trigger: trigger_to_raw(trigger(GilrsButton::RightTrigger2)),
        thumb_lx: axis_to_raw(gamepad.value(Axis::LeftStickX)),
        thumb_ly: axis_to_raw(gamepad.value(Axis::LeftStickY)),
        thumb_rx: axis_to_raw(gamepad.value(Axis::RightStickX)),
        thumb_ry: axis_to_raw(gamepad.value(Axis::RightStickY)),
    }
}

/// Pins gamepad ids to slot indices
#[derive(Debug)]
struct SlotAssignments<Id> {
    ids: [Option<Id>; MAX_CONTROLLERS],
}

impl<Id> Default for SlotAssignments<Id> {
    fn default() -> Self {
        Self { ids: std::array::from_fn(|_| None) }
    }
}

impl<Id: Copy + PartialEq> SlotAssignments<Id> {
    /// Assign `id` to the lowest free slot (no-op if already assigned)
    fn assign(&mut self, id: Id) -> Option<usize> {
        if let Some(idx) = self.ids.iter().position(|s| *s == Some(id)) {
            return Some(idx);
        }
        let idx = self.ids.iter().position(Option::is_none)?;
        self.ids[idx] = Some(id);
        Some(idx)
    }

    fn release(&mut self, id: Id) -> Option<usize> {
        let idx = self.ids.iter().position(|s| *s == Some(id))?;
        self.ids[idx] = None;
        Some(idx)
    }

    fn get(&self, index: usize) -> Option<Id> {
        self.ids.get(index).copied().flatten()
    }
}

/// Backend over gilrs
pub struct GilrsBackend {
    gilrs: Gilrs,
    slots: SlotAssignments<GamepadId>,
    last_state: [GamepadReport; MAX_CONTROLLERS],
    sequence: [u32; MAX_CONTROLLERS],
}

impl GilrsBackend {
    /// Initialize gilrs and pin already-connected gamepads
    pub fn new() -> Result<Self, DeviceError> {
        let gilrs = Gilrs::new().map_err(|e| DeviceError::Unavailable {
            backend: "gilrs",
            reason: format!("{:?}", e),
        })?;
        debug!("gilrs initialized");

        let mut backend = Self {
            gilrs,
            slots: SlotAssignments::default(),
            last_state: [GamepadReport::default(); MAX_CONTROLLERS],
            sequence: [0; MAX_CONTROLLERS],
        };

        let ids: Vec<(GamepadId, String)> = backend
            .gilrs
            .gamepads()
            .filter(|(_, gp)| gp.is_connected())
            .map(|(id, gp)| (id, gp.name().to_string()))
            .collect();
        for (id, name) in ids {
            backend.pin(id, &name);
        }

        Ok(backend)
    }

    fn pin(&mut self, id: GamepadId, name: &str) {
        match self.slots.assign(id) {
            Some(idx) => debug!("gilrs gamepad \"{}\" ({:?}) pinned to slot {}", name, id, idx),
            None => warn!("⚠️  No free slot for gilrs gamepad \"{}\" ({:?})", name, id),
        }
    }
}

impl DeviceBackend for GilrsBackend {
    fn name(&self) -> &'static str {
        "gilrs"
    }

    fn begin_tick(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    let name = self
                        .gilrs
                        .connected_gamepad(id)
                        .map(|gp| gp.name().to_string())
                        .unwrap_or_else(|| "Unknown".to_string());
                    self.pin(id, &name);
                }
                EventType::Disconnected => {
                    if let Some(idx) = self.slots.release(id) {
                        trace!("gilrs gamepad {:?} released slot {}", id, idx);
                    }
                }
                _ => {}
            }
        }
    }

    fn query(&mut self, index: usize) -> Result<GamepadReport, DeviceError> {
        if index >= MAX_CONTROLLERS {
            return Err(DeviceError::InvalidIndex(index));
        }
        let id = self.slots.get(index).ok_or(DeviceError::Disconnected(index))?;
        let gamepad = match self.gilrs.connected_gamepad(id) {
            Some(gp) => gp,
            None => {
                self.slots.release(id);
                info!("gilrs gamepad {:?} vanished from slot {}", id, index);
                return Err(DeviceError::Disconnected(index));
            }
        };

        let report = read_gamepad(&gamepad);
        if !report.same_state(&self.last_state[index]) {
            self.sequence[index] = self.sequence[index].wrapping_add(1);
        }
        let report = GamepadReport {
            packet_number: self.sequence[index],
            ..report
        };
        self.last_state[index] = report;
        Ok(report)
    }

    fn describe(&self, index: usize) -> Option<String> {
        let id = self.slots.get(index)?;
        let gamepad = self.gilrs.connected_gamepad(id)?;
        Some(format!(
            "\"{}\" (id {:?}, power {:?})",
            gamepad.name(),
            id,
            gamepad.power_info()
        ))
    }

    fn set_vibration(&mut self, index: usize, left: f32, right: f32) -> Result<(), DeviceError> {
        // Force feedback is not wired through gilrs; accepted and ignored
        trace!("gilrs slot {} vibration {:.2}/{:.2} ignored", index, left, right);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_buttons_positional_layout() {
        assert_eq!(gilrs_button_to_button(GilrsButton::South), Some(Button::A));
        assert_eq!(gilrs_button_to_button(GilrsButton::East), Some(Button::B));
        assert_eq!(gilrs_button_to_button(GilrsButton::West), Some(Button::X));
        assert_eq!(gilrs_button_to_button(GilrsButton::North), Some(Button::Y));
        assert_eq!(gilrs_button_to_button(GilrsButton::LeftTrigger2), None);
    }

    #[test]
    fn test_mapped_buttons_cover_every_report_bit() {
        let mask = MAPPED_BUTTONS
            .iter()
            .filter_map(|b| gilrs_button_to_button(*b))
            .fold(0u16, |m, b| m | b.mask());
        let all = Button::ALL.iter().fold(0u16, |m, b| m | b.mask());
        assert_eq!(mask, all);
    }

    #[test]
    fn test_value_scaling() {
        assert_eq!(axis_to_raw(1.0), 32767);
        assert_eq!(axis_to_raw(-1.0), -32767);
        assert_eq!(axis_to_raw(2.0), 32767);
        assert_eq!(trigger_to_raw(1.0), 255);
        assert_eq!(trigger_to_raw(0.5), 128);
        assert_eq!(trigger_to_raw(-0.1), 0);
    }

    #[test]
    fn test_slot_assignment_lowest_free() {
        let mut slots = SlotAssignments::<u32>::default();
        let (a, b, c) = (10, 11, 12);

        assert_eq!(slots.assign(a), Some(0));
        assert_eq!(slots.assign(b), Some(1));
        assert_eq!(slots.assign(a), Some(0));

        assert_eq!(slots.release(a), Some(0));
        assert_eq!(slots.assign(c), Some(0));
        assert_eq!(slots.get(1), Some(b));
    }
}
