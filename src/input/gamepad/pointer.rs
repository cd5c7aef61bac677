//! Pointer and scroll emulation
//!
//! Active only in desktop-control mode. Each tick reads the active slot and:
//! - moves the cursor with the right stick
//! - scrolls smoothly with the left stick (fractional remainder carried over)
//! - scrolls one line per d-pad up/down press
//! - maps triggers and A/B to mouse buttons (right trigger or A = left click,
//!   left trigger or B = right click)
//!
//! The per-control state lives in [`EmulatorState`], owned by the emulator and
//! touched only from the poll thread.

use std::sync::Arc;
use tracing::debug;

use super::buttons::Button;
use super::conditioning::{stick_to_cursor_delta, Conditioning};
use super::slot::ControllerSlot;
use crate::emulation::{ButtonDirection, InputSink, MouseButton, WHEEL_DELTA};
use crate::mode::ControlMode;

/// Wheel units per accumulated scroll step
pub const SMOOTH_SCROLL_UNIT: i32 = WHEEL_DELTA / 10;

/// Wheel units per d-pad press (one line)
pub const LINE_SCROLL_DELTA: i32 = WHEEL_DELTA / 3;

/// Tuning for the pointer emulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSettings {
    /// Trigger value above which a trigger counts as a click
    pub click_threshold: f32,
    /// Pixels per tick at full right-stick deflection
    pub mouse_sensitivity: f32,
    /// Scroll steps per tick at full left-stick deflection
    pub scroll_sensitivity: f32,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            click_threshold: 0.5,
            mouse_sensitivity: 20.0,
            scroll_sensitivity: 15.0,
        }
    }
}

/// State carried between ticks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmulatorState {
    pub left_button_down: bool,
    pub right_button_down: bool,
    pub scroll_accumulator: f32,
    pub dpad_up_was_pressed: bool,
    pub dpad_down_was_pressed: bool,
}

impl EmulatorState {
    /// Add scroll input and take out whole steps
    ///
    /// # Returns
    /// The whole number of steps to emit (sign gives direction), or `None`
    /// while the accumulator magnitude is still below one step. The emitted
    /// part is subtracted; the fractional remainder stays for the next tick.
    pub fn accumulate_scroll(&mut self, amount: f32) -> Option<i32> {
        self.scroll_accumulator += amount;
        if self.scroll_accumulator.abs() < 1.0 {
            return None;
        }
        let steps = self.scroll_accumulator.trunc();
        self.scroll_accumulator -= steps;
        Some(steps as i32)
    }
}

pub struct PointerEmulator {
    sink: Arc<dyn InputSink>,
    conditioning: Conditioning,
    settings: PointerSettings,
    state: EmulatorState,
}

impl PointerEmulator {
    pub fn new(sink: Arc<dyn InputSink>, conditioning: Conditioning, settings: PointerSettings) -> Self {
        Self {
            sink,
            conditioning,
            settings,
            state: EmulatorState::default(),
        }
    }

    pub fn state(&self) -> &EmulatorState {
        &self.state
    }

    /// Run one tick
    ///
    /// `active` is the active device's slot, if any. Outside desktop-control
    /// mode, or with no active device, any held emulated button is released
    /// and nothing else happens.
    pub fn update(&mut self, active: Option<&ControllerSlot>, mode: ControlMode) {
        let slot = match active {
            Some(slot) if slot.connected && mode == ControlMode::DesktopControl => slot,
            _ => {
                self.release_all();
                return;
            }
        };

        self.move_cursor(slot);
        self.smooth_scroll(slot);
        self.line_scroll(slot);
        self.clicks(slot);
    }

    /// Release any emulated mouse button still held
    pub fn release_all(&mut self) {
        if self.state.left_button_down {
            self.sink.mouse_button(MouseButton::Left, ButtonDirection::Up);
            self.state.left_button_down = false;
            debug!("Mouse left button released (emulation inactive)");
        }
        if self.state.right_button_down {
            self.sink.mouse_button(MouseButton::Right, ButtonDirection::Up);
            self.state.right_button_down = false;
            debug!("Mouse right button released (emulation inactive)");
        }
    }

    fn move_cursor(&mut self, slot: &ControllerSlot) {
        let (x, y) = slot.right_stick(self.conditioning.deadzone, self.conditioning.shape);
        if x == 0.0 && y == 0.0 {
            return;
        }
        let Some((cx, cy)) = self.sink.cursor_position() else {
            return;
        };
        let (dx, dy) = stick_to_cursor_delta(x, y, self.settings.mouse_sensitivity);
        let (width, height) = self.sink.screen_size();
        let nx = (cx + dx).clamp(0, (width - 1).max(0));
        let ny = (cy + dy).clamp(0, (height - 1).max(0));
        self.sink.move_cursor_to(nx, ny);
    }

    fn smooth_scroll(&mut self, slot: &ControllerSlot) {
        let (_, y) = slot.left_stick(self.conditioning.deadzone, self.conditioning.shape);
        if y == 0.0 {
            return;
        }
        if let Some(steps) = self.state.accumulate_scroll(y * self.settings.scroll_sensitivity) {
            self.sink.wheel(steps * SMOOTH_SCROLL_UNIT);
        }
    }

    fn line_scroll(&mut self, slot: &ControllerSlot) {
        let up = slot.is_button_pressed(Button::DpadUp);
        let down = slot.is_button_pressed(Button::DpadDown);

        if up && !self.state.dpad_up_was_pressed {
            self.sink.wheel(LINE_SCROLL_DELTA);
            debug!("D-pad scroll up (line-by-line)");
        }
        if down && !self.state.dpad_down_was_pressed {
            self.sink.wheel(-LINE_SCROLL_DELTA);
            debug!("D-pad scroll down (line-by-line)");
        }

        self.state.dpad_up_was_pressed = up;
        self.state.dpad_down_was_pressed = down;
    }

    fn clicks(&mut self, slot: &ControllerSlot) {
        let threshold = self.conditioning.trigger_threshold;
        let left_intent = slot.right_trigger(threshold) > self.settings.click_threshold
            || slot.is_button_pressed(Button::A);
        let right_intent = slot.left_trigger(threshold) > self.settings.click_threshold
            || slot.is_button_pressed(Button::B);

        drive_button(&*self.sink, MouseButton::Left, left_intent, &mut self.state.left_button_down);
        drive_button(&*self.sink, MouseButton::Right, right_intent, &mut self.state.right_button_down);
    }
}

/// Two-state click machine: one down on press, one up on release
fn drive_button(sink: &dyn InputSink, button: MouseButton, intent: bool, down: &mut bool) {
    match (intent, *down) {
        (true, false) => {
            sink.mouse_button(button, ButtonDirection::Down);
            *down = true;
            debug!("Mouse {:?} button down", button);
        }
        (false, true) => {
            sink.mouse_button(button, ButtonDirection::Up);
            *down = false;
            debug!("Mouse {:?} button up", button);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::{SinkEvent, VirtualSink};
    use crate::input::gamepad::conditioning::StickDeadzone;
    use crate::input::gamepad::report::GamepadReport;
    use std::time::Instant;

    struct Harness {
        sink: Arc<VirtualSink>,
        emulator: PointerEmulator,
        slot: ControllerSlot,
        seq: u32,
    }

    impl Harness {
        fn new() -> Self {
            let sink = Arc::new(VirtualSink::new(1000, 800));
            let emulator = PointerEmulator::new(
                sink.clone(),
                Conditioning::default(),
                PointerSettings::default(),
            );
            Self { sink, emulator, slot: ControllerSlot::new(0), seq: 0 }
        }

        /// Feed one report and run a desktop-mode tick
        fn tick(&mut self, report: GamepadReport) {
            self.tick_in(report, ControlMode::DesktopControl);
        }

        fn tick_in(&mut self, report: GamepadReport, mode: ControlMode) {
            self.seq += 1;
            let report = GamepadReport { packet_number: self.seq, ..report };
            self.slot = self.slot.advanced(Some(report), Instant::now());
            self.emulator.update(Some(&self.slot), mode);
        }
    }

    fn buttons(bs: &[Button]) -> GamepadReport {
        GamepadReport { buttons: bs.iter().fold(0, |m, b| m | b.mask()), ..Default::default() }
    }

    #[test]
    fn test_cursor_moves_and_clamps() {
        let mut h = Harness::new();
        // Full right, full up
        h.tick(GamepadReport { thumb_rx: 32767, thumb_ry: 32767, ..Default::default() });
        assert_eq!(h.sink.cursor_position(), Some((520, 380)));

        for _ in 0..100 {
            h.tick(GamepadReport { thumb_rx: 32767, thumb_ry: 32767, ..Default::default() });
        }
        assert_eq!(h.sink.cursor_position(), Some((999, 0)));
    }

    #[test]
    fn test_stick_at_rest_emits_nothing() {
        let mut h = Harness::new();
        h.tick(GamepadReport { thumb_rx: 3000, thumb_ry: -3000, thumb_ly: 2000, ..Default::default() });
        assert!(h.sink.events().is_empty());
    }

    #[test]
    fn test_scroll_accumulator_carries_remainder() {
        let mut state = EmulatorState::default();
        let mut emitted = 0;
        let mut cumulative = 0.0f32;
        for _ in 0..8 {
            cumulative += 0.7;
            if let Some(steps) = state.accumulate_scroll(0.7) {
                emitted += steps;
            }
        }
        assert_eq!(emitted, 5);
        assert!((cumulative - emitted as f32 - state.scroll_accumulator).abs() < 1e-4);
        assert!(state.scroll_accumulator.abs() < 1.0);
    }

    #[test]
    fn test_full_stick_scroll_has_no_drift() {
        let mut h = Harness::new();
        for _ in 0..8 {
            h.tick(GamepadReport { thumb_ly: 32767, ..Default::default() });
        }
        let total: i32 = h
            .sink
            .events()
            .iter()
            .map(|e| match e {
                SinkEvent::Wheel(d) => *d,
                _ => 0,
            })
            .sum();
        assert_eq!(total, 8 * 15 * SMOOTH_SCROLL_UNIT);
        assert_eq!(h.emulator.state().scroll_accumulator, 0.0);
    }

    #[test]
    fn test_negative_scroll_steps() {
        let mut state = EmulatorState::default();
        assert_eq!(state.accumulate_scroll(-0.6), None);
        assert_eq!(state.accumulate_scroll(-0.6), Some(-1));
        assert!((state.scroll_accumulator + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_dpad_scrolls_once_per_press() {
        let mut h = Harness::new();
        for _ in 0..4 {
            h.tick(buttons(&[Button::DpadUp]));
        }
        h.tick(buttons(&[]));
        h.tick(buttons(&[Button::DpadDown]));
        assert_eq!(
            h.sink.events(),
            vec![SinkEvent::Wheel(LINE_SCROLL_DELTA), SinkEvent::Wheel(-LINE_SCROLL_DELTA)]
        );
    }

    #[test]
    fn test_click_held_five_ticks_emits_one_down_one_up() {
        let mut h = Harness::new();
        for _ in 0..5 {
            h.tick(GamepadReport { right_trigger: 255, ..Default::default() });
        }
        h.tick(GamepadReport::default());
        assert_eq!(
            h.sink.events(),
            vec![
                SinkEvent::Mouse(MouseButton::Left, ButtonDirection::Down),
                SinkEvent::Mouse(MouseButton::Left, ButtonDirection::Up),
            ]
        );
    }

    #[test]
    fn test_trigger_roles_are_swapped() {
        let mut h = Harness::new();
        h.tick(GamepadReport { left_trigger: 255, ..Default::default() });
        h.tick(buttons(&[Button::B]));
        h.tick(buttons(&[]));
        assert_eq!(
            h.sink.events(),
            vec![
                SinkEvent::Mouse(MouseButton::Right, ButtonDirection::Down),
                SinkEvent::Mouse(MouseButton::Right, ButtonDirection::Up),
            ]
        );
    }

    #[test]
    fn test_trigger_below_click_threshold_does_not_click() {
        let mut h = Harness::new();
        // 180 rescales to (180-128)/127 ≈ 0.41
        h.tick(GamepadReport { right_trigger: 180, ..Default::default() });
        assert!(h.sink.events().is_empty());
    }

    #[test]
    fn test_leaving_desktop_mode_releases_held_button() {
        let mut h = Harness::new();
        h.tick(buttons(&[Button::A]));
        h.tick_in(buttons(&[Button::A]), ControlMode::Gamepad);
        h.tick_in(buttons(&[Button::A]), ControlMode::Gamepad);
        assert_eq!(
            h.sink.events(),
            vec![
                SinkEvent::Mouse(MouseButton::Left, ButtonDirection::Down),
                SinkEvent::Mouse(MouseButton::Left, ButtonDirection::Up),
            ]
        );
        assert!(!h.emulator.state().left_button_down);
    }

    #[test]
    fn test_gamepad_mode_is_inert() {
        let mut h = Harness::new();
        h.tick_in(
            GamepadReport { thumb_rx: 32767, thumb_ly: 32767, right_trigger: 255, ..Default::default() },
            ControlMode::Gamepad,
        );
        assert!(h.sink.events().is_empty());
    }

    #[test]
    fn test_radial_deadzone_moves_diagonally() {
        let sink = Arc::new(VirtualSink::new(1000, 800));
        let conditioning = Conditioning::from_raw(8000, StickDeadzone::Radial, 128);
        let mut emulator = PointerEmulator::new(sink.clone(), conditioning, PointerSettings::default());
        let slot = ControllerSlot::new(0).advanced(
            Some(GamepadReport { packet_number: 1, thumb_rx: 7000, thumb_ry: 7000, ..Default::default() }),
            Instant::now(),
        );
        emulator.update(Some(&slot), ControlMode::DesktopControl);
        assert_eq!(sink.events().len(), 1);
    }
}
