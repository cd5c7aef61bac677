//! Edge derivation between two consecutive reports
//!
//! A report only counts as new when its packet sequence moved. Two reports
//! carrying the same sequence never produce edges, whatever their button
//! masks say, so a driver handing back a stale report cannot fake a press.

use super::buttons::Button;
use super::report::GamepadReport;

/// Whether the device reported a new physical state since `previous`
pub fn state_changed(current: &GamepadReport, previous: &GamepadReport) -> bool {
    current.packet_number != previous.packet_number
}

/// `button` went down between `previous` and `current`
pub fn just_pressed(current: &GamepadReport, previous: &GamepadReport, button: Button) -> bool {
    state_changed(current, previous) && current.is_pressed(button) && !previous.is_pressed(button)
}

/// `button` went up between `previous` and `current`
pub fn just_released(current: &GamepadReport, previous: &GamepadReport, button: Button) -> bool {
    state_changed(current, previous) && !current.is_pressed(button) && previous.is_pressed(button)
}

/// All button edges between two reports, as masks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges {
    pub pressed: u16,
    pub released: u16,
}

impl Edges {
    pub fn between(current: &GamepadReport, previous: &GamepadReport) -> Self {
        if !state_changed(current, previous) {
            return Self::default();
        }
        Self {
            pressed: current.buttons & !previous.buttons,
            released: !current.buttons & previous.buttons,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pressed == 0 && self.released == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn report(packet_number: u32, buttons: u16) -> GamepadReport {
        GamepadReport { packet_number, buttons, ..Default::default() }
    }

    fn any_button() -> impl Strategy<Value = Button> {
        prop::sample::select(Button::ALL.to_vec())
    }

    #[test]
    fn test_press_then_release_sequence() {
        let frames = [
            report(1, 0),
            report(2, Button::A.mask()),
            report(3, Button::A.mask()),
            report(4, 0),
        ];

        assert!(just_pressed(&frames[1], &frames[0], Button::A));
        assert!(!just_pressed(&frames[2], &frames[1], Button::A));
        assert!(!just_released(&frames[2], &frames[1], Button::A));
        assert!(just_released(&frames[3], &frames[2], Button::A));
    }

    #[test]
    fn test_edges_masks() {
        let prev = report(1, Button::A.mask() | Button::B.mask());
        let cur = report(2, Button::B.mask() | Button::X.mask());
        let edges = Edges::between(&cur, &prev);
        assert_eq!(edges.pressed, Button::X.mask());
        assert_eq!(edges.released, Button::A.mask());
    }

    proptest! {
        #[test]
        fn newly_set_bit_is_just_pressed(
            button in any_button(),
            others in any::<u16>(),
            seq in 0u32..u32::MAX,
        ) {
            let prev = report(seq, others & !button.mask());
            let cur = report(seq + 1, others | button.mask());
            prop_assert!(just_pressed(&cur, &prev, button));
            prop_assert!(!just_released(&cur, &prev, button));
        }

        #[test]
        fn newly_cleared_bit_is_just_released(
            button in any_button(),
            others in any::<u16>(),
            seq in 0u32..u32::MAX,
        ) {
            let prev = report(seq, others | button.mask());
            let cur = report(seq + 1, others & !button.mask());
            prop_assert!(just_released(&cur, &prev, button));
            prop_assert!(!just_pressed(&cur, &prev, button));
        }

        #[test]
        fn same_sequence_never_yields_edges(
            prev_buttons in any::<u16>(),
            cur_buttons in any::<u16>(),
            seq in any::<u32>(),
        ) {
            let prev = report(seq, prev_buttons);
            let cur = report(seq, cur_buttons);
            prop_assert!(!state_changed(&cur, &prev));
            for button in Button::ALL {
                prop_assert!(!just_pressed(&cur, &prev, button));
                prop_assert!(!just_released(&cur, &prev, button));
            }
            prop_assert!(Edges::between(&cur, &prev).is_empty());
        }
    }
}
