//! Controller button identifiers
//!
//! Buttons are disjoint bit flags in the report's button mask, using the XInput
//! bit layout so XInput reports can be stored without translation. Other
//! backends (gilrs) translate into the same layout.
//!
//! Config files name buttons in snake_case (`a`, `left_shoulder`, `dpad_up`).
//! Short names (`lb`, `rb`, `plus`, `minus`, `l3`, `r3`) are
//! accepted as aliases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single controller button, valued as its bit in the report mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum Button {
    DpadUp = 0x0001,
    DpadDown = 0x0002,
    DpadLeft = 0x0004,
    DpadRight = 0x0008,
    #[serde(alias = "plus")]
    Start = 0x0010,
    #[serde(alias = "minus")]
    Back = 0x0020,
    #[serde(alias = "l3")]
    LeftThumb = 0x0040,
    #[serde(alias = "r3")]
    RightThumb = 0x0080,
    #[serde(alias = "lb")]
    LeftShoulder = 0x0100,
    #[serde(alias = "rb")]
    RightShoulder = 0x0200,
    A = 0x1000,
    B = 0x2000,
    X = 0x4000,
    Y = 0x8000,
}

impl Button {
    /// Every button, in mask bit order
    pub const ALL: [Button; 14] = [
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
        Button::Start,
        Button::Back,
        Button::LeftThumb,
        Button::RightThumb,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
    ];

    /// Bit mask of this button in a report
    pub fn mask(self) -> u16 {
        self as u16
    }

    /// Short name used in logs (matches the config spelling)
    pub fn name(self) -> &'static str {
        match self {
            Button::DpadUp => "dpad_up",
            Button::DpadDown => "dpad_down",
            Button::DpadLeft => "dpad_left",
            Button::DpadRight => "dpad_right",
            Button::Start => "start",
            Button::Back => "back",
            Button::LeftThumb => "left_thumb",
            Button::RightThumb => "right_thumb",
            Button::LeftShoulder => "left_shoulder",
            Button::RightShoulder => "right_shoulder",
            Button::A => "a",
            Button::B => "b",
            Button::X => "x",
            Button::Y => "y",
        }
    }

    /// Buttons set in a raw mask, in bit order
    pub fn pressed_in(mask: u16) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |b| mask & b.mask() != 0)
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
