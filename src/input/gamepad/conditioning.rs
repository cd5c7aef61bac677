//! Signal conditioning for analog controls (deadzone, triggers, cursor deltas)
//!
//! Pure functions only. Raw stick values arrive as `i16` and triggers as `u8`;
//! everything leaves normalized to `[-1.0, 1.0]` (sticks) or `[0.0, 1.0]`
//! (triggers).

use serde::{Deserialize, Serialize};

/// Largest positive raw stick value
pub const STICK_MAX: f32 = 32767.0;

/// Default stick deadzone in raw units (XInput left-stick recommendation)
pub const DEFAULT_STICK_DEADZONE_RAW: i16 = 8000;

/// Default trigger threshold in raw units
pub const DEFAULT_TRIGGER_THRESHOLD: u8 = 128;

/// How the stick deadzone is shaped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StickDeadzone {
    /// Deadzone applied to each axis independently (square dead region)
    #[default]
    Axial,
    /// Circular deadzone with radial rescaling
    Radial,
}

/// Conditioning parameters shared by every reader of stick and trigger values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditioning {
    /// Stick deadzone as a fraction of full deflection
    pub deadzone: f32,
    pub shape: StickDeadzone,
    /// Raw trigger threshold (0-255)
    pub trigger_threshold: u8,
}

impl Conditioning {
    /// Build from a raw deadzone in stick units
    pub fn from_raw(deadzone_raw: i16, shape: StickDeadzone, trigger_threshold: u8) -> Self {
        Self {
            deadzone: (deadzone_raw.max(0) as f32 / STICK_MAX).min(0.99),
            shape,
            trigger_threshold,
        }
    }
}

impl Default for Conditioning {
    fn default() -> Self {
        Self::from_raw(
            DEFAULT_STICK_DEADZONE_RAW,
            StickDeadzone::default(),
            DEFAULT_TRIGGER_THRESHOLD,
        )
    }
}

/// Apply a per-axis deadzone to a normalized value
///
/// Values inside `[-deadzone, deadzone]` map to 0. Values outside are rescaled
/// so the edge of the deadzone maps to 0 and full deflection stays at ±1.
///
/// # Arguments
/// * `value` - Normalized axis value (-1.0 to 1.0)
/// * `deadzone` - Deadzone half-width (0.0 to <1.0)
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value > deadzone {
        (value - deadzone) / (1.0 - deadzone)
    } else if value < -deadzone {
        (value + deadzone) / (1.0 - deadzone)
    } else {
        0.0
    }
}

/// Normalize a raw stick axis to `[-1.0, 1.0]`
pub fn normalize_axis(raw: i16) -> f32 {
    (raw as f32 / STICK_MAX).clamp(-1.0, 1.0)
}

/// Normalize a stick with radial deadzone and radial scaling
///
/// Uses circular deadzone (not square) and ensures diagonal movements reach magnitude 1.0.
///
/// # Arguments
/// * `raw_x`, `raw_y` - Raw stick values (-32768 to 32767)
/// * `deadzone` - Circular deadzone radius in raw units
///
/// # Returns
/// * `(norm_x, norm_y)` - Normalized values in [-1.0, 1.0] with magnitude ≤ 1.0
pub fn normalize_stick_radial(raw_x: i16, raw_y: i16, deadzone: f32) -> (f32, f32) {
    let x = raw_x as f32;
    let y = raw_y as f32;

    let magnitude = (x * x + y * y).sqrt();
    if magnitude <= deadzone {
        return (0.0, 0.0);
    }

    // Use 32768.0 to handle i16::MIN (-32768) correctly
    const MAX_MAGNITUDE: f32 = 32768.0;

    if deadzone >= MAX_MAGNITUDE {
        return (0.0, 0.0);
    }

    // Map [deadzone, max_magnitude] -> [0, 1], preserving direction
    let normalized_magnitude = ((magnitude - deadzone) / (MAX_MAGNITUDE - deadzone)).min(1.0);
    let scale = normalized_magnitude / magnitude;

    (x * scale, y * scale)
}

/// Condition a raw stick pair with the given deadzone policy
///
/// `deadzone` is normalized (fraction of full deflection).
pub fn condition_stick(raw_x: i16, raw_y: i16, deadzone: f32, shape: StickDeadzone) -> (f32, f32) {
    match shape {
        StickDeadzone::Axial => (
            apply_deadzone(normalize_axis(raw_x), deadzone),
            apply_deadzone(normalize_axis(raw_y), deadzone),
        ),
        StickDeadzone::Radial => normalize_stick_radial(raw_x, raw_y, deadzone * STICK_MAX),
    }
}

/// Threshold a raw trigger value
///
/// Below `threshold` the trigger reads 0; above it the remaining travel is
/// rescaled to `(0.0, 1.0]`.
pub fn apply_trigger_threshold(raw: u8, threshold: u8) -> f32 {
    if raw < threshold || threshold == u8::MAX {
        return 0.0;
    }
    (raw - threshold) as f32 / (255 - threshold) as f32
}

/// Convert a conditioned stick position into a cursor delta in pixels
///
/// Y is inverted so pushing the stick up moves the cursor up the screen.
pub fn stick_to_cursor_delta(x: f32, y: f32, sensitivity: f32) -> (i32, i32) {
    ((x * sensitivity).round() as i32, (-y * sensitivity).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadzone_rescales_outside_region() {
        assert_eq!(apply_deadzone(0.5, 0.3), (0.5 - 0.3) / (1.0 - 0.3));
        assert_eq!(apply_deadzone(-0.5, 0.3), (-0.5 + 0.3) / (1.0 - 0.3));
    }

    #[test]
    fn test_deadzone_filters_small_values() {
        assert_eq!(apply_deadzone(0.2, 0.3), 0.0);
        assert_eq!(apply_deadzone(-0.2, 0.3), 0.0);
        assert_eq!(apply_deadzone(0.3, 0.3), 0.0);
    }

    #[test]
    fn test_deadzone_full_deflection() {
        assert_eq!(apply_deadzone(-1.0, 0.3), -1.0);
        assert_eq!(apply_deadzone(1.0, 0.3), 1.0);
    }

    #[test]
    fn test_trigger_threshold() {
        assert_eq!(apply_trigger_threshold(127, 128), 0.0);
        assert_eq!(apply_trigger_threshold(128, 128), 0.0);
        assert_eq!(apply_trigger_threshold(255, 128), 1.0);
        assert_eq!(apply_trigger_threshold(0, 0), 0.0);
        assert_eq!(apply_trigger_threshold(255, 255), 0.0);
    }

    #[test]
    fn test_normalize_axis_clamps_min() {
        assert_eq!(normalize_axis(i16::MIN), -1.0);
        assert_eq!(normalize_axis(i16::MAX), 1.0);
        assert_eq!(normalize_axis(0), 0.0);
    }

    #[test]
    fn test_normalize_stick_radial() {
        const DEADZONE: f32 = 7849.0;

        let (x, y) = normalize_stick_radial(0, 0, DEADZONE);
        assert_eq!((x, y), (0.0, 0.0));

        // Inside deadzone on X axis only
        let (x, y) = normalize_stick_radial(7000, 0, DEADZONE);
        assert_eq!((x, y), (0.0, 0.0));

        // Diagonal magnitude ~9899 is outside the circle
        let (x, y) = normalize_stick_radial(7000, 7000, DEADZONE);
        assert!(x > 0.0 && y > 0.0);

        let (x, y) = normalize_stick_radial(32767, 0, DEADZONE);
        assert!((x - 1.0).abs() < 0.01);
        assert_eq!(y, 0.0);

        let (x, _) = normalize_stick_radial(-32768, 0, DEADZONE);
        assert!((x + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_condition_stick_axial_is_independent_per_axis() {
        let dz = DEFAULT_STICK_DEADZONE_RAW as f32 / STICK_MAX;
        // X well inside the deadzone, Y at full deflection
        let (x, y) = condition_stick(4000, 32767, dz, StickDeadzone::Axial);
        assert_eq!(x, 0.0);
        assert_eq!(y, 1.0);
    }

    #[test]
    fn test_conditioning_from_raw() {
        let c = Conditioning::default();
        assert!((c.deadzone - 8000.0 / 32767.0).abs() < f32::EPSILON);
        assert_eq!(c.trigger_threshold, 128);
        // A full-range deadzone is capped so rescaling never divides by zero
        assert_eq!(Conditioning::from_raw(i16::MAX, StickDeadzone::Axial, 0).deadzone, 0.99);
    }

    #[test]
    fn test_cursor_delta_inverts_y() {
        assert_eq!(stick_to_cursor_delta(1.0, 1.0, 20.0), (20, -20));
        assert_eq!(stick_to_cursor_delta(-0.5, -0.5, 20.0), (-10, 10));
        assert_eq!(stick_to_cursor_delta(0.0, 0.0, 20.0), (0, 0));
        // round, not truncate
        assert_eq!(stick_to_cursor_delta(0.04, 0.0, 20.0), (1, 0));
    }
}
