//! Device capability consumed by the poll loop
//!
//! A backend answers "what does controller N look like right now" and accepts
//! vibration writes. Absence is a normal answer, not a failure of the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::report::GamepadReport;

/// Errors reported by a device backend
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("controller {0} is not connected")]
    Disconnected(usize),

    #[error("invalid controller index {0}")]
    InvalidIndex(usize),

    #[error("{backend} backend unavailable: {reason}")]
    Unavailable { backend: &'static str, reason: String },

    #[error("driver call failed: {0}")]
    Driver(String),
}

/// Controller access used by the poll loop
///
/// Backends live on the poll thread for their whole life, so they need not be
/// `Send` or `Sync`; the engine builds them there through a factory.
pub trait DeviceBackend {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Called once at the start of every tick, before any query
    fn begin_tick(&mut self) {}

    /// Current report for a device index
    fn query(&mut self, index: usize) -> Result<GamepadReport, DeviceError>;

    /// Write motor speeds, already clamped to `[0.0, 1.0]`
    fn set_vibration(&mut self, index: usize, left: f32, right: f32) -> Result<(), DeviceError>;

    /// Human-readable device description for diagnostics
    fn describe(&self, _index: usize) -> Option<String> {
        None
    }
}

/// Which backend to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// XInput when the library loads, gilrs otherwise
    #[default]
    Auto,
    Xinput,
    Gilrs,
}

/// Clamp a motor magnitude to `[0.0, 1.0]` (NaN reads as 0)
pub fn clamp_motor(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Open the configured backend
pub fn open_backend(kind: BackendKind) -> Result<Box<dyn DeviceBackend>, DeviceError> {
    match kind {
        BackendKind::Xinput => open_xinput(),
        BackendKind::Gilrs => Ok(Box::new(super::gilrs_backend::GilrsBackend::new()?)),
        BackendKind::Auto => match open_xinput() {
            Ok(backend) => Ok(backend),
            Err(e) => {
                debug!("XInput not available ({}), falling back to gilrs", e);
                Ok(Box::new(super::gilrs_backend::GilrsBackend::new()?))
            }
        },
    }
}

#[cfg(windows)]
fn open_xinput() -> Result<Box<dyn DeviceBackend>, DeviceError> {
    Ok(Box::new(super::xinput_backend::XInputBackend::load()?))
}

#[cfg(not(windows))]
fn open_xinput() -> Result<Box<dyn DeviceBackend>, DeviceError> {
    tracing::warn!("XInput backend requested on a non-Windows platform");
    Err(DeviceError::Unavailable {
        backend: "xinput",
        reason: "XInput is only available on Windows".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_motor() {
        assert_eq!(clamp_motor(-0.5), 0.0);
        assert_eq!(clamp_motor(0.25), 0.25);
        assert_eq!(clamp_motor(3.0), 1.0);
        assert_eq!(clamp_motor(f32::NAN), 0.0);
    }

    #[test]
    fn test_backend_kind_from_config() {
        let kind: BackendKind = serde_yaml::from_str("gilrs").unwrap();
        assert_eq!(kind, BackendKind::Gilrs);
        assert_eq!(BackendKind::default(), BackendKind::Auto);
    }
}
