//! XInput device backend
//!
//! Polls XInput user indices 0-3 directly (no focused window needed). The
//! driver's `dwPacketNumber` is used as the report sequence as-is.

use rusty_xinput::{XInputHandle, XInputState, XInputUsageError};
use tracing::{debug, trace};

use super::device::{DeviceBackend, DeviceError};
use super::report::GamepadReport;
use super::slot::MAX_CONTROLLERS;

impl From<&XInputState> for GamepadReport {
    fn from(state: &XInputState) -> Self {
        Self {
            packet_number: state.raw.dwPacketNumber,
            buttons: state.raw.Gamepad.wButtons,
            left_trigger: state.left_trigger(),
            right_trigger: state.right_trigger(),
            thumb_lx: state.raw.Gamepad.sThumbLX,
            thumb_ly: state.raw.Gamepad.sThumbLY,
            thumb_rx: state.raw.Gamepad.sThumbRX,
            thumb_ry: state.raw.Gamepad.sThumbRY,
        }
    }
}

/// Backend over the system XInput library
pub struct XInputBackend {
    handle: XInputHandle,
}

impl XInputBackend {
    /// Load the XInput library
    pub fn load() -> Result<Self, DeviceError> {
        let handle = XInputHandle::load_default().map_err(|e| DeviceError::Unavailable {
            backend: "xinput",
            reason: format!("{:?}", e),
        })?;
        debug!("XInput initialized successfully");
        Ok(Self { handle })
    }

    fn user_index(index: usize) -> Result<u32, DeviceError> {
        if index >= MAX_CONTROLLERS {
            return Err(DeviceError::InvalidIndex(index));
        }
        Ok(index as u32)
    }
}

impl DeviceBackend for XInputBackend {
    fn name(&self) -> &'static str {
        "xinput"
    }

    fn query(&mut self, index: usize) -> Result<GamepadReport, DeviceError> {
        let user_index = Self::user_index(index)?;
        match self.handle.get_state(user_index) {
            Ok(state) => Ok(GamepadReport::from(&state)),
            Err(XInputUsageError::DeviceNotConnected) => Err(DeviceError::Disconnected(index)),
            Err(e) => Err(DeviceError::Driver(format!("{:?}", e))),
        }
    }

    fn describe(&self, index: usize) -> Option<String> {
        Some(format!("XInput user index {}", index))
    }

    fn set_vibration(&mut self, index: usize, left: f32, right: f32) -> Result<(), DeviceError> {
        let user_index = Self::user_index(index)?;
        let left_speed = (left * 65535.0) as u16;
        let right_speed = (right * 65535.0) as u16;
        trace!("XInput {} vibration: {} / {}", index, left_speed, right_speed);
        self.handle
            .set_state(user_index, left_speed, right_speed)
            .map_err(|e| match e {
                XInputUsageError::DeviceNotConnected => DeviceError::Disconnected(index),
                other => DeviceError::Driver(format!("{:?}", other)),
            })
    }
}
