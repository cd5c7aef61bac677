//! Windows input sink (`SendInput`, `GetCursorPos`/`SetCursorPos`)

use std::mem::size_of;
use tracing::{trace, warn};
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SetCursorPos, SM_CXSCREEN, SM_CYSCREEN,
};

use super::{ButtonDirection, InputSink, Key, MouseButton};

#[derive(Debug, Default)]
pub struct WindowsSink;

impl WindowsSink {
    pub fn new() -> Self {
        Self
    }

    fn send(&self, input: INPUT) {
        let sent = unsafe { SendInput(&[input], size_of::<INPUT>() as i32) };
        if sent != 1 {
            warn!("⚠️  SendInput rejected the event");
        }
    }

    fn send_mouse(&self, flags: MOUSE_EVENT_FLAGS, data: i32) {
        self.send(INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: data,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        });
    }
}

impl InputSink for WindowsSink {
    fn cursor_position(&self) -> Option<(i32, i32)> {
        let mut point = POINT::default();
        match unsafe { GetCursorPos(&mut point) } {
            Ok(()) => Some((point.x, point.y)),
            Err(e) => {
                warn!("GetCursorPos failed: {}", e);
                None
            }
        }
    }

    fn screen_size(&self) -> (i32, i32) {
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn move_cursor_to(&self, x: i32, y: i32) {
        if let Err(e) = unsafe { SetCursorPos(x, y) } {
            warn!("SetCursorPos({}, {}) failed: {}", x, y, e);
        }
    }

    fn mouse_button(&self, button: MouseButton, direction: ButtonDirection) {
        let flags = match (button, direction) {
            (MouseButton::Left, ButtonDirection::Down) => MOUSEEVENTF_LEFTDOWN,
            (MouseButton::Left, ButtonDirection::Up) => MOUSEEVENTF_LEFTUP,
            (MouseButton::Right, ButtonDirection::Down) => MOUSEEVENTF_RIGHTDOWN,
            (MouseButton::Right, ButtonDirection::Up) => MOUSEEVENTF_RIGHTUP,
        };
        trace!("mouse {:?} {:?}", button, direction);
        self.send_mouse(flags, 0);
    }

    fn wheel(&self, delta: i32) {
        trace!("wheel {}", delta);
        self.send_mouse(MOUSEEVENTF_WHEEL, delta);
    }

    fn key(&self, key: Key, direction: ButtonDirection) {
        let flags = match direction {
            ButtonDirection::Down => KEYBD_EVENT_FLAGS(0),
            ButtonDirection::Up => KEYEVENTF_KEYUP,
        };
        self.send(INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(key.virtual_key()),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        });
    }
}
