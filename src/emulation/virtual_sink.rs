//! Virtual input sink
//!
//! Keeps a cursor inside fixed bounds and records every event it is asked to
//! inject. Used on platforms without injection support, for `--dry-run`, and
//! as the recording sink in tests.

use parking_lot::Mutex;
use tracing::debug;

use super::{ButtonDirection, InputSink, Key, MouseButton};

/// One injected event, as recorded by [`VirtualSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    MoveTo(i32, i32),
    Mouse(MouseButton, ButtonDirection),
    Wheel(i32),
    Key(Key, ButtonDirection),
}

pub struct VirtualSink {
    width: i32,
    height: i32,
    cursor: Mutex<(i32, i32)>,
    events: Mutex<Vec<SinkEvent>>,
}

impl VirtualSink {
    /// Create a sink with the cursor centered on a `width` x `height` screen
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cursor: Mutex::new((width / 2, height / 2)),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Drain recorded events
    pub fn take_events(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn record(&self, event: SinkEvent) {
        debug!("virtual input: {:?}", event);
        self.events.lock().push(event);
    }
}

impl InputSink for VirtualSink {
    fn cursor_position(&self) -> Option<(i32, i32)> {
        Some(*self.cursor.lock())
    }

    fn screen_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn move_cursor_to(&self, x: i32, y: i32) {
        let pos = (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1));
        *self.cursor.lock() = pos;
        self.record(SinkEvent::MoveTo(pos.0, pos.1));
    }

    fn mouse_button(&self, button: MouseButton, direction: ButtonDirection) {
        self.record(SinkEvent::Mouse(button, direction));
    }

    fn wheel(&self, delta: i32) {
        self.record(SinkEvent::Wheel(delta));
    }

    fn key(&self, key: Key, direction: ButtonDirection) {
        self.record(SinkEvent::Key(key, direction));
    }
}
