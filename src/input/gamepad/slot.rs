//! Controller slot store
//!
//! Each slot is a fixed device index with:
//! - Connection state for this tick and the previous one
//! - The current and previous report (double buffer)
//! - Timestamp of the last successful poll
//!
//! The store is the only shared mutable state of the engine. The poll loop is
//! its single writer; every other component reads value copies.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::error;

use super::buttons::Button;
use super::conditioning::{apply_trigger_threshold, condition_stick, StickDeadzone};
use super::edges;
use super::report::GamepadReport;

/// Number of device slots polled every tick (XInput user indices 0-3)
pub const MAX_CONTROLLERS: usize = 4;

/// Connection change observed for a slot on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Connected,
    Disconnected,
}

/// Per-device state, copied out of the store by value
#[derive(Debug, Clone, Copy)]
pub struct ControllerSlot {
    /// Device index (0-based)
    pub index: usize,
    pub connected: bool,
    /// Connection state on the previous tick
    pub was_connected: bool,
    pub current: GamepadReport,
    /// Exactly what `current` held on the previous tick
    pub previous: GamepadReport,
    /// Last tick the device answered a query
    pub last_seen: Option<Instant>,
}

impl ControllerSlot {
    /// Create an empty, disconnected slot
    pub fn new(index: usize) -> Self {
        Self {
            index,
            connected: false,
            was_connected: false,
            current: GamepadReport::default(),
            previous: GamepadReport::default(),
            last_seen: None,
        }
    }

    /// The slot as it looks one tick later
    ///
    /// `report` is the query result for this tick (`None` when the device did
    /// not answer). The current report rotates into `previous`; a missing
    /// device reads as a neutral report.
    pub fn advanced(&self, report: Option<GamepadReport>, now: Instant) -> Self {
        match report {
            Some(report) => Self {
                connected: true,
                was_connected: self.connected,
                previous: self.current,
                current: report,
                last_seen: Some(now),
                ..*self
            },
            None => Self {
                connected: false,
                was_connected: self.connected,
                previous: self.current,
                current: GamepadReport::default(),
                ..*self
            },
        }
    }

    /// Time since the device last answered, if it ever did
    pub fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.last_seen.map(|seen| now.saturating_duration_since(seen))
    }

    /// Connection change between the previous tick and this one
    pub fn transition(&self) -> Option<Transition> {
        match (self.was_connected, self.connected) {
            (false, true) => Some(Transition::Connected),
            (true, false) => Some(Transition::Disconnected),
            _ => None,
        }
    }

    pub fn is_button_pressed(&self, button: Button) -> bool {
        self.connected && self.current.is_pressed(button)
    }

    pub fn is_button_just_pressed(&self, button: Button) -> bool {
        self.connected && edges::just_pressed(&self.current, &self.previous, button)
    }

    pub fn is_button_just_released(&self, button: Button) -> bool {
        self.connected && edges::just_released(&self.current, &self.previous, button)
    }

    pub fn has_state_changed(&self) -> bool {
        self.connected && edges::state_changed(&self.current, &self.previous)
    }

    pub fn left_trigger(&self, threshold: u8) -> f32 {
        if !self.connected {
            return 0.0;
        }
        apply_trigger_threshold(self.current.left_trigger, threshold)
    }

    pub fn right_trigger(&self, threshold: u8) -> f32 {
        if !self.connected {
            return 0.0;
        }
        apply_trigger_threshold(self.current.right_trigger, threshold)
    }

    pub fn left_stick(&self, deadzone: f32, shape: StickDeadzone) -> (f32, f32) {
        if !self.connected {
            return (0.0, 0.0);
        }
        condition_stick(self.current.thumb_lx, self.current.thumb_ly, deadzone, shape)
    }

    pub fn right_stick(&self, deadzone: f32, shape: StickDeadzone) -> (f32, f32) {
        if !self.connected {
            return (0.0, 0.0);
        }
        condition_stick(self.current.thumb_rx, self.current.thumb_ry, deadzone, shape)
    }
}

/// Fixed array of slots behind a single lock
///
/// The lock is held only to copy a slot out or assign a new one; device
/// queries, actions and logging all happen outside it.
pub struct SlotStore {
    slots: Mutex<[ControllerSlot; MAX_CONTROLLERS]>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(std::array::from_fn(ControllerSlot::new)),
        }
    }

    /// Copy one slot out of the store
    ///
    /// Out-of-range indices are logged and yield `None`.
    pub fn snapshot(&self, index: usize) -> Option<ControllerSlot> {
        if index >= MAX_CONTROLLERS {
            error!("Invalid controller index: {}", index);
            return None;
        }
        Some(self.slots.lock()[index])
    }

    /// Copy every slot out in one critical section
    pub fn snapshot_all(&self) -> [ControllerSlot; MAX_CONTROLLERS] {
        *self.slots.lock()
    }

    /// Advance one slot by a tick (poll loop only)
    ///
    /// The previous/current rotation is a single value assignment, so readers
    /// see either the old slot or the new one, never a mix.
    pub fn update(&self, index: usize, report: Option<GamepadReport>, now: Instant) -> Option<Transition> {
        if index >= MAX_CONTROLLERS {
            error!("Invalid controller index: {}", index);
            return None;
        }
        let next = {
            let mut slots = self.slots.lock();
            let next = slots[index].advanced(report, now);
            slots[index] = next;
            next
        };
        next.transition()
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.snapshot(index).map_or(false, |s| s.connected)
    }

    /// Lowest-indexed connected slot
    pub fn active_index(&self) -> Option<usize> {
        self.snapshot_all().iter().position(|s| s.connected)
    }

    /// Indices of every connected slot
    pub fn connected_indices(&self) -> Vec<usize> {
        self.snapshot_all()
            .iter()
            .filter(|s| s.connected)
            .map(|s| s.index)
            .collect()
    }
}

impl Default for SlotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn report(packet_number: u32, buttons: u16) -> GamepadReport {
        GamepadReport { packet_number, buttons, ..Default::default() }
    }

    #[test]
    fn test_update_rotates_current_into_previous() {
        let store = SlotStore::new();
        let now = Instant::now();

        store.update(0, Some(report(1, 0)), now);
        store.update(0, Some(report(2, Button::A.mask())), now);

        let slot = store.snapshot(0).unwrap();
        assert_eq!(slot.previous, report(1, 0));
        assert_eq!(slot.current, report(2, Button::A.mask()));
        assert!(slot.is_button_just_pressed(Button::A));
    }

    #[test]
    fn test_transitions_fire_once() {
        let store = SlotStore::new();
        let now = Instant::now();

        assert_eq!(store.update(1, Some(report(1, 0)), now), Some(Transition::Connected));
        assert_eq!(store.update(1, Some(report(1, 0)), now), None);
        assert_eq!(store.update(1, None, now), Some(Transition::Disconnected));
        assert_eq!(store.update(1, None, now), None);
        assert_eq!(store.update(1, None, now), None);
    }

    #[test]
    fn test_disconnected_slot_reads_neutral() {
        let store = SlotStore::new();
        let now = Instant::now();
        let held = GamepadReport {
            packet_number: 3,
            buttons: Button::A.mask(),
            left_trigger: 255,
            thumb_rx: 32767,
            ..Default::default()
        };
        store.update(0, Some(held), now);
        store.update(0, None, now);

        let slot = store.snapshot(0).unwrap();
        assert!(!slot.connected);
        assert!(!slot.is_button_pressed(Button::A));
        assert_eq!(slot.left_trigger(128), 0.0);
        assert_eq!(slot.right_stick(0.25, StickDeadzone::Axial), (0.0, 0.0));
    }

    #[test]
    fn test_last_seen_survives_disconnect() {
        let store = SlotStore::new();
        let seen = Instant::now();
        assert_eq!(store.snapshot(2).unwrap().idle_for(seen), None);

        store.update(2, Some(report(1, 0)), seen);
        let later = seen + Duration::from_millis(48);
        store.update(2, None, later);

        let slot = store.snapshot(2).unwrap();
        assert_eq!(slot.last_seen, Some(seen));
        assert_eq!(slot.idle_for(later), Some(Duration::from_millis(48)));
    }

    #[test]
    fn test_active_index_is_lowest_connected() {
        let store = SlotStore::new();
        let now = Instant::now();
        assert_eq!(store.active_index(), None);

        store.update(3, Some(report(1, 0)), now);
        store.update(1, Some(report(1, 0)), now);
        assert_eq!(store.active_index(), Some(1));
        assert_eq!(store.connected_indices(), vec![1, 3]);

        store.update(1, None, now);
        assert_eq!(store.active_index(), Some(3));
    }

    #[test]
    fn test_invalid_index_is_safe() {
        let store = SlotStore::new();
        assert!(store.snapshot(MAX_CONTROLLERS).is_none());
        assert!(!store.is_connected(42));
        assert_eq!(store.update(7, Some(report(1, 0)), Instant::now()), None);
    }

    #[test]
    fn test_readers_never_see_torn_slots() {
        // The writer always stores previous.packet_number == current.packet_number - 1,
        // so any mixed snapshot would break the relation.
        let store = Arc::new(SlotStore::new());
        let writer_store = store.clone();
        let writer = std::thread::spawn(move || {
            let now = Instant::now();
            writer_store.update(0, Some(report(0, 0)), now);
            for seq in 1..20_000u32 {
                writer_store.update(0, Some(report(seq, (seq & 1) as u16)), now);
            }
        });

        for _ in 0..20_000 {
            let slot = store.snapshot(0).unwrap();
            if slot.connected && slot.current.packet_number > 0 {
                assert_eq!(slot.previous.packet_number + 1, slot.current.packet_number);
            }
        }
        writer.join().unwrap();
    }
}
