//! Poll loop
//!
//! Everything that happens once per tick, in order:
//! 1. let the backend pump its events
//! 2. apply queued vibration requests
//! 3. query every slot and store the result (connect/disconnect transitions)
//! 4. dispatch actions for the active device
//! 5. run pointer emulation for the active device
//!
//! `PollLoop` is built and run on the engine's background thread; `tick` is
//! public so the whole sequence can be driven step by step in tests.

use crossbeam::channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use super::device::{clamp_motor, DeviceBackend, DeviceError};
use super::dispatcher::ActionDispatcher;
use super::pointer::PointerEmulator;
use super::slot::{SlotStore, Transition, MAX_CONTROLLERS};
use crate::mode::ModeControl;

/// Fixed tick period (~60 Hz)
pub const TICK_PERIOD: Duration = Duration::from_millis(16);

/// Motor speeds requested from outside the poll thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibrationRequest {
    pub index: usize,
    pub left: f32,
    pub right: f32,
}

pub struct PollLoop {
    backend: Box<dyn DeviceBackend>,
    store: Arc<SlotStore>,
    vibration_rx: Receiver<VibrationRequest>,
    mode: Arc<dyn ModeControl>,
    dispatcher: Option<ActionDispatcher>,
    pointer: Option<PointerEmulator>,
}

impl PollLoop {
    pub fn new(
        backend: Box<dyn DeviceBackend>,
        store: Arc<SlotStore>,
        vibration_rx: Receiver<VibrationRequest>,
        mode: Arc<dyn ModeControl>,
    ) -> Self {
        Self {
            backend,
            store,
            vibration_rx,
            mode,
            dispatcher: None,
            pointer: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: ActionDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_pointer(mut self, pointer: PointerEmulator) -> Self {
        self.pointer = Some(pointer);
        self
    }

    /// Run ticks until `stop` is set, then release device resources
    pub fn run(&mut self, stop: &AtomicBool) {
        info!("🎮 Poll loop started ({} backend, {:?} tick)", self.backend.name(), TICK_PERIOD);

        while !stop.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.tick();

            let elapsed = started.elapsed();
            if elapsed < TICK_PERIOD {
                std::thread::sleep(TICK_PERIOD - elapsed);
            } else {
                trace!("Tick overran: {:?}", elapsed);
            }
        }

        self.shutdown();
        info!("Poll loop stopped");
    }

    /// One full tick
    ///
    /// # Returns
    /// Connection transitions observed this tick, by slot index
    pub fn tick(&mut self) -> Vec<(usize, Transition)> {
        self.backend.begin_tick();
        self.apply_vibration_requests();

        let now = Instant::now();
        let mut transitions = Vec::new();
        for index in 0..MAX_CONTROLLERS {
            // Query outside the store lock; the store only sees the result
            let report = match self.backend.query(index) {
                Ok(report) => Some(report),
                Err(DeviceError::Disconnected(_)) => None,
                Err(e) => {
                    debug!("Controller {} query failed: {}", index, e);
                    None
                }
            };

            if let Some(transition) = self.store.update(index, report, now) {
                match transition {
                    Transition::Connected => info!("🎮 Controller {} connected", index),
                    Transition::Disconnected => {
                        match self.store.snapshot(index).and_then(|s| s.idle_for(now)) {
                            Some(idle) => info!(
                                "🔌 Controller {} disconnected (last report {:?} ago)",
                                index, idle
                            ),
                            None => info!("🔌 Controller {} disconnected", index),
                        }
                        self.write_vibration(index, 0.0, 0.0);
                    }
                }
                transitions.push((index, transition));
            }
        }

        let slots = self.store.snapshot_all();
        let active = slots.iter().find(|s| s.connected);

        if let (Some(dispatcher), Some(slot)) = (self.dispatcher.as_mut(), active) {
            dispatcher.process(slot, &*self.mode);
        }
        if let Some(pointer) = self.pointer.as_mut() {
            pointer.update(active, self.mode.current_mode());
        }

        transitions
    }

    /// Zero vibration on every connected slot and release emulated buttons
    pub fn shutdown(&mut self) {
        for index in self.store.connected_indices() {
            self.write_vibration(index, 0.0, 0.0);
        }
        if let Some(pointer) = self.pointer.as_mut() {
            pointer.release_all();
        }
    }

    fn apply_vibration_requests(&mut self) {
        while let Ok(request) = self.vibration_rx.try_recv() {
            if !self.store.is_connected(request.index) {
                debug!("Dropping vibration for disconnected controller {}", request.index);
                continue;
            }
            self.write_vibration(request.index, request.left, request.right);
        }
    }

    fn write_vibration(&mut self, index: usize, left: f32, right: f32) {
        let (left, right) = (clamp_motor(left), clamp_motor(right));
        match self.backend.set_vibration(index, left, right) {
            Ok(()) => trace!("Controller {} vibration {:.2}/{:.2}", index, left, right),
            // A device that just vanished cannot take the write; nothing to release
            Err(DeviceError::Disconnected(_)) => {}
            Err(e) => warn!("⚠️  Failed to set vibration on controller {}: {}", index, e),
        }
    }
}
