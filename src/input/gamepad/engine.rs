//! Input engine
//!
//! Owns the slot store and the background poll thread. Everything else in the
//! process talks to controllers through this type:
//! - `start` builds the backend on the poll thread and waits for it to come up
//! - the query methods read value copies out of the slot store
//! - `set_vibration` queues a motor write for the next tick
//! - `shutdown` (or drop) stops the thread with a bounded wait

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::buttons::Button;
use super::conditioning::Conditioning;
use super::device::{open_backend, BackendKind, DeviceBackend, DeviceError};
use super::dispatcher::{default_mappings, ActionDispatcher, ButtonMapping};
use super::pointer::{PointerEmulator, PointerSettings};
use super::poll::{PollLoop, VibrationRequest};
use super::slot::{ControllerSlot, SlotStore, MAX_CONTROLLERS};
use crate::actions::ActionExecutor;
use crate::emulation::InputSink;
use crate::mode::{ModeControl, SharedMode};

/// How long `start` waits for the backend to initialize
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `shutdown` waits for the poll thread to exit
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine start-up and teardown failures
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn poll thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("device backend failed to start: {0}")]
    Backend(#[from] DeviceError),

    #[error("device backend did not start within {0:?}")]
    StartupTimeout(Duration),

    #[error("poll thread did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("poll thread panicked")]
    PollThreadPanicked,
}

/// Everything the engine needs from configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub backend: BackendKind,
    pub conditioning: Conditioning,
    pub pointer: PointerSettings,
    /// Toggles the mode while the overlay is visible
    pub mode_toggle_button: Button,
    pub mappings: Vec<ButtonMapping>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            conditioning: Conditioning::default(),
            pointer: PointerSettings::default(),
            mode_toggle_button: Button::A,
            mappings: default_mappings(),
        }
    }
}

type BackendFactory = Box<dyn FnOnce() -> Result<Box<dyn DeviceBackend>, DeviceError> + Send>;

/// Collects the engine's collaborators before starting it
pub struct EngineBuilder {
    settings: EngineSettings,
    mode: Arc<dyn ModeControl>,
    executor: Option<Box<dyn ActionExecutor>>,
    sink: Option<Arc<dyn InputSink>>,
    factory: Option<BackendFactory>,
    startup_timeout: Duration,
    shutdown_timeout: Duration,
}

impl EngineBuilder {
    /// Shared mode/overlay state (defaults to a private `SharedMode`)
    pub fn mode(mut self, mode: Arc<dyn ModeControl>) -> Self {
        self.mode = mode;
        self
    }

    /// Enable action dispatch through `executor`
    pub fn executor(mut self, executor: Box<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Enable pointer emulation through `sink`
    pub fn sink(mut self, sink: Arc<dyn InputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use a custom backend instead of the one named in the settings
    ///
    /// The factory runs on the poll thread.
    pub fn backend<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn DeviceBackend>, DeviceError> + Send + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// How long `start` waits for the backend (default [`STARTUP_TIMEOUT`])
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// How long `shutdown` waits for the poll thread (default [`SHUTDOWN_TIMEOUT`])
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Spawn the poll thread and wait for the backend to come up
    ///
    /// No thread is left running when this fails, except after a startup
    /// timeout: the thread then exits as soon as the backend returns.
    pub fn start(self) -> Result<InputEngine, EngineError> {
        let EngineBuilder {
            settings,
            mode,
            executor,
            sink,
            factory,
            startup_timeout,
            shutdown_timeout,
        } = self;
        let kind = settings.backend;
        let factory = factory.unwrap_or_else(|| Box::new(move || open_backend(kind)));

        let store = Arc::new(SlotStore::new());
        let stop = Arc::new(AtomicBool::new(false));
        let (vibration_tx, vibration_rx) = channel::unbounded::<VibrationRequest>();
        let (ready_tx, ready_rx) = channel::bounded::<Result<&'static str, DeviceError>>(1);
        let (exit_tx, exit_rx) = channel::bounded::<()>(1);

        let dispatcher = executor
            .map(|e| ActionDispatcher::new(settings.mappings.clone(), settings.mode_toggle_button, e));
        let pointer = sink.map(|s| PointerEmulator::new(s, settings.conditioning, settings.pointer));

        let thread_store = store.clone();
        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("padpilot-poll".to_string())
            .spawn(move || {
                let backend = match factory() {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(backend.name()));

                let mut poll = PollLoop::new(backend, thread_store, vibration_rx, mode);
                if let Some(dispatcher) = dispatcher {
                    poll = poll.with_dispatcher(dispatcher);
                }
                if let Some(pointer) = pointer {
                    poll = poll.with_pointer(pointer);
                }
                poll.run(&thread_stop);
                let _ = exit_tx.send(());
            })
            .map_err(EngineError::Spawn)?;

        match ready_rx.recv_timeout(startup_timeout) {
            Ok(Ok(name)) => {
                info!("✅ Input engine started ({} backend)", name);
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(EngineError::Backend(e));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                return Err(EngineError::PollThreadPanicked);
            }
            Err(RecvTimeoutError::Timeout) => {
                // The thread exits on its own if the backend ever comes up
                stop.store(true, Ordering::SeqCst);
                error!("Device backend did not start within {:?}", startup_timeout);
                return Err(EngineError::StartupTimeout(startup_timeout));
            }
        }

        Ok(InputEngine {
            store,
            conditioning: settings.conditioning,
            stop,
            vibration_tx,
            exit_rx,
            shutdown_timeout,
            handle: Some(handle),
        })
    }
}

/// Running input engine
pub struct InputEngine {
    store: Arc<SlotStore>,
    conditioning: Conditioning,
    stop: Arc<AtomicBool>,
    vibration_tx: Sender<VibrationRequest>,
    exit_rx: Receiver<()>,
    shutdown_timeout: Duration,
    handle: Option<JoinHandle<()>>,
}

impl InputEngine {
    pub fn builder(settings: EngineSettings) -> EngineBuilder {
        EngineBuilder {
            settings,
            mode: Arc::new(SharedMode::new()),
            executor: None,
            sink: None,
            factory: None,
            startup_timeout: STARTUP_TIMEOUT,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    /// Start a query-only engine (no dispatch, no pointer emulation)
    pub fn start(settings: EngineSettings) -> Result<Self, EngineError> {
        Self::builder(settings).start()
    }

    /// Whether the poll thread is still owned by this engine
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Value copy of a slot (`None` and an error log for invalid indices)
    pub fn snapshot(&self, index: usize) -> Option<ControllerSlot> {
        self.store.snapshot(index)
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.store.is_connected(index)
    }

    /// Lowest-indexed connected controller
    pub fn active_device(&self) -> Option<usize> {
        self.store.active_index()
    }

    pub fn is_button_pressed(&self, index: usize, button: Button) -> bool {
        self.snapshot(index).map_or(false, |s| s.is_button_pressed(button))
    }

    pub fn is_button_just_pressed(&self, index: usize, button: Button) -> bool {
        self.snapshot(index).map_or(false, |s| s.is_button_just_pressed(button))
    }

    pub fn is_button_just_released(&self, index: usize, button: Button) -> bool {
        self.snapshot(index).map_or(false, |s| s.is_button_just_released(button))
    }

    /// Whether the last tick brought a new packet for this controller
    pub fn has_state_changed(&self, index: usize) -> bool {
        self.snapshot(index).map_or(false, |s| s.has_state_changed())
    }

    pub fn left_trigger(&self, index: usize) -> f32 {
        self.snapshot(index)
            .map_or(0.0, |s| s.left_trigger(self.conditioning.trigger_threshold))
    }

    pub fn right_trigger(&self, index: usize) -> f32 {
        self.snapshot(index)
            .map_or(0.0, |s| s.right_trigger(self.conditioning.trigger_threshold))
    }

    pub fn left_stick(&self, index: usize) -> (f32, f32) {
        self.snapshot(index).map_or((0.0, 0.0), |s| {
            s.left_stick(self.conditioning.deadzone, self.conditioning.shape)
        })
    }

    pub fn right_stick(&self, index: usize) -> (f32, f32) {
        self.snapshot(index).map_or((0.0, 0.0), |s| {
            s.right_stick(self.conditioning.deadzone, self.conditioning.shape)
        })
    }

    /// Queue motor speeds for a controller
    ///
    /// Magnitudes are clamped to `[0.0, 1.0]` when applied on the next tick.
    /// Does nothing for a disconnected controller.
    pub fn set_vibration(&self, index: usize, left: f32, right: f32) {
        if index >= MAX_CONTROLLERS {
            error!("Invalid controller index: {}", index);
            return;
        }
        if !self.store.is_connected(index) {
            debug!("Controller {} not connected, ignoring vibration", index);
            return;
        }
        if self.vibration_tx.send(VibrationRequest { index, left, right }).is_err() {
            warn!("⚠️  Poll loop gone, vibration for controller {} dropped", index);
        }
    }

    /// Stop the poll thread
    ///
    /// The thread zeroes vibration on connected controllers and releases
    /// emulated mouse buttons before it exits. Waits at most the shutdown
    /// timeout ([`SHUTDOWN_TIMEOUT`] unless overridden); on timeout the thread
    /// is detached.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        info!("Stopping input engine...");
        self.stop.store(true, Ordering::SeqCst);

        match self.exit_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                handle.join().map_err(|_| EngineError::PollThreadPanicked)?;
                info!("✅ Input engine stopped");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                error!("Poll thread did not stop within {:?}", self.shutdown_timeout);
                Err(EngineError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }
}

impl Drop for InputEngine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Input engine shutdown failed: {}", e);
        }
    }
}
