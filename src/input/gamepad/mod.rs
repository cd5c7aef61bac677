//! Game controller input
//!
//! Polls up to four controllers on a fixed tick, keeps a double-buffered
//! report per slot, derives button edges and turns them into actions and
//! pointer/scroll emulation.
//!
//! Data flows one way: poll loop → slot store → {dispatcher, pointer emulator}.
//! The poll loop is the store's only writer.

pub mod buttons;
pub mod conditioning;
pub mod device;
pub mod diagnostics;
pub mod dispatcher;
pub mod edges;
pub mod engine;
pub mod gilrs_backend;
pub mod pointer;
pub mod poll;
pub mod report;
pub mod slot;
#[cfg(windows)]
pub mod xinput_backend;

pub use buttons::Button;
pub use conditioning::{Conditioning, StickDeadzone};
pub use device::{open_backend, BackendKind, DeviceBackend, DeviceError};
pub use diagnostics::print_controller_diagnostics;
pub use dispatcher::{default_mappings, ActionDispatcher, ButtonMapping};
pub use engine::{EngineBuilder, EngineError, EngineSettings, InputEngine};
pub use pointer::{EmulatorState, PointerEmulator, PointerSettings};
pub use report::GamepadReport;
pub use slot::{ControllerSlot, SlotStore, Transition, MAX_CONTROLLERS};
