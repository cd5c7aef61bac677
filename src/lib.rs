//! padpilot - drive the desktop from a game controller
//!
//! A background engine polls controllers on a fixed tick, derives button
//! edges, and turns them into actions (overlay, volume, browser navigation,
//! programs) and, in desktop-control mode, into mouse and scroll input.

pub mod actions;
pub mod config;
pub mod emulation;
pub mod input;
pub mod mode;
pub mod paths;
