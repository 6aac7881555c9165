//! External process execution.
//!
//! Every command this CLI offers ends in one or more child processes: the
//! container runtime, openocd, socat. [`runner`] runs them with the terminal
//! attached and maps their outcome into [`crate::MowerError`]; [`bridge`]
//! supervises the long-lived serial bridge.

pub mod bridge;
pub mod runner;

pub use runner::{ToolCommand, run, status};
