//! openmower-cli: operator tooling for an OpenMower robot mower.
//!
//! Wraps the day-to-day chores on the mower's Raspberry Pi:
//!
//! - **Stack control**: `docker compose` pull/start/stop/logs/shell
//! - **Self-update**: replace the running executable with a release build
//! - **Update notifier**: rate-limited "newer release available" advisory
//! - **Firmware**: xcore upload on V2 boards, openocd flashing on legacy boards
//! - **Serial bridge**: expose an xESC UART over TCP via `socat`
//!
//! External tools are always launched with inherited stdio so the operator
//! sees their output directly; their exit codes become the CLI's exit code.

pub mod config;
pub mod console;
pub mod error;
pub mod firmware;
pub mod paths;
pub mod process;
pub mod stack;
pub mod update;

pub use config::CliConfig;
pub use error::{MowerError, Result};
