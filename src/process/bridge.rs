//! Serial-to-TCP bridge supervised by a restart loop.
//!
//! `socat` listens on a TCP port and forks per connection, bridging to one of
//! the robot's UART devices. Whenever it exits (device unplugged, crash,
//! listener dropped) it is started again until the cancellation token fires.

use crate::error::{MowerError, Result};
use crate::process::runner::{self, ToolCommand};
use tokio_util::sync::CancellationToken;

/// Named UART devices that can be exposed, sorted by name.
pub const SERIAL_DEVICES: &[(&str, &str)] = &[
    ("left", "/dev/ttyAMA4"),
    ("mower", "/dev/ttyAMA3"),
    ("right", "/dev/ttyAMA2"),
];

/// Baud rate of the motor controller UARTs.
pub const SERIAL_BAUD: u32 = 115_200;

/// Resolve a device name (`left`, `right`, `mower`) to its device path.
///
/// # Errors
///
/// Returns [`MowerError::InvalidInput`] listing the valid names.
pub fn device_for(name: &str) -> Result<&'static str> {
    SERIAL_DEVICES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, path)| *path)
        .ok_or_else(|| {
            let valid: Vec<&str> = SERIAL_DEVICES.iter().map(|(n, _)| *n).collect();
            MowerError::InvalidInput(format!(
                "Invalid argument. Valid values are: {}.",
                valid.join(", ")
            ))
        })
}

/// Build the `socat` invocation bridging `device` onto TCP `port`.
pub fn socat_command(port: u16, device: &str) -> ToolCommand {
    ToolCommand::new("sudo").args([
        "socat".to_owned(),
        format!("TCP-LISTEN:{port},reuseaddr,fork"),
        format!("FILE:{device},b{SERIAL_BAUD},cs8,raw,echo=0"),
    ])
}

/// Exit code of a child ended by SIGINT (`128 + 2`).
///
/// Ctrl-C reaches the child and the CLI together; the child often exits
/// before the signal task has set the token, so this code is an interrupt too.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Launch `launch` over and over until `cancel` is triggered.
///
/// Each call to `launch` runs one child to completion and returns its exit
/// code; any other exit code leads to a restart. A child ended by SIGINT
/// ([`EXIT_INTERRUPTED`]) cancels the token and stops the loop. A missing
/// program ends the loop immediately without retrying.
///
/// Returns the number of launches performed.
///
/// # Errors
///
/// Returns [`MowerError::ToolNotFound`] (exit code 127) when the program is
/// missing, or any other spawn error unchanged.
pub fn run_until_cancelled<F>(cancel: &CancellationToken, mut launch: F) -> Result<usize>
where
    F: FnMut() -> Result<i32>,
{
    let mut launches = 0usize;
    while !cancel.is_cancelled() {
        let code = launch()?;
        launches += 1;
        if code == EXIT_INTERRUPTED {
            cancel.cancel();
        }
        if cancel.is_cancelled() {
            break;
        }
        tracing::debug!(code, launches, "bridge exited, restarting");
    }
    tracing::debug!(launches, "bridge loop stopped");
    Ok(launches)
}

/// Expose `device` on `port` until `cancel` fires.
///
/// # Errors
///
/// See [`run_until_cancelled`].
pub fn serve(cancel: &CancellationToken, port: u16, device: &str) -> Result<usize> {
    let cmd = socat_command(port, device);
    run_until_cancelled(cancel, || runner::status(&cmd))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn device_names_resolve() {
        assert_eq!(device_for("left").unwrap(), "/dev/ttyAMA4");
        assert_eq!(device_for("right").unwrap(), "/dev/ttyAMA2");
        assert_eq!(device_for("mower").unwrap(), "/dev/ttyAMA3");
    }

    #[test]
    fn unknown_device_lists_valid_names() {
        let err = device_for("middle").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "Invalid argument. Valid values are: left, mower, right."
        );
    }

    #[test]
    fn socat_command_bridges_device_raw() {
        let cmd = socat_command(1234, "/dev/ttyAMA4");
        assert_eq!(cmd.program(), "sudo");
        assert_eq!(
            cmd.args_lossy(),
            vec![
                "socat",
                "TCP-LISTEN:1234,reuseaddr,fork",
                "FILE:/dev/ttyAMA4,b115200,cs8,raw,echo=0",
            ]
        );
    }

    #[test]
    fn restarts_until_interrupted() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let launches = run_until_cancelled(&cancel, || {
            calls += 1;
            if calls == 5 {
                cancel.cancel();
            }
            Ok(1)
        })
        .unwrap();
        assert_eq!(launches, 5);
        assert_eq!(calls, 5);
    }

    #[test]
    fn already_cancelled_never_launches() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let launches =
            run_until_cancelled(&cancel, || -> Result<i32> { panic!("must not launch") })
                .unwrap();
        assert_eq!(launches, 0);
    }

    #[test]
    fn missing_program_is_not_retried() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let err = run_until_cancelled(&cancel, || {
            calls += 1;
            Err(MowerError::ToolNotFound {
                program: "socat".to_owned(),
            })
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn interrupted_child_stops_the_loop() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let launches = run_until_cancelled(&cancel, || {
            calls += 1;
            Ok(if calls == 3 { EXIT_INTERRUPTED } else { 1 })
        })
        .unwrap();
        assert_eq!(launches, 3);
        assert!(cancel.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn child_killed_by_sigint_is_not_relaunched() {
        // The token is never set from outside: only the child's SIGINT death
        // can end the loop. `exit 130` covers shells started with SIGINT
        // ignored, which cannot kill themselves with it.
        let cancel = CancellationToken::new();
        let cmd = ToolCommand::new("sh").args(["-c", "kill -INT $$; exit 130"]);
        let mut launched = 0;
        let launches = run_until_cancelled(&cancel, || {
            launched += 1;
            assert!(launched <= 1, "relaunched after interrupt");
            runner::status(&cmd)
        })
        .unwrap();
        assert_eq!(launches, 1);
        assert!(cancel.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn real_children_are_restarted() {
        let cancel = CancellationToken::new();
        let cmd = ToolCommand::new("sh").args(["-c", "exit 3"]);
        let mut launched = 0;
        let launches = run_until_cancelled(&cancel, || {
            launched += 1;
            if launched == 3 {
                cancel.cancel();
            }
            runner::status(&cmd)
        })
        .unwrap();
        assert_eq!(launches, 3);
    }
}
