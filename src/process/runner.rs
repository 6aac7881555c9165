//! Runs external programs with the operator's terminal attached.
//!
//! Standard streams are inherited so interactive children (shells, `docker
//! exec -it`, openocd) behave exactly as if they were started directly.
//! Nothing is captured or rewritten.

use crate::error::{MowerError, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{Command, ExitStatus};

/// An external tool invocation: program plus argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Start a command for `program`.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    /// The program to execute.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// The argument vector (without the program).
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Arguments as lossy UTF-8 strings, mostly for assertions and logs.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Run a command to completion and return its exit code.
///
/// A missing executable is reported as [`MowerError::ToolNotFound`] rather
/// than as an exit code. A child killed by a signal reports `128 + signal`,
/// matching what a shell would show.
///
/// # Errors
///
/// Returns an error if the program cannot be found or spawned.
pub fn status(cmd: &ToolCommand) -> Result<i32> {
    tracing::debug!(command = %cmd, "spawning");

    let status = Command::new(&cmd.program)
        .args(&cmd.args)
        .status()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MowerError::ToolNotFound {
                    program: cmd.program_name(),
                }
            } else {
                MowerError::Io(e)
            }
        })?;

    let code = exit_code_of(status);
    tracing::debug!(program = %cmd.program_name(), code, "child exited");
    Ok(code)
}

/// Run a command and fail unless it exits with code 0.
///
/// # Errors
///
/// Returns [`MowerError::ToolNotFound`] if the program is missing and
/// [`MowerError::CommandFailed`] carrying the child's exit code otherwise.
pub fn run(cmd: &ToolCommand) -> Result<()> {
    match status(cmd)? {
        0 => Ok(()),
        code => Err(MowerError::CommandFailed {
            program: cmd.program_name(),
            code,
        }),
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
