//! openocd invocations for the RP2040 over the Pi's SWD pins.

use super::gpio;
use crate::config::FirmwareConfig;
use crate::console;
use crate::error::Result;
use crate::process::{self, ToolCommand};
use std::path::Path;

/// SWD interface configuration shipped with openocd.
pub const INTERFACE_CFG: &str = "interface/raspberrypi-swd.cfg";

/// Target configuration shipped with openocd.
pub const TARGET_CFG: &str = "target/rp2040.cfg";

fn base_command() -> ToolCommand {
    ToolCommand::new("openocd").args(["-f", INTERFACE_CFG, "-f", TARGET_CFG])
}

/// Program, verify and reset the RP2040 with `elf`, then exit.
pub fn flash_command(elf: &Path) -> ToolCommand {
    base_command()
        .arg("-c")
        .arg(format!("program {} verify reset exit", elf.display()))
}

/// Keep openocd running and listening on all interfaces for an IDE.
pub fn listen_command() -> ToolCommand {
    base_command().args(["-c", "bindto 0.0.0.0"])
}

/// Power the RP2040 and flash `elf` onto it.
///
/// # Errors
///
/// Returns GPIO errors, [`crate::MowerError::ToolNotFound`] if openocd is
/// missing, or openocd's exit code.
pub fn flash(config: &FirmwareConfig, elf: &Path) -> Result<()> {
    gpio::power_on(config)?;
    console::info("Starting openocd to flash firmware ...");
    process::run(&flash_command(elf))?;
    console::success("Firmware flashed successfully.");
    Ok(())
}

/// Power the RP2040 and start openocd in listening mode.
///
/// # Errors
///
/// Same as [`flash`].
pub fn listen(config: &FirmwareConfig) -> Result<()> {
    gpio::power_on(config)?;
    console::info("Starting openocd...");
    process::run(&listen_command())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_command_programs_verifies_and_exits() {
        let cmd = flash_command(Path::new("/tmp/fw/firmware.elf"));
        assert_eq!(cmd.program(), "openocd");
        assert_eq!(
            cmd.args_lossy(),
            vec![
                "-f",
                "interface/raspberrypi-swd.cfg",
                "-f",
                "target/rp2040.cfg",
                "-c",
                "program /tmp/fw/firmware.elf verify reset exit",
            ]
        );
    }

    #[test]
    fn listen_command_binds_all_interfaces() {
        let args = listen_command().args_lossy();
        assert_eq!(&args[4..], ["-c", "bindto 0.0.0.0"]);
    }
}
