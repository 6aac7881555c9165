//! RP2040 power sequencing on the Raspberry Pi.
//!
//! The RP2040 on legacy mainboards is powered through a Pi GPIO line that
//! must be driven high before openocd can reach it over SWD.

use crate::config::FirmwareConfig;
use crate::console;
use crate::error::{MowerError, Result};
use crate::process::{self, ToolCommand};
use std::path::{Path, PathBuf};

/// How the power line gets driven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerMethod {
    /// `pinctrl` from Raspberry Pi OS, at the given path.
    Pinctrl(PathBuf),
    /// Legacy sysfs GPIO interface.
    Sysfs,
}

/// Pick the best available way to drive the power GPIO.
pub fn detect_method(config: &FirmwareConfig, pinctrl: Option<PathBuf>) -> Option<PowerMethod> {
    if let Some(path) = pinctrl {
        return Some(PowerMethod::Pinctrl(path));
    }
    let line = config.gpio_sysfs_root.join(format!("gpio{}", config.power_gpio));
    if line.exists() || config.gpio_sysfs_root.exists() {
        return Some(PowerMethod::Sysfs);
    }
    None
}

/// Drive the RP2040 power GPIO high.
///
/// # Errors
///
/// Returns [`MowerError::Gpio`] if no method is available or sysfs writes
/// fail, or the `pinctrl` invocation error.
pub fn power_on(config: &FirmwareConfig) -> Result<()> {
    let pinctrl = which::which("pinctrl").ok();
    match detect_method(config, pinctrl) {
        Some(PowerMethod::Pinctrl(path)) => {
            console::info(&format!(
                "Using pinctrl to set GPIO{} high (RPI power).",
                config.power_gpio
            ));
            process::run(&pinctrl_command(&path, config.power_gpio))
        }
        Some(PowerMethod::Sysfs) => {
            power_on_sysfs(&config.gpio_sysfs_root, config.power_gpio)?;
            console::info(&format!("GPIO{} set to high via sysfs.", config.power_gpio));
            Ok(())
        }
        None => Err(MowerError::Gpio(
            "could not find a method to set RPI power gpio".to_owned(),
        )),
    }
}

/// `pinctrl set <gpio> op dh`: output, driven high.
pub fn pinctrl_command(pinctrl: &Path, gpio: u32) -> ToolCommand {
    ToolCommand::new(pinctrl)
        .arg("set")
        .arg(gpio.to_string())
        .args(["op", "dh"])
}

/// Export `gpio` under `root` if needed, configure it as output and set it.
///
/// # Errors
///
/// Returns [`MowerError::Gpio`] naming the sysfs file that could not be
/// written.
pub fn power_on_sysfs(root: &Path, gpio: u32) -> Result<()> {
    let line = root.join(format!("gpio{gpio}"));
    if !line.exists() {
        write_sysfs(&root.join("export"), &gpio.to_string())?;
    }
    write_sysfs(&line.join("direction"), "out")?;
    write_sysfs(&line.join("value"), "1")
}

fn write_sysfs(path: &Path, value: &str) -> Result<()> {
    std::fs::write(path, value).map_err(|e| {
        MowerError::Gpio(format!("Failed to set GPIO via sysfs ({}): {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn config(root: &Path) -> FirmwareConfig {
        FirmwareConfig {
            gpio_sysfs_root: root.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn pinctrl_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let method = detect_method(&config(dir.path()), Some(PathBuf::from("/usr/bin/pinctrl")));
        assert_eq!(
            method,
            Some(PowerMethod::Pinctrl(PathBuf::from("/usr/bin/pinctrl")))
        );
    }

    #[test]
    fn sysfs_used_when_root_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            detect_method(&config(dir.path()), None),
            Some(PowerMethod::Sysfs)
        );
    }

    #[test]
    fn no_method_without_pinctrl_or_sysfs() {
        let cfg = config(Path::new("/nonexistent/openmower-gpio"));
        assert_eq!(detect_method(&cfg, None), None);
    }

    #[test]
    fn pinctrl_command_drives_line_high() {
        let cmd = pinctrl_command(Path::new("/usr/bin/pinctrl"), 10);
        assert_eq!(cmd.args_lossy(), vec!["set", "10", "op", "dh"]);
    }

    #[test]
    fn sysfs_sets_direction_and_value_of_exported_line() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("gpio10")).unwrap();

        power_on_sysfs(dir.path(), 10).unwrap();

        assert!(!dir.path().join("export").exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("gpio10/direction")).unwrap(),
            "out"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("gpio10/value")).unwrap(),
            "1"
        );
    }

    #[test]
    fn sysfs_exports_missing_line_first() {
        let dir = tempfile::tempdir().unwrap();

        // Without a kernel behind it the line never appears, so the direction
        // write fails after the export.
        let err = power_on_sysfs(dir.path(), 10).unwrap_err();
        assert!(err.to_string().contains("direction"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("export")).unwrap(),
            "10"
        );
    }
}
