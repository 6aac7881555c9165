//! Firmware flashing for legacy (RP2040) mainboards.

use super::openocd;
use crate::config::{CliConfig, HardwareConfig};
use crate::console;
use crate::error::{MowerError, Result};
use crate::update::{DownloadSession, ReleaseFeed, archive};
use std::path::PathBuf;

const ARCHIVE_NAME: &str = "firmware.zip";
const FIRMWARE_NAME: &str = "firmware.elf";

/// Archive member holding the firmware for hardware version `hw`.
pub fn member_path(hw: &str) -> String {
    format!("firmware/{hw}/{FIRMWARE_NAME}")
}

/// The legacy hardware version selecting the firmware variant.
///
/// # Errors
///
/// Returns [`MowerError::InvalidInput`] when `OM_HARDWARE_VERSION` is unset.
pub fn require_hardware_version(hardware: &HardwareConfig) -> Result<&str> {
    hardware.hardware_version.as_deref().ok_or_else(|| {
        MowerError::InvalidInput(
            "OM_HARDWARE_VERSION is not specified\nPlease configure it at \
             /boot/openmower/mower_config.txt before running this command again!"
                .to_owned(),
        )
    })
}

/// Pull the firmware for `hw` out of a downloaded archive into the session's
/// scratch directory.
///
/// # Errors
///
/// Returns [`MowerError::InvalidInput`] when the archive has no firmware for
/// this hardware version, or archive errors.
pub fn extract_firmware(session: &DownloadSession, hw: &str) -> Result<PathBuf> {
    let dest = session.dir().join(FIRMWARE_NAME);
    if archive::extract_member(session.archive(), &member_path(hw), &dest)? {
        Ok(dest)
    } else {
        Err(MowerError::InvalidInput(format!(
            "Firmware for hardware version '{hw}' not found in archive."
        )))
    }
}

/// Download the latest legacy firmware and flash it with openocd.
///
/// # Errors
///
/// Returns [`MowerError::InvalidInput`] when `OM_HARDWARE_VERSION` is unset or
/// unknown, download errors, or the openocd failure.
pub fn update(config: &CliConfig, feed: &ReleaseFeed) -> Result<()> {
    let hw = require_hardware_version(&config.hardware)?;

    console::info("Downloading latest firmware ...");
    let session = feed.download_url(&config.firmware.legacy_firmware_url, ARCHIVE_NAME)?;

    let result = extract_firmware(&session, hw)
        .and_then(|elf| openocd::flash(&config.firmware, &elf));
    if let Err(e) = session.close() {
        tracing::debug!(error = %e, "scratch cleanup failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_path_per_hardware_version() {
        assert_eq!(member_path("0_13_X"), "firmware/0_13_X/firmware.elf");
    }

    #[test]
    fn update_requires_hardware_version() {
        let feed = ReleaseFeed::new(&crate::config::ReleaseConfig {
            api_base: "http://127.0.0.1:9".to_owned(),
            ..Default::default()
        });
        let err = update(&CliConfig::default(), &feed).unwrap_err();
        assert!(matches!(err, MowerError::InvalidInput(_)));
        assert!(err.to_string().contains("OM_HARDWARE_VERSION"));
    }
}
