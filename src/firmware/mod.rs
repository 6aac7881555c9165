//! Mainboard firmware updates.
//!
//! V2 boards receive firmware through the xcore uploader container; legacy
//! boards are flashed over SWD with openocd after powering the RP2040.

pub mod gpio;
pub mod legacy;
pub mod openocd;
pub mod xcore;

use crate::config::{CliConfig, HardwareConfig};
use crate::error::Result;
use crate::update::ReleaseFeed;

/// Check that the identity variable the update flow needs is set, without
/// touching the network.
///
/// # Errors
///
/// Returns [`crate::MowerError::InvalidInput`] naming the missing variable.
pub fn check_identity(hardware: &HardwareConfig) -> Result<()> {
    if hardware.is_v2() {
        xcore::require_mower(hardware).map(|_| ())
    } else {
        legacy::require_hardware_version(hardware).map(|_| ())
    }
}

/// Run the firmware update matching the configured hardware generation.
///
/// # Errors
///
/// Propagates the error of the selected flow.
pub fn update(config: &CliConfig, feed: &ReleaseFeed) -> Result<()> {
    if config.hardware.is_v2() {
        xcore::update(config, feed)
    } else {
        legacy::update(config, feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_depends_on_hardware_generation() {
        let v2 = HardwareConfig {
            v2: Some(true),
            hardware_version: Some("0_13_X".to_owned()),
            ..Default::default()
        };
        let err = check_identity(&v2).unwrap_err();
        assert!(err.to_string().contains("MOWER"));
        assert_eq!(err.exit_code(), 2);

        let legacy = HardwareConfig {
            v2: Some(false),
            mower: Some("yardforce500".to_owned()),
            ..Default::default()
        };
        let err = check_identity(&legacy).unwrap_err();
        assert!(err.to_string().contains("OM_HARDWARE_VERSION"));

        let ready = HardwareConfig {
            v2: Some(true),
            mower: Some("yardforce500".to_owned()),
            ..Default::default()
        };
        assert!(check_identity(&ready).is_ok());
    }
}
