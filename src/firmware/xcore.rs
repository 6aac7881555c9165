//! Firmware upload for V2 (xcore) mainboards.
//!
//! The latest firmware release is downloaded and unpacked into a scratch
//! directory, then handed to the xcore boot uploader running in a container
//! on the host network.

use crate::config::{CliConfig, HardwareConfig, StackConfig};
use crate::console;
use crate::error::{MowerError, Result};
use crate::process::{self, ToolCommand};
use crate::update::{ReleaseFeed, ReleaseRef, archive};
use std::path::{Path, PathBuf};

/// Mount point of the scratch directory inside the uploader container.
const WORKDIR: &str = "/workdir";

/// File name of the firmware image for `mower`.
pub fn firmware_file_name(mower: &str) -> String {
    format!("openmower-{mower}.bin")
}

/// Find the firmware image for `mower` in an extracted release.
///
/// # Errors
///
/// Returns [`MowerError::ContentMismatch`] naming the expected path when the
/// release has no image for this mower.
pub fn locate_firmware(dir: &Path, mower: &str) -> Result<PathBuf> {
    let path = dir.join(firmware_file_name(mower));
    if path.is_file() {
        return Ok(path);
    }
    Err(MowerError::ContentMismatch(format!(
        "Firmware file not found: {}. Check that the MOWER environment variable \
         ('{mower}') names a supported mower.",
        path.display()
    )))
}

/// The mower identifier selecting the firmware image.
///
/// # Errors
///
/// Returns [`MowerError::InvalidInput`] when `MOWER` is unset.
pub fn require_mower(hardware: &HardwareConfig) -> Result<&str> {
    hardware.mower.as_deref().ok_or_else(|| {
        MowerError::InvalidInput(
            "Environment variable MOWER is not set. Please set MOWER to your mower \
             identifier and retry."
                .to_owned(),
        )
    })
}

/// `docker pull <image>`.
pub fn pull_command(stack: &StackConfig, image: &str) -> ToolCommand {
    ToolCommand::new(&stack.docker_bin).args(["pull", image])
}

/// `docker run ... <image> -i <iface> upload /workdir/<file>`.
pub fn upload_command(
    stack: &StackConfig,
    image: &str,
    interface: &str,
    dir: &Path,
    file_name: &str,
) -> ToolCommand {
    let mut volume = std::ffi::OsString::from("-v");
    volume.push(dir.as_os_str());
    volume.push(format!(":{WORKDIR}"));

    ToolCommand::new(&stack.docker_bin)
        .args(["run", "--rm", "-it", "--network=host"])
        .arg(volume)
        .arg(image)
        .args(["-i", interface, "upload"])
        .arg(format!("{WORKDIR}/{file_name}"))
}

/// Download the latest V2 firmware and upload it to the mainboard.
///
/// # Errors
///
/// Returns [`MowerError::InvalidInput`] when `MOWER` is unset, download and
/// archive errors, [`MowerError::ContentMismatch`] when the release has no
/// image for this mower, or the failing docker step.
pub fn update(config: &CliConfig, feed: &ReleaseFeed) -> Result<()> {
    let mower = require_mower(&config.hardware)?;

    let release = ReleaseRef::latest(&config.releases.firmware_repo);
    console::info(&format!("Downloading latest firmware from {release} ..."));
    let session = feed.download(&release, None)?;
    tracing::info!(tag = session.tag(), mower, "firmware release downloaded");

    let result = upload(config, session.dir(), session.archive(), mower);
    if let Err(e) = session.close() {
        tracing::debug!(error = %e, "scratch cleanup failed");
    }
    result
}

fn upload(config: &CliConfig, dir: &Path, archive_path: &Path, mower: &str) -> Result<()> {
    archive::extract_all(archive_path, dir)?;
    let firmware = locate_firmware(dir, mower)?;
    let file_name = firmware_file_name(mower);
    let image = &config.firmware.xcore_image;

    console::info(&format!("Pulling {image} ..."));
    process::run(&pull_command(&config.stack, image))?;

    console::info(&format!("Uploading {} ...", firmware.display()));
    process::run(&upload_command(
        &config.stack,
        image,
        &config.firmware.xcore_interface,
        dir,
        &file_name,
    ))?;
    console::success("Firmware upload complete.");
    Ok(())
}
