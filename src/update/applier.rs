//! Self-update: download a release and swap it in for the running binary.
//!
//! The pipeline:
//! 1. resolve and sanity-check the running executable (no network before this)
//! 2. download the release archive into a scratch directory
//! 3. extract it and locate the inner `openmower` binary
//! 4. copy it next to the running executable and atomically rename it over
//!    the original
//!
//! The scratch directory is reclaimed on every path out of step 2 onward.
//! The running process is never re-executed; the operator re-runs the command.

use super::archive::{self, ExecutableFormat};
use super::download::DownloadSession;
use super::release::{ReleaseFeed, ReleaseRef};
use crate::error::{MowerError, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Name of the executable inside a release archive.
pub const INNER_BINARY: &str = "openmower";

/// What to update to.
#[derive(Debug, Clone)]
pub struct SelfUpdate<'a> {
    /// Repository slug to fetch releases from.
    pub repo: &'a str,
    /// Tag to install; `None` installs the latest release.
    pub version: Option<&'a str>,
    /// Only report what would happen.
    pub dry_run: bool,
}

/// Result of a self-update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Dry run: the archive was downloaded and discarded.
    DryRun {
        /// Tag of the release that would be installed.
        tag: String,
        /// Name of the archive that would be unpacked.
        archive: String,
    },
    /// The executable was replaced. The running process is stale.
    Updated {
        /// Tag that was installed.
        tag: String,
        /// Path of the replaced executable.
        path: PathBuf,
    },
}

/// Returns the absolute, symlink-resolved path of the running executable.
///
/// # Errors
///
/// Returns [`MowerError::Precondition`] if the path cannot be determined or
/// resolved.
pub fn current_exe_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| {
        MowerError::Precondition(format!("Cannot resolve current executable path: {e}"))
    })?;
    exe.canonicalize().map_err(|e| {
        MowerError::Precondition(format!(
            "Cannot resolve current executable path {}: {e}",
            exe.display()
        ))
    })
}

/// Check that `target` exists and is a self-contained executable we know.
///
/// # Errors
///
/// Returns [`MowerError::Precondition`] otherwise.
pub fn check_target(target: &Path) -> Result<ExecutableFormat> {
    if !target.is_file() {
        return Err(MowerError::Precondition(format!(
            "Cannot resolve current executable path: {}",
            target.display()
        )));
    }
    let format = archive::sniff_executable(target)
        .map_err(|e| {
            MowerError::Precondition(format!("Cannot inspect {}: {e}", target.display()))
        })?
        .ok_or_else(|| {
            MowerError::Precondition(format!(
                "Current executable does not look like a self-contained executable: {}. Exiting.",
                target.display()
            ))
        })?;
    tracing::debug!(target = %target.display(), %format, "update target accepted");
    Ok(format)
}

/// Run the self-update pipeline against `target`.
///
/// # Errors
///
/// Precondition failures happen before any network access. Download errors
/// surface unchanged, a release without the inner binary yields
/// [`MowerError::ContentMismatch`], and a failed swap yields
/// [`MowerError::Permission`] or [`MowerError::Io`] with the original
/// executable untouched.
pub fn self_update(
    feed: &ReleaseFeed,
    target: &Path,
    request: &SelfUpdate<'_>,
) -> Result<UpdateOutcome> {
    check_target(target)?;

    let release = ReleaseRef::new(request.repo, request.version);
    tracing::info!(%release, "fetching release artifact");
    let session = feed.download(&release, None)?;

    let outcome = install(&session, target, request.dry_run);

    if let Err(e) = session.close() {
        tracing::debug!(error = %e, "failed to remove scratch directory");
    }
    outcome
}

fn install(session: &DownloadSession, target: &Path, dry_run: bool) -> Result<UpdateOutcome> {
    if dry_run {
        return Ok(UpdateOutcome::DryRun {
            tag: session.tag().to_owned(),
            archive: session
                .archive()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        });
    }

    archive::extract_all(session.archive(), session.dir())?;

    let new_binary = session.dir().join(INNER_BINARY);
    if !new_binary.is_file() {
        return Err(MowerError::ContentMismatch(format!(
            "Failed to locate '{INNER_BINARY}' executable inside the downloaded archive."
        )));
    }
    archive::set_executable(&new_binary)?;

    tracing::info!(target = %target.display(), "replacing executable");
    replace_executable(&new_binary, target)?;

    Ok(UpdateOutcome::Updated {
        tag: session.tag().to_owned(),
        path: target.to_owned(),
    })
}

/// Atomically replace `target` with the contents of `new_binary`.
///
/// # Errors
///
/// See [`swap_in`].
pub fn replace_executable(new_binary: &Path, target: &Path) -> Result<()> {
    let source = std::fs::File::open(new_binary)?;
    swap_in(source, target)
}

/// Write `source` to a sibling temp file of `target` and rename it over
/// `target`.
///
/// The sibling lives in the same directory so the rename stays on one
/// filesystem and is atomic: `target` either holds the complete new content
/// or is untouched. A partially written sibling is removed on failure.
///
/// # Errors
///
/// Returns [`MowerError::Permission`] when the directory or target is not
/// writable, and [`MowerError::Io`] for other failures.
pub fn swap_in(mut source: impl Read, target: &Path) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| INNER_BINARY.to_owned());

    let mut sibling = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| swap_error(target, e))?;

    std::io::copy(&mut source, sibling.as_file_mut()).map_err(|e| swap_error(target, e))?;
    sibling
        .as_file_mut()
        .flush()
        .and_then(|()| sibling.as_file().sync_all())
        .map_err(|e| swap_error(target, e))?;

    set_swap_permissions(sibling.path(), target).map_err(|e| swap_error(target, e))?;

    sibling
        .persist(target)
        .map_err(|e| swap_error(target, e.error))?;
    tracing::info!(path = %target.display(), "executable replaced");
    Ok(())
}

/// Give the sibling the target's mode plus execute bits (0o755 if the target
/// is gone).
fn set_swap_permissions(sibling: &Path, target: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let base = std::fs::metadata(target)
            .map(|m| m.permissions().mode() & 0o7777)
            .unwrap_or(0o755);
        std::fs::set_permissions(sibling, std::fs::Permissions::from_mode(base | 0o111))?;
    }
    let _ = (sibling, target);
    Ok(())
}

fn swap_error(target: &Path, err: std::io::Error) -> MowerError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        MowerError::Permission(format!(
            "Failed to update executable at {}: {err}",
            target.display()
        ))
    } else {
        MowerError::Io(err)
    }
}
