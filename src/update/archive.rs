//! Zip archive handling and executable sniffing.

use crate::error::{MowerError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Self-contained executable formats we are willing to replace in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableFormat {
    /// Linux/BSD native binary.
    Elf,
    /// macOS native binary (thin or fat).
    MachO,
    /// Windows native binary.
    Pe,
    /// Zip-based application bundle (optionally behind a shebang line).
    ZipApp,
}

impl std::fmt::Display for ExecutableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Elf => write!(f, "ELF"),
            Self::MachO => write!(f, "Mach-O"),
            Self::Pe => write!(f, "PE"),
            Self::ZipApp => write!(f, "zipapp"),
        }
    }
}

const MACHO_MAGICS: [[u8; 4]; 5] = [
    [0xfe, 0xed, 0xfa, 0xce],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
];

/// Identify the executable format of `path`, or `None` if it is not one we
/// recognise (scripts, truncated files, random data).
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn sniff_executable(path: &Path) -> Result<Option<ExecutableFormat>> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    let n = read_up_to(&mut file, &mut magic)?;
    let head = &magic[..n];

    if head == b"\x7fELF" {
        return Ok(Some(ExecutableFormat::Elf));
    }
    if n == 4 && MACHO_MAGICS.contains(&magic) {
        return Ok(Some(ExecutableFormat::MachO));
    }
    if head.starts_with(b"MZ") {
        return Ok(Some(ExecutableFormat::Pe));
    }

    // Zip readers locate the central directory from the end, so a shebang
    // prefix is fine.
    let file = File::open(path)?;
    if zip::ZipArchive::new(file).is_ok() {
        return Ok(Some(ExecutableFormat::ZipApp));
    }
    Ok(None)
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Extract every entry of `archive` into `dest`.
///
/// # Errors
///
/// Returns [`MowerError::Archive`] if the archive is unreadable or an entry
/// cannot be written.
pub fn extract_all(archive: &Path, dest: &Path) -> Result<()> {
    let mut zip = open(archive)?;
    zip.extract(dest)
        .map_err(|e| MowerError::Archive(format!("cannot extract {}: {e}", archive.display())))?;
    tracing::debug!(archive = %archive.display(), dest = %dest.display(), "archive extracted");
    Ok(())
}

/// Copy the single entry `member` of `archive` to `dest`.
///
/// Returns `Ok(false)` if the archive has no such entry.
///
/// # Errors
///
/// Returns [`MowerError::Archive`] if the archive is unreadable, or an I/O
/// error if `dest` cannot be written.
pub fn extract_member(archive: &Path, member: &str, dest: &Path) -> Result<bool> {
    let mut zip = open(archive)?;
    let mut entry = match zip.by_name(member) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(false),
        Err(e) => {
            return Err(MowerError::Archive(format!(
                "cannot read {member} from {}: {e}",
                archive.display()
            )));
        }
    };
    let mut out = File::create(dest)?;
    std::io::copy(&mut entry, &mut out)?;
    Ok(true)
}

fn open(archive: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(archive)?;
    zip::ZipArchive::new(file)
        .map_err(|e| MowerError::Archive(format!("cannot open {}: {e}", archive.display())))
}

/// Add execute permission for owner, group and others, keeping other bits.
///
/// # Errors
///
/// Returns an error if the permissions cannot be read or changed.
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o111))?;
    }
    let _ = path;
    Ok(())
}
