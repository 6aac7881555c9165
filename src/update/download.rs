//! Asset downloads into caller-owned scratch directories.
//!
//! A [`DownloadSession`] owns a fresh temporary directory holding the
//! downloaded archive. The directory is removed when the session is closed
//! or dropped, so it is reclaimed on every exit path including errors and
//! early returns. Failures inside [`ReleaseFeed::download`] never leak a
//! directory: it is dropped before the error reaches the caller.

use super::release::{ReleaseFeed, ReleaseRef, ensure_ok, http_error, select_asset};
use crate::error::{MowerError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CHUNK_SIZE: usize = 64 * 1024;
const SCRATCH_PREFIX: &str = "openmower-";

/// A downloaded archive inside its own scratch directory.
#[derive(Debug)]
pub struct DownloadSession {
    dir: TempDir,
    archive: PathBuf,
    tag: String,
}

impl DownloadSession {
    /// Scratch directory owned by this session.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the downloaded archive (inside [`Self::dir`]).
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Tag of the release the archive came from (`"latest"` for direct URLs).
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Remove the scratch directory now.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from removing the directory. Callers on a
    /// failure path usually ignore it so the original error wins.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_owned();
        self.dir.close()?;
        tracing::debug!(path = %path.display(), "scratch directory removed");
        Ok(())
    }
}

impl ReleaseFeed {
    /// Resolve `release`, pick one asset and stream it into a new scratch
    /// directory.
    ///
    /// `name_filter` selects by exact name or suffix; without it the first
    /// `.zip` asset is taken.
    ///
    /// # Errors
    ///
    /// Returns [`MowerError::Network`] when metadata or the body cannot be
    /// fetched, and [`MowerError::AssetNotFound`] when no asset matches. No
    /// scratch directory survives an error.
    pub fn download(
        &self,
        release: &ReleaseRef,
        name_filter: Option<&str>,
    ) -> Result<DownloadSession> {
        let metadata = self.fetch(release)?;
        let asset = select_asset(&metadata.assets, name_filter).ok_or_else(|| {
            MowerError::AssetNotFound(match name_filter {
                Some(f) => format!("No asset matching '{f}' found in release {release}"),
                None => format!("No zip asset found in release {release}"),
            })
        })?;

        let tag = if metadata.tag_name.is_empty() {
            release.tag.clone().unwrap_or_else(|| "latest".to_owned())
        } else {
            metadata.tag_name.clone()
        };

        self.download_into_scratch(&asset.browser_download_url, &asset.name, tag)
    }

    /// Stream a file from a fixed URL into a new scratch directory.
    ///
    /// # Errors
    ///
    /// Same as [`Self::download`], minus asset selection.
    pub fn download_url(&self, url: &str, file_name: &str) -> Result<DownloadSession> {
        self.download_into_scratch(url, file_name, "latest".to_owned())
    }

    fn download_into_scratch(
        &self,
        url: &str,
        file_name: &str,
        tag: String,
    ) -> Result<DownloadSession> {
        // Asset names come from the feed; never let them escape the scratch dir.
        let file_name = Path::new(file_name)
            .file_name()
            .map_or_else(|| "download.zip".into(), |n| n.to_owned());

        let dir = self.scratch_dir()?;
        let archive = dir.path().join(&file_name);
        tracing::debug!(%url, dest = %archive.display(), "downloading asset");

        // `dir` is dropped (and removed) if streaming fails.
        self.stream_to_file(url, &file_name.to_string_lossy(), &archive)?;

        Ok(DownloadSession { dir, archive, tag })
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn stream_to_file(&self, url: &str, label: &str, dest: &Path) -> Result<u64> {
        let resp = self
            .download_agent
            .get(url)
            .call()
            .map_err(|e| http_error("Failed to download asset", url, e))?;
        ensure_ok("Failed to download asset", url, resp.status())?;

        let total_bytes = resp
            .header("content-length")
            .and_then(|v| v.parse::<u64>().ok());

        let pb = ProgressBar::new(total_bytes.unwrap_or(0));
        if let Ok(style) =
            ProgressStyle::with_template("  {msg} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec}")
        {
            pb.set_style(style);
        }
        pb.set_message(label.to_owned());

        let mut file = std::fs::File::create(dest)?;
        let mut reader = resp.into_reader();
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| MowerError::Network(format!("download of {url} interrupted: {e}")))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            written += n as u64;
            pb.inc(n as u64);
        }
        file.flush()?;
        pb.finish_and_clear();

        tracing::debug!(bytes = written, "download complete");
        Ok(written)
    }
}
