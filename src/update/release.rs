//! Release feed client.
//!
//! Talks to a GitHub-compatible releases API: `GET /repos/{repo}/releases/latest`
//! or `GET /repos/{repo}/releases/tags/{tag}`. Every call hits the network;
//! nothing is cached beyond the current command.

use crate::config::ReleaseConfig;
use crate::error::{MowerError, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Extension of release archives we know how to unpack.
pub const ARCHIVE_EXTENSION: &str = ".zip";

const USER_AGENT: &str = concat!("openmower-cli/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which release of which repository to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    /// Repository slug (`owner/name`).
    pub repo: String,
    /// Tag to fetch; `None` means whatever the feed currently calls latest.
    pub tag: Option<String>,
}

impl ReleaseRef {
    /// The latest release of `repo`.
    pub fn latest(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            tag: None,
        }
    }

    /// A specific tag of `repo`, or the latest when `tag` is `None`.
    pub fn new(repo: impl Into<String>, tag: Option<&str>) -> Self {
        Self {
            repo: repo.into(),
            tag: tag.map(str::to_owned),
        }
    }

    /// Path of the release endpoint relative to the API base.
    pub fn api_path(&self) -> String {
        match &self.tag {
            Some(tag) => format!("/repos/{}/releases/tags/{tag}", self.repo),
            None => format!("/repos/{}/releases/latest", self.repo),
        }
    }
}

impl std::fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.repo, self.tag.as_deref().unwrap_or("latest"))
    }
}

/// Release metadata as returned by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Tag name (e.g. "v0.3.0").
    #[serde(default)]
    pub tag_name: String,
    /// Downloadable assets in feed order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A single downloadable release asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    /// Asset filename.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
}

impl Asset {
    fn matches(&self, filter: Option<&str>) -> bool {
        match filter {
            Some(f) => self.name == f || self.name.ends_with(f),
            None => self.name.ends_with(ARCHIVE_EXTENSION),
        }
    }
}

/// Pick the asset to download from a release.
///
/// With a filter, the first asset whose name equals or ends with it; without,
/// the first archive asset. Feed order decides between several candidates,
/// which the feed does not guarantee, so that case is logged.
pub fn select_asset<'r>(assets: &'r [Asset], filter: Option<&str>) -> Option<&'r Asset> {
    let mut candidates = assets.iter().filter(|a| a.matches(filter));
    let first = candidates.next()?;
    let others = candidates.count();
    if others > 0 {
        tracing::warn!(
            chosen = %first.name,
            others,
            "several release assets match, taking the first in feed order"
        );
    }
    Some(first)
}

/// Blocking client for release metadata and asset downloads.
#[derive(Debug, Clone)]
pub struct ReleaseFeed {
    pub(super) api_base: String,
    pub(super) metadata_agent: ureq::Agent,
    pub(super) download_agent: ureq::Agent,
    pub(super) scratch_root: Option<PathBuf>,
}

impl ReleaseFeed {
    /// Build a client from the release configuration.
    pub fn new(config: &ReleaseConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            metadata_agent: metadata_agent(Duration::from_secs(config.metadata_timeout_secs)),
            download_agent: download_agent(Duration::from_secs(config.download_timeout_secs)),
            scratch_root: config.scratch_root.clone(),
        }
    }

    /// Fetch release metadata. One request, no retries.
    ///
    /// # Errors
    ///
    /// Returns [`MowerError::Network`] for transport failures and non-200
    /// responses (the status code is part of the message), or when the body
    /// is not valid release JSON.
    pub fn fetch(&self, release: &ReleaseRef) -> Result<Release> {
        let url = format!("{}{}", self.api_base, release.api_path());
        tracing::debug!(%url, "fetching release metadata");

        let resp = self
            .metadata_agent
            .get(&url)
            .set("Accept", "application/vnd.github+json")
            .call()
            .map_err(|e| http_error("Failed to fetch release info", &url, e))?;
        ensure_ok("Failed to fetch release info", &url, resp.status())?;

        let body = resp
            .into_string()
            .map_err(|e| MowerError::Network(format!("cannot read release info from {url}: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| MowerError::Network(format!("invalid release info from {url}: {e}")))
    }
}

/// Metadata lookups are small: bound the whole request, not each read, so a
/// trickling feed cannot stall the command.
fn metadata_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Archives can be large on slow links, so only stalls are bounded.
fn download_agent(read_timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .timeout_read(read_timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Turn a ureq failure into a network error carrying the status when known.
pub(super) fn http_error(context: &str, url: &str, err: ureq::Error) -> MowerError {
    match err {
        ureq::Error::Status(code, _) => MowerError::Network(format!("{context} ({code}) from {url}")),
        ureq::Error::Transport(t) => MowerError::Network(format!("{context} from {url}: {t}")),
    }
}

/// ureq only errors on 4xx/5xx; anything but 200 is a failure here.
pub(super) fn ensure_ok(context: &str, url: &str, status: u16) -> Result<()> {
    if status == 200 {
        Ok(())
    } else {
        Err(MowerError::Network(format!("{context} ({status}) from {url}")))
    }
}
