//! Rate-limited "newer release available" check.
//!
//! Runs at most once per interval per installation. The timestamp is written
//! after every attempt, including failed ones, so an unreachable feed is not
//! hit again on every invocation.

use super::release::{ReleaseFeed, ReleaseRef};
use super::state::UpdateCheckState;
use crate::error::Result;
use chrono::{DateTime, Local, TimeDelta};
use std::cmp::Ordering;
use std::path::Path;

/// Outcome of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// The last check is recent enough; the feed was not contacted.
    Skipped,
    /// The feed's latest release is not newer than the running version.
    UpToDate,
    /// A newer release exists.
    Available {
        /// Tag of the newer release.
        latest: String,
    },
}

/// Checks the release feed for a newer version of the CLI.
#[derive(Debug)]
pub struct UpdateChecker<'a> {
    feed: &'a ReleaseFeed,
    state_file: &'a Path,
    max_age: TimeDelta,
}

impl<'a> UpdateChecker<'a> {
    /// Create a checker persisting its timestamp in `state_file`.
    pub fn new(feed: &'a ReleaseFeed, state_file: &'a Path, max_age: TimeDelta) -> Self {
        Self {
            feed,
            state_file,
            max_age,
        }
    }

    /// Check `repo` for a release newer than `current_version`, unless a
    /// check already happened within the interval.
    ///
    /// # Errors
    ///
    /// Returns the feed error when the lookup fails. The timestamp has been
    /// updated by then; callers normally discard the error.
    pub fn check_if_needed(&self, current_version: &str, repo: &str) -> Result<UpdateCheck> {
        self.check_at(current_version, repo, Local::now())
    }

    fn check_at(
        &self,
        current_version: &str,
        repo: &str,
        now: DateTime<Local>,
    ) -> Result<UpdateCheck> {
        let mut state = UpdateCheckState::load(self.state_file);
        if !state.check_is_stale(self.max_age, now) {
            return Ok(UpdateCheck::Skipped);
        }

        tracing::debug!(repo, "checking for a new version");
        let result = self
            .feed
            .fetch(&ReleaseRef::latest(repo))
            .map(|release| classify(&release.tag_name, current_version));

        state.mark_checked(now);
        if let Err(e) = state.save(self.state_file) {
            tracing::debug!(error = %e, "could not persist update-check timestamp");
        }
        result
    }
}

fn classify(latest: &str, current: &str) -> UpdateCheck {
    if !latest.is_empty() && is_newer(latest, current) {
        UpdateCheck::Available {
            latest: latest.to_owned(),
        }
    } else {
        UpdateCheck::UpToDate
    }
}

/// Numeric components of a dotted version.
///
/// A leading `v` is ignored and parsing stops at the first component that is
/// not a plain number, so `"1.2.3-beta"` yields `[1, 2]`. Never empty.
pub fn parse_version(version: &str) -> Vec<u64> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<u64> = version
        .split('.')
        .map_while(|p| p.parse::<u64>().ok())
        .collect();
    if parts.is_empty() { vec![0] } else { parts }
}

/// Compare two dotted versions, padding the shorter one with zeros.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = parse_version(a);
    let b = parse_version(b);
    let len = a.len().max(b.len());
    let component = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
    (0..len)
        .map(|i| component(&a, i).cmp(&component(&b, i)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Whether `latest` is strictly newer than `current`.
pub fn is_newer(latest: &str, current: &str) -> bool {
    compare_versions(latest, current) == Ordering::Greater
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn parse_version_strips_prefix_and_suffix() {
        assert_eq!(parse_version("v1.3.0"), vec![1, 3, 0]);
        assert_eq!(parse_version(" 0.52.9 "), vec![0, 52, 9]);
        assert_eq!(parse_version("1.2.0-beta"), vec![1, 2]);
        assert_eq!(parse_version("1.2.3rc1"), vec![1, 2]);
        assert_eq!(parse_version("garbage"), vec![0]);
        assert_eq!(parse_version(""), vec![0]);
    }

    #[test]
    fn newer_versions() {
        assert!(is_newer("v1.3.0", "1.2.9"));
        assert!(is_newer("1.10", "1.9.9"));
        assert!(is_newer("2", "1.99.99"));
        assert!(is_newer("0.3.1", "v0.3.0"));
    }

    #[test]
    fn equal_or_older_versions() {
        assert!(!is_newer("1.2", "1.2.0"));
        assert!(!is_newer("1.2.0", "1.2"));
        assert!(!is_newer("1.2.0-beta", "1.2.0"));
        assert!(!is_newer("1.2.9", "v1.3.0"));
        assert!(!is_newer("v0.3.0", "0.3.0"));
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let versions = ["0.1", "0.1.0", "v0.2", "1.0.0-rc1", "1.0.1", "10.0"];
        for a in versions {
            for b in versions {
                assert!(!(is_newer(a, b) && is_newer(b, a)), "{a} vs {b}");
                assert_eq!(compare_versions(a, b), compare_versions(b, a).reverse());
            }
        }
    }

    #[test]
    fn classify_ignores_empty_tags() {
        assert_eq!(classify("", "0.1.0"), UpdateCheck::UpToDate);
        assert_eq!(classify("v0.1.0", "0.1.0"), UpdateCheck::UpToDate);
        assert_eq!(
            classify("v0.2.0", "0.1.0"),
            UpdateCheck::Available {
                latest: "v0.2.0".to_owned()
            }
        );
    }

    #[test]
    fn fresh_state_skips_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("last_update_check.json");
        let now = Local::now();
        let mut state = UpdateCheckState::default();
        state.mark_checked(now);
        state.save(&state_file).unwrap();

        // Unroutable feed: any network access would fail the check.
        let config = crate::config::ReleaseConfig {
            api_base: "http://127.0.0.1:9".to_owned(),
            ..Default::default()
        };
        let feed = ReleaseFeed::new(&config);
        let checker = UpdateChecker::new(&feed, &state_file, TimeDelta::days(7));
        assert_eq!(
            checker.check_at("0.1.0", "a/b", now).unwrap(),
            UpdateCheck::Skipped
        );
    }
}
