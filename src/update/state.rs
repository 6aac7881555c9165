//! Update-check state persistence.
//!
//! Tracks when the release feed was last asked for a newer version.
//! Persisted as `{"last_check": "<ISO-8601>"}` in the CLI config directory.
//! A missing or unreadable file means "never checked".

use crate::error::{MowerError, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persistent update-check state for this installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCheckState {
    /// ISO 8601 timestamp of the last update check.
    pub last_check: Option<String>,
}

impl UpdateCheckState {
    /// Load state from `path`. Returns the default state if the file is
    /// missing or cannot be parsed.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => return Self::default(),
        };

        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    /// Persist the state to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MowerError::Io(std::io::Error::new(
                    e.kind(),
                    format!("cannot create state directory {}: {e}", parent.display()),
                ))
            })?;
        }

        let json = serde_json::to_string(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Record that a check was performed at `now`.
    pub fn mark_checked(&mut self, now: DateTime<Local>) {
        self.last_check = Some(now.to_rfc3339());
    }

    /// Parsed timestamp of the last check.
    ///
    /// Accepts RFC 3339 and naive ISO 8601 timestamps (interpreted as local
    /// time), as written by earlier releases of the CLI.
    pub fn last_checked(&self) -> Option<DateTime<Local>> {
        let raw = self.last_check.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Local));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()?
            .and_local_timezone(Local)
            .earliest()
    }

    /// Returns `true` if the last check is older than `max_age`, missing,
    /// unparseable, or in the future.
    pub fn check_is_stale(&self, max_age: TimeDelta, now: DateTime<Local>) -> bool {
        let Some(last) = self.last_checked() else {
            return true;
        };
        let elapsed = now.signed_duration_since(last);
        elapsed < TimeDelta::zero() || elapsed >= max_age
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_state_has_never_checked() {
        let state = UpdateCheckState::default();
        assert!(state.last_check.is_none());
        assert!(state.check_is_stale(TimeDelta::days(7), Local::now()));
    }

    #[test]
    fn mark_checked_makes_state_fresh() {
        let now = Local::now();
        let mut state = UpdateCheckState::default();
        state.mark_checked(now);
        assert!(!state.check_is_stale(TimeDelta::days(7), now));
        assert!(!state.check_is_stale(TimeDelta::days(7), now + TimeDelta::days(6)));
        assert!(state.check_is_stale(TimeDelta::days(7), now + TimeDelta::days(7)));
    }

    #[test]
    fn zero_max_age_is_always_stale() {
        let now = Local::now();
        let mut state = UpdateCheckState::default();
        state.mark_checked(now);
        assert!(state.check_is_stale(TimeDelta::zero(), now));
    }

    #[test]
    fn future_timestamp_is_stale() {
        let now = Local::now();
        let mut state = UpdateCheckState::default();
        state.mark_checked(now + TimeDelta::days(30));
        assert!(state.check_is_stale(TimeDelta::days(7), now));
    }

    #[test]
    fn naive_iso_timestamps_are_understood() {
        let state = UpdateCheckState {
            last_check: Some("2024-05-01T10:20:30.123456".to_owned()),
        };
        let parsed = state.last_checked().unwrap();
        assert_eq!(
            parsed.naive_local().to_string(),
            "2024-05-01 10:20:30.123456"
        );
    }

    #[test]
    fn garbage_timestamp_is_stale() {
        let state = UpdateCheckState {
            last_check: Some("not-a-date".to_owned()),
        };
        assert!(state.last_checked().is_none());
        assert!(state.check_is_stale(TimeDelta::days(7), Local::now()));
    }

    #[test]
    fn save_and_load_round_trip_in_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openmower-cli").join("last_update_check.json");

        let now = Local::now();
        let mut state = UpdateCheckState::default();
        state.mark_checked(now);
        state.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with(r#"{"last_check":""#));

        let loaded = UpdateCheckState::load(&path);
        assert_eq!(loaded, state);
        assert!(!loaded.check_is_stale(TimeDelta::days(1), now));
    }

    #[test]
    fn corrupt_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_update_check.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(UpdateCheckState::load(&path), UpdateCheckState::default());
    }

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = UpdateCheckState::load(&dir.path().join("absent.json"));
        assert!(state.last_check.is_none());
    }
}
