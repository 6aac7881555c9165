//! Centralized filesystem locations for the CLI.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution:
//!
//! | Purpose | Linux | macOS |
//! |---------|-------|-------|
//! | Config | `~/.config/openmower-cli/` | `~/Library/Application Support/openmower-cli/` |
//!
//! The stack itself lives in a fixed location on the robot image
//! (`/opt/stacks/openmower/`), which is not user-relative.

use std::path::PathBuf;

/// Directory name used under the platform config directory.
const APP_DIR: &str = "openmower-cli";

/// Default location of the stack environment file.
pub const DEFAULT_ENV_FILE: &str = "/opt/stacks/openmower/.env";

/// Default location of the stack compose file.
pub const DEFAULT_COMPOSE_FILE: &str = "/opt/stacks/openmower/compose.yaml";

/// CLI config directory (`dirs::config_dir()/openmower-cli/`).
///
/// Falls back to `/tmp/openmower-cli` when no home directory can be resolved
/// (e.g. minimal boot-script environments).
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp").join(APP_DIR))
}

/// Persisted update-check timestamp (`config_dir()/last_update_check.json`).
#[must_use]
pub fn last_check_file() -> PathBuf {
    config_dir().join("last_update_check.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_ends_with_app_dir() {
        assert!(config_dir().ends_with(APP_DIR));
    }

    #[test]
    fn last_check_file_is_json_inside_config_dir() {
        let file = last_check_file();
        assert_eq!(file.parent(), Some(config_dir().as_path()));
        assert_eq!(
            file.file_name().and_then(|n| n.to_str()),
            Some("last_update_check.json")
        );
    }
}
