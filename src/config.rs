//! Configuration for the CLI.
//!
//! A [`CliConfig`] is assembled exactly once at process start from an
//! [`EnvSnapshot`] and then passed by reference to every component. Nothing
//! below this module reads the process environment.

use crate::error::{MowerError, Result};
use crate::paths;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const TRUE_VALUES: &[&str] = &["1", "true", "t", "yes", "y", "on"];
const FALSE_VALUES: &[&str] = &["0", "false", "f", "no", "n", "off"];

/// Frozen view of the environment variables the CLI cares about.
///
/// Built from the stack `.env` file overlaid with the process environment;
/// values already present in the process environment win.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Fill in variables from a dotenv file without overriding existing ones.
    ///
    /// Returns `Ok(false)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn merge_env_file(&mut self, path: &Path) -> Result<bool> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(MowerError::Config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        for (key, value) in parse_env_file(&contents) {
            self.vars.entry(key).or_insert(value);
        }
        Ok(true)
    }

    /// Look up a variable, treating empty values as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default).to_owned()
    }

    /// Parse a boolean variable.
    ///
    /// # Errors
    ///
    /// Returns [`MowerError::Config`] if the value is not a recognised boolean.
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        let Some(raw) = self.get(name) else {
            return Ok(None);
        };
        parse_bool(raw).map(Some).ok_or_else(|| {
            let mut valid: Vec<&str> = TRUE_VALUES.iter().chain(FALSE_VALUES).copied().collect();
            valid.sort_unstable();
            MowerError::Config(format!(
                "invalid boolean for {name}: {raw:?}. Use one of {}",
                valid.join(", ")
            ))
        })
    }
}

/// Parse a boolean the way the stack `.env` file spells them.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let s = raw.trim().to_ascii_lowercase();
    if TRUE_VALUES.contains(&s.as_str()) {
        Some(true)
    } else if FALSE_VALUES.contains(&s.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse `KEY=VALUE` lines from a dotenv file.
///
/// Blank lines and `#` comments are skipped, an optional `export ` prefix is
/// accepted and matching surrounding quotes are stripped.
pub fn parse_env_file(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), unquote(value.trim()).to_owned()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Top-level CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Container stack settings.
    pub stack: StackConfig,
    /// Release feed settings.
    pub releases: ReleaseConfig,
    /// Update-check notifier settings.
    pub update_check: UpdateCheckConfig,
    /// Hardware identity.
    pub hardware: HardwareConfig,
    /// Firmware flashing settings.
    pub firmware: FirmwareConfig,
    /// Serial bridge settings.
    pub bridge: BridgeConfig,
}

/// Everything needed to build a `docker compose` invocation.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Path to the docker binary.
    pub docker_bin: PathBuf,
    /// Path to the compose file.
    pub compose_file: PathBuf,
    /// Stack name exported into interactive shells.
    pub stack_name: String,
    /// Service used when none is given.
    pub default_service: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            docker_bin: PathBuf::from("/usr/bin/docker"),
            compose_file: PathBuf::from(paths::DEFAULT_COMPOSE_FILE),
            stack_name: "openmower".to_owned(),
            default_service: "openmower".to_owned(),
        }
    }
}

/// Release feed configuration.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Base URL of the release API (no trailing slash).
    pub api_base: String,
    /// `owner/name` of the CLI repository.
    pub cli_repo: String,
    /// `owner/name` of the V2 firmware repository.
    pub firmware_repo: String,
    /// Timeout for metadata lookups, in seconds.
    pub metadata_timeout_secs: u64,
    /// Timeout for archive downloads, in seconds.
    pub download_timeout_secs: u64,
    /// Parent directory for scratch directories (None = system temp dir).
    pub scratch_root: Option<PathBuf>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_owned(),
            cli_repo: "ClemensElflein/openmower-cli".to_owned(),
            firmware_repo: "xtech/fw-openmower-v2".to_owned(),
            metadata_timeout_secs: 10,
            download_timeout_secs: 300,
            scratch_root: None,
        }
    }
}

/// Update-check notifier configuration.
#[derive(Debug, Clone)]
pub struct UpdateCheckConfig {
    /// Minimum number of days between two checks.
    pub interval_days: u64,
    /// Where the last-check timestamp is persisted.
    pub state_file: PathBuf,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            interval_days: 7,
            state_file: paths::last_check_file(),
        }
    }
}

/// Hardware identity read from the environment.
#[derive(Debug, Clone, Default)]
pub struct HardwareConfig {
    /// `Some(true)` for V2 hardware; `None` when `V2_HARDWARE` is unset.
    pub v2: Option<bool>,
    /// Mower identifier selecting the V2 firmware asset.
    pub mower: Option<String>,
    /// Legacy hardware version selecting the firmware variant.
    pub hardware_version: Option<String>,
}

impl HardwareConfig {
    /// Whether V2 commands apply (unset means legacy).
    pub fn is_v2(&self) -> bool {
        self.v2.unwrap_or(false)
    }
}

/// Firmware flashing configuration.
#[derive(Debug, Clone)]
pub struct FirmwareConfig {
    /// Download URL of the legacy firmware archive.
    pub legacy_firmware_url: String,
    /// Container image providing the xcore boot uploader.
    pub xcore_image: String,
    /// Network interface the xcore uploader talks through.
    pub xcore_interface: String,
    /// sysfs GPIO root used when `pinctrl` is unavailable.
    pub gpio_sysfs_root: PathBuf,
    /// GPIO line that powers the RP2040.
    pub power_gpio: u32,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            legacy_firmware_url:
                "https://github.com/ClemensElflein/OpenMower/releases/download/latest/firmware.zip"
                    .to_owned(),
            xcore_image: "ghcr.io/xtech/fw-xcore-boot:latest".to_owned(),
            xcore_interface: "eth0".to_owned(),
            gpio_sysfs_root: PathBuf::from("/sys/class/gpio"),
            power_gpio: 10,
        }
    }
}

/// Serial bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// TCP port used when `--port` is not given.
    pub default_port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { default_port: 1234 }
    }
}

impl CliConfig {
    /// Build the configuration from an environment snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`MowerError::Config`] when a variable holds an invalid value.
    pub fn from_env(env: &EnvSnapshot) -> Result<Self> {
        let defaults = Self::default();

        let stack = StackConfig {
            docker_bin: env
                .get("OPENMOWER_DOCKER_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.stack.docker_bin),
            compose_file: env
                .get("OPENMOWER_COMPOSE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.stack.compose_file),
            stack_name: env.get_or("OPENMOWER_STACK_NAME", &defaults.stack.stack_name),
            default_service: env
                .get_or("OPENMOWER_DEFAULT_SERVICE", &defaults.stack.default_service),
        };

        let releases = ReleaseConfig {
            cli_repo: env.get_or("OPENMOWER_CLI_REPO", &defaults.releases.cli_repo),
            firmware_repo: env.get_or("OPENMOWER_FW_REPO", &defaults.releases.firmware_repo),
            ..defaults.releases
        };

        let hardware = HardwareConfig {
            v2: env.get_bool("V2_HARDWARE")?,
            mower: env.get("MOWER").map(str::to_owned),
            hardware_version: env.get("OM_HARDWARE_VERSION").map(str::to_owned),
        };

        Ok(Self {
            stack,
            releases,
            hardware,
            ..defaults
        })
    }
}

/// Path of the stack env file, honouring `OPENMOWER_ENV_PATH`.
pub fn env_file_path(env: &EnvSnapshot) -> PathBuf {
    env.get("OPENMOWER_ENV_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(paths::DEFAULT_ENV_FILE))
}
