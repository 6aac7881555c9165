//! `openmower` command-line entry point.

use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use openmower_cli::config::{self, CliConfig, EnvSnapshot};
use openmower_cli::firmware::{self, openocd};
use openmower_cli::process::{self, bridge};
use openmower_cli::stack::ComposeStack;
use openmower_cli::update::{
    self, ReleaseFeed, SelfUpdate, UpdateCheck, UpdateChecker, UpdateOutcome,
};
use openmower_cli::{MowerError, Result, console};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Manage the OpenMower stack, firmware and this CLI.
#[derive(Parser)]
#[command(name = "openmower", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pull the latest images for every service.
    Pull,

    /// Start the stack in the background.
    Start,

    /// Stop all services.
    Stop,

    /// Restart all services.
    Restart,

    /// Show service status.
    Status,

    /// Show logs; follows all services when none are given.
    Logs {
        /// Services to show logs for.
        services: Vec<String>,
    },

    /// Open a shell in a service, or run a command in it.
    #[command(alias = "exec")]
    Shell {
        /// Service to enter (defaults to the main service).
        service: Option<String>,

        /// Command to run instead of an interactive login shell.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Replace this executable with a release build.
    SelfUpdate {
        /// Release tag to install (default: latest).
        #[arg(short = 'v', long = "version", value_name = "TAG")]
        tag: Option<String>,

        /// Repository to fetch releases from (`owner/name`).
        #[arg(long, value_name = "SLUG")]
        repo: Option<String>,

        /// Download the release but leave the executable alone.
        #[arg(long)]
        dry_run: bool,
    },

    /// Download and install the latest mainboard firmware.
    UpdateFirmware,

    /// Flash an ELF file onto the RP2040 (legacy hardware).
    FlashPico {
        /// Firmware ELF to flash.
        elf: PathBuf,
    },

    /// Run openocd listening on all interfaces (legacy hardware).
    Openocd,

    /// Expose an xESC UART over TCP until interrupted (legacy hardware).
    ExposeXesc {
        /// Which controller: left, right or mower.
        device: String,

        /// TCP port to listen on.
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Command {
    fn legacy_only(&self) -> bool {
        matches!(
            self,
            Self::FlashPico { .. } | Self::Openocd | Self::ExposeXesc { .. }
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is_child_exit() {
                console::error(&e.to_string());
            }
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

fn init_tracing() {
    // Operator output goes through `console`; tracing is for RUST_LOG debugging.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("openmower=warn,openmower_cli=warn")),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;

    let cancel = CancellationToken::new();
    if matches!(cli.command, Command::ExposeXesc { .. }) {
        watch_interrupt(cancel.clone());
    }

    // Everything below blocks on child processes or HTTP.
    tokio::task::spawn_blocking(move || dispatch(cli.command, &config, &cancel))
        .await
        .map_err(|e| MowerError::Io(std::io::Error::other(e)))?
}

fn load_config() -> Result<CliConfig> {
    let mut env = EnvSnapshot::from_process();
    let env_path = config::env_file_path(&env);
    match env.merge_env_file(&env_path) {
        Ok(true) => tracing::debug!(path = %env_path.display(), "loaded env file"),
        Ok(false) => console::warn(&format!(
            "Environment file not found: {}",
            env_path.display()
        )),
        Err(e) => console::warn(&e.to_string()),
    }

    let config = CliConfig::from_env(&env)?;
    if config.hardware.v2.is_none() {
        console::warn("V2_HARDWARE is not set, assuming legacy hardware.");
    }
    Ok(config)
}

fn watch_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            console::info("Interrupt received! Stopping...");
            cancel.cancel();
        }
    });
}

fn dispatch(command: Command, config: &CliConfig, cancel: &CancellationToken) -> Result<()> {
    // Bad arguments and missing identity variables fail before any network or
    // disk access, including the update check.
    validate(&command, config)?;

    let feed = ReleaseFeed::new(&config.releases);
    if !matches!(command, Command::SelfUpdate { .. }) {
        notify_if_outdated(config, &feed);
    }

    let stack = ComposeStack::new(&config.stack);
    match command {
        Command::Pull => process::run(&stack.pull()),
        Command::Start => process::run(&stack.start()),
        Command::Stop => process::run(&stack.stop()),
        Command::Restart => process::run(&stack.restart()),
        Command::Status => process::run(&stack.status()),
        Command::Logs { services } => process::run(&stack.logs(&services)),
        Command::Shell { service, command } => {
            process::run(&stack.shell(service.as_deref(), &command))
        }
        Command::SelfUpdate { tag, repo, dry_run } => {
            let repo = repo.as_deref().unwrap_or(&config.releases.cli_repo);
            run_self_update(&feed, repo, tag.as_deref(), dry_run)
        }
        Command::UpdateFirmware => firmware::update(config, &feed),
        Command::FlashPico { elf } => openocd::flash(&config.firmware, &elf),
        Command::Openocd => openocd::listen(&config.firmware),
        Command::ExposeXesc { device, port } => {
            let path = bridge::device_for(&device)?;
            let port = port.unwrap_or(config.bridge.default_port);
            console::info(&format!(
                "Exposing {device} ({path}) on TCP port {port}. Press Ctrl-C to stop."
            ));
            bridge::serve(cancel, port, path).map(|_| ())
        }
    }
}

fn validate(command: &Command, config: &CliConfig) -> Result<()> {
    if command.legacy_only() && config.hardware.is_v2() {
        return Err(MowerError::InvalidInput(
            "This command is only available on legacy (non-V2) hardware.".to_owned(),
        ));
    }
    match command {
        Command::ExposeXesc { device, .. } => bridge::device_for(device).map(|_| ()),
        Command::UpdateFirmware => firmware::check_identity(&config.hardware),
        _ => Ok(()),
    }
}

fn run_self_update(
    feed: &ReleaseFeed,
    repo: &str,
    version: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let target = update::applier::current_exe_path()?;
    console::info("Fetching release artifact from GitHub ...");

    let request = SelfUpdate {
        repo,
        version,
        dry_run,
    };
    match update::self_update(feed, &target, &request)? {
        UpdateOutcome::DryRun { tag, archive } => {
            console::info(&format!("Downloaded {archive} ({tag})."));
            console::info("Dry-run: would extract and replace current executable");
        }
        UpdateOutcome::Updated { tag, .. } => {
            console::success(&format!(
                "Updated successfully to {tag}. Please re-run the command."
            ));
        }
    }
    Ok(())
}

fn notify_if_outdated(config: &CliConfig, feed: &ReleaseFeed) {
    let max_age = TimeDelta::days(i64::try_from(config.update_check.interval_days).unwrap_or(7));
    let checker = UpdateChecker::new(feed, &config.update_check.state_file, max_age);
    match checker.check_if_needed(env!("CARGO_PKG_VERSION"), &config.releases.cli_repo) {
        Ok(UpdateCheck::Available { latest }) => console::warn(&format!(
            "A new version {latest} of openmower-cli is available. \
             Run 'openmower self-update' to update."
        )),
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "update check failed"),
    }
}
