//! Container stack commands.
//!
//! All stack operations are `docker compose -f <compose-file> <subcommand>`
//! invocations. [`ComposeStack`] derives every argument vector from one
//! [`StackConfig`] so the binary path, compose file and service names live in
//! a single place.

use crate::config::StackConfig;
use crate::process::ToolCommand;

/// Number of log lines shown when following all services.
const DEFAULT_LOG_TAIL: &str = "100";

/// Builds `docker compose` invocations for the OpenMower stack.
#[derive(Debug, Clone, Copy)]
pub struct ComposeStack<'a> {
    config: &'a StackConfig,
}

impl<'a> ComposeStack<'a> {
    /// Wrap a stack configuration.
    pub fn new(config: &'a StackConfig) -> Self {
        Self { config }
    }

    /// The compose file this stack is driven from.
    pub fn compose_file(&self) -> &std::path::Path {
        &self.config.compose_file
    }

    /// A bare `docker` invocation (no compose).
    pub fn docker(&self) -> ToolCommand {
        ToolCommand::new(&self.config.docker_bin)
    }

    fn compose(&self) -> ToolCommand {
        self.docker()
            .arg("compose")
            .arg("-f")
            .arg(&self.config.compose_file)
    }

    /// `pull`: fetch images for every service.
    pub fn pull(&self) -> ToolCommand {
        self.compose().arg("pull")
    }

    /// `up -d`: start the stack detached.
    pub fn start(&self) -> ToolCommand {
        self.compose().args(["up", "-d"])
    }

    /// `stop`: stop all services.
    pub fn stop(&self) -> ToolCommand {
        self.compose().arg("stop")
    }

    /// `restart`: restart all services.
    pub fn restart(&self) -> ToolCommand {
        self.compose().arg("restart")
    }

    /// `ps`: show service status.
    pub fn status(&self) -> ToolCommand {
        self.compose().arg("ps")
    }

    /// `logs`: follow the last lines of every service, or show the given ones.
    pub fn logs(&self, services: &[String]) -> ToolCommand {
        let cmd = self.compose().arg("logs");
        if services.is_empty() {
            cmd.args(["-f", "--tail", DEFAULT_LOG_TAIL])
        } else {
            cmd.args(services)
        }
    }

    /// Service a shell should attach to.
    pub fn shell_service<'s>(&'s self, service: Option<&'s str>) -> &'s str {
        service.unwrap_or(&self.config.default_service)
    }

    /// `exec`: run `command` inside `service`, or open an interactive login
    /// shell when `command` is empty.
    pub fn shell(&self, service: Option<&str>, command: &[String]) -> ToolCommand {
        let service = self.shell_service(service);
        if !command.is_empty() {
            return self.compose().arg("exec").arg(service).args(command);
        }

        self.compose()
            .args(["exec", "-it", "-e", "STACK_SHELL=1", "-e"])
            .arg(format!("STACK_NAME={}", self.config.stack_name))
            .args([service, "bash", "-l"])
    }
}
