//! Error types for the openmower CLI.

/// Exit code used when a required external tool is missing (shell convention).
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code for bad arguments or missing required environment values.
pub const EXIT_INVALID_INPUT: i32 = 2;

/// Exit code for generic failures (download, extraction, permission, validation).
pub const EXIT_FAILURE: i32 = 1;

/// Top-level error type for every CLI operation.
#[derive(Debug, thiserror::Error)]
pub enum MowerError {
    /// A required external program could not be found.
    #[error("{program}: command not found")]
    ToolNotFound {
        /// Program that was looked up.
        program: String,
    },

    /// An external program ran and exited unsuccessfully.
    #[error("{program} exited with code {code}")]
    CommandFailed {
        /// Program that was run.
        program: String,
        /// Exit code forwarded as our own.
        code: i32,
    },

    /// Bad argument or missing required environment value.
    #[error("{0}")]
    InvalidInput(String),

    /// Configuration could not be assembled.
    #[error("config error: {0}")]
    Config(String),

    /// Release feed or download failure.
    #[error("{0}")]
    Network(String),

    /// No release asset matched the selection rule.
    #[error("{0}")]
    AssetNotFound(String),

    /// Archive could not be read or extracted.
    #[error("archive error: {0}")]
    Archive(String),

    /// A successful download did not contain the expected file.
    #[error("{0}")]
    ContentMismatch(String),

    /// The running executable is not something we are willing to replace.
    #[error("{0}")]
    Precondition(String),

    /// Permission denied while replacing the executable.
    #[error("permission denied: {0}")]
    Permission(String),

    /// GPIO power sequencing failed.
    #[error("gpio error: {0}")]
    Gpio(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MowerError {
    /// Process exit status this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolNotFound { .. } => EXIT_NOT_FOUND,
            Self::CommandFailed { code, .. } => *code,
            Self::InvalidInput(_) | Self::Config(_) => EXIT_INVALID_INPUT,
            Self::Network(_)
            | Self::AssetNotFound(_)
            | Self::Archive(_)
            | Self::ContentMismatch(_)
            | Self::Precondition(_)
            | Self::Permission(_)
            | Self::Gpio(_)
            | Self::Io(_) => EXIT_FAILURE,
        }
    }

    /// Whether the error message was already shown to the operator by the
    /// child process itself (a failing tool prints its own diagnostics).
    pub fn is_child_exit(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MowerError>;
