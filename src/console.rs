//! Operator-facing console messages.
//!
//! These are the lines a person at the mower's terminal reads. Diagnostics
//! for developers go through `tracing` instead and stay hidden unless
//! `RUST_LOG` asks for them.

use owo_colors::OwoColorize;

/// Progress or informational line.
pub fn info(message: &str) {
    println!("{} {message}", "[INFO]".cyan().bold());
}

/// Recoverable problem the operator should know about.
pub fn warn(message: &str) {
    eprintln!("{} {message}", "[WARN]".yellow().bold());
}

/// Failure that ends the current command.
pub fn error(message: &str) {
    eprintln!("{} {message}", "[ERROR]".bright_red().bold());
}

/// Successful completion.
pub fn success(message: &str) {
    println!("{} {message}", "[OK]".bright_green().bold());
}
