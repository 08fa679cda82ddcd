//! Errors raised by the CLI-backed providers.

use thiserror::Error;

/// Errors returned by [`super::AwsProvider`] and [`super::ExoscaleProvider`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// Raised when the vendor CLI cannot be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that could not be started.
        program: String,
        /// Error reported by the operating system.
        message: String,
    },
    /// Raised when the vendor CLI returns a non-zero exit status.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (`aws` or `exo`).
        program: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command, prefixed with the operation.
        stderr: String,
    },
    /// Raised when JSON output from the CLI cannot be parsed.
    #[error("failed to parse {resource} output: {message}")]
    Parse {
        /// Resource type being parsed (for example `volumes`).
        resource: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a lookup by identifier returns nothing.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource type that was looked up.
        resource: String,
        /// Identifier that matched nothing.
        id: String,
    },
}
