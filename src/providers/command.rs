//! Process execution seam used by the CLI-backed providers.

use std::ffi::OsString;
use std::fmt;
use std::process::Command;

use super::ProviderError;

/// Captured output from a vendor CLI invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Returns the exit status as text, `unknown` when the process was
    /// terminated without one.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProviderError>;
}

/// Real command runner that shells out to the host operating system.
///
/// Extra environment variables are added on top of the inherited
/// environment. Their values never appear in `Debug` output.
#[derive(Clone, Default)]
pub struct ProcessCommandRunner {
    env: Vec<(String, String)>,
}

impl ProcessCommandRunner {
    /// Creates a runner that passes the parent environment through as is.
    #[must_use]
    pub const fn new() -> Self {
        Self { env: Vec::new() }
    }

    /// Adds an environment variable to every spawned process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Debug for ProcessCommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessCommandRunner")
            .field(
                "env",
                &self.env.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProviderError> {
        let output = Command::new(program)
            .args(args)
            .envs(self.env.iter().map(|(key, value)| (key, value)))
            .output()
            .map_err(|err| ProviderError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProviderError> {
        (**self).run(program, args)
    }
}
