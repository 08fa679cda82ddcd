//! Provider backends that drive vendor CLIs.
//!
//! Each backend builds an argument vector, runs the vendor binary through a
//! [`CommandRunner`], checks the exit status, and parses the JSON printed on
//! stdout into the shared volume and snapshot model.

use std::ffi::OsString;

use serde::de::DeserializeOwned;

pub mod aws;
pub mod command;
mod error;
pub mod exoscale;

pub use aws::AwsProvider;
pub use command::{CommandOutput, CommandRunner, ProcessCommandRunner};
pub use error::ProviderError;
pub use exoscale::ExoscaleProvider;

/// Thin wrapper pairing a vendor binary with the runner that executes it.
#[derive(Clone, Debug)]
pub struct CliClient<R: CommandRunner> {
    bin: String,
    runner: R,
}

impl<R: CommandRunner> CliClient<R> {
    /// Creates a client that invokes `bin` through `runner`.
    #[must_use]
    pub fn new(bin: impl Into<String>, runner: R) -> Self {
        Self {
            bin: bin.into(),
            runner,
        }
    }

    /// Runs the CLI and fails on a non-zero exit status.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Spawn`] or [`ProviderError::CommandFailure`].
    pub fn run(&self, args: &[OsString], operation: &str) -> Result<CommandOutput, ProviderError> {
        let output = self.runner.run(&self.bin, args)?;
        self.check_output(output, operation)
    }

    /// Runs the CLI and deserialises its stdout.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::run`], plus [`ProviderError::Parse`]
    /// when stdout is not the expected JSON document.
    pub fn run_json<T>(&self, args: &[OsString], resource: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        let output = self.run(args, resource)?;
        serde_json::from_str::<T>(&output.stdout).map_err(|err| ProviderError::Parse {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
    }

    fn check_output(
        &self,
        output: CommandOutput,
        operation: &str,
    ) -> Result<CommandOutput, ProviderError> {
        if output.is_success() {
            return Ok(output);
        }

        Err(ProviderError::CommandFailure {
            program: self.bin.clone(),
            status: output.code,
            status_text: output.status_text(),
            stderr: format!("{operation}: {}", output.stderr.trim()),
        })
    }
}

/// Builds an argument vector from string slices.
pub(crate) fn args<const N: usize>(parts: [&str; N]) -> Vec<OsString> {
    parts.into_iter().map(OsString::from).collect()
}
