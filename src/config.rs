//! Configuration loading via `ortho-config`.
//!
//! Values merge defaults, `stowage.toml` discovered on disk, and `STOWAGE_*`
//! environment variables. Subcommand flags are applied on top through
//! [`ConfigOverrides`]. Everything is validated before a provider is built.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::backend::ProviderKind;
use crate::converge::Poller;
use crate::selector::Selector;

const CONFIG_FILE_NAME: &str = "stowage.toml";

/// Settings for every stowage flow.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "STOWAGE",
    discovery(
        app_name = "stowage",
        env_var = "STOWAGE_CONFIG_PATH",
        config_file_name = "stowage.toml",
        dotfile_name = ".stowage.toml",
        project_file_name = "stowage.toml"
    )
)]
pub struct StowageConfig {
    /// Provider backend: `aws` or `exoscale`.
    #[ortho_config(default = "exoscale".to_owned())]
    pub provider: String,
    /// Logical volume name. Becomes the `{name: <volume_name>}` selector.
    pub volume_name: Option<String>,
    /// Volume size in GB. Required for provisioning only.
    pub volume_size: Option<u64>,
    /// Exoscale zone or AWS region. Defaults per provider.
    pub zone: Option<String>,
    /// AWS availability zone for new volumes. Defaults to `<region>a`.
    pub availability_zone: Option<String>,
    /// Deadline for each convergence wait, in seconds.
    #[ortho_config(default = 300)]
    pub wait_timeout_secs: u64,
    /// Pause between two convergence checks, in seconds.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Directory receiving the output artifacts.
    #[ortho_config(default = ".".to_owned())]
    pub output_dir: String,
    /// Path to the `aws` executable.
    #[ortho_config(default = "aws".to_owned())]
    pub aws_bin: String,
    /// Path to the `exo` executable.
    #[ortho_config(default = "exo".to_owned())]
    pub exo_bin: String,
    /// Exoscale API key forwarded to `exo`.
    pub exoscale_api_key: Option<String>,
    /// Exoscale API secret forwarded to `exo`.
    pub exoscale_api_secret: Option<String>,
}

/// Values supplied on the command line that take precedence over files and
/// environment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    /// Provider override.
    pub provider: Option<String>,
    /// Volume name override.
    pub volume_name: Option<String>,
    /// Volume size override.
    pub volume_size: Option<u64>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to {CONFIG_FILE_NAME}",
            self.description, self.env_var, self.toml_key
        ))
    }

    fn invalid(&self, detail: &str) -> ConfigError {
        ConfigError::InvalidValue(format!(
            "{} {detail}: check {} or {} in {CONFIG_FILE_NAME}",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const PROVIDER: FieldMetadata = FieldMetadata::new("provider", "STOWAGE_PROVIDER", "provider");
const VOLUME_NAME: FieldMetadata =
    FieldMetadata::new("volume name", "STOWAGE_VOLUME_NAME", "volume_name");
const VOLUME_SIZE: FieldMetadata =
    FieldMetadata::new("volume size", "STOWAGE_VOLUME_SIZE", "volume_size");
const WAIT_TIMEOUT: FieldMetadata = FieldMetadata::new(
    "wait timeout",
    "STOWAGE_WAIT_TIMEOUT_SECS",
    "wait_timeout_secs",
);
const POLL_INTERVAL: FieldMetadata = FieldMetadata::new(
    "poll interval",
    "STOWAGE_POLL_INTERVAL_SECS",
    "poll_interval_secs",
);

impl StowageConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("stowage")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if overrides.volume_name.is_some() {
            self.volume_name = overrides.volume_name;
        }
        if overrides.volume_size.is_some() {
            self.volume_size = overrides.volume_size;
        }
        self
    }

    /// Checks the settings shared by every flow.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the volume name is blank and
    /// [`ConfigError::InvalidValue`] for an unknown provider or a zero
    /// timeout or interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider_kind()?;
        self.volume_name()?;
        if self.wait_timeout_secs == 0 {
            return Err(WAIT_TIMEOUT.invalid("must be greater than zero"));
        }
        if self.poll_interval_secs == 0 {
            return Err(POLL_INTERVAL.invalid("must be greater than zero"));
        }
        Ok(())
    }

    /// Returns the configured provider backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for names other than `aws` and
    /// `exoscale`.
    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        ProviderKind::parse(&self.provider).ok_or_else(|| {
            PROVIDER.invalid(&format!(
                "'{}' is not supported (expected aws or exoscale)",
                self.provider.trim()
            ))
        })
    }

    /// Returns the trimmed volume name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when unset or blank.
    pub fn volume_name(&self) -> Result<&str, ConfigError> {
        self.volume_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| VOLUME_NAME.missing())
    }

    /// Returns the requested volume size in GB.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when unset and
    /// [`ConfigError::InvalidValue`] when zero.
    pub fn volume_size(&self) -> Result<u64, ConfigError> {
        match self.volume_size {
            None => Err(VOLUME_SIZE.missing()),
            Some(0) => Err(VOLUME_SIZE.invalid("must be greater than zero")),
            Some(size) => Ok(size),
        }
    }

    /// Returns the `{name: <volume_name>}` selector.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the volume name is blank.
    pub fn selector(&self) -> Result<Selector, ConfigError> {
        self.volume_name().map(Selector::for_name)
    }

    /// Returns the configured zone (region), or the provider default.
    #[must_use]
    pub fn zone(&self, kind: ProviderKind) -> String {
        self.zone
            .as_deref()
            .map(str::trim)
            .filter(|zone| !zone.is_empty())
            .map_or_else(|| kind.default_zone().to_owned(), str::to_owned)
    }

    /// Returns the AWS availability zone for new volumes.
    #[must_use]
    pub fn availability_zone(&self, region: &str) -> String {
        self.availability_zone
            .as_deref()
            .map(str::trim)
            .filter(|zone| !zone.is_empty())
            .map_or_else(|| format!("{region}a"), str::to_owned)
    }

    /// Returns the poller built from the timeout and interval settings.
    #[must_use]
    pub const fn poller(&self) -> Poller {
        Poller::new(
            Duration::from_secs(self.wait_timeout_secs),
            Duration::from_secs(self.poll_interval_secs),
        )
    }

    /// Returns the artifact directory.
    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.output_dir)
    }

    /// Returns the Exoscale key and secret when both are set.
    #[must_use]
    pub fn exoscale_credentials(&self) -> Option<(String, String)> {
        self.exoscale_api_key
            .clone()
            .zip(self.exoscale_api_secret.clone())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is present but unusable.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
