//! Command-line interface definitions for the `stowage` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser};

/// Top-level CLI for the `stowage` binary.
#[derive(Debug, Parser)]
#[command(
    name = "stowage",
    version,
    about = "Provision, snapshot, and tear down labelled block storage volumes",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Reuse, restore, or create the named volume.
    #[command(
        name = "provision",
        about = "Reuse, restore from the latest snapshot, or create the named volume"
    )]
    Provision(ProvisionCommand),
    /// Snapshot every volume carrying the name label.
    #[command(name = "snapshot", about = "Snapshot every volume carrying the name label")]
    Snapshot(TargetArgs),
    /// Snapshot, then delete, every volume carrying the name label.
    #[command(
        name = "teardown",
        about = "Snapshot, then delete, every volume carrying the name label"
    )]
    Teardown(TargetArgs),
}

/// Provider and volume selection shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct TargetArgs {
    /// Provider backend (aws or exoscale). Overrides `STOWAGE_PROVIDER`.
    #[arg(long, value_name = "PROVIDER")]
    pub(crate) provider: Option<String>,
    /// Volume name used as the `name` label. Overrides `STOWAGE_VOLUME_NAME`.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: Option<String>,
}

/// Arguments for the `stowage provision` subcommand.
#[derive(Debug, Args)]
pub(crate) struct ProvisionCommand {
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Size in GB for new or restored volumes. Overrides `STOWAGE_VOLUME_SIZE`.
    #[arg(long, value_name = "GB")]
    pub(crate) size: Option<u64>,
}
