//! Binary entry point for the stowage CLI.

use std::env;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use stowage::{
    ArtifactError, ArtifactStore, ArtifactWriter, AwsProvider, ConfigError, ConfigOverrides,
    ExoscaleProvider, LifecycleError, ProviderCapability, ProviderError, ProviderKind,
    SnapshotOrchestrator, StowageConfig, TeardownOrchestrator, VolumeProvisioner, VolumeRecord,
};

mod cli;

use cli::{Cli, ProvisionCommand, TargetArgs};

const LOG_ENV: &str = "STOWAGE_LOG";
const LOG_FORMAT_ENV: &str = "STOWAGE_LOG_FORMAT";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError<ProviderError>),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("failed to write result to stdout: {0}")]
    Output(#[source] io::Error),
}

/// Flow selected on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    Provision,
    Snapshot,
    Teardown,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_writer(io::stderr))
            .try_init()
            .ok();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let (flow, overrides) = match cli {
        Cli::Provision(ProvisionCommand { target, size }) => {
            (Flow::Provision, overrides(target, size))
        }
        Cli::Snapshot(target) => (Flow::Snapshot, overrides(target, None)),
        Cli::Teardown(target) => (Flow::Teardown, overrides(target, None)),
    };
    let config = StowageConfig::load_without_cli_args()?.with_overrides(overrides);
    config.validate()?;
    let store = ArtifactStore::new(config.output_dir());
    execute(flow, &config, &store, io::stdout())
}

fn overrides(target: TargetArgs, size: Option<u64>) -> ConfigOverrides {
    ConfigOverrides {
        provider: target.provider,
        volume_name: target.name,
        volume_size: size,
    }
}

fn execute(
    flow: Flow,
    config: &StowageConfig,
    writer: &impl ArtifactWriter,
    out: impl Write,
) -> Result<(), CliError> {
    let kind = config.provider_kind()?;
    let zone = config.zone(kind);
    match kind {
        ProviderKind::Aws => {
            let availability_zone = config.availability_zone(&zone);
            let provider = AwsProvider::with_process_runner(
                config.aws_bin.as_str(),
                zone,
                availability_zone.as_str(),
            );
            run_flow(flow, config, &provider, availability_zone, writer, out)
        }
        ProviderKind::Exoscale => {
            let provider = ExoscaleProvider::with_process_runner(
                config.exo_bin.as_str(),
                zone.as_str(),
                config.exoscale_credentials(),
            );
            run_flow(flow, config, &provider, zone, writer, out)
        }
    }
}

/// Runs one flow, writing the artifact and the stdout result line only after
/// the whole flow succeeded.
fn run_flow<P>(
    flow: Flow,
    config: &StowageConfig,
    provider: P,
    zone: String,
    writer: &impl ArtifactWriter,
    mut out: impl Write,
) -> Result<(), CliError>
where
    P: ProviderCapability<Error = ProviderError>,
{
    let name = config.volume_name()?;
    let selector = config.selector()?;
    let poller = config.poller();
    let provider_name = provider.name();
    info!(provider = provider_name, %selector, ?flow, "starting");

    let line = match flow {
        Flow::Provision => {
            let size = config.volume_size()?;
            let provisioned =
                VolumeProvisioner::new(provider, poller, zone).provision(name, &selector, size)?;
            let record = VolumeRecord {
                volume_id: provisioned.volume.id,
                zone: provisioned.zone,
            };
            let path = writer.write_volume_record(provider_name, name, &record)?;
            info!(%path, "volume record written");
            record.volume_id
        }
        Flow::Snapshot => {
            let ids = SnapshotOrchestrator::new(provider, poller).snapshot(name, &selector)?;
            write_ids(writer, &ids)?
        }
        Flow::Teardown => {
            let ids = TeardownOrchestrator::new(provider, poller).teardown(name, &selector)?;
            write_ids(writer, &ids)?
        }
    };

    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(CliError::Output)
}

fn write_ids(writer: &impl ArtifactWriter, ids: &[String]) -> Result<String, ArtifactError> {
    let path = writer.write_snapshot_ids(ids)?;
    info!(%path, count = ids.len(), "snapshot ids written");
    Ok(ids.join(","))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
