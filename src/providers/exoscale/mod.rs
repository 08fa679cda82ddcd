//! Exoscale block storage through the `exo` CLI.
//!
//! Exoscale deletes a volume's snapshots together with the volume, so this
//! provider reports [`SnapshotRetention::CascadesWithVolume`] and the
//! teardown flow refuses to run against it.
//!
//! The `list` views omit labels and creation times, so every listed id is
//! resolved through `show` before label selection.

use std::ffi::OsString;

use super::{CliClient, CommandRunner, ProcessCommandRunner, ProviderError, args};
use crate::backend::{ProviderCapability, SnapshotRetention};
use crate::selector::{Labels, Selector};
use crate::snapshot::{Snapshot, SnapshotRequest, SnapshotState};
use crate::volume::{Volume, VolumeRequest, VolumeState};

mod types;

use types::{ExoListing, ExoSize, ExoSnapshot, ExoVolume};

/// Environment variable carrying the Exoscale API key.
pub const API_KEY_ENV: &str = "EXOSCALE_API_KEY";

/// Environment variable carrying the Exoscale API secret.
pub const API_SECRET_ENV: &str = "EXOSCALE_API_SECRET";

/// Zone-scoped Exoscale block storage provider.
#[derive(Clone, Debug)]
pub struct ExoscaleProvider<R: CommandRunner> {
    cli: CliClient<R>,
    zone: String,
}

impl ExoscaleProvider<ProcessCommandRunner> {
    /// Creates a provider that spawns the real `exo` binary, forwarding the
    /// API credentials when given.
    #[must_use]
    pub fn with_process_runner(
        bin: impl Into<String>,
        zone: impl Into<String>,
        credentials: Option<(String, String)>,
    ) -> Self {
        let runner = match credentials {
            Some((key, secret)) => ProcessCommandRunner::new()
                .with_env(API_KEY_ENV, key)
                .with_env(API_SECRET_ENV, secret),
            None => ProcessCommandRunner::new(),
        };
        Self::new(CliClient::new(bin, runner), zone)
    }
}

impl<R: CommandRunner> ExoscaleProvider<R> {
    /// Creates a provider for `zone`.
    #[must_use]
    pub fn new(cli: CliClient<R>, zone: impl Into<String>) -> Self {
        Self {
            cli,
            zone: zone.into(),
        }
    }

    fn block_storage(&self, command: &[&str]) -> Vec<OsString> {
        let mut argv = args(["--output-format", "json", "compute", "block-storage"]);
        argv.extend(command.iter().map(OsString::from));
        argv.push(OsString::from("--zone"));
        argv.push(OsString::from(&self.zone));
        argv
    }
}

impl<R: CommandRunner> ProviderCapability for ExoscaleProvider<R> {
    type Error = ProviderError;

    fn name(&self) -> &'static str {
        "exoscale"
    }

    fn list_volumes(&self, _selector: &Selector) -> Result<Vec<Volume>, Self::Error> {
        let listed: Vec<ExoListing> = self
            .cli
            .run_json(&self.block_storage(&["list"]), "volumes")?;
        listed
            .iter()
            .map(|entry| self.get_volume(&entry.id))
            .collect()
    }

    fn get_volume(&self, id: &str) -> Result<Volume, Self::Error> {
        let shown: ExoVolume = self
            .cli
            .run_json(&self.block_storage(&["show", id]), "volume")?;
        volume(shown)
    }

    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume, Self::Error> {
        let size = request.size.to_string();
        let mut argv =
            self.block_storage(&["create", request.name.as_str(), "--size", size.as_str()]);
        argv.extend(label_flags(&request.labels));
        if let Some(snapshot_id) = &request.from_snapshot {
            argv.push(OsString::from("--snapshot"));
            argv.push(OsString::from(snapshot_id));
        }
        let created: ExoVolume = self.cli.run_json(&argv, "volume create")?;
        volume(created)
    }

    fn delete_volume(&self, id: &str) -> Result<(), Self::Error> {
        self.cli
            .run(&self.block_storage(&["delete", id, "--force"]), "volume delete")
            .map(drop)
    }

    fn list_snapshots(&self, _selector: &Selector) -> Result<Vec<Snapshot>, Self::Error> {
        let listed: Vec<ExoListing> = self
            .cli
            .run_json(&self.block_storage(&["snapshot", "list"]), "snapshots")?;
        listed
            .iter()
            .map(|entry| self.get_snapshot(&entry.id))
            .collect()
    }

    fn get_snapshot(&self, id: &str) -> Result<Snapshot, Self::Error> {
        let shown: ExoSnapshot = self
            .cli
            .run_json(&self.block_storage(&["snapshot", "show", id]), "snapshot")?;
        snapshot(shown)
    }

    fn create_snapshot(&self, request: &SnapshotRequest) -> Result<Snapshot, Self::Error> {
        let mut argv = self.block_storage(&[
            "snapshot",
            "create",
            request.volume_id.as_str(),
            "--name",
            request.name.as_str(),
        ]);
        argv.extend(label_flags(&request.labels));
        let created: ExoSnapshot = self.cli.run_json(&argv, "snapshot create")?;
        snapshot(created)
    }

    fn snapshot_retention(&self) -> SnapshotRetention {
        SnapshotRetention::CascadesWithVolume
    }
}

fn label_flags(labels: &Labels) -> Vec<OsString> {
    labels
        .iter()
        .flat_map(|(key, value)| {
            [
                OsString::from("--label"),
                OsString::from(format!("{key}={value}")),
            ]
        })
        .collect()
}

fn size_in_gb(size: &ExoSize, resource: &str) -> Result<u64, ProviderError> {
    size.gigabytes().ok_or_else(|| ProviderError::Parse {
        resource: resource.to_owned(),
        message: format!("unrecognised size {size:?}"),
    })
}

fn volume_state(raw: &str) -> VolumeState {
    match raw.to_ascii_lowercase().as_str() {
        "creating" => VolumeState::Creating,
        "available" => VolumeState::Available,
        "attached" => VolumeState::Attached,
        "detached" => VolumeState::Detached,
        "deleting" => VolumeState::Deleting,
        "deleted" => VolumeState::Absent,
        _ => VolumeState::Other(raw.to_owned()),
    }
}

fn snapshot_state(raw: &str) -> SnapshotState {
    match raw.to_ascii_lowercase().as_str() {
        "created" => SnapshotState::Created,
        "error" => SnapshotState::Error,
        _ => SnapshotState::Pending,
    }
}

fn volume(raw: ExoVolume) -> Result<Volume, ProviderError> {
    Ok(Volume {
        size: size_in_gb(&raw.size, "volume")?,
        state: volume_state(&raw.state),
        labels: raw.labels.unwrap_or_default(),
        created_at: raw.created_at,
        id: raw.id,
    })
}

fn snapshot(raw: ExoSnapshot) -> Result<Snapshot, ProviderError> {
    Ok(Snapshot {
        size: size_in_gb(&raw.size, "snapshot")?,
        state: snapshot_state(&raw.state),
        labels: raw.labels.unwrap_or_default(),
        created_at: raw.created_at,
        name: raw.name,
        id: raw.id,
    })
}
