//! Amazon EBS volumes and snapshots through the `aws ec2` CLI.

use std::ffi::OsString;

use serde::Serialize;

use super::{CliClient, CommandRunner, ProcessCommandRunner, ProviderError, args};
use crate::backend::ProviderCapability;
use crate::selector::{Labels, Selector};
use crate::snapshot::{Snapshot, SnapshotRequest, SnapshotState};
use crate::volume::{Volume, VolumeRequest, VolumeState};

mod types;

use types::{AwsSnapshot, AwsTag, AwsVolume, DescribeSnapshots, DescribeVolumes};

/// Region-scoped EBS provider.
#[derive(Clone, Debug)]
pub struct AwsProvider<R: CommandRunner> {
    cli: CliClient<R>,
    region: String,
    availability_zone: String,
}

impl AwsProvider<ProcessCommandRunner> {
    /// Creates a provider that spawns the real `aws` binary.
    #[must_use]
    pub fn with_process_runner(
        bin: impl Into<String>,
        region: impl Into<String>,
        availability_zone: impl Into<String>,
    ) -> Self {
        Self::new(
            CliClient::new(bin, ProcessCommandRunner::new()),
            region,
            availability_zone,
        )
    }
}

impl<R: CommandRunner> AwsProvider<R> {
    /// Creates a provider for `region`; new volumes land in
    /// `availability_zone`.
    #[must_use]
    pub fn new(
        cli: CliClient<R>,
        region: impl Into<String>,
        availability_zone: impl Into<String>,
    ) -> Self {
        Self {
            cli,
            region: region.into(),
            availability_zone: availability_zone.into(),
        }
    }

    fn ec2(&self, command: &str) -> Vec<OsString> {
        let mut argv = args(["ec2", command, "--region"]);
        argv.push(OsString::from(&self.region));
        argv.extend(args(["--output", "json"]));
        argv
    }

    fn describe_volumes(&self, extra: Vec<OsString>) -> Result<Vec<Volume>, ProviderError> {
        let mut argv = self.ec2("describe-volumes");
        argv.extend(extra);
        let response: DescribeVolumes = self.cli.run_json(&argv, "volumes")?;
        Ok(response.volumes.into_iter().map(Volume::from).collect())
    }

    fn describe_snapshots(&self, extra: Vec<OsString>) -> Result<Vec<Snapshot>, ProviderError> {
        let mut argv = self.ec2("describe-snapshots");
        argv.extend(args(["--owner-ids", "self"]));
        argv.extend(extra);
        let response: DescribeSnapshots = self.cli.run_json(&argv, "snapshots")?;
        Ok(response.snapshots.into_iter().map(Snapshot::from).collect())
    }
}

impl<R: CommandRunner> ProviderCapability for AwsProvider<R> {
    type Error = ProviderError;

    fn name(&self) -> &'static str {
        "aws"
    }

    fn list_volumes(&self, selector: &Selector) -> Result<Vec<Volume>, Self::Error> {
        self.describe_volumes(tag_filters(selector.labels())?)
    }

    fn get_volume(&self, id: &str) -> Result<Volume, Self::Error> {
        self.describe_volumes(args(["--volume-ids", id]))?
            .into_iter()
            .next()
            .ok_or_else(|| not_found("volume", id))
    }

    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume, Self::Error> {
        let mut argv = self.ec2("create-volume");
        argv.push(OsString::from("--availability-zone"));
        argv.push(OsString::from(&self.availability_zone));
        argv.push(OsString::from("--size"));
        argv.push(OsString::from(request.size.to_string()));
        if let Some(snapshot_id) = &request.from_snapshot {
            argv.push(OsString::from("--snapshot-id"));
            argv.push(OsString::from(snapshot_id));
        }
        argv.push(OsString::from("--tag-specifications"));
        argv.push(tag_specifications("volume", &request.labels)?);
        let created: AwsVolume = self.cli.run_json(&argv, "volume create")?;
        Ok(Volume::from(created))
    }

    fn delete_volume(&self, id: &str) -> Result<(), Self::Error> {
        let mut argv = self.ec2("delete-volume");
        argv.extend(args(["--volume-id", id]));
        self.cli.run(&argv, "volume delete").map(drop)
    }

    fn list_snapshots(&self, selector: &Selector) -> Result<Vec<Snapshot>, Self::Error> {
        self.describe_snapshots(tag_filters(selector.labels())?)
    }

    fn get_snapshot(&self, id: &str) -> Result<Snapshot, Self::Error> {
        self.describe_snapshots(args(["--snapshot-ids", id]))?
            .into_iter()
            .next()
            .ok_or_else(|| not_found("snapshot", id))
    }

    fn create_snapshot(&self, request: &SnapshotRequest) -> Result<Snapshot, Self::Error> {
        let mut argv = self.ec2("create-snapshot");
        argv.extend(args(["--volume-id", request.volume_id.as_str(), "--description"]));
        argv.push(OsString::from(format!(
            "Snapshot For: {}. Tags: {}",
            request.volume_id,
            Selector::new(request.labels.clone())
        )));
        argv.push(OsString::from("--tag-specifications"));
        argv.push(tag_specifications("snapshot", &request.labels)?);
        let created: AwsSnapshot = self.cli.run_json(&argv, "snapshot create")?;
        Ok(Snapshot::from(created))
    }
}

#[derive(Serialize)]
struct Filter<'a> {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Values")]
    values: [&'a str; 1],
}

#[derive(Serialize)]
struct TagSpecification<'a> {
    #[serde(rename = "ResourceType")]
    resource_type: &'a str,
    #[serde(rename = "Tags")]
    tags: Vec<AwsTag>,
}

/// Renders `--filters` matching every label as a tag. Empty label sets list
/// everything.
fn tag_filters(labels: &Labels) -> Result<Vec<OsString>, ProviderError> {
    if labels.is_empty() {
        return Ok(Vec::new());
    }
    let filters = labels
        .iter()
        .map(|(key, value)| Filter {
            name: format!("tag:{key}"),
            values: [value.as_str()],
        })
        .collect::<Vec<_>>();
    Ok(vec![OsString::from("--filters"), to_json(&filters)?])
}

fn tag_specifications(resource_type: &str, labels: &Labels) -> Result<OsString, ProviderError> {
    to_json(&[TagSpecification {
        resource_type,
        tags: labels
            .iter()
            .map(|(key, value)| AwsTag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect(),
    }])
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<OsString, ProviderError> {
    serde_json::to_string(value)
        .map(OsString::from)
        .map_err(|err| ProviderError::Parse {
            resource: String::from("request"),
            message: err.to_string(),
        })
}

fn not_found(resource: &str, id: &str) -> ProviderError {
    ProviderError::NotFound {
        resource: resource.to_owned(),
        id: id.to_owned(),
    }
}

fn volume_state(raw: &str) -> VolumeState {
    match raw {
        "creating" => VolumeState::Creating,
        "available" => VolumeState::Detached,
        "in-use" => VolumeState::Attached,
        "deleting" => VolumeState::Deleting,
        "deleted" => VolumeState::Absent,
        other => VolumeState::Other(other.to_owned()),
    }
}

fn snapshot_state(raw: &str) -> SnapshotState {
    match raw {
        "completed" => SnapshotState::Created,
        "error" => SnapshotState::Error,
        _ => SnapshotState::Pending,
    }
}

impl From<AwsVolume> for Volume {
    fn from(raw: AwsVolume) -> Self {
        Self {
            id: raw.volume_id,
            labels: types::labels(raw.tags),
            state: volume_state(&raw.state),
            size: raw.size,
            created_at: raw.create_time,
        }
    }
}

impl From<AwsSnapshot> for Snapshot {
    fn from(raw: AwsSnapshot) -> Self {
        Self {
            id: raw.snapshot_id,
            name: None,
            labels: types::labels(raw.tags),
            state: snapshot_state(&raw.state),
            size: raw.volume_size,
            created_at: raw.start_time,
        }
    }
}
