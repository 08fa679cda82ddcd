//! JSON shapes printed by `aws ec2 --output json`.

use serde::{Deserialize, Serialize};

use crate::selector::Labels;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(super) struct AwsTag {
    #[serde(rename = "Key")]
    pub(super) key: String,
    #[serde(rename = "Value")]
    pub(super) value: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AwsVolume {
    pub(super) volume_id: String,
    pub(super) size: u64,
    pub(super) state: String,
    #[serde(default)]
    pub(super) create_time: String,
    #[serde(default)]
    pub(super) tags: Vec<AwsTag>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AwsSnapshot {
    pub(super) snapshot_id: String,
    pub(super) state: String,
    #[serde(default)]
    pub(super) volume_size: u64,
    #[serde(default)]
    pub(super) start_time: String,
    #[serde(default)]
    pub(super) tags: Vec<AwsTag>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct DescribeVolumes {
    #[serde(rename = "Volumes", default)]
    pub(super) volumes: Vec<AwsVolume>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct DescribeSnapshots {
    #[serde(rename = "Snapshots", default)]
    pub(super) snapshots: Vec<AwsSnapshot>,
}

/// Converts the EC2 tag list into a label map. A repeated key keeps its last
/// value.
pub(super) fn labels(tags: Vec<AwsTag>) -> Labels {
    tags.into_iter().map(|tag| (tag.key, tag.value)).collect()
}
