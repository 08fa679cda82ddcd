//! Core library for stowage, a label-addressed block volume lifecycle tool.
//!
//! Volumes and snapshots are found by exact label match rather than by
//! identifier. On top of that lookup the crate offers three flows written
//! against the [`ProviderCapability`] trait: provisioning (reuse, restore
//! from the newest snapshot, or create), snapshotting, and snapshot-guarded
//! teardown. AWS and Exoscale backends drive the vendor CLIs.

pub mod backend;
pub mod backup;
pub mod config;
pub mod converge;
pub mod error;
pub mod output;
pub mod providers;
pub mod provision;
pub mod selector;
pub mod snapshot;
pub mod teardown;
pub mod test_support;
pub mod volume;

pub use backend::{ProviderCapability, ProviderKind, SnapshotRetention};
pub use backup::{SnapshotBatch, SnapshotOrchestrator};
pub use config::{ConfigError, ConfigOverrides, StowageConfig};
pub use converge::{AllTerminal, ConvergenceTimeout, Poller};
pub use error::{LifecycleError, ResourceKind};
pub use output::{ArtifactError, ArtifactStore, ArtifactWriter, VolumeRecord};
pub use providers::{AwsProvider, ExoscaleProvider, ProviderError};
pub use provision::{ProvisionOutcome, ProvisionedVolume, VolumeProvisioner};
pub use selector::{Labelled, Labels, Selector};
pub use snapshot::{Snapshot, SnapshotRequest, SnapshotState};
pub use teardown::TeardownOrchestrator;
pub use volume::{Volume, VolumeRequest, VolumeState};
