//! Provider abstraction over block storage volumes and snapshots.

use std::fmt;

use crate::selector::Selector;
use crate::snapshot::{Snapshot, SnapshotRequest};
use crate::volume::{Volume, VolumeRequest};

/// How a provider's snapshots relate to their source volume.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SnapshotRetention {
    /// Snapshots outlive the volume they were taken from.
    #[default]
    Independent,
    /// Deleting a volume also deletes its snapshots, so a snapshot is no
    /// backup against volume deletion.
    CascadesWithVolume,
}

/// Operations a cloud provider exposes for block storage.
///
/// Mutating calls return as soon as the provider has accepted the request;
/// completion is observed by polling [`ProviderCapability::get_volume`],
/// [`ProviderCapability::get_snapshot`], or the list calls.
///
/// `list_*` implementations may pre-filter by the selector but are allowed to
/// return a superset. Callers apply [`Selector::select`] for exact matching.
pub trait ProviderCapability {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short provider name used in logs, messages, and artifact names.
    fn name(&self) -> &'static str;

    /// Lists volumes, optionally pre-filtered by `selector`.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the listing fails.
    fn list_volumes(&self, selector: &Selector) -> Result<Vec<Volume>, Self::Error>;

    /// Fetches a single volume.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the volume cannot be fetched.
    fn get_volume(&self, id: &str) -> Result<Volume, Self::Error>;

    /// Requests creation of a volume, optionally restored from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the request is rejected.
    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume, Self::Error>;

    /// Requests deletion of a volume.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the request is rejected.
    fn delete_volume(&self, id: &str) -> Result<(), Self::Error>;

    /// Lists snapshots, optionally pre-filtered by `selector`.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the listing fails.
    fn list_snapshots(&self, selector: &Selector) -> Result<Vec<Snapshot>, Self::Error>;

    /// Fetches a single snapshot.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the snapshot cannot be fetched.
    fn get_snapshot(&self, id: &str) -> Result<Snapshot, Self::Error>;

    /// Requests a snapshot of a volume.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the request is rejected.
    fn create_snapshot(&self, request: &SnapshotRequest) -> Result<Snapshot, Self::Error>;

    /// Describes whether snapshots survive deletion of their source volume.
    fn snapshot_retention(&self) -> SnapshotRetention {
        SnapshotRetention::Independent
    }
}

impl<P: ProviderCapability + ?Sized> ProviderCapability for &P {
    type Error = P::Error;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list_volumes(&self, selector: &Selector) -> Result<Vec<Volume>, Self::Error> {
        (**self).list_volumes(selector)
    }

    fn get_volume(&self, id: &str) -> Result<Volume, Self::Error> {
        (**self).get_volume(id)
    }

    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume, Self::Error> {
        (**self).create_volume(request)
    }

    fn delete_volume(&self, id: &str) -> Result<(), Self::Error> {
        (**self).delete_volume(id)
    }

    fn list_snapshots(&self, selector: &Selector) -> Result<Vec<Snapshot>, Self::Error> {
        (**self).list_snapshots(selector)
    }

    fn get_snapshot(&self, id: &str) -> Result<Snapshot, Self::Error> {
        (**self).get_snapshot(id)
    }

    fn create_snapshot(&self, request: &SnapshotRequest) -> Result<Snapshot, Self::Error> {
        (**self).create_snapshot(request)
    }

    fn snapshot_retention(&self) -> SnapshotRetention {
        (**self).snapshot_retention()
    }
}

/// Supported provider backends.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderKind {
    /// Amazon EC2 / EBS through the `aws` CLI.
    Aws,
    /// Exoscale block storage through the `exo` CLI.
    Exoscale,
}

impl ProviderKind {
    /// Zone (Exoscale) or region (AWS) used when none is configured.
    #[must_use]
    pub const fn default_zone(self) -> &'static str {
        match self {
            Self::Aws => "ca-central-1",
            Self::Exoscale => "ch-gva-2",
        }
    }

    /// Lowercase identifier used in configuration and artifact names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Exoscale => "exoscale",
        }
    }

    /// Parses a configured provider name, ignoring case and surrounding
    /// whitespace.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "aws" => Some(Self::Aws),
            "exoscale" => Some(Self::Exoscale),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
