//! Block storage volumes as observed through a provider.

use std::fmt;

use crate::selector::{Labelled, Labels};

/// Normalised lifecycle state of a block storage volume.
///
/// Providers map their own vocabulary onto these variants; anything that
/// does not fit is carried verbatim in [`VolumeState::Other`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VolumeState {
    /// The provider is still allocating the volume.
    Creating,
    /// The volume exists but the provider does not report an attachment.
    Available,
    /// The volume is attached to an instance.
    Attached,
    /// The volume is ready and not attached to any instance.
    Detached,
    /// Deletion has been requested and is in progress.
    Deleting,
    /// The provider reports the volume as gone.
    Absent,
    /// Provider specific state outside the normalised set.
    Other(String),
}

impl VolumeState {
    /// Returns `true` when the volume can be handed to a consumer.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Attached | Self::Detached)
    }

    /// Returns `true` when the volume is going away and must not be reused
    /// or snapshotted.
    #[must_use]
    pub const fn is_departing(&self) -> bool {
        matches!(self, Self::Deleting | Self::Absent)
    }
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => f.write_str("creating"),
            Self::Available => f.write_str("available"),
            Self::Attached => f.write_str("attached"),
            Self::Detached => f.write_str("detached"),
            Self::Deleting => f.write_str("deleting"),
            Self::Absent => f.write_str("absent"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// A block storage volume as reported by a provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Volume {
    /// Provider issued identifier. Not assumed stable across invocations.
    pub id: String,
    /// Labels (tags) attached to the volume.
    pub labels: Labels,
    /// Normalised lifecycle state.
    pub state: VolumeState,
    /// Capacity in GB.
    pub size: u64,
    /// Provider issued creation timestamp (RFC 3339).
    pub created_at: String,
}

impl Labelled for Volume {
    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }
}

/// Parameters required to create a volume.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeRequest {
    /// Human-friendly volume name.
    pub name: String,
    /// Requested capacity in GB.
    pub size: u64,
    /// Labels applied to the new volume.
    pub labels: Labels,
    /// Snapshot to restore from; `None` creates an empty volume.
    pub from_snapshot: Option<String>,
}

impl VolumeRequest {
    /// Creates a request for an empty volume, trimming the name.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64, labels: Labels) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            size,
            labels,
            from_snapshot: None,
        }
    }

    /// Restores the volume from the given snapshot.
    #[must_use]
    pub fn from_snapshot(mut self, snapshot_id: impl Into<String>) -> Self {
        self.from_snapshot = Some(snapshot_id.into());
        self
    }
}
