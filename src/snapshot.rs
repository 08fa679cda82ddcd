//! Block storage snapshots as observed through a provider.

use std::fmt;

use crate::selector::{Labelled, Labels};

/// Normalised lifecycle state of a snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SnapshotState {
    /// Capture is still in progress.
    Pending,
    /// The snapshot is complete and usable for restores.
    Created,
    /// The provider failed to capture the snapshot. Terminal.
    Error,
}

impl SnapshotState {
    /// States from which no further automatic transition is expected.
    pub const TERMINAL: [Self; 2] = [Self::Created, Self::Error];

    /// Returns `true` for `created` and `error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Created | Self::Error)
    }
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Created => f.write_str("created"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A snapshot as reported by a provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    /// Provider issued identifier.
    pub id: String,
    /// Human-friendly name, when the provider keeps one.
    pub name: Option<String>,
    /// Labels (tags) attached to the snapshot.
    pub labels: Labels,
    /// Normalised lifecycle state.
    pub state: SnapshotState,
    /// Size of the source volume at capture time, in GB.
    pub size: u64,
    /// Provider issued creation timestamp (RFC 3339).
    pub created_at: String,
}

impl Labelled for Snapshot {
    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }
}

/// Parameters required to snapshot a volume.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotRequest {
    /// Volume to capture.
    pub volume_id: String,
    /// Snapshot name.
    pub name: String,
    /// Labels applied to the snapshot.
    pub labels: Labels,
}

impl SnapshotRequest {
    /// Builds the request for `volume_id`, deriving the name from the volume
    /// name and the first eight characters of the volume identifier.
    #[must_use]
    pub fn for_volume(volume_name: &str, volume_id: &str, labels: Labels) -> Self {
        let short_id = volume_id.chars().take(8).collect::<String>();
        Self {
            volume_id: volume_id.to_owned(),
            name: format!("{volume_name}-snapshot-{short_id}"),
            labels,
        }
    }
}
