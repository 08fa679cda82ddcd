//! Error types shared by the lifecycle orchestrators.

use std::fmt;

use thiserror::Error;

use crate::converge::ConvergenceTimeout;
use crate::selector::Selector;

/// Kind of resource a lookup was looking for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    /// Block storage volume.
    Volume,
    /// Volume snapshot.
    Snapshot,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => f.write_str("volumes"),
            Self::Snapshot => f.write_str("snapshots"),
        }
    }
}

/// Errors raised while provisioning, snapshotting, or tearing down volumes.
///
/// None of these are retried: the only retry loop lives inside a single
/// convergence wait.
#[derive(Debug, Error)]
pub enum LifecycleError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Raised when a selector matched nothing where a match was required.
    #[error("no {kind} found matching the labels {selector}")]
    NoResourcesFound {
        /// Resource kind that was looked up.
        kind: ResourceKind,
        /// Selector that matched nothing.
        selector: Selector,
    },
    /// Raised when the matched volume is being deleted.
    #[error("volume {volume_id} is {state}; wait for the deletion to finish and try again")]
    ResourceBusy {
        /// Volume identifier.
        volume_id: String,
        /// State reported by the provider.
        state: String,
    },
    /// Raised when a restore would shrink a volume below its snapshot.
    #[error(
        "requested size ({requested} GB) is smaller than snapshot {snapshot_id} ({snapshot_size} GB); cannot create volume"
    )]
    InvalidSize {
        /// Requested volume size.
        requested: u64,
        /// Snapshot the restore would use.
        snapshot_id: String,
        /// Size captured by the snapshot.
        snapshot_size: u64,
    },
    /// Raised when one or more snapshots ended in the `error` state.
    #[error("snapshots failed: {}", snapshot_ids.join(", "))]
    SnapshotFailed {
        /// Snapshots in the `error` state.
        snapshot_ids: Vec<String>,
    },
    /// Raised when a convergence wait exceeded its deadline.
    #[error(transparent)]
    ConvergenceTimeout(#[from] ConvergenceTimeout),
    /// Raised when a provider refuses an operation for safety reasons.
    #[error("{operation} is disabled for {provider}: {reason}")]
    OperationDisabled {
        /// Operation that was refused.
        operation: String,
        /// Provider name.
        provider: String,
        /// Explanation shown to the operator.
        reason: String,
    },
    /// Raised when a provider call outside a convergence wait fails.
    #[error("provider error: {0}")]
    Provider(#[source] ProviderError),
}
