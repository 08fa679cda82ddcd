//! Snapshot-then-delete teardown of labelled volumes.

use tracing::info;

use crate::backend::{ProviderCapability, SnapshotRetention};
use crate::backup::SnapshotOrchestrator;
use crate::converge::Poller;
use crate::error::{LifecycleError, ResourceKind};
use crate::selector::Selector;

/// Explanation shown when a provider's snapshots die with their volume.
const CASCADING_SNAPSHOT_REASON: &str = "snapshots on this provider are deleted together with \
     their source volume, so deleting the volume leaves no backup to restore from; use the \
     snapshot flow instead, or delete the volume manually after verifying the snapshots persist";

/// Deletes every volume matching a selector after backing each one up.
#[derive(Clone, Debug)]
pub struct TeardownOrchestrator<P> {
    provider: P,
    poller: Poller,
}

impl<P: ProviderCapability> TeardownOrchestrator<P> {
    /// Creates an orchestrator over `provider`.
    #[must_use]
    pub const fn new(provider: P, poller: Poller) -> Self {
        Self { provider, poller }
    }

    /// Snapshots and then deletes every volume labelled exactly like
    /// `selector`, returning the identifiers of all snapshots taken.
    ///
    /// Deletion only starts once every snapshot is `created`. Completion is
    /// judged solely by the selector matching no volume any more.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::OperationDisabled`] when the provider's
    /// snapshots do not outlive their volume,
    /// [`LifecycleError::NoResourcesFound`] when nothing matches,
    /// [`LifecycleError::SnapshotFailed`] when any backup failed (no volume is
    /// deleted in that case), and propagates provider and convergence
    /// failures.
    pub fn teardown(
        &self,
        name: &str,
        selector: &Selector,
    ) -> Result<Vec<String>, LifecycleError<P::Error>> {
        if self.provider.snapshot_retention() == SnapshotRetention::CascadesWithVolume {
            return Err(LifecycleError::OperationDisabled {
                operation: String::from("automatic volume teardown"),
                provider: self.provider.name().to_owned(),
                reason: String::from(CASCADING_SNAPSHOT_REASON),
            });
        }

        let volumes = selector.select(
            self.provider
                .list_volumes(selector)
                .map_err(LifecycleError::Provider)?,
        );
        if volumes.is_empty() {
            return Err(LifecycleError::NoResourcesFound {
                kind: ResourceKind::Volume,
                selector: selector.clone(),
            });
        }

        let batch = SnapshotOrchestrator::new(&self.provider, self.poller)
            .snapshot_all(name, &volumes, selector)?
            .ensure_created::<P::Error>()?;

        for volume in &volumes {
            info!(volume_id = %volume.id, "deleting volume");
            self.provider
                .delete_volume(&volume.id)
                .map_err(LifecycleError::Provider)?;
        }

        self.poller.converge(
            "matching volumes to be deleted",
            || {
                self.provider
                    .list_volumes(selector)
                    .map(|listed| selector.select(listed))
            },
            Vec::is_empty,
        )?;
        info!(count = volumes.len(), "all volumes deleted");

        Ok(batch.ids())
    }
}
