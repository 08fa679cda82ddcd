//! Scatter/gather snapshotting of matched volumes.

use tracing::{debug, info};

use crate::backend::ProviderCapability;
use crate::converge::{AllTerminal, Poller};
use crate::error::{LifecycleError, ResourceKind};
use crate::selector::Selector;
use crate::snapshot::{Snapshot, SnapshotRequest, SnapshotState};
use crate::volume::Volume;

/// Snapshots produced by one scatter/gather round, refreshed to the last
/// observed state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotBatch {
    snapshots: Vec<Snapshot>,
}

impl SnapshotBatch {
    /// Returns the snapshots in issuance order.
    #[must_use]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Returns every snapshot identifier in issuance order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.id.clone())
            .collect()
    }

    /// Returns the identifiers of snapshots that ended in `error`.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<String> {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.state == SnapshotState::Error)
            .map(|snapshot| snapshot.id.clone())
            .collect()
    }

    /// Passes the batch through only when no snapshot failed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::SnapshotFailed`] listing the failed
    /// snapshots.
    pub fn ensure_created<E>(self) -> Result<Self, LifecycleError<E>>
    where
        E: std::error::Error + 'static,
    {
        let failed = self.failed_ids();
        if failed.is_empty() {
            return Ok(self);
        }
        Err(LifecycleError::SnapshotFailed {
            snapshot_ids: failed,
        })
    }
}

/// Creates snapshots for a set of volumes and waits for all of them.
#[derive(Clone, Debug)]
pub struct SnapshotOrchestrator<P> {
    provider: P,
    poller: Poller,
}

impl<P: ProviderCapability> SnapshotOrchestrator<P> {
    /// Creates an orchestrator over `provider`.
    #[must_use]
    pub const fn new(provider: P, poller: Poller) -> Self {
        Self { provider, poller }
    }

    /// Snapshots every volume labelled exactly like `selector`, leaving the
    /// volumes in place, and returns the new snapshot identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoResourcesFound`] when no volume matches or
    /// when no matching snapshot is visible afterwards,
    /// [`LifecycleError::SnapshotFailed`] when any snapshot ends in `error`,
    /// and propagates provider and convergence failures.
    pub fn snapshot(
        &self,
        name: &str,
        selector: &Selector,
    ) -> Result<Vec<String>, LifecycleError<P::Error>> {
        let volumes = selector.select(
            self.provider
                .list_volumes(selector)
                .map_err(LifecycleError::Provider)?,
        );
        let batch = self
            .snapshot_all(name, &volumes, selector)?
            .ensure_created::<P::Error>()?;

        let visible = selector.select(
            self.provider
                .list_snapshots(selector)
                .map_err(LifecycleError::Provider)?,
        );
        if visible.is_empty() {
            return Err(LifecycleError::NoResourcesFound {
                kind: ResourceKind::Snapshot,
                selector: selector.clone(),
            });
        }
        info!(count = visible.len(), %selector, "snapshots with matching labels");
        for snapshot in &visible {
            info!(
                snapshot_id = %snapshot.id,
                state = %snapshot.state,
                name = snapshot.name.as_deref().unwrap_or_default(),
                "visible snapshot"
            );
        }

        Ok(batch.ids())
    }

    /// Issues one snapshot per volume, then waits until every snapshot is
    /// `created` or `error`.
    ///
    /// Failed snapshots are returned, not raised: callers must inspect the
    /// batch (see [`SnapshotBatch::ensure_created`]) before acting on the
    /// source volumes.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoResourcesFound`] for an empty volume set,
    /// [`LifecycleError::ResourceBusy`] when a volume is being deleted,
    /// [`LifecycleError::Provider`] when a snapshot request is rejected, and
    /// [`LifecycleError::ConvergenceTimeout`] when the batch does not settle.
    pub fn snapshot_all(
        &self,
        name: &str,
        volumes: &[Volume],
        selector: &Selector,
    ) -> Result<SnapshotBatch, LifecycleError<P::Error>> {
        if volumes.is_empty() {
            return Err(LifecycleError::NoResourcesFound {
                kind: ResourceKind::Volume,
                selector: selector.clone(),
            });
        }
        if let Some(departing) = volumes.iter().find(|volume| volume.state.is_departing()) {
            return Err(LifecycleError::ResourceBusy {
                volume_id: departing.id.clone(),
                state: departing.state.to_string(),
            });
        }

        let mut ids = Vec::with_capacity(volumes.len());
        for volume in volumes {
            info!(volume_id = %volume.id, "creating snapshot");
            let request = SnapshotRequest::for_volume(name, &volume.id, selector.labels().clone());
            let snapshot = self
                .provider
                .create_snapshot(&request)
                .map_err(LifecycleError::Provider)?;
            info!(volume_id = %volume.id, snapshot_id = %snapshot.id, "snapshot requested");
            ids.push(snapshot.id);
        }

        info!(count = ids.len(), "waiting for snapshots to complete");
        let snapshots = AllTerminal::new(&ids, &SnapshotState::TERMINAL).wait(
            &self.poller,
            "snapshots to complete",
            |id| {
                let snapshot = self.provider.get_snapshot(id)?;
                debug!(snapshot_id = %snapshot.id, state = %snapshot.state, "snapshot state");
                Ok::<_, P::Error>(snapshot)
            },
            |snapshot| snapshot.state,
        )?;
        info!("all snapshots completed");

        Ok(SnapshotBatch { snapshots })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::{FakeProvider, ProviderCall};
    use crate::volume::VolumeState;

    #[fixture]
    fn provider() -> FakeProvider {
        FakeProvider::new()
    }

    fn poller() -> Poller {
        Poller::new(Duration::from_secs(2), Duration::from_millis(1))
    }

    fn seed_volumes(provider: &FakeProvider, count: usize) -> Vec<Volume> {
        (0..count)
            .map(|index| {
                provider.seed_volume(
                    &format!("vol-{index}"),
                    &Selector::for_name("db"),
                    VolumeState::Attached,
                    20,
                    "2024-01-01T00:00:00Z",
                )
            })
            .collect()
    }

    #[rstest]
    fn empty_volume_set_fails_fast(provider: FakeProvider) {
        let orchestrator = SnapshotOrchestrator::new(&provider, poller());
        let err = orchestrator
            .snapshot_all("db", &[], &Selector::for_name("db"))
            .expect_err("nothing to snapshot");
        assert!(matches!(
            err,
            LifecycleError::NoResourcesFound {
                kind: ResourceKind::Volume,
                ..
            }
        ));
        assert!(provider.calls().is_empty());
    }

    #[rstest]
    fn gather_waits_for_the_slowest_snapshot(provider: FakeProvider) {
        let volumes = seed_volumes(&provider, 3);
        provider.plan_snapshot(0, SnapshotState::Created);
        provider.plan_snapshot(5, SnapshotState::Created);
        provider.plan_snapshot(0, SnapshotState::Created);

        let batch = SnapshotOrchestrator::new(&provider, poller())
            .snapshot_all("db", &volumes, &Selector::for_name("db"))
            .unwrap_or_else(|err| panic!("snapshots should settle: {err}"));

        assert!(
            batch
                .snapshots()
                .iter()
                .all(|snapshot| snapshot.state == SnapshotState::Created)
        );
        let slow_id = batch.ids().get(1).cloned().unwrap_or_default();
        let slow_polls = provider
            .calls()
            .iter()
            .filter(|call| **call == ProviderCall::GetSnapshot(slow_id.clone()))
            .count();
        assert_eq!(slow_polls, 6, "five pending ticks plus the terminal one");

        let first_get = provider
            .calls()
            .iter()
            .position(|call| matches!(call, ProviderCall::GetSnapshot(_)));
        let last_create = provider
            .calls()
            .iter()
            .rposition(|call| matches!(call, ProviderCall::CreateSnapshot { .. }));
        assert!(last_create < first_get, "all requests are scattered first");
    }

    #[rstest]
    fn error_snapshots_count_as_settled_and_are_reported(provider: FakeProvider) {
        let volumes = seed_volumes(&provider, 2);
        provider.plan_snapshot(1, SnapshotState::Error);
        provider.plan_snapshot(0, SnapshotState::Created);

        let batch = SnapshotOrchestrator::new(&provider, poller())
            .snapshot_all("db", &volumes, &Selector::for_name("db"))
            .unwrap_or_else(|err| panic!("batch should settle: {err}"));

        assert_eq!(batch.failed_ids().len(), 1);
        let err = batch
            .ensure_created::<std::io::Error>()
            .expect_err("failed snapshot must be surfaced");
        assert!(matches!(err, LifecycleError::SnapshotFailed { .. }));
    }

    #[rstest]
    fn departing_volumes_are_not_snapshotted(provider: FakeProvider) {
        let volume = provider.seed_volume(
            "vol-x",
            &Selector::for_name("db"),
            VolumeState::Deleting,
            20,
            "2024-01-01T00:00:00Z",
        );
        let err = SnapshotOrchestrator::new(&provider, poller())
            .snapshot_all("db", &[volume], &Selector::for_name("db"))
            .expect_err("deleting volume");
        assert!(matches!(err, LifecycleError::ResourceBusy { .. }));
        assert_eq!(provider.snapshot_requests(), 0);
    }

    #[rstest]
    fn pending_snapshot_times_out() {
        let provider = FakeProvider::new();
        let volumes = seed_volumes(&provider, 1);
        provider.plan_snapshot(u32::MAX, SnapshotState::Created);
        let err = SnapshotOrchestrator::new(
            &provider,
            Poller::new(Duration::from_millis(20), Duration::from_millis(1)),
        )
        .snapshot_all("db", &volumes, &Selector::for_name("db"))
        .expect_err("snapshot never completes");
        assert!(matches!(err, LifecycleError::ConvergenceTimeout(_)));
    }

    #[rstest]
    fn standalone_flow_returns_every_snapshot_id(provider: FakeProvider) {
        seed_volumes(&provider, 2);
        let ids = SnapshotOrchestrator::new(&provider, poller())
            .snapshot("db", &Selector::for_name("db"))
            .unwrap_or_else(|err| panic!("snapshot flow: {err}"));

        assert_eq!(ids.len(), 2);
        assert!(
            provider
                .calls()
                .iter()
                .all(|call| !matches!(call, ProviderCall::DeleteVolume(_))),
            "volumes stay in place"
        );
    }

    #[rstest]
    fn standalone_flow_requires_a_match(provider: FakeProvider) {
        provider.seed_volume(
            "vol-other",
            &Selector::for_name("other"),
            VolumeState::Attached,
            10,
            "2024-01-01T00:00:00Z",
        );
        let err = SnapshotOrchestrator::new(&provider, poller())
            .snapshot("db", &Selector::for_name("db"))
            .expect_err("no matching volume");
        assert!(matches!(
            err,
            LifecycleError::NoResourcesFound {
                kind: ResourceKind::Volume,
                ..
            }
        ));
    }
}
