//! Label-addressed volume provisioning: reuse, restore, or create.

use tracing::info;

use crate::backend::ProviderCapability;
use crate::converge::Poller;
use crate::error::LifecycleError;
use crate::selector::{Selector, latest};
use crate::volume::{Volume, VolumeRequest};

/// Path taken by a provisioning run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProvisionOutcome {
    /// A matching volume already existed and was returned untouched.
    Reused,
    /// A new volume was restored from the newest matching snapshot.
    Restored {
        /// Snapshot the volume was restored from.
        snapshot_id: String,
    },
    /// No volume or snapshot matched; an empty volume was created.
    Created,
}

/// Result of a provisioning run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionedVolume {
    /// The usable volume.
    pub volume: Volume,
    /// Zone (or region) the provider was configured for.
    pub zone: String,
    /// Which decision path produced the volume.
    pub outcome: ProvisionOutcome,
}

/// Ensures a volume exists for a selector, restoring from the newest
/// snapshot when possible.
#[derive(Clone, Debug)]
pub struct VolumeProvisioner<P> {
    provider: P,
    poller: Poller,
    zone: String,
}

impl<P: ProviderCapability> VolumeProvisioner<P> {
    /// Creates a provisioner. `zone` is reported back verbatim.
    #[must_use]
    pub fn new(provider: P, poller: Poller, zone: impl Into<String>) -> Self {
        Self {
            provider,
            poller,
            zone: zone.into(),
        }
    }

    /// Returns a usable volume labelled exactly like `selector`.
    ///
    /// An existing match is returned without any mutation. Otherwise a
    /// volume of `size` GB is restored from the newest matching snapshot, or
    /// created empty, and the call blocks until the provider reports it
    /// attached or detached.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ResourceBusy`] when the newest match is being
    /// deleted, [`LifecycleError::InvalidSize`] when `size` is below the
    /// snapshot size, [`LifecycleError::ConvergenceTimeout`] when the new
    /// volume never becomes ready, and [`LifecycleError::Provider`] for
    /// failed provider calls.
    pub fn provision(
        &self,
        name: &str,
        selector: &Selector,
        size: u64,
    ) -> Result<ProvisionedVolume, LifecycleError<P::Error>> {
        let volumes = self
            .provider
            .list_volumes(selector)
            .map_err(LifecycleError::Provider)?;
        if let Some(existing) = latest(selector.select(volumes)) {
            if existing.state.is_departing() {
                return Err(LifecycleError::ResourceBusy {
                    volume_id: existing.id,
                    state: existing.state.to_string(),
                });
            }
            info!(volume_id = %existing.id, state = %existing.state, "found existing volume");
            return Ok(self.finish(existing, ProvisionOutcome::Reused));
        }

        let snapshots = self
            .provider
            .list_snapshots(selector)
            .map_err(LifecycleError::Provider)?;
        let base = VolumeRequest::new(name, size, selector.labels().clone());
        let (request, outcome) = match latest(selector.select(snapshots)) {
            Some(snapshot) => {
                if size < snapshot.size {
                    return Err(LifecycleError::InvalidSize {
                        requested: size,
                        snapshot_id: snapshot.id,
                        snapshot_size: snapshot.size,
                    });
                }
                info!(snapshot_id = %snapshot.id, "creating volume from snapshot");
                (
                    base.from_snapshot(snapshot.id.clone()),
                    ProvisionOutcome::Restored {
                        snapshot_id: snapshot.id,
                    },
                )
            }
            None => {
                info!("creating new empty volume");
                (base, ProvisionOutcome::Created)
            }
        };

        let created = self
            .provider
            .create_volume(&request)
            .map_err(LifecycleError::Provider)?;
        let action = format!("volume {} to become ready", created.id);
        let ready = self.poller.converge(
            &action,
            || self.provider.get_volume(&created.id),
            |volume| volume.state.is_ready(),
        )?;
        info!(volume_id = %ready.id, zone = %self.zone, "provisioned volume");

        Ok(self.finish(ready, outcome))
    }

    fn finish(&self, volume: Volume, outcome: ProvisionOutcome) -> ProvisionedVolume {
        ProvisionedVolume {
            volume,
            zone: self.zone.clone(),
            outcome,
        }
    }
}
