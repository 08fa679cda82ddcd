//! Shared fixtures for provisioning BDD scenarios.

use std::time::Duration;

use rstest::fixture;
use stowage::test_support::{FakeProvider, FakeProviderError};
use stowage::{LifecycleError, Poller, ProvisionedVolume, Selector, VolumeState};

pub const ZONE: &str = "ch-gva-2";

#[derive(Clone, Debug)]
pub enum ProvisionResult {
    Success(ProvisionedVolume),
    Failure { kind: String, message: String },
}

#[derive(Clone, Debug)]
pub struct ProvisioningContext {
    pub provider: FakeProvider,
    pub name: String,
    pub results: Vec<ProvisionResult>,
}

impl ProvisioningContext {
    pub fn selector(&self) -> Selector {
        Selector::for_name(&self.name)
    }

    pub fn last(&self) -> Option<&ProvisionResult> {
        self.results.last()
    }
}

#[fixture]
pub fn provisioning_context() -> ProvisioningContext {
    ProvisioningContext {
        provider: FakeProvider::new(),
        name: String::from("db"),
        results: Vec::new(),
    }
}

pub const fn poller() -> Poller {
    Poller::new(Duration::from_secs(2), Duration::from_millis(1))
}

pub fn parse_state(raw: &str) -> VolumeState {
    match raw {
        "creating" => VolumeState::Creating,
        "available" => VolumeState::Available,
        "attached" => VolumeState::Attached,
        "detached" => VolumeState::Detached,
        "deleting" => VolumeState::Deleting,
        other => VolumeState::Other(other.to_owned()),
    }
}

pub fn error_kind(err: &LifecycleError<FakeProviderError>) -> String {
    let kind = match err {
        LifecycleError::NoResourcesFound { .. } => "no resources found",
        LifecycleError::ResourceBusy { .. } => "resource busy",
        LifecycleError::InvalidSize { .. } => "invalid size",
        LifecycleError::SnapshotFailed { .. } => "snapshot failed",
        LifecycleError::ConvergenceTimeout(_) => "convergence timeout",
        LifecycleError::OperationDisabled { .. } => "operation disabled",
        LifecycleError::Provider(_) => "provider",
    };
    kind.to_owned()
}
