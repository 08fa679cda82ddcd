//! BDD step definitions for the provisioning flow.

use rstest_bdd_macros::{given, then, when};
use stowage::test_support::ProviderCall;
use stowage::{Labels, ProvisionOutcome, Selector, VolumeProvisioner, VolumeState};

use super::test_helpers::{
    ProvisionResult, ProvisioningContext, ZONE, error_kind, parse_state, poller,
};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a fake cloud for volume \"{name}\"")]
fn fake_cloud(mut provisioning_context: ProvisioningContext, name: String) -> ProvisioningContext {
    provisioning_context.name = name.trim().to_owned();
    provisioning_context
}

#[given("a \"{state}\" volume \"{id}\" created at \"{created_at}\"")]
fn seeded_volume(
    provisioning_context: ProvisioningContext,
    state: String,
    id: String,
    created_at: String,
) -> ProvisioningContext {
    provisioning_context.provider.seed_volume(
        &id,
        &provisioning_context.selector(),
        parse_state(&state),
        20,
        &created_at,
    );
    provisioning_context
}

#[given("a {size:u64} GB snapshot \"{id}\" created at \"{created_at}\"")]
fn seeded_snapshot(
    provisioning_context: ProvisioningContext,
    size: u64,
    id: String,
    created_at: String,
) -> ProvisioningContext {
    provisioning_context.provider.seed_snapshot(
        &id,
        &provisioning_context.selector(),
        size,
        &created_at,
    );
    provisioning_context
}

#[given("new volumes take {ticks:u32} polls to become ready")]
fn slow_volume_creation(provisioning_context: ProvisioningContext, ticks: u32) -> ProvisioningContext {
    provisioning_context.provider.set_volume_creation_ticks(ticks);
    provisioning_context
}

#[given("a volume \"{id}\" carrying an extra \"{label}\" label")]
fn volume_with_extra_label(
    provisioning_context: ProvisioningContext,
    id: String,
    label: String,
) -> ProvisioningContext {
    let mut labels: Labels = provisioning_context.selector().labels().clone();
    labels.insert(label, String::from("extra"));
    provisioning_context.provider.seed_volume(
        &id,
        &Selector::new(labels),
        VolumeState::Detached,
        20,
        "2030-01-01T00:00:00Z",
    );
    provisioning_context
}

fn provision(mut provisioning_context: ProvisioningContext, size: u64) -> ProvisioningContext {
    let provisioner = VolumeProvisioner::new(&provisioning_context.provider, poller(), ZONE);
    let selector = provisioning_context.selector();
    let result = match provisioner.provision(&provisioning_context.name, &selector, size) {
        Ok(volume) => ProvisionResult::Success(volume),
        Err(err) => ProvisionResult::Failure {
            kind: error_kind(&err),
            message: err.to_string(),
        },
    };
    provisioning_context.results.push(result);
    provisioning_context
}

#[when("I provision the volume with {size:u64} GB")]
fn provision_volume(provisioning_context: ProvisioningContext, size: u64) -> ProvisioningContext {
    provision(provisioning_context, size)
}

#[when("I provision the same volume again with {size:u64} GB")]
fn provision_volume_again(
    provisioning_context: ProvisioningContext,
    size: u64,
) -> ProvisioningContext {
    provision(provisioning_context, size)
}

fn success(provisioning_context: &ProvisioningContext) -> Result<&stowage::ProvisionedVolume, StepError> {
    match provisioning_context.last() {
        Some(ProvisionResult::Success(volume)) => Ok(volume),
        Some(ProvisionResult::Failure { message, .. }) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the provisioned volume is \"{id}\"")]
fn provisioned_volume_is(provisioning_context: &ProvisioningContext, id: String) -> Result<(), StepError> {
    let provisioned = success(provisioning_context)?;
    if provisioned.volume.id == id {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected volume {id}, got {}",
            provisioned.volume.id
        )))
    }
}

#[then("the provisioning outcome is \"{outcome}\"")]
fn provisioning_outcome_is(
    provisioning_context: &ProvisioningContext,
    outcome: String,
) -> Result<(), StepError> {
    let provisioned = success(provisioning_context)?;
    let actual = match provisioned.outcome {
        ProvisionOutcome::Reused => "reused",
        ProvisionOutcome::Restored { .. } => "restored",
        ProvisionOutcome::Created => "created",
    };
    if actual == outcome {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected outcome {outcome}, got {actual}"
        )))
    }
}

#[then("the volume was restored from \"{snapshot_id}\"")]
fn restored_from(
    provisioning_context: &ProvisioningContext,
    snapshot_id: String,
) -> Result<(), StepError> {
    let requested = provisioning_context
        .provider
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ProviderCall::CreateVolume { from_snapshot, .. } => from_snapshot,
            _ => None,
        });
    if requested.as_deref() == Some(snapshot_id.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected restore from {snapshot_id}, got {requested:?}"
        )))
    }
}

#[then("the provisioned volume is ready")]
fn provisioned_volume_is_ready(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let provisioned = success(provisioning_context)?;
    if provisioned.volume.state.is_ready() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "volume {} is {}",
            provisioned.volume.id, provisioned.volume.state
        )))
    }
}

#[then("provisioning fails with \"{kind}\"")]
fn provisioning_fails_with(
    provisioning_context: &ProvisioningContext,
    kind: String,
) -> Result<(), StepError> {
    match provisioning_context.last() {
        Some(ProvisionResult::Failure { kind: actual, .. }) if *actual == kind => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure {kind}, got {other:?}"
        ))),
    }
}

#[then("no volume was created")]
fn no_volume_created(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    match provisioning_context.provider.volume_requests() {
        0 => Ok(()),
        count => Err(StepError::Assertion(format!(
            "expected no create_volume call, got {count}"
        ))),
    }
}

#[then("exactly one volume was created")]
fn one_volume_created(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    match provisioning_context.provider.volume_requests() {
        1 => Ok(()),
        count => Err(StepError::Assertion(format!(
            "expected one create_volume call, got {count}"
        ))),
    }
}

#[then("both runs returned the same volume")]
fn same_volume_twice(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let ids = provisioning_context
        .results
        .iter()
        .map(|result| match result {
            ProvisionResult::Success(provisioned) => Ok(provisioned.volume.id.clone()),
            ProvisionResult::Failure { message, .. } => Err(StepError::Assertion(format!(
                "run failed: {message}"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    match ids.as_slice() {
        [first, second] if first == second => Ok(()),
        _ => Err(StepError::Assertion(format!(
            "expected two identical ids, got {ids:?}"
        ))),
    }
}
