//! BDD step definitions for the teardown flow.

use rstest_bdd_macros::{given, then, when};
use stowage::test_support::ProviderCall;
use stowage::{LifecycleError, SnapshotRetention, SnapshotState, TeardownOrchestrator, VolumeState};

use super::test_helpers::{TeardownContext, TeardownResult, poller};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a fake cloud for volume \"{name}\"")]
fn fake_cloud(mut teardown_context: TeardownContext, name: String) -> TeardownContext {
    teardown_context.name = name.trim().to_owned();
    teardown_context
}

#[given("a \"{state}\" volume \"{id}\" created at \"{created_at}\"")]
fn seeded_volume(
    teardown_context: TeardownContext,
    state: String,
    id: String,
    created_at: String,
) -> TeardownContext {
    let parsed = match state.as_str() {
        "attached" => VolumeState::Attached,
        "detached" => VolumeState::Detached,
        "available" => VolumeState::Available,
        other => VolumeState::Other(other.to_owned()),
    };
    teardown_context.provider.seed_volume(
        &id,
        &teardown_context.selector(),
        parsed,
        20,
        &created_at,
    );
    teardown_context
}

#[given("the next snapshot completes immediately")]
fn next_snapshot_completes(teardown_context: TeardownContext) -> TeardownContext {
    teardown_context
        .provider
        .plan_snapshot(0, SnapshotState::Created);
    teardown_context
}

#[given("the following snapshot stays pending for {ticks:u32} polls")]
fn following_snapshot_pending(teardown_context: TeardownContext, ticks: u32) -> TeardownContext {
    teardown_context
        .provider
        .plan_snapshot(ticks, SnapshotState::Created);
    teardown_context
}

#[given("the next snapshot ends in error")]
fn next_snapshot_fails(teardown_context: TeardownContext) -> TeardownContext {
    teardown_context.provider.plan_snapshot(1, SnapshotState::Error);
    teardown_context
}

#[given("deleted volumes stay listed for {ticks:u32} polls")]
fn lingering_deletions(teardown_context: TeardownContext, ticks: u32) -> TeardownContext {
    teardown_context.provider.set_volume_deletion_ticks(ticks);
    teardown_context
}

#[given("snapshots are deleted together with their volume")]
fn cascading_snapshots(teardown_context: TeardownContext) -> TeardownContext {
    teardown_context
        .provider
        .set_snapshot_retention(SnapshotRetention::CascadesWithVolume);
    teardown_context
}

#[when("I tear down the volumes")]
fn tear_down(mut teardown_context: TeardownContext) -> TeardownContext {
    let orchestrator = TeardownOrchestrator::new(&teardown_context.provider, poller());
    let result = match orchestrator.teardown(&teardown_context.name, &teardown_context.selector())
    {
        Ok(ids) => TeardownResult::Success(ids),
        Err(err) => TeardownResult::Failure {
            kind: String::from(match err {
                LifecycleError::NoResourcesFound { .. } => "no resources found",
                LifecycleError::SnapshotFailed { .. } => "snapshot failed",
                LifecycleError::OperationDisabled { .. } => "operation disabled",
                LifecycleError::ResourceBusy { .. } => "resource busy",
                LifecycleError::ConvergenceTimeout(_) => "convergence timeout",
                LifecycleError::InvalidSize { .. } | LifecycleError::Provider(_) => "other",
            }),
            message: err.to_string(),
        },
    };
    teardown_context.outcome = Some(result);
    teardown_context
}

#[then("teardown reports {count:usize} snapshot ids")]
fn teardown_reports(teardown_context: &TeardownContext, count: usize) -> Result<(), StepError> {
    match &teardown_context.outcome {
        Some(TeardownResult::Success(ids)) if ids.len() == count => Ok(()),
        Some(TeardownResult::Success(ids)) => Err(StepError::Assertion(format!(
            "expected {count} snapshot ids, got {ids:?}"
        ))),
        Some(TeardownResult::Failure { message, .. }) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("teardown fails with \"{kind}\"")]
fn teardown_fails_with(teardown_context: &TeardownContext, kind: String) -> Result<(), StepError> {
    match &teardown_context.outcome {
        Some(TeardownResult::Failure { kind: actual, .. }) if *actual == kind => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure {kind}, got {other:?}"
        ))),
    }
}

#[then("no matching volume remains")]
fn no_volume_remains(teardown_context: &TeardownContext) -> Result<(), StepError> {
    match teardown_context.provider.volume_count() {
        0 => Ok(()),
        count => Err(StepError::Assertion(format!(
            "expected every volume to be gone, {count} remain"
        ))),
    }
}

#[then("every snapshot completed before the first deletion")]
fn snapshots_before_deletion(teardown_context: &TeardownContext) -> Result<(), StepError> {
    let last_poll =
        teardown_context.last_call(|call| matches!(call, ProviderCall::GetSnapshot(_)));
    let first_delete =
        teardown_context.first_call(|call| matches!(call, ProviderCall::DeleteVolume(_)));
    match (last_poll, first_delete) {
        (Some(poll), Some(delete)) if poll < delete => Ok(()),
        other => Err(StepError::Assertion(format!(
            "snapshot polling must finish before deletion, got {other:?}"
        ))),
    }
}

#[then("no volume was deleted")]
fn no_volume_deleted(teardown_context: &TeardownContext) -> Result<(), StepError> {
    match teardown_context.first_call(|call| matches!(call, ProviderCall::DeleteVolume(_))) {
        None => Ok(()),
        Some(_) => Err(StepError::Assertion(String::from(
            "delete_volume must not run after a failed snapshot",
        ))),
    }
}

#[then("the provider was not called")]
fn provider_not_called(teardown_context: &TeardownContext) -> Result<(), StepError> {
    let calls = teardown_context.provider.calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no provider calls, got {calls:?}"
        )))
    }
}
