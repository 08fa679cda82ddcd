//! BDD scenarios for the teardown flow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{TeardownContext, teardown_context};

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Snapshot then delete every matching volume"
)]
fn scenario_snapshot_then_delete(teardown_context: TeardownContext) {
    drop(teardown_context);
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Wait for a slow snapshot before deleting"
)]
fn scenario_slow_snapshot(teardown_context: TeardownContext) {
    drop(teardown_context);
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "A failed snapshot blocks deletion"
)]
fn scenario_failed_snapshot(teardown_context: TeardownContext) {
    drop(teardown_context);
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Deleted volumes linger before disappearing"
)]
fn scenario_lingering_volumes(teardown_context: TeardownContext) {
    drop(teardown_context);
}

#[scenario(path = "tests/features/teardown.feature", name = "Nothing to tear down")]
fn scenario_nothing_to_tear_down(teardown_context: TeardownContext) {
    drop(teardown_context);
}

#[scenario(
    path = "tests/features/teardown.feature",
    name = "Providers whose snapshots die with the volume refuse teardown"
)]
fn scenario_cascading_snapshots(teardown_context: TeardownContext) {
    drop(teardown_context);
}
