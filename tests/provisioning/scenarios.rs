//! BDD scenarios for the provisioning flow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisioningContext, provisioning_context};

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Reuse the newest matching volume"
)]
fn scenario_reuse_newest(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Restore from the newest matching snapshot"
)]
fn scenario_restore_newest(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Refuse to restore into a smaller volume"
)]
fn scenario_restore_too_small(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Create an empty volume and wait for it"
)]
fn scenario_create_empty(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Ignore volumes whose labels differ"
)]
fn scenario_ignore_extra_labels(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Refuse a volume that is being deleted"
)]
fn scenario_refuse_departing(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Provisioning twice returns the same volume"
)]
fn scenario_idempotent(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}
