//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::backend::{ProviderCapability, SnapshotRetention};
use crate::providers::{CommandOutput, CommandRunner, ProviderError};
use crate::selector::Selector;
use crate::snapshot::{Snapshot, SnapshotRequest, SnapshotState};
use crate::volume::{Volume, VolumeRequest, VolumeState};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic CLI outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the value following `flag`, if present.
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<String> {
        self.args
            .iter()
            .skip_while(|arg| arg.to_str() != Some(flag))
            .nth(1)
            .map(|value| value.to_string_lossy().into_owned())
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit with the given stdout.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a successful exit with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProviderError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ProviderError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Provider call recorded by [`FakeProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderCall {
    /// `list_volumes`.
    ListVolumes,
    /// `get_volume` for the given id.
    GetVolume(String),
    /// `create_volume`.
    CreateVolume {
        /// Requested name.
        name: String,
        /// Requested size in GB.
        size: u64,
        /// Snapshot the volume is restored from.
        from_snapshot: Option<String>,
    },
    /// `delete_volume` for the given id.
    DeleteVolume(String),
    /// `list_snapshots`.
    ListSnapshots,
    /// `get_snapshot` for the given id.
    GetSnapshot(String),
    /// `create_snapshot`.
    CreateSnapshot {
        /// Source volume.
        volume_id: String,
        /// Snapshot name.
        name: String,
    },
}

/// Errors surfaced by [`FakeProvider`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FakeProviderError {
    /// Raised when an id does not exist in the fake cloud.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource kind.
        resource: &'static str,
        /// Missing identifier.
        id: String,
    },
    /// Raised by injected transient failures.
    #[error("transient failure fetching {id}")]
    Transient {
        /// Identifier being fetched.
        id: String,
    },
}

#[derive(Debug)]
struct FakeVolume {
    volume: Volume,
    creation_ticks: u32,
    deletion_ticks: Option<u32>,
}

#[derive(Debug)]
struct FakeSnapshot {
    snapshot: Snapshot,
    pending_ticks: u32,
    outcome: SnapshotState,
}

#[derive(Debug, Default)]
struct Cloud {
    volumes: Vec<FakeVolume>,
    snapshots: Vec<FakeSnapshot>,
    snapshot_plans: VecDeque<(u32, SnapshotState)>,
    volume_creation_ticks: u32,
    volume_deletion_ticks: u32,
    failing_volume_gets: u32,
    retention: SnapshotRetention,
    calls: Vec<ProviderCall>,
    sequence: u32,
}

impl Cloud {
    fn next_sequence(&mut self) -> u32 {
        self.sequence += 1;
        self.sequence
    }

    fn volume_mut(&mut self, id: &str) -> Result<&mut FakeVolume, FakeProviderError> {
        self.volumes
            .iter_mut()
            .find(|entry| entry.volume.id == id)
            .ok_or_else(|| FakeProviderError::NotFound {
                resource: "volume",
                id: id.to_owned(),
            })
    }
}

/// In-memory, eventually consistent cloud implementing
/// [`ProviderCapability`].
///
/// New volumes report `creating` for a configurable number of `get_volume`
/// calls before turning `detached`. Deleted volumes stay listed for a
/// configurable number of `list_volumes` calls. Each new snapshot consumes
/// the next plan queued with [`FakeProvider::plan_snapshot`] (default:
/// created on the first poll). Clones share state.
#[derive(Clone, Debug, Default)]
pub struct FakeProvider {
    cloud: Rc<RefCell<Cloud>>,
}

impl FakeProvider {
    /// Creates an empty cloud.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a volume without recording a call.
    pub fn seed_volume(
        &self,
        id: &str,
        selector: &Selector,
        state: VolumeState,
        size: u64,
        created_at: &str,
    ) -> Volume {
        let volume = Volume {
            id: id.to_owned(),
            labels: selector.labels().clone(),
            state,
            size,
            created_at: created_at.to_owned(),
        };
        self.cloud.borrow_mut().volumes.push(FakeVolume {
            volume: volume.clone(),
            creation_ticks: 0,
            deletion_ticks: None,
        });
        volume
    }

    /// Adds a completed snapshot without recording a call.
    pub fn seed_snapshot(
        &self,
        id: &str,
        selector: &Selector,
        size: u64,
        created_at: &str,
    ) -> Snapshot {
        let snapshot = Snapshot {
            id: id.to_owned(),
            name: None,
            labels: selector.labels().clone(),
            state: SnapshotState::Created,
            size,
            created_at: created_at.to_owned(),
        };
        self.cloud.borrow_mut().snapshots.push(FakeSnapshot {
            snapshot: snapshot.clone(),
            pending_ticks: 0,
            outcome: SnapshotState::Created,
        });
        snapshot
    }

    /// Queues the behaviour of the next created snapshot: it stays pending
    /// for `pending_ticks` polls, then settles in `outcome`.
    pub fn plan_snapshot(&self, pending_ticks: u32, outcome: SnapshotState) {
        self.cloud
            .borrow_mut()
            .snapshot_plans
            .push_back((pending_ticks, outcome));
    }

    /// Number of `get_volume` polls a new volume stays `creating`.
    pub fn set_volume_creation_ticks(&self, ticks: u32) {
        self.cloud.borrow_mut().volume_creation_ticks = ticks;
    }

    /// Number of `list_volumes` calls a deleted volume remains visible.
    pub fn set_volume_deletion_ticks(&self, ticks: u32) {
        self.cloud.borrow_mut().volume_deletion_ticks = ticks;
    }

    /// Makes the next `count` calls to `get_volume` fail.
    pub fn fail_next_volume_gets(&self, count: u32) {
        self.cloud.borrow_mut().failing_volume_gets = count;
    }

    /// Overrides the reported snapshot retention.
    pub fn set_snapshot_retention(&self, retention: SnapshotRetention) {
        self.cloud.borrow_mut().retention = retention;
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.cloud.borrow().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.cloud.borrow_mut().calls.clear();
    }

    /// Number of volumes still stored, including ones being deleted.
    #[must_use]
    pub fn volume_count(&self) -> usize {
        self.cloud.borrow().volumes.len()
    }

    /// Number of `create_volume` calls.
    #[must_use]
    pub fn volume_requests(&self) -> usize {
        self.count_calls(|call| matches!(call, ProviderCall::CreateVolume { .. }))
    }

    /// Number of `create_snapshot` calls.
    #[must_use]
    pub fn snapshot_requests(&self) -> usize {
        self.count_calls(|call| matches!(call, ProviderCall::CreateSnapshot { .. }))
    }

    fn count_calls(&self, predicate: impl Fn(&ProviderCall) -> bool) -> usize {
        self.cloud
            .borrow()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn record(&self, call: ProviderCall) {
        self.cloud.borrow_mut().calls.push(call);
    }
}

impl ProviderCapability for FakeProvider {
    type Error = FakeProviderError;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn list_volumes(&self, _selector: &Selector) -> Result<Vec<Volume>, Self::Error> {
        self.record(ProviderCall::ListVolumes);
        let mut cloud = self.cloud.borrow_mut();
        cloud
            .volumes
            .retain(|entry| entry.deletion_ticks != Some(0));
        for entry in &mut cloud.volumes {
            if let Some(ticks) = entry.deletion_ticks.as_mut() {
                *ticks -= 1;
            }
        }
        Ok(cloud
            .volumes
            .iter()
            .map(|entry| entry.volume.clone())
            .collect())
    }

    fn get_volume(&self, id: &str) -> Result<Volume, Self::Error> {
        self.record(ProviderCall::GetVolume(id.to_owned()));
        let mut cloud = self.cloud.borrow_mut();
        if cloud.failing_volume_gets > 0 {
            cloud.failing_volume_gets -= 1;
            return Err(FakeProviderError::Transient { id: id.to_owned() });
        }
        let entry = cloud.volume_mut(id)?;
        if entry.creation_ticks > 0 {
            entry.creation_ticks -= 1;
        } else if entry.volume.state == VolumeState::Creating {
            entry.volume.state = VolumeState::Detached;
        }
        Ok(entry.volume.clone())
    }

    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume, Self::Error> {
        self.record(ProviderCall::CreateVolume {
            name: request.name.clone(),
            size: request.size,
            from_snapshot: request.from_snapshot.clone(),
        });
        let mut cloud = self.cloud.borrow_mut();
        if let Some(snapshot_id) = &request.from_snapshot {
            if !cloud
                .snapshots
                .iter()
                .any(|entry| &entry.snapshot.id == snapshot_id)
            {
                return Err(FakeProviderError::NotFound {
                    resource: "snapshot",
                    id: snapshot_id.clone(),
                });
            }
        }
        let sequence = cloud.next_sequence();
        let volume = Volume {
            id: format!("vol-fake-{sequence}"),
            labels: request.labels.clone(),
            state: VolumeState::Creating,
            size: request.size,
            created_at: fake_timestamp(sequence),
        };
        let creation_ticks = cloud.volume_creation_ticks;
        cloud.volumes.push(FakeVolume {
            volume: volume.clone(),
            creation_ticks,
            deletion_ticks: None,
        });
        Ok(volume)
    }

    fn delete_volume(&self, id: &str) -> Result<(), Self::Error> {
        self.record(ProviderCall::DeleteVolume(id.to_owned()));
        let mut cloud = self.cloud.borrow_mut();
        let ticks = cloud.volume_deletion_ticks;
        let entry = cloud.volume_mut(id)?;
        entry.volume.state = VolumeState::Deleting;
        entry.deletion_ticks = Some(ticks);
        Ok(())
    }

    fn list_snapshots(&self, _selector: &Selector) -> Result<Vec<Snapshot>, Self::Error> {
        self.record(ProviderCall::ListSnapshots);
        Ok(self
            .cloud
            .borrow()
            .snapshots
            .iter()
            .map(|entry| entry.snapshot.clone())
            .collect())
    }

    fn get_snapshot(&self, id: &str) -> Result<Snapshot, Self::Error> {
        self.record(ProviderCall::GetSnapshot(id.to_owned()));
        let mut cloud = self.cloud.borrow_mut();
        let entry = cloud
            .snapshots
            .iter_mut()
            .find(|entry| entry.snapshot.id == id)
            .ok_or_else(|| FakeProviderError::NotFound {
                resource: "snapshot",
                id: id.to_owned(),
            })?;
        if entry.pending_ticks > 0 {
            entry.pending_ticks -= 1;
        } else {
            entry.snapshot.state = entry.outcome;
        }
        Ok(entry.snapshot.clone())
    }

    fn create_snapshot(&self, request: &SnapshotRequest) -> Result<Snapshot, Self::Error> {
        self.record(ProviderCall::CreateSnapshot {
            volume_id: request.volume_id.clone(),
            name: request.name.clone(),
        });
        let mut cloud = self.cloud.borrow_mut();
        let size = cloud.volume_mut(&request.volume_id)?.volume.size;
        let (pending_ticks, outcome) = cloud
            .snapshot_plans
            .pop_front()
            .unwrap_or((0, SnapshotState::Created));
        let sequence = cloud.next_sequence();
        let snapshot = Snapshot {
            id: format!("snap-fake-{sequence}"),
            name: Some(request.name.clone()),
            labels: request.labels.clone(),
            state: SnapshotState::Pending,
            size,
            created_at: fake_timestamp(sequence),
        };
        cloud.snapshots.push(FakeSnapshot {
            snapshot: snapshot.clone(),
            pending_ticks,
            outcome,
        });
        Ok(snapshot)
    }

    fn snapshot_retention(&self) -> SnapshotRetention {
        self.cloud.borrow().retention
    }
}

fn fake_timestamp(sequence: u32) -> String {
    format!("2099-01-01T00:00:00.{sequence:06}Z")
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets (`Some`) or removes (`None`) environment variables while holding
    /// a global mutex.
    #[must_use]
    pub fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
