//! Blocking convergence on eventually-consistent provider state.
//!
//! Provider APIs acknowledge mutations long before they are visible, so
//! every orchestration step that changes state is followed by a poll. The
//! [`Poller`] treats a failing check exactly like an unsatisfied predicate:
//! the failure is logged, remembered for the timeout report, and the loop
//! carries on until the deadline. Only wall-clock time bounds the retries,
//! so a check that can never succeed waits out the full timeout.

use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Default deadline for a single convergence wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default pause between two checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Raised when a predicate is not satisfied before the deadline.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error(
    "timed out after {elapsed:?} waiting for {action} ({attempts} attempts){}",
    failure_suffix(.last_failure.as_deref())
)]
pub struct ConvergenceTimeout {
    /// Human readable description of what was awaited.
    pub action: String,
    /// Wall-clock time spent polling.
    pub elapsed: Duration,
    /// Number of times the check ran.
    pub attempts: u32,
    /// Message of the most recent failed check, if any check failed.
    pub last_failure: Option<String>,
}

fn failure_suffix(last_failure: Option<&str>) -> String {
    last_failure.map_or_else(String::new, |message| format!("; last error: {message}"))
}

/// Fixed-interval poller bounded by a wall-clock timeout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Poller {
    timeout: Duration,
    interval: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

impl Poller {
    /// Creates a poller with the given deadline and interval.
    #[must_use]
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Returns the deadline applied to each wait.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the pause between checks.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs `check` until `predicate` accepts its result.
    ///
    /// The satisfying value is returned as soon as it is observed. Errors
    /// from `check` are swallowed and retried; the last one is carried in
    /// the timeout report.
    ///
    /// # Errors
    ///
    /// Returns [`ConvergenceTimeout`] when the deadline passes first.
    pub fn converge<T, E, C, P>(
        &self,
        action: &str,
        mut check: C,
        mut predicate: P,
    ) -> Result<T, ConvergenceTimeout>
    where
        C: FnMut() -> Result<T, E>,
        E: fmt::Display,
        P: FnMut(&T) -> bool,
    {
        let started = Instant::now();
        // A timeout too large to represent waits without a deadline.
        let deadline = started.checked_add(self.timeout);
        let mut attempts: u32 = 0;
        let mut last_failure = None;

        loop {
            attempts = attempts.saturating_add(1);
            match check() {
                Ok(value) if predicate(&value) => {
                    debug!(action, attempts, "converged");
                    return Ok(value);
                }
                Ok(_) => debug!(action, attempts, "not converged yet"),
                Err(err) => {
                    warn!(action, attempts, error = %err, "check failed, retrying");
                    last_failure = Some(err.to_string());
                }
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => break,
                Some(deadline) => self.interval.min(deadline.saturating_duration_since(now)),
                None => self.interval,
            };
            sleep(pause);
        }

        Err(ConvergenceTimeout {
            action: action.to_owned(),
            elapsed: started.elapsed(),
            attempts,
            last_failure,
        })
    }
}

/// Convergence condition satisfied once every resource in a batch reports a
/// terminal state.
///
/// Partial completion never shortcuts the wait: the check refetches every
/// resource on each tick and the predicate holds only when all of them are
/// in `terminal`.
#[derive(Clone, Copy, Debug)]
pub struct AllTerminal<'a, S> {
    ids: &'a [String],
    terminal: &'a [S],
}

impl<'a, S: PartialEq> AllTerminal<'a, S> {
    /// Tracks `ids` until each reaches one of the `terminal` states.
    #[must_use]
    pub const fn new(ids: &'a [String], terminal: &'a [S]) -> Self {
        Self { ids, terminal }
    }

    /// Polls `fetch` for every id until all results map to a terminal state
    /// via `state_of`, returning the last observed resources in id order.
    ///
    /// # Errors
    ///
    /// Returns [`ConvergenceTimeout`] when some resource is still
    /// non-terminal (or could not be fetched) at the deadline.
    pub fn wait<T, E, F, G>(
        &self,
        poller: &Poller,
        action: &str,
        mut fetch: F,
        state_of: G,
    ) -> Result<Vec<T>, ConvergenceTimeout>
    where
        F: FnMut(&str) -> Result<T, E>,
        E: fmt::Display,
        G: Fn(&T) -> S,
    {
        poller.converge(
            action,
            || {
                self.ids
                    .iter()
                    .map(|id| fetch(id))
                    .collect::<Result<Vec<_>, _>>()
            },
            |items| self.holds(items, &state_of),
        )
    }

    fn holds<T, G>(&self, items: &[T], state_of: &G) -> bool
    where
        G: Fn(&T) -> S,
    {
        items
            .iter()
            .all(|item| self.terminal.contains(&state_of(item)))
    }
}
