//! Shared fixtures for teardown BDD scenarios.

use std::time::Duration;

use rstest::fixture;
use stowage::test_support::{FakeProvider, ProviderCall};
use stowage::{Poller, Selector};

#[derive(Clone, Debug)]
pub enum TeardownResult {
    Success(Vec<String>),
    Failure { kind: String, message: String },
}

#[derive(Clone, Debug)]
pub struct TeardownContext {
    pub provider: FakeProvider,
    pub name: String,
    pub outcome: Option<TeardownResult>,
}

impl TeardownContext {
    pub fn selector(&self) -> Selector {
        Selector::for_name(&self.name)
    }

    /// Position of the first call matching `predicate`.
    pub fn first_call(&self, predicate: impl Fn(&ProviderCall) -> bool) -> Option<usize> {
        self.provider.calls().iter().position(predicate)
    }

    /// Position of the last call matching `predicate`.
    pub fn last_call(&self, predicate: impl Fn(&ProviderCall) -> bool) -> Option<usize> {
        self.provider.calls().iter().rposition(predicate)
    }
}

#[fixture]
pub fn teardown_context() -> TeardownContext {
    TeardownContext {
        provider: FakeProvider::new(),
        name: String::from("db"),
        outcome: None,
    }
}

pub const fn poller() -> Poller {
    Poller::new(Duration::from_secs(2), Duration::from_millis(1))
}
