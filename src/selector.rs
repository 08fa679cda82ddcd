//! Exact label-set selection of volumes and snapshots.
//!
//! A [`Selector`] is the only identity a logical volume has across
//! invocations: provider identifiers change every time a volume is restored,
//! while the `{name: <volume name>}` label set is stable.

use std::collections::BTreeMap;
use std::fmt;

/// Label (tag) mapping attached to provider resources.
pub type Labels = BTreeMap<String, String>;

/// Label key carrying the logical volume name.
pub const NAME_LABEL: &str = "name";

/// Resources that carry labels and a creation timestamp.
pub trait Labelled {
    /// Returns the resource labels.
    fn labels(&self) -> &Labels;

    /// Returns the provider issued creation timestamp.
    fn created_at(&self) -> &str;
}

/// Exact label-set filter.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Selector {
    labels: Labels,
}

impl Selector {
    /// Creates a selector matching exactly `labels`.
    #[must_use]
    pub const fn new(labels: Labels) -> Self {
        Self { labels }
    }

    /// Creates the canonical `{name: <name>}` selector.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        let mut labels = Labels::new();
        labels.insert(NAME_LABEL.to_owned(), name.trim().to_owned());
        Self { labels }
    }

    /// Returns the label set.
    #[must_use]
    pub const fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Returns `true` when `resource` carries exactly this label set.
    #[must_use]
    pub fn matches<R: Labelled>(&self, resource: &R) -> bool {
        resource.labels() == &self.labels
    }

    /// Keeps the resources whose labels equal this selector. Supersets and
    /// subsets do not match.
    #[must_use]
    pub fn select<R: Labelled>(&self, resources: Vec<R>) -> Vec<R> {
        resources
            .into_iter()
            .filter(|resource| self.matches(resource))
            .collect()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (key, value)) in self.labels.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

/// Returns the resource with the greatest creation timestamp.
///
/// Timestamps are compared as strings, which orders RFC 3339 values issued
/// by a single provider correctly. On ties the earliest element in input
/// order wins.
#[must_use]
pub fn latest<R: Labelled>(resources: Vec<R>) -> Option<R> {
    resources.into_iter().fold(None, |best, candidate| match best {
        Some(current) if current.created_at() >= candidate.created_at() => Some(current),
        _ => Some(candidate),
    })
}
