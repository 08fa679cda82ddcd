//! JSON shapes printed by `exo --output-format json compute block-storage`.

use serde::Deserialize;

use crate::selector::Labels;

/// Sizes are printed either as a number of GB or as text such as `10 GiB`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub(super) enum ExoSize {
    Gigabytes(u64),
    Text(String),
}

impl Default for ExoSize {
    fn default() -> Self {
        Self::Gigabytes(0)
    }
}

impl ExoSize {
    /// Returns the size in GB, reading the leading digits of textual sizes.
    pub(super) fn gigabytes(&self) -> Option<u64> {
        match self {
            Self::Gigabytes(size) => Some(*size),
            Self::Text(text) => {
                let digits = text
                    .trim()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>();
                digits.parse().ok()
            }
        }
    }
}

/// Row of a `list` view; only the id is relied upon.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct ExoListing {
    pub(super) id: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct ExoVolume {
    pub(super) id: String,
    #[serde(default)]
    pub(super) state: String,
    #[serde(default)]
    pub(super) size: ExoSize,
    #[serde(default)]
    pub(super) labels: Option<Labels>,
    #[serde(default, alias = "created-at")]
    pub(super) created_at: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct ExoSnapshot {
    pub(super) id: String,
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) state: String,
    #[serde(default)]
    pub(super) size: ExoSize,
    #[serde(default)]
    pub(super) labels: Option<Labels>,
    #[serde(default, alias = "created-at")]
    pub(super) created_at: String,
}
