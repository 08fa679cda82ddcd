//! Output artifacts written after a successful flow.
//!
//! Snapshot runs leave `snapshot-output.txt` holding the comma-joined
//! snapshot IDs. Provisioning leaves `volume-<provider>-<name>.json` with the
//! volume ID and zone so downstream tooling can attach the volume.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Serialize;
use thiserror::Error;

/// File name of the snapshot ID list.
pub const SNAPSHOT_OUTPUT_FILE: &str = "snapshot-output.txt";

/// Errors raised while writing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Raised when file system operations fail.
    #[error("failed to write {path}: {message}")]
    Io {
        /// Path that could not be written.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a record cannot be encoded as JSON.
    #[error("failed to encode {file_name}: {message}")]
    Serialize {
        /// Artifact being encoded.
        file_name: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Record describing a provisioned volume.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VolumeRecord {
    /// Provider volume identifier.
    pub volume_id: String,
    /// Zone (or availability zone) hosting the volume.
    pub zone: String,
}

/// Abstraction over artifact sinks for dependency injection.
pub trait ArtifactWriter {
    /// Writes `contents` to `file_name` and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] when the file cannot be written.
    fn write_artifact(&self, file_name: &str, contents: &str)
    -> Result<Utf8PathBuf, ArtifactError>;

    /// Writes the snapshot IDs comma-joined with no trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] when the file cannot be written.
    fn write_snapshot_ids(&self, ids: &[String]) -> Result<Utf8PathBuf, ArtifactError> {
        self.write_artifact(SNAPSHOT_OUTPUT_FILE, &ids.join(","))
    }

    /// Writes the volume record as `volume-<provider>-<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when encoding or writing fails.
    fn write_volume_record(
        &self,
        provider: &str,
        volume_name: &str,
        record: &VolumeRecord,
    ) -> Result<Utf8PathBuf, ArtifactError> {
        let file_name = volume_record_file_name(provider, volume_name);
        let contents =
            serde_json::to_string(record).map_err(|err| ArtifactError::Serialize {
                file_name: file_name.clone(),
                message: err.to_string(),
            })?;
        self.write_artifact(&file_name, &contents)
    }
}

/// Returns the file name used for a provisioned volume record.
#[must_use]
pub fn volume_record_file_name(provider: &str, volume_name: &str) -> String {
    format!("volume-{provider}-{volume_name}.json")
}

/// Writes artifacts beneath a root directory, creating it on demand.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn open_root(&self) -> Result<Dir, ArtifactError> {
        let io_error = |err: io::Error| ArtifactError::Io {
            path: self.root.clone(),
            message: err.to_string(),
        };
        Dir::create_ambient_dir_all(&self.root, ambient_authority()).map_err(io_error)?;
        Dir::open_ambient_dir(&self.root, ambient_authority()).map_err(io_error)
    }
}

impl ArtifactWriter for ArtifactStore {
    fn write_artifact(
        &self,
        file_name: &str,
        contents: &str,
    ) -> Result<Utf8PathBuf, ArtifactError> {
        let path = self.root.join(file_name);
        let dir = self.open_root()?;
        dir.write(file_name, contents)
            .map_err(|err| ArtifactError::Io {
                path: path.clone(),
                message: err.to_string(),
            })?;
        Ok(path)
    }
}

impl<W: ArtifactWriter + ?Sized> ArtifactWriter for &W {
    fn write_artifact(
        &self,
        file_name: &str,
        contents: &str,
    ) -> Result<Utf8PathBuf, ArtifactError> {
        (**self).write_artifact(file_name, contents)
    }
}
