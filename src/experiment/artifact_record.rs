//! Artifact Record - files written by a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Artifact Record represents one file a run left in its output directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    run_id: String,
    key: String,
    path: PathBuf,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create a new artifact record.
    ///
    /// # Arguments
    ///
    /// * `run_id` - ID of the parent run
    /// * `key` - Artifact name (e.g., "`hall_of_fame.csv`")
    /// * `path` - Location on disk
    /// * `size_bytes` - Size of the artifact in bytes
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        key: impl Into<String>,
        path: impl Into<PathBuf>,
        size_bytes: u64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            key: key.into(),
            path: path.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Record an existing file, reading its size from disk.
    ///
    /// Returns `None` if the file cannot be inspected.
    #[must_use]
    pub fn from_file(run_id: impl Into<String>, path: &Path) -> Option<Self> {
        let size = std::fs::metadata(path).ok()?.len();
        let key = path.file_name()?.to_string_lossy().into_owned();
        Some(Self::new(run_id, key, path, size))
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the artifact key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the artifact size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_record_new() {
        let artifact = ArtifactRecord::new("run-1", "med_unseen.csv", "out/med_unseen.csv", 1000);
        assert_eq!(artifact.run_id(), "run-1");
        assert_eq!(artifact.key(), "med_unseen.csv");
        assert_eq!(artifact.path(), Path::new("out/med_unseen.csv"));
        assert_eq!(artifact.size_bytes(), 1000);
    }

    #[test]
    fn test_artifact_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hall_of_fame.csv");
        std::fs::write(&path, "abc").unwrap();

        let artifact = ArtifactRecord::from_file("run-1", &path).unwrap();
        assert_eq!(artifact.key(), "hall_of_fame.csv");
        assert_eq!(artifact.size_bytes(), 3);
        assert!(ArtifactRecord::from_file("run-1", &dir.path().join("missing")).is_none());
    }
}
