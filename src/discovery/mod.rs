//! Equation discovery adapter
//!
//! The symbolic-regression search itself is an external black box behind
//! [`DiscoveryBackend`]. The adapter hands it the training rows, the
//! parameter bounds and the operator configuration, then makes sure the
//! resulting hall of fame ends up at `<output_dir>/hall_of_fame.csv`.
//!
//! ## Artifact resolution
//!
//! After the backend returns, the hall of fame is taken from, in order:
//! 1. the path the backend reported
//! 2. `<output_dir>/hall_of_fame.csv` if already present
//! 3. the newest match of the configured glob pattern
//!
//! Anything outside the output directory is moved in. Finding nothing is an
//! `Error::ArtifactMissing` for the experiment.

mod command;
mod relocate;

pub use command::{BackendConfig, CommandBackend, DiscoveryManifest};
pub use relocate::{find_artifact, relocate_artifact};

use crate::bounds::ParameterBounds;
use crate::dataset::Dataset;
use crate::hall_of_fame::HALL_OF_FAME_FILE;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Search configuration passed verbatim to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Binary operators the search may use
    pub binary_operators: Vec<String>,
    /// Unary functions the search may use
    pub unary_operators: Vec<String>,
    /// Operator constraints, e.g. `^ -> (-1, 1)` bounds the exponent
    pub constraints: BTreeMap<String, (f64, f64)>,
    /// Seed for the search itself (independent of the split seed)
    pub seed: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            binary_operators: ["+", "-", "*", "/", "^"].map(String::from).to_vec(),
            unary_operators: ["exp", "log"].map(String::from).to_vec(),
            constraints: BTreeMap::from([("^".to_string(), (-1.0, 1.0))]),
            seed: 200,
        }
    }
}

/// Everything a backend needs for one search
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryRequest<'a> {
    /// Training rows
    pub train: &'a Dataset,
    /// Parameter columns, in binding order
    pub parameters: &'a [String],
    /// Response column
    pub target: &'a str,
    /// Search domain per parameter
    pub bounds: &'a ParameterBounds,
    /// Operator configuration
    pub options: &'a DiscoveryOptions,
    /// Directory where the hall of fame should end up
    pub output_dir: &'a Path,
}

/// What a backend reports after a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// Hall-of-fame location if the backend knows it
    pub artifact: Option<PathBuf>,
    /// Wall-clock time spent searching
    pub elapsed: Duration,
}

/// External symbolic-regression engine
///
/// Implementations block until the search finishes or fails.
pub trait DiscoveryBackend: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Run one search
    ///
    /// # Errors
    /// Returns error if the search cannot run or fails
    fn discover(&self, request: &DiscoveryRequest<'_>) -> Result<DiscoveryOutcome>;
}

/// Place the hall of fame at `<output_dir>/hall_of_fame.csv`
///
/// # Errors
/// Returns `Error::ArtifactMissing` if no candidate exists, or the
/// relocation error if the move fails
pub fn resolve_artifact(
    outcome: &DiscoveryOutcome,
    output_dir: &Path,
    pattern: Option<&str>,
) -> Result<PathBuf> {
    let dest = output_dir.join(HALL_OF_FAME_FILE);

    let reported = outcome.artifact.clone().filter(|p| p.is_file());
    let candidate = match reported {
        Some(path) => Some(path),
        None if dest.is_file() => Some(dest.clone()),
        None => match pattern {
            Some(pattern) => find_artifact(pattern)?,
            None => None,
        },
    };

    let Some(source) = candidate else {
        return Err(Error::ArtifactMissing(format!(
            "nothing at {}{}",
            dest.display(),
            pattern.map_or_else(String::new, |p| format!(" or matching {p}"))
        )));
    };

    if same_file(&source, &dest) {
        debug!(path = %dest.display(), "hall of fame already in place");
        return Ok(dest);
    }
    relocate_artifact(&source, output_dir)
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b
        || matches!(
            (a.canonicalize(), b.canonicalize()),
            (Ok(x), Ok(y)) if x == y
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_options_match_search_configuration() {
        let options = DiscoveryOptions::default();
        assert_eq!(options.binary_operators, vec!["+", "-", "*", "/", "^"]);
        assert_eq!(options.unary_operators, vec!["exp", "log"]);
        assert_eq!(options.constraints.get("^"), Some(&(-1.0, 1.0)));
        assert_eq!(options.seed, 200);
    }

    #[test]
    fn test_resolve_keeps_artifact_already_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join(HALL_OF_FAME_FILE);
        fs::write(&dest, "Complexity,Equation\n").unwrap();

        let path = resolve_artifact(&DiscoveryOutcome::default(), dir.path(), None).unwrap();
        assert_eq!(path, dest);
        assert!(dest.is_file());
    }

    #[test]
    fn test_resolve_moves_reported_artifact() {
        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let reported = scratch.path().join("hof.csv");
        fs::write(&reported, "Complexity,Equation\n").unwrap();

        let outcome = DiscoveryOutcome {
            artifact: Some(reported.clone()),
            elapsed: Duration::ZERO,
        };
        let path = resolve_artifact(&outcome, out.path(), None).unwrap();
        assert_eq!(path, out.path().join(HALL_OF_FAME_FILE));
        assert!(!reported.exists());
    }

    #[test]
    fn test_resolve_falls_back_to_pattern() {
        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let stray = scratch.path().join("run-1").join(HALL_OF_FAME_FILE);
        fs::create_dir_all(stray.parent().unwrap()).unwrap();
        fs::write(&stray, "Complexity,Equation\n").unwrap();

        let pattern = format!("{}/*/{HALL_OF_FAME_FILE}", scratch.path().display());
        let path =
            resolve_artifact(&DiscoveryOutcome::default(), out.path(), Some(&pattern)).unwrap();
        assert!(path.is_file());
        assert!(!stray.exists());
    }

    #[test]
    fn test_resolve_nothing_found_is_artifact_missing() {
        let out = tempfile::tempdir().unwrap();
        let err = resolve_artifact(&DiscoveryOutcome::default(), out.path(), None).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
        assert!(!out.path().join(HALL_OF_FAME_FILE).exists());
    }
}
