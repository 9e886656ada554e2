//! Experiment and sweep configuration
//!
//! A sweep is described by a TOML file:
//!
//! ```toml
//! input = "data/simulations.csv"
//! target = "target_col"
//! output_root = "med_post"
//! seeds = [88, 92, 96]
//! studies = [["param1", "param2"], ["param1"]]
//! train_fraction = 0.7
//! on_failure = "continue"
//!
//! [discovery]
//! unary_operators = ["exp", "log"]
//!
//! [backend]
//! program = "./run_search.sh"
//! timeout_secs = 1800
//! ```

use crate::discovery::{BackendConfig, DiscoveryOptions};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default split seed for a single experiment
pub const DEFAULT_SEED: u64 = 100;

/// Default fraction of rows used for training
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;

/// Default response column of a sweep
pub const DEFAULT_TARGET: &str = "target_col";

/// Default root directory of sweep outputs
pub const DEFAULT_OUTPUT_ROOT: &str = "med_post";

const fn default_seed() -> u64 {
    DEFAULT_SEED
}

const fn default_train_fraction() -> f64 {
    DEFAULT_TRAIN_FRACTION
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_ROOT)
}

/// What a sweep does after an experiment fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and run the remaining combinations
    #[default]
    Continue,
    /// Stop at the first failure; remaining runs are marked skipped
    Abort,
}

/// One experiment: a single (seed, parameter subset) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// CSV or Parquet dataset
    pub input: PathBuf,
    /// Independent variables, in binding order
    pub parameters: Vec<String>,
    /// Response column
    pub target: String,
    /// Directory receiving the hall of fame and results
    pub output_dir: PathBuf,
    /// Train/test split seed
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fraction of rows used for training
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
    /// Search configuration handed to the backend
    #[serde(default)]
    pub discovery: DiscoveryOptions,
    /// Glob for hall-of-fame files the backend leaves elsewhere
    #[serde(default)]
    pub artifact_pattern: Option<String>,
}

impl ExperimentConfig {
    /// Create a config with default seed, fraction and search options
    #[must_use]
    pub fn new(
        input: impl Into<PathBuf>,
        parameters: Vec<String>,
        target: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            parameters,
            target: target.into(),
            output_dir: output_dir.into(),
            seed: DEFAULT_SEED,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            discovery: DiscoveryOptions::default(),
            artifact_pattern: None,
        }
    }

    /// Set the split seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the training fraction
    #[must_use]
    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    /// Set the search options
    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryOptions) -> Self {
        self.discovery = discovery;
        self
    }

    /// Set the glob used to find a misplaced hall of fame
    #[must_use]
    pub fn with_artifact_pattern(mut self, pattern: Option<String>) -> Self {
        self.artifact_pattern = pattern;
        self
    }
}

/// One cell of the seeds × studies grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    /// Zero-based position in the sweep
    pub index: usize,
    /// Split seed
    pub seed: u64,
    /// Parameter subset
    pub parameters: Vec<String>,
}

impl Combination {
    /// Parameters joined with `-`, e.g. `param1-param2`
    #[must_use]
    pub fn study_label(&self) -> String {
        self.parameters.join("-")
    }

    /// Identifier and output directory name: `med_<seed>_<study>`
    #[must_use]
    pub fn run_id(&self) -> String {
        format!("med_{}_{}", self.seed, self.study_label())
    }
}

/// Batch of experiments over seeds and parameter subsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// CSV or Parquet dataset shared by every experiment
    pub input: PathBuf,
    /// Response column
    #[serde(default = "default_target")]
    pub target: String,
    /// Parent of the per-experiment output directories
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Split seeds
    pub seeds: Vec<u64>,
    /// Parameter subsets
    pub studies: Vec<Vec<String>>,
    /// Fraction of rows used for training
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
    /// Run at most this many combinations
    #[serde(default)]
    pub max_runs: Option<usize>,
    /// Behaviour after a failed experiment
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Run combinations concurrently (needs the `parallel` feature)
    #[serde(default)]
    pub parallel: bool,
    /// Search options shared by every experiment
    #[serde(default)]
    pub discovery: DiscoveryOptions,
    /// External backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
}

impl SweepConfig {
    /// Create a sweep with defaults for everything but the grid
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, seeds: Vec<u64>, studies: Vec<Vec<String>>) -> Self {
        Self {
            input: input.into(),
            target: default_target(),
            output_root: default_output_root(),
            seeds,
            studies,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            max_runs: None,
            on_failure: FailurePolicy::default(),
            parallel: false,
            discovery: DiscoveryOptions::default(),
            backend: BackendConfig::default(),
        }
    }

    /// Parse a sweep from TOML text
    ///
    /// # Errors
    /// Returns `Error::Config` if the text is not a valid sweep
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a sweep TOML file
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, `Error::Config` if it
    /// is not a valid sweep
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        Self::from_toml_str(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Check the grid is non-empty and the fraction is usable
    ///
    /// Concurrent runs cannot share an artifact pattern: the newest match of
    /// one run's pattern may belong to another run still in flight.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.seeds.is_empty() {
            return Err(Error::Config("no seeds given".to_string()));
        }
        if self.studies.is_empty() {
            return Err(Error::Config("no studies given".to_string()));
        }
        if let Some(i) = self.studies.iter().position(Vec::is_empty) {
            return Err(Error::Config(format!("study {i} has no parameters")));
        }
        if !(0.0..=1.0).contains(&self.train_fraction) {
            return Err(Error::Config(format!(
                "train_fraction must be within [0, 1], got {}",
                self.train_fraction
            )));
        }
        if self.parallel {
            if let Some(pattern) = &self.backend.artifact_pattern {
                return Err(Error::Config(format!(
                    "parallel sweeps cannot relocate artifacts by pattern ({pattern:?}); \
                     set parallel = false or have the backend write to its output directory"
                )));
            }
        }
        Ok(())
    }

    /// Cartesian product seeds × studies, seed-major, truncated to `max_runs`
    #[must_use]
    pub fn combinations(&self) -> Vec<Combination> {
        let all = self.seeds.iter().flat_map(|&seed| {
            self.studies.iter().map(move |study| (seed, study.clone()))
        });
        all.take(self.max_runs.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(index, (seed, parameters))| Combination {
                index,
                seed,
                parameters,
            })
            .collect()
    }

    /// Single-experiment config for one combination
    #[must_use]
    pub fn experiment(&self, combination: &Combination) -> ExperimentConfig {
        ExperimentConfig::new(
            self.input.clone(),
            combination.parameters.clone(),
            self.target.clone(),
            self.output_root.join(combination.run_id()),
        )
        .with_seed(combination.seed)
        .with_train_fraction(self.train_fraction)
        .with_discovery(self.discovery.clone())
        .with_artifact_pattern(self.backend.artifact_pattern.clone())
    }
}
