//! Discovery backend that runs an external program
//!
//! The program receives one extra argument: the path of a JSON manifest
//! ([`DiscoveryManifest`]) describing the search. Training rows are written
//! next to it as `train.csv`. The program is expected to write its hall of
//! fame to the manifest's `hall_of_fame` path; if it writes elsewhere, the
//! adapter's artifact pattern picks it up.
//!
//! Standard output and error go to `discovery.stdout.log` and
//! `discovery.stderr.log` in the output directory.

use super::{DiscoveryBackend, DiscoveryOutcome, DiscoveryRequest};
use crate::hall_of_fame::HALL_OF_FAME_FILE;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use wait_timeout::ChildExt;

/// Training rows handed to the backend
pub const TRAIN_FILE: &str = "train.csv";

/// Search manifest handed to the backend
pub const MANIFEST_FILE: &str = "discovery.json";

const STDOUT_LOG: &str = "discovery.stdout.log";
const STDERR_LOG: &str = "discovery.stderr.log";
const STDERR_TAIL_LINES: usize = 20;

/// Configuration for [`CommandBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments placed before the manifest path
    pub args: Vec<String>,
    /// Kill the search after this many seconds (0 = no limit)
    pub timeout_secs: u64,
    /// Working directory for the process
    pub working_dir: Option<PathBuf>,
    /// Glob for hall-of-fame files written outside the output directory
    pub artifact_pattern: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::new(),
            args: Vec::new(),
            timeout_secs: 3600,
            working_dir: None,
            artifact_pattern: None,
        }
    }
}

impl BackendConfig {
    /// Create a config for `program`
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Set the arguments placed before the manifest path
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Set the glob used to find misplaced artifacts
    #[must_use]
    pub fn with_artifact_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.artifact_pattern = Some(pattern.into());
        self
    }

    /// Timeout, or `None` for no limit
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

/// JSON manifest describing one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryManifest {
    /// Parameter names, in binding order
    pub parameters: Vec<String>,
    /// Per-parameter minimum over the full dataset
    pub minimums: Vec<f64>,
    /// Per-parameter maximum over the full dataset
    pub maximums: Vec<f64>,
    /// Response column
    pub response: String,
    /// Search seed
    pub seed: u64,
    /// Allowed binary operators
    pub binary_operators: Vec<String>,
    /// Allowed unary functions
    pub unary_operators: Vec<String>,
    /// Operator constraints
    pub constraints: BTreeMap<String, (f64, f64)>,
    /// Training rows (parameters and response only)
    pub train_csv: PathBuf,
    /// Directory the backend may use for its own state
    pub output_dir: PathBuf,
    /// Where the hall of fame should be written
    pub hall_of_fame: PathBuf,
}

impl DiscoveryManifest {
    /// Describe `request`, with files placed under its output directory
    #[must_use]
    pub fn from_request(request: &DiscoveryRequest<'_>) -> Self {
        Self {
            parameters: request.parameters.to_vec(),
            minimums: request.bounds.minimums(),
            maximums: request.bounds.maximums(),
            response: request.target.to_string(),
            seed: request.options.seed,
            binary_operators: request.options.binary_operators.clone(),
            unary_operators: request.options.unary_operators.clone(),
            constraints: request.options.constraints.clone(),
            train_csv: request.output_dir.join(TRAIN_FILE),
            output_dir: request.output_dir.to_path_buf(),
            hall_of_fame: request.output_dir.join(HALL_OF_FAME_FILE),
        }
    }
}

/// Backend that shells out to an external search program
#[derive(Debug, Clone)]
pub struct CommandBackend {
    config: BackendConfig,
    name: String,
}

impl CommandBackend {
    /// Create a backend from `config`
    ///
    /// # Errors
    /// Returns `Error::Config` if no program is configured
    pub fn new(config: BackendConfig) -> Result<Self> {
        if config.program.as_os_str().is_empty() {
            return Err(Error::Config(
                "discovery backend program is not set".to_string(),
            ));
        }
        let name = config
            .program
            .file_name()
            .map_or_else(|| "command".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { config, name })
    }

    /// Backend configuration
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn write_inputs(&self, request: &DiscoveryRequest<'_>) -> Result<PathBuf> {
        let output_dir = request.output_dir;
        fs::create_dir_all(output_dir)
            .map_err(|e| Error::io(format!("create {}", output_dir.display()), e))?;

        let manifest = DiscoveryManifest::from_request(request);

        let mut columns: Vec<&str> = request.parameters.iter().map(String::as_str).collect();
        columns.push(request.target);
        request.train.select(columns.as_slice())?.write_csv(&manifest.train_csv)?;

        let manifest_path = output_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&manifest_path, json)
            .map_err(|e| Error::io(format!("write {}", manifest_path.display()), e))?;

        debug!(backend = %self.name, manifest = %manifest_path.display(), "wrote discovery inputs");
        Ok(manifest_path)
    }

    fn run(&self, manifest_path: &Path, output_dir: &Path) -> Result<()> {
        let log = |name: &str| {
            let path = output_dir.join(name);
            File::create(&path).map_err(|e| Error::io(format!("create {}", path.display()), e))
        };

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(manifest_path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log(STDOUT_LOG)?))
            .stderr(Stdio::from(log(STDERR_LOG)?));
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::Backend(format!(
                "failed to start {}: {e}",
                self.config.program.display()
            ))
        })?;

        let status = match self.config.timeout() {
            None => child
                .wait()
                .map_err(|e| Error::io(format!("wait for {}", self.name), e))?,
            Some(timeout) => match child
                .wait_timeout(timeout)
                .map_err(|e| Error::io(format!("wait for {}", self.name), e))?
            {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::BackendTimeout(timeout));
                }
            },
        };

        if status.success() {
            Ok(())
        } else {
            Err(Error::Backend(format!(
                "{} exited with {status}\n{}",
                self.name,
                stderr_tail(&output_dir.join(STDERR_LOG))
            )))
        }
    }
}

impl DiscoveryBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn discover(&self, request: &DiscoveryRequest<'_>) -> Result<DiscoveryOutcome> {
        let start = Instant::now();
        let manifest_path = self.write_inputs(request)?;

        info!(
            backend = %self.name,
            rows = request.train.num_rows(),
            parameters = ?request.parameters,
            "starting equation discovery"
        );
        self.run(&manifest_path, request.output_dir)?;

        let expected = request.output_dir.join(HALL_OF_FAME_FILE);
        let elapsed = start.elapsed();
        info!(backend = %self.name, ?elapsed, "equation discovery finished");

        Ok(DiscoveryOutcome {
            artifact: expected.is_file().then_some(expected),
            elapsed,
        })
    }
}

fn stderr_tail(path: &Path) -> String {
    let text = fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bounds::ParameterBounds;
    use crate::dataset::Dataset;
    use crate::discovery::DiscoveryOptions;
    use arrow::array::{Float64Array, RecordBatch};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn train() -> Dataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("x", DataType::Float64, false),
            Field::new("noise", DataType::Float64, false),
            Field::new("y", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![1.0, 2.0])),
                Arc::new(Float64Array::from(vec![0.1, 0.2])),
                Arc::new(Float64Array::from(vec![3.0, 5.0])),
            ],
        )
        .unwrap();
        Dataset::new(batch)
    }

    fn script(dir: &Path, body: &str) -> BackendConfig {
        let path = dir.join("backend.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        BackendConfig::new("/bin/sh").with_args(vec![path.display().to_string()])
    }

    fn run_backend(config: BackendConfig, out: &Path) -> Result<DiscoveryOutcome> {
        let data = train();
        let parameters = vec!["x".to_string()];
        let bounds = ParameterBounds::from_dataset(&data, &parameters).unwrap();
        let options = DiscoveryOptions::default();
        let request = DiscoveryRequest {
            train: &data,
            parameters: &parameters,
            target: "y",
            bounds: &bounds,
            options: &options,
            output_dir: out,
        };
        CommandBackend::new(config)?.discover(&request)
    }

    #[test]
    fn test_manifest_and_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        // the manifest is the last argument; the script writes the table next to it
        let config = script(
            dir.path(),
            "d=$(dirname \"$1\")\nprintf 'Complexity,Equation\\n1,2*x + 1\\n' > \"$d/hall_of_fame.csv\"",
        );

        let outcome = run_backend(config, &out).unwrap();
        assert_eq!(outcome.artifact, Some(out.join(HALL_OF_FAME_FILE)));

        let manifest: DiscoveryManifest =
            serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(manifest.parameters, vec!["x"]);
        assert_eq!(manifest.minimums, vec![1.0]);
        assert_eq!(manifest.maximums, vec![2.0]);
        assert_eq!(manifest.response, "y");

        let written = Dataset::load_csv(out.join(TRAIN_FILE)).unwrap();
        assert_eq!(written.column_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let config = script(dir.path(), "echo 'search exploded' >&2\nexit 3");
        let err = run_backend(config, &dir.path().join("out")).unwrap_err();
        match err {
            Error::Backend(message) => assert!(message.contains("search exploded")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timeout_kills_search() {
        let dir = tempfile::tempdir().unwrap();
        let config = script(dir.path(), "sleep 5").with_timeout(Duration::from_secs(1));
        let err = run_backend(config, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::BackendTimeout(_)));
    }

    #[test]
    fn test_missing_program_is_config_error() {
        assert!(matches!(
            CommandBackend::new(BackendConfig::default()),
            Err(Error::Config(_))
        ));
    }
}
