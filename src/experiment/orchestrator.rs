//! Single-experiment pipeline
//!
//! load → validate → bounds → split → discover → resolve artifact →
//! evaluate → write `<output_dir>/med_unseen.csv`

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, info_span};

use super::config::ExperimentConfig;
use crate::bounds::ParameterBounds;
use crate::dataset::Dataset;
use crate::discovery::{
    resolve_artifact, DiscoveryBackend, DiscoveryOptions, DiscoveryOutcome, DiscoveryRequest,
};
use crate::evaluate::{evaluate, ComplexitySummary, ResultTable, SkippedEquation, RESULTS_FILE};
use crate::hall_of_fame::{HallOfFame, HALL_OF_FAME_FILE};
use crate::split::{split, Split};
use crate::{Error, Result};

/// Validated experiment over a borrowed dataset
#[derive(Debug, Clone)]
pub struct Experiment<'a> {
    dataset: &'a Dataset,
    parameters: Vec<String>,
    target: String,
    output_dir: PathBuf,
}

/// Split and bounds computed before discovery
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Train/test partitions
    pub split: Split,
    /// Per-parameter domain over the whole dataset
    pub bounds: ParameterBounds,
}

/// What one experiment produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentOutcome {
    /// Directory holding every file of the experiment
    pub output_dir: PathBuf,
    /// Relocated hall of fame
    pub hall_of_fame: PathBuf,
    /// Written result table
    pub results: PathBuf,
    /// Rows given to discovery
    pub train_rows: usize,
    /// Rows the equations were scored on
    pub test_rows: usize,
    /// Time the backend spent searching
    pub discovery_time: Duration,
    /// Median and mean error per complexity
    pub summary: Vec<ComplexitySummary>,
    /// Equations that did not compile
    pub skipped: Vec<SkippedEquation>,
}

impl<'a> Experiment<'a> {
    /// Validate parameters and target against `dataset`
    ///
    /// # Errors
    /// - `Error::Validation` listing every absent parameter or target column
    ///   (also for an empty parameter list)
    /// - `Error::InvalidInput` for a repeated parameter or a target that is
    ///   also a parameter
    pub fn new<S: AsRef<str>>(
        dataset: &'a Dataset,
        parameters: &[S],
        target: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let parameters: Vec<String> = parameters.iter().map(|p| p.as_ref().to_string()).collect();
        if parameters.is_empty() {
            return Err(Error::Validation {
                missing: vec!["<at least one parameter>".to_string()],
                available: dataset.column_names(),
            });
        }

        let mut requested = parameters.clone();
        requested.push(target.to_string());
        dataset.require_columns(requested.as_slice())?;

        let mut seen = HashSet::new();
        if let Some(dup) = parameters.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(Error::InvalidInput(format!("parameter {dup:?} listed twice")));
        }
        if seen.contains(target) {
            return Err(Error::InvalidInput(format!(
                "target {target:?} is also a parameter"
            )));
        }

        Ok(Self {
            dataset,
            parameters,
            target: target.to_string(),
            output_dir: output_dir.into(),
        })
    }

    /// Parameter names in binding order
    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Response column
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Compute bounds on the full dataset and split it
    ///
    /// # Errors
    /// Returns error if a parameter is not numeric or the fraction is invalid
    pub fn prepare(&self, train_fraction: f64, seed: u64) -> Result<PreparedData> {
        let bounds = ParameterBounds::from_dataset(self.dataset, self.parameters.as_slice())?;
        let split = split(self.dataset, train_fraction, seed)?;
        info!(
            train_rows = split.train.num_rows(),
            test_rows = split.test.num_rows(),
            seed,
            "split dataset"
        );
        Ok(PreparedData { split, bounds })
    }

    /// Run the backend on the training rows and place the hall of fame
    ///
    /// Any `hall_of_fame.csv` or `med_unseen.csv` left in the output
    /// directory by an earlier run is removed first, so only a table written
    /// by this search can be scored. The returned outcome's `artifact` is
    /// the relocated hall of fame.
    ///
    /// # Errors
    /// Returns the backend's error, `Error::ArtifactMissing` if no hall of
    /// fame can be found, or a relocation error
    pub fn discover(
        &self,
        backend: &dyn DiscoveryBackend,
        prepared: &PreparedData,
        options: &DiscoveryOptions,
        artifact_pattern: Option<&str>,
    ) -> Result<DiscoveryOutcome> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| Error::io(format!("create {}", self.output_dir.display()), e))?;
        self.clear_previous_outputs()?;

        let request = DiscoveryRequest {
            train: &prepared.split.train,
            parameters: &self.parameters,
            target: &self.target,
            bounds: &prepared.bounds,
            options,
            output_dir: &self.output_dir,
        };
        let outcome = backend.discover(&request)?;
        let artifact = resolve_artifact(&outcome, &self.output_dir, artifact_pattern)?;

        Ok(DiscoveryOutcome {
            artifact: Some(artifact),
            elapsed: outcome.elapsed,
        })
    }

    fn clear_previous_outputs(&self) -> Result<()> {
        for name in [HALL_OF_FAME_FILE, RESULTS_FILE] {
            let path = self.output_dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed output of a previous run"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(format!("remove {}", path.display()), e)),
            }
        }
        Ok(())
    }

    /// Score the hall of fame in the output directory against `test`
    ///
    /// # Errors
    /// Returns `Error::ArtifactMissing` if the hall of fame is absent, or
    /// any evaluation error
    pub fn evaluate(&self, test: &Dataset) -> Result<ResultTable> {
        let hall_of_fame = HallOfFame::load(self.output_dir.join(HALL_OF_FAME_FILE))?;
        evaluate(test, &hall_of_fame, self.parameters.as_slice(), &self.target)
    }
}

/// Load the input and run one experiment
///
/// # Errors
/// Returns the first error of any pipeline stage
pub fn run_experiment(
    config: &ExperimentConfig,
    backend: &dyn DiscoveryBackend,
) -> Result<ExperimentOutcome> {
    let dataset = Dataset::load(&config.input)?;
    run_experiment_on(&dataset, config, backend)
}

/// Run one experiment on an already loaded dataset
///
/// # Errors
/// Returns the first error of any pipeline stage
pub fn run_experiment_on(
    dataset: &Dataset,
    config: &ExperimentConfig,
    backend: &dyn DiscoveryBackend,
) -> Result<ExperimentOutcome> {
    let span = info_span!(
        "experiment",
        seed = config.seed,
        study = %config.parameters.join("-"),
        backend = backend.name()
    );
    let _guard = span.enter();

    let experiment = Experiment::new(
        dataset,
        config.parameters.as_slice(),
        &config.target,
        config.output_dir.clone(),
    )?;
    let prepared = experiment.prepare(config.train_fraction, config.seed)?;
    let discovery = experiment.discover(
        backend,
        &prepared,
        &config.discovery,
        config.artifact_pattern.as_deref(),
    )?;
    let table = experiment.evaluate(&prepared.split.test)?;

    let results = experiment.output_dir().join(RESULTS_FILE);
    table.write_csv(&results)?;
    info!(
        path = %results.display(),
        equations = table.error_column_names().len(),
        skipped = table.skipped().len(),
        "wrote results"
    );

    Ok(ExperimentOutcome {
        output_dir: experiment.output_dir().to_path_buf(),
        hall_of_fame: discovery
            .artifact
            .unwrap_or_else(|| experiment.output_dir().join(HALL_OF_FAME_FILE)),
        results,
        train_rows: prepared.split.train.num_rows(),
        test_rows: prepared.split.test.num_rows(),
        discovery_time: discovery.elapsed,
        summary: table.summary(),
        skipped: table.skipped().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hall_of_fame::EquationRecord;
    use arrow::array::{Float64Array, RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    struct FixedBackend(Vec<EquationRecord>);

    impl DiscoveryBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn discover(&self, request: &DiscoveryRequest<'_>) -> Result<DiscoveryOutcome> {
            HallOfFame::from_records(self.0.clone())
                .write_csv(request.output_dir.join(HALL_OF_FAME_FILE))?;
            Ok(DiscoveryOutcome::default())
        }
    }

    struct SilentBackend;

    impl DiscoveryBackend for SilentBackend {
        fn name(&self) -> &str {
            "silent"
        }

        fn discover(&self, _request: &DiscoveryRequest<'_>) -> Result<DiscoveryOutcome> {
            Ok(DiscoveryOutcome::default())
        }
    }

    fn dataset() -> Dataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("x", DataType::Float64, false),
            Field::new("label", DataType::Utf8, false),
            Field::new("y", DataType::Float64, false),
        ]));
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let label: Vec<String> = (0..10).map(|i| format!("row{i}")).collect();
        Dataset::new(
            RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(Float64Array::from(x)),
                    Arc::new(StringArray::from(label)),
                    Arc::new(Float64Array::from(y)),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_new_reports_all_missing_columns() {
        let data = dataset();
        let err = Experiment::new(&data, &["x", "z"], "w", "out").unwrap_err();
        match err {
            Error::Validation { missing, .. } => assert_eq!(missing, vec!["z", "w"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_new_rejects_bad_parameter_lists() {
        let data = dataset();
        let empty: [&str; 0] = [];
        assert!(matches!(
            Experiment::new(&data, &empty, "y", "out"),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            Experiment::new(&data, &["x", "x"], "y", "out"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Experiment::new(&data, &["x", "y"], "y", "out"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_prepare_rejects_text_parameter() {
        let data = dataset();
        let experiment = Experiment::new(&data, &["label"], "y", "out").unwrap();
        assert!(experiment.prepare(0.7, 1).is_err());
    }

    #[test]
    fn test_run_writes_zero_errors_for_exact_equation() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExperimentConfig::new(
            "unused.csv",
            vec!["x".to_string()],
            "y",
            dir.path().join("med_100_x"),
        );
        let backend = FixedBackend(vec![EquationRecord::new("2*x + 1", 1)]);

        let outcome = run_experiment_on(&dataset(), &config, &backend).unwrap();

        assert_eq!(outcome.train_rows, 7);
        assert_eq!(outcome.test_rows, 3);
        assert!(outcome.results.is_file());
        assert_eq!(outcome.hall_of_fame, config.output_dir.join(HALL_OF_FAME_FILE));
        assert_eq!(outcome.summary.len(), 1);
        assert!(outcome.summary[0].median.abs() < 1e-12);
        assert_eq!(outcome.summary[0].finite_rows, 3);
    }

    #[test]
    fn test_run_without_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExperimentConfig::new("unused.csv", vec!["x".to_string()], "y", dir.path());
        let err = run_experiment_on(&dataset(), &config, &SilentBackend).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
        assert!(!dir.path().join(RESULTS_FILE).exists());
    }

    #[test]
    fn test_rerun_does_not_score_previous_hall_of_fame() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExperimentConfig::new("unused.csv", vec!["x".to_string()], "y", dir.path());
        let data = dataset();

        let backend = FixedBackend(vec![EquationRecord::new("2*x + 1", 1)]);
        run_experiment_on(&data, &config, &backend).unwrap();
        assert!(dir.path().join(HALL_OF_FAME_FILE).is_file());

        let err = run_experiment_on(&data, &config, &SilentBackend).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
        assert!(!dir.path().join(HALL_OF_FAME_FILE).exists());
        assert!(!dir.path().join(RESULTS_FILE).exists());
    }
}
