//! Batch sweep over seeds × parameter subsets
//!
//! The dataset is loaded once and shared by every experiment. Each
//! combination writes into its own `med_<seed>_<study>` directory, so
//! combinations are independent and may run on the rayon pool when the
//! `parallel` feature is enabled.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use tracing::{error, info, warn};

use super::config::{Combination, FailurePolicy, SweepConfig};
use super::metric_record::{MEAN_RELATIVE_ERROR, MEDIAN_RELATIVE_ERROR};
use super::orchestrator::run_experiment_on;
use super::report::REPORT_FILE;
use super::{ArtifactRecord, MetricRecord, RunRecord, RunStatus, SweepRecord, SweepReport};
use crate::dataset::Dataset;
use crate::discovery::DiscoveryBackend;
use crate::{Error, Result};

const BANNER_WIDTH: usize = 60;

/// Run every combination of `config` and persist the report
///
/// Failed experiments are recorded in the report; only setup problems
/// (invalid config, unreadable input, unwritable output root) are errors.
///
/// # Errors
/// Returns error if the config is invalid, the input cannot be loaded, or
/// the output root or report cannot be written
pub fn run_sweep(config: &SweepConfig, backend: &dyn DiscoveryBackend) -> Result<SweepReport> {
    config.validate()?;
    let combinations = config.combinations();
    for line in render_banner(config, combinations.len()).lines() {
        info!("{line}");
    }

    let dataset = Dataset::load(&config.input)?;
    std::fs::create_dir_all(&config.output_root)
        .map_err(|e| Error::io(format!("create {}", config.output_root.display()), e))?;

    let sweep = SweepRecord::builder(
        format!("sweep-{}", Utc::now().format("%Y%m%dT%H%M%S")),
        config.input.display().to_string(),
    )
    .config(serde_json::to_value(config)?)
    .build();

    let runner = Runner {
        dataset: &dataset,
        config,
        backend,
        sweep_id: sweep.sweep_id(),
        progress: Progress::new(combinations.len()),
        aborted: AtomicBool::new(false),
    };
    let results = runner.run_all(&combinations);

    let mut report = SweepReport::new(sweep);
    for result in results {
        report.add_run(result.run);
        result.metrics.into_iter().for_each(|m| report.add_metric(m));
        result.artifacts.into_iter().for_each(|a| report.add_artifact(a));
    }

    let path = config.output_root.join(REPORT_FILE);
    report.write_json(&path)?;
    info!(
        succeeded = report.count_with_status(RunStatus::Success),
        failed = report.count_with_status(RunStatus::Failed),
        skipped = report.count_with_status(RunStatus::Skipped),
        report = %path.display(),
        "sweep finished"
    );
    Ok(report)
}

/// Boxed summary of the batch, 60 columns wide
#[must_use]
pub fn render_banner(config: &SweepConfig, total: usize) -> String {
    let inner = BANNER_WIDTH - 4;
    let border = format!("+{}+", "-".repeat(BANNER_WIDTH - 2));
    let row = |text: String| format!("| {text:<inner$} |");

    let seeds: Vec<String> = config.seeds.iter().map(u64::to_string).collect();
    let studies: Vec<String> = config.studies.iter().map(|s| s.join("-")).collect();

    [
        border.clone(),
        format!("| {:^inner$} |", "MED REGRESSION BATCH"),
        border.clone(),
        row(format!("Total regressions: {total}")),
        row(format!("Seeds: {}", seeds.join(", "))),
        row(format!("Studies: {}", studies.join(", "))),
        row(format!("Input: {}", config.input.display())),
        border,
    ]
    .join("\n")
}

struct RunResult {
    run: RunRecord,
    metrics: Vec<MetricRecord>,
    artifacts: Vec<ArtifactRecord>,
}

struct Progress {
    done: AtomicUsize,
    total: usize,
}

impl Progress {
    const fn new(total: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish_one(&self) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = 100.0 * done as f64 / self.total.max(1) as f64;
        info!("Finished regression {done} out of {} ({percent:.2}%)", self.total);
    }
}

struct Runner<'a> {
    dataset: &'a Dataset,
    config: &'a SweepConfig,
    backend: &'a dyn DiscoveryBackend,
    sweep_id: &'a str,
    progress: Progress,
    aborted: AtomicBool,
}

impl Runner<'_> {
    fn run_all(&self, combinations: &[Combination]) -> Vec<RunResult> {
        if self.config.parallel {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                return combinations.par_iter().map(|c| self.run_one(c)).collect();
            }
            #[cfg(not(feature = "parallel"))]
            {
                warn!("parallel sweep requested without the `parallel` feature; running sequentially");
            }
        }
        combinations.iter().map(|c| self.run_one(c)).collect()
    }

    fn run_one(&self, combination: &Combination) -> RunResult {
        let experiment = self.config.experiment(combination);
        let mut run = RunRecord::new(
            combination.run_id(),
            self.sweep_id,
            combination.seed,
            combination.parameters.clone(),
            experiment.output_dir.clone(),
        );

        if self.aborted.load(Ordering::SeqCst) {
            run.complete(RunStatus::Skipped);
            return RunResult {
                run,
                metrics: Vec::new(),
                artifacts: Vec::new(),
            };
        }

        run.start();
        let mut metrics = Vec::new();
        let mut artifacts = Vec::new();
        match run_experiment_on(self.dataset, &experiment, self.backend) {
            Ok(outcome) => {
                for summary in outcome.summary.iter().filter(|s| s.finite_rows > 0) {
                    metrics.push(MetricRecord::new(
                        run.run_id(),
                        MEDIAN_RELATIVE_ERROR,
                        summary.complexity,
                        summary.median,
                    ));
                    metrics.push(MetricRecord::new(
                        run.run_id(),
                        MEAN_RELATIVE_ERROR,
                        summary.complexity,
                        summary.mean,
                    ));
                }
                artifacts.extend(
                    [&outcome.hall_of_fame, &outcome.results]
                        .into_iter()
                        .filter_map(|path| ArtifactRecord::from_file(run.run_id(), path)),
                );
                run.complete(RunStatus::Success);
            }
            Err(e) => {
                error!(run_id = run.run_id(), error = %e, "experiment failed");
                run.fail(e.to_string());
                if self.config.on_failure == FailurePolicy::Abort {
                    warn!("aborting sweep after failed experiment");
                    self.aborted.store(true, Ordering::SeqCst);
                }
            }
        }
        self.progress.finish_one();

        RunResult {
            run,
            metrics,
            artifacts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_rows_have_fixed_width() {
        let config = SweepConfig::new(
            "data.csv",
            vec![88, 92],
            vec![vec!["param1".into(), "param2".into()], vec!["param1".into()]],
        );
        let banner = render_banner(&config, 4);
        let lines: Vec<&str> = banner.lines().collect();

        assert_eq!(lines.len(), 8);
        assert!(lines.iter().all(|l| l.len() == BANNER_WIDTH));
        assert!(lines[1].contains("MED REGRESSION BATCH"));
        assert!(lines[3].contains("Total regressions: 4"));
        assert!(lines[4].contains("Seeds: 88, 92"));
        assert!(lines[5].contains("Studies: param1-param2, param1"));
    }

    #[test]
    fn test_progress_counts_up() {
        let progress = Progress::new(3);
        progress.finish_one();
        progress.finish_one();
        assert_eq!(progress.done.load(Ordering::SeqCst), 2);
    }
}
