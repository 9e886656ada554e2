//! Sweep Report - collected run tracking data of one sweep
//!
//! The report is kept in memory while the sweep runs and persisted as
//! `sweep_report.json` in the output root when it finishes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ArtifactRecord, MetricRecord, RunRecord, RunStatus, SweepRecord};
use crate::{Error, Result};

/// File name of the persisted report inside the sweep output root
pub const REPORT_FILE: &str = "sweep_report.json";

/// Runs, metrics and artifacts of one sweep.
///
/// Runs are kept in combination order (seed-major), so the report reads in
/// the same order the sweep logged its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    sweep: SweepRecord,
    runs: Vec<RunRecord>,
    metrics: Vec<MetricRecord>,
    artifacts: Vec<ArtifactRecord>,
}

impl SweepReport {
    /// Create an empty report for `sweep`.
    #[must_use]
    pub const fn new(sweep: SweepRecord) -> Self {
        Self {
            sweep,
            runs: Vec::new(),
            metrics: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Get the sweep record.
    #[must_use]
    pub const fn sweep(&self) -> &SweepRecord {
        &self.sweep
    }

    /// Get all runs in combination order.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Get all metrics.
    #[must_use]
    pub fn metrics(&self) -> &[MetricRecord] {
        &self.metrics
    }

    /// Get all artifacts.
    #[must_use]
    pub fn artifacts(&self) -> &[ArtifactRecord] {
        &self.artifacts
    }

    /// Add a run to the report.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.push(run);
    }

    /// Add a metric to the report.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Add an artifact to the report.
    pub fn add_artifact(&mut self, artifact: ArtifactRecord) {
        self.artifacts.push(artifact);
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.iter().find(|run| run.run_id() == run_id)
    }

    /// Number of runs that ended with `status`.
    #[must_use]
    pub fn count_with_status(&self, status: RunStatus) -> usize {
        self.runs.iter().filter(|run| run.status() == status).count()
    }

    /// Get metrics for a specific run and key, ordered by complexity.
    ///
    /// This is the accuracy-versus-simplicity curve of one run.
    ///
    /// ```rust
    /// use med_sweep::experiment::{MetricRecord, SweepRecord, SweepReport};
    ///
    /// let mut report = SweepReport::new(SweepRecord::new("sweep-1", "data.csv"));
    /// for complexity in [5, 1, 3] {
    ///     report.add_metric(MetricRecord::new("run-1", "median", complexity, 1.0));
    /// }
    ///
    /// let curve = report.metrics_for_run("run-1", "median");
    /// let steps: Vec<i64> = curve.iter().map(MetricRecord::complexity).collect();
    /// assert_eq!(steps, vec![1, 3, 5]);
    /// ```
    #[must_use]
    pub fn metrics_for_run(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .iter()
            .filter(|m| m.run_id() == run_id && m.key() == key)
            .cloned()
            .collect();

        metrics.sort_by_key(MetricRecord::complexity);

        metrics
    }

    /// Get artifacts recorded for a run.
    #[must_use]
    pub fn artifacts_for_run(&self, run_id: &str) -> Vec<&ArtifactRecord> {
        self.artifacts
            .iter()
            .filter(|a| a.run_id() == run_id)
            .collect()
    }

    /// Write the report as pretty JSON.
    ///
    /// # Errors
    /// Returns error if serialization or the file write fails
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::io(path.display().to_string(), e))
    }

    /// Read a report written by [`SweepReport::write_json`].
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a report
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> SweepReport {
        SweepReport::new(SweepRecord::new("sweep-1", "data.csv"))
    }

    fn run(id: &str, status: RunStatus) -> RunRecord {
        let mut run = RunRecord::new(id, "sweep-1", 88, vec!["a".into()], format!("out/{id}"));
        run.start();
        run.complete(status);
        run
    }

    #[test]
    fn test_report_counts_by_status() {
        let mut report = report();
        report.add_run(run("r1", RunStatus::Success));
        report.add_run(run("r2", RunStatus::Failed));
        report.add_run(run("r3", RunStatus::Success));

        assert_eq!(report.count_with_status(RunStatus::Success), 2);
        assert_eq!(report.count_with_status(RunStatus::Failed), 1);
        assert_eq!(report.count_with_status(RunStatus::Skipped), 0);
        assert_eq!(report.get_run("r2").unwrap().status(), RunStatus::Failed);
        assert!(report.get_run("r9").is_none());
    }

    #[test]
    fn test_metrics_filtered_by_run_and_key() {
        let mut report = report();
        report.add_metric(MetricRecord::new("r1", "median", 3, 0.3));
        report.add_metric(MetricRecord::new("r1", "mean", 3, 0.4));
        report.add_metric(MetricRecord::new("r2", "median", 1, 0.1));
        report.add_metric(MetricRecord::new("r1", "median", 1, 0.5));

        let curve = report.metrics_for_run("r1", "median");
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].complexity(), 1);
        assert_eq!(curve[1].complexity(), 3);
    }

    #[test]
    fn test_report_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE);

        let mut report = report();
        report.add_run(run("r1", RunStatus::Success));
        report.add_metric(MetricRecord::new("r1", "median", 1, 0.0));
        report.add_artifact(ArtifactRecord::new(
            "r1",
            "med_unseen.csv",
            "out/r1/med_unseen.csv",
            10,
        ));
        report.write_json(&path).unwrap();

        let loaded = SweepReport::read_json(&path).unwrap();
        assert_eq!(loaded, report);
        assert_eq!(loaded.artifacts_for_run("r1").len(), 1);
    }
}
