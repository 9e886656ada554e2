//! Metric Record - per-complexity error statistics of a run

use serde::{Deserialize, Serialize};

/// Metric key for the median relative error on unseen data
pub const MEDIAN_RELATIVE_ERROR: &str = "median_relative_error";

/// Metric key for the mean relative error on unseen data
pub const MEAN_RELATIVE_ERROR: &str = "mean_relative_error";

/// Metric Record represents one statistic of one equation.
///
/// Metrics are keyed by `run_id` + `key`, with the equation complexity as
/// the step, so a run's accuracy-versus-simplicity curve is
/// `metrics_for_run(run_id, key)` ordered by step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    run_id: String,
    key: String,
    complexity: i64,
    value: f64,
}

impl MetricRecord {
    /// Create a new metric record.
    ///
    /// # Arguments
    ///
    /// * `run_id` - ID of the parent run
    /// * `key` - Metric name (e.g., [`MEDIAN_RELATIVE_ERROR`])
    /// * `complexity` - Complexity of the equation measured
    /// * `value` - Metric value
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        key: impl Into<String>,
        complexity: i64,
        value: f64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            key: key.into(),
            complexity,
            value,
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the metric key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the complexity (the metric's step).
    #[must_use]
    pub const fn complexity(&self) -> i64 {
        self.complexity
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }
}
