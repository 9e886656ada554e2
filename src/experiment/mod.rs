//! Experiment orchestration and run tracking
//!
//! An experiment is one (seed, parameter subset) pair taken through the
//! whole pipeline; a sweep runs the cartesian product of seeds and subsets.
//!
//! ## Schema Overview
//!
//! ```text
//! SweepRecord (1) ──< RunRecord (N)        one per (seed, study)
//!                         │
//!                         ├──< MetricRecord (N)   step = complexity
//!                         └──< ArtifactRecord (N) files in the output dir
//! ```
//!
//! Everything is collected into a [`SweepReport`] and written to
//! `<output_root>/sweep_report.json`.
//!
//! ## Usage
//!
//! ```rust
//! use med_sweep::experiment::{RunRecord, RunStatus, SweepRecord};
//!
//! let sweep = SweepRecord::new("sweep-1", "data.csv");
//! let mut run = RunRecord::new(
//!     "med_88_param1",
//!     sweep.sweep_id(),
//!     88,
//!     vec!["param1".to_string()],
//!     "med_post/med_88_param1",
//! );
//! run.start();
//! run.complete(RunStatus::Success);
//! ```

mod artifact_record;
mod config;
mod metric_record;
mod orchestrator;
mod report;
mod run_record;
mod sweep;
mod sweep_record;

pub use artifact_record::ArtifactRecord;
pub use config::{
    Combination, ExperimentConfig, FailurePolicy, SweepConfig, DEFAULT_OUTPUT_ROOT, DEFAULT_SEED,
    DEFAULT_TARGET, DEFAULT_TRAIN_FRACTION,
};
pub use metric_record::{MetricRecord, MEAN_RELATIVE_ERROR, MEDIAN_RELATIVE_ERROR};
pub use orchestrator::{
    run_experiment, run_experiment_on, Experiment, ExperimentOutcome, PreparedData,
};
pub use report::{SweepReport, REPORT_FILE};
pub use run_record::{RunRecord, RunStatus};
pub use sweep::{render_banner, run_sweep};
pub use sweep_record::{SweepRecord, SweepRecordBuilder};
