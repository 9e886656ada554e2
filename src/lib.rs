//! # med-sweep: Batched Symbolic-Regression Experiments
//!
//! med-sweep runs equation discovery over many train/test splits and
//! parameter subsets of one tabular dataset, then measures how well each
//! discovered equation generalises to the held-out rows.
//!
//! ## Pipeline
//!
//! ```text
//! Dataset ─► bounds ─► seeded split ─► discovery backend ─► hall_of_fame.csv
//!                            │                                    │
//!                            └── test rows ─► equation compiler ◄─┘
//!                                                   │
//!                                        relative error per row
//!                                                   ▼
//!                                            med_unseen.csv
//! ```
//!
//! ## Design Principles
//!
//! - **Reproducible**: the split is a pure function of (rows, fraction, seed)
//! - **Isolated runs**: every (seed, study) writes into its own directory
//! - **Backend agnostic**: the search engine sits behind [`discovery::DiscoveryBackend`]
//! - **No dynamic code**: equations go through a parser, never an interpreter
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use med_sweep::discovery::{BackendConfig, CommandBackend};
//! use med_sweep::experiment::{run_experiment, ExperimentConfig};
//!
//! let backend = CommandBackend::new(BackendConfig::new("./run_search.sh"))?;
//! let config = ExperimentConfig::new(
//!     "data.csv",
//!     vec!["param1".to_string(), "param2".to_string()],
//!     "target_col",
//!     "med_post/med_100_param1-param2",
//! );
//!
//! let outcome = run_experiment(&config, &backend)?;
//! for row in &outcome.summary {
//!     println!("complexity {}: median error {:.3e}", row.complexity, row.median);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod bounds;
pub mod dataset;
pub mod discovery;
pub mod equation;
pub mod error;
pub mod evaluate;
pub mod experiment;
pub mod hall_of_fame;
pub mod split;

pub use error::{Error, Result};
