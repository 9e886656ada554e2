//! med-sweep CLI
//!
//! # Commands
//!
//! - `med-sweep run` - Run one experiment against a discovery program
//! - `med-sweep sweep --config sweep.toml` - Run a batch of experiments
//! - `med-sweep evaluate` - Score an existing hall of fame on a test file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use med_sweep::dataset::Dataset;
use med_sweep::discovery::{BackendConfig, CommandBackend};
use med_sweep::evaluate::evaluate;
use med_sweep::experiment::{
    run_experiment, run_sweep, ExperimentConfig, FailurePolicy, RunStatus, SweepConfig,
    DEFAULT_SEED, DEFAULT_TRAIN_FRACTION,
};
use med_sweep::hall_of_fame::HallOfFame;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "med-sweep")]
#[command(about = "Batched symbolic-regression experiments with unseen-data error analysis")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one experiment
    Run {
        /// CSV or Parquet dataset
        #[arg(short, long)]
        input: PathBuf,
        /// Parameter columns, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        params: Vec<String>,
        /// Target column
        #[arg(short, long)]
        target: String,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Split seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Fraction of rows used for training
        #[arg(long, default_value_t = DEFAULT_TRAIN_FRACTION)]
        fraction: f64,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Run every seed × study combination of a sweep file
    Sweep {
        /// Sweep TOML file
        #[arg(short, long)]
        config: PathBuf,
        /// Run at most this many combinations
        #[arg(long)]
        max_runs: Option<usize>,
        /// Stop at the first failed experiment
        #[arg(long)]
        fail_fast: bool,
    },
    /// Score a hall of fame against a test file
    Evaluate {
        /// Test rows (CSV or Parquet)
        #[arg(long)]
        test: PathBuf,
        /// Hall-of-fame CSV
        #[arg(long)]
        hall_of_fame: PathBuf,
        /// Parameter columns, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        params: Vec<String>,
        /// Target column
        #[arg(short, long)]
        target: String,
        /// Result CSV to write
        #[arg(short, long, default_value = "med_unseen.csv")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct BackendArgs {
    /// Discovery program, called with the manifest path as last argument
    #[arg(long)]
    backend_program: PathBuf,
    /// Extra arguments placed before the manifest path
    #[arg(long = "backend-arg", allow_hyphen_values = true)]
    backend_args: Vec<String>,
    /// Kill the search after this many seconds (0 = no limit)
    #[arg(long, default_value_t = 3600)]
    timeout_secs: u64,
    /// Glob for hall-of-fame files written outside the output directory
    #[arg(long)]
    artifact_pattern: Option<String>,
}

impl BackendArgs {
    fn into_config(self) -> BackendConfig {
        let pattern = self.artifact_pattern;
        let config = BackendConfig::new(self.backend_program)
            .with_args(self.backend_args)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match pattern {
            Some(p) => config.with_artifact_pattern(p),
            None => config,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "med_sweep=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            params,
            target,
            output,
            seed,
            fraction,
            backend,
        } => {
            let backend_config = backend.into_config();
            let config = ExperimentConfig::new(input, params, target, output)
                .with_seed(seed)
                .with_train_fraction(fraction)
                .with_artifact_pattern(backend_config.artifact_pattern.clone());
            let backend = CommandBackend::new(backend_config)?;

            let outcome = run_experiment(&config, &backend)
                .with_context(|| format!("experiment in {}", config.output_dir.display()))?;
            for row in &outcome.summary {
                info!(
                    complexity = row.complexity,
                    median = row.median,
                    equation = %row.equation,
                    "unseen-data error"
                );
            }
            println!("{}", outcome.results.display());
        }
        Commands::Sweep {
            config,
            max_runs,
            fail_fast,
        } => {
            let mut sweep = SweepConfig::from_toml_file(&config)?;
            if max_runs.is_some() {
                sweep.max_runs = max_runs;
            }
            if fail_fast {
                sweep.on_failure = FailurePolicy::Abort;
            }
            let backend = CommandBackend::new(sweep.backend.clone())?;

            let report = run_sweep(&sweep, &backend)
                .with_context(|| format!("sweep {}", config.display()))?;
            let failed = report.count_with_status(RunStatus::Failed);
            if failed > 0 {
                bail!("{failed} of {} experiments failed", report.runs().len());
            }
        }
        Commands::Evaluate {
            test,
            hall_of_fame,
            params,
            target,
            output,
        } => {
            let test = Dataset::load(&test)
                .with_context(|| format!("loading test rows from {}", test.display()))?;
            let hall_of_fame = HallOfFame::load(&hall_of_fame)?;
            let table = evaluate(&test, &hall_of_fame, params.as_slice(), &target)?;
            table.write_csv(&output)?;
            println!("{}", output.display());
        }
    }

    Ok(())
}
