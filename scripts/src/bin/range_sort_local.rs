//! Run a single trial over an in-process group of ranks
use std::process::ExitCode;

use clap::Parser;
use rangesort::{run_local_group, run_trial};
use scripts::{init_tracing, write_report, TrialArgs};
use tracing::error;

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    /// Number of ranks, each one runs on its own thread
    #[arg(long, default_value_t = 4)]
    n_ranks: i32,

    #[command(flatten)]
    trial: TrialArgs,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    let config = args.trial.config();

    let reports = match run_local_group(args.n_ranks, |t| run_trial(t, &config)) {
        Ok(reports) => reports,
        Err(e) => {
            error!("Trial failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(root) = reports.first() else {
        return ExitCode::FAILURE;
    };

    if let Err(e) = write_report(&args.trial.id, root, !args.trial.no_header) {
        error!("Could not write results: {}", e);
        return ExitCode::FAILURE;
    }

    if root.sorted == Some(true) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
