//! Run a single trial over the MPI world, one rank per process
use std::process::ExitCode;

use clap::Parser;
use mpi::traits::Communicator;
use rangesort::{run_trial, MpiTransport};
use scripts::{init_tracing, write_report, TrialArgs};
use tracing::error;

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    #[command(flatten)]
    trial: TrialArgs,
}

fn main() -> ExitCode {
    let Some(universe) = mpi::initialize() else {
        eprintln!("MPI is already initialised");
        return ExitCode::FAILURE;
    };
    let world = universe.world();
    let comm = world.duplicate();

    init_tracing();
    let args = Args::parse();
    let config = args.trial.config();
    let transport = MpiTransport::new(&comm);

    let report = match run_trial(&transport, &config) {
        Ok(report) => report,
        Err(e) => {
            error!(rank = world.rank(), "Trial failed: {}", e);
            world.abort(1)
        }
    };

    if world.rank() != 0 {
        return ExitCode::SUCCESS;
    }

    if let Err(e) = write_report(&args.trial.id, &report, !args.trial.no_header) {
        error!("Could not write results: {}", e);
        return ExitCode::FAILURE;
    }

    if report.sorted == Some(true) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
