//? mpirun -n {{NPROCESSES}} --features "mpi"
#![allow(unused_imports)]
use rangesort::{sorting::source::generate_values, DistributionMode, TrialConfig};

#[cfg(feature = "mpi")]
use mpi::{
    environment::Universe,
    topology::SimpleCommunicator,
    traits::{Communicator, CommunicatorCollectives},
};

#[cfg(feature = "mpi")]
use rangesort::{run_trial, MpiTransport, TrialReport};

/// Test that the gathered sequence is the sorted generated sequence.
#[cfg(feature = "mpi")]
fn test_sorted_generated_multiset(report: &TrialReport, config: &TrialConfig) {
    let sequence = report.sequence.as_ref().unwrap();
    let mut expected = generate_values(config.seed, config.number_count, config.bits_to_use).unwrap();
    expected.sort_unstable();

    assert_eq!(report.sorted, Some(true));
    assert_eq!(sequence, &expected);
}

/// Test that every rank holds exactly what the root's distribution says it holds.
#[cfg(feature = "mpi")]
fn test_local_counts(world: &SimpleCommunicator, report: &TrialReport) {
    let size = world.size() as usize;
    let mut counts = vec![0usize; size];
    world.all_gather_into(&report.local_count, &mut counts[..]);

    if world.rank() == 0 {
        let distribution = report.distribution.as_ref().unwrap();
        assert_eq!(distribution, &counts);
        assert_eq!(counts.iter().sum::<usize>(), report.number_count);
    }
}

#[cfg(feature = "mpi")]
fn main() {
    let universe: Universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = world.duplicate();
    let transport = MpiTransport::new(&comm);

    for mode in [DistributionMode::Batched, DistributionMode::Streaming] {
        for (number_count, bits) in [(0, 16), (10, 8), (1000, 16), (10000, 64)] {
            let config = TrialConfig::new(number_count, 42, bits).with_mode(mode);
            let report = run_trial(&transport, &config).unwrap();

            if world.rank() == 0 {
                test_sorted_generated_multiset(&report, &config);
            }
            test_local_counts(&world, &report);

            if world.rank() == 0 {
                println!(
                    "\t ... {} trial of {} values over {} bits passed",
                    mode, number_count, bits
                );
            }
        }
    }
}

#[cfg(not(feature = "mpi"))]
fn main() {}
