//! A single trial of the distributed sort, executed identically by every rank.
//!
//! Control flow, with the root driving and every other rank receiving:
//! 1. Every rank derives the same [`RangePlan`].
//! 2. The root generates the values and routes each one to its owner.
//! 3. A barrier, after which every rank holds everything it will ever receive.
//! 4. Every rank sorts its own values.
//! 5. A collective gather reassembles the sorted buffers on the root, in rank order.
//! 6. The root checks the reassembled sequence is in order.
pub mod config;
pub mod context;
pub mod report;

use std::time::Instant;

use tracing::{debug, error, info};

use crate::sorting::{
    collector::collect,
    distributor::{classify, dispatch_staged, receive, stream_from_root},
    local_sort::sort_local,
    planner::RangePlan,
    source::ValueSource,
    verifier::{first_disorder, is_sorted},
};
use crate::traits::{
    transport::Transport,
    types::{DistributionMode, PhaseType, SortError},
};

pub use config::TrialConfig;
pub use context::RankContext;
pub use report::{ReportField, TrialReport};

/// Run one trial on this rank. Every rank of the group must call this with the same config.
///
/// # Arguments
/// * `transport` - Handle on the already initialised rank group.
/// * `config` - Trial parameters, fallbacks are applied before use.
pub fn run_trial<T: Transport>(
    transport: &T,
    config: &TrialConfig,
) -> Result<TrialReport, SortError> {
    let mut ctx = RankContext::new(transport);
    let config = config.sanitised(ctx.rank());
    let number_count = config.number_count;
    let limit = config.buffer_limit;

    let s = Instant::now();
    let plan = RangePlan::new(config.bits_to_use, ctx.size())?;
    ctx.record(PhaseType::Setup, s.elapsed());

    if ctx.is_root() {
        info!(
            elapsed_ms = ctx.elapsed_ms(),
            "Offset = {}; block_size = {}",
            plan.offset(),
            plan.block_size()
        );
    }

    let mut seed = None;
    let mut buffer = if ctx.is_root() {
        let mut source = ValueSource::new(config.seed, config.bits_to_use)?;
        seed = Some(source.seed());
        info!(
            elapsed_ms = ctx.elapsed_ms(),
            mode = %config.mode,
            "Started generating numbers... {} total to generate, Rseed = {}, bits used = {}",
            number_count,
            source.seed(),
            config.bits_to_use
        );

        let s = Instant::now();
        match config.mode {
            DistributionMode::Batched => {
                let staging = classify(
                    &plan,
                    source.take_values(number_count),
                    number_count,
                    limit,
                );
                ctx.record(PhaseType::Generation, s.elapsed());
                info!(
                    elapsed_ms = ctx.elapsed_ms(),
                    "All numbers generated! Sending start signal"
                );

                let s = Instant::now();
                let own = dispatch_staged(&ctx, staging)?;
                ctx.record(PhaseType::Distribution, s.elapsed());
                own
            }
            DistributionMode::Streaming => {
                let own = stream_from_root(
                    &ctx,
                    &plan,
                    source.take_values(number_count),
                    number_count,
                    limit,
                )?;
                ctx.record(PhaseType::Generation, s.elapsed());
                info!(
                    elapsed_ms = ctx.elapsed_ms(),
                    "All numbers generated and streamed"
                );
                own
            }
        }
    } else {
        let s = Instant::now();
        let buffer = receive(&ctx, config.mode, number_count, limit)?;
        ctx.record(PhaseType::Distribution, s.elapsed());
        buffer
    };

    // Nobody sorts before every value has arrived
    let s = Instant::now();
    transport.barrier()?;
    ctx.record(PhaseType::Distribution, s.elapsed());

    if ctx.is_root() {
        info!(
            elapsed_ms = ctx.elapsed_ms(),
            "Sent all start signals, began sort"
        );
    }

    let local_count = buffer.len();
    let dropped = buffer.dropped();
    debug!(rank = ctx.rank(), local_count, dropped, "Sorting local values");

    let s = Instant::now();
    sort_local(buffer.as_mut_slice());
    ctx.record(PhaseType::Sort, s.elapsed());

    let s = Instant::now();
    let gathered = collect(&ctx, buffer.into_vec(), number_count)?;
    ctx.record(PhaseType::Collection, s.elapsed());

    let (sequence, distribution, sorted) = match gathered {
        Some((sequence, plan)) => {
            info!(
                elapsed_ms = ctx.elapsed_ms(),
                "Gathered all numbers from all processes! Start the check of final array..."
            );

            let s = Instant::now();
            let sorted = is_sorted(&sequence);
            ctx.record(PhaseType::Verification, s.elapsed());

            if sorted {
                info!(elapsed_ms = ctx.elapsed_ms(), "Result array is sorted!");
            } else {
                error!(
                    elapsed_ms = ctx.elapsed_ms(),
                    first_disorder = first_disorder(&sequence),
                    "The result is wrong"
                );
            }

            (Some(sequence), Some(plan.counts), Some(sorted))
        }
        None => (None, None, None),
    };

    ctx.record(PhaseType::Total, ctx.elapsed());

    Ok(TrialReport {
        rank: ctx.rank(),
        n_ranks: ctx.size(),
        number_count,
        seed,
        bits_to_use: config.bits_to_use,
        mode: config.mode,
        local_count,
        dropped,
        distribution,
        sorted,
        sequence,
        times: ctx.into_times(),
    })
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use super::*;
    use crate::sorting::{collector::GatherPlan, source::generate_values};
    use crate::traits::{
        transport::Batch,
        types::{Rank, Value},
    };
    use crate::transport::local::{run_local_group, LocalTransport};

    /// Counts point to point messages sent or received, collectives pass through uncounted.
    struct CountingTransport<'t> {
        inner: &'t LocalTransport,
        messages: Cell<usize>,
    }

    impl<'t> CountingTransport<'t> {
        fn new(inner: &'t LocalTransport) -> Self {
            CountingTransport {
                inner,
                messages: Cell::new(0),
            }
        }

        fn count(&self, n: usize) {
            self.messages.set(self.messages.get() + n);
        }
    }

    impl Transport for CountingTransport<'_> {
        fn rank(&self) -> Rank {
            self.inner.rank()
        }

        fn size(&self) -> Rank {
            self.inner.size()
        }

        fn dispatch(&self, batches: &[Batch<'_>]) -> Result<(), SortError> {
            self.count(2 * batches.len());
            self.inner.dispatch(batches)
        }

        fn receive_count(&self, source: Rank) -> Result<usize, SortError> {
            self.count(1);
            self.inner.receive_count(source)
        }

        fn receive_values(&self, source: Rank, count: usize) -> Result<Vec<Value>, SortError> {
            self.count(1);
            self.inner.receive_values(source, count)
        }

        fn send_value(&self, destination: Rank, value: Value) -> Result<(), SortError> {
            self.count(1);
            self.inner.send_value(destination, value)
        }

        fn send_stop(&self, destination: Rank) -> Result<(), SortError> {
            self.count(1);
            self.inner.send_stop(destination)
        }

        fn receive_streamed(&self, source: Rank) -> Result<Option<Value>, SortError> {
            self.count(1);
            self.inner.receive_streamed(source)
        }

        fn barrier(&self) -> Result<(), SortError> {
            self.inner.barrier()
        }

        fn gather_counts(&self, count: usize) -> Result<Option<Vec<usize>>, SortError> {
            self.inner.gather_counts(count)
        }

        fn gather_values_into_root(
            &self,
            local: &[Value],
            plan: &GatherPlan,
            out: &mut [Value],
        ) -> Result<(), SortError> {
            self.inner.gather_values_into_root(local, plan, out)
        }

        fn gather_values_into(&self, local: &[Value]) -> Result<(), SortError> {
            self.inner.gather_values_into(local)
        }
    }

    /// Run a trial and return each rank's report with its point to point message count.
    fn run_counted(n_ranks: Rank, config: TrialConfig) -> Vec<(TrialReport, usize)> {
        run_local_group(n_ranks, |t| {
            let counting = CountingTransport::new(t);
            let report = run_trial(&counting, &config)?;
            Ok((report, counting.messages.get()))
        })
        .unwrap()
    }

    fn run(n_ranks: Rank, config: TrialConfig) -> Vec<TrialReport> {
        run_local_group(n_ranks, |t| run_trial(t, &config)).unwrap()
    }

    fn root_sequence(reports: &[TrialReport]) -> &[Value] {
        reports[0].sequence.as_deref().unwrap()
    }

    #[test]
    fn test_end_to_end_sorted() {
        for mode in [DistributionMode::Batched, DistributionMode::Streaming] {
            for n_ranks in [1, 2, 3, 5] {
                let config = TrialConfig::new(1000, 17, 16).with_mode(mode);
                let reports = run(n_ranks, config);

                let root = &reports[0];
                assert_eq!(root.sorted, Some(true));
                assert_eq!(root_sequence(&reports).len(), 1000);

                let distribution = root.distribution.as_ref().unwrap();
                assert_eq!(distribution.len(), n_ranks as usize);
                assert_eq!(distribution.iter().sum::<usize>(), 1000);
                for (report, &count) in reports.iter().zip(distribution.iter()) {
                    assert_eq!(report.local_count, count);
                    assert_eq!(report.dropped, 0);
                }

                for report in reports.iter().skip(1) {
                    assert!(report.sequence.is_none());
                    assert!(report.sorted.is_none());
                }
            }
        }
    }

    #[test]
    fn test_result_is_sorted_generated_multiset() {
        let config = TrialConfig::new(1000, 99, 16);
        let reports = run(5, config);

        let mut expected = generate_values(99, 1000, 16).unwrap();
        expected.sort_unstable();
        assert_eq!(root_sequence(&reports), &expected[..]);
    }

    #[test]
    fn test_repeat_is_identical() {
        for mode in [DistributionMode::Batched, DistributionMode::Streaming] {
            let config = TrialConfig::new(1000, 2024, 16).with_mode(mode);
            let a = run(3, config.clone());
            let b = run(3, config);
            assert_eq!(root_sequence(&a), root_sequence(&b));
            assert_eq!(a[0].distribution, b[0].distribution);
        }
    }

    #[test]
    fn test_empty_trial() {
        for n_ranks in [1, 2, 5] {
            let reports = run(n_ranks, TrialConfig::new(0, 5, 16));
            assert_eq!(reports[0].sorted, Some(true));
            assert!(root_sequence(&reports).is_empty());
            assert!(reports.iter().all(|r| r.local_count == 0));
        }
    }

    #[test]
    fn test_single_rank_is_local() {
        for mode in [DistributionMode::Batched, DistributionMode::Streaming] {
            let results = run_counted(1, TrialConfig::new(1000, 8, 16).with_mode(mode));
            assert_eq!(results.len(), 1);

            let (report, messages) = &results[0];
            assert_eq!(*messages, 0);
            assert_eq!(report.distribution, Some(vec![1000]));
            assert_eq!(report.sorted, Some(true));
        }
    }

    #[test]
    fn test_remote_ranks_exchange_messages() {
        let results = run_counted(2, TrialConfig::new(1000, 8, 16));
        // One count and one value array in each direction of the pair
        assert_eq!(results[0].1, 2);
        assert_eq!(results[1].1, 2);
    }

    #[test]
    fn test_full_width_values() {
        for n_ranks in [2, 3, 4] {
            let reports = run(n_ranks, TrialConfig::new(2000, 31, 64));
            assert_eq!(reports[0].sorted, Some(true));
            assert_eq!(root_sequence(&reports).len(), 2000);
        }
    }

    #[test]
    fn test_concrete_scenario() {
        // seed 42, ten 8 bit values over two ranks
        let config = TrialConfig::new(10, 42, 8);
        let reports = run(2, config);

        // Generated as 91, 83, 66, 19, 12, 6, 64, 23, 40, 36, all below 128
        assert_eq!(
            root_sequence(&reports),
            &[6, 12, 19, 23, 36, 40, 64, 66, 83, 91]
        );
        assert_eq!(reports[0].sorted, Some(true));
        assert_eq!(reports[0].distribution, Some(vec![10, 0]));
        assert_eq!(reports[0].seed, Some(42));
        assert_eq!(reports[0].bits_to_use, 8);
        assert_eq!(reports[1].seed, None);
    }

    #[test]
    fn test_fallbacks_applied() {
        let reports = run(2, TrialConfig::new(100, 0, 0));
        assert_eq!(reports[0].bits_to_use, 32);
        assert!(reports[0].seed.is_some_and(|s| s != 0));
        assert!(reports[1].seed.is_none());
        assert_eq!(reports[0].sorted, Some(true));
    }

    #[test]
    fn test_degraded_buffers_keep_running() {
        // Every buffer caps at 50 values, the rest is dropped with a warning
        for mode in [DistributionMode::Batched, DistributionMode::Streaming] {
            let config = TrialConfig::new(1000, 3, 16)
                .with_mode(mode)
                .with_buffer_limit(Some(50));
            let reports = run(2, config);

            let root = &reports[0];
            let gathered = root_sequence(&reports).len();
            let dropped: usize = reports.iter().map(|r| r.dropped).sum();
            assert_eq!(gathered, 100, "{} distribution", mode);
            assert_eq!(gathered + dropped, 1000, "{} distribution", mode);
            assert_eq!(reports[1].local_count, 50);
            assert_eq!(root.sorted, Some(true));
        }
    }

    #[test]
    fn test_report_times_recorded() {
        let reports = run(2, TrialConfig::new(500, 6, 16));
        let root = &reports[0];
        for phase in [
            PhaseType::Setup,
            PhaseType::Generation,
            PhaseType::Distribution,
            PhaseType::Sort,
            PhaseType::Collection,
            PhaseType::Verification,
            PhaseType::Total,
        ] {
            assert!(root.times.contains_key(&phase), "{:?} missing", phase);
        }
        assert!(!reports[1].times.contains_key(&PhaseType::Generation));
        assert!(root.time(PhaseType::Total) >= root.time(PhaseType::Sort));
    }
}
