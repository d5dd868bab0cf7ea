//! Rank scoped state threaded through a trial.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::traits::{
    transport::Transport,
    types::{PhaseTime, PhaseType, Rank, ROOT_RANK},
};

/// Everything a rank needs to take part in a trial: its identity, the communication handle
/// and an accumulator for phase timings.
pub struct RankContext<'t, T: Transport> {
    transport: &'t T,
    rank: Rank,
    size: Rank,
    start: Instant,
    times: HashMap<PhaseType, PhaseTime>,
}

impl<'t, T: Transport> RankContext<'t, T> {
    /// Start a context, the trial clock starts now.
    pub fn new(transport: &'t T) -> Self {
        RankContext {
            rank: transport.rank(),
            size: transport.size(),
            transport,
            start: Instant::now(),
            times: HashMap::new(),
        }
    }

    /// Communication handle
    pub fn transport(&self) -> &'t T {
        self.transport
    }

    /// Rank of this process
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks
    pub fn size(&self) -> Rank {
        self.size
    }

    /// Whether this process is the root
    pub fn is_root(&self) -> bool {
        self.rank == ROOT_RANK
    }

    /// Milliseconds since the trial started
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Time since the trial started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Add `duration` to the running total of `phase`.
    pub fn record(&mut self, phase: PhaseType, duration: Duration) {
        let t = PhaseTime::from_duration(duration);
        self.times
            .entry(phase)
            .and_modify(|e| e.time += t.time)
            .or_insert(t);
    }

    /// Recorded phase timings
    pub fn times(&self) -> &HashMap<PhaseType, PhaseTime> {
        &self.times
    }

    /// Consume the context, keeping the timings.
    pub fn into_times(self) -> HashMap<PhaseType, PhaseTime> {
        self.times
    }
}
