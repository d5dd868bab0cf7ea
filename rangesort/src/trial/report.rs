//! Per trial results, handed to whatever records them.
use std::collections::HashMap;

use itertools::Itertools;

use crate::traits::types::{DistributionMode, PhaseTime, PhaseType, Rank, Value};

/// A named numeric result of a trial.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportField {
    /// Column name
    pub name: &'static str,
    /// Rendered value
    pub value: String,
}

/// Outcome of a trial as seen by one rank. Fields only the root can know are `None` elsewhere.
#[derive(Clone, Debug)]
pub struct TrialReport {
    /// Rank that produced this report
    pub rank: Rank,
    /// Number of ranks taking part
    pub n_ranks: Rank,
    /// Number of values generated
    pub number_count: usize,
    /// Seed fed to the generator, root only
    pub seed: Option<u64>,
    /// Significant bits per value
    pub bits_to_use: u32,
    /// Distribution protocol used
    pub mode: DistributionMode,
    /// Phase timings of this rank
    pub times: HashMap<PhaseType, PhaseTime>,
    /// Values held by this rank after distribution
    pub local_count: usize,
    /// Values this rank dropped because a buffer could not grow
    pub dropped: usize,
    /// Final number of values held by each rank, root only
    pub distribution: Option<Vec<usize>>,
    /// Verdict of the order check, root only
    pub sorted: Option<bool>,
    /// Reassembled sequence, root only
    pub sequence: Option<Vec<Value>>,
}

impl TrialReport {
    /// Milliseconds spent in `phase`, zero if the phase did not run on this rank.
    pub fn time(&self, phase: PhaseType) -> f64 {
        self.times.get(&phase).map_or(0.0, |t| t.time)
    }

    /// Column names, in the order [`TrialReport::fields`] yields values.
    pub fn header() -> Vec<&'static str> {
        vec![
            "net_size",
            "number_count",
            "seed",
            "bits",
            "mode",
            "setup_ms",
            "generation_ms",
            "distribution_ms",
            "sort_ms",
            "collection_ms",
            "verification_ms",
            "total_ms",
            "sorted",
            "distribution",
        ]
    }

    /// Ordered named fields of this trial.
    pub fn fields(&self) -> Vec<ReportField> {
        let field = |name, value: String| ReportField { name, value };

        let mut fields = vec![
            field("net_size", self.n_ranks.to_string()),
            field("number_count", self.number_count.to_string()),
            field("seed", self.seed.map_or(String::new(), |s| s.to_string())),
            field("bits", self.bits_to_use.to_string()),
            field("mode", self.mode.to_string()),
        ];

        let phase_names = [
            "setup_ms",
            "generation_ms",
            "distribution_ms",
            "sort_ms",
            "collection_ms",
            "verification_ms",
            "total_ms",
        ];
        for (name, phase) in phase_names.into_iter().zip(PhaseType::ALL) {
            fields.push(field(name, format!("{:.6}", self.time(phase))));
        }

        fields.push(field(
            "sorted",
            self.sorted.map_or(String::new(), |s| s.to_string()),
        ));
        fields.push(field(
            "distribution",
            self.distribution
                .as_ref()
                .map_or(String::new(), |d| format!("{{{}}}", d.iter().join(","))),
        ));

        fields
    }

    /// Field values only, in header order.
    pub fn record(&self) -> Vec<String> {
        self.fields().into_iter().map(|f| f.value).collect()
    }
}
