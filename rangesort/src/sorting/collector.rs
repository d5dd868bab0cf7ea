//! Reassembly of the per rank sorted buffers on the root.
use itertools::Itertools;
use tracing::warn;

use crate::traits::{
    transport::Transport,
    types::{Rank, SortError, Value},
};
use crate::trial::context::RankContext;

/// Receive counts and displacements of a variable count gather, root only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatherPlan {
    /// Number of values held by each rank
    pub counts: Vec<usize>,
    /// Offset of each rank's values in the reassembled sequence
    pub displacements: Vec<usize>,
}

impl GatherPlan {
    /// Build the plan from each rank's count, displacements are the exclusive prefix sum.
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let displacements = counts
            .iter()
            .scan(0, |acc, &x| {
                let tmp = *acc;
                *acc += x;
                Some(tmp)
            })
            .collect_vec();

        GatherPlan {
            counts,
            displacements,
        }
    }

    /// Total number of values gathered.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Positions in the reassembled sequence filled by `rank`.
    pub fn slot(&self, rank: Rank) -> std::ops::Range<usize> {
        let r = rank as usize;
        self.displacements[r]..self.displacements[r] + self.counts[r]
    }
}

/// Gather every rank's sorted buffer onto the root, in rank order.
///
/// Every rank must call this. The root returns the reassembled sequence along with the plan
/// used to build it, other ranks return `None`.
///
/// # Arguments
/// * `ctx` - Rank context.
/// * `local` - This rank's sorted values.
/// * `number_count` - Number of values the trial generated.
pub fn collect<T: Transport>(
    ctx: &RankContext<'_, T>,
    local: Vec<Value>,
    number_count: usize,
) -> Result<Option<(Vec<Value>, GatherPlan)>, SortError> {
    let transport = ctx.transport();
    let counts = transport.gather_counts(local.len())?;

    let Some(counts) = counts else {
        transport.gather_values_into(&local)?;
        return Ok(None);
    };

    let plan = GatherPlan::from_counts(counts);
    if plan.total() != number_count {
        warn!(
            rank = ctx.rank(),
            expected = number_count,
            gathered = plan.total(),
            "Ranks hold {} values in total but {} were generated",
            plan.total(),
            number_count
        );
    }

    let mut out = vec![0; plan.total()];
    transport.gather_values_into_root(&local, &plan, &mut out)?;

    Ok(Some((out, plan)))
}
