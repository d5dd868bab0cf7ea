//! Routing of generated values to the rank owning their range.
//!
//! The root classifies each value with the [`RangePlan`]. Values it owns itself are stored
//! directly, everything else is either staged per destination and handed off in one batch
//! per rank ([`DistributionMode::Batched`]), or sent one value at a time followed by a stop
//! message ([`DistributionMode::Streaming`]). Receivers mirror whichever protocol is in use.
use itertools::Itertools;
use tracing::debug;

use crate::sorting::{buffer::ValueBuffer, planner::RangePlan};
use crate::traits::{
    transport::{Batch, Transport},
    types::{DistributionMode, Rank, SortError, Value, ROOT_RANK},
};
use crate::trial::context::RankContext;

/// Initial capacity of a per rank buffer, an even share of all values.
pub fn initial_capacity(number_count: usize, n_ranks: Rank) -> usize {
    number_count / n_ranks.max(1) as usize
}

/// Classify values into one staging buffer per rank.
///
/// # Arguments
/// * `plan` - Ownership plan for this trial.
/// * `values` - Values in generation order.
/// * `number_count` - Total number of values, used to size the staging buffers.
/// * `limit` - Optional per buffer element limit.
pub fn classify(
    plan: &RangePlan,
    values: impl IntoIterator<Item = Value>,
    number_count: usize,
    limit: Option<usize>,
) -> Vec<ValueBuffer> {
    let capacity = initial_capacity(number_count, plan.n_ranks());
    let mut staging = (0..plan.n_ranks())
        .map(|_| ValueBuffer::new(ROOT_RANK, capacity, limit))
        .collect_vec();

    for value in values {
        staging[plan.owner(value) as usize].push(value);
    }

    staging
}

/// Hand each remote rank its staged batch, keeping the root's own share.
///
/// Returns the root's buffer, charged with every value any staging buffer dropped. A single
/// rank group performs no point to point traffic.
pub fn dispatch_staged<T: Transport>(
    ctx: &RankContext<'_, T>,
    mut staging: Vec<ValueBuffer>,
) -> Result<ValueBuffer, SortError> {
    if staging.len() != ctx.size() as usize {
        return Err(SortError::Failed(format!(
            "{} staging buffers for {} ranks",
            staging.len(),
            ctx.size()
        )));
    }

    if staging.len() > 1 {
        let batches = staging
            .iter()
            .enumerate()
            .skip(1)
            .map(|(destination, buffer)| Batch {
                destination: destination as Rank,
                values: buffer.as_slice(),
            })
            .collect_vec();
        ctx.transport().dispatch(&batches)?;
    }

    let remote_dropped: usize = staging
        .iter()
        .enumerate()
        .filter(|&(rank, _)| rank != ROOT_RANK as usize)
        .map(|(_, buffer)| buffer.dropped())
        .sum();

    // Remote staging buffers are released here, their payloads have been handed off
    let mut own = staging.swap_remove(ROOT_RANK as usize);
    own.add_dropped(remote_dropped);
    Ok(own)
}

/// Root side of the streaming protocol: send each remote value as soon as it is classified,
/// then a stop message to every remote rank.
pub fn stream_from_root<T: Transport>(
    ctx: &RankContext<'_, T>,
    plan: &RangePlan,
    values: impl IntoIterator<Item = Value>,
    number_count: usize,
    limit: Option<usize>,
) -> Result<ValueBuffer, SortError> {
    let mut own = ValueBuffer::new(
        ROOT_RANK,
        initial_capacity(number_count, plan.n_ranks()),
        limit,
    );

    for value in values {
        match plan.owner(value) {
            ROOT_RANK => {
                own.push(value);
            }
            owner => ctx.transport().send_value(owner, value)?,
        }
    }

    for destination in 1..ctx.size() {
        ctx.transport().send_stop(destination)?;
    }

    Ok(own)
}

/// Receiver side of the batched protocol: wait for the count, then the values.
pub fn receive_batch<T: Transport>(ctx: &RankContext<'_, T>) -> Result<ValueBuffer, SortError> {
    let count = ctx.transport().receive_count(ROOT_RANK)?;
    let values = ctx.transport().receive_values(ROOT_RANK, count)?;

    if values.len() != count {
        return Err(SortError::Transport(format!(
            "rank {} was announced {} values but received {}",
            ctx.rank(),
            count,
            values.len()
        )));
    }

    debug!(rank = ctx.rank(), count, "Received batch");
    Ok(ValueBuffer::from_vec(ctx.rank(), values))
}

/// Receiver side of the streaming protocol: accumulate values until the stop message,
/// growing the buffer in fixed steps.
pub fn receive_stream<T: Transport>(
    ctx: &RankContext<'_, T>,
    number_count: usize,
    limit: Option<usize>,
) -> Result<ValueBuffer, SortError> {
    let mut buffer = ValueBuffer::new(
        ctx.rank(),
        initial_capacity(number_count, ctx.size()),
        limit,
    );

    while let Some(value) = ctx.transport().receive_streamed(ROOT_RANK)? {
        buffer.push(value);
    }

    debug!(
        rank = ctx.rank(),
        count = buffer.len(),
        dropped = buffer.dropped(),
        "Received stream"
    );
    Ok(buffer)
}

/// Non root entry point, receives with whichever protocol `mode` selects.
pub fn receive<T: Transport>(
    ctx: &RankContext<'_, T>,
    mode: DistributionMode,
    number_count: usize,
    limit: Option<usize>,
) -> Result<ValueBuffer, SortError> {
    match mode {
        DistributionMode::Batched => receive_batch(ctx),
        DistributionMode::Streaming => receive_stream(ctx, number_count, limit),
    }
}
