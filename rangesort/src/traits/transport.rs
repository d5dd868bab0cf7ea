//! Message passing primitives the sort engine is written against.
use crate::sorting::collector::GatherPlan;
use crate::traits::types::{Rank, SortError, Value, ROOT_RANK};

/// One destination's share of a batched distribution.
#[derive(Clone, Copy, Debug)]
pub struct Batch<'a> {
    /// Rank the values are destined for
    pub destination: Rank,
    /// Values owned by the destination, in generation order
    pub values: &'a [Value],
}

/// Interface over an already initialised group of ranks.
///
/// Every operation is called by the ranks in the same order (SPMD), point to point messages
/// between an ordered pair of ranks are delivered reliably and in order. A failure of any
/// operation is fatal for the trial.
pub trait Transport {
    /// Rank of this process
    fn rank(&self) -> Rank;

    /// Number of ranks in the group
    fn size(&self) -> Rank;

    /// Whether this process is the root
    fn is_root(&self) -> bool {
        self.rank() == ROOT_RANK
    }

    /// Hand every batch to the transport, sending the count of each batch followed by its
    /// values. Must not wait on one receiver before issuing the sends for the next, and must
    /// not return before every payload has been captured for delivery.
    ///
    /// # Arguments
    /// * `batches` - One entry per remote destination.
    fn dispatch(&self, batches: &[Batch<'_>]) -> Result<(), SortError>;

    /// Block until the count message from `source` arrives.
    fn receive_count(&self, source: Rank) -> Result<usize, SortError>;

    /// Block until the value array from `source` arrives, `count` is the size announced
    /// by the preceding count message.
    fn receive_values(&self, source: Rank, count: usize) -> Result<Vec<Value>, SortError>;

    /// Send a single value to `destination`.
    fn send_value(&self, destination: Rank, value: Value) -> Result<(), SortError>;

    /// Signal the end of a value stream to `destination`.
    fn send_stop(&self, destination: Rank) -> Result<(), SortError>;

    /// Block until the next streamed message from `source`, `None` marks the end of the stream.
    fn receive_streamed(&self, source: Rank) -> Result<Option<Value>, SortError>;

    /// Block until every rank has arrived.
    fn barrier(&self) -> Result<(), SortError>;

    /// Collect each rank's count at the root, in rank order. Returns `Some` only on the root.
    fn gather_counts(&self, count: usize) -> Result<Option<Vec<usize>>, SortError>;

    /// Root side of the variable count gather, `out` must hold `plan.total()` values.
    fn gather_values_into_root(
        &self,
        local: &[Value],
        plan: &GatherPlan,
        out: &mut [Value],
    ) -> Result<(), SortError>;

    /// Non root side of the variable count gather.
    fn gather_values_into(&self, local: &[Value]) -> Result<(), SortError>;
}
