//! Growable per rank storage for values.
use tracing::warn;

use crate::traits::types::{Rank, Value};

/// Number of elements added to a buffer each time it runs out of space.
pub const GROWTH_STEP: usize = 10_000;

/// Owned, growable sequence of values held by exactly one rank.
///
/// Capacity grows in steps of [`GROWTH_STEP`]. When growth fails, either because the
/// allocator refuses or because the optional element limit would be exceeded, the buffer
/// warns once and keeps operating on its last successful allocation, dropping further
/// values that do not fit.
#[derive(Debug)]
pub struct ValueBuffer {
    rank: Rank,
    values: Vec<Value>,
    limit: Option<usize>,
    dropped: usize,
}

impl ValueBuffer {
    /// Create an empty buffer with room for `initial_capacity` values.
    ///
    /// # Arguments
    /// * `rank` - Rank owning the buffer, used in warnings.
    /// * `initial_capacity` - Number of values to reserve up front.
    /// * `limit` - Optional hard cap on the number of values held.
    pub fn new(rank: Rank, initial_capacity: usize, limit: Option<usize>) -> Self {
        let initial_capacity = limit.map_or(initial_capacity, |l| initial_capacity.min(l));
        let mut values = Vec::new();
        if values.try_reserve_exact(initial_capacity).is_err() {
            warn!(
                rank,
                requested = initial_capacity,
                "Out of memory, starting with an empty buffer"
            );
        }
        ValueBuffer {
            rank,
            values,
            limit,
            dropped: 0,
        }
    }

    /// Wrap values that arrived in one piece.
    pub fn from_vec(rank: Rank, values: Vec<Value>) -> Self {
        ValueBuffer {
            rank,
            values,
            limit: None,
            dropped: 0,
        }
    }

    /// Append a value, growing if full. Returns `false` if the value had to be dropped.
    #[inline]
    pub fn push(&mut self, value: Value) -> bool {
        let at_limit = self.limit.is_some_and(|l| self.values.len() >= l);
        let full = self.values.len() == self.values.capacity();
        if at_limit || (full && !self.grow()) {
            self.degrade();
            return false;
        }
        self.values.push(value);
        true
    }

    fn grow(&mut self) -> bool {
        let step = match self.limit {
            Some(limit) => GROWTH_STEP.min(limit.saturating_sub(self.values.len())),
            None => GROWTH_STEP,
        };
        step > 0 && self.values.try_reserve_exact(step).is_ok()
    }

    fn degrade(&mut self) {
        if self.dropped == 0 {
            let count = self.values.len();
            warn!(
                rank = self.rank,
                count,
                "Out of memory on {}, cur element count {}",
                self.rank,
                count
            );
        }
        self.dropped += 1;
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the buffer holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of values currently allocated for.
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Number of values dropped because the buffer could not grow.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Charge this buffer with `count` values dropped on its behalf elsewhere.
    pub fn add_dropped(&mut self, count: usize) {
        self.dropped += count;
    }

    /// Values held, in insertion order until sorted.
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Mutable view of the values.
    pub fn as_mut_slice(&mut self) -> &mut [Value] {
        &mut self.values
    }

    /// Release the underlying storage.
    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}
