//! Partitioning of the value domain into one contiguous range per rank.
use crate::traits::types::{Rank, SortError, Value, VALUE_BITS};

/// A half open interval `[lower, upper)` of the value domain owned by a single rank.
///
/// Bounds are stored as `u128` so the top of a full width domain, `2^64`, is representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    /// Owning rank
    pub rank: Rank,
    /// Inclusive lower bound
    pub lower: u128,
    /// Exclusive upper bound
    pub upper: u128,
}

impl Range {
    /// Whether `value` falls inside this range.
    pub fn contains(&self, value: Value) -> bool {
        let value = value as u128;
        self.lower <= value && value < self.upper
    }

    /// Number of distinct values in the range.
    pub fn width(&self) -> u128 {
        self.upper - self.lower
    }

    /// Whether the range owns no values at all.
    pub fn is_empty(&self) -> bool {
        self.lower == self.upper
    }
}

/// Per trial ownership plan, computed identically on every rank.
#[derive(Clone, Debug)]
pub struct RangePlan {
    bits_to_use: u32,
    n_ranks: Rank,
    block_size: Value,
    ranges: Vec<Range>,
}

impl RangePlan {
    /// Derive the ownership plan for `n_ranks` ranks over `[0, 2^bits_to_use)`.
    ///
    /// # Arguments
    /// * `bits_to_use` - Number of significant low order bits, `1..=64`.
    /// * `n_ranks` - Number of ranks, at least 1.
    pub fn new(bits_to_use: u32, n_ranks: Rank) -> Result<Self, SortError> {
        if bits_to_use == 0 || bits_to_use > VALUE_BITS {
            return Err(SortError::InvalidInput(format!(
                "bits_to_use must be in 1..={}, got {}",
                VALUE_BITS, bits_to_use
            )));
        }
        if n_ranks < 1 {
            return Err(SortError::InvalidInput(format!(
                "rank count must be at least 1, got {}",
                n_ranks
            )));
        }

        let block_size = block_size(bits_to_use, n_ranks);
        let domain_end = 1u128 << bits_to_use;

        let ranges = (0..n_ranks)
            .map(|rank| {
                let lower = (rank as u128 * block_size as u128).min(domain_end);
                let upper = if rank == n_ranks - 1 {
                    domain_end
                } else {
                    ((rank as u128 + 1) * block_size as u128).min(domain_end)
                };
                Range { rank, lower, upper }
            })
            .collect();

        Ok(RangePlan {
            bits_to_use,
            n_ranks,
            block_size,
            ranges,
        })
    }

    /// Rank owning `value`.
    ///
    /// Values at the very top of the domain can compute a rank of `n_ranks` or more, due to
    /// truncation in the block size, these are clamped to the last rank.
    #[inline(always)]
    pub fn owner(&self, value: Value) -> Rank {
        let rank = value / self.block_size;
        rank.min((self.n_ranks - 1) as Value) as Rank
    }

    /// Divisor used for ownership decisions.
    pub fn block_size(&self) -> Value {
        self.block_size
    }

    /// Number of significant bits of each value.
    pub fn bits_to_use(&self) -> u32 {
        self.bits_to_use
    }

    /// Shift applied to full width random values to keep `bits_to_use` significant bits.
    pub fn offset(&self) -> u32 {
        VALUE_BITS - self.bits_to_use
    }

    /// Number of ranks the domain is split over.
    pub fn n_ranks(&self) -> Rank {
        self.n_ranks
    }

    /// Ranges in rank order.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Range owned by `rank`.
    pub fn range(&self, rank: Rank) -> Option<&Range> {
        usize::try_from(rank).ok().and_then(|r| self.ranges.get(r))
    }
}

/// Width of each rank's range.
///
/// At full width `2^bits` overflows, so the width is computed as `2^(bits-1) / (n/2)`
/// instead. For an odd rank count this truncates, and the last rank's share is
/// uneven. A single rank owns everything.
pub fn block_size(bits_to_use: u32, n_ranks: Rank) -> Value {
    if n_ranks == 1 {
        return Value::MAX;
    }

    let raw = if bits_to_use == VALUE_BITS {
        ((1 as Value) << (bits_to_use - 1)) / (n_ranks >> 1) as Value
    } else {
        ((1 as Value) << bits_to_use) / n_ranks as Value
    };

    // More ranks than values in the domain
    raw.max(1)
}

#[cfg(test)]
mod test {
    use super::*;

    fn check_coverage(plan: &RangePlan) {
        let ranges = plan.ranges();
        assert_eq!(ranges.len(), plan.n_ranks() as usize);
        assert_eq!(ranges[0].lower, 0);
        for (a, b) in ranges.iter().zip(ranges.iter().skip(1)) {
            assert_eq!(a.upper, b.lower);
            assert!(a.lower <= a.upper);
        }
        assert_eq!(
            ranges.last().unwrap().upper,
            1u128 << plan.bits_to_use()
        );
    }

    #[test]
    fn test_ranges_cover_domain() {
        for bits in [1, 2, 7, 8, 16, 31, 32, 33, 63, 64] {
            for n_ranks in [1, 2, 3, 4, 5, 7, 8, 16] {
                let plan = RangePlan::new(bits, n_ranks).unwrap();
                check_coverage(&plan);
            }
        }
    }

    #[test]
    fn test_owner_agrees_with_ranges() {
        for bits in [3, 8, 16, 64] {
            for n_ranks in [1, 2, 3, 5] {
                let plan = RangePlan::new(bits, n_ranks).unwrap();
                let max = if bits == 64 { Value::MAX } else { (1 << bits) - 1 };
                let probes = [0, 1, max / 3, max / 2, max - 1, max];
                for &v in probes.iter() {
                    let owner = plan.owner(v);
                    assert!(plan.range(owner).unwrap().contains(v));
                    let holders = plan.ranges().iter().filter(|r| r.contains(v)).count();
                    assert_eq!(holders, 1);
                }
            }
        }
    }

    #[test]
    fn test_block_size_even_split() {
        assert_eq!(block_size(16, 2), 1 << 15);
        assert_eq!(block_size(16, 4), 1 << 14);
        assert_eq!(block_size(8, 3), 85);
    }

    #[test]
    fn test_full_width_block_size_does_not_wrap() {
        // A naive 1 << 64 would wrap to 1 << 0 (or panic), giving a block of zero.
        assert_eq!(block_size(64, 2), 1 << 63);
        assert_eq!(block_size(64, 4), 1 << 62);
        assert_eq!(block_size(64, 8), 1 << 61);

        let plan = RangePlan::new(64, 4).unwrap();
        assert_eq!(plan.owner(Value::MAX), 3);
        assert_eq!(plan.owner(0), 0);
        check_coverage(&plan);
    }

    #[test]
    fn test_full_width_odd_rank_count() {
        // 2^63 / (5 >> 1) truncates, leaving the last rank with no values.
        let plan = RangePlan::new(64, 5).unwrap();
        assert_eq!(plan.block_size(), (1 << 63) / 2);
        assert_eq!(plan.owner(Value::MAX), 3);
        assert!(plan.range(4).unwrap().is_empty());
        check_coverage(&plan);
    }

    #[test]
    fn test_top_of_domain_is_clamped_to_last_rank() {
        // 256 / 3 = 85, so 255 / 85 = 3 which is not a rank.
        let plan = RangePlan::new(8, 3).unwrap();
        assert_eq!(255 / plan.block_size(), 3);
        assert_eq!(plan.owner(255), 2);
        assert_eq!(plan.owner(170), 2);
        assert_eq!(plan.owner(169), 1);
        assert_eq!(plan.range(2).unwrap().width(), 86);
    }

    #[test]
    fn test_single_rank_owns_everything() {
        let plan = RangePlan::new(16, 1).unwrap();
        assert_eq!(plan.block_size(), Value::MAX);
        assert_eq!(plan.owner(0), 0);
        assert_eq!(plan.owner(Value::MAX), 0);
        check_coverage(&plan);
    }

    #[test]
    fn test_more_ranks_than_values() {
        let plan = RangePlan::new(1, 5).unwrap();
        assert_eq!(plan.block_size(), 1);
        assert_eq!(plan.owner(0), 0);
        assert_eq!(plan.owner(1), 1);
        check_coverage(&plan);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(RangePlan::new(0, 2).is_err());
        assert!(RangePlan::new(65, 2).is_err());
        assert!(RangePlan::new(16, 0).is_err());
    }
}
