//! Sorting of a rank's own buffer, no coordination with other ranks.
use std::cmp::Ordering;

use crate::traits::types::Value;

/// Total order on values, equal values are indistinguishable.
#[inline(always)]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    a.cmp(b)
}

/// Sort `values` in place, order among equal values is unspecified.
pub fn sort_local(values: &mut [Value]) {
    values.sort_unstable_by(compare_values);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sorting::source::generate_values;

    #[test]
    fn test_comparator() {
        assert_eq!(compare_values(&1, &2), Ordering::Less);
        assert_eq!(compare_values(&2, &2), Ordering::Equal);
        assert_eq!(compare_values(&u64::MAX, &0), Ordering::Greater);
    }

    #[test]
    fn test_sort_local() {
        let mut values = generate_values(1, 5000, 12).unwrap();
        sort_local(&mut values);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_sort_empty_and_single() {
        let mut empty: Vec<Value> = vec![];
        sort_local(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![7];
        sort_local(&mut single);
        assert_eq!(single, vec![7]);
    }
}
