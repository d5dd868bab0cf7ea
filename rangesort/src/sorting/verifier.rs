//! Global order check of the reassembled sequence.
use itertools::Itertools;

use crate::traits::types::Value;

/// Whether `values` is in non-decreasing order. Empty and single element sequences are sorted.
pub fn is_sorted(values: &[Value]) -> bool {
    values.iter().tuple_windows().all(|(a, b)| a <= b)
}

/// Index of the first element smaller than its predecessor, if any.
pub fn first_disorder(values: &[Value]) -> Option<usize> {
    values
        .iter()
        .tuple_windows()
        .position(|(a, b)| a > b)
        .map(|i| i + 1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_sorted() {
        assert!(is_sorted(&[]));
        assert!(is_sorted(&[4]));
        assert!(is_sorted(&[1, 1, 2, 9, 9]));
        assert!(!is_sorted(&[1, 3, 2]));
        assert!(!is_sorted(&[u64::MAX, 0]));
    }

    #[test]
    fn test_first_disorder() {
        assert_eq!(first_disorder(&[1, 2, 3]), None);
        assert_eq!(first_disorder(&[1, 5, 2, 1]), Some(2));
    }
}
