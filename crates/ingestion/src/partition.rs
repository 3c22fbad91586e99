//! Grid partitioning across workers.

use crate::error::{IngestionError, Result};

/// Split `items` into `workers` contiguous, disjoint slices.
///
/// Concatenating the slices in order reproduces `items`. Sizes differ by at
/// most one, with the larger slices first. When `workers` exceeds the item
/// count the trailing slices are empty.
pub fn partition<T>(items: Vec<T>, workers: usize) -> Result<Vec<Vec<T>>> {
    if workers == 0 || items.is_empty() {
        return Err(IngestionError::InvalidPartition {
            items: items.len(),
            workers,
        });
    }

    let base = items.len() / workers;
    let extra = items.len() % workers;

    let mut iter = items.into_iter();
    let slices = (0..workers)
        .map(|i| {
            let size = base + usize::from(i < extra);
            iter.by_ref().take(size).collect()
        })
        .collect();

    Ok(slices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes<T>(slices: &[Vec<T>]) -> Vec<usize> {
        slices.iter().map(Vec::len).collect()
    }

    #[test]
    fn test_partition_reassembles_input() {
        for n in 1..40usize {
            for w in 1..=n {
                let items: Vec<usize> = (0..n).collect();
                let slices = partition(items.clone(), w).unwrap();
                assert_eq!(slices.len(), w);

                let joined: Vec<usize> = slices.iter().flatten().copied().collect();
                assert_eq!(joined, items, "n={} w={}", n, w);

                let lens = sizes(&slices);
                let max = *lens.iter().max().unwrap();
                let min = *lens.iter().min().unwrap();
                assert!(max - min <= 1, "n={} w={} sizes={:?}", n, w, lens);
            }
        }
    }

    #[test]
    fn test_larger_slices_first() {
        let slices = partition((0..10).collect::<Vec<_>>(), 4).unwrap();
        assert_eq!(sizes(&slices), vec![3, 3, 2, 2]);
        assert_eq!(slices[0], vec![0, 1, 2]);
        assert_eq!(slices[3], vec![8, 9]);
    }

    #[test]
    fn test_more_workers_than_items() {
        let slices = partition(vec!['a', 'b'], 4).unwrap();
        assert_eq!(sizes(&slices), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_invalid_partition() {
        assert!(matches!(
            partition(vec![1, 2, 3], 0),
            Err(IngestionError::InvalidPartition { items: 3, workers: 0 })
        ));
        assert!(matches!(
            partition(Vec::<u8>::new(), 2),
            Err(IngestionError::InvalidPartition { items: 0, workers: 2 })
        ));
    }
}
