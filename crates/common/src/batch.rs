//! Partitioning of browser targets into concurrency-bounded batches

use crate::error::{Error, Result};

/// One group of a [`BatchPlan`], remembering where it starts in the
/// original sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    /// Zero-based batch number.
    pub number: usize,
    /// Index of the first item in the original sequence.
    pub offset: usize,
    pub items: Vec<T>,
}

impl<T> Batch<T> {
    /// Original-sequence indices paired with items.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(move |(i, item)| (self.offset + i, item))
    }
}

/// Ordered targets split into groups of at most `limit`. The last group may
/// be short; concatenating the groups yields the original sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan<T> {
    limit: usize,
    total: usize,
    batches: Vec<Batch<T>>,
}

impl<T: Clone> BatchPlan<T> {
    pub fn new(items: &[T], limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidConfig(
                "concurrency limit must be greater than zero".to_string(),
            ));
        }

        let batches = items
            .chunks(limit)
            .enumerate()
            .map(|(number, chunk)| Batch {
                number,
                offset: number * limit,
                items: chunk.to_vec(),
            })
            .collect();

        Ok(Self {
            limit,
            total: items.len(),
            batches,
        })
    }
}

impl<T> BatchPlan<T> {
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of items across all batches.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of batches, `ceil(total / limit)`.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Batch<T>> {
        self.batches.iter()
    }
}

impl<T> IntoIterator for BatchPlan<T> {
    type Item = Batch<T>;
    type IntoIter = std::vec::IntoIter<Batch<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_shapes() {
        for n in 0..20usize {
            for k in 1..7usize {
                let items: Vec<usize> = (0..n).collect();
                let plan = BatchPlan::new(&items, k).unwrap();

                assert_eq!(plan.len(), n.div_ceil(k), "n={} k={}", n, k);
                assert!(plan.iter().all(|b| !b.items.is_empty() && b.items.len() <= k));

                let flattened: Vec<usize> =
                    plan.iter().flat_map(|b| b.items.iter().copied()).collect();
                assert_eq!(flattened, items);
            }
        }
    }

    #[test]
    fn test_last_batch_may_be_short() {
        let plan = BatchPlan::new(&["a", "b", "c", "d", "e"], 2).unwrap();
        let sizes: Vec<usize> = plan.iter().map(|b| b.items.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_indexed_uses_global_positions() {
        let plan = BatchPlan::new(&["a", "b", "c", "d", "e"], 2).unwrap();
        let last: Vec<(usize, &&str)> = plan.iter().nth(2).unwrap().indexed().collect();
        assert_eq!(last, vec![(4, &"e")]);
        let second: Vec<usize> = plan.iter().nth(1).unwrap().indexed().map(|(i, _)| i).collect();
        assert_eq!(second, vec![2, 3]);
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(
            BatchPlan::new(&[1, 2, 3], 0),
            Err(Error::InvalidConfig(_))
        ));
    }
}
