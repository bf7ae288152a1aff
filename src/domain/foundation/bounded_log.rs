//! Fixed-capacity, append-only history.

use std::collections::vec_deque::{self, VecDeque};

/// Append-only list that keeps only the most recent `capacity` entries.
///
/// Entries are stored oldest first. Pushing onto a full log evicts the
/// oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Creates an empty log holding at most `capacity` entries.
    ///
    /// A capacity of zero is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, returning the evicted oldest entry if the log was full.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> BoundedLog<T> {
    /// Copies the entries out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn push_below_capacity_keeps_everything() {
        let mut log = BoundedLog::with_capacity(3);
        assert_eq!(log.push(1), None);
        assert_eq!(log.push(2), None);

        assert_eq!(log.to_vec(), vec![1, 2]);
        assert_eq!(log.latest(), Some(&2));
    }

    #[test]
    fn push_at_capacity_evicts_oldest() {
        let mut log = BoundedLog::with_capacity(2);
        log.push("a");
        log.push("b");

        assert_eq!(log.push("c"), Some("a"));
        assert_eq!(log.to_vec(), vec!["b", "c"]);
    }

    #[test]
    fn zero_capacity_is_treated_as_one() {
        let mut log = BoundedLog::with_capacity(0);
        log.push(1);
        log.push(2);
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.to_vec(), vec![2]);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = BoundedLog::with_capacity(5);
        log.push(1);
        log.clear();
        assert!(log.is_empty());
    }

    proptest! {
        #[test]
        fn log_never_exceeds_capacity_and_keeps_newest(
            capacity in 1usize..64,
            items in proptest::collection::vec(any::<u32>(), 0..256),
        ) {
            let mut log = BoundedLog::with_capacity(capacity);
            for item in &items {
                log.push(*item);
            }

            prop_assert!(log.len() <= capacity);
            let expected_start = items.len().saturating_sub(capacity);
            prop_assert_eq!(log.to_vec(), items[expected_start..].to_vec());
        }
    }
}
