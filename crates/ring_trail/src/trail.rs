//! Fixed-capacity circular trail buffer.
//!
//! Storage is a fixed-length slice allocated once at construction:
//! - `cursor` is the slot the next push writes
//! - `len` counts valid slots and saturates at capacity
//!
//! Once the buffer has wrapped, the slot at `cursor` holds the oldest sample
//! (it is the one right after the last-written slot), so snapshots start
//! there; while still filling they start at 0.

use std::fmt;
use std::iter::FusedIterator;

/// Per-entity ring of recent samples
#[derive(Clone)]
pub struct RingTrail<T> {
    slots: Box<[T]>,
    cursor: usize,
    len: usize,
    overwritten_count: u64,
}

impl<T> fmt::Debug for RingTrail<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingTrail")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .field("cursor", &self.cursor)
            .field("overwritten", &self.overwritten_count)
            .finish()
    }
}

impl<T: Default> RingTrail<T> {
    /// Create an empty trail
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "trail capacity must be > 0");
        Self {
            slots: std::iter::repeat_with(T::default).take(capacity).collect(),
            cursor: 0,
            len: 0,
            overwritten_count: 0,
        }
    }
}

impl<T> RingTrail<T> {
    /// Push a sample
    ///
    /// If the trail is full, overwrites the oldest sample.
    #[inline]
    pub fn push(&mut self, sample: T) {
        let capacity = self.slots.len();

        self.slots[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % capacity;

        if self.len < capacity {
            self.len += 1;
        } else {
            self.overwritten_count += 1;
        }
    }

    /// Oldest-to-newest view of the current contents
    ///
    /// The returned iterator is `Clone`, so it can be restarted; the borrow
    /// keeps the trail frozen while it is alive.
    #[inline]
    pub fn snapshot(&self) -> Snapshot<'_, T> {
        let start = if self.len < self.slots.len() {
            0
        } else {
            self.cursor
        };

        Snapshot {
            slots: &self.slots,
            start,
            front: 0,
            back: self.len,
        }
    }

    /// Most recent sample
    #[inline]
    pub fn newest(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let capacity = self.slots.len();
        Some(&self.slots[(self.cursor + capacity - 1) % capacity])
    }

    /// Oldest retained sample
    #[inline]
    pub fn oldest(&self) -> Option<&T> {
        self.snapshot().next()
    }

    /// Number of valid samples
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no sample was pushed since creation or the last `clear`
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fixed capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Check if the trail has wrapped
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Forget all samples, keeping the allocation
    #[inline]
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.len = 0;
    }

    /// Get overwritten sample count
    #[inline]
    pub fn overwritten_count(&self) -> u64 {
        self.overwritten_count
    }
}

/// Oldest-to-newest iterator over a `RingTrail`
#[derive(Debug)]
pub struct Snapshot<'a, T> {
    slots: &'a [T],
    start: usize,
    /// Logical positions still to yield: `front..back`
    front: usize,
    back: usize,
}

impl<T> Clone for Snapshot<'_, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            start: self.start,
            front: self.front,
            back: self.back,
        }
    }
}

impl<'a, T> Snapshot<'a, T> {
    #[inline]
    fn slot(&self, logical: usize) -> &'a T {
        &self.slots[(self.start + logical) % self.slots.len()]
    }
}

impl<'a, T> Iterator for Snapshot<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let item = self.slot(self.front);
        self.front += 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Snapshot<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.slot(self.back))
    }
}

impl<T> ExactSizeIterator for Snapshot<'_, T> {}

impl<T> FusedIterator for Snapshot<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(trail: &RingTrail<char>) -> Vec<char> {
        trail.snapshot().copied().collect()
    }

    #[test]
    fn test_empty_snapshot() {
        let trail: RingTrail<char> = RingTrail::new(3);
        assert!(trail.is_empty());
        assert_eq!(trail.snapshot().len(), 0);
        assert!(trail.newest().is_none());
        assert!(trail.oldest().is_none());
    }

    #[test]
    fn test_single_sample_is_oldest_and_newest() {
        let mut trail = RingTrail::new(3);
        trail.push('A');
        assert_eq!(collect(&trail), vec!['A']);
        assert_eq!(trail.oldest(), Some(&'A'));
        assert_eq!(trail.newest(), Some(&'A'));
    }

    #[test]
    fn test_wraparound_order() {
        let mut trail = RingTrail::new(3);
        for c in ['A', 'B', 'C', 'D'] {
            trail.push(c);
        }
        assert_eq!(collect(&trail), vec!['B', 'C', 'D']);

        trail.push('E');
        assert_eq!(collect(&trail), vec!['C', 'D', 'E']);
        assert_eq!(trail.overwritten_count(), 2);
        assert_eq!(trail.len(), 3);
    }

    #[test]
    fn test_partial_fill_in_insertion_order() {
        let mut trail = RingTrail::new(5);
        for i in 0..3 {
            trail.push(i);
        }
        assert_eq!(trail.snapshot().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(!trail.is_full());
    }

    #[test]
    fn test_keeps_last_k_of_many() {
        let capacity = 4;
        let mut trail = RingTrail::new(capacity);
        for i in 1..=11u32 {
            trail.push(i);
        }
        assert_eq!(
            trail.snapshot().copied().collect::<Vec<_>>(),
            vec![8, 9, 10, 11]
        );
        assert_eq!(trail.newest(), Some(&11));
        assert_eq!(trail.oldest(), Some(&8));
    }

    #[test]
    fn test_snapshot_is_restartable() {
        let mut trail = RingTrail::new(2);
        trail.push('x');
        trail.push('y');
        trail.push('z');

        let snapshot = trail.snapshot();
        let first: Vec<_> = snapshot.clone().collect();
        let second: Vec<_> = snapshot.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![&'y', &'z']);
    }

    #[test]
    fn test_reverse_iteration() {
        let mut trail = RingTrail::new(3);
        for c in ['A', 'B', 'C', 'D'] {
            trail.push(c);
        }
        let newest_first: Vec<_> = trail.snapshot().rev().copied().collect();
        assert_eq!(newest_first, vec!['D', 'C', 'B']);
    }

    #[test]
    fn test_capacity_one() {
        let mut trail = RingTrail::new(1);
        trail.push('A');
        trail.push('B');
        assert_eq!(collect(&trail), vec!['B']);
        assert_eq!(trail.capacity(), 1);
    }

    #[test]
    fn test_clear_resets_window() {
        let mut trail = RingTrail::new(2);
        trail.push('A');
        trail.push('B');
        trail.push('C');
        trail.clear();
        assert!(trail.is_empty());
        trail.push('D');
        assert_eq!(collect(&trail), vec!['D']);
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn test_zero_capacity_panics() {
        let _ = RingTrail::<u8>::new(0);
    }
}
