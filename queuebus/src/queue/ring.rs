//! Array-backed FIFO buffer with compaction and bounded doubling.
//!
//! Live elements occupy `[head, tail)` of the backing vector. Removing from
//! the front only advances `head`; the slack it leaves behind is reclaimed by
//! compaction (shifting the live range down to offset 0) or by the copy made
//! when the buffer grows. `RingBuffer` does no locking; [`super::EventQueue`]
//! wraps it in a mutex.

use crate::error::{QueueError, QueueResult};

/// Hard ceiling on occupied slots used when none is configured.
pub const DEFAULT_MAX_CAPACITY: usize = 8192;

/// Default share of the buffer, in percent, that must lie before `head`
/// before it is compacted instead of grown.
pub const DEFAULT_COMPACTION_THRESHOLD_PERCENT: u8 = 50;

/// Unsynchronized FIFO buffer implementing the queue's growth policy.
///
/// Invariants:
/// - `head <= tail <= buffer.len()`
/// - every slot in `[head, tail)` is `Some`, every other slot is `None`
/// - `head == tail` implies `head == tail == 0`
/// - `tail - head <= max_capacity` and `buffer.len() <= max_capacity`
///
/// # Examples
///
/// ```rust
/// use queuebus::queue::RingBuffer;
///
/// let mut ring = RingBuffer::new();
/// ring.push("a").unwrap();
/// ring.push("b").unwrap();
///
/// assert_eq!(ring.pop(), Some("a"));
/// assert_eq!(ring.snapshot(), vec!["b"]);
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<Option<T>>,
    head: usize,
    tail: usize,
    max_capacity: usize,
    compaction_threshold_percent: u8,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer with the default policy.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            head: 0,
            tail: 0,
            max_capacity: DEFAULT_MAX_CAPACITY,
            compaction_threshold_percent: DEFAULT_COMPACTION_THRESHOLD_PERCENT,
        }
    }

    /// Creates an empty buffer with an explicit policy.
    ///
    /// `initial_capacity` is clamped to `max_capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidArgument`] if `max_capacity` is zero or
    /// `compaction_threshold_percent` is above 100.
    pub fn with_policy(
        initial_capacity: usize,
        max_capacity: usize,
        compaction_threshold_percent: u8,
    ) -> QueueResult<Self> {
        if max_capacity == 0 {
            return Err(QueueError::invalid_argument(
                "max_capacity must be greater than zero",
            ));
        }
        if compaction_threshold_percent > 100 {
            return Err(QueueError::invalid_argument(format!(
                "compaction_threshold_percent must be at most 100, got {}",
                compaction_threshold_percent
            )));
        }

        let mut buffer = Vec::new();
        buffer.resize_with(initial_capacity.min(max_capacity), || None);

        Ok(Self {
            buffer,
            head: 0,
            tail: 0,
            max_capacity,
            compaction_threshold_percent,
        })
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    /// Returns `true` if there are no live elements.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The hard ceiling on live elements.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Slots still available before the hard ceiling is hit.
    pub fn remaining(&self) -> usize {
        self.max_capacity - self.len()
    }

    /// Appends one element.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::CapacityExceeded`] when `max_capacity` elements
    /// are already live. The buffer is unchanged in that case.
    pub fn push(&mut self, item: T) -> QueueResult<()> {
        self.reserve(1)?;
        self.buffer[self.tail] = Some(item);
        self.tail += 1;
        Ok(())
    }

    /// Appends every element of `items` in order, or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::CapacityExceeded`] when the batch does not fit
    /// next to the live elements.
    pub fn push_all<I>(&mut self, items: I) -> QueueResult<()>
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }

        self.reserve(items.len())?;
        for item in items {
            self.buffer[self.tail] = Some(item);
            self.tail += 1;
        }
        Ok(())
    }

    /// Removes and returns the oldest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let item = self.buffer[self.head].take();
        self.head += 1;
        self.normalize();
        item
    }

    /// Returns the oldest element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.buffer[self.head].as_ref()
    }

    /// Iterates over the live elements in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.buffer[self.head..self.tail].iter().flatten()
    }

    /// Drops every live element. The allocation is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.buffer[self.head..self.tail] {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
    }

    /// Keeps only the elements for which `keep` returns `true`, in order.
    ///
    /// Returns the number of elements removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.len();
        let mut write = self.head;

        for read in self.head..self.tail {
            let Some(item) = self.buffer[read].take() else {
                continue;
            };
            if keep(&item) {
                self.buffer[write] = Some(item);
                write += 1;
            }
        }

        self.tail = write;
        self.normalize();
        before - self.len()
    }

    /// Removes the element at live position `index` (0 is the oldest),
    /// shifting everything after it down by one.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.len() {
            return None;
        }

        let position = self.head + index;
        let item = self.buffer[position].take();
        for slot in position + 1..self.tail {
            self.buffer[slot - 1] = self.buffer[slot].take();
        }
        self.tail -= 1;
        self.normalize();
        item
    }

    /// Makes room for `additional` elements after `tail`.
    ///
    /// Slack before `head` is reclaimed by compaction once it exceeds the
    /// threshold; otherwise the buffer doubles (from 1 when empty) up to
    /// `max_capacity`. When growth is capped, compaction runs regardless of
    /// the threshold so that every free slot can be used.
    fn reserve(&mut self, additional: usize) -> QueueResult<()> {
        let live = self.len();
        if additional > self.max_capacity || live > self.max_capacity - additional {
            return Err(QueueError::capacity_exceeded(self.max_capacity));
        }

        if self.free_at_end() >= additional {
            return Ok(());
        }

        if self.should_compact() {
            self.compact();
            if self.free_at_end() >= additional {
                return Ok(());
            }
        }

        let mut new_capacity = self.capacity();
        while new_capacity < self.max_capacity {
            new_capacity = if new_capacity == 0 { 1 } else { new_capacity * 2 };
            new_capacity = new_capacity.min(self.max_capacity);
            if new_capacity - live >= additional {
                break;
            }
        }

        if new_capacity > self.capacity() {
            self.grow(new_capacity);
        } else {
            self.compact();
        }

        debug_assert!(self.free_at_end() >= additional);
        Ok(())
    }

    fn free_at_end(&self) -> usize {
        self.capacity() - self.tail
    }

    fn should_compact(&self) -> bool {
        let capacity = self.capacity();
        capacity > 0 && self.head * 100 > capacity * usize::from(self.compaction_threshold_percent)
    }

    /// Moves `[head, tail)` down to `[0, tail - head)` in place.
    fn compact(&mut self) {
        if self.head == 0 {
            return;
        }

        let live = self.len();
        for offset in 0..live {
            let item = self.buffer[self.head + offset].take();
            self.buffer[offset] = item;
        }
        self.head = 0;
        self.tail = live;
    }

    /// Reallocates to `new_capacity` slots with the live range at offset 0.
    fn grow(&mut self, new_capacity: usize) {
        let mut next: Vec<Option<T>> = Vec::with_capacity(new_capacity);
        next.extend(self.buffer[self.head..self.tail].iter_mut().map(Option::take));
        next.resize_with(new_capacity, || None);

        self.tail -= self.head;
        self.head = 0;
        self.buffer = next;
    }

    fn normalize(&mut self) {
        if self.head >= self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the live elements out in FIFO order.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: PartialEq> RingBuffer<T> {
    /// Returns `true` if a live element equals `item`.
    pub fn contains(&self, item: &T) -> bool {
        self.iter().any(|live| live == item)
    }

    /// Removes the first live element equal to `item`.
    pub fn remove(&mut self, item: &T) -> bool {
        let position = self.iter().position(|live| live == item);
        match position {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(max: usize, threshold: u8) -> RingBuffer<u32> {
        RingBuffer::with_policy(0, max, threshold).expect("valid policy")
    }

    #[test]
    fn test_fifo_order() {
        let mut ring = RingBuffer::new();
        ring.push('A').unwrap();
        ring.push('B').unwrap();
        ring.push('C').unwrap();

        assert_eq!(ring.pop(), Some('A'));
        assert_eq!(ring.pop(), Some('B'));
        assert_eq!(ring.pop(), Some('C'));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_capacity_doubles_from_one() {
        let mut ring = ring(64, 50);
        assert_eq!(ring.capacity(), 0);

        ring.push(1).unwrap();
        assert_eq!(ring.capacity(), 1);
        ring.push(2).unwrap();
        assert_eq!(ring.capacity(), 2);
        ring.push(3).unwrap();
        assert_eq!(ring.capacity(), 4);
        ring.push(4).unwrap();
        ring.push(5).unwrap();
        assert_eq!(ring.capacity(), 8);
    }

    #[test]
    fn test_growth_is_capped_at_max_capacity() {
        let mut ring = ring(6, 50);
        for i in 0..6 {
            ring.push(i).unwrap();
        }

        assert_eq!(ring.capacity(), 6);
        assert_eq!(ring.push(6), Err(QueueError::capacity_exceeded(6)));
        assert_eq!(ring.snapshot(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_empty_queue_is_normalized() {
        let mut ring = ring(8, 50);
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        ring.pop();
        assert_eq!(ring.head, 1);

        ring.pop();
        assert_eq!((ring.head, ring.tail), (0, 0));
        assert!(ring.peek().is_none());
    }

    #[test]
    fn test_compaction_reuses_slack_without_growing() {
        let mut ring = ring(64, 50);
        for i in 0..8 {
            ring.push(i).unwrap();
        }
        assert_eq!(ring.capacity(), 8);

        // 5 of 8 slots before head is above the 50% threshold.
        for _ in 0..5 {
            ring.pop();
        }
        ring.push(8).unwrap();

        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.head, 0);
        assert_eq!(ring.snapshot(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_below_threshold_grows_instead_of_compacting() {
        let mut ring = ring(64, 50);
        for i in 0..8 {
            ring.push(i).unwrap();
        }

        // 2 of 8 slots before head stays under the threshold.
        ring.pop();
        ring.pop();
        ring.push(8).unwrap();

        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.head, 0);
        assert_eq!(ring.snapshot(), vec![2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_full_at_max_compacts_regardless_of_threshold() {
        let mut ring = ring(8, 100);
        for i in 0..8 {
            ring.push(i).unwrap();
        }
        ring.pop();

        ring.push(8).unwrap();
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.snapshot(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(ring.push(9).is_err());
    }

    #[test]
    fn test_push_all_is_all_or_nothing() {
        let mut ring = ring(4, 50);
        ring.push(0).unwrap();

        assert_eq!(
            ring.push_all(vec![1, 2, 3, 4]),
            Err(QueueError::capacity_exceeded(4))
        );
        assert_eq!(ring.snapshot(), vec![0]);

        ring.push_all(vec![1, 2, 3]).unwrap();
        assert_eq!(ring.snapshot(), vec![0, 1, 2, 3]);

        assert!(ring.push_all(Vec::new()).is_ok());
    }

    #[test]
    fn test_push_all_larger_than_max() {
        let mut ring = ring(4, 50);
        assert!(ring.push_all(0..5).is_err());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_remove_and_contains() {
        let mut ring = ring(16, 50);
        ring.push_all(vec![1, 2, 3, 2]).unwrap();
        ring.pop();

        assert!(ring.contains(&2));
        assert!(!ring.contains(&1));

        assert!(ring.remove(&2));
        assert_eq!(ring.snapshot(), vec![3, 2]);
        assert!(!ring.remove(&7));

        assert_eq!(ring.remove_at(1), Some(2));
        assert_eq!(ring.remove_at(5), None);
        assert_eq!(ring.snapshot(), vec![3]);
    }

    #[test]
    fn test_retain() {
        let mut ring = ring(16, 50);
        ring.push_all(0..10).unwrap();
        ring.pop();

        let removed = ring.retain(|v| v % 2 == 0);
        assert_eq!(removed, 5);
        assert_eq!(ring.snapshot(), vec![2, 4, 6, 8]);

        assert_eq!(ring.retain(|_| false), 4);
        assert!(ring.is_empty());
        assert_eq!((ring.head, ring.tail), (0, 0));
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut ring = ring(16, 50);
        ring.push_all(0..5).unwrap();
        let capacity = ring.capacity();

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), capacity);
        assert!(ring.buffer.iter().all(Option::is_none));
    }

    #[test]
    fn test_invalid_policy() {
        assert!(matches!(
            RingBuffer::<u8>::with_policy(0, 0, 50),
            Err(QueueError::InvalidArgument { .. })
        ));
        assert!(matches!(
            RingBuffer::<u8>::with_policy(0, 8, 101),
            Err(QueueError::InvalidArgument { .. })
        ));

        let ring = RingBuffer::<u8>::with_policy(100, 8, 50).unwrap();
        assert_eq!(ring.capacity(), 8);
    }

    #[test]
    fn test_default_max_capacity() {
        let mut ring = RingBuffer::new();
        for i in 0..DEFAULT_MAX_CAPACITY {
            ring.push(i).unwrap();
        }

        assert_eq!(ring.len(), 8192);
        assert_eq!(ring.capacity(), 8192);
        assert_eq!(ring.remaining(), 0);
        assert_eq!(ring.push(8192), Err(QueueError::capacity_exceeded(8192)));
        assert_eq!(ring.peek(), Some(&0));
    }
}
