//! Price Level - A bounded FIFO of resting orders at a single tick.
//!
//! A ring buffer over a slice allocated once at construction. When the
//! ring is full, enqueueing drops the oldest order (drop-oldest
//! backpressure) and hands it back to the caller.

use crate::order::RestingOrder;

/// A queue of orders at a specific price level.
///
/// Orders are processed in FIFO order (price-time priority).
/// `volume` always equals the sum of the enqueued orders' sizes.
#[derive(Clone, Debug)]
pub struct PriceLevelQueue {
    /// Ring storage; `None` marks an unused slot
    slots: Box<[Option<RestingOrder>]>,
    /// Slot of the oldest order (highest priority, first to match)
    head: usize,
    /// Number of orders at this level
    len: usize,
    /// Total quantity across all orders at this level
    volume: u64,
}

impl PriceLevelQueue {
    /// Create a new empty level holding at most `capacity` orders.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Level capacity must be positive");
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            volume: 0,
        }
    }

    /// Returns true if there are no orders at this level
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the next enqueue will drop the oldest order
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Total quantity resting at this level
    #[inline]
    pub fn total_volume(&self) -> u64 {
        self.volume
    }

    /// Returns true if enqueueing `size` keeps the level volume within `u64`.
    ///
    /// Accounts for the head order a full level would drop first.
    #[inline]
    pub fn accepts(&self, size: u64) -> bool {
        let dropped = if self.is_full() {
            self.peek().map_or(0, |head| head.size)
        } else {
            0
        };
        (self.volume - dropped).checked_add(size).is_some()
    }

    /// Append an order to the tail of the queue (newest order).
    ///
    /// # Returns
    /// `Ok` with the oldest order if the level was full and it had to be
    /// dropped. `Err` hands the order back untouched if the level volume
    /// would overflow.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn enqueue(&mut self, order: RestingOrder) -> Result<Option<RestingOrder>, RestingOrder> {
        if !self.accepts(order.size) {
            return Err(order);
        }
        let dropped = if self.is_full() { self.dequeue() } else { None };

        let tail = (self.head + self.len) % self.slots.len();
        debug_assert!(self.slots[tail].is_none());
        self.slots[tail] = Some(order);
        self.len += 1;
        self.volume += order.size;

        Ok(dropped)
    }

    /// Remove and return the head order (oldest/highest priority).
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn dequeue(&mut self) -> Option<RestingOrder> {
        if self.len == 0 {
            return None;
        }

        let order = self.slots[self.head].take()?;
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        self.volume -= order.size;

        Some(order)
    }

    /// Peek at the head order without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&RestingOrder> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Partially fill the head order without dequeuing it.
    ///
    /// # Returns
    /// The head's remaining size, or `None` if the level is empty.
    #[inline]
    pub fn reduce_head_size(&mut self, amount: u64) -> Option<u64> {
        if self.len == 0 {
            return None;
        }

        let head = self.slots[self.head].as_mut()?;
        head.reduce(amount);
        debug_assert!(self.volume >= amount);
        self.volume -= amount;

        Some(head.size)
    }

    /// Iterate resting orders from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> + '_ {
        let capacity = self.slots.len();
        (0..self.len).filter_map(move |offset| self.slots[(self.head + offset) % capacity].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{OrderType, Side};

    fn order(id: u64, size: u64) -> RestingOrder {
        RestingOrder::limit(id, Side::Ask, size)
    }

    #[test]
    fn test_empty_level() {
        let level = PriceLevelQueue::new(4);
        assert!(level.is_empty());
        assert_eq!(level.len(), 0);
        assert_eq!(level.total_volume(), 0);
        assert!(level.peek().is_none());
    }

    #[test]
    fn test_enqueue_dequeue() {
        let mut level = PriceLevelQueue::new(4);
        assert!(level.enqueue(order(1, 10)).unwrap().is_none());

        let popped = level.dequeue().unwrap();
        assert_eq!(popped.id, 1);
        assert!(level.is_empty());
        assert!(level.dequeue().is_none());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut level = PriceLevelQueue::new(4);
        level.enqueue(order(2, 99)).unwrap();
        level.enqueue(order(3, 99)).unwrap();
        level.enqueue(order(4, 99)).unwrap();

        assert_eq!(level.peek().unwrap().id, 2);
        assert_eq!(level.peek().unwrap().id, 2);
        assert_eq!(level.len(), 3);
    }

    #[test]
    fn test_fifo_order() {
        let mut level = PriceLevelQueue::new(4);
        for id in 1..=3 {
            level.enqueue(order(id, 5)).unwrap();
        }
        let ids: Vec<_> = std::iter::from_fn(|| level.dequeue()).map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_total_volume() {
        let mut level = PriceLevelQueue::new(4);
        assert_eq!(level.total_volume(), 0);

        level.enqueue(order(1, 99)).unwrap();
        level.enqueue(order(2, 2)).unwrap();
        assert_eq!(level.total_volume(), 101);

        level.dequeue();
        assert_eq!(level.total_volume(), 2);

        level.dequeue();
        assert_eq!(level.total_volume(), 0);
    }

    #[test]
    fn test_reduce_head_size() {
        let mut level = PriceLevelQueue::new(4);
        level.enqueue(order(1, 99)).unwrap();
        level.enqueue(order(2, 2)).unwrap();

        assert_eq!(level.reduce_head_size(2), Some(97));
        assert_eq!(level.total_volume(), 99);

        let head = level.dequeue().unwrap();
        assert_eq!(head.size, 97);
        assert_eq!(level.total_volume(), 2);
    }

    #[test]
    fn test_reduce_on_empty() {
        let mut level = PriceLevelQueue::new(2);
        assert_eq!(level.reduce_head_size(1), None);
    }

    #[test]
    fn test_wrap_around() {
        let mut level = PriceLevelQueue::new(3);
        for round in 0..5u64 {
            level.enqueue(order(round * 2, 1)).unwrap();
            level.enqueue(order(round * 2 + 1, 1)).unwrap();
            assert_eq!(level.dequeue().unwrap().id, round * 2);
            assert_eq!(level.dequeue().unwrap().id, round * 2 + 1);
        }
        assert!(level.is_empty());
        assert_eq!(level.total_volume(), 0);
    }

    #[test]
    fn test_full_drops_oldest() {
        let mut level = PriceLevelQueue::new(3);
        level.enqueue(order(1, 10)).unwrap();
        level.enqueue(order(2, 20)).unwrap();
        level.enqueue(order(3, 30)).unwrap();
        assert!(level.is_full());

        let dropped = level.enqueue(order(4, 40)).unwrap().expect("Oldest should be dropped");
        assert_eq!(dropped.id, 1);
        assert_eq!(level.len(), 3);
        assert_eq!(level.total_volume(), 90);

        let ids: Vec<_> = level.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_iter_preserves_fields() {
        let mut level = PriceLevelQueue::new(2);
        level.enqueue(RestingOrder::new(9, Side::Bid, 5, OrderType::StopLimit, Some(12))).unwrap();
        let first = level.iter().next().unwrap();
        assert_eq!(first.limit_price, Some(12));
        assert!(first.is_stop_limit());
    }

    #[test]
    fn test_volume_overflow_refused() {
        let mut level = PriceLevelQueue::new(4);
        level.enqueue(order(1, u64::MAX)).unwrap();
        assert!(!level.accepts(1));

        let refused = level.enqueue(order(2, 2)).unwrap_err();
        assert_eq!(refused.id, 2);
        assert_eq!(level.len(), 1);
        assert_eq!(level.total_volume(), u64::MAX);
    }

    #[test]
    fn test_full_level_counts_dropped_head() {
        let mut level = PriceLevelQueue::new(2);
        level.enqueue(order(1, u64::MAX - 10)).unwrap();
        level.enqueue(order(2, 10)).unwrap();

        // The head is dropped first, so the new order fits
        assert!(level.accepts(u64::MAX - 10));
        let dropped = level.enqueue(order(3, u64::MAX - 10)).unwrap();
        assert_eq!(dropped.map(|o| o.id), Some(1));
        assert_eq!(level.total_volume(), u64::MAX);
    }
}
