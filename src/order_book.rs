//! Side Book - One price-level queue per tick, indexed directly by price.
//!
//! The array is built once at construction. Queues are never destroyed
//! individually, only logically emptied, so queue lookup is a single
//! slice index.

use crate::command::Side;
use crate::error::BookError;
use crate::order::RestingOrder;
use crate::price_level::PriceLevelQueue;

/// Dense per-side order storage.
///
/// Mutating calls index the array directly and panic on a price outside
/// `[0, tick_levels)`; the matching engine validates prices first.
/// Queries treat out-of-range prices as empty.
#[derive(Clone)]
pub struct SideBook {
    side: Side,
    levels: Box<[PriceLevelQueue]>,
    order_count: usize,
}

impl SideBook {
    /// Create a side with `tick_levels` queues of `level_capacity` orders each
    pub fn new(side: Side, tick_levels: u32, level_capacity: usize) -> Self {
        let levels = (0..tick_levels)
            .map(|_| PriceLevelQueue::new(level_capacity))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            side,
            levels,
            order_count: 0,
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn tick_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Number of resting orders across all levels
    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_count
    }

    /// Get a price level
    #[inline]
    pub fn level(&self, price: u32) -> Option<&PriceLevelQueue> {
        self.levels.get(price as usize)
    }

    /// Append an order at `price`.
    ///
    /// # Returns
    /// The order dropped to make room, if the level was full.
    ///
    /// # Errors
    /// `VolumeOverflow` if the level's total volume would exceed `u64`;
    /// the level is left unchanged.
    #[inline]
    pub fn add(&mut self, price: u32, order: RestingOrder) -> Result<Option<RestingOrder>, BookError> {
        debug_assert_eq!(order.side, self.side);
        let dropped = self.levels[price as usize]
            .enqueue(order)
            .map_err(|refused| BookError::VolumeOverflow {
                side: self.side,
                price,
                size: refused.size,
            })?;
        if dropped.is_none() {
            self.order_count += 1;
        }
        Ok(dropped)
    }

    /// Returns true if an order of `size` can rest at `price` without
    /// overflowing the level volume. False out of range.
    #[inline]
    pub fn accepts(&self, price: u32, size: u64) -> bool {
        self.level(price).is_some_and(|level| level.accepts(size))
    }

    /// Remove and return the highest-priority order at `price`.
    #[inline]
    pub fn remove_head(&mut self, price: u32) -> Option<RestingOrder> {
        let order = self.levels[price as usize].dequeue()?;
        self.order_count -= 1;
        Some(order)
    }

    /// Peek at the highest-priority order at `price`.
    #[inline]
    pub fn peek_head(&self, price: u32) -> Option<&RestingOrder> {
        self.level(price)?.peek()
    }

    /// Partially fill the head order at `price`; returns its remaining size.
    #[inline]
    pub fn reduce_head(&mut self, price: u32, amount: u64) -> Option<u64> {
        self.levels[price as usize].reduce_head_size(amount)
    }

    /// Returns true if no order rests at `price`.
    #[inline]
    pub fn is_empty(&self, price: u32) -> bool {
        self.level(price).map_or(true, PriceLevelQueue::is_empty)
    }

    /// Total resting quantity at `price`.
    #[inline]
    pub fn total_volume(&self, price: u32) -> u64 {
        self.level(price).map_or(0, PriceLevelQueue::total_volume)
    }
}

impl std::fmt::Debug for SideBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideBook")
            .field("side", &self.side)
            .field("tick_levels", &self.levels.len())
            .field("order_count", &self.order_count)
            .finish()
    }
}
