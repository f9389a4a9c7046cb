//! Resting order record.

use crate::command::{OrderType, Side};

/// Book-assigned order identifier. Lower ids were placed earlier.
pub type OrderId = u64;

/// An order waiting in a price-level queue.
///
/// `size` is the remaining quantity; partial fills shrink it in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RestingOrder {
    pub id: OrderId,
    pub side: Side,
    pub size: u64,
    pub order_type: OrderType,
    /// Limit level of a not-yet-triggered stop-limit
    pub limit_price: Option<u32>,
}

impl RestingOrder {
    pub const fn new(
        id: OrderId,
        side: Side,
        size: u64,
        order_type: OrderType,
        limit_price: Option<u32>,
    ) -> Self {
        Self {
            id,
            side,
            size,
            order_type,
            limit_price,
        }
    }

    /// A plain limit order
    pub const fn limit(id: OrderId, side: Side, size: u64) -> Self {
        Self::new(id, side, size, OrderType::Limit, None)
    }

    #[inline]
    pub const fn is_stop_limit(&self) -> bool {
        matches!(self.order_type, OrderType::StopLimit)
    }

    #[inline]
    pub const fn is_fill_or_kill(&self) -> bool {
        matches!(self.order_type, OrderType::FillOrKill)
    }

    /// The limit order a triggered stop-limit turns into. Id and size carry over.
    #[inline]
    pub const fn promoted(self) -> Self {
        Self::limit(self.id, self.side, self.size)
    }

    /// Shrink after a partial fill.
    #[inline]
    pub fn reduce(&mut self, amount: u64) {
        debug_assert!(amount <= self.size, "Fill exceeds remaining size");
        self.size -= amount;
    }
}
