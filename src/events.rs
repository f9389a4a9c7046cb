//! Book events and the observer interface.
//!
//! The matching engine reports every state change through an
//! [`EventSink`]. The default [`NullSink`] discards everything, so the
//! core is silent unless a collaborator (logger, depth renderer, market
//! data publisher) subscribes.

use crate::command::{OrderType, RejectReason, Side};
use crate::order::OrderId;

/// Order accepted and resting in the book
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OrderAdded {
    pub order_id: OrderId,
    pub side: Side,
    pub price: u32,
    pub size: u64,
    pub order_type: OrderType,
}

/// A bid and an ask traded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Trade {
    /// Execution price
    pub price: u32,
    /// Executed quantity
    pub size: u64,
    pub bid_order_id: OrderId,
    pub ask_order_id: OrderId,
}

/// Why a resting order left the book without trading
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CancelReason {
    /// Fill-or-kill order could not be fully filled from opposing volume
    InsufficientVolume = 0,
    /// Level queue was full and the oldest order was dropped
    Overwritten = 1,
}

/// Order removed without trading
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OrderCanceled {
    pub order_id: OrderId,
    pub side: Side,
    pub price: u32,
    /// Remaining quantity that was canceled
    pub canceled_size: u64,
    pub reason: CancelReason,
}

/// Last order at a level left; the level is gone from the index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LevelCleared {
    pub side: Side,
    pub price: u32,
}

/// A stop-limit reached the front of matching and moved to its limit level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StopTriggered {
    pub order_id: OrderId,
    pub side: Side,
    pub trigger_price: u32,
    pub limit_price: u32,
    pub size: u64,
}

/// Order refused at submission; nothing changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OrderRejected {
    pub side: Side,
    pub price: u32,
    pub reason: RejectReason,
}

/// Output events from the matching engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BookEvent {
    Added(OrderAdded),
    Trade(Trade),
    Canceled(OrderCanceled),
    LevelCleared(LevelCleared),
    StopTriggered(StopTriggered),
    Rejected(OrderRejected),
}

/// Observer of book state changes. Every hook defaults to a no-op.
pub trait EventSink {
    fn on_order_added(&mut self, _event: &OrderAdded) {}

    fn on_match(&mut self, _trade: &Trade) {}

    fn on_cancel(&mut self, _event: &OrderCanceled) {}

    fn on_level_cleared(&mut self, _event: &LevelCleared) {}

    fn on_stop_triggered(&mut self, _event: &StopTriggered) {}

    fn on_reject(&mut self, _event: &OrderRejected) {}
}

/// Sink that ignores every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {}

/// Record events in arrival order
impl EventSink for Vec<BookEvent> {
    fn on_order_added(&mut self, event: &OrderAdded) {
        self.push(BookEvent::Added(*event));
    }

    fn on_match(&mut self, trade: &Trade) {
        self.push(BookEvent::Trade(*trade));
    }

    fn on_cancel(&mut self, event: &OrderCanceled) {
        self.push(BookEvent::Canceled(*event));
    }

    fn on_level_cleared(&mut self, event: &LevelCleared) {
        self.push(BookEvent::LevelCleared(*event));
    }

    fn on_stop_triggered(&mut self, event: &StopTriggered) {
        self.push(BookEvent::StopTriggered(*event));
    }

    fn on_reject(&mut self, event: &OrderRejected) {
        self.push(BookEvent::Rejected(*event));
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_order_added(&mut self, event: &OrderAdded) {
        (**self).on_order_added(event);
    }

    fn on_match(&mut self, trade: &Trade) {
        (**self).on_match(trade);
    }

    fn on_cancel(&mut self, event: &OrderCanceled) {
        (**self).on_cancel(event);
    }

    fn on_level_cleared(&mut self, event: &LevelCleared) {
        (**self).on_level_cleared(event);
    }

    fn on_stop_triggered(&mut self, event: &StopTriggered) {
        (**self).on_stop_triggered(event);
    }

    fn on_reject(&mut self, event: &OrderRejected) {
        (**self).on_reject(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_records_in_order() {
        let mut events: Vec<BookEvent> = Vec::new();
        let trade = Trade {
            price: 10,
            size: 5,
            bid_order_id: 1,
            ask_order_id: 0,
        };
        let cleared = LevelCleared {
            side: Side::Ask,
            price: 10,
        };

        events.on_match(&trade);
        events.on_level_cleared(&cleared);

        assert_eq!(events, vec![BookEvent::Trade(trade), BookEvent::LevelCleared(cleared)]);
    }

    #[test]
    fn test_forwarding_through_reference() {
        fn reject_into<S: EventSink>(mut sink: S) {
            sink.on_reject(&OrderRejected {
                side: Side::Bid,
                price: 9,
                reason: RejectReason::PriceOutOfRange,
            });
        }

        let mut events: Vec<BookEvent> = Vec::new();
        reject_into(&mut events);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_null_sink_is_silent() {
        let mut sink = NullSink;
        sink.on_cancel(&OrderCanceled {
            order_id: 1,
            side: Side::Bid,
            price: 3,
            canceled_size: 4,
            reason: CancelReason::InsufficientVolume,
        });
    }
}
