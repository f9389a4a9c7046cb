//! Matching Engine - The book and its matching algorithms.
//!
//! Owns one [`PriceLevelIndex`] and one [`SideBook`] per side:
//! 1. ADD: market orders sweep the opposite side; everything else rests
//!    at its own price after the price is registered in its side's index
//! 2. MATCH: consume both index extremes until best bid < best ask,
//!    promoting stop-limits and killing unfillable fill-or-kills on the way
//!
//! The index and the queues are kept in lockstep: a level is in the
//! index exactly while its queue holds at least one order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, error, trace, warn};

use crate::command::{AddOrder, OrderType, RejectReason, Side};
use crate::config::BookConfig;
use crate::error::BookError;
use crate::events::{
    CancelReason, EventSink, LevelCleared, NullSink, OrderAdded, OrderCanceled, OrderRejected,
    StopTriggered, Trade,
};
use crate::level_index::{Levels, PriceLevelIndex};
use crate::order::{OrderId, RestingOrder};
use crate::order_book::SideBook;
use crate::price_level::PriceLevelQueue;

/// Outcome of submitting an order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddResult {
    /// Order (or its unfilled remainder) is resting in the book
    Resting {
        order_id: OrderId,
        price: u32,
        remaining: u64,
    },
    /// Market order fully filled during its sweep
    Filled { order_id: OrderId },
    /// Order refused; the book is unchanged
    Rejected(RejectReason),
}

/// The limit order book and matching engine core
pub struct MatchingEngine<S: EventSink = NullSink> {
    config: BookConfig,
    bid_index: PriceLevelIndex,
    ask_index: PriceLevelIndex,
    bids: SideBook,
    asks: SideBook,
    /// Id handed to the next accepted order
    next_order_id: OrderId,
    sink: S,
}

impl MatchingEngine<NullSink> {
    /// Create a silent book with `tick_levels` levels per side and the
    /// default queue capacity.
    ///
    /// # Panics
    /// Panics if `tick_levels` is 0 or `u32::MAX`.
    pub fn new(tick_levels: u32) -> Self {
        let config = BookConfig::new(tick_levels);
        assert!(
            config.validate().is_ok(),
            "tick_levels must be in 1..u32::MAX"
        );
        Self::build(config, NullSink)
    }

    /// Create a silent book from a config
    pub fn with_config(config: BookConfig) -> Result<Self, BookError> {
        Self::with_sink(config, NullSink)
    }
}

impl<S: EventSink> MatchingEngine<S> {
    /// Create a book reporting to `sink`
    pub fn with_sink(config: BookConfig, sink: S) -> Result<Self, BookError> {
        config.validate()?;
        Ok(Self::build(config, sink))
    }

    fn build(config: BookConfig, sink: S) -> Self {
        Self {
            config,
            bid_index: PriceLevelIndex::new(config.tick_levels),
            ask_index: PriceLevelIndex::new(config.tick_levels),
            bids: SideBook::new(Side::Bid, config.tick_levels, config.level_capacity),
            asks: SideBook::new(Side::Ask, config.tick_levels, config.level_capacity),
            next_order_id: 0,
            sink,
        }
    }

    // ========================================================================
    // Order Entry
    // ========================================================================

    /// Submit an order.
    ///
    /// # Algorithm
    /// 1. Validate; rejections leave the book untouched and use no id
    /// 2. Market orders sweep the opposite side, resting any remainder
    /// 3. Other types rest at their own price
    ///
    /// # Errors
    /// Internal-consistency faults, and `VolumeOverflow` when a market
    /// remainder cannot rest at the level its sweep ended on; see [`BookError`].
    pub fn add(&mut self, order: AddOrder) -> Result<AddResult, BookError> {
        if let Some(reason) = self.validate(&order) {
            debug!(side = ?order.side, price = order.price, ?reason, "order rejected");
            self.sink.on_reject(&OrderRejected {
                side: order.side,
                price: order.price,
                reason,
            });
            return Ok(AddResult::Rejected(reason));
        }

        let order_id = self.next_order_id;
        self.next_order_id += 1;

        match order.order_type {
            OrderType::Market => self.sweep(order_id, order.side, order.price, order.size),
            order_type => {
                let limit_price = order.limit_price.filter(|_| order_type == OrderType::StopLimit);
                let resting =
                    RestingOrder::new(order_id, order.side, order.size, order_type, limit_price);
                self.rest(resting, order.price)?;
                Ok(AddResult::Resting {
                    order_id,
                    price: order.price,
                    remaining: order.size,
                })
            }
        }
    }

    fn validate(&self, order: &AddOrder) -> Option<RejectReason> {
        let tick_levels = self.config.tick_levels;
        if order.price >= tick_levels {
            return Some(RejectReason::PriceOutOfRange);
        }
        if order.size == 0 {
            return Some(RejectReason::InvalidSize);
        }
        if order.order_type == OrderType::StopLimit {
            match order.limit_price {
                None => return Some(RejectReason::MissingLimitPrice),
                Some(limit) if limit >= tick_levels => {
                    return Some(RejectReason::LimitPriceOutOfRange)
                }
                Some(_) => {}
            }
        }
        // A market order only rests at its own price if there is nothing to sweep
        let rests_at_price = order.order_type != OrderType::Market
            || self.index(order.side.opposite()).is_empty();
        if rests_at_price && !self.side_book(order.side).accepts(order.price, order.size) {
            return Some(RejectReason::VolumeOverflow);
        }
        None
    }

    /// Register `price` in the order's side index and enqueue the order.
    ///
    /// The volume check runs before the index is touched, so a refused
    /// order leaves both structures as they were.
    fn rest(&mut self, order: RestingOrder, price: u32) -> Result<(), BookError> {
        let side = order.side;
        let (index, book) = self.side_mut(side);
        if !book.accepts(price, order.size) {
            error!(order_id = order.id, ?side, price, size = order.size, "level volume would overflow");
            return Err(BookError::VolumeOverflow {
                side,
                price,
                size: order.size,
            });
        }
        index.insert(price)?;
        let dropped = book.add(price, order)?;

        if let Some(dropped) = dropped {
            warn!(
                order_id = dropped.id,
                ?side,
                price,
                size = dropped.size,
                "level queue full, dropping oldest resting order"
            );
            self.sink.on_cancel(&OrderCanceled {
                order_id: dropped.id,
                side,
                price,
                canceled_size: dropped.size,
                reason: CancelReason::Overwritten,
            });
        }
        self.sink.on_order_added(&OrderAdded {
            order_id: order.id,
            side,
            price,
            size: order.size,
            order_type: order.order_type,
        });
        Ok(())
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Returns true if both sides are non-empty and best bid >= best ask.
    #[inline]
    pub fn can_cross(&self) -> bool {
        self.crossing_prices().is_some()
    }

    #[inline]
    fn crossing_prices(&self) -> Option<(u32, u32)> {
        let bid = self.bid_index.max()?;
        let ask = self.ask_index.min()?;
        (bid >= ask).then_some((bid, ask))
    }

    /// Match resting orders until the book no longer crosses.
    ///
    /// The execution price is the price of whichever head order was
    /// placed first (lower id).
    ///
    /// # Returns
    /// Number of trades executed.
    pub fn match_orders(&mut self) -> Result<usize, BookError> {
        let mut trades = 0;

        while let Some((bid_price, ask_price)) = self.crossing_prices() {
            let bid = self.head(Side::Bid, bid_price)?;
            let ask = self.head(Side::Ask, ask_price)?;

            if bid.is_stop_limit() {
                self.trigger_stop(Side::Bid, bid_price)?;
                continue;
            }
            if ask.is_stop_limit() {
                self.trigger_stop(Side::Ask, ask_price)?;
                continue;
            }
            if bid.is_fill_or_kill() && self.asks.total_volume(ask_price) < bid.size {
                self.kill(Side::Bid, bid_price);
                continue;
            }
            if ask.is_fill_or_kill() && self.bids.total_volume(bid_price) < ask.size {
                self.kill(Side::Ask, ask_price);
                continue;
            }

            let price = if bid.id < ask.id { bid_price } else { ask_price };
            let size = bid.size.min(ask.size);
            self.fill_head(Side::Bid, bid_price, size);
            self.fill_head(Side::Ask, ask_price, size);
            self.record_trade(Trade {
                price,
                size,
                bid_order_id: bid.id,
                ask_order_id: ask.id,
            });
            trades += 1;

            self.clear_if_empty(Side::Bid, bid_price);
            self.clear_if_empty(Side::Ask, ask_price);
        }

        Ok(trades)
    }

    /// Walk a market order across the opposite side.
    ///
    /// There is no price bound: the sweep stops only when the order is
    /// filled or the opposite side is exhausted. A remainder rests as a
    /// limit order at the last level the sweep touched, or at `price`
    /// if it touched none.
    fn sweep(
        &mut self,
        order_id: OrderId,
        side: Side,
        price: u32,
        size: u64,
    ) -> Result<AddResult, BookError> {
        let opposite = side.opposite();
        let mut remaining = size;
        let mut last_price = price;

        while remaining > 0 {
            let best = match side {
                Side::Bid => self.ask_index.min(),
                Side::Ask => self.bid_index.max(),
            };
            let Some(best) = best else {
                break;
            };
            last_price = best;

            let resting = self.head(opposite, best)?;
            if resting.is_stop_limit() {
                self.trigger_stop(opposite, best)?;
                continue;
            }
            if resting.is_fill_or_kill() && remaining < resting.size {
                self.kill(opposite, best);
                continue;
            }

            let fill = remaining.min(resting.size);
            self.fill_head(opposite, best, fill);
            remaining -= fill;

            let (bid_order_id, ask_order_id) = match side {
                Side::Bid => (order_id, resting.id),
                Side::Ask => (resting.id, order_id),
            };
            self.record_trade(Trade {
                price: best,
                size: fill,
                bid_order_id,
                ask_order_id,
            });

            self.clear_if_empty(opposite, best);
        }

        if remaining == 0 {
            return Ok(AddResult::Filled { order_id });
        }

        debug!(order_id, ?side, last_price, remaining, "market order remainder resting as limit");
        self.rest(RestingOrder::limit(order_id, side, remaining), last_price)?;
        Ok(AddResult::Resting {
            order_id,
            price: last_price,
            remaining,
        })
    }

    /// Copy of the head order at an indexed level.
    fn head(&self, side: Side, price: u32) -> Result<RestingOrder, BookError> {
        self.side_book(side).peek_head(price).copied().ok_or_else(|| {
            error!(?side, price, "indexed level has no resting orders");
            BookError::EmptyLevel { side, price }
        })
    }

    /// Consume `amount` from the head order: dequeue it if that fills it,
    /// otherwise shrink it in place.
    fn fill_head(&mut self, side: Side, price: u32, amount: u64) {
        let (_, book) = self.side_mut(side);
        let head_size = book.peek_head(price).map(|order| order.size);
        match head_size {
            Some(size) if size > amount => {
                book.reduce_head(price, amount);
            }
            Some(_) => {
                book.remove_head(price);
            }
            None => {}
        }
    }

    /// Move a stop-limit head to its limit level as a plain limit order.
    ///
    /// A limit level that cannot take the order's volume is an error and
    /// leaves the stop resting where it is.
    fn trigger_stop(&mut self, side: Side, price: u32) -> Result<(), BookError> {
        let (_, book) = self.side_mut(side);
        let Some(&head) = book.peek_head(price) else {
            return Ok(());
        };
        let limit_price = head.limit_price.unwrap_or(price);
        if limit_price != price && !book.accepts(limit_price, head.size) {
            error!(order_id = head.id, ?side, limit_price, size = head.size, "stop-limit promotion would overflow level volume");
            return Err(BookError::VolumeOverflow {
                side,
                price: limit_price,
                size: head.size,
            });
        }
        let Some(order) = book.remove_head(price) else {
            return Ok(());
        };
        self.clear_if_empty(side, price);

        debug!(order_id = order.id, ?side, price, limit_price, "stop-limit triggered");
        self.sink.on_stop_triggered(&StopTriggered {
            order_id: order.id,
            side,
            trigger_price: price,
            limit_price,
            size: order.size,
        });

        self.rest(order.promoted(), limit_price)
    }

    /// Cancel a fill-or-kill head that cannot be fully filled.
    fn kill(&mut self, side: Side, price: u32) {
        let (_, book) = self.side_mut(side);
        let Some(order) = book.remove_head(price) else {
            return;
        };

        debug!(order_id = order.id, ?side, price, size = order.size, "fill-or-kill canceled, insufficient volume");
        self.sink.on_cancel(&OrderCanceled {
            order_id: order.id,
            side,
            price,
            canceled_size: order.size,
            reason: CancelReason::InsufficientVolume,
        });
        self.clear_if_empty(side, price);
    }

    /// Drop `price` from the side index once its queue is empty.
    fn clear_if_empty(&mut self, side: Side, price: u32) {
        let (index, book) = self.side_mut(side);
        if book.is_empty(price) && index.remove(price) {
            trace!(?side, price, "level cleared");
            self.sink.on_level_cleared(&LevelCleared { side, price });
        }
    }

    fn record_trade(&mut self, trade: Trade) {
        trace!(
            price = trade.price,
            size = trade.size,
            bid = trade.bid_order_id,
            ask = trade.ask_order_id,
            "trade"
        );
        self.sink.on_match(&trade);
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> (&mut PriceLevelIndex, &mut SideBook) {
        match side {
            Side::Bid => (&mut self.bid_index, &mut self.bids),
            Side::Ask => (&mut self.ask_index, &mut self.asks),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Highest bid level
    #[inline]
    pub fn best_bid(&self) -> Option<u32> {
        self.bid_index.max()
    }

    /// Lowest ask level
    #[inline]
    pub fn best_ask(&self) -> Option<u32> {
        self.ask_index.min()
    }

    /// Calculate spread (best_ask - best_bid) for an uncrossed book
    pub fn spread(&self) -> Option<u32> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    /// Returns true if no order rests at `price` on `side`
    #[inline]
    pub fn is_empty(&self, price: u32, side: Side) -> bool {
        self.side_book(side).is_empty(price)
    }

    /// Total resting quantity at `price` on `side`
    #[inline]
    pub fn total_volume(&self, price: u32, side: Side) -> u64 {
        self.side_book(side).total_volume(price)
    }

    /// Returns true if `price` is an occupied level on `side`
    #[inline]
    pub fn contains(&self, price: u32, side: Side) -> bool {
        self.index(side).contains(price)
    }

    /// Queue at `price` on `side`
    #[inline]
    pub fn level(&self, side: Side, price: u32) -> Option<&PriceLevelQueue> {
        self.side_book(side).level(price)
    }

    /// Occupied levels on `side`, lowest price first
    pub fn levels(&self, side: Side) -> Levels<'_> {
        self.index(side).iter()
    }

    /// Occupied levels on `side`, highest price first
    pub fn levels_rev(&self, side: Side) -> Levels<'_> {
        self.index(side).iter_rev()
    }

    /// Up to `max_levels` `(price, volume)` pairs, best price first
    pub fn depth(&self, side: Side, max_levels: usize) -> Vec<(u32, u64)> {
        let levels = match side {
            Side::Bid => self.levels_rev(side),
            Side::Ask => self.levels(side),
        };
        levels
            .take(max_levels)
            .map(|price| (price, self.total_volume(price, side)))
            .collect()
    }

    /// Price-level index for `side`
    #[inline]
    pub fn index(&self, side: Side) -> &PriceLevelIndex {
        match side {
            Side::Bid => &self.bid_index,
            Side::Ask => &self.ask_index,
        }
    }

    /// Order storage for `side`
    #[inline]
    pub fn side_book(&self, side: Side) -> &SideBook {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Resting orders on `side`
    #[inline]
    pub fn order_count(&self, side: Side) -> usize {
        self.side_book(side).order_count()
    }

    /// Returns true if nothing rests on either side
    #[inline]
    pub fn is_book_empty(&self) -> bool {
        self.bid_index.is_empty() && self.ask_index.is_empty()
    }

    /// Id the next accepted order will receive
    #[inline]
    pub fn next_order_id(&self) -> OrderId {
        self.next_order_id
    }

    #[inline]
    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    #[inline]
    pub fn tick_levels(&self) -> u32 {
        self.config.tick_levels
    }

    #[inline]
    pub fn level_capacity(&self) -> usize {
        self.config.level_capacity
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Warm up the book (pre-fault both arenas)
    pub fn warm_up(&mut self) {
        self.bid_index.warm_up();
        self.ask_index.warm_up();
    }

    /// Compute a hash of the current state (for determinism testing)
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.best_bid().hash(&mut hasher);
        self.best_ask().hash(&mut hasher);
        self.next_order_id.hash(&mut hasher);

        for side in [Side::Bid, Side::Ask] {
            side.hash(&mut hasher);
            for price in self.levels(side) {
                price.hash(&mut hasher);
                if let Some(level) = self.level(side, price) {
                    level.total_volume().hash(&mut hasher);
                    for order in level.iter() {
                        order.hash(&mut hasher);
                    }
                }
            }
        }

        hasher.finish()
    }
}

impl<S: EventSink> std::fmt::Debug for MatchingEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("tick_levels", &self.config.tick_levels)
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("bid_levels", &self.bid_index.len())
            .field("ask_levels", &self.ask_index.len())
            .field("next_order_id", &self.next_order_id)
            .finish()
    }
}
