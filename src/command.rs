//! Command types and the stable order codes callers agree on.
//!
//! Side codes: BID = 1, ASK = -1.
//! Order type codes: MARKET = 1, STOP_LIMIT = 2, LIMIT = 3, FILL_OR_KILL = 4.

/// Order side (bid = buy, ask = sell)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Side {
    /// Buy side (bids)
    Bid = 1,
    /// Sell side (asks)
    Ask = -1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Stable integer code
    #[inline]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for Side {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Side::Bid),
            -1 => Ok(Side::Ask),
            other => Err(other),
        }
    }
}

/// How an order interacts with the book
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderType {
    /// Sweep the opposite side immediately; rest any remainder as a limit
    Market = 1,
    /// Rest at the trigger price; becomes a limit at its limit price once matched against
    StopLimit = 2,
    /// Rest at the given price
    Limit = 3,
    /// Cancel unless fully fillable from the opposing best level
    FillOrKill = 4,
}

impl OrderType {
    /// Stable integer code
    #[inline]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for OrderType {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(OrderType::Market),
            2 => Ok(OrderType::StopLimit),
            3 => Ok(OrderType::Limit),
            4 => Ok(OrderType::FillOrKill),
            other => Err(other),
        }
    }
}

// ============================================================================
// Input Commands
// ============================================================================

/// Submit a new order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddOrder {
    /// Tick level (for stop-limits, the trigger level)
    pub price: u32,
    /// Order side (bid/ask)
    pub side: Side,
    /// Order quantity
    pub size: u64,
    /// Order type
    pub order_type: OrderType,
    /// Limit level a stop-limit becomes active at
    pub limit_price: Option<u32>,
}

impl AddOrder {
    /// A limit order resting at `price`
    pub const fn limit(side: Side, price: u32, size: u64) -> Self {
        Self {
            price,
            side,
            size,
            order_type: OrderType::Limit,
            limit_price: None,
        }
    }

    /// A market order; `price` is where an unswept remainder rests if nothing is touched
    pub const fn market(side: Side, price: u32, size: u64) -> Self {
        Self {
            price,
            side,
            size,
            order_type: OrderType::Market,
            limit_price: None,
        }
    }

    /// A stop-limit resting at `trigger`, promoted to a limit at `limit_price`
    pub const fn stop_limit(side: Side, trigger: u32, limit_price: u32, size: u64) -> Self {
        Self {
            price: trigger,
            side,
            size,
            order_type: OrderType::StopLimit,
            limit_price: Some(limit_price),
        }
    }

    /// A fill-or-kill order resting at `price`
    pub const fn fill_or_kill(side: Side, price: u32, size: u64) -> Self {
        Self {
            price,
            side,
            size,
            order_type: OrderType::FillOrKill,
            limit_price: None,
        }
    }
}

/// Input commands for the engine driver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Submit a new order
    Add(AddOrder),
    /// Drain all currently crossable orders
    Match,
}

/// Reasons for order rejection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RejectReason {
    /// Price is not below the tick-level count
    PriceOutOfRange = 0,
    /// Zero quantity
    InvalidSize = 1,
    /// Stop-limit submitted without a limit price
    MissingLimitPrice = 2,
    /// Stop-limit limit price is not below the tick-level count
    LimitPriceOutOfRange = 3,
    /// Resting the order would overflow the level's total volume
    VolumeOverflow = 4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }

    #[test]
    fn test_stable_codes() {
        assert_eq!(Side::Bid.code(), 1);
        assert_eq!(Side::Ask.code(), -1);
        assert_eq!(OrderType::Market.code(), 1);
        assert_eq!(OrderType::StopLimit.code(), 2);
        assert_eq!(OrderType::Limit.code(), 3);
        assert_eq!(OrderType::FillOrKill.code(), 4);
    }

    #[test]
    fn test_codes_parse() {
        assert_eq!(Side::try_from(-1), Ok(Side::Ask));
        assert_eq!(Side::try_from(0), Err(0));
        assert_eq!(OrderType::try_from(4), Ok(OrderType::FillOrKill));
        assert_eq!(OrderType::try_from(5), Err(5));
    }

    #[test]
    fn test_add_order_constructors() {
        let stop = AddOrder::stop_limit(Side::Ask, 200, 210, 7);
        assert_eq!(stop.price, 200);
        assert_eq!(stop.limit_price, Some(210));
        assert_eq!(stop.order_type, OrderType::StopLimit);

        let market = AddOrder::market(Side::Bid, 500, 10);
        assert_eq!(market.order_type, OrderType::Market);
        assert_eq!(market.limit_price, None);
    }

    #[test]
    fn test_command_variants() {
        let add = Command::Add(AddOrder::limit(Side::Bid, 100, 10));

        match add {
            Command::Add(o) => assert_eq!(o.price, 100),
            _ => panic!("Expected Add"),
        }
        assert_eq!(Command::Match, Command::Match);
    }
}
