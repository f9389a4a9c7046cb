//! Error types for faults the book cannot resolve locally.
//!
//! Business outcomes (rejections, fill-or-kill cancels) are not errors;
//! they are reported through [`crate::matching::AddResult`] and events.

use crate::command::Side;

/// Internal-consistency and configuration faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    /// The tree arena had no free slot for a new level
    #[error("No free arena slot for price level {price}")]
    SlotsExhausted {
        /// Level that could not be inserted
        price: u32,
    },

    /// Price outside the book's tick range
    #[error("Price level {price} out of range (tick levels: {tick_levels})")]
    PriceOutOfRange {
        /// Offending price
        price: u32,
        /// Configured tick-level count
        tick_levels: u32,
    },

    /// A level present in the index has no resting orders
    #[error("{side:?} level {price} is indexed but its queue is empty")]
    EmptyLevel {
        /// Side of the inconsistent level
        side: Side,
        /// Inconsistent price
        price: u32,
    },

    /// Resting an order would push a level's total volume past `u64::MAX`
    #[error("{side:?} level {price} cannot take {size} more without volume overflow")]
    VolumeOverflow {
        /// Side of the level
        side: Side,
        /// Level price
        price: u32,
        /// Size of the refused order
        size: u64,
    },

    /// Book configuration cannot be used
    #[error("Invalid book configuration: {0}")]
    InvalidConfig(String),
}
