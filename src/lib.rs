//! # Tick-LOB
//!
//! A single-instrument limit order book over a bounded integer price grid.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: One thread owns the book exclusively (no locks)
//! - **Dense Levels**: Every tick has a pre-allocated FIFO queue, so level lookup is an index
//! - **Balanced Index**: Occupied prices per side live in an AVL tree for O(log n) best-price queries
//! - **Arena Allocation**: Tree nodes come from a fixed arena with a bitmap slot allocator
//!
//! ## Architecture
//!
//! ```text
//! [AddOrder / Match] --> [MatchingEngine] --> [EventSink]
//!                          |          |
//!                [PriceLevelIndex]  [SideBook]
//!                 (AVL per side)   (queue per tick)
//! ```

mod arena;
mod bitmap;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod level_index;
pub mod matching;
pub mod order;
pub mod order_book;
pub mod price_level;

// Re-exports for convenience
pub use command::{AddOrder, Command, OrderType, RejectReason, Side};
pub use config::BookConfig;
pub use engine::Engine;
pub use error::BookError;
pub use events::{
    BookEvent, CancelReason, EventSink, LevelCleared, NullSink, OrderAdded, OrderCanceled,
    OrderRejected, StopTriggered, Trade,
};
pub use level_index::PriceLevelIndex;
pub use matching::{AddResult, MatchingEngine};
pub use order::{OrderId, RestingOrder};
pub use order_book::SideBook;
pub use price_level::PriceLevelQueue;
