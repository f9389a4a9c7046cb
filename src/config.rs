//! Book configuration.

use serde::{Deserialize, Serialize};

use crate::error::BookError;

/// Default number of resting orders a single price level can hold.
pub const DEFAULT_LEVEL_CAPACITY: usize = 10;

/// Default number of tick levels per side.
pub const DEFAULT_TICK_LEVELS: u32 = 1_000;

/// Sizing for a book. Both values are fixed for the book's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Number of tick levels `N`; valid prices are `[0, N)`
    pub tick_levels: u32,
    /// Per-level queue capacity `C`; the oldest order is dropped beyond it
    pub level_capacity: usize,
}

impl BookConfig {
    /// Config for `tick_levels` levels with the default queue capacity
    pub const fn new(tick_levels: u32) -> Self {
        Self {
            tick_levels,
            level_capacity: DEFAULT_LEVEL_CAPACITY,
        }
    }

    /// Override the per-level queue capacity
    pub const fn with_level_capacity(mut self, level_capacity: usize) -> Self {
        self.level_capacity = level_capacity;
        self
    }

    /// Check the config can back a book.
    pub fn validate(&self) -> Result<(), BookError> {
        if self.tick_levels == 0 {
            return Err(BookError::InvalidConfig("tick_levels must be positive".into()));
        }
        if self.tick_levels == u32::MAX {
            return Err(BookError::InvalidConfig(
                "tick_levels must be less than u32::MAX".into(),
            ));
        }
        if self.level_capacity == 0 {
            return Err(BookError::InvalidConfig(
                "level_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_LEVELS)
    }
}
