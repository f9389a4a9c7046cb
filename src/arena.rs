//! Arena - Fixed-capacity node storage for the price-level tree.
//!
//! The arena pre-allocates one node per tick level at startup, so the
//! tree never grows and never touches the heap after construction.
//! Slots are handed out by a [`SlotAllocator`] bitmap, lowest free first.

use std::fmt;

use crate::bitmap::SlotAllocator;

/// Type alias for arena indices - our "compressed pointers".
/// A node's identity and its slot index are the same thing.
pub type ArenaIndex = u32;

/// A single price level in the tree.
///
/// | Field  | Type                | Size |
/// |--------|---------------------|------|
/// | price  | u32                 | 4    |
/// | height | u32                 | 4    |
/// | left   | Option<ArenaIndex>  | 8    |
/// | right  | Option<ArenaIndex>  | 8    |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelNode {
    /// Tick level this node represents
    pub price: u32,

    /// Height of the subtree rooted here (leaf = 1)
    pub height: u32,

    /// Subtree of lower prices
    pub left: Option<ArenaIndex>,

    /// Subtree of higher prices
    pub right: Option<ArenaIndex>,
}

impl LevelNode {
    /// Create a fresh leaf for `price`
    #[inline]
    pub const fn leaf(price: u32) -> Self {
        Self {
            price,
            height: 1,
            left: None,
            right: None,
        }
    }

    /// Create an empty/unused node
    #[inline]
    pub const fn empty() -> Self {
        Self {
            price: 0,
            height: 0,
            left: None,
            right: None,
        }
    }
}

/// Pre-allocated node pool with bitmap-managed slots.
///
/// Only the tree holds an `Arena`; slot indices never leave the crate,
/// so every acquire is paired with exactly one release in the tree's
/// node-removal path.
pub struct Arena {
    /// Contiguous block of pre-allocated nodes
    nodes: Vec<LevelNode>,

    /// Free-slot bitmap
    slots: SlotAllocator,
}

impl Arena {
    /// Create a new arena with the specified capacity.
    ///
    /// # Panics
    /// Panics if capacity is `u32::MAX` (indices must fit in `ArenaIndex`).
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < u32::MAX, "Capacity must be less than u32::MAX");

        Self {
            nodes: vec![LevelNode::empty(); capacity as usize],
            slots: SlotAllocator::new(capacity),
        }
    }

    /// Allocate a leaf node for `price`.
    ///
    /// Returns `None` if the arena is full.
    #[inline]
    pub(crate) fn alloc(&mut self, price: u32) -> Option<ArenaIndex> {
        let index = self.slots.acquire()?;
        self.nodes[index as usize] = LevelNode::leaf(price);
        Some(index)
    }

    /// Return a node's slot to the pool.
    #[inline]
    pub(crate) fn free(&mut self, index: ArenaIndex) {
        self.nodes[index as usize] = LevelNode::empty();
        self.slots.release(index);
    }

    /// Get an immutable reference to a node.
    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &LevelNode {
        debug_assert!(!self.slots.is_free(index), "Access to free slot {index}");
        &self.nodes[index as usize]
    }

    /// Get a mutable reference to a node.
    #[inline]
    pub(crate) fn get_mut(&mut self, index: ArenaIndex) -> &mut LevelNode {
        debug_assert!(!self.slots.is_free(index), "Access to free slot {index}");
        &mut self.nodes[index as usize]
    }

    /// Returns the number of currently allocated nodes.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.slots.acquired()
    }

    /// Returns the total capacity of the arena.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.slots.capacity()
    }

    /// Returns true if the arena is empty (no allocated nodes).
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.acquired() == 0
    }

    /// Returns true if the arena is full (no free nodes).
    #[cfg(test)]
    pub fn is_full(&self) -> bool {
        self.slots.is_exhausted()
    }

    /// Pre-fault all memory pages (warm-up routine).
    ///
    /// Writes every free node so the OS maps the backing pages before
    /// the hot path needs them. Live nodes are left untouched.
    pub fn warm_up(&mut self) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if self.slots.is_free(index as u32) {
                *node = LevelNode::empty();
            }
        }
        std::hint::black_box(&self.nodes);
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("allocated", &self.allocated())
            .finish()
    }
}
