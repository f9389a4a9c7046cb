//! Price Level Index - An AVL tree of occupied tick levels.
//!
//! Nodes live in a fixed `Arena` with one slot per tick level, so the
//! tree can hold every level at once and never allocates after
//! construction. Child links are arena indices; rotations and the
//! recursive insert/remove operate on indices only.
//!
//! A `PresenceIndex` mirrors membership, making `contains` and the
//! duplicate-insert check O(1).

use tracing::error;

use crate::arena::{Arena, ArenaIndex, LevelNode};
use crate::bitmap::PresenceIndex;
use crate::error::BookError;

/// Balanced index of occupied price levels for one side of the book.
pub struct PriceLevelIndex {
    /// Node storage, one slot per tick level
    arena: Arena,
    /// Bit per tick level, set while the level has a node
    presence: PresenceIndex,
    /// Root node, `None` when empty
    root: Option<ArenaIndex>,
    /// Number of tick levels `N`
    tick_levels: u32,
}

impl PriceLevelIndex {
    /// Create an empty index over prices `[0, tick_levels)`.
    pub fn new(tick_levels: u32) -> Self {
        Self {
            arena: Arena::new(tick_levels),
            presence: PresenceIndex::new(tick_levels),
            root: None,
            tick_levels,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns true if `price` has a node. Answered from the bitmap.
    #[inline]
    pub fn contains(&self, price: u32) -> bool {
        self.presence.is_set(price)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of occupied levels
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.allocated() as usize
    }

    #[inline]
    pub fn tick_levels(&self) -> u32 {
        self.tick_levels
    }

    /// Height of the tree (0 when empty)
    #[inline]
    pub fn height(&self) -> u32 {
        self.height_of(self.root)
    }

    /// Lowest occupied level
    #[inline]
    pub fn min(&self) -> Option<u32> {
        let mut current = self.root?;
        while let Some(left) = self.arena.get(current).left {
            current = left;
        }
        Some(self.arena.get(current).price)
    }

    /// Highest occupied level
    #[inline]
    pub fn max(&self) -> Option<u32> {
        let mut current = self.root?;
        while let Some(right) = self.arena.get(current).right {
            current = right;
        }
        Some(self.arena.get(current).price)
    }

    /// Occupied levels in ascending price order
    pub fn iter(&self) -> Levels<'_> {
        Levels::new(self, false)
    }

    /// Occupied levels in descending price order
    pub fn iter_rev(&self) -> Levels<'_> {
        Levels::new(self, true)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Register `price` as occupied.
    ///
    /// # Returns
    /// `Ok(true)` if a node was added, `Ok(false)` if the level was
    /// already present (silently ignored).
    ///
    /// # Errors
    /// `PriceOutOfRange` for `price >= tick_levels`. `SlotsExhausted` if
    /// the arena has no free slot, which the one-slot-per-level sizing
    /// makes unreachable unless the tree and bitmaps disagree.
    pub fn insert(&mut self, price: u32) -> Result<bool, BookError> {
        if price >= self.tick_levels {
            return Err(BookError::PriceOutOfRange {
                price,
                tick_levels: self.tick_levels,
            });
        }
        if self.presence.is_set(price) {
            return Ok(false);
        }

        let root = self.insert_at(self.root, price).inspect_err(|e| {
            error!(price, error = %e, "price level index out of arena slots");
        })?;
        self.root = Some(root);
        self.presence.set(price);
        Ok(true)
    }

    /// Unregister `price`.
    ///
    /// # Returns
    /// `true` if a node was removed, `false` if the level was absent.
    pub fn remove(&mut self, price: u32) -> bool {
        if !self.presence.is_set(price) {
            return false;
        }

        self.root = self.remove_at(self.root, price);
        self.presence.unset(price);
        true
    }

    fn insert_at(&mut self, node: Option<ArenaIndex>, price: u32) -> Result<ArenaIndex, BookError> {
        let Some(index) = node else {
            return self.arena.alloc(price).ok_or(BookError::SlotsExhausted { price });
        };

        let current = *self.arena.get(index);
        // Equal prices never get here (presence check), so the else arm is strictly greater
        if price < current.price {
            let left = self.insert_at(current.left, price)?;
            self.arena.get_mut(index).left = Some(left);
        } else {
            let right = self.insert_at(current.right, price)?;
            self.arena.get_mut(index).right = Some(right);
        }

        Ok(self.rebalance(index))
    }

    fn remove_at(&mut self, node: Option<ArenaIndex>, price: u32) -> Option<ArenaIndex> {
        let index = node?;
        let current = *self.arena.get(index);

        if price < current.price {
            let left = self.remove_at(current.left, price);
            self.arena.get_mut(index).left = left;
        } else if price > current.price {
            let right = self.remove_at(current.right, price);
            self.arena.get_mut(index).right = right;
        } else {
            match (current.left, current.right) {
                (Some(_), Some(right)) => {
                    // Two children: take over the in-order successor's price,
                    // then unlink the successor from the right subtree
                    let successor = self.leftmost(right);
                    let successor_price = self.arena.get(successor).price;
                    self.arena.get_mut(index).price = successor_price;
                    let right = self.remove_at(Some(right), successor_price);
                    self.arena.get_mut(index).right = right;
                }
                (child, None) | (None, child) => {
                    // The only place a slot is released
                    self.arena.free(index);
                    return child;
                }
            }
        }

        Some(self.rebalance(index))
    }

    // ========================================================================
    // Balancing
    // ========================================================================

    #[inline]
    fn height_of(&self, node: Option<ArenaIndex>) -> u32 {
        node.map_or(0, |index| self.arena.get(index).height)
    }

    #[inline]
    fn balance_factor(&self, index: ArenaIndex) -> i64 {
        let node = self.arena.get(index);
        i64::from(self.height_of(node.left)) - i64::from(self.height_of(node.right))
    }

    #[inline]
    fn update_height(&mut self, index: ArenaIndex) {
        let node = *self.arena.get(index);
        let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
        self.arena.get_mut(index).height = height;
    }

    fn leftmost(&self, mut index: ArenaIndex) -> ArenaIndex {
        while let Some(left) = self.arena.get(index).left {
            index = left;
        }
        index
    }

    /// Recompute the height of `index` and rotate if it is out of balance.
    ///
    /// Returns the root of the (possibly rotated) subtree.
    fn rebalance(&mut self, index: ArenaIndex) -> ArenaIndex {
        self.update_height(index);
        let balance = self.balance_factor(index);

        if balance > 1 {
            let Some(left) = self.arena.get(index).left else {
                return index;
            };
            if self.balance_factor(left) < 0 {
                // Left-right
                let pivot = self.rotate_left(left);
                self.arena.get_mut(index).left = Some(pivot);
            }
            // Left-left
            return self.rotate_right(index);
        }

        if balance < -1 {
            let Some(right) = self.arena.get(index).right else {
                return index;
            };
            if self.balance_factor(right) > 0 {
                // Right-left
                let pivot = self.rotate_right(right);
                self.arena.get_mut(index).right = Some(pivot);
            }
            // Right-right
            return self.rotate_left(index);
        }

        index
    }

    fn rotate_left(&mut self, index: ArenaIndex) -> ArenaIndex {
        let Some(pivot) = self.arena.get(index).right else {
            return index;
        };
        let inner = self.arena.get(pivot).left;

        self.arena.get_mut(pivot).left = Some(index);
        self.arena.get_mut(index).right = inner;
        self.update_height(index);
        self.update_height(pivot);
        pivot
    }

    fn rotate_right(&mut self, index: ArenaIndex) -> ArenaIndex {
        let Some(pivot) = self.arena.get(index).left else {
            return index;
        };
        let inner = self.arena.get(pivot).right;

        self.arena.get_mut(pivot).right = Some(index);
        self.arena.get_mut(index).left = inner;
        self.update_height(index);
        self.update_height(pivot);
        pivot
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Pre-fault the arena's pages
    pub fn warm_up(&mut self) {
        self.arena.warm_up();
    }

    /// Full structural check: BST ordering, stored heights, AVL balance,
    /// presence agreement and slot accounting.
    pub fn is_balanced(&self) -> bool {
        let mut visited = 0u32;
        let subtree_ok = self
            .check_subtree(self.root, None, None, &mut visited)
            .is_some();

        subtree_ok && visited == self.arena.allocated() && visited == self.presence.count()
    }

    /// Returns the subtree height if the subtree is valid.
    fn check_subtree(
        &self,
        node: Option<ArenaIndex>,
        lower: Option<u32>,
        upper: Option<u32>,
        visited: &mut u32,
    ) -> Option<u32> {
        let Some(index) = node else {
            return Some(0);
        };
        let LevelNode {
            price,
            height,
            left,
            right,
        } = *self.arena.get(index);

        if lower.is_some_and(|low| price <= low) || upper.is_some_and(|high| price >= high) {
            return None;
        }
        if !self.presence.is_set(price) {
            return None;
        }
        *visited += 1;

        let left_height = self.check_subtree(left, lower, Some(price), visited)?;
        let right_height = self.check_subtree(right, Some(price), upper, visited)?;

        let expected = 1 + left_height.max(right_height);
        if height != expected || left_height.abs_diff(right_height) > 1 {
            return None;
        }
        Some(expected)
    }
}

impl std::fmt::Debug for PriceLevelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceLevelIndex")
            .field("tick_levels", &self.tick_levels)
            .field("len", &self.len())
            .field("height", &self.height())
            .field("min", &self.min())
            .field("max", &self.max())
            .finish()
    }
}

/// In-order iterator over occupied levels.
///
/// Keeps an explicit stack of pending nodes, at most the tree height deep.
pub struct Levels<'a> {
    index: &'a PriceLevelIndex,
    stack: Vec<ArenaIndex>,
    descending: bool,
}

impl<'a> Levels<'a> {
    fn new(index: &'a PriceLevelIndex, descending: bool) -> Self {
        let mut levels = Self {
            index,
            stack: Vec::with_capacity(index.height() as usize),
            descending,
        };
        levels.push_spine(index.root);
        levels
    }

    /// Push `node` and its chain of nearer-first children
    fn push_spine(&mut self, mut node: Option<ArenaIndex>) {
        while let Some(index) = node {
            self.stack.push(index);
            let current = self.index.arena.get(index);
            node = if self.descending { current.right } else { current.left };
        }
    }
}

impl Iterator for Levels<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let index = self.stack.pop()?;
        let node = *self.index.arena.get(index);
        self.push_spine(if self.descending { node.left } else { node.right });
        Some(node.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(prices: &[u32]) -> PriceLevelIndex {
        let mut index = PriceLevelIndex::new(64);
        for &price in prices {
            index.insert(price).unwrap();
        }
        index
    }

    #[test]
    fn test_empty() {
        let index = PriceLevelIndex::new(10);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert_eq!(index.min(), None);
        assert_eq!(index.max(), None);
        assert!(index.is_balanced());
    }

    #[test]
    fn test_insert_remove_single() {
        let mut index = PriceLevelIndex::new(10);
        assert_eq!(index.insert(1), Ok(true));
        assert!(!index.is_empty());
        assert!(index.contains(1));

        assert!(index.remove(1));
        assert!(index.is_empty());
        assert!(!index.contains(1));
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut index = PriceLevelIndex::new(10);
        assert_eq!(index.insert(4), Ok(true));
        assert_eq!(index.insert(4), Ok(false));
        assert_eq!(index.len(), 1);

        assert!(index.remove(4));
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_absent() {
        let mut index = index_with(&[2, 4]);
        assert!(!index.remove(3));
        assert!(!index.remove(63));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_out_of_range_insert() {
        let mut index = PriceLevelIndex::new(10);
        assert_eq!(
            index.insert(10),
            Err(BookError::PriceOutOfRange {
                price: 10,
                tick_levels: 10
            })
        );
        assert!(index.is_empty());
    }

    #[test]
    fn test_min_max() {
        let mut index = index_with(&[2, 4, 1, 3]);
        assert_eq!(index.min(), Some(1));
        assert_eq!(index.max(), Some(4));

        index.remove(1);
        assert_eq!(index.min(), Some(2));

        index.remove(4);
        assert_eq!(index.max(), Some(3));
    }

    #[test]
    fn test_ascending_inserts_stay_balanced() {
        let mut index = PriceLevelIndex::new(1024);
        for price in 0..1023 {
            index.insert(price).unwrap();
            assert!(index.is_balanced(), "Unbalanced after inserting {price}");
        }
        // A perfect tree of 1023 nodes has height 10
        assert_eq!(index.height(), 10);
    }

    #[test]
    fn test_rotation_cases() {
        // Left-left, right-right, left-right, right-left
        for prices in [[3, 2, 1], [1, 2, 3], [3, 1, 2], [1, 3, 2]] {
            let index = index_with(&prices);
            assert!(index.is_balanced());
            assert_eq!(index.height(), 2, "Rotation expected for {prices:?}");
            assert_eq!(index.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_remove_two_children() {
        let mut index = index_with(&[20, 10, 30, 5, 15, 25, 35]);
        // Root has two children; its successor (25) takes its place
        assert!(index.remove(20));
        assert!(!index.contains(20));
        assert!(index.contains(25));
        assert!(index.is_balanced());
        assert_eq!(index.iter().collect::<Vec<_>>(), vec![5, 10, 15, 25, 30, 35]);
    }

    #[test]
    fn test_remove_rebalances() {
        let mut index = index_with(&[10, 5, 20, 15, 25, 30]);
        index.remove(5);
        assert!(index.is_balanced());
        assert_eq!(index.min(), Some(10));
    }

    #[test]
    fn test_iteration_orders() {
        let index = index_with(&[7, 3, 11, 1, 5, 9, 13]);
        assert_eq!(index.iter().collect::<Vec<_>>(), vec![1, 3, 5, 7, 9, 11, 13]);
        assert_eq!(index.iter_rev().collect::<Vec<_>>(), vec![13, 11, 9, 7, 5, 3, 1]);
    }

    #[test]
    fn test_fill_every_level() {
        let mut index = PriceLevelIndex::new(100);
        for price in (0..100).rev() {
            assert_eq!(index.insert(price), Ok(true));
        }
        assert_eq!(index.len(), 100);
        assert!(index.is_balanced());

        for price in (0..100).step_by(2) {
            assert!(index.remove(price));
        }
        // Freed slots are reusable
        for price in (0..100).step_by(2) {
            assert_eq!(index.insert(price), Ok(true));
        }
        assert_eq!(index.len(), 100);
        assert!(index.is_balanced());
    }
}
