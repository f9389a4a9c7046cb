//! Bitmaps - O(1) slot allocation and price-level presence tests.
//!
//! Both structures are flat `u64` word arrays sized once at construction.
//! A price (or slot) `i` lives in word `i >> 6`, bit `i & 63`.

use std::fmt;

const WORD_BITS: u32 = 64;

#[inline]
const fn word_and_mask(index: u32) -> (usize, u64) {
    ((index >> 6) as usize, 1u64 << (index & 63))
}

#[inline]
fn words_for(bits: u32) -> usize {
    bits.div_ceil(WORD_BITS) as usize
}

/// Bit-vector free list over `[0, capacity)`. A set bit means the slot is free.
///
/// Hands out the lowest-numbered free slot, so reuse is deterministic:
/// releasing slot 3 and acquiring again always yields 3 if nothing lower
/// is free.
pub struct SlotAllocator {
    words: Box<[u64]>,
    capacity: u32,
    acquired: u32,
}

impl SlotAllocator {
    /// Create an allocator with every slot in `[0, capacity)` free.
    pub fn new(capacity: u32) -> Self {
        let mut words = vec![0u64; words_for(capacity)].into_boxed_slice();

        let full_words = (capacity / WORD_BITS) as usize;
        for word in &mut words[..full_words] {
            *word = u64::MAX;
        }
        // Bits past `capacity` in the last word stay clear so they are never handed out
        let tail_bits = capacity % WORD_BITS;
        if tail_bits > 0 {
            words[full_words] = (1u64 << tail_bits) - 1;
        }

        Self {
            words,
            capacity,
            acquired: 0,
        }
    }

    /// Take the lowest free slot, or `None` when every slot is in use.
    ///
    /// # Complexity
    /// O(capacity / 64) worst case, O(1) in the common case where low
    /// words still have free bits.
    #[inline]
    pub fn acquire(&mut self) -> Option<u32> {
        for (w, word) in self.words.iter_mut().enumerate() {
            let bits = *word;
            if bits != 0 {
                let b = bits.trailing_zeros();
                // Clear the lowest set bit
                *word = bits & (bits - 1);
                self.acquired += 1;
                return Some((w as u32) * WORD_BITS + b);
            }
        }
        None
    }

    /// Return a slot to the free set.
    ///
    /// The slot must have been acquired and not released since.
    #[inline]
    pub fn release(&mut self, slot: u32) {
        debug_assert!(slot < self.capacity, "Slot out of bounds");
        debug_assert!(!self.is_free(slot), "Double release of slot {slot}");

        let (w, mask) = word_and_mask(slot);
        self.words[w] |= mask;
        self.acquired -= 1;
    }

    /// Returns true if `slot` is currently free.
    #[inline]
    pub fn is_free(&self, slot: u32) -> bool {
        if slot >= self.capacity {
            return false;
        }
        let (w, mask) = word_and_mask(slot);
        self.words[w] & mask != 0
    }

    /// Number of slots currently handed out.
    #[inline]
    pub fn acquired(&self) -> u32 {
        self.acquired
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns true if no free slot remains.
    #[cfg(test)]
    pub fn is_exhausted(&self) -> bool {
        self.acquired == self.capacity
    }
}

impl fmt::Debug for SlotAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotAllocator")
            .field("capacity", &self.capacity)
            .field("acquired", &self.acquired)
            .finish()
    }
}

/// Bit-set over the tick-level space answering "is price P occupied".
///
/// Carries no ordering; the tree provides that.
#[derive(Clone)]
pub struct PresenceIndex {
    words: Box<[u64]>,
    tick_levels: u32,
    count: u32,
}

impl PresenceIndex {
    /// Create an empty presence index for prices in `[0, tick_levels)`.
    pub fn new(tick_levels: u32) -> Self {
        Self {
            words: vec![0u64; words_for(tick_levels)].into_boxed_slice(),
            tick_levels,
            count: 0,
        }
    }

    /// Mark `price` as occupied.
    #[inline]
    pub fn set(&mut self, price: u32) {
        debug_assert!(price < self.tick_levels, "Price out of bounds");
        let (w, mask) = word_and_mask(price);
        if self.words[w] & mask == 0 {
            self.words[w] |= mask;
            self.count += 1;
        }
    }

    /// Mark `price` as unoccupied.
    #[inline]
    pub fn unset(&mut self, price: u32) {
        debug_assert!(price < self.tick_levels, "Price out of bounds");
        let (w, mask) = word_and_mask(price);
        if self.words[w] & mask != 0 {
            self.words[w] &= !mask;
            self.count -= 1;
        }
    }

    /// Returns true if `price` is occupied. Out-of-range prices never are.
    #[inline]
    pub fn is_set(&self, price: u32) -> bool {
        if price >= self.tick_levels {
            return false;
        }
        let (w, mask) = word_and_mask(price);
        self.words[w] & mask != 0
    }

    /// Number of occupied prices.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl fmt::Debug for PresenceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceIndex")
            .field("tick_levels", &self.tick_levels)
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_lowest_first() {
        let mut slots = SlotAllocator::new(5);
        assert_eq!(slots.acquire(), Some(0));
        assert_eq!(slots.acquire(), Some(1));
        assert_eq!(slots.acquire(), Some(2));
        assert_eq!(slots.acquired(), 3);
    }

    #[test]
    fn test_exhaustion() {
        let mut slots = SlotAllocator::new(3);
        for expected in 0..3 {
            assert_eq!(slots.acquire(), Some(expected));
        }
        assert!(slots.is_exhausted());
        assert_eq!(slots.acquire(), None, "Should be exhausted");
    }

    #[test]
    fn test_release_reuses_lowest() {
        let mut slots = SlotAllocator::new(10);
        for _ in 0..6 {
            slots.acquire();
        }

        slots.release(4);
        slots.release(1);
        assert!(slots.is_free(1));
        assert!(slots.is_free(4));

        assert_eq!(slots.acquire(), Some(1));
        assert_eq!(slots.acquire(), Some(4));
        assert_eq!(slots.acquire(), Some(6));
    }

    #[test]
    fn test_capacity_not_multiple_of_word() {
        // 70 slots spans two words; bits 70..128 must never be handed out
        let mut slots = SlotAllocator::new(70);
        let mut handed_out = Vec::new();
        while let Some(slot) = slots.acquire() {
            handed_out.push(slot);
        }
        assert_eq!(handed_out.len(), 70);
        assert_eq!(handed_out.last(), Some(&69));
    }

    #[test]
    fn test_word_boundary_reuse() {
        let mut slots = SlotAllocator::new(130);
        for _ in 0..130 {
            slots.acquire();
        }
        slots.release(64);
        slots.release(128);
        assert_eq!(slots.acquire(), Some(64));
        assert_eq!(slots.acquire(), Some(128));
        assert_eq!(slots.acquire(), None);
    }

    #[test]
    fn test_zero_capacity() {
        let mut slots = SlotAllocator::new(0);
        assert!(slots.is_exhausted());
        assert_eq!(slots.acquire(), None);
    }

    #[test]
    fn test_presence_set_unset() {
        let mut presence = PresenceIndex::new(1000);
        assert!(!presence.is_set(300));

        presence.set(300);
        assert!(presence.is_set(300));
        assert!(!presence.is_set(301));
        assert_eq!(presence.count(), 1);

        presence.unset(300);
        assert!(!presence.is_set(300));
        assert_eq!(presence.count(), 0);
    }

    #[test]
    fn test_presence_idempotent() {
        let mut presence = PresenceIndex::new(128);
        presence.set(63);
        presence.set(63);
        presence.set(64);
        assert_eq!(presence.count(), 2);

        presence.unset(63);
        presence.unset(63);
        assert_eq!(presence.count(), 1);
        assert!(presence.is_set(64));
    }

    #[test]
    fn test_presence_out_of_range() {
        let presence = PresenceIndex::new(10);
        assert!(!presence.is_set(10));
        assert!(!presence.is_set(u32::MAX));
    }
}
