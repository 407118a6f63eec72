//! Concurrent presence bitmap over the whole IPv4 space.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of 64-bit words covering all 2^32 addresses.
pub const WORDS: usize = 1 << 26;

/// A set of IPv4 addresses, one bit per address.
///
/// Inserts go through `&self` and may race freely; each word is updated with
/// a compare-and-swap loop so no insert is lost. Counting needs `&mut self`,
/// which can only be had once every inserting thread has been joined.
pub struct PresenceBitmap {
    words: Box<[AtomicU64; WORDS]>,
}

impl PresenceBitmap {
    /// Allocates the 512 MiB bitmap. Pages are zero-filled lazily by the OS,
    /// so untouched ranges cost no resident memory.
    pub fn new() -> Self {
        // SAFETY: the all-zero bit pattern is a valid `AtomicU64` (value 0).
        let words = unsafe { Box::<[AtomicU64; WORDS]>::new_zeroed().assume_init() };
        Self { words }
    }

    /// Sets the bit for `value`. Returns `true` if it was not set before.
    #[inline]
    pub fn insert(&self, value: u32) -> bool {
        let word = &self.words[(value >> 6) as usize];
        let mask = 1u64 << (value & 63);

        // Relaxed is enough: the join before `count` orders every insert.
        let mut current = word.load(Ordering::Relaxed);
        loop {
            let updated = current | mask;
            if updated == current {
                return false;
            }
            match word.compare_exchange_weak(
                current,
                updated,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        let word = self.words[(value >> 6) as usize].load(Ordering::Relaxed);
        word & (1u64 << (value & 63)) != 0
    }

    /// Returns the number of distinct addresses inserted.
    pub fn count(&mut self) -> u64 {
        self.words
            .iter_mut()
            .map(|word| word.get_mut().count_ones() as u64)
            .sum()
    }
}

impl Default for PresenceBitmap {
    fn default() -> Self {
        Self::new()
    }
}
