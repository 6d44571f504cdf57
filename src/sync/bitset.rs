//! Word-packed atomic occupancy bits.
//!
//! A dense alternative to one `AtomicBool` per slot: bits are packed into
//! `AtomicUsize` words, and per-bit updates are single fetch-or/and/xor
//! operations on the owning word.

#[cfg(loom)]
use loom::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(loom))]
use core::sync::atomic::{AtomicUsize, Ordering};

const WORD_BITS: usize = usize::BITS as usize;

/// A fixed-length, word-packed atomic bitset.
///
/// One bit per slot; `true` means the slot holds a live element. Per-bit
/// operations return the previous value, so a racing set/reset pair can tell
/// which of them actually changed the bit.
///
/// Representation invariant: bits at positions `>= len()` in the trailing
/// word are always clear. [`valid`](Self::valid) checks exactly that.
pub struct AtomicBitset {
    bits: usize,
    words: Box<[AtomicUsize]>,
}

impl AtomicBitset {
    /// Creates a bitset with `bits` bits, all clear.
    pub fn new(bits: usize) -> Self {
        Self {
            bits,
            words: (0..bits.div_ceil(WORD_BITS))
                .map(|_| AtomicUsize::new(0))
                .collect(),
        }
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits
    }

    /// Returns `true` if the bitset has zero bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Atomically reads bit `index`.
    ///
    /// # Panics
    /// Debug builds panic if `index` is out of bounds.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.bits);
        let (word, mask) = split(index);
        (self.words[word].load(Ordering::Acquire) & mask) != 0
    }

    /// Atomically sets bit `index`, returning the previous value.
    ///
    /// # Panics
    /// Debug builds panic if `index` is out of bounds.
    #[inline]
    pub fn set(&self, index: usize) -> bool {
        debug_assert!(index < self.bits);
        let (word, mask) = split(index);
        (self.words[word].fetch_or(mask, Ordering::AcqRel) & mask) != 0
    }

    /// Atomically clears bit `index`, returning the previous value.
    ///
    /// # Panics
    /// Debug builds panic if `index` is out of bounds.
    #[inline]
    pub fn reset(&self, index: usize) -> bool {
        debug_assert!(index < self.bits);
        let (word, mask) = split(index);
        (self.words[word].fetch_and(!mask, Ordering::AcqRel) & mask) != 0
    }

    /// Atomically inverts bit `index`, returning the previous value.
    ///
    /// # Panics
    /// Debug builds panic if `index` is out of bounds.
    #[inline]
    pub fn flip(&self, index: usize) -> bool {
        debug_assert!(index < self.bits);
        let (word, mask) = split(index);
        (self.words[word].fetch_xor(mask, Ordering::AcqRel) & mask) != 0
    }

    /// Clears every bit.
    ///
    /// The exclusive borrow rules out concurrent mutators, which is the
    /// precondition for a coherent bulk reset.
    pub fn clear_all(&mut self) {
        for w in &*self.words {
            w.store(0, Ordering::Relaxed);
        }
    }

    /// Number of set bits, summed word by word.
    ///
    /// Eventually-consistent if bits are mutated concurrently with the scan;
    /// a trustworthy diagnostic only when quiescent. With the `parallel`
    /// feature the sum is a `rayon` parallel reduction over the words.
    pub fn count(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            return self
                .words
                .par_iter()
                .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
                .sum();
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.words
                .iter()
                .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
                .sum()
        }
    }

    /// Checks the representation invariant: every bit at position `>= len()`
    /// in the trailing word is clear.
    ///
    /// Quiescent diagnostic, like [`count`](Self::count).
    pub fn valid(&self) -> bool {
        let tail = self.bits % WORD_BITS;
        if tail == 0 {
            return true;
        }
        // `tail != 0` implies at least one word exists.
        let last = self.words[self.words.len() - 1].load(Ordering::Acquire);
        (last & !((1usize << tail) - 1)) == 0
    }
}

impl core::fmt::Debug for AtomicBitset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AtomicBitset")
            .field("len", &self.bits)
            .field("count", &self.count())
            .finish()
    }
}

// usize::BITS is a power of two, so these lower to shift/mask.
#[inline(always)]
fn split(bit: usize) -> (usize, usize) {
    (bit / WORD_BITS, 1usize << (bit % WORD_BITS))
}
