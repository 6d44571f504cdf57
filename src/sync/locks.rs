//! Per-slot spin-locks.
//!
//! Massively parallel callers have no OS-level blocking primitives, so
//! mutual exclusion is a compare-and-swap flag per index plus a
//! caller-driven retry loop. Locks are independent: acquiring index `i`
//! never blocks and is never blocked by index `j != i`.

#[cfg(loom)]
use loom::hint;
#[cfg(loom)]
use loom::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(loom))]
use core::hint;
#[cfg(not(loom))]
use core::sync::atomic::{AtomicBool, Ordering};

/// An array of independent spin-locks, one per slot index.
///
/// Each cell is either free or held by exactly one thread. The array owns no
/// content; it is purely a synchronization primitive keyed by index, meant to
/// guard a sibling buffer's slots.
pub struct SlotLocks {
    cells: Box<[AtomicBool]>,
}

impl SlotLocks {
    /// Creates `len` locks, all free.
    pub fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Number of lock cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the array has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Attempts to acquire lock `index` without blocking.
    ///
    /// Returns `true` on acquisition, `false` if the lock is already held;
    /// nothing is retried internally; the caller spins or gives up.
    ///
    /// # Panics
    /// Debug builds panic if `index` is out of bounds.
    #[inline]
    pub fn try_lock(&self, index: usize) -> bool {
        debug_assert!(index < self.cells.len());
        self.cells[index]
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases lock `index`.
    ///
    /// The calling thread must currently hold the lock.
    ///
    /// # Panics
    /// Debug builds panic if `index` is out of bounds or the lock is free.
    #[inline]
    pub fn unlock(&self, index: usize) {
        debug_assert!(
            self.cells[index].load(Ordering::Relaxed),
            "unlock of a free slot lock"
        );
        self.cells[index].store(false, Ordering::Release);
    }

    /// Spins until lock `index` is acquired, returning a guard that releases
    /// it on drop.
    ///
    /// The spin never leaves this index, so contention on other slots cannot
    /// delay this call. The busy-wait is the only form of suspension in the
    /// crate; it terminates as long as holders keep their critical sections
    /// finite.
    #[inline]
    pub fn lock(&self, index: usize) -> SlotGuard<'_> {
        while !self.try_lock(index) {
            hint::spin_loop();
        }
        SlotGuard { locks: self, index }
    }

    /// Returns `true` if every lock is currently free.
    ///
    /// Meaningful only when quiescent; used as a post-condition check after
    /// bulk operations.
    pub fn valid(&self) -> bool {
        self.cells.iter().all(|c| !c.load(Ordering::Acquire))
    }
}

impl core::fmt::Debug for SlotLocks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let held = self
            .cells
            .iter()
            .filter(|c| c.load(Ordering::Relaxed))
            .count();
        f.debug_struct("SlotLocks")
            .field("len", &self.cells.len())
            .field("held", &held)
            .finish()
    }
}

/// RAII guard for one held slot lock.
///
/// Dropping the guard releases the lock. Keeping critical sections short is
/// what bounds every other thread's spin on this index.
pub struct SlotGuard<'a> {
    locks: &'a SlotLocks,
    index: usize,
}

impl SlotGuard<'_> {
    /// The index this guard holds.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.locks.unlock(self.index);
    }
}
