//! A fixed-capacity vector safe for massively parallel push/pop.
//!
//! Thousands of threads may call [`SlotVec::try_push`] and
//! [`SlotVec::try_pop`] concurrently. Positions are claimed optimistically
//! through a shared ticket counter; the element transfer itself happens
//! inside a pessimistic per-slot critical section, so threads working on
//! different slots never contend.
//!
//! Per-slot life cycle:
//!
//! ```text
//! FREE -> LOCKED-FREE (mid push) -> OCCUPIED -> LOCKED-OCCUPIED (mid pop) -> FREE
//! ```
//!
//! The slot lock is only ever held transiently, during the critical section
//! of exactly one push or one pop.

use crossbeam_utils::CachePadded;

use crate::diag::diag;
use crate::sync::{AtomicBitset, SlotLocks, TicketCounter};

/// A fixed-capacity vector for massively parallel mutation.
///
/// Owns four members of matching length, allocated together by
/// [`with_capacity`](Self::with_capacity) and released together on drop:
/// the data buffer, the per-slot lock array, the occupancy bitset, and the
/// (cache-padded) size counter.
///
/// Unoccupied slots always hold `T::default()`; popping an element resets
/// its slot back to the default value.
///
/// # Invariants (quiescent)
///
/// - `0 <= len() <= capacity()`
/// - `occupied_count() == len()`
/// - every occupied slot holds a live element, every free slot the default
///
/// None of these can be expected to hold mid-operation; [`valid`](Self::valid)
/// checks them and is meaningful only at quiescent points.
pub struct SlotVec<T> {
    data: Box<[SlotCell<T>]>,
    locks: SlotLocks,
    occupied: AtomicBitset,
    size: CachePadded<TicketCounter>,
}

// SAFETY: elements only cross threads by value (pushed in, popped out), and
// every slot-cell access happens inside that slot's critical section.
unsafe impl<T: Send> Send for SlotVec<T> {}
// SAFETY: as above; shared references hand out no `&T` except through
// `get_unchecked`, whose contract forbids concurrent slot access.
unsafe impl<T: Send> Sync for SlotVec<T> {}

impl<T: Default> SlotVec<T> {
    /// Creates a vector with room for exactly `capacity` elements.
    ///
    /// The capacity is fixed for the lifetime of the value; there is no
    /// growth path. Every slot starts free, holding `T::default()`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: (0..capacity).map(|_| SlotCell::new(T::default())).collect(),
            locks: SlotLocks::new(capacity),
            occupied: AtomicBitset::new(capacity),
            size: CachePadded::new(TicketCounter::new(0)),
        }
    }

    /// Attempts to pop an element.
    ///
    /// Returns `None` when the vector is empty, or when the position
    /// reservation loses a boundary race to concurrent pops; both outcomes
    /// are recoverable and leave the counter to be clamped by later reads.
    /// The popped slot is reset to `T::default()` and marked free.
    pub fn try_pop(&self) -> Option<T> {
        if self.is_empty() {
            diag!(debug, "pop rejected: container empty");
            return None;
        }

        // Claim a position. The previous counter value is one past the slot
        // this pop owns.
        let ticket = self.size.decrement();
        if ticket < 1 || ticket as usize > self.capacity() {
            // Overshot under contention; the counter stays decremented and
            // every size read clamps.
            diag!(warn, "pop reservation out of bounds at ticket {ticket}");
            return None;
        }
        let index = (ticket - 1) as usize;

        let guard = self.locks.lock(index);
        let value = if self.occupied.reset(index) {
            // SAFETY: slot lock held; no other thread touches this cell.
            Some(self.data[index].with_mut(|slot| unsafe { core::mem::take(&mut *slot) }))
        } else {
            // Must not happen under correct use; report and stay live.
            diag!(warn, "claimed slot {index} held no element on pop");
            None
        };
        drop(guard);
        value
    }

    /// Resets the vector to empty.
    ///
    /// Not callable concurrently with push/pop; the exclusive borrow
    /// enforces at compile time what massively parallel callers must
    /// otherwise promise. Every active slot returns to `T::default()`.
    pub fn clear(&mut self) {
        let len = self.len();
        for cell in &self.data[..len] {
            cell.with_mut(|slot| unsafe { *slot = T::default() });
        }
        self.occupied.clear_all();
        self.size.store(0);
        debug_assert!(self.valid());
    }
}

impl<T> SlotVec<T> {
    /// Attempts to push `value`, handing it back on failure.
    ///
    /// Failure means either the vector is full or the position reservation
    /// lost a boundary race to concurrent pushes; both are recoverable and
    /// leave no element behind. The preemptive full check is advisory (it
    /// can race with concurrent pops), so passing it only reduces wasted
    /// contention, it does not guarantee success.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        if self.is_full() {
            diag!(debug, "push rejected: container full");
            return Err(value);
        }

        // Claim a position. The previous counter value is the slot index.
        let ticket = self.size.increment();
        if ticket < 0 || ticket as usize >= self.capacity() {
            // Overshot under contention; the counter stays incremented and
            // every size read clamps.
            diag!(warn, "push reservation out of bounds at ticket {ticket}");
            return Err(value);
        }
        let index = ticket as usize;

        let guard = self.locks.lock(index);
        if self.occupied.get(index) {
            // Must not happen under correct use; overwrite keeps the
            // structure live rather than halting the whole device.
            diag!(warn, "claimed slot {index} already occupied, overwriting");
        }
        // SAFETY: slot lock held; no other thread touches this cell.
        self.data[index].with_mut(|slot| unsafe { *slot = value });
        self.occupied.set(index);
        drop(guard);
        Ok(())
    }

    /// Number of elements, clamped to `[0, capacity]`.
    ///
    /// The raw counter can transiently leave that range while boundary races
    /// resolve; the reported value never does.
    pub fn len(&self) -> usize {
        let raw = self.size.load();
        let capacity = self.capacity();
        if raw < 0 {
            diag!(warn, "raw size {raw} below zero, reporting empty");
            0
        } else if raw as usize > capacity {
            diag!(warn, "raw size {raw} above capacity {capacity}, reporting full");
            capacity
        } else {
            raw as usize
        }
    }

    /// Fixed allocation size, immutable after creation.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Largest possible number of elements; equal to [`capacity`](Self::capacity)
    /// since the vector cannot grow.
    #[inline]
    pub fn max_len(&self) -> usize {
        self.capacity()
    }

    /// Returns `true` if no element is stored.
    ///
    /// Advisory under concurrent mutation, like [`len`](Self::len).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if every slot is in use.
    ///
    /// Advisory under concurrent mutation, like [`len`](Self::len).
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.max_len()
    }

    /// Number of occupied slots, counted from the occupancy bits.
    ///
    /// Quiescent diagnostic; equals [`len`](Self::len) whenever no operation
    /// is in flight.
    pub fn occupied_count(&self) -> usize {
        self.occupied.count()
    }

    /// Structural validity check.
    ///
    /// Requires the raw counter within `[0, capacity]`, the occupancy
    /// population matching the reported size, and no slot lock held. A
    /// capacity of zero is trivially valid. This is a quiescence check; it
    /// cannot be expected to hold while operations are in flight.
    pub fn valid(&self) -> bool {
        if self.capacity() == 0 {
            return true;
        }
        let raw = self.size.load();
        let size_valid = raw >= 0 && raw as usize <= self.capacity();
        size_valid && self.occupied.count() == self.len() && self.locks.valid()
    }
}

// Host-side accessors over the active prefix `[0, len())`. These hand out
// plain borrows, so they take `&mut self`: the exclusive borrow is the
// quiescence proof that makes a non-atomic view of the buffer coherent.
// Compiled out of loom model runs, where the slot cells are replaced by
// instrumented ones that cannot be borrowed directly.
#[cfg(not(loom))]
impl<T> SlotVec<T> {
    /// The active prefix as a contiguous slice.
    pub fn as_slice(&mut self) -> &[T] {
        let len = self.len();
        let prefix = &self.data[..len];
        // SAFETY: `SlotCell` is repr(transparent) over `T`, and the
        // exclusive borrow guarantees no concurrent writer.
        unsafe { &*core::ptr::slice_from_raw_parts(prefix.as_ptr().cast::<T>(), len) }
    }

    /// Borrows the element at `index`, if it lies in the active prefix.
    ///
    /// A quiescent, valid vector confines occupancy to exactly the prefix;
    /// finding an unoccupied slot inside it is a contract violation and is
    /// debug-asserted.
    pub fn get(&mut self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        debug_assert!(
            self.occupied.get(index),
            "unoccupied slot {index} inside the active prefix"
        );
        Some(&self.as_slice()[index])
    }

    /// Borrows the first element.
    pub fn front(&mut self) -> Option<&T> {
        self.get(0)
    }

    /// Borrows the last element.
    pub fn back(&mut self) -> Option<&T> {
        let last = self.len().checked_sub(1)?;
        self.get(last)
    }

    /// Iterates the active prefix.
    pub fn iter(&mut self) -> core::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Reads slot `index` without synchronization.
    ///
    /// # Safety
    ///
    /// `index` must be in bounds and occupied, and no other thread may
    /// access slot `index` for the lifetime of the returned borrow. Intended
    /// for callers inside the parallel region that own the slot by
    /// construction.
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        &*self.data.get_unchecked(index).as_ptr()
    }
}

impl<T> core::fmt::Debug for SlotVec<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlotVec")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// One slot's storage. Swapped for `loom`'s instrumented cell under model
/// checking so slot accesses participate in interleaving exploration.
#[cfg(not(loom))]
#[repr(transparent)]
struct SlotCell<T>(core::cell::UnsafeCell<T>);

#[cfg(not(loom))]
impl<T> SlotCell<T> {
    fn new(value: T) -> Self {
        Self(core::cell::UnsafeCell::new(value))
    }

    fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        f(self.0.get())
    }

    fn as_ptr(&self) -> *mut T {
        self.0.get()
    }
}

#[cfg(loom)]
struct SlotCell<T>(loom::cell::UnsafeCell<T>);

#[cfg(loom)]
impl<T> SlotCell<T> {
    fn new(value: T) -> Self {
        Self(loom::cell::UnsafeCell::new(value))
    }

    fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        self.0.with_mut(f)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn sequential_push_pop_round_trip() {
        let v: SlotVec<i32> = SlotVec::with_capacity(4);
        assert!(v.is_empty());
        assert_eq!(v.capacity(), 4);
        assert_eq!(v.max_len(), 4);

        for i in 1..=4 {
            assert!(v.try_push(i).is_ok());
        }
        assert!(v.is_full());
        assert_eq!(v.try_push(5), Err(5));
        assert_eq!(v.len(), 4);

        // Sequential pops walk the prefix back in ticket order.
        assert_eq!(v.try_pop(), Some(4));
        assert_eq!(v.try_pop(), Some(3));
        assert_eq!(v.try_pop(), Some(2));
        assert_eq!(v.try_pop(), Some(1));
        assert_eq!(v.try_pop(), None);
        assert!(v.is_empty());
        assert!(v.valid());
    }

    #[test]
    fn pop_frees_the_slot() {
        let v: SlotVec<String> = SlotVec::with_capacity(2);
        v.try_push("a".to_owned()).unwrap();
        assert_eq!(v.occupied_count(), 1);

        assert_eq!(v.try_pop().as_deref(), Some("a"));
        assert_eq!(v.occupied_count(), 0);
        assert_eq!(v.len(), 0);
        assert!(v.valid());
    }

    #[test]
    fn zero_capacity_is_trivially_valid() {
        let v: SlotVec<u8> = SlotVec::with_capacity(0);
        assert!(v.valid());
        assert!(v.is_empty());
        assert!(v.is_full());
        assert_eq!(v.try_push(1), Err(1));
        assert_eq!(v.try_pop(), None);
        assert!(v.valid());
    }

    #[test]
    fn clear_restores_the_empty_state() {
        let mut v: SlotVec<u32> = SlotVec::with_capacity(8);
        for i in 0..5 {
            v.try_push(i).unwrap();
        }
        assert_eq!(v.len(), 5);

        v.clear();
        assert!(v.is_empty());
        assert!(v.valid());
        assert_eq!(v.occupied_count(), 0);
        assert!(v.as_slice().is_empty());

        // The vector stays usable after a bulk reset.
        v.try_push(9).unwrap();
        assert_eq!(v.as_slice(), [9]);
    }

    #[test]
    fn prefix_accessors_see_pushed_elements() {
        let mut v: SlotVec<u64> = SlotVec::with_capacity(4);
        for i in [7, 8, 9] {
            v.try_push(i).unwrap();
        }

        assert_eq!(v.as_slice(), [7, 8, 9]);
        assert_eq!(v.front(), Some(&7));
        assert_eq!(v.back(), Some(&9));
        assert_eq!(v.get(1), Some(&8));
        assert_eq!(v.get(3), None);
        assert_eq!(v.iter().sum::<u64>(), 24);
    }

    #[test]
    fn debug_formats_without_element_bounds() {
        struct Opaque;
        impl Default for Opaque {
            fn default() -> Self {
                Opaque
            }
        }

        let v: SlotVec<Opaque> = SlotVec::with_capacity(3);
        let rendered = format!("{v:?}");
        assert!(rendered.contains("len"));
        assert!(rendered.contains("capacity"));
    }
}
