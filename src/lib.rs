//! # `herd` - Fixed-Capacity Concurrent Containers
//!
//! Containers built to be mutated by thousands of threads at once, in the
//! style of GPU-resident data structures: fixed capacity decided up front,
//! all coordination through shared atomics and per-slot spin-locks, and no
//! blocking OS primitives anywhere on the mutation paths.
//!
//! ## Concurrency Discipline
//!
//! Every container in the family follows the same two-phase protocol:
//!
//! 1. **Optimistic reservation**: a shared [`TicketCounter`] is bumped with a
//!    single fetch-and-add; the returned ticket is the caller's claimed slot
//!    index. No lock is taken for "who gets which slot".
//! 2. **Pessimistic critical section**: the caller spins on that one slot's
//!    lock in [`SlotLocks`], moves the element in or out of the data buffer,
//!    and flips the matching bit in the [`AtomicBitset`]. Contention is
//!    confined to a single index; unrelated slots proceed fully in parallel.
//!
//! The price of the lock-free reservation is that the counter can transiently
//! leave `[0, capacity]` when pushes and pops race at the boundaries. Readers
//! never trust the raw value: every size query clamps defensively, and the
//! boundary loser simply reports failure and hands the element back.
//!
//! ## Capability Split
//!
//! Operations callable from inside the parallel region take `&self`
//! ([`SlotVec::try_push`], [`SlotVec::try_pop`]). Bulk host-side operations
//! ([`SlotVec::clear`], [`SlotVec::as_slice`], iteration) take `&mut self`:
//! the exclusive borrow is the compile-time proof of quiescence that the
//! bulk view needs. Diagnostics ([`SlotVec::valid`], occupancy counts) stay
//! on `&self` but are trustworthy only at quiescent points.
//!
//! ## Example
//!
//! ```rust
//! use herd::SlotVec;
//!
//! let mut v: SlotVec<u32> = SlotVec::with_capacity(4);
//!
//! std::thread::scope(|s| {
//!     for value in [10, 20, 30, 40] {
//!         let v = &v;
//!         s.spawn(move || v.try_push(value).unwrap());
//!     }
//! });
//!
//! assert_eq!(v.len(), 4);
//! assert!(v.try_push(50).is_err());
//!
//! let mut popped: Vec<u32> = (0..4).map(|_| v.try_pop().unwrap()).collect();
//! popped.sort_unstable();
//! assert_eq!(popped, [10, 20, 30, 40]);
//! assert!(v.valid());
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: compute occupancy population counts with a `rayon` parallel
//!   reduction instead of a sequential word scan.
//! - `tracing`: report invariant violations (boundary races, unexpected slot
//!   states, out-of-range raw sizes) through `tracing`. Without the feature
//!   the diagnostics channel compiles out entirely.

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod collections;
pub mod sync;

mod diag;

pub use collections::SlotVec;
pub use sync::{AtomicBitset, SlotGuard, SlotLocks, TicketCounter};

// Compile-time layout claims. Lock arrays and bitsets are allocated one cell
// per slot, so their footprint is what makes large capacities viable.
#[cfg(not(loom))]
const _: () = {
    use core::mem;

    // One byte per slot lock; a million-slot lock array stays compact.
    assert!(mem::size_of::<core::sync::atomic::AtomicBool>() == 1);

    // The ticket counter is a thin wrapper over a single atomic word.
    assert!(mem::size_of::<TicketCounter>() == mem::size_of::<isize>());
    assert!(mem::align_of::<TicketCounter>() == mem::align_of::<isize>());

    // The padded size counter claims its own cache line.
    assert!(mem::align_of::<crossbeam_utils::CachePadded<TicketCounter>>() >= 32);
};
