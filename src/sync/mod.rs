//! Leaf synchronization primitives for the container family.
//!
//! Three pieces, one discipline: every cell lives in shared memory reachable
//! by all worker threads, mutation goes through hardware atomics, and nothing
//! ever blocks on an OS primitive. Bulk queries (`count`, `valid`) are
//! trustworthy only at quiescent points; the containers that compose these
//! primitives document the same obligation.

pub mod bitset;
pub mod counter;
pub mod locks;

pub use bitset::AtomicBitset;
pub use counter::TicketCounter;
pub use locks::{SlotGuard, SlotLocks};
