//! Composite containers built from the leaf synchronization primitives.

pub mod slot_vec;

pub use slot_vec::SlotVec;
