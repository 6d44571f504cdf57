#![cfg(not(loom))]

use herd::{AtomicBitset, SlotGuard, SlotLocks, SlotVec, TicketCounter};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn primitives_are_send_sync_and_compose() {
    assert_send_sync::<TicketCounter>();
    assert_send_sync::<AtomicBitset>();
    assert_send_sync::<SlotLocks>();
    assert_send_sync::<SlotGuard<'static>>();
    assert_send_sync::<SlotVec<u64>>();

    let c = TicketCounter::new(0);
    assert_eq!(c.load(), 0);
    c.store(5);
    assert_eq!(c.fetch_add(2), 5);
    assert_eq!(c.load(), 7);

    let b = AtomicBitset::new(16);
    assert!(!b.set(3));
    assert!(b.get(3));
    assert_eq!(b.count(), 1);

    let locks = SlotLocks::new(16);
    assert_eq!(locks.len(), 16);
    let guard = locks.lock(3);
    assert_eq!(guard.index(), 3);
    assert!(!locks.try_lock(3));
    drop(guard);
    assert!(locks.valid());
}

// The reservation/critical-section split in miniature: a ticket names the
// slot, the slot lock guards the data, the bit records occupancy.
#[test]
fn ticket_lock_bit_discipline() {
    use std::sync::Mutex;
    use std::thread;

    const SLOTS: usize = 16;

    let tickets = TicketCounter::new(0);
    let locks = SlotLocks::new(SLOTS);
    let occupied = AtomicBitset::new(SLOTS);
    let data: Vec<Mutex<usize>> = (0..SLOTS).map(|_| Mutex::new(0)).collect();

    thread::scope(|s| {
        for value in 0..SLOTS {
            let tickets = &tickets;
            let locks = &locks;
            let occupied = &occupied;
            let data = &data;
            s.spawn(move || {
                let index = usize::try_from(tickets.increment()).unwrap();
                let _guard = locks.lock(index);
                *data[index].lock().unwrap() = value + 1;
                assert!(!occupied.set(index), "slot claimed twice");
            });
        }
    });

    assert_eq!(tickets.load(), SLOTS as isize);
    assert_eq!(occupied.count(), SLOTS);
    assert!(locks.valid());
    for cell in &data {
        assert_ne!(*cell.lock().unwrap(), 0);
    }
}

#[test]
fn bitset_tail_invariant_survives_boundary_traffic() {
    // A length one past a word boundary: the trailing word carries a single
    // logical bit.
    let bits = usize::BITS as usize + 1;
    let b = AtomicBitset::new(bits);

    for i in 0..bits {
        b.set(i);
    }
    assert_eq!(b.count(), bits);
    assert!(b.valid());

    for i in 0..bits {
        assert!(b.reset(i));
    }
    assert_eq!(b.count(), 0);
    assert!(b.valid());
}

#[test]
fn debug_formats_are_stable() {
    let c = TicketCounter::new(42);
    assert_eq!(format!("{c:?}"), "TicketCounter(42)");

    let locks = SlotLocks::new(2);
    let _guard = locks.lock(1);
    let rendered = format!("{locks:?}");
    assert!(rendered.contains("held: 1"));
}
