#![cfg(not(loom))]

use herd::SlotVec;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    Push(u16),
    Pop,
    Len,
    Clear,
}

proptest! {
    // Without concurrency the ticket order is the stack order, so the
    // container must agree with a plain bounded Vec at every step.
    #[test]
    fn matches_a_sequential_stack_model(
        capacity in 0usize..24,
        ops in proptest::collection::vec(
            prop_oneof![
                8 => any::<u16>().prop_map(Operation::Push),
                8 => Just(Operation::Pop),
                2 => Just(Operation::Len),
                1 => Just(Operation::Clear),
            ],
            1..200
        )
    ) {
        let mut model: Vec<u16> = Vec::new();
        let mut v: SlotVec<u16> = SlotVec::with_capacity(capacity);

        for op in ops {
            match op {
                Operation::Push(x) => {
                    let model_ok = model.len() < capacity;
                    if model_ok {
                        model.push(x);
                    }
                    prop_assert_eq!(v.try_push(x).is_ok(), model_ok);
                }
                Operation::Pop => {
                    prop_assert_eq!(v.try_pop(), model.pop());
                }
                Operation::Len => {
                    prop_assert_eq!(v.len(), model.len());
                    prop_assert_eq!(v.is_empty(), model.is_empty());
                    prop_assert_eq!(v.is_full(), model.len() == capacity);
                }
                Operation::Clear => {
                    model.clear();
                    v.clear();
                }
            }
        }

        prop_assert!(v.valid());
        prop_assert_eq!(v.occupied_count(), model.len());
        prop_assert_eq!(v.as_slice(), model.as_slice());
    }
}
