//! Property tests for arena growth and slot stability.

use std::collections::HashSet;

use proptest::prelude::*;

use uring_engine::{RequestSlot, SlotArena};

proptest! {
    /// Capacity always covers every id ever referenced, regardless of
    /// the order ids arrive in; allocation stays lazy and exact.
    #[test]
    fn capacity_covers_every_touched_id(ids in prop::collection::vec(0u64..2048, 1..64)) {
        let mut arena = SlotArena::with_capacity(8);

        for &id in &ids {
            let slot = arena.slot(id).unwrap();
            prop_assert_eq!(slot.id(), id);
            prop_assert!((arena.capacity() as u64) > id);
        }

        let highest = ids.iter().copied().max().unwrap();
        prop_assert!(arena.capacity() as u64 >= highest + 1);

        let distinct: HashSet<u64> = ids.iter().copied().collect();
        prop_assert_eq!(arena.allocated(), distinct.len());
    }

    /// Once capacity covers an id, touching it again never grows the
    /// table.
    #[test]
    fn repeated_references_do_not_regrow(id in 0u64..512) {
        let mut arena = SlotArena::with_capacity(8);

        arena.slot(id).unwrap();
        let growths = arena.growths();

        for _ in 0..10 {
            arena.slot(id).unwrap();
        }
        prop_assert_eq!(arena.growths(), growths);
    }

    /// A slot's address never changes once allocated, however far the
    /// table grows afterwards.
    #[test]
    fn slot_addresses_survive_growth(first in 0u64..64, second in 1024u64..8192) {
        let mut arena = SlotArena::with_capacity(64);

        let before = arena.slot(first).unwrap() as *const RequestSlot;
        arena.slot(second).unwrap();
        let after = arena.peek(first).unwrap() as *const RequestSlot;

        prop_assert_eq!(before, after);
    }
}
