//! Tests for arena growth, slot laziness, and payload claiming.

use super::*;

mod allocation {
    use super::*;

    #[test]
    fn slots_allocate_lazily() {
        let mut arena = SlotArena::with_capacity(8);

        assert_eq!(arena.capacity(), 8);
        assert_eq!(arena.allocated(), 0);

        arena.slot(3).unwrap();
        assert_eq!(arena.allocated(), 1);

        // Second reference reuses the slot.
        arena.slot(3).unwrap();
        assert_eq!(arena.allocated(), 1);
    }

    #[test]
    fn fresh_slot_is_unclaimed() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(2).unwrap();

        assert_eq!(slot.id(), 2);
        assert_eq!(slot.kind(), PayloadKind::Unused);
    }

    #[test]
    fn peek_does_not_allocate() {
        let mut arena = SlotArena::with_capacity(4);

        assert!(arena.peek(1).is_none());
        arena.slot(1).unwrap();
        assert!(arena.peek(1).is_some());
        assert_eq!(arena.allocated(), 1);

        // Out of range peeks are fine too.
        assert!(arena.peek(1_000_000).is_none());
    }
}

mod growth {
    use super::*;

    #[test]
    fn out_of_range_id_grows_once_before_fetch() {
        let mut arena = SlotArena::with_capacity(8);

        let id = 16; // 2x the current capacity
        let slot = arena.slot(id).unwrap();

        assert_eq!(slot.id(), id);
        assert_eq!(arena.growths(), 1);
        assert!(arena.capacity() >= id as usize + 1);
    }

    #[test]
    fn growth_at_least_doubles() {
        let mut arena = SlotArena::with_capacity(8);

        arena.slot(8).unwrap(); // one past the end
        assert_eq!(arena.capacity(), 16);

        arena.slot(100).unwrap(); // far past the end
        assert_eq!(arena.capacity(), 101);
    }

    #[test]
    fn existing_slots_survive_growth() {
        let mut arena = SlotArena::with_capacity(4);

        let before = arena.slot(1).unwrap() as *const RequestSlot;
        arena.slot(1).unwrap().claim_timeout(7, 0);

        arena.slot(4096).unwrap();

        let after = arena.peek(1).unwrap();
        assert_eq!(after as *const RequestSlot, before);
        assert_eq!(after.kind(), PayloadKind::Timeout);
    }

    #[test]
    fn zero_capacity_arena_grows_on_first_use() {
        let mut arena = SlotArena::with_capacity(0);

        arena.slot(0).unwrap();
        assert_eq!(arena.growths(), 1);
        assert!(arena.capacity() >= 1);
    }

    #[test]
    fn in_range_ids_do_not_grow() {
        let mut arena = SlotArena::with_capacity(32);

        for id in [0u64, 31, 7, 31, 0] {
            arena.slot(id).unwrap();
        }
        assert_eq!(arena.growths(), 0);
        assert_eq!(arena.capacity(), 32);
    }
}

mod claiming {
    use super::*;
    use std::net::SocketAddr;
    use std::path::Path;

    #[test]
    fn timeout_claim_points_into_slot() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let ts = slot.claim_timeout(2, 500);
        assert!(!ts.is_null());
        assert_eq!(slot.kind(), PayloadKind::Timeout);
    }

    #[test]
    fn reclaim_replaces_shape() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        slot.claim_timeout(1, 0);
        assert_eq!(slot.kind(), PayloadKind::Timeout);

        slot.claim_accept_address();
        assert_eq!(slot.kind(), PayloadKind::SocketAddress);
    }

    #[test]
    fn connect_address_round_trips() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let addr: SocketAddr = "10.1.2.3:9000".parse().unwrap();
        let (ptr, len) = slot.claim_connect_address(&addr);
        assert!(!ptr.is_null());
        assert_eq!(len as usize, std::mem::size_of::<libc::sockaddr_in>());

        assert_eq!(slot.payload().socket_address(), Some(addr));
    }

    #[test]
    fn io_vector_references_caller_buffer() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let mut buffer = [0u8; 128];
        let iov = slot.claim_io_vector(buffer.as_mut_ptr(), buffer.len());

        // SAFETY: iov points into the boxed slot we just claimed.
        let iov = unsafe { &*iov };
        assert_eq!(iov.iov_base as *const u8, buffer.as_ptr());
        assert_eq!(iov.iov_len, 128);
    }

    #[test]
    fn message_header_wires_up_vector_and_destination() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let mut buffer = [0u8; 64];
        let dest: SocketAddr = "127.0.0.1:5353".parse().unwrap();
        let hdr = slot.claim_message_header(buffer.as_mut_ptr(), 64, Some(&dest), false);

        // SAFETY: hdr points into the boxed slot we just claimed.
        let hdr = unsafe { &*hdr };
        assert_eq!(hdr.msg_iovlen, 1);
        assert!(!hdr.msg_name.is_null());
        assert_eq!(slot.payload().socket_address(), Some(dest));
    }

    #[test]
    fn receive_header_offers_address_storage() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let mut buffer = [0u8; 64];
        let hdr = slot.claim_message_header(buffer.as_mut_ptr(), 64, None, true);

        // SAFETY: hdr points into the boxed slot we just claimed.
        let hdr = unsafe { &*hdr };
        assert_eq!(
            hdr.msg_namelen as usize,
            std::mem::size_of::<libc::sockaddr_storage>()
        );
    }

    #[test]
    fn path_claim_copies_and_terminates() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let ptr = slot.claim_path(Path::new("/var/log/engine")).unwrap();
        assert!(!ptr.is_null());
        assert_eq!(slot.kind(), PayloadKind::Path);
        assert_eq!(slot.payload().path_text(), Some(&b"/var/log/engine"[..]));
    }

    #[test]
    fn oversized_path_leaves_slot_unclaimed() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let long = "x".repeat(MAX_PATH_LEN + 10);
        assert!(slot.claim_path(Path::new(&long)).is_err());
        assert_eq!(slot.kind(), PayloadKind::Unused);
    }

    #[test]
    fn stat_claim_holds_path_and_status_block() {
        let mut arena = SlotArena::with_capacity(4);
        let slot = arena.slot(0).unwrap();

        let (path_ptr, statx_ptr) = slot.claim_stat(Path::new("/etc/hostname")).unwrap();
        assert!(!path_ptr.is_null());
        assert!(!statx_ptr.is_null());
        assert_eq!(slot.kind(), PayloadKind::Stat);
        assert!(slot.payload().file_status().is_some());
    }
}
