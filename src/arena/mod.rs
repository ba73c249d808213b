//! Per-ring scratch arena keyed by request id.
//!
//! Asynchronous operations need transient memory the kernel reads or
//! writes after the staging call has returned: timeout specs, socket
//! addresses, I/O vectors, message headers, path text, file-status
//! blocks. The arena correlates that memory with the request id of the
//! submission that uses it.
//!
//! Slots are boxed, so a payload address handed to the kernel stays
//! valid across table growth. A slot is allocated lazily the first time
//! its id is referenced and is never released individually — completions
//! can be delayed or reordered, so per-request freeing would be a
//! use-after-free waiting to happen. The whole table goes away with the
//! ring.

mod payload;

#[cfg(test)]
mod tests;

pub use payload::{PayloadKind, SlotPayload, MAX_PATH_LEN};

use std::cmp;
use std::mem;
use std::net::SocketAddr;
use std::path::Path;

use io_uring::types::Timespec;

use crate::error::{EngineError, Result};
use crate::socket::encode_addr;

/// One scratch slot, owned by the arena and keyed by its request id.
#[derive(Debug)]
pub struct RequestSlot {
    id: u64,
    payload: SlotPayload,
}

impl RequestSlot {
    fn new(id: u64) -> Self {
        Self {
            id,
            payload: SlotPayload::Unused,
        }
    }

    /// The request id this slot belongs to.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The currently stored payload.
    pub fn payload(&self) -> &SlotPayload {
        &self.payload
    }

    /// Shape tag of the currently stored payload.
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    /// Store a timeout spec and return its kernel-visible address.
    pub(crate) fn claim_timeout(&mut self, secs: u64, nanos: u32) -> *const Timespec {
        self.payload = SlotPayload::Timeout(Timespec::new().sec(secs).nsec(nanos));
        let SlotPayload::Timeout(ts) = &self.payload else {
            unreachable!()
        };
        ts as *const Timespec
    }

    /// Store a single I/O vector over a caller-owned buffer and return
    /// its kernel-visible address.
    pub(crate) fn claim_io_vector(&mut self, base: *mut u8, len: usize) -> *const libc::iovec {
        self.payload = SlotPayload::IoVector {
            iov: libc::iovec {
                iov_base: base as *mut libc::c_void,
                iov_len: len,
            },
        };
        let SlotPayload::IoVector { iov } = &self.payload else {
            unreachable!()
        };
        iov as *const libc::iovec
    }

    /// Claim zeroed address storage for an accept and return the
    /// address/length pointers the kernel fills in.
    pub(crate) fn claim_accept_address(
        &mut self,
    ) -> (*mut libc::sockaddr, *mut libc::socklen_t) {
        self.payload = SlotPayload::SocketAddress {
            // SAFETY: sockaddr_storage is valid when zeroed.
            storage: unsafe { mem::zeroed() },
            len: mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t,
        };
        let SlotPayload::SocketAddress { storage, len } = &mut self.payload else {
            unreachable!()
        };
        (
            storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
            len as *mut libc::socklen_t,
        )
    }

    /// Encode a connect target and return its address pointer and length.
    pub(crate) fn claim_connect_address(
        &mut self,
        addr: &SocketAddr,
    ) -> (*const libc::sockaddr, libc::socklen_t) {
        // SAFETY: sockaddr_storage is valid when zeroed.
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        let encoded = encode_addr(&mut storage, addr);
        self.payload = SlotPayload::SocketAddress {
            storage,
            len: encoded,
        };
        let SlotPayload::SocketAddress { storage, len } = &self.payload else {
            unreachable!()
        };
        (
            storage as *const libc::sockaddr_storage as *const libc::sockaddr,
            *len,
        )
    }

    /// Build a message header over a caller-owned buffer and return its
    /// kernel-visible address.
    ///
    /// With `dest` set the header addresses an outgoing datagram; with
    /// `receive_source` the address storage is offered to the kernel so
    /// the datagram source lands in the slot.
    pub(crate) fn claim_message_header(
        &mut self,
        buf: *mut u8,
        len: u32,
        dest: Option<&SocketAddr>,
        receive_source: bool,
    ) -> *mut libc::msghdr {
        self.payload = SlotPayload::MessageHeader {
            // SAFETY: msghdr and sockaddr_storage are valid when zeroed.
            hdr: unsafe { mem::zeroed() },
            iov: libc::iovec {
                iov_base: buf as *mut libc::c_void,
                iov_len: len as usize,
            },
            storage: unsafe { mem::zeroed() },
        };
        let SlotPayload::MessageHeader { hdr, iov, storage } = &mut self.payload else {
            unreachable!()
        };

        hdr.msg_iov = iov as *mut libc::iovec;
        hdr.msg_iovlen = 1;
        if let Some(addr) = dest {
            let encoded = encode_addr(storage, addr);
            hdr.msg_name = storage as *mut libc::sockaddr_storage as *mut libc::c_void;
            hdr.msg_namelen = encoded;
        } else if receive_source {
            hdr.msg_name = storage as *mut libc::sockaddr_storage as *mut libc::c_void;
            hdr.msg_namelen = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        }

        hdr as *mut libc::msghdr
    }

    /// Copy path text inline and return its C-string address.
    pub(crate) fn claim_path(&mut self, path: &Path) -> Result<*const libc::c_char> {
        let mut bytes: payload::PathBlock = [0; MAX_PATH_LEN + 1];
        let len = payload::copy_path(&mut bytes, path)?;
        self.payload = SlotPayload::Path { bytes, len };
        let SlotPayload::Path { bytes, .. } = &self.payload else {
            unreachable!()
        };
        Ok(bytes.as_ptr() as *const libc::c_char)
    }

    /// Copy path text inline next to a zeroed statx block; return the
    /// C-string address and the block the kernel fills on completion.
    pub(crate) fn claim_stat(
        &mut self,
        path: &Path,
    ) -> Result<(*const libc::c_char, *mut libc::statx)> {
        let mut bytes: payload::PathBlock = [0; MAX_PATH_LEN + 1];
        let len = payload::copy_path(&mut bytes, path)?;
        self.payload = SlotPayload::Stat {
            bytes,
            len,
            // SAFETY: statx is valid when zeroed.
            statx: unsafe { mem::zeroed() },
        };
        let SlotPayload::Stat { bytes, statx, .. } = &mut self.payload else {
            unreachable!()
        };
        Ok((
            bytes.as_ptr() as *const libc::c_char,
            statx as *mut libc::statx,
        ))
    }
}

/// Growable table of request slots indexed by request id.
///
/// Growth always runs before the triggering index is dereferenced; no
/// id is ever used to touch the table until capacity covers it. There
/// is no assumption that callers issue ids monotonically.
#[derive(Debug)]
pub struct SlotArena {
    slots: Vec<Option<Box<RequestSlot>>>,
    allocated: usize,
    growths: u64,
}

impl SlotArena {
    /// Arena whose table initially covers ids `0..initial`.
    pub fn with_capacity(initial: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(initial, || None);
        Self {
            slots,
            allocated: 0,
            growths: 0,
        }
    }

    /// Number of ids the table currently covers.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots that have been lazily allocated.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// How many times the table has grown.
    pub fn growths(&self) -> u64 {
        self.growths
    }

    /// Fetch the slot for `id`, growing the table and lazily allocating
    /// the slot as needed.
    ///
    /// # Errors
    ///
    /// [`EngineError::AllocationFailure`] if the grown table cannot be
    /// allocated; the arena keeps its previous capacity.
    pub fn slot(&mut self, id: u64) -> Result<&mut RequestSlot> {
        let index = usize::try_from(id).map_err(|_| EngineError::AllocationFailure)?;
        if index >= self.slots.len() {
            self.grow(index)?;
        }

        let entry = &mut self.slots[index];
        if entry.is_none() {
            *entry = Some(Box::new(RequestSlot::new(id)));
            self.allocated += 1;
        }
        match entry {
            Some(slot) => Ok(slot),
            // Just populated above.
            None => unreachable!(),
        }
    }

    /// Read-only view of the slot for `id`, if it was ever allocated.
    ///
    /// Used after a completion has been harvested to read back a
    /// kernel-written payload (accepted peer address, statx block).
    pub fn peek(&self, id: u64) -> Option<&RequestSlot> {
        let index = usize::try_from(id).ok()?;
        self.slots.get(index)?.as_deref()
    }

    /// Extend the table to cover `min_index`, at least doubling.
    fn grow(&mut self, min_index: usize) -> Result<()> {
        let target = cmp::max(
            self.slots.len().saturating_mul(2),
            min_index.saturating_add(1),
        );
        let additional = target - self.slots.len();
        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| EngineError::AllocationFailure)?;
        self.slots.resize_with(target, || None);
        self.growths += 1;
        Ok(())
    }
}
