//! Tagged scratch payload shapes.
//!
//! Each request slot stores exactly one of these shapes at a time,
//! selected by the operation that claims the slot. The kernel reads
//! from or writes into the shape asynchronously, so every variant is
//! plain, pinned-in-place data: no heap indirection inside a payload.

use std::fmt;
use std::net::SocketAddr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use io_uring::types::Timespec;

use crate::error::{EngineError, Result};
use crate::socket::decode_addr;

/// Maximum byte length of inline path text, excluding the terminating
/// NUL. Longer paths are rejected with [`EngineError::PathTooLong`]
/// rather than silently truncated.
pub const MAX_PATH_LEN: usize = 4095;

/// Inline, NUL-terminated path block.
pub(crate) type PathBlock = [u8; MAX_PATH_LEN + 1];

/// Discriminant of a [`SlotPayload`], used to inspect which shape a
/// slot currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// No shape claimed yet (freshly allocated slot) or shape retired.
    Unused,
    /// Kernel timespec for timeout-kind requests.
    Timeout,
    /// Socket address plus length (accept output, connect input).
    SocketAddress,
    /// Single I/O vector for vectored transfers.
    IoVector,
    /// Message header with its vector and address storage.
    MessageHeader,
    /// Inline path text.
    Path,
    /// Inline path text plus extended file-status output block.
    Stat,
}

/// One scratch payload, tagged by shape.
///
/// Replaces a raw reused memory block: an operation claims the slot
/// with the one shape it needs, and nothing can reinterpret the bytes
/// as a different shape without going through the tag.
pub enum SlotPayload {
    /// No shape claimed.
    Unused,
    /// Timeout spec passed to the kernel by address.
    Timeout(Timespec),
    /// Socket address storage written by accept or read by connect.
    SocketAddress {
        /// Family-agnostic address bytes.
        storage: libc::sockaddr_storage,
        /// Encoded (input) or kernel-written (output) length.
        len: libc::socklen_t,
    },
    /// Single I/O vector referencing a caller-owned buffer.
    IoVector {
        /// The vector handed to the kernel by address.
        iov: libc::iovec,
    },
    /// Message header for sendmsg/recvmsg.
    MessageHeader {
        /// Header handed to the kernel by address; its pointers target
        /// the sibling fields below.
        hdr: libc::msghdr,
        /// Vector referencing the caller-owned buffer.
        iov: libc::iovec,
        /// Destination (send) or source (receive) address bytes.
        storage: libc::sockaddr_storage,
    },
    /// Inline, NUL-terminated path text.
    Path {
        /// Path bytes plus terminator.
        bytes: PathBlock,
        /// Length of the path in bytes, excluding the terminator.
        len: usize,
    },
    /// Path text plus the statx output block the kernel fills.
    Stat {
        /// Path bytes plus terminator.
        bytes: PathBlock,
        /// Length of the path in bytes, excluding the terminator.
        len: usize,
        /// Extended file status written on completion.
        statx: libc::statx,
    },
}

impl SlotPayload {
    /// Which shape is currently stored.
    pub fn kind(&self) -> PayloadKind {
        match self {
            SlotPayload::Unused => PayloadKind::Unused,
            SlotPayload::Timeout(_) => PayloadKind::Timeout,
            SlotPayload::SocketAddress { .. } => PayloadKind::SocketAddress,
            SlotPayload::IoVector { .. } => PayloadKind::IoVector,
            SlotPayload::MessageHeader { .. } => PayloadKind::MessageHeader,
            SlotPayload::Path { .. } => PayloadKind::Path,
            SlotPayload::Stat { .. } => PayloadKind::Stat,
        }
    }

    /// Decode the stored socket address, if this payload holds one the
    /// kernel has written (accepted peer, datagram source).
    pub fn socket_address(&self) -> Option<SocketAddr> {
        match self {
            SlotPayload::SocketAddress { storage, len } => decode_addr(storage, *len),
            SlotPayload::MessageHeader { hdr, storage, .. } => {
                decode_addr(storage, hdr.msg_namelen)
            }
            _ => None,
        }
    }

    /// The extended file-status block, if this payload holds one.
    pub fn file_status(&self) -> Option<&libc::statx> {
        match self {
            SlotPayload::Stat { statx, .. } => Some(statx),
            _ => None,
        }
    }

    /// The inline path text, if this payload holds one.
    pub fn path_text(&self) -> Option<&[u8]> {
        match self {
            SlotPayload::Path { bytes, len } => Some(&bytes[..*len]),
            SlotPayload::Stat { bytes, len, .. } => Some(&bytes[..*len]),
            _ => None,
        }
    }
}

impl fmt::Debug for SlotPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlotPayload").field(&self.kind()).finish()
    }
}

/// Copy path text into an inline block, enforcing the length bound and
/// rejecting interior NULs.
pub(crate) fn copy_path(block: &mut PathBlock, path: &Path) -> Result<usize> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.len() > MAX_PATH_LEN {
        return Err(EngineError::PathTooLong {
            len: bytes.len(),
            max: MAX_PATH_LEN,
        });
    }
    if bytes.contains(&0) {
        return Err(EngineError::PathHasNul);
    }

    block[..bytes.len()].copy_from_slice(bytes);
    block[bytes.len()] = 0;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tracks_variant() {
        assert_eq!(SlotPayload::Unused.kind(), PayloadKind::Unused);
        assert_eq!(
            SlotPayload::Timeout(Timespec::new()).kind(),
            PayloadKind::Timeout
        );
    }

    #[test]
    fn copy_path_terminates() {
        let mut block: PathBlock = [0xff; MAX_PATH_LEN + 1];
        let len = copy_path(&mut block, Path::new("/tmp/data")).unwrap();

        assert_eq!(len, 9);
        assert_eq!(&block[..len], b"/tmp/data");
        assert_eq!(block[len], 0);
    }

    #[test]
    fn copy_path_rejects_oversized() {
        let mut block: PathBlock = [0; MAX_PATH_LEN + 1];
        let long = "x".repeat(MAX_PATH_LEN + 1);

        match copy_path(&mut block, Path::new(&long)) {
            Err(EngineError::PathTooLong { len, max }) => {
                assert_eq!(len, MAX_PATH_LEN + 1);
                assert_eq!(max, MAX_PATH_LEN);
            }
            other => panic!("expected PathTooLong, got {other:?}"),
        }
    }

    #[test]
    fn copy_path_accepts_exact_limit() {
        let mut block: PathBlock = [0; MAX_PATH_LEN + 1];
        let exact = "x".repeat(MAX_PATH_LEN);

        assert_eq!(copy_path(&mut block, Path::new(&exact)).unwrap(), MAX_PATH_LEN);
        assert_eq!(block[MAX_PATH_LEN], 0);
    }

    #[test]
    fn non_address_payloads_decode_to_none() {
        assert!(SlotPayload::Unused.socket_address().is_none());
        assert!(SlotPayload::Timeout(Timespec::new()).socket_address().is_none());
        assert!(SlotPayload::Unused.file_status().is_none());
        assert!(SlotPayload::Unused.path_text().is_none());
    }
}
