//! Typed submission descriptors.
//!
//! One [`Operation`] describes exactly one asynchronous request: which
//! opcode, which file descriptor, which caller-owned buffer, and the
//! per-operation flags. The shape of the scratch memory a request needs
//! (timeout spec, socket address, I/O vector, message header, path text,
//! file-status block) is implied by the variant, and the encoder claims a
//! matching arena payload for it — there is no raw opcode integer and no
//! untyped scratch block anywhere at this boundary.
//!
//! Buffers are raw pointers on purpose: they belong to the foreign caller
//! above the engine, which guarantees their lifetime until the matching
//! completion is harvested. See [`crate::Ring::prepare`] for the contract.

use std::net::SocketAddr;
use std::os::unix::io::RawFd;
use std::path::Path;

use io_uring::opcode;

/// Description of one asynchronous operation to stage.
///
/// The lifetime parameter covers borrowed path text; paths are copied
/// into the request slot during [`crate::Ring::prepare`], so the borrow
/// ends when `prepare` returns.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'req> {
    /// No-op request; completes immediately with result 0.
    Nop,
    /// Read `len` bytes into `buf` from `fd` at `offset`.
    Read {
        /// Source descriptor.
        fd: RawFd,
        /// Caller-owned destination buffer.
        buf: *mut u8,
        /// Buffer length in bytes.
        len: u32,
        /// File offset (`u64::MAX` reads at the current position).
        offset: u64,
    },
    /// Write `len` bytes from `buf` to `fd` at `offset`.
    Write {
        /// Destination descriptor.
        fd: RawFd,
        /// Caller-owned source buffer.
        buf: *const u8,
        /// Buffer length in bytes.
        len: u32,
        /// File offset (`u64::MAX` writes at the current position).
        offset: u64,
    },
    /// Vectored read through a single kernel-visible I/O vector.
    ReadVectored {
        /// Source descriptor.
        fd: RawFd,
        /// Caller-owned destination buffer.
        buf: *mut u8,
        /// Buffer length in bytes.
        len: u32,
        /// File offset.
        offset: u64,
    },
    /// Vectored write through a single kernel-visible I/O vector.
    WriteVectored {
        /// Destination descriptor.
        fd: RawFd,
        /// Caller-owned source buffer.
        buf: *const u8,
        /// Buffer length in bytes.
        len: u32,
        /// File offset.
        offset: u64,
    },
    /// Flush file data (and metadata unless `datasync`) to storage.
    Fsync {
        /// Descriptor to flush.
        fd: RawFd,
        /// Skip metadata, fdatasync-style.
        datasync: bool,
    },
    /// Kernel-scheduled timeout; completes with `-ETIME` when it fires.
    Timeout {
        /// Seconds component of the timeout.
        secs: u64,
        /// Nanoseconds component of the timeout.
        nanos: u32,
        /// Complete early once this many other completions arrive
        /// (0 = pure timer).
        count: u32,
        /// Interpret the timespec as an absolute clock value.
        absolute: bool,
    },
    /// Remove a previously staged timeout identified by its request id.
    TimeoutRemove {
        /// Request id of the timeout to remove.
        target: u64,
    },
    /// Timeout linked to the previous submission (stage the pair with
    /// [`crate::SqFlags::IO_LINK`] on the preceding entry).
    LinkTimeout {
        /// Seconds component of the timeout.
        secs: u64,
        /// Nanoseconds component of the timeout.
        nanos: u32,
    },
    /// Cancel an outstanding request; the target still completes
    /// (normally with `-ECANCELED`) through the ordinary stream.
    Cancel {
        /// Request id of the submission to cancel.
        target: u64,
    },
    /// Open a file relative to the current working directory.
    Open {
        /// Path text; copied into the request slot.
        path: &'req Path,
        /// `open(2)` flags (`O_RDONLY`, `O_CREAT`, ...).
        flags: i32,
        /// Mode bits when creating.
        mode: u32,
    },
    /// Close a descriptor.
    Close {
        /// Descriptor to close.
        fd: RawFd,
    },
    /// Extended file status into the request slot's statx block.
    Stat {
        /// Path text; copied into the request slot.
        path: &'req Path,
        /// `statx(2)` flags (`AT_SYMLINK_NOFOLLOW`, ...).
        flags: i32,
        /// `STATX_*` field mask.
        mask: u32,
    },
    /// Accept one connection; the peer address lands in the request slot.
    Accept {
        /// Listening socket.
        fd: RawFd,
        /// `accept4(2)` flags (`SOCK_CLOEXEC`, ...).
        flags: i32,
    },
    /// Connect a socket to `addr`.
    Connect {
        /// Socket descriptor.
        fd: RawFd,
        /// Peer address; encoded into the request slot.
        addr: SocketAddr,
    },
    /// Send from a caller-owned buffer.
    Send {
        /// Connected socket.
        fd: RawFd,
        /// Caller-owned source buffer.
        buf: *const u8,
        /// Buffer length in bytes.
        len: u32,
        /// `MSG_*` flags.
        flags: i32,
    },
    /// Receive into a caller-owned buffer.
    Recv {
        /// Connected socket.
        fd: RawFd,
        /// Caller-owned destination buffer.
        buf: *mut u8,
        /// Buffer length in bytes.
        len: u32,
        /// `MSG_*` flags.
        flags: i32,
    },
    /// Datagram-style send through a message header in the request slot.
    SendMsg {
        /// Socket descriptor.
        fd: RawFd,
        /// Caller-owned source buffer.
        buf: *const u8,
        /// Buffer length in bytes.
        len: u32,
        /// Destination address for unconnected sockets.
        dest: Option<SocketAddr>,
        /// `MSG_*` flags.
        flags: u32,
    },
    /// Datagram-style receive; the source address lands in the request
    /// slot alongside the message header.
    RecvMsg {
        /// Socket descriptor.
        fd: RawFd,
        /// Caller-owned destination buffer.
        buf: *mut u8,
        /// Buffer length in bytes.
        len: u32,
        /// `MSG_*` flags.
        flags: u32,
    },
}

impl Operation<'_> {
    /// The raw io_uring opcode this operation encodes to.
    pub fn code(&self) -> u8 {
        match self {
            Operation::Nop => opcode::Nop::CODE,
            Operation::Read { .. } => opcode::Read::CODE,
            Operation::Write { .. } => opcode::Write::CODE,
            Operation::ReadVectored { .. } => opcode::Readv::CODE,
            Operation::WriteVectored { .. } => opcode::Writev::CODE,
            Operation::Fsync { .. } => opcode::Fsync::CODE,
            Operation::Timeout { .. } => opcode::Timeout::CODE,
            Operation::TimeoutRemove { .. } => opcode::TimeoutRemove::CODE,
            Operation::LinkTimeout { .. } => opcode::LinkTimeout::CODE,
            Operation::Cancel { .. } => opcode::AsyncCancel::CODE,
            Operation::Open { .. } => opcode::OpenAt::CODE,
            Operation::Close { .. } => opcode::Close::CODE,
            Operation::Stat { .. } => opcode::Statx::CODE,
            Operation::Accept { .. } => opcode::Accept::CODE,
            Operation::Connect { .. } => opcode::Connect::CODE,
            Operation::Send { .. } => opcode::Send::CODE,
            Operation::Recv { .. } => opcode::Recv::CODE,
            Operation::SendMsg { .. } => opcode::SendMsg::CODE,
            Operation::RecvMsg { .. } => opcode::RecvMsg::CODE,
        }
    }

    /// Short operation name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Nop => "nop",
            Operation::Read { .. } => "read",
            Operation::Write { .. } => "write",
            Operation::ReadVectored { .. } => "readv",
            Operation::WriteVectored { .. } => "writev",
            Operation::Fsync { .. } => "fsync",
            Operation::Timeout { .. } => "timeout",
            Operation::TimeoutRemove { .. } => "timeout_remove",
            Operation::LinkTimeout { .. } => "link_timeout",
            Operation::Cancel { .. } => "cancel",
            Operation::Open { .. } => "openat",
            Operation::Close { .. } => "close",
            Operation::Stat { .. } => "statx",
            Operation::Accept { .. } => "accept",
            Operation::Connect { .. } => "connect",
            Operation::Send { .. } => "send",
            Operation::Recv { .. } => "recv",
            Operation::SendMsg { .. } => "sendmsg",
            Operation::RecvMsg { .. } => "recvmsg",
        }
    }

    /// Whether encoding this operation claims the request slot for
    /// kernel-visible scratch memory.
    pub fn needs_scratch(&self) -> bool {
        matches!(
            self,
            Operation::ReadVectored { .. }
                | Operation::WriteVectored { .. }
                | Operation::Timeout { .. }
                | Operation::LinkTimeout { .. }
                | Operation::Open { .. }
                | Operation::Stat { .. }
                | Operation::Accept { .. }
                | Operation::Connect { .. }
                | Operation::SendMsg { .. }
                | Operation::RecvMsg { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let ops = [
            Operation::Nop.code(),
            Operation::Close { fd: 0 }.code(),
            Operation::Cancel { target: 0 }.code(),
            Operation::TimeoutRemove { target: 0 }.code(),
            Operation::Fsync {
                fd: 0,
                datasync: false,
            }
            .code(),
        ];

        for (i, a) in ops.iter().enumerate() {
            for b in &ops[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn scratch_classification() {
        assert!(!Operation::Nop.needs_scratch());
        assert!(!Operation::Read {
            fd: 0,
            buf: std::ptr::null_mut(),
            len: 0,
            offset: 0
        }
        .needs_scratch());

        assert!(Operation::Accept { fd: 0, flags: 0 }.needs_scratch());
        assert!(Operation::Timeout {
            secs: 1,
            nanos: 0,
            count: 0,
            absolute: false
        }
        .needs_scratch());
        assert!(Operation::Open {
            path: Path::new("/tmp/x"),
            flags: 0,
            mode: 0
        }
        .needs_scratch());
    }

    #[test]
    fn names_match_variants() {
        assert_eq!(Operation::Nop.name(), "nop");
        assert_eq!(Operation::Accept { fd: 3, flags: 0 }.name(), "accept");
        assert_eq!(
            Operation::Stat {
                path: Path::new("/"),
                flags: 0,
                mask: 0
            }
            .name(),
            "statx"
        );
    }
}
