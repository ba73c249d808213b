//! Submission staging for the Ring.

use io_uring::squeue::{Entry, Flags};
use io_uring::{opcode, types};

use super::core::Ring;
use crate::error::{EngineError, Result};
use crate::operation::Operation;

impl Ring {
    /// Stage one submission entry for `op`, tagged with `request_id`.
    ///
    /// Obtains the next free submission slot, encodes the operation,
    /// stamps the per-entry flags and the correlation id verbatim, and
    /// leaves the entry staged — nothing is flushed to the kernel until
    /// [`submit`](super::Ring::submit) or
    /// [`submit_and_wait`](super::Ring::submit_and_wait).
    ///
    /// The correlation id is the load-bearing invariant: every later
    /// completion traces back to exactly one prior submission through
    /// it. An id still attached to an unacknowledged request is
    /// rejected; it becomes reusable once its completion has been
    /// harvested and acknowledged via [`advance`](super::Ring::advance).
    ///
    /// Operations that need kernel-visible scratch memory (timeout
    /// specs, socket addresses, I/O vectors, message headers, path
    /// text, statx blocks) claim the arena slot keyed by `request_id`;
    /// the slot's previous payload is overwritten.
    ///
    /// # Caller contract
    ///
    /// Buffers referenced by `op` are caller-owned raw pointers. They
    /// must stay valid — neither freed nor moved — until the completion
    /// carrying `request_id` has been harvested.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoSubmissionSlot`] if the submission queue is
    ///   saturated; nothing is staged and the id is not marked
    ///   outstanding. Flush and retry.
    /// - [`EngineError::DuplicateRequestId`] if `request_id` is still
    ///   outstanding.
    /// - [`EngineError::PathTooLong`] / [`EngineError::PathHasNul`] for
    ///   unusable path text.
    /// - [`EngineError::AllocationFailure`] if the arena could not grow
    ///   to cover `request_id`.
    pub fn prepare(&mut self, op: Operation<'_>, flags: Flags, request_id: u64) -> Result<()> {
        if self.outstanding.contains(&request_id) {
            return Err(EngineError::DuplicateRequestId { id: request_id });
        }
        // Checked before encoding: claiming an arena payload for an entry
        // that cannot be staged would count as a side effect.
        if self.ring.submission().is_full() {
            return Err(EngineError::NoSubmissionSlot);
        }

        let growths_before = self.arena.growths();
        let entry = self.encode(&op, request_id)?;
        if self.arena.growths() != growths_before {
            self.log.debug(&format!(
                "arena grew to {} slots for request {request_id}",
                self.arena.capacity()
            ));
        }

        let entry = entry.flags(flags).user_data(request_id);

        let mut sq = self.ring.submission();
        // SAFETY: scratch payloads live in the boxed arena slot until ring
        // teardown, and the caller keeps op's buffers alive until the
        // completion for request_id is harvested.
        let pushed = unsafe { sq.push(&entry) };
        drop(sq);

        match pushed {
            Ok(()) => {
                self.outstanding.insert(request_id);
                Ok(())
            }
            Err(_) => Err(EngineError::NoSubmissionSlot),
        }
    }

    /// Encode `op` into a submission entry, claiming the request slot
    /// where the operation needs scratch memory.
    fn encode(&mut self, op: &Operation<'_>, request_id: u64) -> Result<Entry> {
        let entry = match *op {
            Operation::Nop => opcode::Nop::new().build(),
            Operation::Read {
                fd,
                buf,
                len,
                offset,
            } => opcode::Read::new(types::Fd(fd), buf, len)
                .offset(offset)
                .build(),
            Operation::Write {
                fd,
                buf,
                len,
                offset,
            } => opcode::Write::new(types::Fd(fd), buf, len)
                .offset(offset)
                .build(),
            Operation::ReadVectored {
                fd,
                buf,
                len,
                offset,
            } => {
                let iov = self
                    .arena
                    .slot(request_id)?
                    .claim_io_vector(buf, len as usize);
                opcode::Readv::new(types::Fd(fd), iov, 1)
                    .offset(offset)
                    .build()
            }
            Operation::WriteVectored {
                fd,
                buf,
                len,
                offset,
            } => {
                let iov = self
                    .arena
                    .slot(request_id)?
                    .claim_io_vector(buf as *mut u8, len as usize);
                opcode::Writev::new(types::Fd(fd), iov, 1)
                    .offset(offset)
                    .build()
            }
            Operation::Fsync { fd, datasync } => {
                let flags = if datasync {
                    types::FsyncFlags::DATASYNC
                } else {
                    types::FsyncFlags::empty()
                };
                opcode::Fsync::new(types::Fd(fd)).flags(flags).build()
            }
            Operation::Timeout {
                secs,
                nanos,
                count,
                absolute,
            } => {
                let ts = self.arena.slot(request_id)?.claim_timeout(secs, nanos);
                let flags = if absolute {
                    types::TimeoutFlags::ABS
                } else {
                    types::TimeoutFlags::empty()
                };
                opcode::Timeout::new(ts).count(count).flags(flags).build()
            }
            Operation::TimeoutRemove { target } => opcode::TimeoutRemove::new(target).build(),
            Operation::LinkTimeout { secs, nanos } => {
                let ts = self.arena.slot(request_id)?.claim_timeout(secs, nanos);
                opcode::LinkTimeout::new(ts).build()
            }
            Operation::Cancel { target } => opcode::AsyncCancel::new(target).build(),
            Operation::Open { path, flags, mode } => {
                let path_ptr = self.arena.slot(request_id)?.claim_path(path)?;
                opcode::OpenAt::new(types::Fd(libc::AT_FDCWD), path_ptr)
                    .flags(flags)
                    .mode(mode)
                    .build()
            }
            Operation::Close { fd } => opcode::Close::new(types::Fd(fd)).build(),
            Operation::Stat { path, flags, mask } => {
                let (path_ptr, statx_ptr) = self.arena.slot(request_id)?.claim_stat(path)?;
                opcode::Statx::new(types::Fd(libc::AT_FDCWD), path_ptr, statx_ptr.cast())
                    .flags(flags)
                    .mask(mask)
                    .build()
            }
            Operation::Accept { fd, flags } => {
                let (addr, addrlen) = self.arena.slot(request_id)?.claim_accept_address();
                opcode::Accept::new(types::Fd(fd), addr, addrlen)
                    .flags(flags)
                    .build()
            }
            Operation::Connect { fd, addr } => {
                let (addr_ptr, addrlen) = self
                    .arena
                    .slot(request_id)?
                    .claim_connect_address(&addr);
                opcode::Connect::new(types::Fd(fd), addr_ptr, addrlen).build()
            }
            Operation::Send {
                fd,
                buf,
                len,
                flags,
            } => opcode::Send::new(types::Fd(fd), buf, len)
                .flags(flags)
                .build(),
            Operation::Recv {
                fd,
                buf,
                len,
                flags,
            } => opcode::Recv::new(types::Fd(fd), buf, len)
                .flags(flags)
                .build(),
            Operation::SendMsg {
                fd,
                buf,
                len,
                dest,
                flags,
            } => {
                let hdr = self.arena.slot(request_id)?.claim_message_header(
                    buf as *mut u8,
                    len,
                    dest.as_ref(),
                    false,
                );
                opcode::SendMsg::new(types::Fd(fd), hdr).flags(flags).build()
            }
            Operation::RecvMsg {
                fd,
                buf,
                len,
                flags,
            } => {
                let hdr = self
                    .arena
                    .slot(request_id)?
                    .claim_message_header(buf, len, None, true);
                opcode::RecvMsg::new(types::Fd(fd), hdr).flags(flags).build()
            }
        };

        Ok(entry)
    }
}
