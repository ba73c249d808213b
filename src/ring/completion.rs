//! Completion harvesting for the Ring.

use std::fmt;
use std::io;

use super::core::Ring;
use crate::error::{EngineError, Result};

/// One harvested completion: request id, result code, flags.
///
/// The layout is part of the foreign wire contract and is bit-exact
/// with the original: two consecutive 64-bit words, word 0 the
/// correlation id, word 1 the 32-bit result in the high half and the
/// 32-bit flags in the low half.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionRecord {
    request_id: u64,
    packed: u64,
}

impl CompletionRecord {
    /// Build a record from its parts.
    pub fn new(request_id: u64, result: i32, flags: u32) -> Self {
        Self {
            request_id,
            packed: ((result as u32 as u64) << 32) | flags as u64,
        }
    }

    /// The correlation id of the submission this outcome belongs to.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Operation result: bytes transferred, a new descriptor, or a
    /// negated errno when negative.
    pub fn result(&self) -> i32 {
        (self.packed >> 32) as u32 as i32
    }

    /// Completion flags reported by the kernel.
    pub fn flags(&self) -> u32 {
        self.packed as u32
    }

    /// The record as its two wire words.
    pub fn to_words(self) -> [u64; 2] {
        [self.request_id, self.packed]
    }

    /// Rebuild a record from its two wire words.
    pub fn from_words(words: [u64; 2]) -> Self {
        Self {
            request_id: words[0],
            packed: words[1],
        }
    }

    /// The result as an `io::Result`, mapping negated errno codes to
    /// `io::Error`.
    pub fn io_result(&self) -> io::Result<i32> {
        let result = self.result();
        if result < 0 {
            Err(io::Error::from_raw_os_error(-result))
        } else {
            Ok(result)
        }
    }
}

impl fmt::Debug for CompletionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRecord")
            .field("request_id", &self.request_id)
            .field("result", &self.result())
            .field("flags", &self.flags())
            .finish()
    }
}

impl Ring {
    /// Copy ready completions into `out`, at most `out.len()` of them,
    /// without blocking. Returns the number harvested; 0 when nothing
    /// is pending.
    ///
    /// Harvested records remain counted by
    /// [`ready_count`](super::Ring::ready_count) until acknowledged
    /// with [`advance`](super::Ring::advance); completions beyond the
    /// buffer capacity stay queued for the next call.
    pub fn peek_batch(&mut self, out: &mut [CompletionRecord]) -> usize {
        if out.is_empty() {
            return 0;
        }

        let mut count = 0;
        let mut cq = self.ring.completion();
        while count < out.len() {
            let Some(cqe) = cq.next() else { break };
            out[count] = CompletionRecord::new(cqe.user_data(), cqe.result(), cqe.flags());
            self.harvested.push_back(cqe.user_data());
            count += 1;
        }

        count
    }

    /// Acknowledge `n` harvested completions.
    ///
    /// Must be called exactly once per harvested batch with `n` equal
    /// to the batch size; the acknowledged request ids are retired and
    /// become reusable. The ready count decreases by exactly `n` and
    /// never goes negative.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(
            n <= self.harvested.len(),
            "advance(n) must match the harvested batch size"
        );
        for _ in 0..n {
            let Some(id) = self.harvested.pop_front() else {
                break;
            };
            self.outstanding.remove(&id);
        }
    }

    /// Number of completions currently available: kernel-ready plus
    /// harvested-but-unacknowledged. Non-consuming.
    pub fn ready_count(&mut self) -> usize {
        self.ring.completion().len() + self.harvested.len()
    }

    /// Flush all staged entries to the kernel without waiting.
    ///
    /// Returns the number of entries submitted. An interrupting signal
    /// is reported as `Ok(0)`; retry.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] for kernel-level submission failures.
    pub fn submit(&mut self) -> Result<usize> {
        match self.ring.submit() {
            Ok(submitted) => Ok(submitted),
            Err(e) if e.raw_os_error() == Some(libc::EINTR) => Ok(0),
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    /// Flush all staged entries and block until at least `min_complete`
    /// completions are available.
    ///
    /// The engine's sole suspension point. There is no intrinsic
    /// timeout: stage a [`crate::Operation::Timeout`] request to bound
    /// the wait through the normal completion path. An interrupting
    /// signal is reported as `Ok(0)` — a partial count, not a failure —
    /// and callers must be prepared to retry.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] for kernel-level submission failures.
    pub fn submit_and_wait(&mut self, min_complete: usize) -> Result<usize> {
        match self.ring.submit_and_wait(min_complete) {
            Ok(submitted) => Ok(submitted),
            Err(e) if e.raw_os_error() == Some(libc::EINTR) => Ok(0),
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    /// Free submission-queue capacity, without blocking.
    pub fn space_left(&mut self) -> usize {
        let sq = self.ring.submission();
        sq.capacity() - sq.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod wire_layout {
        use super::*;

        #[test]
        fn result_packs_into_high_half() {
            let record = CompletionRecord::new(0xF00D, 4, 0);
            assert_eq!(record.to_words(), [0xF00D, 4u64 << 32]);
        }

        #[test]
        fn flags_pack_into_low_half() {
            let record = CompletionRecord::new(1, 0, 0xABCD);
            assert_eq!(record.to_words(), [1, 0xABCD]);
        }

        #[test]
        fn negative_result_survives_packing() {
            let record = CompletionRecord::new(7, -libc::ETIME, 3);
            assert_eq!(record.result(), -libc::ETIME);
            assert_eq!(record.flags(), 3);
            assert_eq!(record.request_id(), 7);
        }

        #[test]
        fn words_round_trip() {
            let record = CompletionRecord::new(u64::MAX, i32::MIN, u32::MAX);
            assert_eq!(CompletionRecord::from_words(record.to_words()), record);
        }

        #[test]
        fn record_is_two_words_wide() {
            assert_eq!(std::mem::size_of::<CompletionRecord>(), 16);
            assert_eq!(std::mem::align_of::<CompletionRecord>(), 8);
        }
    }

    mod result_conversion {
        use super::*;

        #[test]
        fn success_passes_through() {
            let record = CompletionRecord::new(1, 512, 0);
            assert_eq!(record.io_result().unwrap(), 512);
        }

        #[test]
        fn negated_errno_becomes_io_error() {
            let record = CompletionRecord::new(1, -libc::EBADF, 0);
            let err = record.io_result().unwrap_err();
            assert_eq!(err.raw_os_error(), Some(libc::EBADF));
        }
    }
}
