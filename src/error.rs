//! Error types and handling for the engine.
//!
//! All host/kernel-level failures that arrive through the completion path
//! stay numeric (negative results inside a [`crate::CompletionRecord`]);
//! this module covers the failures the engine itself can produce while
//! staging, harvesting, or bootstrapping.

use std::io;
use std::os::unix::io::RawFd;

use static_assertions;
use thiserror::Error;

use crate::socket::SocketOption;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error type covering every failure mode of the engine.
///
/// # Design Notes
///
/// - Uses `thiserror` for automatic `Error` trait implementation
/// - Provides automatic conversion from `io::Error` via `#[from]`
/// - The engine never retries on its own; retry and backoff policy
///   belongs to the caller
#[derive(Debug, Error)]
pub enum EngineError {
    /// Queue-pair creation was rejected by the kernel.
    ///
    /// Not retryable without changing parameters (queue depth, setup
    /// flags) or running on a kernel with io_uring support.
    #[error("ring initialization failed: {0}")]
    Init(#[source] io::Error),

    /// The submission queue is saturated.
    ///
    /// Nothing was staged and no state changed. Flush staged entries
    /// with [`crate::Ring::submit_and_wait`] (and acknowledge harvested
    /// completions) to free space, then retry.
    #[error("submission queue is full")]
    NoSubmissionSlot,

    /// The request arena could not obtain memory while growing.
    ///
    /// Fatal for the operation that triggered it; the arena itself is
    /// left in its previous, consistent state.
    #[error("request arena could not allocate memory")]
    AllocationFailure,

    /// The request id is still attached to an in-flight submission.
    ///
    /// An id becomes reusable only after its completion has been
    /// harvested and acknowledged via [`crate::Ring::advance`].
    #[error("request id {id} is already outstanding")]
    DuplicateRequestId {
        /// The offending correlation id.
        id: u64,
    },

    /// A path does not fit the inline scratch block of a request slot.
    #[error("path of {len} bytes exceeds the {max}-byte inline limit")]
    PathTooLong {
        /// Byte length of the rejected path.
        len: usize,
        /// Maximum supported byte length.
        max: usize,
    },

    /// A path contains an interior NUL byte and cannot be passed to the
    /// kernel as a C string.
    #[error("path contains an interior NUL byte")]
    PathHasNul,

    /// A textual socket address could not be parsed.
    ///
    /// Reported before any syscall is attempted.
    #[error("invalid socket address: {text}")]
    InvalidAddress {
        /// The unparsable input.
        text: String,
    },

    /// Best-effort socket option application stopped at this option.
    ///
    /// Options applied before the failing one remain in effect and the
    /// socket stays open: `fd` is valid and owned by the caller.
    #[error("failed to apply {option:?} to socket {fd}: {source}")]
    SocketOption {
        /// The still-valid socket.
        fd: RawFd,
        /// The option that could not be applied.
        option: SocketOption,
        /// The underlying OS error.
        source: io::Error,
    },

    /// Standard I/O error from a syscall outside the categories above.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// Completion results cross thread boundaries in ring-per-worker setups.
static_assertions::assert_impl_all!(EngineError: Send, Sync);
