//! # uring-engine: a low-level io_uring engine
//!
//! A thin asynchronous I/O engine over the Linux io_uring queue pair,
//! built to sit beneath a foreign boundary: a managed-language runtime
//! stages operations tagged with integer request ids and harvests their
//! outcomes in batches. The engine owns the hard part — scratch memory
//! that must outlive the call that staged it, be freed exactly once,
//! and never be reinterpreted as the wrong shape.
//!
//! ## Architecture
//!
//! - [`Ring`] owns the kernel queue pair and a [`arena::SlotArena`] of
//!   per-request scratch slots keyed by correlation id.
//! - [`Operation`] describes one submission; [`Ring::prepare`] encodes
//!   it into a submission entry, claiming a tagged arena payload for
//!   operations that need kernel-visible scratch (timeouts, socket
//!   addresses, I/O vectors, message headers, paths, statx blocks).
//! - [`Ring::submit_and_wait`] is the engine's only blocking call;
//!   [`Ring::peek_batch`] / [`Ring::advance`] harvest and acknowledge
//!   completions as bit-exact two-word [`CompletionRecord`]s.
//! - [`socket`] bootstraps sockets synchronously before they enter the
//!   ring; [`probe`] reports kernel capabilities once per process.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uring_engine::{CompletionRecord, Operation, Ring, SqFlags};
//!
//! # fn main() -> uring_engine::Result<()> {
//! let mut ring = Ring::new(8)?;
//!
//! // Stage a request with correlation id 1 and flush it.
//! ring.prepare(Operation::Nop, SqFlags::empty(), 1)?;
//! ring.submit_and_wait(1)?;
//!
//! // Harvest and acknowledge its completion.
//! let mut out = [CompletionRecord::default(); 8];
//! let n = ring.peek_batch(&mut out);
//! assert_eq!(out[0].request_id(), 1);
//! ring.advance(n);
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading Model
//!
//! One ring per execution context: there is no internal locking, every
//! mutating call takes `&mut self`, and `submit_and_wait` parks only
//! the calling thread. Run one `Ring` per worker thread and never share
//! one behind your own synchronization.
//!
//! ## Platform Support
//!
//! Linux 5.1+ (io_uring). [`probe::Capabilities`] reports what the
//! running kernel actually supports.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod arena;
pub mod config;
pub mod error;
pub mod logging;
pub mod operation;
pub mod probe;
pub mod ring;
pub mod socket;

pub use arena::{PayloadKind, RequestSlot, SlotArena, SlotPayload, MAX_PATH_LEN};
pub use config::RingConfig;
pub use error::{EngineError, Result};
pub use logging::{LogLevel, Logger};
pub use operation::Operation;
pub use probe::{Capabilities, KernelVersion};
pub use ring::{CompletionRecord, Ring};
pub use socket::{SocketFlags, SocketOption};

/// Per-entry submission flags (`IO_LINK`, `IO_DRAIN`, `ASYNC`, ...),
/// re-exported from the underlying ring crate and stamped verbatim by
/// [`Ring::prepare`].
pub use io_uring::squeue::Flags as SqFlags;
