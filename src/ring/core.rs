//! Core Ring implementation: queue-pair ownership and lifecycle.

use std::collections::{HashSet, VecDeque};

use io_uring::IoUring;

use crate::arena::{SlotArena, SlotPayload};
use crate::config::RingConfig;
use crate::error::{EngineError, Result};
use crate::logging::Logger;

/// One asynchronous I/O context: the kernel queue pair plus the scratch
/// arena that outlives every staged request.
///
/// # Threading Model
///
/// A `Ring` is designed for exclusive use by one execution context at a
/// time — the typical deployment is one ring per worker thread. There
/// is no internal locking; every mutating operation takes `&mut self`,
/// so the borrow checker enforces the single-writer rule. Moving a ring
/// between threads is fine.
///
/// # Blocking
///
/// Every operation is non-blocking except
/// [`submit_and_wait`](Ring::submit_and_wait). Timeouts and
/// cancellation are not separate primitives: they are ordinary
/// submissions ([`crate::Operation::Timeout`],
/// [`crate::Operation::Cancel`]) whose outcomes arrive through the
/// normal completion stream.
pub struct Ring {
    pub(super) ring: IoUring,
    pub(super) arena: SlotArena,
    /// Ids with a staged or submitted request whose completion has not
    /// been acknowledged yet.
    pub(super) outstanding: HashSet<u64>,
    /// Ids harvested by `peek_batch` and awaiting `advance`.
    pub(super) harvested: VecDeque<u64>,
    pub(super) log: Logger,
}

impl Ring {
    /// Create a ring with the given submission queue depth and default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `entries` is 0 or the kernel rejects queue
    /// creation ([`EngineError::Init`]).
    pub fn new(entries: u32) -> Result<Self> {
        Self::with_config(RingConfig::new(entries))
    }

    /// Create a ring from an explicit configuration.
    ///
    /// The queue pair is always created with fork propagation disabled,
    /// so a forked child never shares or corrupts the parent's queue
    /// state. The kernel may round the requested depth up; see
    /// [`capacity`](Ring::capacity) for the actual value.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured depth is 0 or the kernel
    /// rejects queue creation ([`EngineError::Init`]).
    pub fn with_config(config: RingConfig) -> Result<Self> {
        if config.entries == 0 {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Queue depth must be greater than 0",
            )));
        }

        let mut builder = IoUring::builder();
        builder.dontfork();
        if let Some(cq_entries) = config.cq_entries {
            builder.setup_cqsize(cq_entries);
        }
        if let Some(idle) = config.sqpoll_idle {
            builder.setup_sqpoll(idle);
        }
        if config.iopoll {
            builder.setup_iopoll();
        }
        if config.clamp {
            builder.setup_clamp();
        }

        let ring = builder.build(config.entries).map_err(EngineError::Init)?;
        let log = Logger::new("ring", config.log_level);
        log.debug(&format!(
            "initialized: {} sq entries, {} cq entries",
            ring.params().sq_entries(),
            ring.params().cq_entries()
        ));

        let arena = SlotArena::with_capacity(ring.params().sq_entries() as usize);
        Ok(Self {
            ring,
            arena,
            outstanding: HashSet::new(),
            harvested: VecDeque::new(),
            log,
        })
    }

    /// Actual submission queue depth, after kernel rounding.
    pub fn capacity(&self) -> u32 {
        self.ring.params().sq_entries()
    }

    /// Actual completion queue depth.
    pub fn completion_capacity(&self) -> u32 {
        self.ring.params().cq_entries()
    }

    /// Number of requests staged or submitted whose completions have
    /// not been acknowledged.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Whether `id` currently belongs to an unacknowledged request.
    pub fn is_outstanding(&self, id: u64) -> bool {
        self.outstanding.contains(&id)
    }

    /// Read-only view of the scratch arena.
    pub fn arena(&self) -> &SlotArena {
        &self.arena
    }

    /// The scratch payload staged for `id`, if its slot was ever
    /// allocated. After the matching completion has been harvested this
    /// is how kernel-written payloads are read back (accepted peer
    /// address, statx block, datagram source).
    pub fn slot_payload(&self, id: u64) -> Option<&SlotPayload> {
        self.arena.peek(id).map(|slot| slot.payload())
    }

    /// Release the queue pair and every arena slot.
    ///
    /// Does not drain or wait: any operation still in flight is the
    /// caller's responsibility to have resolved first. Dropping the
    /// ring is equivalent.
    pub fn close(self) {
        drop(self);
    }
}

// SAFETY: the raw pointers inside scratch payloads target either the
// payload's own boxed fields or caller-owned buffers whose validity
// contract is not tied to a thread. Moving the ring moves exclusive
// ownership of all of it; &mut receivers prevent sharing.
unsafe impl Send for Ring {}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("capacity", &self.capacity())
            .field("outstanding", &self.outstanding.len())
            .field("arena_capacity", &self.arena.capacity())
            .finish()
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        if !self.outstanding.is_empty() {
            self.log.warn(&format!(
                "closed with {} request(s) outstanding; their completions are lost",
                self.outstanding.len()
            ));
        }
    }
}
