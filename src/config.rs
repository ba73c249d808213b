//! Ring construction knobs for different deployment shapes.

use crate::logging::LogLevel;

/// Configuration for building a [`crate::Ring`].
///
/// Every field maps onto an `io_uring` setup parameter; the defaults
/// produce a plain ring suitable for a single-threaded poll loop. The
/// ring is always created with fork propagation disabled — a forked
/// child must never share the parent's queue mappings.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Number of submission queue entries. The kernel may round this up.
    pub entries: u32,
    /// Completion queue depth override (None = kernel default, twice the
    /// submission queue depth).
    pub cq_entries: Option<u32>,
    /// Enable kernel-side submission polling with this idle timeout in
    /// milliseconds.
    pub sqpoll_idle: Option<u32>,
    /// Use polled rather than interrupt-driven completions (O_DIRECT
    /// storage workloads only).
    pub iopoll: bool,
    /// Clamp oversized queue depths to the kernel maximum instead of
    /// failing initialization.
    pub clamp: bool,
    /// Minimum level for engine diagnostics on stderr.
    pub log_level: LogLevel,
}

impl RingConfig {
    /// Configuration with the given submission queue depth and defaults
    /// for everything else.
    pub fn new(entries: u32) -> Self {
        Self {
            entries,
            cq_entries: None,
            sqpoll_idle: None,
            iopoll: false,
            clamp: false,
            log_level: LogLevel::Warn,
        }
    }

    /// Low-latency preset: modest queue, kernel-side submission polling
    /// so `submit_and_wait` rarely needs a syscall to kick submissions.
    pub fn low_latency() -> Self {
        Self {
            entries: 128,
            sqpoll_idle: Some(100),
            clamp: true,
            ..Self::new(128)
        }
    }

    /// High-throughput preset: deep queues sized for batch harvesting.
    ///
    /// The completion queue is widened to twice the submission depth so
    /// bursts of completions are not dropped while the caller drains in
    /// batches.
    pub fn high_throughput() -> Self {
        Self {
            entries: 4096,
            cq_entries: Some(8192),
            clamp: true,
            ..Self::new(4096)
        }
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(256)
    }
}
