//! Kernel capability probing.
//!
//! The probe result is a process-scoped descriptor with defined,
//! once-only initialization — not an ambient mutable global. It owns no
//! kernel resources: the throwaway ring used for probing is released
//! inside [`Capabilities::detect`], so there is nothing to tear down.

use std::ffi::CStr;
use std::io;
use std::mem;
use std::sync::OnceLock;

use io_uring::{register::Probe, IoUring};

use crate::error::{EngineError, Result};
use crate::operation::Operation;

static SHARED: OnceLock<Option<Capabilities>> = OnceLock::new();

/// Kernel version as reported by `uname`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    /// Major version number
    pub major: u32,
    /// Minor version number
    pub minor: u32,
    /// Patch version number
    pub patch: u32,
}

impl KernelVersion {
    /// Whether this kernel is at least `major.minor`.
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    fn detect() -> Result<Self> {
        // SAFETY: utsname is valid when zeroed and uname only writes it.
        let mut uts: libc::utsname = unsafe { mem::zeroed() };
        if unsafe { libc::uname(&mut uts) } != 0 {
            return Err(EngineError::Io(io::Error::last_os_error()));
        }

        // SAFETY: the kernel NUL-terminates the release field.
        let release = unsafe { CStr::from_ptr(uts.release.as_ptr()) };
        let release = release.to_string_lossy();

        let mut parts = release.split('.');
        let major = leading_number(parts.next().unwrap_or(""));
        let minor = leading_number(parts.next().unwrap_or(""));
        let patch = leading_number(parts.next().unwrap_or(""));

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

/// Numeric prefix of a version component ("14-generic" -> 14).
fn leading_number(text: &str) -> u32 {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Probed io_uring capabilities of the running kernel.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// The running kernel version.
    pub kernel: KernelVersion,
    supported: [bool; 256],
}

impl Capabilities {
    /// Probe the running kernel.
    ///
    /// Creates a short-lived ring, registers an opcode probe against
    /// it, and releases it before returning.
    ///
    /// # Errors
    ///
    /// [`EngineError::Init`] if no ring can be created at all (io_uring
    /// absent or forbidden); [`EngineError::Io`] if the probe
    /// registration itself fails (pre-5.6 kernels).
    pub fn detect() -> Result<Self> {
        let kernel = KernelVersion::detect()?;

        let ring = IoUring::new(2).map_err(EngineError::Init)?;
        let mut probe = Probe::new();
        ring.submitter()
            .register_probe(&mut probe)
            .map_err(EngineError::Io)?;

        let mut supported = [false; 256];
        for (code, entry) in supported.iter_mut().enumerate() {
            *entry = probe.is_supported(code as u8);
        }

        Ok(Self { kernel, supported })
    }

    /// The process-wide descriptor, detected once on first use.
    ///
    /// `None` when detection failed — io_uring is unavailable or too
    /// old to probe; the outcome is cached either way.
    pub fn shared() -> Option<&'static Capabilities> {
        SHARED.get_or_init(|| Self::detect().ok()).as_ref()
    }

    /// Whether the kernel supports the opcode `op` encodes to.
    pub fn supports(&self, op: &Operation<'_>) -> bool {
        self.supports_code(op.code())
    }

    /// Whether the kernel supports a raw opcode.
    pub fn supports_code(&self, code: u8) -> bool {
        self.supported[code as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_number_parses_distribution_suffixes() {
        assert_eq!(leading_number("14"), 14);
        assert_eq!(leading_number("0-rc3"), 0);
        assert_eq!(leading_number("27-generic"), 27);
        assert_eq!(leading_number(""), 0);
    }

    #[test]
    fn version_ordering() {
        let v = KernelVersion {
            major: 5,
            minor: 11,
            patch: 0,
        };
        assert!(v.at_least(5, 1));
        assert!(v.at_least(5, 11));
        assert!(!v.at_least(5, 12));
        assert!(!v.at_least(6, 0));
    }

    #[test]
    fn kernel_version_detects() {
        let version = KernelVersion::detect().unwrap();
        assert!(version.major > 0);
    }

    #[test]
    fn detected_capabilities_include_nop() {
        // Probing needs a working io_uring; skip where absent.
        let Ok(caps) = Capabilities::detect() else {
            return;
        };
        assert!(caps.supports(&Operation::Nop));
    }

    #[test]
    fn shared_is_idempotent() {
        let first = Capabilities::shared().is_some();
        let second = Capabilities::shared().is_some();
        assert_eq!(first, second);
    }
}
