//! Synchronous socket bootstrap helpers.
//!
//! Stateless create/bind/listen wrappers, independent of any ring. A
//! socket is bootstrapped once here, then every subsequent operation on
//! it goes through the asynchronous submission path.

use std::io;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::unix::io::RawFd;

use bitflags::bitflags;

use crate::error::{EngineError, Result};

bitflags! {
    /// Socket creation flags.
    ///
    /// The bit assignment is part of the foreign wire contract and must
    /// not change: bit0 stream, bit1 non-blocking, bit2 reuse-address,
    /// bit3 reuse-port.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SocketFlags: u32 {
        /// Stream socket (TCP); unset means datagram (UDP).
        const STREAM = 1 << 0;
        /// Put the socket in non-blocking mode.
        const NONBLOCKING = 1 << 1;
        /// Apply `SO_REUSEADDR`.
        const REUSE_ADDRESS = 1 << 2;
        /// Apply `SO_REUSEPORT`.
        const REUSE_PORT = 1 << 3;
    }
}

/// Socket options applied best-effort during [`create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOption {
    /// `SO_REUSEADDR`
    ReuseAddress,
    /// `SO_REUSEPORT`
    ReusePort,
}

impl SocketOption {
    fn name(self) -> libc::c_int {
        match self {
            SocketOption::ReuseAddress => libc::SO_REUSEADDR,
            SocketOption::ReusePort => libc::SO_REUSEPORT,
        }
    }
}

/// Create an IPv4 socket according to `flags`.
///
/// Close-on-exec is always set. Reuse options are applied in order
/// (address, then port) and application stops at the first failure:
/// previously applied options remain in effect, and the error carries
/// the still-valid descriptor so the caller can keep or close it.
///
/// # Errors
///
/// [`EngineError::Io`] if socket creation itself fails;
/// [`EngineError::SocketOption`] if an option could not be applied.
pub fn create(flags: SocketFlags) -> Result<RawFd> {
    let mut sock_type = if flags.contains(SocketFlags::STREAM) {
        libc::SOCK_STREAM
    } else {
        libc::SOCK_DGRAM
    };
    sock_type |= libc::SOCK_CLOEXEC;
    if flags.contains(SocketFlags::NONBLOCKING) {
        sock_type |= libc::SOCK_NONBLOCK;
    }

    // SAFETY: plain syscall, no pointers involved.
    let fd = unsafe { libc::socket(libc::AF_INET, sock_type, 0) };
    if fd < 0 {
        return Err(EngineError::Io(io::Error::last_os_error()));
    }

    let requested = [
        (SocketFlags::REUSE_ADDRESS, SocketOption::ReuseAddress),
        (SocketFlags::REUSE_PORT, SocketOption::ReusePort),
    ];

    for (flag, option) in requested {
        if !flags.contains(flag) {
            continue;
        }
        let one: libc::c_int = 1;
        // SAFETY: `one` outlives the call and optlen matches its size.
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                option.name(),
                &one as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(EngineError::SocketOption {
                fd,
                option,
                source: io::Error::last_os_error(),
            });
        }
    }

    Ok(fd)
}

/// Bind `fd` to `port`, on the wildcard address unless a literal
/// address is supplied.
///
/// # Errors
///
/// [`EngineError::InvalidAddress`] if `address` does not parse as an IP
/// literal — reported before any syscall; [`EngineError::Io`] if the
/// bind itself fails.
pub fn bind(fd: RawFd, port: u16, address: Option<&str>) -> Result<()> {
    let ip: IpAddr = match address {
        None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        Some(text) => text.parse().map_err(|_| EngineError::InvalidAddress {
            text: text.to_string(),
        })?,
    };

    // SAFETY: sockaddr_storage is valid when zeroed.
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let len = encode_addr(&mut storage, &SocketAddr::new(ip, port));

    // SAFETY: storage outlives the call and len covers the encoded family.
    let rc = unsafe {
        libc::bind(
            fd,
            &storage as *const libc::sockaddr_storage as *const libc::sockaddr,
            len,
        )
    };
    if rc < 0 {
        return Err(EngineError::Io(io::Error::last_os_error()));
    }

    Ok(())
}

/// Mark `fd` as a passive socket with the given backlog.
///
/// # Errors
///
/// [`EngineError::Io`] with the OS error on failure.
pub fn listen(fd: RawFd, backlog: i32) -> Result<()> {
    // SAFETY: plain syscall, no pointers involved.
    let rc = unsafe { libc::listen(fd, backlog) };
    if rc < 0 {
        return Err(EngineError::Io(io::Error::last_os_error()));
    }
    Ok(())
}

/// Encode a socket address into kernel-visible storage, returning the
/// encoded length.
pub(crate) fn encode_addr(
    storage: &mut libc::sockaddr_storage,
    addr: &SocketAddr,
) -> libc::socklen_t {
    match addr {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr {
                    s_addr: u32::from_ne_bytes(v4.ip().octets()),
                },
                sin_zero: [0; 8],
            };
            // SAFETY: sockaddr_in fits inside sockaddr_storage.
            unsafe {
                std::ptr::write(
                    storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_in,
                    sin,
                )
            };
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t
        }
        SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr {
                    s6_addr: v6.ip().octets(),
                },
                sin6_scope_id: v6.scope_id(),
            };
            // SAFETY: sockaddr_in6 fits inside sockaddr_storage.
            unsafe {
                std::ptr::write(
                    storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_in6,
                    sin6,
                )
            };
            mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t
        }
    }
}

/// Decode a kernel-written socket address, if the stored family is one
/// the engine understands and `len` covers it.
pub(crate) fn decode_addr(
    storage: &libc::sockaddr_storage,
    len: libc::socklen_t,
) -> Option<SocketAddr> {
    match storage.ss_family as libc::c_int {
        libc::AF_INET if len as usize >= mem::size_of::<libc::sockaddr_in>() => {
            // SAFETY: family and length say an initialized sockaddr_in is stored.
            let sin = unsafe {
                &*(storage as *const libc::sockaddr_storage as *const libc::sockaddr_in)
            };
            Some(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes()),
                u16::from_be(sin.sin_port),
            )))
        }
        libc::AF_INET6 if len as usize >= mem::size_of::<libc::sockaddr_in6>() => {
            // SAFETY: family and length say an initialized sockaddr_in6 is stored.
            let sin6 = unsafe {
                &*(storage as *const libc::sockaddr_storage as *const libc::sockaddr_in6)
            };
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}
