//! Transport module - the OS seam under a socket.
//!
//! Provides:
//! - The [`Transport`] trait: non-blocking send/receive of bytes with
//!   optional out-of-band descriptors
//! - [`UnixTransport`]: Unix Domain Socket implementation over `sendmsg`/`recvmsg`
//! - [`LocalListener`]: bind/accept side producing connected descriptors
//! - Readiness waits over `poll(2)`

mod listener;
pub(crate) mod poll;
mod unix;

use std::fmt;
use std::io;
use std::os::unix::io::{OwnedFd, RawFd};

pub use listener::{generate_socket_path, LocalListener, SOCKET_MODE};
pub use unix::UnixTransport;

/// A connected, non-blocking byte stream able to carry descriptors.
///
/// Implementations must not block: when the kernel cannot accept or supply
/// bytes, return an error of kind [`io::ErrorKind::WouldBlock`].
pub trait Transport: Send + Sync + fmt::Debug {
    /// Descriptor used for readiness polling.
    fn raw_fd(&self) -> RawFd;

    /// Send bytes, attaching `fd` as ancillary data when given.
    ///
    /// Returns how many bytes were accepted. When `fd` is given and the call
    /// succeeds, the descriptor went out with those bytes.
    fn send(&self, buf: &[u8], fd: Option<RawFd>) -> io::Result<usize>;

    /// Receive up to `buf.len()` bytes.
    ///
    /// Descriptors arriving with the bytes are appended to `fds` in order.
    /// `Ok(0)` means the peer shut down.
    fn recv(&self, buf: &mut [u8], fds: &mut Vec<OwnedFd>) -> io::Result<usize>;
}
