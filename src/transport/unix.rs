//! Unix-domain stream transport with `SCM_RIGHTS` descriptor passing.
//!
//! Bytes go through `sendmsg`/`recvmsg` so a descriptor can ride as
//! ancillary data on the same call as the frame header. The kernel duplicates
//! a sent descriptor into the receiving process; the sender keeps its copy.

use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::warn;

use super::Transport;

/// Most descriptors accepted in a single `recvmsg`.
const MAX_FDS_PER_RECV: usize = 16;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: libc::c_int = 0;

#[cfg(any(target_os = "linux", target_os = "android"))]
const RECV_FLAGS: libc::c_int = libc::MSG_CMSG_CLOEXEC;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const RECV_FLAGS: libc::c_int = 0;

/// A connected, non-blocking Unix-domain stream socket.
#[derive(Debug)]
pub struct UnixTransport {
    stream: UnixStream,
}

impl UnixTransport {
    /// Wrap a connected stream, switching it to non-blocking mode.
    pub fn new(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }

    /// Connect to a listening socket at `path`.
    pub fn connect(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(UnixStream::connect(path)?)
    }

    /// Adopt an already-connected descriptor.
    pub fn from_fd(fd: OwnedFd) -> io::Result<Self> {
        Self::new(UnixStream::from(fd))
    }
}

impl Transport for UnixTransport {
    fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    fn send(&self, buf: &[u8], fd: Option<RawFd>) -> io::Result<usize> {
        let mut iov = libc::iovec {
            iov_base: buf.as_ptr() as *mut libc::c_void,
            iov_len: buf.len(),
        };

        let fd_size = mem::size_of::<libc::c_int>();
        // CMSG_SPACE includes the cmsghdr header overhead.
        let cmsg_space = unsafe { libc::CMSG_SPACE(fd_size as u32) } as usize;
        let mut cmsg_buf = vec![0u8; if fd.is_some() { cmsg_space } else { 0 }];

        // Zeroed rather than a struct literal: msghdr has private padding on some targets.
        let mut msg: libc::msghdr = unsafe { mem::zeroed() };
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;

        if let Some(fd) = fd {
            msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
            msg.msg_controllen = cmsg_space as _;
            unsafe {
                let cmsg = libc::CMSG_FIRSTHDR(&msg);
                (*cmsg).cmsg_level = libc::SOL_SOCKET;
                (*cmsg).cmsg_type = libc::SCM_RIGHTS;
                (*cmsg).cmsg_len = libc::CMSG_LEN(fd_size as u32) as _;
                let data_ptr = libc::CMSG_DATA(cmsg) as *mut libc::c_int;
                std::ptr::write_unaligned(data_ptr, fd);
            }
        }

        let n = unsafe { libc::sendmsg(self.raw_fd(), &msg, SEND_FLAGS) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn recv(&self, buf: &mut [u8], fds: &mut Vec<OwnedFd>) -> io::Result<usize> {
        let mut iov = libc::iovec {
            iov_base: buf.as_mut_ptr() as *mut libc::c_void,
            iov_len: buf.len(),
        };

        let fd_size = mem::size_of::<libc::c_int>();
        let cmsg_space =
            unsafe { libc::CMSG_SPACE((MAX_FDS_PER_RECV * fd_size) as u32) } as usize;
        let mut cmsg_buf = vec![0u8; cmsg_space];

        let mut msg: libc::msghdr = unsafe { mem::zeroed() };
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
        msg.msg_controllen = cmsg_space as _;

        let n = unsafe { libc::recvmsg(self.raw_fd(), &mut msg, RECV_FLAGS) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        unsafe {
            let mut cmsg = libc::CMSG_FIRSTHDR(&msg);
            while !cmsg.is_null() {
                if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_RIGHTS
                {
                    let data = libc::CMSG_DATA(cmsg);
                    let count = ((*cmsg).cmsg_len as usize - libc::CMSG_LEN(0) as usize) / fd_size;
                    for i in 0..count {
                        let fd: libc::c_int =
                            std::ptr::read_unaligned(data.add(i * fd_size) as *const libc::c_int);
                        fds.push(OwnedFd::from_raw_fd(fd));
                    }
                }
                cmsg = libc::CMSG_NXTHDR(&msg, cmsg);
            }
        }

        if msg.msg_flags & libc::MSG_CTRUNC != 0 {
            warn!(
                fd = self.raw_fd(),
                "ancillary data truncated, some descriptors were dropped by the kernel"
            );
        }

        Ok(n as usize)
    }
}
