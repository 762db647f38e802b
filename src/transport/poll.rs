//! Readiness waits over `poll(2)`.

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Which readiness conditions to wait for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Interest {
    pub read: bool,
    pub write: bool,
    pub exception: bool,
}

impl Interest {
    pub(crate) const READ: Interest = Interest {
        read: true,
        write: false,
        exception: false,
    };

    #[cfg(test)]
    pub(crate) const WRITE: Interest = Interest {
        read: false,
        write: true,
        exception: false,
    };

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        !(self.read || self.write || self.exception)
    }

    fn events(&self) -> libc::c_short {
        let mut events = 0;
        if self.read {
            events |= libc::POLLIN;
        }
        if self.write {
            events |= libc::POLLOUT;
        }
        if self.exception {
            events |= libc::POLLPRI;
        }
        events
    }
}

/// Readiness reported for one descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub priority: bool,
    pub hangup: bool,
    pub error: bool,
}

impl Readiness {
    fn from_revents(revents: libc::c_short) -> Self {
        Self {
            readable: revents & libc::POLLIN != 0,
            writable: revents & libc::POLLOUT != 0,
            priority: revents & libc::POLLPRI != 0,
            hangup: revents & libc::POLLHUP != 0,
            error: revents & (libc::POLLERR | libc::POLLNVAL) != 0,
        }
    }

    /// Anything that a read pump should look at.
    #[inline]
    pub(crate) fn wants_read(&self) -> bool {
        self.readable || self.hangup || self.error
    }
}

/// Convert a timeout to `poll` milliseconds, rounding up so a short but
/// non-zero timeout still waits.
fn timeout_ms(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) => {
            let ms = d.as_nanos().div_ceil(1_000_000);
            libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX)
        }
    }
}

/// Wait until any of `entries` is ready or `timeout` elapses.
///
/// Returns one [`Readiness`] per entry, all empty on timeout or when the
/// call was interrupted by a signal.
pub(crate) fn poll(
    entries: &[(RawFd, Interest)],
    timeout: Option<Duration>,
) -> io::Result<Vec<Readiness>> {
    let mut fds: Vec<libc::pollfd> = entries
        .iter()
        .map(|(fd, interest)| libc::pollfd {
            fd: *fd,
            events: interest.events(),
            revents: 0,
        })
        .collect();

    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms(timeout)) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(vec![Readiness::default(); entries.len()]);
        }
        return Err(err);
    }

    Ok(fds.iter().map(|p| Readiness::from_revents(p.revents)).collect())
}

/// Wait on a single descriptor.
pub(crate) fn poll_one(
    fd: RawFd,
    interest: Interest,
    timeout: Option<Duration>,
) -> io::Result<Readiness> {
    Ok(poll(&[(fd, interest)], timeout)?
        .into_iter()
        .next()
        .unwrap_or_default())
}
