//! Listening side of a local socket.
//!
//! # Example
//!
//! ```ignore
//! use localwire::{generate_socket_path, LocalListener, LocalSocket};
//!
//! let path = generate_socket_path();
//! let listener = LocalListener::bind(&path).await?;
//! let fd = listener.accept().await?;
//!
//! let mut socket = LocalSocket::new();
//! socket.set_descriptor(fd)?;
//! ```

use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::OwnedFd;
use std::path::{Path, PathBuf};

use tokio::net::UnixListener;
use tracing::{debug, trace};

use crate::error::{LocalwireError, Result};

/// Socket file mode: read/write/execute for owner and group, nothing for other.
pub const SOCKET_MODE: u32 = 0o770;

/// Generate a unique socket path for this process.
///
/// Format: `{tmp}/localwire-{pid}-{random}.sock`
pub fn generate_socket_path() -> PathBuf {
    let pid = std::process::id();
    std::env::temp_dir().join(format!("localwire-{}-{:x}.sock", pid, rand_u64()))
}

/// Simple random u64 using system time, process ID and a call counter.
fn rand_u64() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    let pid = std::process::id() as u64;
    nanos.wrapping_mul(0x517cc1b727220a95) ^ pid ^ seq.rotate_left(32)
}

/// A bound Unix-domain listener that hands out connected descriptors.
///
/// The socket file is removed when the listener is dropped.
#[derive(Debug)]
pub struct LocalListener {
    listener: UnixListener,
    path: PathBuf,
}

impl LocalListener {
    /// Bind to a Unix socket path.
    ///
    /// Removes any existing socket file at the path before binding, then
    /// restricts the file to owner and group.
    pub async fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(LocalwireError::InvalidArgument(
                "listener path is empty".into(),
            ));
        }

        if path.exists() {
            trace!(path = %path.display(), "removing stale socket file");
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path)?;
        std::fs::set_permissions(path, Permissions::from_mode(SOCKET_MODE))?;
        debug!(path = %path.display(), "listening");

        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// Accept a single connection.
    ///
    /// Returns the connected descriptor, ready for
    /// [`LocalSocket::set_descriptor`](crate::LocalSocket::set_descriptor).
    pub async fn accept(&self) -> Result<OwnedFd> {
        let (stream, _addr) = self.listener.accept().await?;
        let stream = stream.into_std()?;
        debug!(path = %self.path.display(), "accepted connection");
        Ok(OwnedFd::from(stream))
    }

    /// Get the socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
