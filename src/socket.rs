//! The public duplex socket handle.

use std::os::unix::io::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::SocketConfig;
use crate::engine::Engine;
use crate::error::{LocalwireError, Result};
use crate::events::SocketEvent;
use crate::transport::{Transport, UnixTransport};
use crate::value::Value;

/// A message-oriented duplex channel over a Unix-domain socket.
///
/// Every method takes `&self`; a socket can be shared across threads behind
/// an `Arc`. Readiness is driven either by a [`Reactor`](crate::Reactor) or
/// by the blocking waits.
///
/// A socket opens at most once. After it closes, a new `LocalSocket` is
/// needed.
///
/// # Example
///
/// ```
/// use std::os::unix::net::UnixStream;
/// use std::time::Duration;
/// use localwire::{LocalSocket, Value};
///
/// let (a, b) = UnixStream::pair().unwrap();
/// let left = LocalSocket::new();
/// let right = LocalSocket::new();
/// left.set_descriptor(a).unwrap();
/// right.set_descriptor(b).unwrap();
///
/// left.write(Value::from_string("ping").with_correlation_id(1)).unwrap();
/// right.wait_for_ready_read(Some(Duration::from_secs(1))).unwrap();
///
/// let value = right.read().unwrap();
/// assert_eq!(value.to_text().as_deref(), Some("ping"));
/// assert_eq!(value.correlation_id(), 1);
/// ```
#[derive(Debug)]
pub struct LocalSocket {
    engine: Arc<Engine>,
}

impl LocalSocket {
    /// Create a closed socket with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SocketConfig::default())
    }

    /// Create a closed socket.
    pub fn with_config(config: SocketConfig) -> Self {
        Self {
            engine: Arc::new(Engine::new(config)),
        }
    }

    /// Open a socket over any transport.
    pub fn from_transport(transport: impl Transport + 'static, config: SocketConfig) -> Result<Self> {
        let socket = Self::with_config(config);
        socket.engine.open(Arc::new(transport))?;
        Ok(socket)
    }

    /// Connect to a listening socket at `path`.
    ///
    /// # Errors
    ///
    /// - `AlreadyOpen` if the socket is open
    /// - `Closed` if the socket was opened before
    /// - `InvalidArgument` if `path` is empty
    /// - `Io` if the connection fails
    pub fn connect(&self, path: impl AsRef<Path>) -> Result<()> {
        self.engine.check_openable()?;
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(LocalwireError::InvalidArgument("socket path is empty".into()));
        }
        let transport = UnixTransport::connect(path)?;
        debug!(path = %path.display(), "connected");
        self.engine.open(Arc::new(transport))
    }

    /// Adopt a connected Unix-domain stream descriptor.
    ///
    /// The descriptor is switched to non-blocking mode. Descriptor 0 is
    /// rejected and left open.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect), with `InvalidArgument` for
    /// descriptor 0.
    pub fn set_descriptor(&self, fd: impl Into<OwnedFd>) -> Result<()> {
        let fd = fd.into();
        if fd.as_raw_fd() == 0 {
            // Not ours to close.
            let _ = fd.into_raw_fd();
            self.engine.check_openable()?;
            return Err(LocalwireError::InvalidArgument("descriptor is 0".into()));
        }
        self.engine.check_openable()?;
        let transport = UnixTransport::from_fd(fd)?;
        self.engine.open(Arc::new(transport))
    }

    /// True while open and without a recorded error.
    pub fn is_open(&self) -> bool {
        self.engine.is_open()
    }

    /// Take the oldest received value. Never blocks.
    pub fn read(&self) -> Option<Value> {
        self.engine.take_inbound()
    }

    /// Number of received values waiting to be read.
    pub fn available_data(&self) -> usize {
        self.engine.available_data()
    }

    /// Number of values not yet fully written, counting the one in flight.
    pub fn data_to_write(&self) -> usize {
        self.engine.data_to_write()
    }

    /// Queue a value and try to write it right away.
    ///
    /// A `SocketDescriptor` value's descriptor must stay open until the
    /// value has been written; see [`data_to_write`](Self::data_to_write).
    pub fn write(&self, value: Value) -> Result<()> {
        self.engine.enqueue(value)?;
        self.engine.pump_write();
        Ok(())
    }

    /// Push queued values to the kernel while it keeps accepting bytes.
    ///
    /// Reads opportunistically between writes. Never blocks; use
    /// [`wait_for_data_written`](Self::wait_for_data_written) to wait for a
    /// full drain.
    pub fn flush(&self) -> Result<()> {
        self.engine.flush()
    }

    /// Block until a value can be read.
    ///
    /// `None` waits until a value arrives or the socket closes.
    /// `Some(Duration::ZERO)` checks once without blocking.
    ///
    /// # Reentrancy
    ///
    /// Replies and new inbound calls are drained by this same wait. An RPC
    /// layer must not issue a synchronous call-and-wait from a handler that
    /// was itself dispatched by such a call on the same socket: the inner wait
    /// would consume frames the outer one is waiting for, or deadlock.
    ///
    /// # Errors
    ///
    /// `Timeout` when the deadline passes, `NotOpen` when the socket is or
    /// becomes closed with nothing left to read.
    pub fn wait_for_ready_read(&self, timeout: Option<Duration>) -> Result<()> {
        self.engine.wait_for_ready_read(timeout)
    }

    /// Block until every queued value has been handed to the kernel.
    ///
    /// Timeout semantics match [`wait_for_ready_read`](Self::wait_for_ready_read).
    ///
    /// # Errors
    ///
    /// `Timeout` when the deadline passes. `NotOpen` when the socket is or
    /// becomes closed, including a close caused by a failed write: queued
    /// values discarded by the close were never written.
    pub fn wait_for_data_written(&self, timeout: Option<Duration>) -> Result<()> {
        self.engine.wait_for_data_written(timeout)
    }

    /// Close the socket. No-op when not open.
    pub fn disconnect(&self) {
        self.engine.close();
    }

    /// The most recent I/O or protocol error.
    pub fn last_error(&self) -> Option<String> {
        self.engine.last_error()
    }

    /// Subscribe to socket events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SocketEvent> {
        self.engine.subscribe()
    }

    /// The underlying OS descriptor, while open.
    pub fn descriptor(&self) -> Option<RawFd> {
        self.engine.descriptor()
    }

    pub(crate) fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

impl Default for LocalSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LocalSocket {
    fn drop(&mut self) {
        self.engine.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;

    fn pair() -> (LocalSocket, LocalSocket) {
        let (a, b) = UnixStream::pair().unwrap();
        let left = LocalSocket::new();
        let right = LocalSocket::new();
        left.set_descriptor(a).unwrap();
        right.set_descriptor(b).unwrap();
        (left, right)
    }

    #[test]
    fn test_new_socket_is_closed() {
        let socket = LocalSocket::default();
        assert!(!socket.is_open());
        assert_eq!(socket.descriptor(), None);
        assert_eq!(socket.read(), None);
        assert!(matches!(
            socket.write(Value::from_u8(1)),
            Err(LocalwireError::NotOpen)
        ));
        assert!(matches!(socket.flush(), Err(LocalwireError::NotOpen)));
        socket.disconnect();
    }

    #[test]
    fn test_connect_empty_path() {
        let socket = LocalSocket::new();
        let err = socket.connect("").unwrap_err();
        assert!(matches!(err, LocalwireError::InvalidArgument(_)));
        assert!(!socket.is_open());
    }

    #[test]
    fn test_connect_missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let socket = LocalSocket::new();
        let err = socket.connect(dir.path().join("nobody.sock")).unwrap_err();
        assert!(matches!(err, LocalwireError::Io(_)));
    }

    #[test]
    fn test_set_descriptor_zero_rejected() {
        let socket = LocalSocket::new();
        let zero = unsafe { <OwnedFd as std::os::unix::io::FromRawFd>::from_raw_fd(0) };
        let err = socket.set_descriptor(zero).unwrap_err();
        assert!(matches!(err, LocalwireError::InvalidArgument(_)));
    }

    #[test]
    fn test_set_descriptor_twice() {
        let (left, _right) = pair();
        let (x, _y) = UnixStream::pair().unwrap();
        assert!(matches!(
            left.set_descriptor(x),
            Err(LocalwireError::AlreadyOpen)
        ));
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (left, right) = pair();
        left.write(Value::from_i64(-9)).unwrap();
        right
            .wait_for_ready_read(Some(Duration::from_millis(500)))
            .unwrap();
        assert_eq!(right.available_data(), 1);
        assert_eq!(right.read(), Some(Value::from_i64(-9)));
        assert_eq!(right.available_data(), 0);
    }

    #[test]
    fn test_disconnect_twice_one_event() {
        let (left, _right) = pair();
        let mut events = left.subscribe();

        left.disconnect();
        left.disconnect();

        assert_eq!(events.try_recv().unwrap(), SocketEvent::Disconnected);
        assert!(events.try_recv().is_err());
        assert_eq!(left.last_error(), None);
        assert!(matches!(
            left.set_descriptor(UnixStream::pair().unwrap().0),
            Err(LocalwireError::Closed)
        ));
    }

    #[test]
    fn test_drop_closes_peer() {
        let (left, right) = pair();
        drop(left);
        assert!(matches!(
            right.wait_for_ready_read(Some(Duration::from_millis(500))),
            Err(LocalwireError::NotOpen)
        ));
    }
}
