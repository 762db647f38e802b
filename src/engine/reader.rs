//! Read pump: bytes and descriptors in, ordered values out.
//!
//! A descriptor frame's header and its `SCM_RIGHTS` payload may surface in
//! different pumps. Values behind an unpaired descriptor header wait in the
//! staging queue so delivery order always equals send order.

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::{IntoRawFd, OwnedFd};

use tracing::trace;

use super::Engine;
use crate::config::SocketConfig;
use crate::error::{LocalwireError, Result};
use crate::protocol::{Frame, FrameBuffer};
use crate::transport::Transport;
use crate::value::Value;

/// A value held back to preserve ordering.
#[derive(Debug)]
enum Staged {
    /// A complete value queued behind an unpaired descriptor.
    Ready(Value),
    /// A descriptor header waiting for its descriptor.
    AwaitingDescriptor { correlation_id: u32 },
}

/// Exclusive read-side state.
#[derive(Debug)]
pub(crate) struct ReadState {
    frames: FrameBuffer,
    staging: VecDeque<Staged>,
    pending_fds: VecDeque<OwnedFd>,
    scratch: Vec<u8>,
}

/// How a read pump ended, when it ended the connection.
#[derive(Debug)]
enum Ending {
    PeerShutdown,
    Failed(LocalwireError),
}

impl ReadState {
    pub(crate) fn new(config: &SocketConfig) -> Self {
        Self {
            frames: FrameBuffer::with_max_payload(config.max_payload_size),
            staging: VecDeque::new(),
            pending_fds: VecDeque::new(),
            scratch: vec![0; config.read_chunk_size],
        }
    }

    /// Route a deframed frame to `ready` or the staging queue.
    fn accept(&mut self, frame: Frame, ready: &mut Vec<Value>) -> Result<()> {
        if frame.is_descriptor() {
            self.staging.push_back(Staged::AwaitingDescriptor {
                correlation_id: frame.correlation_id(),
            });
            return Ok(());
        }
        let value = frame.into_value()?;
        if self.staging.is_empty() {
            ready.push(value);
        } else {
            self.staging.push_back(Staged::Ready(value));
        }
        Ok(())
    }

    /// Release staged values whose descriptors have arrived.
    ///
    /// A forced drain pairs descriptor headers that have no descriptor with
    /// descriptor 0 so nothing stays staged.
    fn reconcile(&mut self, ready: &mut Vec<Value>, forced: bool) {
        while let Some(head) = self.staging.front() {
            let value = match head {
                Staged::Ready(_) => match self.staging.pop_front() {
                    Some(Staged::Ready(value)) => value,
                    _ => break,
                },
                Staged::AwaitingDescriptor { correlation_id } => {
                    let correlation_id = *correlation_id;
                    let fd = match self.pending_fds.pop_front() {
                        Some(fd) => fd.into_raw_fd(),
                        None if forced => 0,
                        None => break,
                    };
                    self.staging.pop_front();
                    Value::from_descriptor(fd).with_correlation_id(correlation_id)
                }
            };
            ready.push(value);
        }
    }

    /// Forced drain used on close.
    pub(crate) fn drain_forced(&mut self) -> Vec<Value> {
        let mut ready = Vec::new();
        self.reconcile(&mut ready, true);
        ready
    }

    /// Drop buffered bytes and close unmatched descriptors.
    pub(crate) fn reset(&mut self) {
        self.frames.clear();
        self.staging.clear();
        self.pending_fds.clear();
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending_fds.len()
    }

    /// Read until the kernel runs dry or the per-pump ceiling is reached.
    fn fill(
        &mut self,
        transport: &dyn Transport,
        max_read: usize,
        ready: &mut Vec<Value>,
    ) -> Option<Ending> {
        let chunk = self.scratch.len();
        let mut total = 0;

        loop {
            if total > 0 && total + chunk > max_read {
                return None;
            }

            let mut fds = Vec::new();
            let n = match transport.recv(&mut self.scratch, &mut fds) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Ending::Failed(e.into())),
            };
            self.pending_fds.extend(fds);

            if n == 0 {
                return Some(Ending::PeerShutdown);
            }
            total += n;
            trace!(bytes = n, "received");

            let frames = match self.frames.push(&self.scratch[..n]) {
                Ok(frames) => frames,
                Err(e) => return Some(Ending::Failed(e)),
            };
            for frame in frames {
                if let Err(e) = self.accept(frame, ready) {
                    return Some(Ending::Failed(e));
                }
            }
        }
    }
}

impl Engine {
    /// Run one read pump. Returns how many values were delivered.
    pub(crate) fn pump_read(&self) -> usize {
        let Some(transport) = self.transport() else {
            return 0;
        };

        let (delivered, ending) = {
            let mut state = self.reader.lock();
            if !self.is_engine_open() {
                return 0;
            }
            let mut ready = Vec::new();
            let ending = state.fill(transport.as_ref(), self.config.max_read_buffer, &mut ready);
            state.reconcile(&mut ready, false);
            let delivered = ready.len();
            self.deliver(ready);
            (delivered, ending)
        };

        match ending {
            None => {}
            Some(Ending::PeerShutdown) => {
                trace!("peer shut down");
                self.close();
            }
            Some(Ending::Failed(err)) => self.fail(err),
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, Header};
    use crate::value::Kind;
    use bytes::Bytes;
    use std::os::unix::io::AsRawFd;

    fn frame_of(value: &Value) -> Frame {
        let mut buffer = FrameBuffer::new();
        buffer.push(&build_frame(value)).unwrap().remove(0)
    }

    fn state() -> ReadState {
        ReadState::new(&SocketConfig::default())
    }

    fn tempfd() -> OwnedFd {
        OwnedFd::from(tempfile::tempfile().unwrap())
    }

    #[test]
    fn test_plain_values_pass_straight_through() {
        let mut state = state();
        let mut ready = Vec::new();
        state.accept(frame_of(&Value::from_u8(1)), &mut ready).unwrap();
        state.accept(frame_of(&Value::from_u8(2)), &mut ready).unwrap();
        assert_eq!(ready, vec![Value::from_u8(1), Value::from_u8(2)]);
        assert!(state.staging.is_empty());
    }

    #[test]
    fn test_order_preserved_with_delayed_descriptors() {
        let mut state = state();
        let mut ready = Vec::new();

        // Headers for [A, fd1, B, fd2, C] arrive before any descriptor.
        state.accept(frame_of(&Value::from_string("A")), &mut ready).unwrap();
        state
            .accept(frame_of(&Value::from_descriptor(1).with_correlation_id(11)), &mut ready)
            .unwrap();
        state.accept(frame_of(&Value::from_string("B")), &mut ready).unwrap();
        state
            .accept(frame_of(&Value::from_descriptor(2).with_correlation_id(12)), &mut ready)
            .unwrap();
        state.accept(frame_of(&Value::from_string("C")), &mut ready).unwrap();
        state.reconcile(&mut ready, false);

        assert_eq!(ready, vec![Value::from_string("A")]);
        assert_eq!(state.staging.len(), 4);

        // First descriptor arrives: fd1 and B are released, fd2 blocks C.
        let fd1 = tempfd();
        let raw1 = fd1.as_raw_fd();
        state.pending_fds.push_back(fd1);
        state.reconcile(&mut ready, false);
        assert_eq!(ready.len(), 3);
        assert_eq!(ready[1].to_descriptor(), Some(raw1));
        assert_eq!(ready[1].correlation_id(), 11);
        assert_eq!(ready[2], Value::from_string("B"));

        let fd2 = tempfd();
        let raw2 = fd2.as_raw_fd();
        state.pending_fds.push_back(fd2);
        state.reconcile(&mut ready, false);

        let kinds: Vec<Kind> = ready.iter().map(Value::kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::String,
                Kind::SocketDescriptor,
                Kind::String,
                Kind::SocketDescriptor,
                Kind::String
            ]
        );
        assert_eq!(ready[3].to_descriptor(), Some(raw2));
        assert_eq!(ready[4], Value::from_string("C"));
        assert!(state.staging.is_empty());

        for value in &ready[1..4] {
            if let Some(fd) = value.to_descriptor() {
                unsafe { libc::close(fd) };
            }
        }
    }

    #[test]
    fn test_descriptor_arriving_first_pairs_immediately() {
        let mut state = state();
        let mut ready = Vec::new();
        state.pending_fds.push_back(tempfd());

        state.accept(frame_of(&Value::from_descriptor(3)), &mut ready).unwrap();
        state.reconcile(&mut ready, false);

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].kind(), Kind::SocketDescriptor);
        if let Some(fd) = ready[0].to_descriptor() {
            unsafe { libc::close(fd) };
        }
    }

    #[test]
    fn test_forced_drain_pairs_with_zero() {
        let mut state = state();
        let mut ready = Vec::new();
        state.accept(frame_of(&Value::from_descriptor(3)), &mut ready).unwrap();
        state.accept(frame_of(&Value::from_bool(true)), &mut ready).unwrap();
        assert!(ready.is_empty());

        let drained = state.drain_forced();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].to_descriptor(), Some(0));
        assert_eq!(drained[1], Value::from_bool(true));
    }

    #[test]
    fn test_reset_closes_pending() {
        let mut state = state();
        state.pending_fds.push_back(tempfd());
        state.frames.push(&[0x01, 0, 0]).unwrap();

        state.reset();

        assert!(state.pending_fds.is_empty());
        assert!(state.frames.is_empty());
    }

    #[test]
    fn test_frame_width_mismatch_rejected() {
        let mut state = state();
        let header = Header::new(Kind::ByteArray, 0, 2);
        let frame = Frame::new(header, Kind::UInt32, Bytes::from_static(&[1, 2]));
        assert!(state.accept(frame, &mut Vec::new()).is_err());
    }
}
