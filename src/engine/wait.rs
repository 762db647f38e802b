//! Blocking waits with timeout.

use std::time::{Duration, Instant};

use tracing::trace;

use super::Engine;
use crate::error::{LocalwireError, Result};
use crate::transport::poll::{self, Interest};

/// Longest single `poll` inside a wait. Bounds how long a wait can miss a
/// change made by another thread's pump.
const WAIT_SLICE: Duration = Duration::from_millis(10);

impl Engine {
    /// Block until a value is available to read.
    pub(crate) fn wait_for_ready_read(&self, timeout: Option<Duration>) -> Result<()> {
        self.wait_until(timeout, |engine| engine.available_data() > 0)
    }

    /// Block until every queued value has been handed to the kernel.
    ///
    /// Closing empties the outbound queue, so an empty queue only counts
    /// while the engine is still open.
    pub(crate) fn wait_for_data_written(&self, timeout: Option<Duration>) -> Result<()> {
        self.wait_until(timeout, |engine| {
            engine.data_to_write() == 0 && engine.is_engine_open()
        })
    }

    /// Poll, pump and recheck until `done` holds, the engine closes, or the
    /// deadline passes.
    ///
    /// `None` waits without a deadline. `Some(Duration::ZERO)` performs a
    /// single readiness check and pump.
    fn wait_until(&self, timeout: Option<Duration>, done: impl Fn(&Engine) -> bool) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if done(self) {
                return Ok(());
            }
            // The clone keeps the descriptor alive across the poll even if
            // another thread closes the engine meanwhile.
            let Some(transport) = self.transport() else {
                return Err(LocalwireError::NotOpen);
            };

            let slice = match deadline {
                None => WAIT_SLICE,
                Some(deadline) => deadline
                    .saturating_duration_since(Instant::now())
                    .min(WAIT_SLICE),
            };
            let interest = Interest {
                write: self.data_to_write() > 0,
                ..Interest::READ
            };

            let ready = poll::poll_one(transport.raw_fd(), interest, Some(slice))?;
            drop(transport);

            if ready.wants_read() || ready.priority {
                self.pump_read();
            }
            if ready.writable {
                self.pump_write();
            }

            if done(self) {
                return Ok(());
            }
            if !self.is_engine_open() {
                return Err(LocalwireError::NotOpen);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                trace!(?timeout, "wait timed out");
                return Err(LocalwireError::Timeout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::StallThenFailTransport;
    use super::*;
    use crate::config::SocketConfig;
    use crate::transport::UnixTransport;
    use crate::value::Value;
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;
    use std::thread;

    fn open_pair() -> (Arc<Engine>, Arc<Engine>) {
        let (a, b) = UnixStream::pair().unwrap();
        let left = Arc::new(Engine::new(SocketConfig::default()));
        let right = Arc::new(Engine::new(SocketConfig::default()));
        left.open(Arc::new(UnixTransport::new(a).unwrap())).unwrap();
        right.open(Arc::new(UnixTransport::new(b).unwrap())).unwrap();
        (left, right)
    }

    #[test]
    fn test_zero_timeout_returns_promptly() {
        let (_left, right) = open_pair();
        let start = Instant::now();
        let err = right.wait_for_ready_read(Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, LocalwireError::Timeout));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_ready_read_when_value_arrives_later() {
        let (left, right) = open_pair();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            left.enqueue(Value::from_u16(7)).unwrap();
            left.pump_write();
            left
        });

        right.wait_for_ready_read(Some(Duration::from_millis(500))).unwrap();
        assert_eq!(right.take_inbound(), Some(Value::from_u16(7)));
        let _left = writer.join().unwrap();
    }

    #[test]
    fn test_already_available_returns_immediately() {
        let (left, right) = open_pair();
        left.enqueue(Value::from_bool(true)).unwrap();
        left.pump_write();
        right.pump_read();

        right.wait_for_ready_read(Some(Duration::ZERO)).unwrap();
    }

    #[test]
    fn test_wait_fails_when_peer_closes() {
        let (left, right) = open_pair();
        left.close();
        let err = right.wait_for_ready_read(None).unwrap_err();
        assert!(matches!(err, LocalwireError::NotOpen));
        assert!(!right.is_open());
        assert_eq!(right.last_error(), None);
    }

    #[test]
    fn test_wait_on_closed_engine() {
        let engine = Engine::new(SocketConfig::default());
        assert!(matches!(
            engine.wait_for_ready_read(Some(Duration::from_millis(5))),
            Err(LocalwireError::NotOpen)
        ));
        assert!(matches!(
            engine.wait_for_data_written(Some(Duration::ZERO)),
            Err(LocalwireError::NotOpen)
        ));
    }

    #[test]
    fn test_data_written_fails_when_send_fails_mid_wait() {
        let (a, _b) = UnixStream::pair().unwrap();
        let engine = Engine::new(SocketConfig::default());
        let transport = Arc::new(StallThenFailTransport::new(a));
        engine.open(transport.clone()).unwrap();

        engine.enqueue(Value::from_u32(1)).unwrap();
        engine.pump_write();
        assert_eq!(engine.data_to_write(), 1);

        let err = engine
            .wait_for_data_written(Some(Duration::from_millis(500)))
            .unwrap_err();
        assert!(matches!(err, LocalwireError::NotOpen));
        assert_eq!(*transport.sends.lock(), 2);
        assert!(engine.last_error().is_some());
        assert_eq!(engine.data_to_write(), 0);
    }

    #[test]
    fn test_data_written_fails_on_disconnect_from_other_thread() {
        let (left, _right) = open_pair();
        // Larger than the socket buffer, and the peer never reads.
        left.enqueue(Value::from_bytes(vec![0u8; 8 * 1024 * 1024])).unwrap();
        left.pump_write();
        assert_eq!(left.data_to_write(), 1);

        let closer = {
            let left = left.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                left.close();
            })
        };

        let start = Instant::now();
        let err = left.wait_for_data_written(None).unwrap_err();
        assert!(matches!(err, LocalwireError::NotOpen));
        assert!(start.elapsed() < Duration::from_secs(2));
        closer.join().unwrap();
    }

    #[test]
    fn test_data_written_drains_queue() {
        let (left, _right) = open_pair();
        for i in 0..10u32 {
            left.enqueue(Value::from_u32(i)).unwrap();
        }
        left.wait_for_data_written(Some(Duration::from_millis(500))).unwrap();
        assert_eq!(left.data_to_write(), 0);
    }
}
