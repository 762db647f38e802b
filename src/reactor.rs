//! Caller-driven readiness dispatch.
//!
//! A [`Reactor`] polls every registered socket according to its notifier
//! state and runs the matching pump on the calling thread. It owns no
//! threads: the thread calling [`turn`](Reactor::turn) or
//! [`run`](Reactor::run) is the sockets' I/O thread.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use localwire::{LocalSocket, Reactor};
//!
//! let reactor = Arc::new(Reactor::new());
//! let socket = LocalSocket::new();
//! socket.connect("/tmp/service.sock").unwrap();
//! reactor.register(&socket);
//!
//! let driver = {
//!     let reactor = reactor.clone();
//!     std::thread::spawn(move || reactor.run())
//! };
//! // ... use `socket` from this thread ...
//! reactor.stop();
//! driver.join().unwrap().unwrap();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::engine::Engine;
use crate::error::Result;
use crate::socket::LocalSocket;
use crate::transport::poll;

/// Poll slice used by [`Reactor::run`] so `stop` is noticed promptly.
const RUN_SLICE: Duration = Duration::from_millis(50);

/// Readiness dispatcher for a set of sockets.
#[derive(Debug, Default)]
pub struct Reactor {
    engines: Mutex<Vec<Weak<Engine>>>,
    stopped: AtomicBool,
}

impl Reactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dispatching readiness for `socket`.
    ///
    /// The reactor holds no strong reference; dropping the socket
    /// unregisters it.
    pub fn register(&self, socket: &LocalSocket) {
        self.engines.lock().push(Arc::downgrade(socket.engine()));
    }

    /// Number of sockets still registered.
    pub fn len(&self) -> usize {
        self.engines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait up to `timeout` for readiness and dispatch it.
    ///
    /// Returns how many sockets had a pump run. Sockets that were dropped or
    /// have closed are unregistered. With nothing to poll and no timeout,
    /// returns immediately.
    pub fn turn(&self, timeout: Option<Duration>) -> Result<usize> {
        let live: Vec<Arc<Engine>> = {
            let mut engines = self.engines.lock();
            engines.retain(|weak| weak.upgrade().is_some_and(|engine| !engine.is_finished()));
            engines.iter().filter_map(Weak::upgrade).collect()
        };

        let mut targets = Vec::new();
        let mut entries = Vec::new();
        for engine in live {
            let Some((transport, interest)) = engine.poll_target() else {
                continue;
            };
            if interest.is_empty() {
                continue;
            }
            entries.push((transport.raw_fd(), interest));
            // The transport clone keeps each descriptor valid through the poll.
            targets.push((engine, transport));
        }

        if entries.is_empty() && timeout.is_none() {
            return Ok(0);
        }

        let readiness = poll::poll(&entries, timeout)?;

        let mut dispatched = 0;
        for ((engine, _transport), ready) in targets.iter().zip(readiness) {
            let mut pumped = false;
            if ready.wants_read() || ready.priority {
                engine.pump_read();
                pumped = true;
            }
            if ready.writable {
                engine.pump_write();
                pumped = true;
            }
            if pumped {
                dispatched += 1;
            }
        }
        if dispatched > 0 {
            trace!(dispatched, "reactor turn");
        }
        Ok(dispatched)
    }

    /// Dispatch readiness until [`stop`](Self::stop) is called.
    ///
    /// A `stop` issued before `run` makes it return at once. Either way the
    /// stop request is consumed, so `run` can be called again.
    pub fn run(&self) -> Result<()> {
        while !self.stopped.load(Ordering::Acquire) {
            self.turn(Some(RUN_SLICE))?;
        }
        self.stopped.store(false, Ordering::Release);
        Ok(())
    }

    /// Ask [`run`](Self::run) to return after its current turn.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}
