//! Socket engine - pumps values between the queues and a [`Transport`].
//!
//! State is split into independently locked sections:
//!
//! ```text
//! control   RwLock  open flag, transport, last error
//! inbound   RwLock  values ready for `read()`
//! outbound  RwLock  queued values + the frame in flight
//! reader    Mutex   accumulator, descriptor staging, pending descriptors
//! notifiers Mutex   read/write/exception subscription state
//! ```
//!
//! The control lock is never held while another lock is taken. Pumps never
//! close the engine while holding a section; they report an outcome and the
//! close happens after the locks are released.

mod notifier;
mod reader;
mod wait;
mod writer;

use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::SocketConfig;
use crate::error::{LocalwireError, Result};
use crate::events::{EventBus, SocketEvent};
use crate::protocol::OutboundFrame;
use crate::transport::poll::Interest;
use crate::transport::Transport;
use crate::value::Value;

use notifier::Notifiers;
use reader::ReadState;

#[derive(Debug, Default)]
struct Control {
    open: bool,
    /// Set on the first successful open; an engine never reopens.
    used: bool,
    transport: Option<Arc<dyn Transport>>,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct Outbound {
    queue: VecDeque<Value>,
    current: Option<OutboundFrame>,
}

impl Outbound {
    #[inline]
    fn pending(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }
}

/// The per-socket read/write state machine.
#[derive(Debug)]
pub(crate) struct Engine {
    config: SocketConfig,
    control: RwLock<Control>,
    inbound: RwLock<VecDeque<Value>>,
    outbound: RwLock<Outbound>,
    reader: Mutex<ReadState>,
    notifiers: Mutex<Notifiers>,
    events: EventBus,
}

impl Engine {
    pub(crate) fn new(config: SocketConfig) -> Self {
        let config = config.normalized();
        Self {
            reader: Mutex::new(ReadState::new(&config)),
            config,
            control: RwLock::new(Control::default()),
            inbound: RwLock::new(VecDeque::new()),
            outbound: RwLock::new(Outbound::default()),
            notifiers: Mutex::new(Notifiers::default()),
            events: EventBus::default(),
        }
    }

    /// Fail unless the engine could be opened right now.
    pub(crate) fn check_openable(&self) -> Result<()> {
        let control = self.control.read();
        if control.open {
            Err(LocalwireError::AlreadyOpen)
        } else if control.used {
            Err(LocalwireError::Closed)
        } else {
            Ok(())
        }
    }

    /// Transition `closed -> open` over `transport`.
    ///
    /// Creates the notifiers and runs one read and one write pump to pick up
    /// anything that arrived or was queued before readiness dispatch starts.
    pub(crate) fn open(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let fd = transport.raw_fd();
        {
            let mut control = self.control.write();
            if control.open {
                return Err(LocalwireError::AlreadyOpen);
            }
            if control.used {
                return Err(LocalwireError::Closed);
            }
            control.open = true;
            control.used = true;
            control.error = None;
            control.transport = Some(transport);
        }
        self.notifiers.lock().create();
        debug!(fd, "socket opened");

        self.pump_read();
        self.pump_write();
        Ok(())
    }

    /// Transition `open -> closed`. No-op when already closed.
    ///
    /// Staged descriptor values are force-drained into the inbound queue,
    /// unmatched received descriptors are closed, and the in-flight frame is
    /// discarded together with the rest of the outbound queue.
    pub(crate) fn close(&self) {
        let transport = {
            let mut control = self.control.write();
            if !control.open {
                return;
            }
            control.open = false;
            control.transport.take()
        };

        self.notifiers.lock().remove_all();

        let discarded = {
            let mut outbound = self.outbound.write();
            let discarded = outbound.pending();
            outbound.queue.clear();
            outbound.current = None;
            discarded
        };

        {
            let mut state = self.reader.lock();
            let ready = state.drain_forced();
            self.deliver(ready);
            state.reset();
        }

        let fd = transport.as_ref().map(|t| t.raw_fd());
        drop(transport);
        debug!(?fd, discarded, "socket closed");
        self.events.emit(SocketEvent::Disconnected);
    }

    /// Record a fatal failure, report it, and close.
    fn fail(&self, err: LocalwireError) {
        let message = err.to_string();
        warn!(error = %message, "socket failed");
        self.control.write().error = Some(message.clone());
        self.events.emit(SocketEvent::Error(message));
        self.close();
    }

    /// Move values into the inbound queue, one `ReadyRead` each.
    fn deliver(&self, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        let count = values.len();
        self.inbound.write().extend(values);
        for _ in 0..count {
            self.events.emit(SocketEvent::ReadyRead);
        }
    }

    /// The transport, while open.
    fn transport(&self) -> Option<Arc<dyn Transport>> {
        let control = self.control.read();
        if control.open {
            control.transport.clone()
        } else {
            None
        }
    }

    #[inline]
    fn is_engine_open(&self) -> bool {
        self.control.read().open
    }

    /// Open and without a recorded error.
    pub(crate) fn is_open(&self) -> bool {
        let control = self.control.read();
        control.open && control.error.is_none()
    }

    /// Opened once and closed since.
    pub(crate) fn is_finished(&self) -> bool {
        let control = self.control.read();
        control.used && !control.open
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.control.read().error.clone()
    }

    pub(crate) fn descriptor(&self) -> Option<RawFd> {
        self.transport().map(|t| t.raw_fd())
    }

    pub(crate) fn available_data(&self) -> usize {
        self.inbound.read().len()
    }

    pub(crate) fn data_to_write(&self) -> usize {
        self.outbound.read().pending()
    }

    pub(crate) fn take_inbound(&self) -> Option<Value> {
        self.inbound.write().pop_front()
    }

    /// Queue a value and re-enable write readiness.
    pub(crate) fn enqueue(&self, value: Value) -> Result<()> {
        if !self.is_engine_open() {
            return Err(LocalwireError::NotOpen);
        }
        self.outbound.write().queue.push_back(value);
        self.notifiers.lock().write.enable();
        Ok(())
    }

    /// Pump writes until the outbound side is empty or the kernel stops
    /// accepting bytes, reading opportunistically after every write.
    pub(crate) fn flush(&self) -> Result<()> {
        if !self.is_engine_open() {
            return Err(LocalwireError::NotOpen);
        }
        while self.data_to_write() > 0 {
            let written = self.pump_write();
            self.pump_read();
            if written == 0 || !self.is_engine_open() {
                break;
            }
        }
        Ok(())
    }

    /// Descriptor and notifier interest for the reactor, while open.
    pub(crate) fn poll_target(&self) -> Option<(Arc<dyn Transport>, Interest)> {
        let transport = self.transport()?;
        let interest = self.notifiers.lock().interest();
        Some((transport, interest))
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<SocketEvent> {
        self.events.subscribe()
    }
}
