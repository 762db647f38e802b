//! Write pump: queued values out, one frame in flight at a time.
//!
//! Partial writes are normal. The in-flight [`OutboundFrame`] keeps the write
//! offset across pumps, and a descriptor it carries is handed to the kernel
//! only with the first bytes of the frame.

use std::io;

use tracing::trace;

use super::Engine;
use crate::error::LocalwireError;
use crate::events::SocketEvent;
use crate::protocol::OutboundFrame;

impl Engine {
    /// Run one write pump. Returns how many bytes the kernel accepted.
    ///
    /// Keeps sending until the queue is empty or the kernel stops accepting
    /// bytes. Write readiness stays enabled only while work remains.
    pub(crate) fn pump_write(&self) -> usize {
        let Some(transport) = self.transport() else {
            return 0;
        };

        let mut written = 0;
        let mut completed = 0;
        let mut failure = None;
        {
            let mut guard = self.outbound.write();
            let outbound = &mut *guard;
            if !self.is_engine_open() {
                return 0;
            }

            loop {
                if outbound.current.is_none() {
                    outbound.current = outbound
                        .queue
                        .pop_front()
                        .map(|value| OutboundFrame::from_value(&value));
                }
                let Some(frame) = outbound.current.as_mut() else {
                    break;
                };

                match transport.send(frame.remaining(), frame.descriptor()) {
                    Ok(0) => break,
                    Ok(n) => {
                        frame.advance(n);
                        written += n;
                        trace!(bytes = n, frame = frame.size(), "sent");
                        if frame.is_complete() {
                            outbound.current = None;
                            completed += 1;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        failure = Some(LocalwireError::Io(e));
                        break;
                    }
                }
            }

            let mut notifiers = self.notifiers.lock();
            if outbound.pending() > 0 {
                notifiers.write.enable();
            } else {
                notifiers.write.disable();
            }
        }

        for _ in 0..completed {
            self.events.emit(SocketEvent::BytesWritten);
        }
        if let Some(err) = failure {
            self.fail(err);
        }
        written
    }
}
