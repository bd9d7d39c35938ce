//! The context manager's two reactor callbacks.

use reactor::{AckError, Disposition, ReadyEvent, ReadyHandler};
use services_registry::Registry;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use tracing::{debug, trace, warn};
use transport::Transport;

/// Drains one unit of transport work per wake.
pub struct TransportHandler {
    transport: Rc<dyn Transport>,
    fd: RawFd,
}

impl TransportHandler {
    pub fn new(transport: Rc<dyn Transport>, fd: RawFd) -> Self {
        Self { transport, fd }
    }

    fn on_readable(&mut self) -> Disposition {
        if let Err(e) = self.transport.drain_once(self.fd) {
            warn!(fd = self.fd, error = %e, "Transport drain failed");
        }
        Disposition::Continue
    }
}

/// Reaps dead registrations on every timer expiration.
pub struct SweepHandler {
    registry: Rc<dyn Registry>,
}

impl SweepHandler {
    pub fn new(registry: Rc<dyn Registry>) -> Self {
        Self { registry }
    }

    fn on_expired(&mut self, event: &ReadyEvent) -> Disposition {
        match &event.acknowledgement {
            Ok(expirations) => trace!(expirations, "Liveness timer fired"),
            Err(e) if is_spurious_wake(e) => debug!("Liveness timer woke with nothing to read"),
            Err(e) => warn!(error = %e, "Failed to acknowledge liveness timer"),
        }
        self.registry.sweep_dead_clients();
        Disposition::Continue
    }
}

/// A timer readable with no expiration pending yet; the sweep still runs.
fn is_spurious_wake(error: &AckError) -> bool {
    matches!(error, AckError::Io(e) if e.kind() == io::ErrorKind::WouldBlock)
}

/// Dispatch table entry for each source the context manager owns.
pub enum CoreHandler {
    Transport(TransportHandler),
    Sweep(SweepHandler),
}

impl ReadyHandler for CoreHandler {
    fn on_ready(&mut self, event: ReadyEvent) -> Disposition {
        match self {
            CoreHandler::Transport(handler) => handler.on_readable(),
            CoreHandler::Sweep(handler) => handler.on_expired(&event),
        }
    }
}
