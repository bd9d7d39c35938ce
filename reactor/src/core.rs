use crate::error::{AckError, ReactorError};
use crate::poller::{Poller, Token};
use crate::source::{EventSource, Registration, SourceKind};

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::mem;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Handle returned by [`Reactor::add_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(Token);

impl RegistrationHandle {
    pub fn from_token(token: Token) -> Self {
        Self(token)
    }

    pub fn token(&self) -> Token {
        self.0
    }
}

/// What a handler wants done with its source after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the source registered
    Continue,
    /// Deregister the source; it is never dispatched again
    Remove,
}

/// One dispatch of a ready source.
#[derive(Debug)]
pub struct ReadyEvent {
    pub handle: RegistrationHandle,
    pub kind: SourceKind,
    /// The watched descriptor, for descriptor-backed sources.
    pub fd: Option<RawFd>,
    /// Result of [`EventSource::acknowledge`] for this wake.
    pub acknowledgement: Result<u64, AckError>,
}

/// Callback bound to a source.
///
/// Handlers receive no access to the reactor, so a handler can never be
/// re-entered while it runs.
pub trait ReadyHandler {
    fn on_ready(&mut self, event: ReadyEvent) -> Disposition;
}

impl<F> ReadyHandler for F
where
    F: FnMut(ReadyEvent) -> Disposition,
{
    fn on_ready(&mut self, event: ReadyEvent) -> Disposition {
        self(event)
    }
}

struct Slot {
    source: Box<dyn EventSource>,
    handler: Box<dyn ReadyHandler>,
    fd: Option<RawFd>,
    period: Option<Duration>,
}

/// Single-threaded, level-triggered event loop.
pub struct Reactor<P: Poller> {
    poller: P,
    slots: Vec<Option<Slot>>,
    deadlines: BinaryHeap<Reverse<(Instant, Token)>>,
    ready: Vec<Token>,
}

impl<P: Poller> Reactor<P> {
    pub fn new(poller: P) -> Self {
        Self {
            poller,
            slots: Vec::new(),
            deadlines: BinaryHeap::new(),
            ready: Vec::with_capacity(8),
        }
    }

    /// Binds `handler` to `source`. The source stays registered until its
    /// handler returns [`Disposition::Remove`].
    pub fn add_source(
        &mut self,
        source: Box<dyn EventSource>,
        handler: Box<dyn ReadyHandler>,
    ) -> Result<RegistrationHandle, ReactorError> {
        let token = self.slots.len();
        let kind = source.kind();

        let (fd, period) = match source.registration() {
            Registration::Descriptor { fd, interest } => {
                self.poller
                    .register(fd, token, interest)
                    .map_err(|source| ReactorError::Register { kind, source })?;
                (Some(fd), None)
            }
            Registration::Interval { period, first_fire } => {
                if period.is_zero() {
                    return Err(ReactorError::ZeroPeriod);
                }
                self.deadlines
                    .push(Reverse((Instant::now() + first_fire, token)));
                (None, Some(period))
            }
        };

        debug!(token, ?kind, ?fd, ?period, "Source registered");
        self.slots.push(Some(Slot {
            source,
            handler,
            fd,
            period,
        }));
        Ok(RegistrationHandle(token))
    }

    /// Number of sources still registered.
    pub fn source_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn poller(&self) -> &P {
        &self.poller
    }

    /// Blocks forever, dispatching ready sources. Returns only if waiting
    /// itself fails.
    pub fn run(&mut self) -> Result<(), ReactorError> {
        loop {
            self.turn(None)?;
        }
    }

    /// Waits once (at most `timeout`, or until the next timer deadline) and
    /// dispatches every ready source exactly once. Returns the number of
    /// handlers invoked.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize, ReactorError> {
        let timeout = self.wait_timeout(timeout);

        let mut ready = mem::take(&mut self.ready);
        ready.clear();
        if let Err(e) = self.poller.wait(&mut ready, timeout) {
            self.ready = ready;
            return Err(ReactorError::Wait(e));
        }
        self.collect_expired(&mut ready);

        // One dispatch per source per wake.
        ready.sort_unstable();
        ready.dedup();

        let mut dispatched = 0;
        for &token in &ready {
            if self.dispatch(token) {
                dispatched += 1;
            }
        }

        self.ready = ready;
        Ok(dispatched)
    }

    fn wait_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        let until_deadline = self
            .deadlines
            .peek()
            .map(|Reverse((deadline, _))| deadline.saturating_duration_since(Instant::now()));

        match (requested, until_deadline) {
            (Some(requested), Some(until_deadline)) => Some(requested.min(until_deadline)),
            (requested, until_deadline) => requested.or(until_deadline),
        }
    }

    fn collect_expired(&mut self, ready: &mut Vec<Token>) {
        let now = Instant::now();
        while let Some(&Reverse((deadline, token))) = self.deadlines.peek() {
            if deadline > now {
                break;
            }
            self.deadlines.pop();

            let Some(period) = self
                .slots
                .get(token)
                .and_then(Option::as_ref)
                .and_then(|slot| slot.period)
            else {
                continue;
            };

            // Fixed rate; missed periods are skipped rather than replayed.
            let mut next = deadline + period;
            if next <= now {
                next = now + period;
            }
            self.deadlines.push(Reverse((next, token)));
            ready.push(token);
        }
    }

    fn dispatch(&mut self, token: Token) -> bool {
        let Some(slot) = self.slots.get_mut(token).and_then(Option::as_mut) else {
            return false;
        };

        let acknowledgement = slot.source.acknowledge();
        let event = ReadyEvent {
            handle: RegistrationHandle(token),
            kind: slot.source.kind(),
            fd: slot.fd,
            acknowledgement,
        };

        if slot.handler.on_ready(event) == Disposition::Remove {
            self.remove(token);
        }
        true
    }

    fn remove(&mut self, token: Token) {
        let Some(slot) = self.slots.get_mut(token).and_then(Option::take) else {
            return;
        };
        if let Some(fd) = slot.fd {
            if let Err(e) = self.poller.deregister(fd) {
                warn!(token, fd, error = %e, "Failed to deregister source");
            }
        }
        debug!(token, "Source removed");
    }
}
