//! # Simulated Poller
//!
//! Deterministic poller for testing.
//!
//! Readiness never comes from the operating system: each wake is scripted
//! through a [`SimHandle`], and a wait with nothing scripted fails instead
//! of blocking, so a test can drive [`crate::Reactor::run`] to completion.
//!
//! ```
//! use reactor::sim::SimPoller;
//! use reactor::{Disposition, DescriptorSource, Reactor, ReadyEvent};
//!
//! let (poller, sim) = SimPoller::new();
//! let mut reactor = Reactor::new(poller);
//! let handle = reactor
//!     .add_source(
//!         Box::new(DescriptorSource::readable(10)),
//!         Box::new(|_event: ReadyEvent| Disposition::Continue),
//!     )
//!     .unwrap();
//!
//! sim.signal(handle);
//! sim.signal(handle);
//! assert_eq!(reactor.turn(None).unwrap(), 1);
//! assert_eq!(reactor.turn(None).unwrap(), 1);
//! assert!(reactor.turn(None).is_err());
//! assert_eq!(sim.waits(), 3);
//! ```

use crate::core::RegistrationHandle;
use crate::poller::{Poller, Token};
use crate::source::Interest;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Default)]
struct SimState {
    wakes: VecDeque<Vec<Token>>,
    registered: Vec<(RawFd, Token)>,
    deregistered: Vec<RawFd>,
    reject_registrations: bool,
    waits: usize,
}

/// Poller whose readiness is scripted by a [`SimHandle`].
#[derive(Debug)]
pub struct SimPoller {
    state: Rc<RefCell<SimState>>,
}

/// Scripting side of a [`SimPoller`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Rc<RefCell<SimState>>,
}

impl SimPoller {
    pub fn new() -> (Self, SimHandle) {
        let state = Rc::new(RefCell::new(SimState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            SimHandle { state },
        )
    }
}

impl SimHandle {
    /// Queues a wake in which only `handle` is ready.
    pub fn signal(&self, handle: RegistrationHandle) {
        self.signal_together(&[handle]);
    }

    /// Queues a single wake in which every handle is ready at once.
    pub fn signal_together(&self, handles: &[RegistrationHandle]) {
        let tokens = handles.iter().map(RegistrationHandle::token).collect();
        self.state.borrow_mut().wakes.push_back(tokens);
    }

    /// Queues a wake with nothing ready (a timeout or a signal interruption).
    pub fn idle_wake(&self) {
        self.state.borrow_mut().wakes.push_back(Vec::new());
    }

    /// Makes every later registration fail, like an exhausted kernel table.
    pub fn reject_registrations(&self, reject: bool) {
        self.state.borrow_mut().reject_registrations = reject;
    }

    /// Number of times the reactor has blocked on this poller.
    pub fn waits(&self) -> usize {
        self.state.borrow().waits
    }

    pub fn pending_wakes(&self) -> usize {
        self.state.borrow().wakes.len()
    }

    pub fn registered_fds(&self) -> Vec<RawFd> {
        self.state.borrow().registered.iter().map(|(fd, _)| *fd).collect()
    }

    pub fn deregistered_fds(&self) -> Vec<RawFd> {
        self.state.borrow().deregistered.clone()
    }
}

impl Poller for SimPoller {
    fn register(&mut self, fd: RawFd, token: Token, _interest: Interest) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.reject_registrations {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "simulated registration rejected",
            ));
        }
        if state.registered.iter().any(|(registered, _)| *registered == fd) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "descriptor already registered",
            ));
        }
        state.registered.push((fd, token));
        Ok(())
    }

    fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let before = state.registered.len();
        state.registered.retain(|(registered, _)| *registered != fd);
        if state.registered.len() == before {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "descriptor not registered",
            ));
        }
        state.deregistered.push(fd);
        Ok(())
    }

    fn wait(&mut self, ready: &mut Vec<Token>, _timeout: Option<Duration>) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.waits += 1;
        match state.wakes.pop_front() {
            Some(tokens) => {
                ready.extend(tokens);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "no scripted wakes left",
            )),
        }
    }
}
