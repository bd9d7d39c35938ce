//! Recording collaborators for bootstrap and handler tests.

use crate::readiness::{PublishError, ReadinessPublisher};
use core_types::{EndpointId, MANAGER_INTERFACE};
use services_registry::Registry;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use transport::{CallRestriction, Endpoint, EndpointRef, Transport, TransportError};

pub const FAKE_DESCRIPTOR: RawFd = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    SetCallRestriction(CallRestriction),
    BindContextObject,
    BecomeRootObject,
    OpenReadinessDescriptor,
    FlushCommands,
}

struct InFlight {
    current: Rc<Cell<usize>>,
    peak: Rc<Cell<usize>>,
}

impl InFlight {
    fn enter(&self) {
        self.current.set(self.current.get() + 1);
        self.peak.set(self.peak.get().max(self.current.get()));
    }

    fn exit(&self) {
        self.current.set(self.current.get() - 1);
    }
}

/// Transport that records every call and fails on request.
#[derive(Default)]
pub struct RecordingTransport {
    calls: RefCell<Vec<TransportCall>>,
    drained: RefCell<Vec<RawFd>>,
    fail_call_restriction: Cell<bool>,
    fail_bind: Cell<bool>,
    refuse_root: Cell<bool>,
    serve_only_as_root: Cell<bool>,
    fail_descriptor: Cell<bool>,
    fail_drains: Cell<bool>,
    in_flight: RefCell<Option<InFlight>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.borrow().clone()
    }

    pub fn drained(&self) -> Vec<RawFd> {
        self.drained.borrow().clone()
    }

    pub fn fail_call_restriction(&self, fail: bool) {
        self.fail_call_restriction.set(fail);
    }

    pub fn fail_bind(&self, fail: bool) {
        self.fail_bind.set(fail);
    }

    pub fn refuse_root(&self, refuse: bool) {
        self.refuse_root.set(refuse);
    }

    pub fn serve_only_as_root(&self, only: bool) {
        self.serve_only_as_root.set(only);
    }

    pub fn fail_descriptor(&self, fail: bool) {
        self.fail_descriptor.set(fail);
    }

    pub fn fail_drains(&self, fail: bool) {
        self.fail_drains.set(fail);
    }

    pub fn track_in_flight(&self, current: Rc<Cell<usize>>, peak: Rc<Cell<usize>>) {
        *self.in_flight.borrow_mut() = Some(InFlight { current, peak });
    }

    fn record(&self, call: TransportCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Transport for RecordingTransport {
    fn set_call_restriction(&self, restriction: CallRestriction) -> Result<(), TransportError> {
        self.record(TransportCall::SetCallRestriction(restriction));
        if self.fail_call_restriction.get() {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied).into());
        }
        Ok(())
    }

    fn bind_context_object(&self, _endpoint: EndpointRef) -> Result<(), TransportError> {
        self.record(TransportCall::BindContextObject);
        if self.fail_bind.get() {
            return Err(TransportError::ContextObjectAlreadyBound);
        }
        Ok(())
    }

    fn become_root_object(&self) -> bool {
        self.record(TransportCall::BecomeRootObject);
        !self.refuse_root.get()
    }

    fn serves_without_root(&self) -> bool {
        !self.serve_only_as_root.get()
    }

    fn open_readiness_descriptor(&self) -> Result<RawFd, TransportError> {
        self.record(TransportCall::OpenReadinessDescriptor);
        if self.fail_descriptor.get() {
            return Err(TransportError::NotListening);
        }
        Ok(FAKE_DESCRIPTOR)
    }

    fn flush_commands(&self) {
        self.record(TransportCall::FlushCommands);
    }

    fn drain_once(&self, fd: RawFd) -> Result<(), TransportError> {
        let in_flight = self.in_flight.borrow();
        if let Some(in_flight) = in_flight.as_ref() {
            in_flight.enter();
        }
        self.drained.borrow_mut().push(fd);
        if let Some(in_flight) = in_flight.as_ref() {
            in_flight.exit();
        }

        if self.fail_drains.get() {
            return Err(TransportError::UnknownDescriptor(fd));
        }
        Ok(())
    }
}

/// Registry that counts calls and accepts or rejects every registration.
pub struct CountingRegistry {
    accept: bool,
    registered: RefCell<Vec<(String, String)>>,
    sweeps: Cell<usize>,
    in_flight: RefCell<Option<InFlight>>,
}

impl CountingRegistry {
    pub fn accepting() -> Self {
        Self::with_policy(true)
    }

    pub fn rejecting() -> Self {
        Self::with_policy(false)
    }

    fn with_policy(accept: bool) -> Self {
        Self {
            accept,
            registered: RefCell::new(Vec::new()),
            sweeps: Cell::new(0),
            in_flight: RefCell::new(None),
        }
    }

    /// `(instance, interface)` of every accepted registration, in order.
    pub fn registered(&self) -> Vec<(String, String)> {
        self.registered.borrow().clone()
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps.get()
    }

    pub fn track_in_flight(&self, current: Rc<Cell<usize>>, peak: Rc<Cell<usize>>) {
        *self.in_flight.borrow_mut() = Some(InFlight { current, peak });
    }
}

impl Registry for CountingRegistry {
    fn register(&self, instance: &str, endpoint: EndpointRef) -> bool {
        if self.accept {
            self.registered
                .borrow_mut()
                .push((instance.to_string(), endpoint.interface().to_string()));
        }
        self.accept
    }

    fn sweep_dead_clients(&self) {
        let in_flight = self.in_flight.borrow();
        if let Some(in_flight) = in_flight.as_ref() {
            in_flight.enter();
        }
        self.sweeps.set(self.sweeps.get() + 1);
        if let Some(in_flight) = in_flight.as_ref() {
            in_flight.exit();
        }
    }
}

impl Endpoint for CountingRegistry {
    fn id(&self) -> EndpointId {
        EndpointId::from_u128(1)
    }

    fn interface(&self) -> &str {
        MANAGER_INTERFACE
    }
}

/// In-memory readiness channel. Clones share storage.
#[derive(Clone, Default)]
pub struct MemoryPublisher {
    values: Rc<RefCell<HashMap<String, String>>>,
    fail: Rc<Cell<bool>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl ReadinessPublisher for MemoryPublisher {
    fn publish(&self, key: &str, value: &str) -> Result<(), PublishError> {
        if self.fail.get() {
            return Err(PublishError::Io(io::Error::from(
                io::ErrorKind::PermissionDenied,
            )));
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
