//! # Service Registry
//!
//! This crate implements the service manager: the name service the context
//! manager publishes as its context object.
//!
//! ## Philosophy
//!
//! A name service is itself a nameable service. The manager registers
//! itself first, then answers lookups for everything registered after it.
//!
//! Registrations are keyed by interface and instance name, so the manager and
//! its helpers can all live under the `default` instance. Registering a name
//! again replaces the previous endpoint. Endpoints whose hosting process has
//! died are dropped by the periodic liveness sweep.

pub mod protocol;

pub use protocol::{ManagerRequest, ServiceEntry};

use core_types::{EndpointId, ServiceName, MANAGER_INTERFACE};
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};
use transport::{Endpoint, EndpointRef, RemoteEndpoint, Reply, ReplyCode};

/// The two operations the context manager needs from its registry.
pub trait Registry {
    /// Publishes `endpoint` under `instance`. Returns whether it was accepted.
    fn register(&self, instance: &str, endpoint: EndpointRef) -> bool;

    /// Drops every registration whose endpoint is no longer alive.
    fn sweep_dead_clients(&self);
}

/// Error types for registry operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Instance names must be non-empty
    #[error("Instance name is empty")]
    EmptyInstance,

    /// The endpoint's process was already gone when it tried to register
    #[error("Endpoint {0} is not alive")]
    DeadEndpoint(EndpointId),

    /// Service name not found
    #[error("Service not found: {0}")]
    NotFound(ServiceName),

    /// Endpoint not registered under any name
    #[error("Endpoint not found: {0}")]
    UnknownEndpoint(EndpointId),

    /// Caller tried to withdraw a registration it does not own
    #[error("Service {0} is not owned by the caller")]
    NotOwner(ServiceName),
}

impl RegistryError {
    fn reply_code(&self) -> ReplyCode {
        match self {
            RegistryError::EmptyInstance
            | RegistryError::DeadEndpoint(_)
            | RegistryError::NotOwner(_) => ReplyCode::BadRequest,
            RegistryError::NotFound(_) | RegistryError::UnknownEndpoint(_) => ReplyCode::NotFound,
        }
    }
}

/// Service manager
///
/// Maps service names to endpoints. Lives on the reactor thread; every
/// method takes `&self` so the same `Rc` can be the transport's context
/// object, a registered service, and the sweep target at once.
pub struct ServiceManager {
    id: EndpointId,
    services: RefCell<BTreeMap<ServiceName, EndpointRef>>,
}

impl ServiceManager {
    /// Creates an empty service manager
    pub fn new() -> Self {
        Self {
            id: EndpointId::new(),
            services: RefCell::new(BTreeMap::new()),
        }
    }

    /// Publishes `endpoint` under its own interface and `instance`.
    pub fn add(&self, instance: &str, endpoint: EndpointRef) -> Result<(), RegistryError> {
        if instance.is_empty() {
            return Err(RegistryError::EmptyInstance);
        }
        if !endpoint.is_alive() {
            return Err(RegistryError::DeadEndpoint(endpoint.id()));
        }

        let name = ServiceName::new(endpoint.interface(), instance);
        debug!(%name, id = %endpoint.id(), "Service registered");
        if let Some(previous) = self.services.borrow_mut().insert(name.clone(), endpoint) {
            debug!(%name, replaced = %previous.id(), "Previous registration replaced");
        }
        Ok(())
    }

    /// Looks up a service by interface and instance.
    pub fn get(&self, interface: &str, instance: &str) -> Result<EndpointRef, RegistryError> {
        let name = ServiceName::new(interface, instance);
        self.services
            .borrow()
            .get(&name)
            .cloned()
            .ok_or(RegistryError::NotFound(name))
    }

    /// Lists every registration, ordered by name.
    pub fn list(&self) -> Vec<ServiceEntry> {
        self.services
            .borrow()
            .iter()
            .map(|(name, endpoint)| ServiceEntry {
                name: name.clone(),
                endpoint: endpoint.info(),
            })
            .collect()
    }

    /// Finds a registered endpoint by its handle.
    pub fn find(&self, id: EndpointId) -> Option<EndpointRef> {
        self.services
            .borrow()
            .values()
            .find(|endpoint| endpoint.id() == id)
            .cloned()
    }

    /// Withdraws a registration
    pub fn remove(&self, name: &ServiceName) -> Result<EndpointRef, RegistryError> {
        self.services
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.clone()))
    }

    /// Withdraws every name `id` is registered under.
    pub fn remove_by_id(&self, id: EndpointId) -> Result<usize, RegistryError> {
        let mut services = self.services.borrow_mut();
        let before = services.len();
        services.retain(|_, endpoint| endpoint.id() != id);
        match before - services.len() {
            0 => Err(RegistryError::UnknownEndpoint(id)),
            removed => Ok(removed),
        }
    }

    /// Drops dead registrations and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        // Probe liveness outside the borrow; endpoints may be arbitrary code.
        let entries: Vec<(ServiceName, EndpointRef)> = self
            .services
            .borrow()
            .iter()
            .map(|(name, endpoint)| (name.clone(), Rc::clone(endpoint)))
            .collect();
        let dead: Vec<_> = entries
            .into_iter()
            .filter(|(_, endpoint)| !endpoint.is_alive())
            .collect();

        let mut services = self.services.borrow_mut();
        let mut removed = 0;
        for (name, endpoint) in dead {
            if services.get(&name).map(|e| e.id()) == Some(endpoint.id()) {
                services.remove(&name);
                info!(%name, pid = ?endpoint.owner_pid(), "Dropped registration of dead client");
                removed += 1;
            }
        }
        removed
    }

    /// Returns the number of registered services
    pub fn count(&self) -> usize {
        self.services.borrow().len()
    }

    fn handle(&self, request: ManagerRequest) -> Result<Reply, RegistryError> {
        match request {
            ManagerRequest::Get {
                interface,
                instance,
            } => Ok(Reply::ok(&self.get(&interface, &instance)?.info())),
            ManagerRequest::List => Ok(Reply::ok(&self.list())),
            ManagerRequest::Add {
                interface,
                instance,
                pid,
            } => {
                let endpoint: EndpointRef = Rc::new(RemoteEndpoint::new(interface, pid));
                let info = endpoint.info();
                self.add(&instance, endpoint)?;
                Ok(Reply::ok(&info))
            }
            ManagerRequest::Remove {
                interface,
                instance,
                pid,
            } => {
                let name = ServiceName::new(interface, instance);
                let endpoint = self.get(&name.interface, &name.instance)?;
                if endpoint.owner_pid() != Some(pid) {
                    return Err(RegistryError::NotOwner(name));
                }
                Ok(Reply::ok(&self.remove(&name)?.info()))
            }
            ManagerRequest::Call { target, body } => {
                let endpoint = self
                    .find(target)
                    .ok_or(RegistryError::UnknownEndpoint(target))?;
                Ok(endpoint.transact(&body))
            }
        }
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for ServiceManager {
    fn register(&self, instance: &str, endpoint: EndpointRef) -> bool {
        match self.add(instance, endpoint) {
            Ok(()) => true,
            Err(e) => {
                warn!(instance, error = %e, "Registration refused");
                false
            }
        }
    }

    fn sweep_dead_clients(&self) {
        let removed = self.sweep();
        if removed > 0 {
            info!(removed, remaining = self.count(), "Liveness sweep finished");
        }
    }
}

impl Endpoint for ServiceManager {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn interface(&self) -> &str {
        MANAGER_INTERFACE
    }

    fn transact(&self, body: &Value) -> Reply {
        let request = match ManagerRequest::deserialize(body) {
            Ok(request) => request,
            Err(e) => return Reply::error(ReplyCode::BadRequest, e.to_string()),
        };
        self.handle(request)
            .unwrap_or_else(|e| Reply::error(e.reply_code(), e.to_string()))
    }
}
