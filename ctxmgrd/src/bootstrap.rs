//! # Context-Manager Bootstrap
//!
//! Runs once, before the reactor. The steps are ordered: the registry is
//! bound as the context object and the process becomes the root object
//! before any source is added to the reactor, so a fatal step leaves no
//! reactor behind.

use crate::config::{BootstrapConfig, FailurePolicy, TimerBackend};
use crate::handlers::{CoreHandler, SweepHandler, TransportHandler};
use crate::readiness::ReadinessPublisher;
use reactor::{
    DescriptorSource, EventSource, IntervalTimer, Poller, Reactor, ReactorError,
    RegistrationHandle,
};
use services_registry::Registry;
use std::io;
use std::process;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use transport::{Endpoint, EndpointRef, Transport, TransportError};

/// Setup failures that end the process.
#[derive(Debug, Error)]
pub enum FatalSetupError {
    #[error("Failed to bind the registry as context object: {0}")]
    BindContextObject(#[source] TransportError),

    #[error("Failed to become context manager")]
    BecomeContextManager,

    #[error("Failed to open the transport readiness descriptor: {0}")]
    ReadinessDescriptor(#[source] TransportError),

    #[error("Failed to create the liveness timer: {0}")]
    Timer(#[source] io::Error),

    #[error("Failed to add a source to the reactor: {0}")]
    Reactor(#[from] ReactorError),
}

/// Everything the bootstrap wires together.
pub struct Collaborators<R> {
    pub transport: Rc<dyn Transport>,
    /// The name service; bound as context object and swept by the timer
    pub registry: Rc<R>,
    /// Helper endpoint registered next to the registry
    pub helper: EndpointRef,
    pub publisher: Box<dyn ReadinessPublisher>,
}

/// A bootstrapped context manager, ready to serve.
pub struct ContextManager<P: Poller> {
    reactor: Reactor<P>,
    transport_source: RegistrationHandle,
    timer_source: RegistrationHandle,
}

impl<P: Poller> ContextManager<P> {
    /// Serves forever. Returns only if the reactor can no longer wait.
    pub fn run(&mut self) -> Result<(), ReactorError> {
        self.reactor.run()
    }

    /// Runs a single reactor wake.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize, ReactorError> {
        self.reactor.turn(timeout)
    }

    pub fn transport_source(&self) -> RegistrationHandle {
        self.transport_source
    }

    pub fn timer_source(&self) -> RegistrationHandle {
        self.timer_source
    }

    pub fn reactor(&self) -> &Reactor<P> {
        &self.reactor
    }
}

/// Runs the bootstrap sequence and hands back the reactor it built.
pub fn bootstrap<R, P>(
    config: &BootstrapConfig,
    collaborators: Collaborators<R>,
    poller: P,
) -> Result<ContextManager<P>, FatalSetupError>
where
    R: Registry + Endpoint + 'static,
    P: Poller,
{
    let Collaborators {
        transport,
        registry,
        helper,
        publisher,
    } = collaborators;

    if let Err(e) = transport.set_call_restriction(config.call_restriction) {
        warn!(restriction = %config.call_restriction, error = %e, "Failed to set call restriction");
    }

    let registry_endpoint: EndpointRef = registry.clone();
    if !registry.register(&config.service_name, registry_endpoint.clone()) {
        error!(
            interface = registry_endpoint.interface(),
            "Failed to register the service manager with itself"
        );
    }

    if !registry.register(&config.service_name, helper.clone()) {
        error!(interface = helper.interface(), "Failed to register the token manager");
    }

    transport
        .bind_context_object(registry_endpoint)
        .map_err(FatalSetupError::BindContextObject)?;

    if !transport.become_root_object() {
        match config.context_manager_failure {
            FailurePolicy::Fatal => return Err(FatalSetupError::BecomeContextManager),
            FailurePolicy::Log if transport.serves_without_root() => {
                error!("Could not become context manager; continuing")
            }
            FailurePolicy::Log => {
                error!("Could not become context manager; transport cannot serve without it");
                return Err(FatalSetupError::BecomeContextManager);
            }
        }
    }

    if let Err(e) = publisher.publish(&config.readiness_key, &config.readiness_value) {
        error!(
            key = %config.readiness_key,
            error = %e,
            "Failed to set \"{}\" property. Services may not start.",
            config.readiness_key
        );
    }

    let fd = transport
        .open_readiness_descriptor()
        .map_err(FatalSetupError::ReadinessDescriptor)?;
    transport.flush_commands();

    let mut reactor = Reactor::new(poller);
    let transport_source = reactor.add_source(
        Box::new(DescriptorSource::readable(fd)),
        Box::new(CoreHandler::Transport(TransportHandler::new(transport, fd))),
    )?;

    let sweeper: Rc<dyn Registry> = registry;
    let timer_source = reactor.add_source(
        liveness_timer(config.timer, config.sweep_period)?,
        Box::new(CoreHandler::Sweep(SweepHandler::new(sweeper))),
    )?;

    Ok(ContextManager {
        reactor,
        transport_source,
        timer_source,
    })
}

fn liveness_timer(
    backend: TimerBackend,
    period: Duration,
) -> Result<Box<dyn EventSource>, FatalSetupError> {
    match backend {
        #[cfg(target_os = "linux")]
        TimerBackend::TimerFd => Ok(Box::new(
            reactor::TimerFd::periodic(period).map_err(FatalSetupError::Timer)?,
        )),
        #[cfg(not(target_os = "linux"))]
        TimerBackend::TimerFd => {
            warn!("timerfd is unavailable on this platform; using an interval timer");
            Ok(Box::new(IntervalTimer::new(period)))
        }
        TimerBackend::Interval => Ok(Box::new(IntervalTimer::new(period))),
    }
}

/// Bootstraps and serves forever. Never returns: a fatal setup error, or a
/// reactor that can no longer wait, aborts the process.
pub fn start_context_manager<R, P>(
    config: &BootstrapConfig,
    collaborators: Collaborators<R>,
    poller: P,
) -> !
where
    R: Registry + Endpoint + 'static,
    P: Poller,
{
    let mut manager = match bootstrap(config, collaborators, poller) {
        Ok(manager) => manager,
        Err(e) => {
            error!(error = %e, "Context manager setup failed");
            process::abort();
        }
    };

    info!(service = %config.service_name, "Context manager is ready now.");

    match manager.run() {
        Ok(()) => process::exit(0),
        Err(e) => {
            error!(error = %e, "Reactor stopped");
            process::abort();
        }
    }
}
