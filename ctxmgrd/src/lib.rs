//! # Context Manager Daemon
//!
//! The process that acts as the transport's context manager: the root
//! name service every other process resolves services through.
//!
//! ## Philosophy
//!
//! - **Bootstrap, then serve**: Setup runs once, in a fixed order, before
//!   the reactor is entered
//! - **Fatal means abort**: A process that cannot be the context manager
//!   must not pretend to be one
//! - **Degraded is fine**: A failed registration or readiness write is
//!   logged and the daemon keeps serving
//! - **One thread**: Transport work and liveness sweeps are dispatched by a
//!   single reactor; nothing is locked
//!
//! ## Responsibilities
//!
//! The daemon:
//! - Registers the service manager with itself and the token manager next
//!   to it
//! - Binds the service manager as the transport's context object
//! - Publishes the readiness property
//! - Drains the transport whenever it becomes readable
//! - Sweeps registrations of dead clients on a fixed period

pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod readiness;

#[cfg(test)]
mod test_utils;

pub use bootstrap::{bootstrap, start_context_manager, Collaborators, ContextManager, FatalSetupError};
pub use config::{BootstrapConfig, ConfigError, DaemonConfig, FailurePolicy, TimerBackend};
pub use handlers::{CoreHandler, SweepHandler, TransportHandler};
pub use logging::init_tracing;
pub use readiness::{PropertyStore, PublishError, ReadinessPublisher};
