//! The driver contract the context manager depends on.

use crate::endpoint::EndpointRef;
use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::fd::RawFd;

/// Restriction applied to calls this process makes through the transport.
///
/// A context manager must never block on a client, so the reference
/// configuration flags every outgoing call that is not fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallRestriction {
    /// All calls allowed
    None,
    /// Two-way calls are logged as errors
    #[default]
    ErrorIfNotOneway,
    /// Two-way calls abort the process
    FatalIfNotOneway,
}

impl fmt::Display for CallRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallRestriction::None => write!(f, "none"),
            CallRestriction::ErrorIfNotOneway => write!(f, "error-if-not-oneway"),
            CallRestriction::FatalIfNotOneway => write!(f, "fatal-if-not-oneway"),
        }
    }
}

/// Operations a transport driver exposes to the process acting as its
/// context manager.
///
/// Every method runs on the reactor thread.
pub trait Transport {
    /// Configures the outgoing call policy.
    fn set_call_restriction(&self, restriction: CallRestriction) -> Result<(), TransportError>;

    /// Declares `endpoint` as the object every unaddressed transaction is
    /// delivered to.
    fn bind_context_object(&self, endpoint: EndpointRef) -> Result<(), TransportError>;

    /// Registers this process as the root object of the whole transport.
    fn become_root_object(&self) -> bool;

    /// Whether the readiness descriptor is available even when
    /// [`Transport::become_root_object`] failed.
    fn serves_without_root(&self) -> bool {
        true
    }

    /// Returns the descriptor that becomes readable when work is pending.
    fn open_readiness_descriptor(&self) -> Result<RawFd, TransportError>;

    /// Pushes any queued outgoing commands to the driver.
    fn flush_commands(&self) {}

    /// Processes at most one unit of pending work. Never blocks waiting for
    /// work; with nothing pending this is a no-op.
    fn drain_once(&self, fd: RawFd) -> Result<(), TransportError>;
}
