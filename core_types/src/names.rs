//! Well-known names published by the context manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance name the context manager publishes itself and its helpers under.
pub const DEFAULT_INSTANCE: &str = "default";

/// Interface descriptor of the service manager (the context object).
pub const MANAGER_INTERFACE: &str = "ctxmgr.manager@1.0::IServiceManager";

/// Interface descriptor of the token helper service.
pub const TOKEN_MANAGER_INTERFACE: &str = "ctxmgr.token@1.0::ITokenManager";

/// Readiness flag consumed by process supervisors.
pub const READY_PROPERTY: &str = "ctxmgr.ready";

/// Key an endpoint is published under.
///
/// Instance names are not unique on their own: two registrants may share an
/// instance name as long as they implement different interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceName {
    pub interface: String,
    pub instance: String,
}

impl ServiceName {
    pub fn new(interface: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.interface, self.instance)
    }
}
