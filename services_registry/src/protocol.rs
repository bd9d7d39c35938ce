//! Requests the service manager answers over the transport.

use core_types::{EndpointId, ServiceName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use transport::EndpointInfo;

/// Body of a transaction addressed to the service manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ManagerRequest {
    /// Resolve one registration
    Get { interface: String, instance: String },
    /// Enumerate every registration
    List,
    /// Publish an endpoint hosted by process `pid`
    Add {
        interface: String,
        instance: String,
        pid: u32,
    },
    /// Withdraw a registration previously added by process `pid`
    Remove {
        interface: String,
        instance: String,
        pid: u32,
    },
    /// Forward `body` to a registered in-process endpoint
    Call { target: EndpointId, body: Value },
}

/// One row of a `list` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: ServiceName,
    pub endpoint: EndpointInfo,
}
