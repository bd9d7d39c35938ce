//! Remote-callable endpoints

use crate::message::{Reply, ReplyCode};
use core_types::EndpointId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

/// A remote-callable object.
///
/// Endpoints are owned by whoever registered them; the transport and the
/// context manager only hold shared references. All calls happen on the
/// thread that drains the transport, so implementations may use `RefCell`
/// for their state.
pub trait Endpoint {
    /// Process-unique handle of this endpoint.
    fn id(&self) -> EndpointId;

    /// Interface descriptor, e.g. `ctxmgr.manager@1.0::IServiceManager`.
    fn interface(&self) -> &str;

    /// Whether the process hosting this endpoint still exists.
    fn is_alive(&self) -> bool {
        true
    }

    /// Process that hosts this endpoint, when it is not the local process.
    fn owner_pid(&self) -> Option<u32> {
        None
    }

    /// Handles one transaction body addressed to this endpoint.
    fn transact(&self, body: &Value) -> Reply {
        let _ = body;
        Reply::error(
            ReplyCode::Unreachable,
            format!("{} does not accept transactions", self.interface()),
        )
    }

    /// Snapshot used when describing this endpoint to clients.
    fn info(&self) -> EndpointInfo {
        EndpointInfo {
            id: self.id(),
            interface: self.interface().to_string(),
            pid: self.owner_pid(),
        }
    }
}

/// Shared handle to an endpoint.
pub type EndpointRef = Rc<dyn Endpoint>;

/// Serializable description of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: EndpointId,
    pub interface: String,
    pub pid: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain(EndpointId);

    impl Endpoint for Plain {
        fn id(&self) -> EndpointId {
            self.0
        }

        fn interface(&self) -> &str {
            "test.plain@1.0::IPlain"
        }
    }

    #[test]
    fn test_default_transact_is_unreachable() {
        let endpoint = Plain(EndpointId::new());
        let reply = endpoint.transact(&Value::Null);
        assert!(matches!(
            reply,
            Reply::Error {
                code: ReplyCode::Unreachable,
                ..
            }
        ));
    }

    #[test]
    fn test_info_reflects_endpoint() {
        let id = EndpointId::new();
        let endpoint: EndpointRef = Rc::new(Plain(id));
        let info = endpoint.info();
        assert_eq!(info.id, id);
        assert_eq!(info.interface, "test.plain@1.0::IPlain");
        assert_eq!(info.pid, None);
        assert!(endpoint.is_alive());
    }
}
