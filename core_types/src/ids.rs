//! Unique identifiers for transport entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an endpoint
///
/// Endpoints are remote-callable objects. The identifier is the only part of
/// an endpoint the context manager ever inspects besides its liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(Uuid);

impl EndpointId {
    /// Creates a new random endpoint ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an endpoint ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates an endpoint ID from a raw 128-bit value
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id_creation() {
        let id1 = EndpointId::new();
        let id2 = EndpointId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_endpoint_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = EndpointId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn test_endpoint_id_from_u128_is_stable() {
        let a = EndpointId::from_u128(0x1234);
        let b = EndpointId::from_u128(0x1234);
        assert_eq!(a, b);
    }

    #[test]
    fn test_endpoint_id_display() {
        let id = EndpointId::new();
        assert!(format!("{}", id).starts_with("Endpoint("));
    }

    #[test]
    fn test_endpoint_id_serializes_as_uuid_string() {
        let id = EndpointId::from_u128(1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000001\"");
    }
}
