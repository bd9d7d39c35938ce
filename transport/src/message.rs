//! Wire messages exchanged over the transport

use crate::error::TransportError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Version of the framing spoken by this crate.
pub const WIRE_VERSION: SchemaVersion = SchemaVersion::new(1, 0);

/// Schema version for transaction payloads
///
/// This enables backward-compatible evolution of message formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u32,
    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl SchemaVersion {
    /// Creates a new schema version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Checks if this version is compatible with another
    ///
    /// Compatibility rules:
    /// - Same major version = compatible
    /// - Different major version = incompatible
    pub fn is_compatible_with(&self, other: &SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// A single request delivered to the context object.
///
/// The body is opaque to the transport; the receiving endpoint decodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: SchemaVersion,
    pub body: Value,
}

impl Transaction {
    /// Creates a transaction using the current wire version.
    pub fn new(body: Value) -> Self {
        Self {
            version: WIRE_VERSION,
            body,
        }
    }

    /// Serializes a typed request into a transaction body.
    pub fn from_request<T: Serialize>(request: &T) -> Result<Self, TransportError> {
        Ok(Self::new(serde_json::to_value(request)?))
    }
}

/// Failure classes a reply can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyCode {
    /// The transaction or its body could not be decoded
    BadRequest,
    /// The sender speaks an incompatible wire version
    UnsupportedVersion,
    /// No context object has been bound yet
    NoContextObject,
    /// The named service or endpoint does not exist
    NotFound,
    /// The endpoint lives in another process and cannot be called here
    Unreachable,
    /// The endpoint failed while handling the transaction
    Internal,
}

/// Answer to a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Ok { body: Value },
    Error { code: ReplyCode, message: String },
}

impl Reply {
    /// Builds a successful reply from any serializable value.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Reply::Ok { body },
            Err(e) => Reply::error(ReplyCode::Internal, e.to_string()),
        }
    }

    /// Builds a failed reply.
    pub fn error(code: ReplyCode, message: impl Into<String>) -> Self {
        Reply::Error {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok { .. })
    }

    /// Decodes a successful reply body, or surfaces the remote error.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        match self {
            Reply::Ok { body } => Ok(serde_json::from_value(body)?),
            Reply::Error { code, message } => Err(TransportError::Remote { code, message }),
        }
    }
}
