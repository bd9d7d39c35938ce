//! # Token Manager
//!
//! Helper service registered by the context manager next to the service
//! manager.
//!
//! ## Philosophy
//!
//! A token stands in for an endpoint handle that cannot itself be passed
//! around. Whoever holds the token can resolve it back to the endpoint
//! until the token is unregistered. Tokens are unguessable: each one is a
//! SHA-256 digest over a per-process salt, a counter, and the endpoint id.

use core_types::{EndpointId, TOKEN_MANAGER_INTERFACE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use transport::{Endpoint, Reply, ReplyCode};
use uuid::Uuid;

/// Body of a transaction addressed to the token manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TokenRequest {
    /// Mint a token for an endpoint
    CreateToken { endpoint: EndpointId },
    /// Resolve a token
    Get { token: String },
    /// Forget a token
    Unregister { token: String },
}

/// Error types for token operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unknown token: {0}")]
    UnknownToken(String),
}

/// Token manager
pub struct TokenManager {
    id: EndpointId,
    salt: [u8; 16],
    counter: Cell<u64>,
    tokens: RefCell<HashMap<String, EndpointId>>,
}

impl TokenManager {
    pub fn new() -> Self {
        Self {
            id: EndpointId::new(),
            salt: *Uuid::new_v4().as_bytes(),
            counter: Cell::new(0),
            tokens: RefCell::new(HashMap::new()),
        }
    }

    /// Mints a fresh token resolving to `endpoint`.
    pub fn create_token(&self, endpoint: EndpointId) -> String {
        let counter = self.counter.get();
        self.counter.set(counter + 1);

        let mut hasher = Sha256::new();
        hasher.update(self.salt);
        hasher.update(counter.to_le_bytes());
        hasher.update(endpoint.as_uuid().as_bytes());
        let token = hex::encode(hasher.finalize());

        debug!(%endpoint, "Token created");
        self.tokens.borrow_mut().insert(token.clone(), endpoint);
        token
    }

    pub fn get(&self, token: &str) -> Result<EndpointId, TokenError> {
        self.tokens
            .borrow()
            .get(token)
            .copied()
            .ok_or_else(|| TokenError::UnknownToken(token.to_string()))
    }

    pub fn unregister(&self, token: &str) -> Result<EndpointId, TokenError> {
        self.tokens
            .borrow_mut()
            .remove(token)
            .ok_or_else(|| TokenError::UnknownToken(token.to_string()))
    }

    /// Number of live tokens
    pub fn count(&self) -> usize {
        self.tokens.borrow().len()
    }

    fn handle(&self, request: TokenRequest) -> Result<Reply, TokenError> {
        match request {
            TokenRequest::CreateToken { endpoint } => Ok(Reply::ok(&self.create_token(endpoint))),
            TokenRequest::Get { token } => Ok(Reply::ok(&self.get(&token)?)),
            TokenRequest::Unregister { token } => Ok(Reply::ok(&self.unregister(&token)?)),
        }
    }
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Endpoint for TokenManager {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn interface(&self) -> &str {
        TOKEN_MANAGER_INTERFACE
    }

    fn transact(&self, body: &Value) -> Reply {
        let request = match TokenRequest::deserialize(body) {
            Ok(request) => request,
            Err(e) => return Reply::error(ReplyCode::BadRequest, e.to_string()),
        };
        self.handle(request)
            .unwrap_or_else(|e| Reply::error(ReplyCode::NotFound, e.to_string()))
    }
}
