//! # Core Types
//!
//! This crate defines the fundamental types shared by every ctxmgr crate.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Endpoints are addressed by typed identifiers, never raw integers.
//! - **No ambient globals**: Well-known names are constants handed to the bootstrap, not
//!   process-wide mutable state.
//!
//! ## Key Types
//!
//! - [`EndpointId`]: Process-unique handle of a remote-callable endpoint
//! - [`ServiceName`]: Interface + instance key an endpoint is published under

pub mod ids;
pub mod names;

pub use ids::EndpointId;
pub use names::{
    ServiceName, DEFAULT_INSTANCE, MANAGER_INTERFACE, READY_PROPERTY, TOKEN_MANAGER_INTERFACE,
};
