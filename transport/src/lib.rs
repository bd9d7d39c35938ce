//! # Transport
//!
//! The remote-call transport the context manager sits on top of.
//!
//! ## Philosophy
//!
//! - **Descriptor-driven**: The transport exposes one pollable descriptor; whoever owns the
//!   event loop decides when to let it run.
//! - **One unit per drain**: [`Transport::drain_once`] handles at most one pending unit of
//!   work and never blocks waiting for more.
//! - **Framing is private**: Callers see [`Transaction`] and [`Reply`], never the bytes.
//!
//! ## Architecture
//!
//! - [`Endpoint`]: A remote-callable object, addressed by [`core_types::EndpointId`]
//! - [`Transport`]: The driver contract (context object binding, root registration, polling)
//! - [`UnixSocketTransport`]: A Unix-domain-socket driver speaking JSON lines
//! - [`TransportClient`]: A blocking client for the same wire format

pub mod client;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod remote;
pub mod unix;

pub use client::TransportClient;
pub use driver::{CallRestriction, Transport};
pub use endpoint::{Endpoint, EndpointInfo, EndpointRef};
pub use error::TransportError;
pub use message::{Reply, ReplyCode, SchemaVersion, Transaction, WIRE_VERSION};
pub use remote::RemoteEndpoint;
pub use unix::{UnixSocketTransport, MAX_REQUEST_BYTES};
