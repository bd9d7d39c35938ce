//! Transport error types

use crate::message::ReplyCode;
use std::io;
use std::os::fd::RawFd;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when driving the transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying socket operation failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A message could not be encoded or decoded
    #[error("Malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    /// Another live process already owns the well-known address
    #[error("Address already owned by a live context manager: {}", .0.display())]
    AddressInUse(PathBuf),

    /// Something other than a socket occupies the well-known address
    #[error("Refusing to replace non-socket file: {}", .0.display())]
    NotASocket(PathBuf),

    /// A client did not finish its request in time
    #[error("Client request timed out")]
    RequestTimedOut,

    /// A client sent more than the driver accepts in one request
    #[error("Client request exceeds {0} bytes")]
    RequestTooLarge(usize),

    /// A context object was bound twice
    #[error("Context object is already bound")]
    ContextObjectAlreadyBound,

    /// The transport has not become the root object yet
    #[error("Transport is not listening")]
    NotListening,

    /// Drain was requested on a descriptor this transport does not own
    #[error("Descriptor {0} does not belong to this transport")]
    UnknownDescriptor(RawFd),

    /// The peer answered with an error reply
    #[error("Remote error ({code:?}): {message}")]
    Remote { code: ReplyCode, message: String },

    /// The peer hung up before replying
    #[error("Connection closed before a reply was received")]
    ConnectionClosed,
}
