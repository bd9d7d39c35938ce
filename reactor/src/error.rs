//! Reactor error types

use crate::source::SourceKind;
use std::io;
use thiserror::Error;

/// Errors raised by the reactor itself.
#[derive(Debug, Error)]
pub enum ReactorError {
    /// The multiplexing primitive refused a source
    #[error("Failed to register {kind:?} source: {source}")]
    Register {
        kind: SourceKind,
        #[source]
        source: io::Error,
    },

    /// An interval timer was created with a zero period
    #[error("Interval timers need a non-zero period")]
    ZeroPeriod,

    /// Blocking for readiness failed
    #[error("Failed to wait for readiness: {0}")]
    Wait(#[source] io::Error),
}

/// Failure consuming a source's readiness before its handler runs.
#[derive(Debug, Error)]
pub enum AckError {
    #[error("Acknowledgement read failed: {0}")]
    Io(#[from] io::Error),

    #[error("Acknowledgement read returned {read} bytes, expected {expected}")]
    ShortRead { read: usize, expected: usize },
}
