//! Event sources the reactor can wait on.

use crate::error::AckError;
use std::os::fd::RawFd;
use std::time::Duration;

/// Which bottom-layer mechanism a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A descriptor whose readiness is owned by someone else
    Descriptor,
    /// A periodic timer
    Timer,
}

/// Readiness a descriptor is watched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub const READABLE: Interest = Interest {
        read: true,
        write: false,
    };

    pub const WRITABLE: Interest = Interest {
        read: false,
        write: true,
    };
}

/// How a source is wired into the reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Watched by the poller
    Descriptor { fd: RawFd, interest: Interest },
    /// Driven by the reactor's own deadline queue through the poll timeout
    Interval {
        period: Duration,
        first_fire: Duration,
    },
}

/// Something the reactor can wait on.
pub trait EventSource {
    fn kind(&self) -> SourceKind;

    fn registration(&self) -> Registration;

    /// Consumes the readiness that caused the current wake.
    ///
    /// Called once per dispatch, right before the handler. The result is
    /// handed to the handler untouched; a failure never suppresses it.
    /// Returns the number of events being acknowledged.
    fn acknowledge(&mut self) -> Result<u64, AckError> {
        Ok(1)
    }
}

/// A descriptor owned elsewhere; readiness is consumed by the handler.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorSource {
    fd: RawFd,
    interest: Interest,
}

impl DescriptorSource {
    pub fn new(fd: RawFd, interest: Interest) -> Self {
        Self { fd, interest }
    }

    pub fn readable(fd: RawFd) -> Self {
        Self::new(fd, Interest::READABLE)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl EventSource for DescriptorSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Descriptor
    }

    fn registration(&self) -> Registration {
        Registration::Descriptor {
            fd: self.fd,
            interest: self.interest,
        }
    }
}

/// A periodic timer with no descriptor behind it.
///
/// The reactor keeps its deadline and shortens the poll timeout to meet it,
/// the way a message-loop timer works. Used where timerfd is unavailable.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    period: Duration,
    first_fire: Duration,
}

impl IntervalTimer {
    /// First fire happens one period after registration.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            first_fire: period,
        }
    }

    pub fn with_first_fire(mut self, first_fire: Duration) -> Self {
        self.first_fire = first_fire;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl EventSource for IntervalTimer {
    fn kind(&self) -> SourceKind {
        SourceKind::Timer
    }

    fn registration(&self) -> Registration {
        Registration::Interval {
            period: self.period,
            first_fire: self.first_fire,
        }
    }
}
