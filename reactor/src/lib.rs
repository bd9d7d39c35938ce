//! # Reactor
//!
//! A single-threaded, level-triggered event multiplexer.
//!
//! ## Philosophy
//!
//! - **One thread**: Handlers run on the thread that calls [`Reactor::run`]; the reactor
//!   never spawns threads and never re-enters a handler.
//! - **Level-triggered**: A source that is still ready after its handler returns is reported
//!   again on the next wake. Nothing is coalesced across wakes.
//! - **Pluggable bottom layer**: The multiplexing primitive is a [`Poller`] (epoll, `poll(2)`,
//!   or the deterministic [`sim::SimPoller`]); the things being waited on are [`EventSource`]s
//!   (a raw descriptor, a timerfd, or a deadline timer driven by the poll timeout).
//!
//! ## Example
//!
//! ```
//! use reactor::sim::SimPoller;
//! use reactor::{Disposition, IntervalTimer, Reactor, ReadyEvent};
//! use std::time::Duration;
//!
//! let (poller, sim) = SimPoller::new();
//! let mut reactor = Reactor::new(poller);
//!
//! let handle = reactor
//!     .add_source(
//!         Box::new(IntervalTimer::new(Duration::from_secs(5))),
//!         Box::new(|_event: ReadyEvent| Disposition::Continue),
//!     )
//!     .unwrap();
//!
//! sim.signal(handle);
//! assert_eq!(reactor.turn(None).unwrap(), 1);
//! ```

mod core;
pub mod error;
pub mod poller;
pub mod sim;
pub mod source;
#[cfg(target_os = "linux")]
pub mod timerfd;

pub use crate::core::{Disposition, Reactor, ReadyEvent, ReadyHandler, RegistrationHandle};
pub use error::{AckError, ReactorError};
pub use poller::{PlatformPoller, PollPoller, Poller, Token};
#[cfg(target_os = "linux")]
pub use poller::EpollPoller;
pub use source::{DescriptorSource, EventSource, Interest, IntervalTimer, Registration, SourceKind};
#[cfg(target_os = "linux")]
pub use timerfd::TimerFd;
