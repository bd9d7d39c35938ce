//! Readiness multiplexing primitives.
//!
//! The concrete platform implementation is selected at compile time.

use crate::source::Interest;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

#[cfg(target_os = "linux")]
mod epoll;
mod poll;

#[cfg(target_os = "linux")]
pub use epoll::EpollPoller;
pub use poll::PollPoller;

#[cfg(target_os = "linux")]
pub type PlatformPoller = EpollPoller;

#[cfg(not(target_os = "linux"))]
pub type PlatformPoller = PollPoller;

/// Identifies a registered source inside the reactor.
pub type Token = usize;

/// A level-triggered readiness multiplexer.
pub trait Poller {
    /// Starts watching `fd`. Registering the same descriptor twice fails.
    fn register(&mut self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()>;

    fn deregister(&mut self, fd: RawFd) -> io::Result<()>;

    /// Blocks until at least one watched descriptor is ready or `timeout`
    /// elapses (`None` waits forever), then appends the ready tokens.
    ///
    /// An interrupted wait returns `Ok` with nothing appended.
    fn wait(&mut self, ready: &mut Vec<Token>, timeout: Option<Duration>) -> io::Result<()>;
}

/// Converts a timeout to poll-style milliseconds, rounding up so a short
/// deadline does not turn into a busy loop.
pub(crate) fn timeout_millis(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(timeout) => {
            let millis = timeout.as_nanos().div_ceil(1_000_000);
            millis.min(libc::c_int::MAX as u128) as libc::c_int
        }
    }
}
