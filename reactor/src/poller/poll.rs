//! Portable `poll(2)` poller.

use super::{timeout_millis, Poller, Token};
use crate::source::Interest;
use libc::{pollfd, POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;
use tracing::warn;

/// `poll(2)` over a flat descriptor list. Level-triggered by construction.
#[derive(Default)]
pub struct PollPoller {
    fds: Vec<pollfd>,
    tokens: Vec<Token>,
}

impl PollPoller {
    /// Never fails; mirrors the epoll constructor.
    pub fn new() -> io::Result<Self> {
        Ok(Self::default())
    }
}

impl Poller for PollPoller {
    fn register(&mut self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        if fd < 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        if self.fds.iter().any(|p| p.fd == fd) {
            return Err(io::Error::from_raw_os_error(libc::EEXIST));
        }

        let mut events = 0;
        if interest.read {
            events |= POLLIN;
        }
        if interest.write {
            events |= POLLOUT;
        }
        self.fds.push(pollfd {
            fd,
            events,
            revents: 0,
        });
        self.tokens.push(token);
        Ok(())
    }

    fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        let index = self
            .fds
            .iter()
            .position(|p| p.fd == fd)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        self.fds.swap_remove(index);
        self.tokens.swap_remove(index);
        Ok(())
    }

    fn wait(&mut self, ready: &mut Vec<Token>, timeout: Option<Duration>) -> io::Result<()> {
        // SAFETY: `fds` is a valid, exclusively borrowed array of `len` entries.
        let n = unsafe {
            libc::poll(
                self.fds.as_mut_ptr(),
                self.fds.len() as libc::nfds_t,
                timeout_millis(timeout),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        for (entry, token) in self.fds.iter_mut().zip(&self.tokens) {
            if entry.revents & POLLNVAL != 0 {
                warn!(fd = entry.fd, token = *token, "Polled descriptor is not open");
            }
            if entry.revents & (entry.events | POLLERR | POLLHUP | POLLNVAL) != 0 {
                ready.push(*token);
            }
            entry.revents = 0;
        }
        Ok(())
    }
}
