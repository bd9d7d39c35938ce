//! Linux `epoll` poller.
//!
//! Descriptors are registered without `EPOLLET`, so readiness is
//! level-triggered: a descriptor left readable by its handler is reported
//! again by the next `epoll_wait`.

use super::{timeout_millis, Poller, Token};
use crate::source::Interest;
use libc::{
    epoll_create1, epoll_ctl, epoll_event, epoll_wait, EPOLLIN, EPOLLOUT, EPOLL_CLOEXEC,
    EPOLL_CTL_ADD, EPOLL_CTL_DEL,
};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

const EVENT_CAPACITY: usize = 16;

pub struct EpollPoller {
    epoll: OwnedFd,
    events: Vec<epoll_event>,
}

impl EpollPoller {
    pub fn new() -> io::Result<Self> {
        // SAFETY: plain syscall, result checked below.
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            // SAFETY: `epoll` is a freshly created descriptor nobody else owns.
            epoll: unsafe { OwnedFd::from_raw_fd(epoll) },
            events: Vec::with_capacity(EVENT_CAPACITY),
        })
    }
}

impl Poller for EpollPoller {
    fn register(&mut self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        let mut flags = 0;
        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: token as u64,
        };

        // SAFETY: `event` outlives the call; the kernel copies it.
        let rc = unsafe { epoll_ctl(self.epoll.as_raw_fd(), EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        // SAFETY: a null event is accepted for EPOLL_CTL_DEL since Linux 2.6.9.
        let rc = unsafe {
            epoll_ctl(
                self.epoll.as_raw_fd(),
                EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn wait(&mut self, ready: &mut Vec<Token>, timeout: Option<Duration>) -> io::Result<()> {
        self.events.clear();

        // SAFETY: the buffer has room for `capacity` events and the kernel
        // writes at most that many.
        let n = unsafe {
            epoll_wait(
                self.epoll.as_raw_fd(),
                self.events.as_mut_ptr(),
                self.events.capacity() as libc::c_int,
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

        // SAFETY: the kernel initialised the first `n` entries.
        unsafe { self.events.set_len(n as usize) };

        for event in &self.events {
            let token = event.u64;
            ready.push(token as Token);
        }
        Ok(())
    }
}
