//! Periodic timer backed by a Linux timerfd.

use crate::error::AckError;
use crate::source::{EventSource, Interest, Registration, SourceKind};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

const EXPIRATIONS_LEN: usize = mem::size_of::<u64>();

/// A `CLOCK_MONOTONIC` timerfd armed with a fixed interval.
///
/// The descriptor stays readable until its expiration counter is read, so
/// [`EventSource::acknowledge`] must run on every fire.
pub struct TimerFd {
    fd: OwnedFd,
}

impl TimerFd {
    /// Arms a timer firing every `period`, first after `first_fire`.
    ///
    /// A zero `first_fire` would disarm the timer, so it falls back to `period`.
    pub fn new(period: Duration, first_fire: Duration) -> io::Result<Self> {
        if period.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "timer period must be non-zero",
            ));
        }
        let first_fire = if first_fire.is_zero() {
            period
        } else {
            first_fire
        };

        // SAFETY: plain syscall, result checked below.
        let raw = unsafe {
            libc::timerfd_create(
                libc::CLOCK_MONOTONIC,
                libc::TFD_NONBLOCK | libc::TFD_CLOEXEC,
            )
        };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `raw` is a freshly created descriptor nobody else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let setting = libc::itimerspec {
            it_interval: to_timespec(period),
            it_value: to_timespec(first_fire),
        };
        // SAFETY: `setting` is a valid itimerspec; the old value is not requested.
        let rc = unsafe { libc::timerfd_settime(fd.as_raw_fd(), 0, &setting, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { fd })
    }

    /// Periodic timer whose first fire is one period away.
    pub fn periodic(period: Duration) -> io::Result<Self> {
        Self::new(period, period)
    }
}

impl AsRawFd for TimerFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl EventSource for TimerFd {
    fn kind(&self) -> SourceKind {
        SourceKind::Timer
    }

    fn registration(&self) -> Registration {
        Registration::Descriptor {
            fd: self.fd.as_raw_fd(),
            interest: Interest::READABLE,
        }
    }

    fn acknowledge(&mut self) -> Result<u64, AckError> {
        let mut buf = [0u8; EXPIRATIONS_LEN];
        // SAFETY: `buf` is valid for writes of its full length.
        let n = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr().cast(),
                EXPIRATIONS_LEN,
            )
        };
        decode_expirations(n, buf)
    }
}

fn decode_expirations(n: isize, buf: [u8; EXPIRATIONS_LEN]) -> Result<u64, AckError> {
    if n < 0 {
        return Err(AckError::Io(io::Error::last_os_error()));
    }
    let read = n as usize;
    if read != EXPIRATIONS_LEN {
        return Err(AckError::ShortRead {
            read,
            expected: EXPIRATIONS_LEN,
        });
    }
    Ok(u64::from_ne_bytes(buf))
}

fn to_timespec(duration: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    }
}
