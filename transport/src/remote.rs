//! Endpoints hosted by other processes

use crate::endpoint::Endpoint;
use core_types::EndpointId;

/// An endpoint registered by a client process.
///
/// The context manager cannot call into it; it only tracks whether the
/// hosting process is still around so the liveness sweep can reap it.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    id: EndpointId,
    interface: String,
    pid: u32,
}

impl RemoteEndpoint {
    pub fn new(interface: impl Into<String>, pid: u32) -> Self {
        Self {
            id: EndpointId::new(),
            interface: interface.into(),
            pid,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Endpoint for RemoteEndpoint {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn interface(&self) -> &str {
        &self.interface
    }

    fn is_alive(&self) -> bool {
        process_exists(self.pid)
    }

    fn owner_pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

/// Probes a pid with signal 0. `EPERM` still means the process exists.
fn process_exists(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs permission and existence checks only.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_current_process_is_alive() {
        let endpoint = RemoteEndpoint::new("test.remote@1.0::IRemote", std::process::id());
        assert!(endpoint.is_alive());
        assert_eq!(endpoint.owner_pid(), Some(std::process::id()));
    }

    #[test]
    fn test_reaped_child_is_dead() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let endpoint = RemoteEndpoint::new("test.remote@1.0::IRemote", pid);
        assert!(!endpoint.is_alive());
    }

    #[test]
    fn test_invalid_pid_is_dead() {
        assert!(!RemoteEndpoint::new("x", 0).is_alive());
        assert!(!RemoteEndpoint::new("x", u32::MAX).is_alive());
    }
}
