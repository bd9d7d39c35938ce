//! Unix-domain-socket transport driver
//!
//! Each connection carries exactly one transaction: the client writes one
//! JSON line, the driver answers with one JSON line and closes.

use crate::driver::{CallRestriction, Transport};
use crate::endpoint::EndpointRef;
use crate::error::TransportError;
use crate::message::{Reply, ReplyCode, Transaction, WIRE_VERSION};
use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(250);

/// Longest request a client may send, newline excluded.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Transport driver listening on a well-known socket path.
///
/// Owning the path is what makes a process the root object: clients find
/// the context manager by connecting to it.
pub struct UnixSocketTransport {
    path: PathBuf,
    request_timeout: Duration,
    listener: RefCell<Option<UnixListener>>,
    context: RefCell<Option<EndpointRef>>,
    restriction: Cell<CallRestriction>,
}

impl UnixSocketTransport {
    /// Creates a driver for `path`. Nothing is bound until
    /// [`Transport::become_root_object`] is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            listener: RefCell::new(None),
            context: RefCell::new(None),
            restriction: Cell::new(CallRestriction::None),
        }
    }

    /// Bounds how long a connected client may take to send its request or
    /// receive its reply.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.request_timeout = timeout;
        }
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn call_restriction(&self) -> CallRestriction {
        self.restriction.get()
    }

    fn bind(&self) -> Result<UnixListener, TransportError> {
        match fs::symlink_metadata(&self.path) {
            Ok(metadata) => {
                if !metadata.file_type().is_socket() {
                    return Err(TransportError::NotASocket(self.path.clone()));
                }
                if UnixStream::connect(&self.path).is_ok() {
                    return Err(TransportError::AddressInUse(self.path.clone()));
                }
                debug!(path = %self.path.display(), "Removing stale socket");
                fs::remove_file(&self.path)?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.path)?;
        listener.set_nonblocking(true)?;
        Ok(listener)
    }

    fn serve(&self, stream: UnixStream) -> Result<(), TransportError> {
        stream.set_nonblocking(false)?;
        let deadline = Instant::now() + self.request_timeout;

        let Some(line) = read_request(&stream, deadline)? else {
            debug!("Client hung up without sending a transaction");
            return Ok(());
        };

        let reply = self.dispatch(&line);
        let mut encoded = serde_json::to_string(&reply)?;
        encoded.push('\n');
        stream.set_write_timeout(Some(self.request_timeout))?;
        (&stream).write_all(encoded.as_bytes())?;
        Ok(())
    }

    fn dispatch(&self, line: &str) -> Reply {
        let transaction: Transaction = match serde_json::from_str(line.trim_end()) {
            Ok(transaction) => transaction,
            Err(e) => return Reply::error(ReplyCode::BadRequest, e.to_string()),
        };
        if !transaction.version.is_compatible_with(&WIRE_VERSION) {
            return Reply::error(
                ReplyCode::UnsupportedVersion,
                format!("expected {}, got {}", WIRE_VERSION, transaction.version),
            );
        }

        // Clone out of the cell so the context object may re-enter the driver.
        let context = self.context.borrow().clone();
        match context {
            Some(context) => context.transact(&transaction.body),
            None => Reply::error(ReplyCode::NoContextObject, "no context object bound"),
        }
    }
}

/// Reads one newline-terminated request. The whole read shares a single
/// deadline, and a request longer than [`MAX_REQUEST_BYTES`] is refused.
fn read_request(stream: &UnixStream, deadline: Instant) -> Result<Option<String>, TransportError> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::RequestTimedOut);
        }
        stream.set_read_timeout(Some(remaining))?;

        let read = match (&*stream).read(&mut chunk) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Err(TransportError::RequestTimedOut)
            }
            Err(e) => return Err(e.into()),
        };
        if read == 0 {
            break;
        }

        request.extend_from_slice(&chunk[..read]);
        if let Some(end) = request.iter().position(|&b| b == b'\n') {
            request.truncate(end);
            break;
        }
        if request.len() > MAX_REQUEST_BYTES {
            return Err(TransportError::RequestTooLarge(MAX_REQUEST_BYTES));
        }
    }

    if request.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&request).into_owned()))
}

impl Transport for UnixSocketTransport {
    fn set_call_restriction(&self, restriction: CallRestriction) -> Result<(), TransportError> {
        // This driver only answers; it never originates calls, so every
        // restriction is trivially satisfied.
        self.restriction.set(restriction);
        debug!(%restriction, "Call restriction configured");
        Ok(())
    }

    fn bind_context_object(&self, endpoint: EndpointRef) -> Result<(), TransportError> {
        let mut context = self.context.borrow_mut();
        if context.is_some() {
            return Err(TransportError::ContextObjectAlreadyBound);
        }
        debug!(id = %endpoint.id(), interface = endpoint.interface(), "Context object bound");
        *context = Some(endpoint);
        Ok(())
    }

    fn become_root_object(&self) -> bool {
        if self.listener.borrow().is_some() {
            return true;
        }
        match self.bind() {
            Ok(listener) => {
                info!(path = %self.path.display(), "Listening as root object");
                *self.listener.borrow_mut() = Some(listener);
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to become root object");
                false
            }
        }
    }

    fn serves_without_root(&self) -> bool {
        // The listener is the readiness descriptor, and only the root owns it.
        false
    }

    fn open_readiness_descriptor(&self) -> Result<RawFd, TransportError> {
        self.listener
            .borrow()
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or(TransportError::NotListening)
    }

    fn drain_once(&self, fd: RawFd) -> Result<(), TransportError> {
        let accepted = {
            let listener = self.listener.borrow();
            let listener = listener.as_ref().ok_or(TransportError::NotListening)?;
            if listener.as_raw_fd() != fd {
                return Err(TransportError::UnknownDescriptor(fd));
            }
            listener.accept()
        };

        match accepted {
            Ok((stream, _)) => self.serve(stream),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for UnixSocketTransport {
    fn drop(&mut self) {
        if self.listener.get_mut().take().is_some() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use core_types::EndpointId;
    use serde_json::{json, Value};
    use std::io::Read;
    use std::rc::Rc;

    struct Echo(EndpointId);

    impl Endpoint for Echo {
        fn id(&self) -> EndpointId {
            self.0
        }

        fn interface(&self) -> &str {
            "test.echo@1.0::IEcho"
        }

        fn transact(&self, body: &Value) -> Reply {
            Reply::ok(body)
        }
    }

    fn send_raw(path: &Path, line: &str) -> UnixStream {
        let mut stream = UnixStream::connect(path).unwrap();
        stream.write_all(line.as_bytes()).unwrap();
        stream
    }

    fn read_reply(mut stream: UnixStream) -> Reply {
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        serde_json::from_str(text.trim_end()).unwrap()
    }

    #[test]
    fn test_descriptor_requires_root() {
        let dir = tempfile::tempdir().unwrap();
        let transport = UnixSocketTransport::new(dir.path().join("ctx.sock"));
        assert!(matches!(
            transport.open_readiness_descriptor(),
            Err(TransportError::NotListening)
        ));
        assert!(transport.become_root_object());
        assert!(transport.open_readiness_descriptor().is_ok());
    }

    #[test]
    fn test_second_manager_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        let first = UnixSocketTransport::new(&path);
        assert!(first.become_root_object());

        let second = UnixSocketTransport::new(&path);
        assert!(!second.become_root_object());
    }

    #[test]
    fn test_stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let transport = UnixSocketTransport::new(&path);
        assert!(transport.become_root_object());
    }

    #[test]
    fn test_regular_file_at_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("important.conf");
        fs::write(&path, "precious").unwrap();

        let transport = UnixSocketTransport::new(&path);
        assert!(matches!(transport.bind(), Err(TransportError::NotASocket(_))));
        assert!(!transport.become_root_object());
        assert_eq!(fs::read_to_string(&path).unwrap(), "precious");
    }

    #[test]
    fn test_only_root_serves() {
        let transport = UnixSocketTransport::new("/nonexistent/ctx.sock");
        assert!(!transport.serves_without_root());
    }

    #[test]
    fn test_trickling_client_is_dropped_at_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        let transport =
            UnixSocketTransport::new(&path).with_request_timeout(Duration::from_millis(100));
        transport
            .bind_context_object(Rc::new(Echo(EndpointId::new())))
            .unwrap();
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        let trickle = std::thread::spawn(move || {
            for _ in 0..20 {
                if client.write_all(b"x").is_err() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        });

        let started = Instant::now();
        let result = transport.drain_once(fd);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(matches!(result, Err(TransportError::RequestTimedOut)));
        trickle.join().unwrap();
    }

    #[test]
    fn test_oversized_request_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        let transport =
            UnixSocketTransport::new(&path).with_request_timeout(Duration::from_secs(5));
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        let flood = std::thread::spawn(move || {
            let _ = client.write_all(&vec![b'a'; 2 * MAX_REQUEST_BYTES]);
        });

        assert!(matches!(
            transport.drain_once(fd),
            Err(TransportError::RequestTooLarge(MAX_REQUEST_BYTES))
        ));
        flood.join().unwrap();
    }

    #[test]
    fn test_drain_idle_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let transport = UnixSocketTransport::new(dir.path().join("ctx.sock"));
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        transport.drain_once(fd).unwrap();
        transport.drain_once(fd).unwrap();
    }

    #[test]
    fn test_drain_rejects_foreign_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let transport = UnixSocketTransport::new(dir.path().join("ctx.sock"));
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        assert!(matches!(
            transport.drain_once(fd + 1000),
            Err(TransportError::UnknownDescriptor(_))
        ));
    }

    #[test]
    fn test_drain_dispatches_to_context_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        let transport = UnixSocketTransport::new(&path);
        transport
            .bind_context_object(Rc::new(Echo(EndpointId::new())))
            .unwrap();
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        let mut line = serde_json::to_string(&Transaction::new(json!({"hello": 1}))).unwrap();
        line.push('\n');
        let stream = send_raw(&path, &line);
        transport.drain_once(fd).unwrap();

        assert_eq!(read_reply(stream), Reply::ok(&json!({"hello": 1})));
    }

    #[test]
    fn test_drain_without_context_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        let transport = UnixSocketTransport::new(&path);
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        let stream = send_raw(&path, "{\"version\":{\"major\":1,\"minor\":0},\"body\":null}\n");
        transport.drain_once(fd).unwrap();

        assert!(matches!(
            read_reply(stream),
            Reply::Error {
                code: ReplyCode::NoContextObject,
                ..
            }
        ));
    }

    #[test]
    fn test_incompatible_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        let transport = UnixSocketTransport::new(&path);
        transport
            .bind_context_object(Rc::new(Echo(EndpointId::new())))
            .unwrap();
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        let stream = send_raw(&path, "{\"version\":{\"major\":2,\"minor\":0},\"body\":1}\n");
        transport.drain_once(fd).unwrap();

        assert!(matches!(
            read_reply(stream),
            Reply::Error {
                code: ReplyCode::UnsupportedVersion,
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        let transport = UnixSocketTransport::new(&path);
        assert!(transport.become_root_object());
        let fd = transport.open_readiness_descriptor().unwrap();

        let stream = send_raw(&path, "not json\n");
        transport.drain_once(fd).unwrap();

        assert!(matches!(
            read_reply(stream),
            Reply::Error {
                code: ReplyCode::BadRequest,
                ..
            }
        ));
    }

    #[test]
    fn test_context_object_binds_once() {
        let transport = UnixSocketTransport::new("/nonexistent/ctx.sock");
        transport
            .bind_context_object(Rc::new(Echo(EndpointId::new())))
            .unwrap();
        assert!(matches!(
            transport.bind_context_object(Rc::new(Echo(EndpointId::new()))),
            Err(TransportError::ContextObjectAlreadyBound)
        ));
    }

    #[test]
    fn test_socket_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.sock");
        {
            let transport = UnixSocketTransport::new(&path);
            assert!(transport.become_root_object());
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
