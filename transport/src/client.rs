//! Blocking client for the Unix socket transport

use crate::error::TransportError;
use crate::message::{Reply, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

/// Sends one transaction per connection to a context manager.
#[derive(Debug, Clone)]
pub struct TransportClient {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl TransportClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: None,
        }
    }

    /// Fails calls that take longer than `timeout` to send or answer.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    /// Sends a raw transaction and returns the reply.
    pub fn transact(&self, transaction: &Transaction) -> Result<Reply, TransportError> {
        let mut stream = UnixStream::connect(&self.path)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        let mut line = serde_json::to_string(transaction)?;
        line.push('\n');
        stream.write_all(line.as_bytes())?;

        let mut answer = String::new();
        if BufReader::new(&stream).read_line(&mut answer)? == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        Ok(serde_json::from_str(answer.trim_end())?)
    }

    /// Sends a typed request to the context object and decodes the answer.
    pub fn call<Req, Resp>(&self, request: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let transaction = Transaction::from_request(request)?;
        self.transact(&transaction)?.into_result()
    }
}
