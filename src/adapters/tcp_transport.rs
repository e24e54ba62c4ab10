//! Plain TCP transport for the HTTP reporter.
//!
//! Implements [`HttpTransport`] on `std::net`, which ESP-IDF backs with
//! lwIP, so the same code runs on the board and on the host.
//!
//! ## Mapping to report codes
//!
//! | Step                          | Error                        | Code  |
//! |-------------------------------|------------------------------|-------|
//! | resolve host                  | [`TransportError::Resolve`]  | `er1` |
//! | connect, write request        | [`TransportError::Connect`] / [`TransportError::Send`] | `er2` |
//! | read response                 | [`TransportError::Receive`]  | `er3` |
//!
//! Every blocking step is bounded by the configured socket timeout, and
//! all reads after the request share one budget of that length, so a peer
//! trickling single bytes cannot hold the loop for more than one timeout.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::app::ports::{HttpSocket, HttpTransport, TransportError};

/// Opens one short-lived TCP stream per report.
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(timeout_secs: u32) -> Self {
        Self {
            timeout: Duration::from_secs(u64::from(timeout_secs.max(1))),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HttpTransport for TcpTransport {
    type Socket = TcpSocket;

    fn open(&mut self, host: &str, port: u16) -> Result<TcpSocket, TransportError> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                warn!("TCP: resolve '{}' failed: {}", host, e);
                TransportError::Resolve
            })?
            .find(SocketAddr::is_ipv4)
            .ok_or(TransportError::Resolve)?;
        debug!("TCP: {} resolved to {}", host, addr);
        Ok(TcpSocket {
            addr,
            timeout: self.timeout,
            stream: None,
            read_deadline: None,
        })
    }
}

/// A resolved peer plus, once connected, the stream.
pub struct TcpSocket {
    addr: SocketAddr,
    timeout: Duration,
    stream: Option<TcpStream>,
    /// Set once the request is out; reads fail at and after this instant.
    read_deadline: Option<Instant>,
}

impl TcpSocket {
    pub fn peer(&self) -> SocketAddr {
        self.addr
    }
}

impl HttpSocket for TcpSocket {
    fn connect_and_send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        let mut stream = TcpStream::connect_timeout(&self.addr, self.timeout).map_err(|e| {
            warn!("TCP: connect {} failed: {}", self.addr, e);
            TransportError::Connect
        })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|_| TransportError::Connect)?;
        stream.write_all(request).map_err(|e| {
            warn!("TCP: send to {} failed: {}", self.addr, e);
            TransportError::Send
        })?;
        self.stream = Some(stream);
        self.read_deadline = Some(Instant::now() + self.timeout);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Receive)?;
        let remaining = self
            .read_deadline
            .map_or(Duration::ZERO, |d| d.saturating_duration_since(Instant::now()));
        if remaining.is_zero() {
            warn!("TCP: receive from {} out of time", self.addr);
            return Err(TransportError::Receive);
        }
        stream.set_read_timeout(Some(remaining)).map_err(|_| TransportError::Receive)?;
        stream.read(buf).map_err(|e| {
            warn!("TCP: receive from {} failed: {}", self.addr, e);
            TransportError::Receive
        })
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
