//! Best-effort HTTP telemetry report.
//!
//! One call to [`Reporter::send`] makes at most one network attempt:
//! open → connect+send → read the first [`RESPONSE_WINDOW`] bytes → close.
//! The socket is closed on every path.  The outcome is coded, never
//! thrown:
//!
//! | Code  | Meaning                                   |
//! |-------|-------------------------------------------|
//! | `ntc` | not connected, nothing attempted          |
//! | `ook` | response carried `200` and `OK`           |
//! | `nok` | response received without that marker     |
//! | `er1` | bad URL, resolve or socket open failed    |
//! | `er2` | connect or send failed                    |
//! | `er3` | receive failed                            |
//!
//! Retrying is the control loop's business, not ours.

use core::fmt::Write as _;

use log::{debug, info, warn};

use crate::app::ports::{HttpSocket, HttpTransport};

/// Only the status line matters; the body is never read.
pub const RESPONSE_WINDOW: usize = 100;

const REQUEST_CAPACITY: usize = 512;
const DEFAULT_HTTP_PORT: u16 = 80;

/// Closed vocabulary of report outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    NotConnected,
    Ok,
    NotOk,
    OpenFailed,
    SendFailed,
    ReceiveFailed,
}

impl ReportStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConnected => "ntc",
            Self::Ok => "ook",
            Self::NotOk => "nok",
            Self::OpenFailed => "er1",
            Self::SendFailed => "er2",
            Self::ReceiveFailed => "er3",
        }
    }
}

impl core::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── URL handling ──────────────────────────────────────────────

/// `http://host[:port][/path][?query]` split into parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Everything after the authority.  Starts with `/`, or with `?` when
    /// the URL has a query but no path.
    pub path: &'a str,
}

impl<'a> Endpoint<'a> {
    /// Parse a plain-HTTP URL.  Returns `None` for other schemes, an empty
    /// host or an unparsable port.
    pub fn parse(url: &'a str) -> Option<Self> {
        let rest = url.strip_prefix("http://")?;
        let (authority, path) = match rest.find(['/', '?']) {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => (h, p.parse().ok()?),
            None => (authority, DEFAULT_HTTP_PORT),
        };
        if host.is_empty() {
            return None;
        }
        Some(Self { host, port, path })
    }
}

/// Unreserved characters pass through; everything else becomes `%XX`.
fn push_encoded<const N: usize>(out: &mut heapless::String<N>, value: &str) -> core::fmt::Result {
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char).map_err(|_| core::fmt::Error)?;
        } else {
            write!(out, "%{:02X}", b)?;
        }
    }
    Ok(())
}

/// Build the request: API key first, then `field1..fieldN` in order.
pub fn build_request(
    endpoint: &Endpoint<'_>,
    api_key: &str,
    fields: &[f32],
) -> Result<heapless::String<REQUEST_CAPACITY>, core::fmt::Error> {
    let mut req = heapless::String::new();
    let root = if endpoint.path.starts_with('?') { "/" } else { "" };
    let sep = if endpoint.path.contains('?') { '&' } else { '?' };
    write!(req, "GET {}{}{}api_key=", root, endpoint.path, sep)?;
    push_encoded(&mut req, api_key)?;

    let mut num: heapless::String<24> = heapless::String::new();
    for (i, value) in fields.iter().enumerate() {
        num.clear();
        write!(num, "{}", value)?;
        write!(req, "&field{}=", i + 1)?;
        push_encoded(&mut req, &num)?;
    }

    write!(
        req,
        " HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
        endpoint.host
    )?;
    Ok(req)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Success needs both markers somewhere in the window.
pub fn classify_response(window: &[u8]) -> ReportStatus {
    if contains(window, b"200") && contains(window, b"OK") {
        ReportStatus::Ok
    } else {
        ReportStatus::NotOk
    }
}

// ── Reporter ──────────────────────────────────────────────────

/// Closes the socket when dropped, whichever step returned early.
struct SocketGuard<S: HttpSocket>(S);

impl<S: HttpSocket> Drop for SocketGuard<S> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Fire-and-forget telemetry sender.
pub struct Reporter<T> {
    transport: T,
    last_status: Option<ReportStatus>,
}

impl<T: HttpTransport> Reporter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            last_status: None,
        }
    }

    /// Send one report.  `connected == false` short-circuits to `ntc`
    /// without touching the transport.
    pub fn send(
        &mut self,
        connected: bool,
        base_url: &str,
        api_key: &str,
        fields: &[f32],
    ) -> ReportStatus {
        let status = self.attempt(connected, base_url, api_key, fields);
        match status {
            ReportStatus::Ok => info!("Report: accepted ({} fields)", fields.len()),
            ReportStatus::NotConnected => debug!("Report: skipped, not connected"),
            other => warn!("Report: failed ({})", other),
        }
        self.last_status = Some(status);
        status
    }

    fn attempt(
        &mut self,
        connected: bool,
        base_url: &str,
        api_key: &str,
        fields: &[f32],
    ) -> ReportStatus {
        if !connected {
            return ReportStatus::NotConnected;
        }

        let Some(endpoint) = Endpoint::parse(base_url) else {
            warn!("Report: unusable URL '{}'", base_url);
            return ReportStatus::OpenFailed;
        };
        let Ok(request) = build_request(&endpoint, api_key, fields) else {
            warn!("Report: request exceeds {} bytes", REQUEST_CAPACITY);
            return ReportStatus::OpenFailed;
        };

        let socket = match self.transport.open(endpoint.host, endpoint.port) {
            Ok(s) => s,
            Err(e) => {
                debug!("Report: open {}:{} failed: {}", endpoint.host, endpoint.port, e);
                return ReportStatus::OpenFailed;
            }
        };
        let mut guard = SocketGuard(socket);

        if let Err(e) = guard.0.connect_and_send(request.as_bytes()) {
            debug!("Report: send failed: {}", e);
            return ReportStatus::SendFailed;
        }

        let mut window = [0u8; RESPONSE_WINDOW];
        let mut filled = 0;
        while filled < RESPONSE_WINDOW {
            match guard.0.receive(&mut window[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                // Partial data is still worth classifying.
                Err(_) if filled > 0 => break,
                Err(e) => {
                    debug!("Report: receive failed: {}", e);
                    return ReportStatus::ReceiveFailed;
                }
            }
        }

        classify_response(&window[..filled])
    }

    pub fn last_status(&self) -> Option<ReportStatus> {
        self.last_status
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
