//! Public types for the connection manager.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::TextCodec;
use crate::error::LinkError;
use crate::{CONNECT_TIMEOUT, PROBE_TIMEOUT, READ_BUFFER_SIZE, RETRY_INTERVAL};

/// Whether an envelope carries server data or an operational failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Message,
    Error,
}

/// A message or failure report delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub text: String,
}

impl Envelope {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Message,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == EnvelopeKind::Error
    }
}

/// State of the reconnect supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; the supervisor waits for its next tick.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A session is active and the read loop is running.
    Connected,
    /// Stopped explicitly. Only [`start`](crate::ConnectionManager::start) leaves this state.
    Stopped,
}

/// Validated server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    host: String,
    port: u16,
}

impl ConnectionTarget {
    /// Validates caller input. `port` is taken wide so out-of-range values
    /// are reported instead of silently truncated.
    pub fn new(host: &str, port: u32) -> Result<Self, LinkError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(LinkError::InvalidInput("host is empty".into()));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(LinkError::InvalidInput(format!(
                "host contains whitespace: {host:?}"
            )));
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| LinkError::InvalidInput(format!("port {port} is outside 1-65535")))?;

        // Bare IPv6 literals need brackets to survive "host:port" formatting.
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Timeouts, retry cadence and code page of a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
    /// Fixed interval between connect attempts; there is no backoff.
    pub retry_interval: Duration,
    pub read_buffer_size: usize,
    pub codec: TextCodec,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            probe_timeout: PROBE_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            retry_interval: RETRY_INTERVAL,
            read_buffer_size: READ_BUFFER_SIZE,
            codec: TextCodec::default(),
        }
    }
}
