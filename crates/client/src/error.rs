//! Error types for the connection manager.

use std::io;

/// Errors produced while probing, connecting, reading or sending.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("timed out")]
    Timeout,

    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("invalid address or port: {0}")]
    InvalidInput(String),

    #[error("connection not established")]
    NotConnected,

    #[error("connection closed by server")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("client is already running")]
    AlreadyRunning,

    #[error("unknown text encoding: {0}")]
    UnknownEncoding(String),
}

impl LinkError {
    /// Classifies an error from resolving or connecting a socket.
    pub(crate) fn from_connect(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::NetworkDown
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::NotFound => Self::Unreachable(e.to_string()),
            io::ErrorKind::InvalidInput => Self::InvalidInput(e.to_string()),
            io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_is_unreachable() {
        let e = LinkError::from_connect(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(matches!(e, LinkError::Unreachable(_)));
    }

    #[test]
    fn os_timeout_is_timeout() {
        let e = LinkError::from_connect(io::Error::from(io::ErrorKind::TimedOut));
        assert!(matches!(e, LinkError::Timeout));
    }

    #[test]
    fn invalid_input_is_kept() {
        let e = LinkError::from_connect(io::Error::new(io::ErrorKind::InvalidInput, "bad"));
        assert!(matches!(e, LinkError::InvalidInput(ref m) if m == "bad"));
    }

    #[test]
    fn other_faults_stay_io() {
        let e = LinkError::from_connect(io::Error::other("weird"));
        assert!(matches!(e, LinkError::Io(_)));
        assert_eq!(e.to_string(), "I/O error: weird");
    }

    #[test]
    fn not_connected_message() {
        assert_eq!(
            LinkError::NotConnected.to_string(),
            "connection not established"
        );
    }
}
