//! One-shot reachability check, independent of any persistent session.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::PROBE_TIMEOUT;
use crate::connect;
use crate::error::LinkError;
use crate::types::{ConnectionTarget, Envelope};

pub(crate) const PROBE_OK: &str = "connection possible";

/// Checks whether `host:port` accepts TCP connections within two seconds.
///
/// Never fails: the outcome is reported as an [`Envelope`].
pub async fn probe(host: &str, port: u32) -> Envelope {
    probe_with_timeout(host, port, PROBE_TIMEOUT).await
}

/// Like [`probe`] with a caller-chosen bound.
pub async fn probe_with_timeout(host: &str, port: u32, timeout: Duration) -> Envelope {
    match check(host, port, timeout).await {
        Ok(()) => {
            info!(host, port, "probe succeeded");
            Envelope::message(PROBE_OK)
        }
        Err(e) => {
            info!(host, port, error = %e, "probe failed");
            Envelope::error(failure_text(&e))
        }
    }
}

async fn check(host: &str, port: u32, timeout: Duration) -> Result<(), LinkError> {
    let target = ConnectionTarget::new(host, port)?;
    // A private token: the probe must not be cancelled by a session stop.
    let stream = connect::open(&target, timeout, &CancellationToken::new()).await?;
    debug!(server = %target, "probe socket opened, closing");
    drop(stream);
    Ok(())
}

fn failure_text(e: &LinkError) -> String {
    match e {
        LinkError::Timeout => "connection failed: timeout".into(),
        LinkError::Unreachable(_) => "connection check failed: host unreachable".into(),
        LinkError::InvalidInput(_) => "connection check failed: invalid address or port".into(),
        other => format!("connection check failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnvelopeKind;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn probe_live_listener_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let env = probe("127.0.0.1", port.into()).await;
        assert_eq!(env, Envelope::message("connection possible"));
    }

    #[tokio::test]
    async fn probe_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let env = probe("127.0.0.1", port.into()).await;
        assert_eq!(
            env,
            Envelope::error("connection check failed: host unreachable")
        );
    }

    #[tokio::test]
    async fn probe_empty_address_is_invalid() {
        let env = probe("", 0).await;
        assert_eq!(
            env,
            Envelope::error("connection check failed: invalid address or port")
        );
    }

    #[tokio::test]
    async fn probe_out_of_range_port_is_invalid() {
        let env = probe("127.0.0.1", 70_000).await;
        assert_eq!(
            env,
            Envelope::error("connection check failed: invalid address or port")
        );
    }

    #[tokio::test]
    async fn probe_unknown_host_fails_within_bound() {
        let started = std::time::Instant::now();
        let env = probe("host.invalid", 8080).await;
        assert_eq!(env.kind, EnvelopeKind::Error);
        assert!(
            env.text == "connection check failed: host unreachable"
                || env.text == "connection failed: timeout",
            "unexpected text: {}",
            env.text
        );
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn failure_texts() {
        assert_eq!(failure_text(&LinkError::Timeout), "connection failed: timeout");
        assert_eq!(
            failure_text(&LinkError::Io(std::io::Error::other("disk on fire"))),
            "connection check failed: I/O error: disk on fire"
        );
    }
}
