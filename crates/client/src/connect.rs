//! Socket establishment shared by the probe and the supervisor.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::LinkError;
use crate::types::ConnectionTarget;

/// Resolves and connects to `target` within `timeout`.
///
/// Every resolved address is tried in order; the first that accepts wins.
/// On any failure the partially opened socket is dropped before returning.
pub(crate) async fn open(
    target: &ConnectionTarget,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<TcpStream, LinkError> {
    bounded(timeout, cancel, async {
        let addrs = tokio::net::lookup_host((target.host(), target.port()))
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::InvalidInput => LinkError::InvalidInput(e.to_string()),
                _ => LinkError::Unreachable(e.to_string()),
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    debug!(%addr, "socket connected");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(LinkError::from_connect(e));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            LinkError::Unreachable(format!("no addresses resolved for {target}"))
        }))
    })
    .await
}

/// Races `fut` against a deadline and a cancellation token.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, LinkError>
where
    F: Future<Output = Result<T, LinkError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LinkError::Cancelled),
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(LinkError::Timeout),
        },
    }
}
