//! Write half of the active session.

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::LinkError;

/// Write half plus the token of the session it belongs to.
///
/// Lives in the manager's writer slot while the session is up. Cancelling
/// the token ends the session.
pub(crate) struct SessionWriter {
    half: OwnedWriteHalf,
    session: CancellationToken,
}

impl SessionWriter {
    pub(crate) fn new(half: OwnedWriteHalf, session: CancellationToken) -> Self {
        Self { half, session }
    }

    /// Writes the whole payload unless the session ends first.
    pub(crate) async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let Self { half, session } = self;
        tokio::select! {
            biased;
            _ = session.cancelled() => Err(LinkError::NotConnected),
            result = async {
                half.write_all(bytes).await?;
                half.flush().await
            } => {
                result?;
                trace!(bytes = bytes.len(), "sent");
                Ok(())
            }
        }
    }

    /// Ends the session this writer belongs to.
    pub(crate) fn end_session(&self) {
        self.session.cancel();
    }

    /// Sends FIN; errors from an already-closed socket are ignored. Later
    /// writes fail.
    pub(crate) async fn shutdown(&mut self) {
        if let Err(e) = self.half.shutdown().await {
            debug!(error = %e, "shutdown of write half failed");
        }
    }

    pub(crate) async fn close(mut self) {
        self.shutdown().await;
    }
}
