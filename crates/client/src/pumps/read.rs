//! Read loop — decodes inbound bytes and emits message envelopes.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::codec::TextCodec;
use crate::error::LinkError;
use crate::events::EventHub;
use crate::types::Envelope;

/// Reads until the session is cancelled, the peer closes, or I/O fails.
///
/// Never retries; the returned error is the exit cause handed to the
/// supervisor.
pub(crate) async fn read_loop<R>(
    mut reader: R,
    codec: TextCodec,
    buffer_size: usize,
    events: EventHub,
    session: CancellationToken,
) -> LinkError
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut decoder = codec.chunk_decoder();

    loop {
        tokio::select! {
            biased;
            _ = session.cancelled() => {
                debug!("read loop cancelled");
                return LinkError::Cancelled;
            }
            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    debug!("peer closed the stream");
                    let rest = decoder.finish();
                    if !rest.is_empty() {
                        events.emit_message(Envelope::message(rest));
                    }
                    return LinkError::Closed;
                }
                Ok(n) => {
                    trace!(bytes = n, "received");
                    let text = decoder.decode_chunk(&buf[..n]);
                    if !text.is_empty() {
                        events.emit_message(Envelope::message(text));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "read failed");
                    return LinkError::Io(e);
                }
            }
        }
    }
}

/// Text of the envelope reported when the read loop exits with `cause`.
pub(crate) fn exit_text(cause: &LinkError) -> String {
    match cause {
        LinkError::Cancelled => "listening for server responses stopped".into(),
        LinkError::Closed => {
            "listening for server responses failed: connection closed by server".into()
        }
        LinkError::Io(e) => format!(
            "listening for server responses failed: server or network unavailable ({e})"
        ),
        other => format!("listening for server responses failed: {other}"),
    }
}
