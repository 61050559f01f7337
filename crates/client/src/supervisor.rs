//! Reconnect supervisor with a fixed retry interval.
//!
//! Contains the shared [`SessionContext`] and the loop that establishes a
//! session, runs its read loop, and re-establishes it after a failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connect;
use crate::error::LinkError;
use crate::events::EventHub;
use crate::pumps::read;
use crate::pumps::write::SessionWriter;
use crate::types::{ClientConfig, ConnectionState, ConnectionTarget, Envelope};

/// Shared state handed to the supervisor task.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) config: ClientConfig,
    pub(crate) events: EventHub,
    pub(crate) writer: Arc<Mutex<Option<SessionWriter>>>,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
}

impl SessionContext {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "state changed");
        }
    }

    /// Installs the session's write half and marks the manager connected.
    /// Both happen under the writer lock so `send` never sees one without
    /// the other.
    async fn install_writer(&self, writer: SessionWriter) {
        let mut slot = self.writer.lock().await;
        *slot = Some(writer);
        self.set_state(ConnectionState::Connected);
    }

    /// Removes and closes the write half, if any.
    pub(crate) async fn release_writer(&self) {
        let writer = {
            let mut slot = self.writer.lock().await;
            let writer = slot.take();
            if writer.is_some() && *self.state.borrow() == ConnectionState::Connected {
                self.set_state(ConnectionState::Disconnected);
            }
            writer
        };
        if let Some(writer) = writer {
            writer.end_session();
            writer.close().await;
        }
    }
}

/// Runs until `cancel` fires. At most one connect attempt or session is in
/// flight at any time: the loop awaits the session's read loop before it
/// ticks again.
pub(crate) async fn run(ctx: SessionContext, target: ConnectionTarget, cancel: CancellationToken) {
    info!(server = %target, "supervisor started");

    loop {
        ctx.set_state(ConnectionState::Connecting);

        match connect::open(&target, ctx.config.connect_timeout, &cancel).await {
            Ok(stream) => {
                let cause = run_session(&ctx, &target, stream, &cancel).await;
                if cancel.is_cancelled() {
                    break;
                }
                warn!(server = %target, error = %cause, "session lost");
                ctx.set_state(ConnectionState::Disconnected);
                ctx.events.emit_status(false);
                ctx.events.emit_message(Envelope::error(read::exit_text(&cause)));
            }
            Err(_) if cancel.is_cancelled() => break,
            Err(e) => {
                warn!(
                    server = %target,
                    error = %e,
                    retry_secs = ctx.config.retry_interval.as_secs_f64(),
                    "connect attempt failed"
                );
                ctx.set_state(ConnectionState::Disconnected);
                ctx.events.emit_status(false);
                ctx.events.emit_message(Envelope::error(connect_failure_text(
                    &e,
                    ctx.config.retry_interval,
                )));
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.config.retry_interval) => {}
        }
    }

    debug!(server = %target, "supervisor stopped");
}

/// Drives one session from connect to teardown and returns why it ended.
async fn run_session(
    ctx: &SessionContext,
    target: &ConnectionTarget,
    stream: TcpStream,
    cancel: &CancellationToken,
) -> LinkError {
    let session = cancel.child_token();
    let (reader, writer) = stream.into_split();

    ctx.install_writer(SessionWriter::new(writer, session.clone()))
        .await;
    ctx.events.emit_status(true);
    info!(server = %target, "connected");

    // Spawned only after the status event so it precedes every message.
    let reader = tokio::spawn(read::read_loop(
        reader,
        ctx.config.codec,
        ctx.config.read_buffer_size,
        ctx.events.clone(),
        session.clone(),
    ));

    let cause = match reader.await {
        Ok(cause) => cause,
        Err(e) => {
            warn!(error = %e, "read loop task failed");
            LinkError::Io(std::io::Error::other(e.to_string()))
        }
    };

    session.cancel();
    ctx.release_writer().await;
    cause
}

fn connect_failure_text(e: &LinkError, retry: Duration) -> String {
    format!(
        "connection error: {e}. Next attempt in {}",
        describe_interval(retry)
    )
}

fn describe_interval(d: Duration) -> String {
    match (d.as_secs(), d.subsec_millis()) {
        (1, 0) => "1 second".into(),
        (secs, 0) => format!("{secs} seconds"),
        _ => format!("{} ms", d.as_millis()),
    }
}
