//! Connection manager owning the persistent session.
//!
//! `start` launches the reconnect supervisor, `send` writes on the active
//! session, and `stop` tears everything down. Status changes, inbound
//! messages and failures are published through the [`EventHub`].

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LinkError;
use crate::events::EventHub;
use crate::probe;
use crate::pumps::write::SessionWriter;
use crate::supervisor::{self, SessionContext};
use crate::types::{ClientConfig, ConnectionState, ConnectionTarget, Envelope};

/// Background work of one `start` .. `stop` span.
struct ActiveRun {
    target: ConnectionTarget,
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
}

/// Persistent TCP client with automatic reconnection.
pub struct ConnectionManager {
    config: ClientConfig,
    events: EventHub,
    /// Write half of the active session; `None` while disconnected.
    writer: Arc<Mutex<Option<SessionWriter>>>,
    state: Arc<watch::Sender<ConnectionState>>,
    run: Mutex<Option<ActiveRun>>,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            events: EventHub::new(),
            writer: Arc::new(Mutex::new(None)),
            state: Arc::new(state),
            run: Mutex::new(None),
        }
    }

    /// Subscriber registry for status and message events.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Target of the current run, if started.
    pub async fn target(&self) -> Option<ConnectionTarget> {
        self.run.lock().await.as_ref().map(|r| r.target.clone())
    }

    /// One-shot reachability check using the configured probe timeout.
    /// Independent of the persistent session.
    pub async fn probe(&self, host: &str, port: u32) -> Envelope {
        probe::probe_with_timeout(host, port, self.config.probe_timeout).await
    }

    /// Starts the reconnect supervisor for `host:port`.
    ///
    /// Returns once the background task is launched, not once connected.
    /// Watch for a status change to `true`.
    pub async fn start(&self, host: &str, port: u32) -> Result<(), LinkError> {
        let target = ConnectionTarget::new(host, port)?;

        let mut run = self.run.lock().await;
        if let Some(active) = run.as_ref() {
            warn!(current = %active.target, requested = %target, "start while running");
            return Err(LinkError::AlreadyRunning);
        }

        self.state.send_replace(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let supervisor = tokio::spawn(supervisor::run(
            self.session_context(),
            target.clone(),
            cancel.clone(),
        ));

        info!(server = %target, codec = self.config.codec.name(), "connection manager started");
        *run = Some(ActiveRun {
            target,
            cancel,
            supervisor,
        });
        Ok(())
    }

    /// Encodes `text` and writes it on the active session.
    ///
    /// Fails fast without I/O when no session is up. Every failure is also
    /// published as an error envelope. A write failure ends the session; the
    /// supervisor then reconnects.
    pub async fn send(&self, text: &str) -> Result<(), LinkError> {
        let mut slot = self.writer.lock().await;
        let Some(writer) = slot.as_mut() else {
            return Err(self.fail_send(LinkError::NotConnected));
        };

        let bytes = self.config.codec.encode(text);
        match writer.write(&bytes).await {
            Ok(()) => {
                debug!(bytes = bytes.len(), "message sent");
                Ok(())
            }
            Err(LinkError::NotConnected) => {
                drop(slot);
                Err(self.fail_send(LinkError::NotConnected))
            }
            Err(e) => {
                writer.end_session();
                drop(slot);
                warn!(error = %e, "send failed, ending session");
                self.events
                    .emit_message(Envelope::error(format!("failed to send message: {e}")));
                Err(e)
            }
        }
    }

    /// Stops the supervisor and read loop and closes the socket.
    ///
    /// Waits for the background tasks to exit. Emits one final status
    /// change to `false`; calling it again emits nothing.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        if let Some(active) = run.take() {
            active.cancel.cancel();
            if let Err(e) = active.supervisor.await {
                warn!(error = %e, "supervisor task failed");
            }
            info!(server = %active.target, "connection manager stopped");
        }

        self.session_context().release_writer().await;

        let previous = self.state.send_replace(ConnectionState::Stopped);
        if previous != ConnectionState::Stopped {
            self.events.emit_status(false);
        }
    }

    fn fail_send(&self, e: LinkError) -> LinkError {
        warn!("send attempted without an active connection");
        self.events.emit_message(Envelope::error(e.to_string()));
        e
    }

    fn session_context(&self) -> SessionContext {
        SessionContext {
            config: self.config.clone(),
            events: self.events.clone(),
            writer: self.writer.clone(),
            state: self.state.clone(),
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(active) = self.run.get_mut().take() {
            active.cancel.cancel();
        }
    }
}
