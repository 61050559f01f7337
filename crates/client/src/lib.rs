//! Persistent TCP client for legacy text-protocol servers.
//!
//! A [`ConnectionManager`] keeps a single logical connection to a server,
//! reconnects on a fixed interval when the connection drops, and reports
//! status changes and inbound messages through an [`EventHub`]. Operational
//! failures travel the same way, as [`Envelope`]s of kind
//! [`EnvelopeKind::Error`].

pub mod codec;
mod connect;
pub mod error;
pub mod events;
pub mod manager;
pub mod probe;
mod pumps;
pub(crate) mod supervisor;
pub mod types;

pub use codec::TextCodec;
pub use error::LinkError;
pub use events::{EventHub, LinkEvent, SubscriptionId};
pub use manager::ConnectionManager;
pub use probe::{probe, probe_with_timeout};
pub use types::{ClientConfig, ConnectionState, ConnectionTarget, Envelope, EnvelopeKind};

use std::time::Duration;

/// Bound for the one-shot reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound for each connect attempt of the persistent session.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed wait between connect attempts while disconnected.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Size of the read buffer; one inbound envelope per filled read.
pub const READ_BUFFER_SIZE: usize = 1024;
