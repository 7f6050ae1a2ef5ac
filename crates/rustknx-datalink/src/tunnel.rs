//! The tunnelling-session collaborator interface.
//!
//! The tunnelling wire exchange (connect, heartbeat, sequence numbers,
//! acknowledgements) lives in an external session implementation. The tunnel
//! client only needs to push encoded cEMI telegrams into the session and
//! react to the events it reports back.

use crate::DataLinkError;
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc;

/// Why a tunnelling session left the connected state.
///
/// The reason selects the reconnect backoff: everything except a rejected
/// connect response is retried immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Local or remote orderly disconnect.
    Requested,
    /// A tunnelling request was not acknowledged in time.
    TunnellingAckError,
    /// Heartbeat (connection-state request) failed.
    ConnectionStateError,
    /// The gateway rejected the connect request.
    ConnectResponseError,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("disconnect requested"),
            Self::TunnellingAckError => f.write_str("tunnelling ack missed"),
            Self::ConnectionStateError => f.write_str("connection state check failed"),
            Self::ConnectResponseError => f.write_str("connect response error"),
        }
    }
}

/// Events a tunnelling session reports to its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelEvent {
    /// The session reached the connected state.
    Connected,
    /// The session left the connected state.
    Disconnected(DisconnectReason),
    /// An inbound cEMI telegram (message code onward).
    Telegram(Vec<u8>),
    /// The gateway acknowledged the telegram currently in flight.
    TelegramAck,
}

/// The outbound half of a tunnelling session.
///
/// `send_telegram` hands one encoded cEMI telegram to the session, which
/// wraps it in a tunnelling request. At most one telegram may be in flight;
/// the caller must wait for [`TunnelEvent::TelegramAck`] before sending the
/// next one. `connect` and `disconnect` drive the session state machine;
/// state changes come back as [`TunnelEvent`]s on the event channel.
pub trait TunnelConnection: Send + Sync {
    fn connect(&self) -> impl Future<Output = Result<(), DataLinkError>> + Send;
    fn disconnect(&self) -> impl Future<Output = Result<(), DataLinkError>> + Send;
    fn send_telegram(&self, cemi: &[u8])
        -> impl Future<Output = Result<(), DataLinkError>> + Send;
}

/// Creates the event channel a session implementation reports into.
pub fn event_channel() -> (
    mpsc::UnboundedSender<TunnelEvent>,
    mpsc::UnboundedReceiver<TunnelEvent>,
) {
    mpsc::unbounded_channel()
}
