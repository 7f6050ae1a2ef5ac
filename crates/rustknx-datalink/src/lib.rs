//! Transports for KNXnet/IP clients.
//!
//! [`RoutingTransport`] is the multicast UDP endpoint used by routing
//! clients; [`TunnelConnection`] is the interface a tunnelling-session
//! collaborator implements so the tunnel client can stay transport-agnostic.

pub mod routing;
pub mod traits;
pub mod tunnel;

pub use routing::{RoutingTransport, RoutingTransportConfig};
pub use traits::{DataLink, DataLinkError};
pub use tunnel::{DisconnectReason, TunnelConnection, TunnelEvent};
