//! KNXnet/IP clients.
//!
//! [`RoutingClient`] drives the multicast routing protocol;
//! [`TunnelClient`] offers the same surface over a tunnelling session;
//! [`GroupValueCache`] keeps the last decoded value per group address on
//! top of either. Telegram observers attach via [`RoutingClient::subscribe`]
//! and receive `(kind, telegram)` pairs through a [`Subscription`].

pub mod cache;
pub mod error;
pub mod project;
pub mod routing;
mod subscription;
pub mod table;
pub mod tunnel;

pub use cache::{GroupEntry, GroupValueCache, GroupValueCacheBuilder, HydrationMode, HydrationRecord};
pub use error::ClientError;
pub use project::{EtsArea, EtsDevice, EtsGroupAddress, EtsLine, EtsProject};
pub use routing::{FrameDisposition, RoutingClient, RoutingClientBuilder};
pub use subscription::GroupClient;
pub use table::GroupTable;
pub use tunnel::{TunnelClient, TunnelClientBuilder};

use rustknx_core::telegram::{Telegram, TelegramKind};
use tokio::sync::mpsc;

/// The receiving half of a telegram subscription.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<(TelegramKind, Telegram)>,
}
