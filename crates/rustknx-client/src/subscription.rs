//! Subscriber handles.

use crate::{ClientError, Subscription};
use rustknx_core::address::GroupAddress;
use rustknx_core::dpt::DptValue;
use rustknx_core::telegram::{Telegram, TelegramKind};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

impl Subscription {
    pub(crate) fn new(id: u64, rx: mpsc::UnboundedReceiver<(TelegramKind, Telegram)>) -> Self {
        Self { id, rx }
    }

    /// The identifier under which this subscriber is registered.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The next telegram, in per-address receive order. Returns `None` once
    /// the client task has stopped.
    pub async fn recv(&mut self) -> Option<(TelegramKind, Telegram)> {
        self.rx.recv().await
    }
}

/// The common surface of the routing and tunnel clients, used by components
/// that can sit on either (the group-value cache, most prominently).
/// Declared in desugared form so cache tasks generic over a `GroupClient`
/// stay spawnable; implementations can still use `async fn`.
pub trait GroupClient: Send + Sync {
    fn subscribe(&self) -> impl Future<Output = Result<Subscription, ClientError>> + Send;
    fn unsubscribe(
        &self,
        subscription: &Subscription,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
    fn read_group_address_timeout(
        &self,
        destination: GroupAddress,
        window: Duration,
    ) -> impl Future<Output = Result<Telegram, ClientError>> + Send;
    fn write_group_address(
        &self,
        destination: GroupAddress,
        value: DptValue,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}
