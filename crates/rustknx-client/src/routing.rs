//! The multicast routing client.
//!
//! A single task owns the socket and all mutable state (the known-address
//! table, the subscriber list, search collectors). Callers talk to it
//! through a command channel with oneshot replies; inbound telegrams fan
//! out through per-subscriber unbounded channels, so dispatch never blocks
//! the socket loop and per-subscriber delivery keeps receive order.

use crate::table::{GroupTable, Inbound};
use crate::{ClientError, GroupClient, Subscription};
use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::cemi::{Apci, Cemi, CemiData, GroupData};
use rustknx_core::dpt::{DptId, DptValue};
use rustknx_core::frame::{
    frame_to_vec, Frame, FrameBody, Hpai, RoutingIndication, SearchRequest, SearchResponse,
};
use rustknx_core::telegram::{Telegram, TelegramKind};
use rustknx_datalink::routing::{RoutingTransport, RoutingTransportConfig, KNX_MULTICAST_ADDR, KNX_PORT};
use rustknx_datalink::DataLink;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_DATAGRAM_LEN: usize = 1600;

/// Whether the receive path turned a frame into subscriber deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    Handled,
    Unhandled,
}

type FrameCallback = Box<dyn Fn(&Frame, FrameDisposition) + Send + Sync>;
type SubscriberSender = mpsc::UnboundedSender<(TelegramKind, Telegram)>;

pub(crate) enum Command {
    Subscribe(SubscriberSender, oneshot::Sender<u64>),
    Unsubscribe(u64),
    GroupAddresses(oneshot::Sender<BTreeMap<String, String>>),
    AddGroupAddress(GroupAddress, DptId, oneshot::Sender<()>),
    RemoveGroupAddress(GroupAddress, oneshot::Sender<bool>),
    Write {
        destination: GroupAddress,
        value: DptValue,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    Read {
        destination: GroupAddress,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    SendFrame {
        datagram: Vec<u8>,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    SubscribeSearch(mpsc::UnboundedSender<SearchResponse>, oneshot::Sender<u64>),
    UnsubscribeSearch(u64),
    LocalEndpoint(oneshot::Sender<Result<SocketAddr, ClientError>>),
}

/// Builder for [`RoutingClient`].
pub struct RoutingClientBuilder {
    source_address: IndividualAddress,
    entries: Vec<(GroupAddress, DptId)>,
    allow_unknown_gpa: bool,
    local_ip: Ipv4Addr,
    group: SocketAddrV4,
    frame_callback: Option<FrameCallback>,
    default_timeout: Duration,
}

impl RoutingClientBuilder {
    /// `source_address` is stamped on every outgoing data frame.
    pub fn new(source_address: IndividualAddress) -> Self {
        Self {
            source_address,
            entries: Vec::new(),
            allow_unknown_gpa: false,
            local_ip: Ipv4Addr::UNSPECIFIED,
            group: SocketAddrV4::new(KNX_MULTICAST_ADDR, KNX_PORT),
            frame_callback: None,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Seeds the known-address table from string pairs
    /// (`"main/middle/sub" → "main.sub"`).
    pub fn group_addresses<'a, I>(mut self, pairs: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (address, dpt) in pairs {
            let address = GroupAddress::from_str(address)
                .map_err(|_| ClientError::InvalidArgument("malformed group address"))?;
            let dpt = DptId::from_str(dpt)
                .map_err(|_| ClientError::InvalidArgument("malformed datapoint type"))?;
            self.entries.push((address, dpt));
        }
        Ok(self)
    }

    pub fn group_address(mut self, address: GroupAddress, dpt: DptId) -> Self {
        self.entries.push((address, dpt));
        self
    }

    /// Accept sends and receives on unconfigured group addresses. Received
    /// values then surface raw; sent values must be pre-encoded bits.
    pub fn allow_unknown_gpa(mut self, allow: bool) -> Self {
        self.allow_unknown_gpa = allow;
        self
    }

    pub fn local_ip(mut self, local_ip: Ipv4Addr) -> Self {
        self.local_ip = local_ip;
        self
    }

    pub fn multicast_group(mut self, group: SocketAddrV4) -> Self {
        self.group = group;
        self
    }

    /// Observes every decoded frame after routing-indication handling.
    /// Panics inside the callback are caught, logged and swallowed.
    pub fn frame_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Frame, FrameDisposition) + Send + Sync + 'static,
    {
        self.frame_callback = Some(Box::new(callback));
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Binds the multicast transport and starts the client task.
    pub async fn connect(self) -> Result<RoutingClient, ClientError> {
        let transport = RoutingTransport::bind(RoutingTransportConfig {
            group: self.group,
            local_ip: self.local_ip,
        })
        .await?;
        Ok(self.with_datalink(transport))
    }

    /// Starts the client task over an arbitrary datalink. Used directly by
    /// tests; `connect` wraps it for the real transport.
    pub fn with_datalink<D: DataLink + 'static>(self, datalink: D) -> RoutingClient {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let mut table = GroupTable::new(self.allow_unknown_gpa);
        for (address, dpt) in self.entries {
            table.insert(address, dpt);
        }
        let task = Task {
            datalink: Arc::new(datalink),
            table,
            source: self.source_address,
            subscribers: Vec::new(),
            search_collectors: Vec::new(),
            next_id: 1,
            frame_callback: self.frame_callback,
        };
        tokio::spawn(task.run(commands_rx));
        RoutingClient {
            commands: commands_tx,
            default_timeout: self.default_timeout,
        }
    }
}

/// Handle to a running routing client task. Cloning is cheap; the task
/// stops once every handle is dropped.
#[derive(Clone)]
pub struct RoutingClient {
    commands: mpsc::UnboundedSender<Command>,
    default_timeout: Duration,
}

impl RoutingClient {
    pub(crate) fn send_command(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::ClientStopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(make(tx))?;
        rx.await.map_err(|_| ClientError::ClientStopped)
    }

    /// Registers a subscriber and returns its receiving half.
    pub async fn subscribe(&self) -> Result<Subscription, ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.request(|reply| Command::Subscribe(tx, reply)).await?;
        Ok(Subscription::new(id, rx))
    }

    /// Removes a subscriber. Telegrams already queued stay readable.
    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), ClientError> {
        self.send_command(Command::Unsubscribe(subscription.id()))
    }

    /// The current `"main/middle/sub" → "main.sub"` table.
    pub async fn get_group_addresses(&self) -> Result<BTreeMap<String, String>, ClientError> {
        self.request(Command::GroupAddresses).await
    }

    pub async fn add_group_address(
        &self,
        address: GroupAddress,
        dpt: DptId,
    ) -> Result<(), ClientError> {
        self.request(|reply| Command::AddGroupAddress(address, dpt, reply))
            .await
    }

    /// Returns whether the address was present.
    pub async fn remove_group_address(&self, address: GroupAddress) -> Result<bool, ClientError> {
        self.request(|reply| Command::RemoveGroupAddress(address, reply))
            .await
    }

    /// Sends a group read and waits for the first matching response, up to
    /// the default timeout.
    pub async fn read_group_address(
        &self,
        destination: GroupAddress,
    ) -> Result<Telegram, ClientError> {
        self.read_group_address_timeout(destination, self.default_timeout)
            .await
    }

    pub async fn read_group_address_timeout(
        &self,
        destination: GroupAddress,
        window: Duration,
    ) -> Result<Telegram, ClientError> {
        let mut subscription = self.subscribe().await?;
        let result = self
            .read_with_subscription(destination, window, &mut subscription)
            .await;
        let _ = self.unsubscribe(&subscription).await;
        result
    }

    async fn read_with_subscription(
        &self,
        destination: GroupAddress,
        window: Duration,
        subscription: &mut Subscription,
    ) -> Result<Telegram, ClientError> {
        // The subscribe command is already queued ahead of the read, so the
        // transient listener is installed before the request leaves.
        self.request(|reply| Command::Read {
            destination,
            reply,
        })
        .await??;
        await_group_response(subscription, destination, window).await
    }

    /// Encodes `value` for `destination` and multicasts a group write.
    pub async fn write_group_address(
        &self,
        destination: GroupAddress,
        value: DptValue,
    ) -> Result<(), ClientError> {
        self.request(|reply| Command::Write {
            destination,
            value,
            reply,
        })
        .await?
    }

    /// Emits an arbitrary frame verbatim. No datapoint handling.
    pub async fn send_frame(&self, body: &dyn FrameBody) -> Result<(), ClientError> {
        let datagram = frame_to_vec(body)?;
        self.request(|reply| Command::SendFrame { datagram, reply })
            .await?
    }

    /// Multicasts a search request and collects responses for `window`.
    pub async fn discover(&self, window: Duration) -> Result<Vec<SearchResponse>, ClientError> {
        let local = self.request(Command::LocalEndpoint).await??;
        let SocketAddr::V4(local) = local else {
            return Err(ClientError::InvalidArgument("transport is not IPv4"));
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let collector = self
            .request(|reply| Command::SubscribeSearch(tx, reply))
            .await?;
        let result = async {
            self.send_frame(&SearchRequest {
                endpoint: Hpai::udp(local),
            })
            .await?;

            let deadline = Instant::now() + window;
            let mut responses = Vec::new();
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match timeout(remaining, rx.recv()).await {
                    Ok(Some(response)) => responses.push(response),
                    Ok(None) | Err(_) => break,
                }
            }
            Ok(responses)
        }
        .await;
        let _ = self.send_command(Command::UnsubscribeSearch(collector));
        result
    }
}

impl GroupClient for RoutingClient {
    async fn subscribe(&self) -> Result<Subscription, ClientError> {
        RoutingClient::subscribe(self).await
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), ClientError> {
        RoutingClient::unsubscribe(self, subscription).await
    }

    async fn read_group_address_timeout(
        &self,
        destination: GroupAddress,
        window: Duration,
    ) -> Result<Telegram, ClientError> {
        RoutingClient::read_group_address_timeout(self, destination, window).await
    }

    async fn write_group_address(
        &self,
        destination: GroupAddress,
        value: DptValue,
    ) -> Result<(), ClientError> {
        RoutingClient::write_group_address(self, destination, value).await
    }
}

/// Waits on `subscription` for the first group response addressed to
/// `destination`.
pub(crate) async fn await_group_response(
    subscription: &mut Subscription,
    destination: GroupAddress,
    window: Duration,
) -> Result<Telegram, ClientError> {
    let deadline = Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ClientError::Timeout);
        }
        match timeout(remaining, subscription.recv()).await {
            Err(_) => return Err(ClientError::Timeout),
            Ok(None) => return Err(ClientError::ClientStopped),
            Ok(Some((TelegramKind::GroupResponse, telegram)))
                if telegram.destination == destination =>
            {
                return Ok(telegram);
            }
            Ok(Some(_)) => {}
        }
    }
}

struct Task<D> {
    datalink: Arc<D>,
    table: GroupTable,
    source: IndividualAddress,
    subscribers: Vec<(u64, SubscriberSender)>,
    search_collectors: Vec<(u64, mpsc::UnboundedSender<SearchResponse>)>,
    next_id: u64,
    frame_callback: Option<FrameCallback>,
}

impl<D: DataLink> Task<D> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        loop {
            let datalink = Arc::clone(&self.datalink);
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break, // every handle dropped
                },
                received = datalink.recv(&mut buf) => match received {
                    Ok((n, _source)) => self.handle_datagram(&buf[..n]),
                    Err(e) => log::debug!("socket receive failed: {e}"),
                },
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe(sender, reply) => {
                let id = self.fresh_id();
                self.subscribers.push((id, sender));
                let _ = reply.send(id);
            }
            Command::Unsubscribe(id) => {
                self.subscribers.retain(|(sub_id, _)| *sub_id != id);
            }
            Command::GroupAddresses(reply) => {
                let _ = reply.send(self.table.to_strings());
            }
            Command::AddGroupAddress(address, dpt, reply) => {
                self.table.insert(address, dpt);
                let _ = reply.send(());
            }
            Command::RemoveGroupAddress(address, reply) => {
                let _ = reply.send(self.table.remove(address));
            }
            Command::Write {
                destination,
                value,
                reply,
            } => {
                let _ = reply.send(self.send_group_frame(destination, Apci::GroupWrite, &value).await);
            }
            Command::Read { destination, reply } => {
                let result = if self.table.get(destination).is_none() && !self.table.allow_unknown()
                {
                    Err(ClientError::UnknownGroupAddress(destination))
                } else {
                    self.send_data_request(destination, Apci::GroupRead, GroupData::empty())
                        .await
                };
                let _ = reply.send(result);
            }
            Command::SendFrame { datagram, reply } => {
                let result = self
                    .datalink
                    .send(&datagram)
                    .await
                    .map_err(ClientError::from);
                let _ = reply.send(result);
            }
            Command::SubscribeSearch(sender, reply) => {
                let id = self.fresh_id();
                self.search_collectors.push((id, sender));
                let _ = reply.send(id);
            }
            Command::UnsubscribeSearch(id) => {
                self.search_collectors.retain(|(c_id, _)| *c_id != id);
            }
            Command::LocalEndpoint(reply) => {
                let _ = reply.send(self.datalink.local_addr().map_err(ClientError::from));
            }
        }
    }

    async fn send_group_frame(
        &self,
        destination: GroupAddress,
        apci: Apci,
        value: &DptValue,
    ) -> Result<(), ClientError> {
        let data = self.table.encode_outgoing(destination, value)?;
        self.send_data_request(destination, apci, data).await
    }

    async fn send_data_request(
        &self,
        destination: GroupAddress,
        apci: Apci,
        data: GroupData,
    ) -> Result<(), ClientError> {
        let body = RoutingIndication {
            cemi: Cemi::Data(CemiData::group_request(self.source, destination, apci, data)),
        };
        let datagram = frame_to_vec(&body)?;
        self.datalink.send(&datagram).await?;
        Ok(())
    }

    fn handle_datagram(&mut self, datagram: &[u8]) {
        let frame = match Frame::decode(datagram) {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("dropping undecodable datagram: {e}");
                return;
            }
        };

        let mut disposition = FrameDisposition::Unhandled;
        match &frame {
            Frame::RoutingIndication(indication) => {
                if let Cemi::Data(data) = &indication.cemi {
                    match self.table.classify(data) {
                        Inbound::Telegram(telegram) => {
                            self.dispatch(telegram);
                            disposition = FrameDisposition::Handled;
                        }
                        Inbound::UnknownAddress(address) => {
                            log::debug!("telegram for unknown group address {address}");
                        }
                        Inbound::BadPayload(address, dpt) => {
                            log::info!("payload for {address} does not decode as {dpt}");
                        }
                        Inbound::NotGroupService => {}
                    }
                }
            }
            Frame::SearchResponse(response) => {
                if !self.search_collectors.is_empty() {
                    self.search_collectors
                        .retain(|(_, sender)| sender.send(response.clone()).is_ok());
                    disposition = FrameDisposition::Handled;
                }
            }
            _ => {}
        }

        if let Some(callback) = &self.frame_callback {
            if catch_unwind(AssertUnwindSafe(|| callback(&frame, disposition))).is_err() {
                log::warn!("frame callback panicked; continuing");
            }
        }
    }

    fn dispatch(&self, telegram: Telegram) {
        for (id, sender) in &self.subscribers {
            if sender.send((telegram.kind, telegram.clone())).is_err() {
                // Caller owns subscriber lifecycle; a closed channel is not
                // grounds for removal.
                log::debug!("subscriber {id} is not receiving");
            }
        }
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameDisposition, RoutingClientBuilder};
    use crate::ClientError;
    use rustknx_core::address::{GroupAddress, IndividualAddress};
    use rustknx_core::dpt::DptValue;
    use rustknx_core::frame::{Frame, RawBody, ServiceType};
    use rustknx_core::telegram::TelegramKind;
    use rustknx_datalink::{DataLink, DataLinkError};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::mpsc as std_mpsc;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};
    use tokio::time::{timeout, Instant};

    /// The scenario datagram: group write of `true` from 1.1.1 to 1/2/3.
    const WRITE_ON: [u8; 17] = [
        0x06, 0x10, 0x05, 0x30, 0x00, 0x11, 0x29, 0x00, 0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x01,
        0x00, 0x81,
    ];
    /// Same shape with APCI group response.
    const RESPONSE_ON: [u8; 17] = [
        0x06, 0x10, 0x05, 0x30, 0x00, 0x11, 0x29, 0x00, 0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x01,
        0x00, 0x41,
    ];

    struct ChannelDataLink {
        to_bus: mpsc::UnboundedSender<Vec<u8>>,
        from_bus: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    }

    impl DataLink for ChannelDataLink {
        async fn send(&self, payload: &[u8]) -> Result<(), DataLinkError> {
            self.to_bus
                .send(payload.to_vec())
                .map_err(|_| DataLinkError::NotConnected)
        }

        async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), DataLinkError> {
            let mut rx = self.from_bus.lock().await;
            let Some(payload) = rx.recv().await else {
                return Err(DataLinkError::NotConnected);
            };
            if payload.len() > buf.len() {
                return Err(DataLinkError::FrameTooLarge);
            }
            buf[..payload.len()].copy_from_slice(&payload);
            Ok((payload.len(), SocketAddr::from((Ipv4Addr::LOCALHOST, 3671))))
        }

        fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
            Ok(SocketAddr::from((Ipv4Addr::new(192, 168, 1, 5), 3671)))
        }
    }

    struct Bus {
        inject: mpsc::UnboundedSender<Vec<u8>>,
        sent: mpsc::UnboundedReceiver<Vec<u8>>,
    }

    impl Bus {
        async fn next_sent(&mut self) -> Vec<u8> {
            timeout(Duration::from_secs(1), self.sent.recv())
                .await
                .expect("client sent nothing")
                .expect("client gone")
        }

        fn assert_silent(&mut self) {
            assert!(self.sent.try_recv().is_err(), "unexpected datagram");
        }
    }

    fn datalink() -> (ChannelDataLink, Bus) {
        let (to_bus, sent) = mpsc::unbounded_channel();
        let (inject, from_bus) = mpsc::unbounded_channel();
        (
            ChannelDataLink {
                to_bus,
                from_bus: Arc::new(Mutex::new(from_bus)),
            },
            Bus { inject, sent },
        )
    }

    fn builder() -> RoutingClientBuilder {
        RoutingClientBuilder::new(IndividualAddress::new(1, 1, 1).unwrap())
            .group_addresses([("1/2/3", "1.001"), ("1/2/4", "17.001")])
            .unwrap()
    }

    fn light() -> GroupAddress {
        GroupAddress::new(1, 2, 3).unwrap()
    }

    #[tokio::test]
    async fn received_write_reaches_subscriber() {
        let (datalink, bus) = datalink();
        let client = builder().with_datalink(datalink);
        let mut subscription = client.subscribe().await.unwrap();

        bus.inject.send(WRITE_ON.to_vec()).unwrap();

        let (kind, telegram) = timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kind, TelegramKind::GroupWrite);
        assert_eq!(telegram.source, IndividualAddress::new(1, 1, 1).unwrap());
        assert_eq!(telegram.destination, light());
        assert_eq!(telegram.value, Some(DptValue::Bool(true)));
    }

    #[tokio::test]
    async fn write_emits_well_formed_datagram() {
        let (datalink, mut bus) = datalink();
        let client = builder().with_datalink(datalink);

        client
            .write_group_address(light(), DptValue::Bool(false))
            .await
            .unwrap();

        let datagram = bus.next_sent().await;
        assert_eq!(datagram.len(), 17);
        assert_eq!(u16::from_be_bytes([datagram[4], datagram[5]]), 17);
        assert_eq!(datagram.last().unwrap() & 0x01, 0);
    }

    #[tokio::test]
    async fn read_returns_injected_response() {
        let (datalink, mut bus) = datalink();
        let client = builder().with_datalink(datalink);

        let reader = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .read_group_address_timeout(light(), Duration::from_millis(500))
                    .await
            })
        };

        let datagram = bus.next_sent().await;
        // group read: APCI 0, empty value
        assert_eq!(&datagram[14..], &[0x01, 0x00, 0x00]);
        bus.inject.send(RESPONSE_ON.to_vec()).unwrap();

        let telegram = reader.await.unwrap().unwrap();
        assert_eq!(telegram.kind, TelegramKind::GroupResponse);
        assert_eq!(telegram.value, Some(DptValue::Bool(true)));
    }

    #[tokio::test]
    async fn read_times_out_without_response() {
        let (datalink, mut bus) = datalink();
        let client = builder().with_datalink(datalink);

        let started = Instant::now();
        let result = client
            .read_group_address_timeout(light(), Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(ClientError::Timeout)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(500));
        let _ = bus.next_sent().await; // the read request itself
    }

    #[tokio::test]
    async fn unknown_address_rejects_without_sending() {
        let (datalink, mut bus) = datalink();
        let client = builder().with_datalink(datalink);
        let stranger = GroupAddress::new(9, 0, 9).unwrap();

        let write = client
            .write_group_address(stranger, DptValue::Bool(true))
            .await;
        assert!(matches!(write, Err(ClientError::UnknownGroupAddress(_))));

        let read = client.read_group_address_timeout(stranger, Duration::from_millis(50)).await;
        assert!(matches!(read, Err(ClientError::UnknownGroupAddress(_))));

        bus.assert_silent();
    }

    #[tokio::test]
    async fn datapoint_range_error_rejects_without_sending() {
        let (datalink, mut bus) = datalink();
        let client = builder().with_datalink(datalink);

        let result = client
            .write_group_address(GroupAddress::new(1, 2, 4).unwrap(), DptValue::Scene(64))
            .await;
        assert!(matches!(result, Err(ClientError::DatapointEncode(_))));
        bus.assert_silent();
    }

    #[tokio::test]
    async fn table_is_editable_at_runtime() {
        let (datalink, _bus) = datalink();
        let client = builder().with_datalink(datalink);
        let added = GroupAddress::new(2, 2, 2).unwrap();

        client
            .add_group_address(added, "5.001".parse().unwrap())
            .await
            .unwrap();
        let table = client.get_group_addresses().await.unwrap();
        assert_eq!(table.get("2/2/2").map(String::as_str), Some("5.001"));
        assert_eq!(table.get("1/2/3").map(String::as_str), Some("1.001"));

        assert!(client.remove_group_address(added).await.unwrap());
        assert!(!client.remove_group_address(added).await.unwrap());
        assert!(!client
            .get_group_addresses()
            .await
            .unwrap()
            .contains_key("2/2/2"));
    }

    #[tokio::test]
    async fn frame_callback_sees_dispositions() {
        let (observed_tx, observed_rx) = std_mpsc::channel();
        let (datalink, bus) = datalink();
        let client = builder()
            .frame_callback(move |frame: &Frame, disposition| {
                let _ = observed_tx.send((frame.service_type(), disposition));
            })
            .with_datalink(datalink);
        let mut subscription = client.subscribe().await.unwrap();

        // handled: a known group write
        bus.inject.send(WRITE_ON.to_vec()).unwrap();
        subscription.recv().await.unwrap();
        // unhandled: a routing-busy frame
        bus.inject
            .send(vec![
                0x06, 0x10, 0x05, 0x32, 0x00, 0x0C, 0x06, 0x00, 0x00, 0x64, 0x00, 0x00,
            ])
            .unwrap();

        let (service, disposition) = observed_rx
            .recv_timeout(Duration::from_secs(1))
            .unwrap();
        assert_eq!(service, ServiceType::RoutingIndication);
        assert_eq!(disposition, FrameDisposition::Handled);
        let (service, disposition) = observed_rx
            .recv_timeout(Duration::from_secs(1))
            .unwrap();
        assert_eq!(service, ServiceType::RoutingBusy);
        assert_eq!(disposition, FrameDisposition::Unhandled);
    }

    #[tokio::test]
    async fn malformed_datagrams_are_dropped_silently() {
        let (datalink, bus) = datalink();
        let client = builder().with_datalink(datalink);
        let mut subscription = client.subscribe().await.unwrap();

        bus.inject.send(vec![0x06, 0x10, 0x05]).unwrap(); // truncated
        let mut bad_length = WRITE_ON.to_vec();
        bad_length[5] = 0x20; // length disagrees with datagram
        bus.inject.send(bad_length).unwrap();
        bus.inject.send(WRITE_ON.to_vec()).unwrap(); // still alive

        let (kind, _) = timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kind, TelegramKind::GroupWrite);
    }

    #[tokio::test]
    async fn raw_frames_are_sent_verbatim() {
        let (datalink, mut bus) = datalink();
        let client = builder().with_datalink(datalink);

        client
            .send_frame(&RawBody {
                service_type: ServiceType::RoutingBusy,
                payload: vec![0x06, 0x00, 0x00, 0x64, 0x00, 0x00],
            })
            .await
            .unwrap();

        let datagram = bus.next_sent().await;
        assert_eq!(
            datagram,
            vec![0x06, 0x10, 0x05, 0x32, 0x00, 0x0C, 0x06, 0x00, 0x00, 0x64, 0x00, 0x00]
        );
    }

    #[tokio::test]
    async fn allow_unknown_surfaces_raw_values() {
        use rustknx_core::cemi::GroupData;

        let (datalink, mut bus) = datalink();
        let client = RoutingClientBuilder::new(IndividualAddress::new(1, 1, 1).unwrap())
            .allow_unknown_gpa(true)
            .with_datalink(datalink);
        let mut subscription = client.subscribe().await.unwrap();

        bus.inject.send(WRITE_ON.to_vec()).unwrap();
        let (_, telegram) = timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(telegram.value, Some(DptValue::Raw(GroupData::Short(1))));

        // raw sends pass through; typed sends are refused
        client
            .write_group_address(light(), DptValue::Raw(GroupData::Short(1)))
            .await
            .unwrap();
        assert_eq!(bus.next_sent().await.len(), 17);
        assert!(matches!(
            client.write_group_address(light(), DptValue::Bool(true)).await,
            Err(ClientError::InvalidArgument(_))
        ));
    }
}
