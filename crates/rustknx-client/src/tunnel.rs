//! The tunnelling client.
//!
//! Offers the routing client's surface over a unicast tunnelling session
//! (a [`TunnelConnection`] collaborator). Outbound telegrams pass through a
//! queue with a single frame in flight; the session's acknowledgement
//! releases the next one. Disconnect reasons pick the reconnect backoff.

use crate::routing::await_group_response;
use crate::table::{GroupTable, Inbound};
use crate::{ClientError, GroupClient, Subscription};
use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::cemi::{Apci, Cemi, CemiData, GroupData};
use rustknx_core::dpt::{DptId, DptValue};
use rustknx_core::encoding::{Reader, Writer};
use rustknx_core::telegram::{Telegram, TelegramKind};
use rustknx_datalink::{DisconnectReason, TunnelConnection, TunnelEvent};
use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_REJECT_BACKOFF: Duration = Duration::from_secs(10);

type SubscriberSender = mpsc::UnboundedSender<(TelegramKind, Telegram)>;

enum Command {
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
    SendTelegram {
        cemi: Vec<u8>,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
}

/// Builder for [`TunnelClient`].
pub struct TunnelClientBuilder {
    source_address: IndividualAddress,
    entries: Vec<(GroupAddress, DptId)>,
    allow_unknown_gpa: bool,
    default_timeout: Duration,
}

impl TunnelClientBuilder {
    pub fn new(source_address: IndividualAddress) -> Self {
        Self {
            source_address,
            entries: Vec::new(),
            allow_unknown_gpa: false,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

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

    pub fn allow_unknown_gpa(mut self, allow: bool) -> Self {
        self.allow_unknown_gpa = allow;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Starts the client task over a tunnelling session. `events` is the
    /// channel the session reports into; the task issues the initial
    /// connect itself.
    pub fn connect<C: TunnelConnection + 'static>(
        self,
        connection: C,
        events: mpsc::UnboundedReceiver<TunnelEvent>,
    ) -> TunnelClient {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let mut table = GroupTable::new(self.allow_unknown_gpa);
        for (address, dpt) in self.entries {
            table.insert(address, dpt);
        }
        let task = Task {
            connection: Arc::new(connection),
            table,
            source: self.source_address,
            subscribers: Vec::new(),
            next_id: 1,
            link: LinkState::Connecting,
            queue: VecDeque::new(),
            in_flight: None,
        };
        tokio::spawn(task.run(commands_rx, events));
        TunnelClient {
            commands: commands_tx,
            default_timeout: self.default_timeout,
        }
    }
}

/// Handle to a running tunnel client task.
#[derive(Clone)]
pub struct TunnelClient {
    commands: mpsc::UnboundedSender<Command>,
    default_timeout: Duration,
}

impl TunnelClient {
    fn send_command(&self, command: Command) -> Result<(), ClientError> {
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

    pub async fn subscribe(&self) -> Result<Subscription, ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.request(|reply| Command::Subscribe(tx, reply)).await?;
        Ok(Subscription::new(id, rx))
    }

    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), ClientError> {
        self.send_command(Command::Unsubscribe(subscription.id()))
    }

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

    pub async fn remove_group_address(&self, address: GroupAddress) -> Result<bool, ClientError> {
        self.request(|reply| Command::RemoveGroupAddress(address, reply))
            .await
    }

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
        let result = async {
            self.request(|reply| Command::Read {
                destination,
                reply,
            })
            .await??;
            await_group_response(&mut subscription, destination, window).await
        }
        .await;
        let _ = self.unsubscribe(&subscription).await;
        result
    }

    /// Queues a group write. The returned future completes when the
    /// gateway acknowledges the telegram.
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

    /// Queues a pre-encoded cEMI telegram verbatim.
    pub async fn send_telegram(&self, cemi: Vec<u8>) -> Result<(), ClientError> {
        self.request(|reply| Command::SendTelegram { cemi, reply })
            .await?
    }
}

impl GroupClient for TunnelClient {
    async fn subscribe(&self) -> Result<Subscription, ClientError> {
        TunnelClient::subscribe(self).await
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), ClientError> {
        TunnelClient::unsubscribe(self, subscription).await
    }

    async fn read_group_address_timeout(
        &self,
        destination: GroupAddress,
        window: Duration,
    ) -> Result<Telegram, ClientError> {
        TunnelClient::read_group_address_timeout(self, destination, window).await
    }

    async fn write_group_address(
        &self,
        destination: GroupAddress,
        value: DptValue,
    ) -> Result<(), ClientError> {
        TunnelClient::write_group_address(self, destination, value).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

struct Pending {
    cemi: Vec<u8>,
    reply: oneshot::Sender<Result<(), ClientError>>,
}

struct Task<C> {
    connection: Arc<C>,
    table: GroupTable,
    source: IndividualAddress,
    subscribers: Vec<(u64, SubscriberSender)>,
    next_id: u64,
    link: LinkState,
    queue: VecDeque<Pending>,
    in_flight: Option<oneshot::Sender<Result<(), ClientError>>>,
}

impl<C: TunnelConnection + 'static> Task<C> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<TunnelEvent>,
    ) {
        self.spawn_connect(Duration::ZERO);
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break, // session gone
                },
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe(sender, reply) => {
                let id = self.next_id;
                self.next_id += 1;
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
            } => match self.encode_group_request(destination, Apci::GroupWrite, &value) {
                Ok(cemi) => self.enqueue(Pending { cemi, reply }).await,
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Read { destination, reply } => {
                if self.table.get(destination).is_none() && !self.table.allow_unknown() {
                    let _ = reply.send(Err(ClientError::UnknownGroupAddress(destination)));
                    return;
                }
                match cemi_to_vec(&CemiData::group_request(
                    self.source,
                    destination,
                    Apci::GroupRead,
                    GroupData::empty(),
                )) {
                    Ok(cemi) => self.enqueue(Pending { cemi, reply }).await,
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::SendTelegram { cemi, reply } => {
                self.enqueue(Pending { cemi, reply }).await;
            }
        }
    }

    async fn handle_event(&mut self, event: TunnelEvent) {
        match event {
            TunnelEvent::Connected => {
                log::debug!("tunnel connected");
                self.link = LinkState::Connected;
                self.drain().await;
            }
            TunnelEvent::Disconnected(reason) => {
                log::info!("tunnel disconnected: {reason}");
                self.link = LinkState::Disconnected;
                if let Some(reply) = self.in_flight.take() {
                    let _ = reply.send(Err(ClientError::NotConnected));
                }
                let backoff = match reason {
                    DisconnectReason::ConnectResponseError => CONNECT_REJECT_BACKOFF,
                    DisconnectReason::Requested
                    | DisconnectReason::TunnellingAckError
                    | DisconnectReason::ConnectionStateError => Duration::ZERO,
                };
                self.spawn_connect(backoff);
            }
            TunnelEvent::Telegram(bytes) => self.handle_telegram(&bytes),
            TunnelEvent::TelegramAck => {
                if let Some(reply) = self.in_flight.take() {
                    let _ = reply.send(Ok(()));
                }
                self.drain().await;
            }
        }
    }

    fn handle_telegram(&mut self, bytes: &[u8]) {
        let mut reader = Reader::new(bytes);
        let cemi = match Cemi::decode(&mut reader) {
            Ok(cemi) => cemi,
            Err(e) => {
                log::info!("dropping undecodable tunnel telegram: {e}");
                return;
            }
        };
        let Cemi::Data(data) = cemi else {
            return;
        };
        match self.table.classify(&data) {
            Inbound::Telegram(telegram) => {
                for (id, sender) in &self.subscribers {
                    if sender.send((telegram.kind, telegram.clone())).is_err() {
                        log::debug!("subscriber {id} is not receiving");
                    }
                }
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

    fn encode_group_request(
        &self,
        destination: GroupAddress,
        apci: Apci,
        value: &DptValue,
    ) -> Result<Vec<u8>, ClientError> {
        let data = self.table.encode_outgoing(destination, value)?;
        cemi_to_vec(&CemiData::group_request(self.source, destination, apci, data))
    }

    async fn enqueue(&mut self, pending: Pending) {
        self.queue.push_back(pending);
        self.drain().await;
    }

    /// Emits the queue head if the link is up and nothing is in flight.
    async fn drain(&mut self) {
        while self.link == LinkState::Connected && self.in_flight.is_none() {
            let Some(pending) = self.queue.pop_front() else {
                return;
            };
            match self.connection.send_telegram(&pending.cemi).await {
                Ok(()) => {
                    self.in_flight = Some(pending.reply);
                }
                Err(e) => {
                    log::info!("tunnel send failed: {e}");
                    let _ = pending.reply.send(Err(ClientError::DataLink(e)));
                }
            }
        }
    }

    fn spawn_connect(&mut self, backoff: Duration) {
        self.link = LinkState::Connecting;
        let connection = Arc::clone(&self.connection);
        tokio::spawn(async move {
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
            if let Err(e) = connection.connect().await {
                log::warn!("tunnel connect failed: {e}");
            }
        });
    }
}

fn cemi_to_vec(data: &CemiData) -> Result<Vec<u8>, ClientError> {
    let mut buf = [0u8; 512];
    let mut writer = Writer::new(&mut buf);
    data.encode(&mut writer)?;
    Ok(writer.as_written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::{TunnelClientBuilder, TunnelEvent};
    use crate::ClientError;
    use rustknx_core::address::{GroupAddress, IndividualAddress};
    use rustknx_core::cemi::{Apci, CemiData, Destination, GroupData};
    use rustknx_core::dpt::DptValue;
    use rustknx_core::encoding::Reader;
    use rustknx_core::telegram::TelegramKind;
    use rustknx_datalink::{DataLinkError, DisconnectReason, TunnelConnection};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};
    use tokio::time::timeout;

    #[derive(Default)]
    struct SessionLog {
        connects: usize,
        telegrams: Vec<Vec<u8>>,
    }

    #[derive(Clone)]
    struct MockSession {
        log: Arc<Mutex<SessionLog>>,
        notify: mpsc::UnboundedSender<()>,
    }

    impl MockSession {
        fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
            let (notify, activity) = mpsc::unbounded_channel();
            (
                Self {
                    log: Arc::new(Mutex::new(SessionLog::default())),
                    notify,
                },
                activity,
            )
        }
    }

    impl TunnelConnection for MockSession {
        async fn connect(&self) -> Result<(), DataLinkError> {
            self.log.lock().await.connects += 1;
            let _ = self.notify.send(());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), DataLinkError> {
            Ok(())
        }

        async fn send_telegram(&self, cemi: &[u8]) -> Result<(), DataLinkError> {
            self.log.lock().await.telegrams.push(cemi.to_vec());
            let _ = self.notify.send(());
            Ok(())
        }
    }

    fn source() -> IndividualAddress {
        IndividualAddress::new(1, 1, 250).unwrap()
    }

    fn light() -> GroupAddress {
        GroupAddress::new(1, 2, 3).unwrap()
    }

    async fn await_activity(activity: &mut mpsc::UnboundedReceiver<()>) {
        timeout(Duration::from_secs(1), activity.recv())
            .await
            .expect("no session activity")
            .expect("session gone");
    }

    #[tokio::test]
    async fn queues_hold_one_frame_in_flight() {
        let (session, mut activity) = MockSession::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = TunnelClientBuilder::new(source())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .connect(session.clone(), events_rx);

        await_activity(&mut activity).await; // initial connect
        events_tx.send(TunnelEvent::Connected).unwrap();

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.write_group_address(light(), DptValue::Bool(true)).await })
        };
        let second = {
            let client = client.clone();
            tokio::spawn(
                async move { client.write_group_address(light(), DptValue::Bool(false)).await },
            )
        };

        // exactly one telegram leaves before the ack
        await_activity(&mut activity).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.log.lock().await.telegrams.len(), 1);

        events_tx.send(TunnelEvent::TelegramAck).unwrap();
        await_activity(&mut activity).await;
        assert_eq!(session.log.lock().await.telegrams.len(), 2);

        events_tx.send(TunnelEvent::TelegramAck).unwrap();
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn nothing_drains_while_disconnected() {
        let (session, mut activity) = MockSession::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = TunnelClientBuilder::new(source())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .connect(session.clone(), events_rx);

        await_activity(&mut activity).await; // initial connect only

        let write = {
            let client = client.clone();
            tokio::spawn(async move { client.write_group_address(light(), DptValue::Bool(true)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.log.lock().await.telegrams.is_empty());

        // queue drains once the session reports connected
        events_tx.send(TunnelEvent::Connected).unwrap();
        await_activity(&mut activity).await;
        assert_eq!(session.log.lock().await.telegrams.len(), 1);
        events_tx.send(TunnelEvent::TelegramAck).unwrap();
        write.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn disconnect_fails_in_flight_and_reconnects() {
        let (session, mut activity) = MockSession::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = TunnelClientBuilder::new(source())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .connect(session.clone(), events_rx);

        await_activity(&mut activity).await;
        events_tx.send(TunnelEvent::Connected).unwrap();

        let write = {
            let client = client.clone();
            tokio::spawn(async move { client.write_group_address(light(), DptValue::Bool(true)).await })
        };
        await_activity(&mut activity).await; // telegram sent, ack pending

        events_tx
            .send(TunnelEvent::Disconnected(DisconnectReason::Requested))
            .unwrap();
        let result = write.await.unwrap();
        assert!(matches!(result, Err(ClientError::NotConnected)));

        // requested disconnects reconnect without backoff
        await_activity(&mut activity).await;
        assert_eq!(session.log.lock().await.connects, 2);
    }

    #[tokio::test]
    async fn inbound_telegrams_reach_subscribers() {
        let (session, mut activity) = MockSession::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = TunnelClientBuilder::new(source())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .connect(session, events_rx);
        await_activity(&mut activity).await;

        let mut subscription = client.subscribe().await.unwrap();
        let cemi = {
            let data = CemiData::group_request(
                IndividualAddress::new(1, 1, 1).unwrap(),
                light(),
                Apci::GroupWrite,
                GroupData::Short(1),
            );
            super::cemi_to_vec(&data).unwrap()
        };
        events_tx.send(TunnelEvent::Telegram(cemi)).unwrap();

        let (kind, telegram) = timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kind, TelegramKind::GroupWrite);
        assert_eq!(telegram.value, Some(DptValue::Bool(true)));
    }

    #[tokio::test]
    async fn read_round_trips_over_the_session() {
        let (session, mut activity) = MockSession::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = TunnelClientBuilder::new(source())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .connect(session.clone(), events_rx);
        await_activity(&mut activity).await;
        events_tx.send(TunnelEvent::Connected).unwrap();

        let reader = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .read_group_address_timeout(light(), Duration::from_millis(500))
                    .await
            })
        };

        // the session sees a group read
        await_activity(&mut activity).await;
        {
            let log = session.log.lock().await;
            let mut r = Reader::new(&log.telegrams[0]);
            let data = CemiData::decode(&mut r).unwrap();
            assert_eq!(data.apci, Some(Apci::GroupRead));
            assert_eq!(data.destination, Destination::Group(light()));
        }
        events_tx.send(TunnelEvent::TelegramAck).unwrap();

        // inject the response
        let response = CemiData {
            message_code: rustknx_core::cemi::MessageCode::DataIndicator,
            ..CemiData::group_request(
                IndividualAddress::new(1, 1, 7).unwrap(),
                light(),
                Apci::GroupResponse,
                GroupData::Short(1),
            )
        };
        events_tx
            .send(TunnelEvent::Telegram(super::cemi_to_vec(&response).unwrap()))
            .unwrap();

        let telegram = reader.await.unwrap().unwrap();
        assert_eq!(telegram.kind, TelegramKind::GroupResponse);
        assert_eq!(telegram.value, Some(DptValue::Bool(true)));
    }

    #[tokio::test]
    async fn unknown_address_is_rejected_without_sending() {
        let (session, mut activity) = MockSession::new();
        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let client = TunnelClientBuilder::new(source()).connect(session.clone(), events_rx);
        await_activity(&mut activity).await;

        let result = client
            .write_group_address(light(), DptValue::Bool(true))
            .await;
        assert!(matches!(result, Err(ClientError::UnknownGroupAddress(_))));
        assert!(session.log.lock().await.telegrams.is_empty());
    }
}
