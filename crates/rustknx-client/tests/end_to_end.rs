//! Full-stack flows: datagram in → client → cache, and cache write → datagram out.

use rustknx_client::{GroupValueCacheBuilder, HydrationMode, RoutingClientBuilder};
use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::dpt::DptValue;
use rustknx_datalink::{DataLink, DataLinkError};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

/// Group write of `true` from 1.1.1 to 1/2/3, as seen on the wire.
const WRITE_ON: [u8; 17] = [
    0x06, 0x10, 0x05, 0x30, 0x00, 0x11, 0x29, 0x00, 0xBC, 0xE0, 0x11, 0x01, 0x0A, 0x03, 0x01,
    0x00, 0x81,
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
        buf[..payload.len()].copy_from_slice(&payload);
        Ok((payload.len(), SocketAddr::from((Ipv4Addr::LOCALHOST, 3671))))
    }

    fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        Ok(SocketAddr::from((Ipv4Addr::new(192, 168, 1, 5), 3671)))
    }
}

fn datalink() -> (
    ChannelDataLink,
    mpsc::UnboundedSender<Vec<u8>>,
    mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let (to_bus, sent) = mpsc::unbounded_channel();
    let (inject, from_bus) = mpsc::unbounded_channel();
    (
        ChannelDataLink {
            to_bus,
            from_bus: Arc::new(Mutex::new(from_bus)),
        },
        inject,
        sent,
    )
}

fn light() -> GroupAddress {
    GroupAddress::new(1, 2, 3).unwrap()
}

#[tokio::test]
async fn received_write_lands_in_cache() {
    let (datalink, inject, _sent) = datalink();
    let client = Arc::new(
        RoutingClientBuilder::new(IndividualAddress::new(1, 1, 250).unwrap())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .with_datalink(datalink),
    );
    let cache = GroupValueCacheBuilder::new(client)
        .entry(light(), "1.001".parse().unwrap(), None)
        .hydrate_on_start(HydrationMode::None)
        .start()
        .await
        .unwrap();
    cache.wait_for_startup().await;

    let before = SystemTime::now();
    inject.send(WRITE_ON.to_vec()).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    let entry = loop {
        let entry = cache.get(light()).unwrap();
        if entry.value.is_some() {
            break entry;
        }
        assert!(tokio::time::Instant::now() < deadline, "cache never updated");
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(entry.value, Some(DptValue::Bool(true)));
    assert!(entry.last_update.unwrap() >= before);
}

#[tokio::test]
async fn cache_write_through_emits_datagram() {
    let (datalink, _inject, mut sent) = datalink();
    let client = Arc::new(
        RoutingClientBuilder::new(IndividualAddress::new(1, 1, 250).unwrap())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .with_datalink(datalink),
    );
    let cache = GroupValueCacheBuilder::new(client)
        .entry(light(), "1.001".parse().unwrap(), None)
        .start()
        .await
        .unwrap();
    cache.wait_for_startup().await;

    cache.write(light(), DptValue::Bool(false)).await.unwrap();

    let datagram = timeout(Duration::from_secs(1), sent.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(datagram.len(), 17);
    assert_eq!(datagram.last().unwrap() & 0x01, 0);
    assert_eq!(cache.get(light()).unwrap().value, Some(DptValue::Bool(false)));
    assert_eq!(cache.to_hydration_state().len(), 1);
}

#[tokio::test]
async fn hydration_reads_over_the_wire() {
    let (datalink, inject, mut sent) = datalink();
    let client = Arc::new(
        RoutingClientBuilder::new(IndividualAddress::new(1, 1, 250).unwrap())
            .group_addresses([("1/2/3", "1.001")])
            .unwrap()
            .with_datalink(datalink),
    );

    // answer the hydration read with a group response
    let responder = tokio::spawn(async move {
        let datagram = timeout(Duration::from_secs(1), sent.recv())
            .await
            .unwrap()
            .unwrap();
        // a group read for 1/2/3
        assert_eq!(&datagram[12..], &[0x0A, 0x03, 0x01, 0x00, 0x00]);
        let mut response = WRITE_ON.to_vec();
        response[16] = 0x41; // APCI group response, value 1
        inject.send(response).unwrap();
    });

    let cache = GroupValueCacheBuilder::new(client)
        .entry(light(), "1.001".parse().unwrap(), None)
        .hydrate_on_start(HydrationMode::All)
        .start()
        .await
        .unwrap();
    timeout(Duration::from_secs(2), cache.wait_for_startup())
        .await
        .unwrap();
    responder.await.unwrap();

    assert_eq!(cache.get(light()).unwrap().value, Some(DptValue::Bool(true)));
}
