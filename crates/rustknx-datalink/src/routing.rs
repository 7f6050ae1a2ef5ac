//! The multicast UDP transport behind routing clients.
//!
//! Binds a reuse-address socket to the routing port, joins the KNX system
//! multicast group and loops sent datagrams back so co-located clients see
//! each other. When the configured group address is not a multicast address
//! the join is skipped, which lets tests run the transport over plain
//! loopback sockets.

use crate::{DataLink, DataLinkError};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// KNXnet/IP discovery and routing port.
pub const KNX_PORT: u16 = 3671;
/// KNXnet/IP system setup multicast address.
pub const KNX_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 23, 12);

const MAX_DATAGRAM_LEN: usize = 1600;

/// Construction parameters for [`RoutingTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingTransportConfig {
    /// The multicast group datagrams are sent to and received from.
    pub group: SocketAddrV4,
    /// Local interface used for the multicast join.
    pub local_ip: Ipv4Addr,
}

impl Default for RoutingTransportConfig {
    fn default() -> Self {
        Self {
            group: SocketAddrV4::new(KNX_MULTICAST_ADDR, KNX_PORT),
            local_ip: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// A UDP socket joined to the KNX routing multicast group.
#[derive(Debug, Clone)]
pub struct RoutingTransport {
    socket: Arc<UdpSocket>,
    group: SocketAddr,
}

impl RoutingTransport {
    /// Binds to the group's port on all interfaces and joins the group.
    pub async fn bind(config: RoutingTransportConfig) -> Result<Self, DataLinkError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.group.port());
        socket.bind(&SocketAddr::V4(bind_addr).into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        if config.group.ip().is_multicast() {
            socket.join_multicast_v4(*config.group.ip(), config.local_ip)?;
            socket.set_multicast_loop_v4(true)?;
            let _ = socket.set_multicast_ttl_v4(1);
            log::debug!(
                "joined multicast group {} on interface {}",
                config.group.ip(),
                config.local_ip
            );
        }

        Ok(Self {
            socket: Arc::new(socket),
            group: SocketAddr::V4(config.group),
        })
    }

    /// Binds to an ephemeral local port without joining any group, with
    /// `peer` as the send target. Used for unicast test setups.
    pub async fn bind_unicast(peer: SocketAddrV4) -> Result<Self, DataLinkError> {
        let socket =
            UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))).await?;
        Ok(Self {
            socket: Arc::new(socket),
            group: SocketAddr::V4(peer),
        })
    }

    /// The group (or peer) address sends are directed at.
    pub fn group(&self) -> SocketAddr {
        self.group
    }
}

impl DataLink for RoutingTransport {
    async fn send(&self, payload: &[u8]) -> Result<(), DataLinkError> {
        if payload.len() > MAX_DATAGRAM_LEN {
            return Err(DataLinkError::FrameTooLarge);
        }
        self.socket.send_to(payload, self.group).await?;
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), DataLinkError> {
        let (n, src) = self.socket.recv_from(buf).await?;
        Ok((n, src))
    }

    fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        self.socket.local_addr().map_err(DataLinkError::Io)
    }
}
