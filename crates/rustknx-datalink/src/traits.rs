use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur at the data-link layer.
#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame too large")]
    FrameTooLarge,
    #[error("invalid frame")]
    InvalidFrame,
    #[error("not connected")]
    NotConnected,
}

/// Async trait for sending and receiving raw KNXnet/IP datagrams.
///
/// Implementors include [`RoutingTransport`](crate::RoutingTransport) for
/// multicast routing; tests substitute in-memory channel transports. The
/// methods are declared in desugared form so client tasks generic over a
/// `DataLink` stay spawnable; implementations can still use `async fn`.
pub trait DataLink: Send + Sync {
    /// Sends one datagram to the transport's peer (the multicast group for
    /// routing transports).
    fn send(&self, payload: &[u8]) -> impl Future<Output = Result<(), DataLinkError>> + Send;

    /// Receives one datagram into `buf`, returning `(bytes_read, source)`.
    fn recv(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(usize, SocketAddr), DataLinkError>> + Send;

    /// The local endpoint, advertised in outgoing HPAIs.
    fn local_addr(&self) -> Result<SocketAddr, DataLinkError>;
}
