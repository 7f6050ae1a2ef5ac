//! KNXnet/IP frames.
//!
//! Every datagram starts with the fixed six-byte header `{0x06, 0x10,
//! service_type:u16, total_length:u16}`. The body codec is selected by the
//! service type; services this crate does not process (connect, tunnelling,
//! secure, object server) are recognised in the enumeration but surfaced as
//! opaque bodies.

pub mod dib;
pub mod hpai;
pub mod routing;
pub mod search;

pub use dib::{AssignmentMethod, DeviceInfo, Dib, DibType, IpConfig, IpCurrentConfig};
pub use hpai::{HostProtocol, Hpai};
pub use routing::{RoutingBusy, RoutingIndication, RoutingLost};
pub use search::{DescriptionRequest, DescriptionResponse, SearchRequest, SearchResponse};

use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Fixed header length of KNXnet/IP v1.0.
pub const HEADER_LENGTH: u8 = 0x06;
/// Protocol version byte of KNXnet/IP v1.0.
pub const PROTOCOL_VERSION: u8 = 0x10;
/// Largest datagram the codec will emit.
pub const MAX_FRAME_LEN: usize = 1600;

/// KNXnet/IP service type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    SearchRequest,
    SearchResponse,
    DescriptionRequest,
    DescriptionResponse,
    ConnectRequest,
    ConnectResponse,
    ConnectionStateRequest,
    ConnectionStateResponse,
    DisconnectRequest,
    DisconnectResponse,
    DeviceConfigurationRequest,
    DeviceConfigurationAck,
    TunnellingRequest,
    TunnellingAck,
    RoutingIndication,
    RoutingLostMessage,
    RoutingBusy,
    SecureWrapper,
    SecureSessionRequest,
    SecureSessionResponse,
    SecureSessionAuthenticate,
    SecureSessionStatus,
    SecureTimerNotify,
    ObjectServer,
    Unknown(u16),
}

impl ServiceType {
    pub const fn from_u16(value: u16) -> Self {
        match value {
            0x0201 => Self::SearchRequest,
            0x0202 => Self::SearchResponse,
            0x0203 => Self::DescriptionRequest,
            0x0204 => Self::DescriptionResponse,
            0x0205 => Self::ConnectRequest,
            0x0206 => Self::ConnectResponse,
            0x0207 => Self::ConnectionStateRequest,
            0x0208 => Self::ConnectionStateResponse,
            0x0209 => Self::DisconnectRequest,
            0x020A => Self::DisconnectResponse,
            0x0310 => Self::DeviceConfigurationRequest,
            0x0311 => Self::DeviceConfigurationAck,
            0x0420 => Self::TunnellingRequest,
            0x0421 => Self::TunnellingAck,
            0x0530 => Self::RoutingIndication,
            0x0531 => Self::RoutingLostMessage,
            0x0532 => Self::RoutingBusy,
            0x0950 => Self::SecureWrapper,
            0x0951 => Self::SecureSessionRequest,
            0x0952 => Self::SecureSessionResponse,
            0x0953 => Self::SecureSessionAuthenticate,
            0x0954 => Self::SecureSessionStatus,
            0x0955 => Self::SecureTimerNotify,
            0xF080 => Self::ObjectServer,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u16(self) -> u16 {
        match self {
            Self::SearchRequest => 0x0201,
            Self::SearchResponse => 0x0202,
            Self::DescriptionRequest => 0x0203,
            Self::DescriptionResponse => 0x0204,
            Self::ConnectRequest => 0x0205,
            Self::ConnectResponse => 0x0206,
            Self::ConnectionStateRequest => 0x0207,
            Self::ConnectionStateResponse => 0x0208,
            Self::DisconnectRequest => 0x0209,
            Self::DisconnectResponse => 0x020A,
            Self::DeviceConfigurationRequest => 0x0310,
            Self::DeviceConfigurationAck => 0x0311,
            Self::TunnellingRequest => 0x0420,
            Self::TunnellingAck => 0x0421,
            Self::RoutingIndication => 0x0530,
            Self::RoutingLostMessage => 0x0531,
            Self::RoutingBusy => 0x0532,
            Self::SecureWrapper => 0x0950,
            Self::SecureSessionRequest => 0x0951,
            Self::SecureSessionResponse => 0x0952,
            Self::SecureSessionAuthenticate => 0x0953,
            Self::SecureSessionStatus => 0x0954,
            Self::SecureTimerNotify => 0x0955,
            Self::ObjectServer => 0xF080,
            Self::Unknown(v) => v,
        }
    }
}

/// Outcome of the outer-frame decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Length field disagrees with the datagram size; drop without
    /// further inspection.
    Invalid,
    /// Unsupported header length or protocol version; not ours to parse.
    Ignore,
    /// The header was fine but the body failed to parse.
    Body(DecodeError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("frame length mismatch"),
            Self::Ignore => f.write_str("unsupported header or protocol version"),
            Self::Body(e) => write!(f, "body decode failed: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

impl From<DecodeError> for FrameError {
    fn from(e: DecodeError) -> Self {
        Self::Body(e)
    }
}

/// Encode capability of a frame body.
///
/// Implemented by every structured body type and by [`RawBody`] for
/// pre-encoded payloads; `encode_frame` wraps the body bytes with the outer
/// header and computes the total length.
pub trait FrameBody {
    fn service_type(&self) -> ServiceType;
    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError>;
}

/// A pre-encoded or deliberately unparsed body: encoding returns its own
/// bytes unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody {
    pub service_type: ServiceType,
    pub payload: Vec<u8>,
}

impl FrameBody for RawBody {
    fn service_type(&self) -> ServiceType {
        self.service_type
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_all(&self.payload)
    }
}

/// A decoded KNXnet/IP datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    SearchRequest(SearchRequest),
    SearchResponse(SearchResponse),
    DescriptionRequest(DescriptionRequest),
    DescriptionResponse(DescriptionResponse),
    RoutingIndication(RoutingIndication),
    RoutingLostMessage(RoutingLost),
    RoutingBusy(RoutingBusy),
    /// Recognised service type without a body codec in this crate, or an
    /// unknown service type altogether. The payload is kept verbatim.
    Unsupported(RawBody),
}

impl Frame {
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::SearchRequest(_) => ServiceType::SearchRequest,
            Self::SearchResponse(_) => ServiceType::SearchResponse,
            Self::DescriptionRequest(_) => ServiceType::DescriptionRequest,
            Self::DescriptionResponse(_) => ServiceType::DescriptionResponse,
            Self::RoutingIndication(_) => ServiceType::RoutingIndication,
            Self::RoutingLostMessage(_) => ServiceType::RoutingLostMessage,
            Self::RoutingBusy(_) => ServiceType::RoutingBusy,
            Self::Unsupported(raw) => raw.service_type,
        }
    }

    /// Decodes one datagram. The buffer must hold exactly one frame.
    pub fn decode(datagram: &[u8]) -> Result<Self, FrameError> {
        let mut r = Reader::new(datagram);
        let header_length = r.read_u8().map_err(|_| FrameError::Invalid)?;
        let version = r.read_u8().map_err(|_| FrameError::Invalid)?;
        let service_type = ServiceType::from_u16(r.read_be_u16().map_err(|_| FrameError::Invalid)?);
        let total_length = r.read_be_u16().map_err(|_| FrameError::Invalid)?;
        if total_length as usize != datagram.len() {
            return Err(FrameError::Invalid);
        }
        if header_length != HEADER_LENGTH || version != PROTOCOL_VERSION {
            return Err(FrameError::Ignore);
        }

        let frame = match service_type {
            ServiceType::SearchRequest => Self::SearchRequest(SearchRequest::decode(&mut r)?),
            ServiceType::SearchResponse => Self::SearchResponse(SearchResponse::decode(&mut r)?),
            ServiceType::DescriptionRequest => {
                Self::DescriptionRequest(DescriptionRequest::decode(&mut r)?)
            }
            ServiceType::DescriptionResponse => {
                Self::DescriptionResponse(DescriptionResponse::decode(&mut r)?)
            }
            ServiceType::RoutingIndication => {
                Self::RoutingIndication(RoutingIndication::decode(&mut r)?)
            }
            ServiceType::RoutingLostMessage => {
                Self::RoutingLostMessage(RoutingLost::decode(&mut r)?)
            }
            ServiceType::RoutingBusy => Self::RoutingBusy(RoutingBusy::decode(&mut r)?),
            other => Self::Unsupported(RawBody {
                service_type: other,
                payload: r.read_rest().to_vec(),
            }),
        };
        Ok(frame)
    }
}

impl FrameBody for Frame {
    fn service_type(&self) -> ServiceType {
        Frame::service_type(self)
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::SearchRequest(b) => b.encode_body(w),
            Self::SearchResponse(b) => b.encode_body(w),
            Self::DescriptionRequest(b) => b.encode_body(w),
            Self::DescriptionResponse(b) => b.encode_body(w),
            Self::RoutingIndication(b) => b.encode_body(w),
            Self::RoutingLostMessage(b) => b.encode_body(w),
            Self::RoutingBusy(b) => b.encode_body(w),
            Self::Unsupported(b) => b.encode_body(w),
        }
    }
}

/// Encodes `body` with the outer header into `buf`, returning the datagram
/// length. The total-length field is patched once the body size is known.
pub fn encode_frame(body: &dyn FrameBody, buf: &mut [u8]) -> Result<usize, EncodeError> {
    let mut w = Writer::new(buf);
    w.write_u8(HEADER_LENGTH)?;
    w.write_u8(PROTOCOL_VERSION)?;
    w.write_be_u16(body.service_type().to_u16())?;
    w.write_be_u16(0)?;
    body.encode_body(&mut w)?;
    let total = w.position();
    if total > u16::MAX as usize {
        return Err(EncodeError::StructureTooLong);
    }
    w.patch_be_u16(4, total as u16)?;
    Ok(total)
}

/// Allocating convenience wrapper around [`encode_frame`].
pub fn frame_to_vec(body: &dyn FrameBody) -> Result<Vec<u8>, EncodeError> {
    let mut buf = vec![0u8; MAX_FRAME_LEN];
    let len = encode_frame(body, &mut buf)?;
    buf.truncate(len);
    Ok(buf)
}
