use rustknx_core::address::GroupAddress;
use rustknx_core::dpt::{DptDecodeError, DptEncodeError};
use rustknx_core::{DecodeError, EncodeError};
use rustknx_datalink::DataLinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("datapoint encode error: {0}")]
    DatapointEncode(#[from] DptEncodeError),
    #[error("datapoint decode error: {0}")]
    DatapointDecode(#[from] DptDecodeError),
    #[error("unknown group address {0}")]
    UnknownGroupAddress(GroupAddress),
    #[error("request timed out")]
    Timeout,
    #[error("tunnel not connected")]
    NotConnected,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("client task stopped")]
    ClientStopped,
}
