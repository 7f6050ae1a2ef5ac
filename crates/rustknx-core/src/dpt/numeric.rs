//! Whole-octet integer datapoints: 5.* (u8), 6.* (i8), 7.* (u16),
//! 8.* (i16), 12.* (u32), 13.* (i32), 29.* (i64). The 8-bit enumerations
//! (20.*) and counter pairs (25.*) share the u8 codec.

use super::{encode_err, fixed_bytes, single_byte, DptDecodeError, DptEncodeError, DptId, DptValue};
use crate::cemi::GroupData;
use alloc::vec;

pub(super) fn encode_u8(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Unsigned8(v) => Ok(GroupData::Bytes(vec![*v])),
        _ => Err(encode_err(value, dpt, "expected an unsigned 8-bit value")),
    }
}

pub(super) fn decode_u8(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    Ok(DptValue::Unsigned8(single_byte(data, dpt)?))
}

pub(super) fn encode_i8(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Signed8(v) => Ok(GroupData::Bytes(vec![*v as u8])),
        _ => Err(encode_err(value, dpt, "expected a signed 8-bit value")),
    }
}

pub(super) fn decode_i8(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    Ok(DptValue::Signed8(single_byte(data, dpt)? as i8))
}

pub(super) fn encode_u16(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Unsigned16(v) => Ok(GroupData::Bytes(v.to_be_bytes().to_vec())),
        _ => Err(encode_err(value, dpt, "expected an unsigned 16-bit value")),
    }
}

pub(super) fn decode_u16(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 2, dpt)?;
    Ok(DptValue::Unsigned16(u16::from_be_bytes([b[0], b[1]])))
}

pub(super) fn encode_i16(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Signed16(v) => Ok(GroupData::Bytes(v.to_be_bytes().to_vec())),
        _ => Err(encode_err(value, dpt, "expected a signed 16-bit value")),
    }
}

pub(super) fn decode_i16(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 2, dpt)?;
    Ok(DptValue::Signed16(i16::from_be_bytes([b[0], b[1]])))
}

pub(super) fn encode_u32(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Unsigned32(v) => Ok(GroupData::Bytes(v.to_be_bytes().to_vec())),
        _ => Err(encode_err(value, dpt, "expected an unsigned 32-bit value")),
    }
}

pub(super) fn decode_u32(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 4, dpt)?;
    Ok(DptValue::Unsigned32(u32::from_be_bytes([
        b[0], b[1], b[2], b[3],
    ])))
}

pub(super) fn encode_i32(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Signed32(v) => Ok(GroupData::Bytes(v.to_be_bytes().to_vec())),
        _ => Err(encode_err(value, dpt, "expected a signed 32-bit value")),
    }
}

pub(super) fn decode_i32(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 4, dpt)?;
    Ok(DptValue::Signed32(i32::from_be_bytes([
        b[0], b[1], b[2], b[3],
    ])))
}

pub(super) fn encode_i64(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Signed64(v) => Ok(GroupData::Bytes(v.to_be_bytes().to_vec())),
        _ => Err(encode_err(value, dpt, "expected a signed 64-bit value")),
    }
}

pub(super) fn decode_i64(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 8, dpt)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(b);
    Ok(DptValue::Signed64(i64::from_be_bytes(raw)))
}
