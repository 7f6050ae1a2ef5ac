//! Character and string datapoints: 4.001/4.002 (single character),
//! 16.000/16.001 (fixed 14-octet strings), 24.001 (variable Latin-1) and
//! 28.001 (variable UTF-8). The fixed and variable strings are
//! NUL-padded/-terminated on the wire.

use super::{decode_err, encode_err, single_byte, DptDecodeError, DptEncodeError, DptId, DptValue};
use crate::cemi::GroupData;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

const FIXED_STRING_LEN: usize = 14;

/// Character sets used by the text datapoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Ascii,
    Latin1,
}

impl Charset {
    fn for_sub(dpt: DptId) -> Result<Self, &'static str> {
        match dpt.sub() {
            Some(0) => Ok(Self::Ascii),
            Some(1) => Ok(Self::Latin1),
            _ => Err("unsupported datapoint type"),
        }
    }
}

fn char_to_byte(c: char, charset: Charset) -> Option<u8> {
    let code = u32::from(c);
    match charset {
        Charset::Ascii if code < 0x80 => Some(code as u8),
        Charset::Latin1 if code < 0x100 => Some(code as u8),
        _ => None,
    }
}

fn byte_to_char(b: u8, charset: Charset) -> Option<char> {
    match charset {
        Charset::Ascii if b < 0x80 => Some(b as char),
        Charset::Ascii => None,
        // Latin-1 maps directly onto the first 256 Unicode scalars.
        Charset::Latin1 => Some(b as char),
    }
}

pub(super) fn encode_char(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Char(c) = value else {
        return Err(encode_err(value, dpt, "expected a character"));
    };
    let charset = match dpt.sub() {
        Some(1) => Charset::Ascii,
        Some(2) => Charset::Latin1,
        _ => return Err(encode_err(value, dpt, "unsupported datapoint type")),
    };
    match char_to_byte(*c, charset) {
        Some(byte) => Ok(GroupData::Bytes(vec![byte])),
        None => Err(encode_err(value, dpt, "character outside charset")),
    }
}

pub(super) fn decode_char(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let byte = single_byte(data, dpt)?;
    let charset = match dpt.sub() {
        Some(1) => Charset::Ascii,
        Some(2) => Charset::Latin1,
        _ => return Err(decode_err(dpt, "unsupported datapoint type")),
    };
    byte_to_char(byte, charset)
        .map(DptValue::Char)
        .ok_or(decode_err(dpt, "byte outside charset"))
}

pub(super) fn encode_fixed_string(
    value: &DptValue,
    dpt: DptId,
) -> Result<GroupData, DptEncodeError> {
    let DptValue::Text(s) = value else {
        return Err(encode_err(value, dpt, "expected a string"));
    };
    let charset = Charset::for_sub(dpt).map_err(|reason| encode_err(value, dpt, reason))?;
    let mut bytes = [0u8; FIXED_STRING_LEN];
    let mut len = 0;
    for c in s.chars() {
        if len == FIXED_STRING_LEN {
            return Err(encode_err(value, dpt, "string longer than 14 octets"));
        }
        bytes[len] = char_to_byte(c, charset)
            .ok_or_else(|| encode_err(value, dpt, "character outside charset"))?;
        len += 1;
    }
    Ok(GroupData::Bytes(bytes.to_vec()))
}

pub(super) fn decode_fixed_string(
    data: &GroupData,
    dpt: DptId,
) -> Result<DptValue, DptDecodeError> {
    let charset = Charset::for_sub(dpt).map_err(|reason| decode_err(dpt, reason))?;
    let bytes = match data {
        GroupData::Bytes(b) if b.len() == FIXED_STRING_LEN => b,
        _ => return Err(decode_err(dpt, "expected 14 data octets")),
    };
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    decode_bytes(&bytes[..end], charset, dpt)
}

pub(super) fn encode_terminated_string(
    value: &DptValue,
    dpt: DptId,
) -> Result<GroupData, DptEncodeError> {
    let DptValue::Text(s) = value else {
        return Err(encode_err(value, dpt, "expected a string"));
    };
    let mut bytes: Vec<u8> = match dpt.main() {
        28 => s.as_bytes().to_vec(),
        _ => {
            let mut out = Vec::with_capacity(s.len() + 1);
            for c in s.chars() {
                out.push(
                    char_to_byte(c, Charset::Latin1)
                        .ok_or_else(|| encode_err(value, dpt, "character outside charset"))?,
                );
            }
            out
        }
    };
    if bytes.contains(&0) {
        return Err(encode_err(value, dpt, "string contains NUL"));
    }
    bytes.push(0);
    Ok(GroupData::Bytes(bytes))
}

pub(super) fn decode_terminated_string(
    data: &GroupData,
    dpt: DptId,
) -> Result<DptValue, DptDecodeError> {
    let bytes = match data {
        GroupData::Bytes(b) => b.as_slice(),
        GroupData::Short(0) => &[],
        GroupData::Short(_) => return Err(decode_err(dpt, "expected a byte payload")),
    };
    let content = match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    };
    if dpt.main() == 28 {
        let s = core::str::from_utf8(content)
            .map_err(|_| decode_err(dpt, "invalid utf-8"))?;
        Ok(DptValue::Text(String::from(s)))
    } else {
        decode_bytes(content, Charset::Latin1, dpt)
    }
}

fn decode_bytes(bytes: &[u8], charset: Charset, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let mut s = String::with_capacity(bytes.len());
    for &b in bytes {
        s.push(byte_to_char(b, charset).ok_or(decode_err(dpt, "byte outside charset"))?);
    }
    Ok(DptValue::Text(s))
}
