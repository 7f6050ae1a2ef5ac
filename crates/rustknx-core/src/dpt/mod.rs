//! KNX Datapoint Types.
//!
//! A datapoint type gives the raw bits on a group address a typed meaning.
//! Types are identified by a `main.sub` pair written `"9.001"`; a wildcard
//! sub (`"9.*"`) selects the family codec, which is all a client needs when
//! only the wire format matters. The codec is a single dispatch keyed by the
//! identifier; each family lives in its own module.

pub mod bits;
pub mod datetime;
pub mod float;
pub mod numeric;
pub mod status;
pub mod text;

pub use datetime::{Date, DateTime, TimeOfDay, Timestamp};
pub use status::{AccessData, AlarmData, CombinedOnOff, StatusMode3};

use crate::cemi::GroupData;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

/// A datapoint type identifier: main number plus sub number or wildcard.
///
/// The canonical string form zero-pads the sub number to three digits
/// (`"1.001"`) and writes the wildcard as `"1.*"`; both round-trip through
/// [`FromStr`]/[`fmt::Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DptId {
    main: u16,
    sub: Option<u16>,
}

impl DptId {
    pub const fn new(main: u16, sub: u16) -> Self {
        Self {
            main,
            sub: Some(sub),
        }
    }

    /// The family wildcard, e.g. `9.*`.
    pub const fn family(main: u16) -> Self {
        Self { main, sub: None }
    }

    pub const fn main(self) -> u16 {
        self.main
    }

    pub const fn sub(self) -> Option<u16> {
        self.sub
    }
}

impl fmt::Display for DptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub {
            Some(sub) => write!(f, "{}.{:03}", self.main, sub),
            None => write!(f, "{}.*", self.main),
        }
    }
}

/// Error from parsing a datapoint type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DptIdParseError;

impl fmt::Display for DptIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid datapoint type string")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DptIdParseError {}

impl FromStr for DptId {
    type Err = DptIdParseError;

    fn from_str(s: &str) -> Result<Self, DptIdParseError> {
        let (main, sub) = s.split_once('.').ok_or(DptIdParseError)?;
        if main.is_empty() || !main.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DptIdParseError);
        }
        let main = main.parse::<u16>().map_err(|_| DptIdParseError)?;
        if sub == "*" {
            return Ok(Self::family(main));
        }
        if sub.is_empty() || !sub.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DptIdParseError);
        }
        let sub = sub.parse::<u16>().map_err(|_| DptIdParseError)?;
        Ok(Self::new(main, sub))
    }
}

/// A decoded application value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DptValue {
    /// DPT 1.*
    Bool(bool),
    /// DPT 2.*: a value bit gated by a control bit.
    Control { control: bool, value: bool },
    /// DPT 3.*: dimming / blind step.
    Dimming { control: bool, step: u8 },
    /// DPT 4.001 / 4.002
    Char(char),
    /// DPT 5.*, 20.*, 25.001
    Unsigned8(u8),
    /// DPT 6.* (except 6.020)
    Signed8(i8),
    /// DPT 6.020
    StatusMode3(StatusMode3),
    /// DPT 7.*
    Unsigned16(u16),
    /// DPT 8.*
    Signed16(i16),
    /// DPT 9.*: the KNX 16-bit float.
    Float16(f32),
    /// DPT 10.001
    TimeOfDay(TimeOfDay),
    /// DPT 11.001
    Date(Date),
    /// DPT 12.*
    Unsigned32(u32),
    /// DPT 13.*
    Signed32(i32),
    /// DPT 14.*
    Float32(f32),
    /// DPT 15.000
    Access(AccessData),
    /// DPT 16.*, 24.001, 28.001
    Text(String),
    /// DPT 17.001
    Scene(u8),
    /// DPT 18.001
    SceneControl { control: bool, scene: u8 },
    /// DPT 19.001
    DateTime(DateTime),
    /// DPT 21.*
    Bits8([bool; 8]),
    /// DPT 22.*
    Bits16([bool; 16]),
    /// DPT 23.*
    TwoBits { a: bool, b: bool },
    /// DPT 26.001
    SceneInfo { active: bool, scene: u8 },
    /// DPT 27.001
    CombinedOnOff(CombinedOnOff),
    /// DPT 29.*
    Signed64(i64),
    /// DPT 219.001
    Alarm(AlarmData),
    /// Pre-encoded bits, used on group addresses with no configured type.
    Raw(GroupData),
}

/// A value could not be turned into wire bits.
#[derive(Debug, Clone, PartialEq)]
pub struct DptEncodeError {
    pub value: DptValue,
    pub dpt: DptId,
    pub reason: &'static str,
}

impl fmt::Display for DptEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot encode {:?} as {}: {}", self.value, self.dpt, self.reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DptEncodeError {}

/// Wire bits did not match the datapoint's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DptDecodeError {
    pub dpt: DptId,
    pub reason: &'static str,
}

impl fmt::Display for DptDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot decode {}: {}", self.dpt, self.reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DptDecodeError {}

pub(crate) fn encode_err(
    value: &DptValue,
    dpt: DptId,
    reason: &'static str,
) -> DptEncodeError {
    DptEncodeError {
        value: value.clone(),
        dpt,
        reason,
    }
}

pub(crate) fn decode_err(dpt: DptId, reason: &'static str) -> DptDecodeError {
    DptDecodeError { dpt, reason }
}

/// Encodes `value` for the given datapoint type.
pub fn encode(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    if let DptValue::Raw(data) = value {
        return Ok(data.clone());
    }
    match dpt.main() {
        1 => bits::encode_bool(value, dpt),
        2 => bits::encode_control(value, dpt),
        3 => bits::encode_dimming(value, dpt),
        4 => text::encode_char(value, dpt),
        5 => numeric::encode_u8(value, dpt),
        6 => match dpt.sub() {
            Some(20) => status::encode_status_mode3(value, dpt),
            _ => numeric::encode_i8(value, dpt),
        },
        7 => numeric::encode_u16(value, dpt),
        8 => numeric::encode_i16(value, dpt),
        9 => float::encode_f16(value, dpt),
        10 => datetime::encode_time_of_day(value, dpt),
        11 => datetime::encode_date(value, dpt),
        12 => numeric::encode_u32(value, dpt),
        13 => numeric::encode_i32(value, dpt),
        14 => float::encode_f32(value, dpt),
        15 => status::encode_access(value, dpt),
        16 => text::encode_fixed_string(value, dpt),
        17 => status::encode_scene(value, dpt),
        18 => status::encode_scene_control(value, dpt),
        19 => datetime::encode_date_time(value, dpt),
        20 | 25 => numeric::encode_u8(value, dpt),
        21 => status::encode_bits8(value, dpt),
        22 => status::encode_bits16(value, dpt),
        23 => bits::encode_two_bits(value, dpt),
        24 | 28 => text::encode_terminated_string(value, dpt),
        26 => status::encode_scene_info(value, dpt),
        27 => status::encode_combined_on_off(value, dpt),
        29 => numeric::encode_i64(value, dpt),
        219 => status::encode_alarm(value, dpt),
        _ => Err(encode_err(value, dpt, "unsupported datapoint type")),
    }
}

/// Decodes wire bits for the given datapoint type.
pub fn decode(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    // A six-bit empty payload decodes to the zero of the plain numeric
    // families; the calendar types have no meaningful zero.
    if let GroupData::Short(0) = data {
        match dpt.main() {
            5 => return Ok(DptValue::Unsigned8(0)),
            6 if dpt.sub() != Some(20) => return Ok(DptValue::Signed8(0)),
            7 => return Ok(DptValue::Unsigned16(0)),
            8 => return Ok(DptValue::Signed16(0)),
            9 => return Ok(DptValue::Float16(0.0)),
            12 => return Ok(DptValue::Unsigned32(0)),
            13 => return Ok(DptValue::Signed32(0)),
            14 => return Ok(DptValue::Float32(0.0)),
            _ => {}
        }
    }
    match dpt.main() {
        1 => bits::decode_bool(data, dpt),
        2 => bits::decode_control(data, dpt),
        3 => bits::decode_dimming(data, dpt),
        4 => text::decode_char(data, dpt),
        5 => numeric::decode_u8(data, dpt),
        6 => match dpt.sub() {
            Some(20) => status::decode_status_mode3(data, dpt),
            _ => numeric::decode_i8(data, dpt),
        },
        7 => numeric::decode_u16(data, dpt),
        8 => numeric::decode_i16(data, dpt),
        9 => float::decode_f16(data, dpt),
        10 => datetime::decode_time_of_day(data, dpt),
        11 => datetime::decode_date(data, dpt),
        12 => numeric::decode_u32(data, dpt),
        13 => numeric::decode_i32(data, dpt),
        14 => float::decode_f32(data, dpt),
        15 => status::decode_access(data, dpt),
        16 => text::decode_fixed_string(data, dpt),
        17 => status::decode_scene(data, dpt),
        18 => status::decode_scene_control(data, dpt),
        19 => datetime::decode_date_time(data, dpt),
        20 | 25 => numeric::decode_u8(data, dpt),
        21 => status::decode_bits8(data, dpt),
        22 => status::decode_bits16(data, dpt),
        23 => bits::decode_two_bits(data, dpt),
        24 | 28 => text::decode_terminated_string(data, dpt),
        26 => status::decode_scene_info(data, dpt),
        27 => status::decode_combined_on_off(data, dpt),
        29 => numeric::decode_i64(data, dpt),
        219 => status::decode_alarm(data, dpt),
        _ => Err(decode_err(dpt, "unsupported datapoint type")),
    }
}

/// A single byte-aligned octet, shared by the one-byte codecs.
pub(crate) fn single_byte(data: &GroupData, dpt: DptId) -> Result<u8, DptDecodeError> {
    match data {
        GroupData::Bytes(b) if b.len() == 1 => Ok(b[0]),
        _ => Err(decode_err(dpt, "expected one data octet")),
    }
}

/// Exactly `n` octets, shared by the fixed-width codecs.
pub(crate) fn fixed_bytes<'a>(
    data: &'a GroupData,
    n: usize,
    dpt: DptId,
) -> Result<&'a [u8], DptDecodeError> {
    match data {
        GroupData::Bytes(b) if b.len() == n => Ok(b),
        _ => Err(decode_err(dpt, "unexpected payload width")),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, DptId, DptValue};
    use crate::cemi::GroupData;
    use alloc::string::ToString;
    use alloc::vec;
    use core::str::FromStr;

    #[test]
    fn dpt_id_string_roundtrip() {
        for s in ["1.001", "9.*", "16.000", "219.001", "5.010"] {
            let id = DptId::from_str(s).unwrap();
            assert_eq!(id.to_string(), s);
        }
        assert_eq!(DptId::from_str("1.1").unwrap(), DptId::new(1, 1));
        assert_eq!(DptId::from_str("1.1").unwrap().to_string(), "1.001");
    }

    #[test]
    fn dpt_id_rejects_garbage() {
        for s in ["", "1", "1.", ".001", "a.b", "1.**", "1.0a", "*.001"] {
            assert!(DptId::from_str(s).is_err(), "{s}");
        }
    }

    #[test]
    fn empty_payload_decodes_to_zero_for_numeric_families() {
        let cases = [
            (DptId::family(5), DptValue::Unsigned8(0)),
            (DptId::family(6), DptValue::Signed8(0)),
            (DptId::family(7), DptValue::Unsigned16(0)),
            (DptId::family(8), DptValue::Signed16(0)),
            (DptId::family(9), DptValue::Float16(0.0)),
            (DptId::family(12), DptValue::Unsigned32(0)),
            (DptId::family(13), DptValue::Signed32(0)),
            (DptId::family(14), DptValue::Float32(0.0)),
        ];
        for (dpt, expected) in cases {
            assert_eq!(decode(&GroupData::Short(0), dpt).unwrap(), expected, "{dpt}");
        }
    }

    #[test]
    fn raw_values_pass_through_encode() {
        let data = GroupData::Bytes(vec![1, 2, 3]);
        let encoded = encode(&DptValue::Raw(data.clone()), DptId::new(1, 1)).unwrap();
        assert_eq!(encoded, data);
    }

    #[test]
    fn unsupported_family_errors() {
        assert!(encode(&DptValue::Bool(true), DptId::family(99)).is_err());
        assert!(decode(&GroupData::Short(0), DptId::family(99)).is_err());
    }

    #[test]
    fn wildcard_and_concrete_sub_share_family_codec() {
        let value = DptValue::Unsigned8(128);
        let wire = encode(&value, DptId::new(5, 1)).unwrap();
        assert_eq!(decode(&wire, DptId::family(5)).unwrap(), value);
    }
}
