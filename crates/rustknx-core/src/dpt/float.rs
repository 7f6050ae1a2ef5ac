//! Floating-point datapoints: 9.* (the KNX 16-bit float) and 14.*
//! (IEEE-754 single precision).
//!
//! The KNX half float packs `sign:1 | exponent:4 | mantissa:11`; the value
//! is `0.01 * mantissa * 2^exponent` with the mantissa read as a 12-bit
//! two's-complement number including the sign bit. `0x7FFF` is the invalid
//! sentinel, emitted for anything outside `[-671088.64, +670760.96]`.

use super::{encode_err, fixed_bytes, DptDecodeError, DptEncodeError, DptId, DptValue};
use crate::cemi::GroupData;

/// Largest encodable value (mantissa 2047, exponent 15).
pub const F16_MAX: f32 = 670_760.96;
/// Smallest encodable value (mantissa -2048, exponent 15).
pub const F16_MIN: f32 = -671_088.64;

const F16_INVALID: [u8; 2] = [0x7F, 0xFF];

pub(super) fn encode_f16(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Float16(v) = value else {
        return Err(encode_err(value, dpt, "expected a 16-bit float value"));
    };
    Ok(GroupData::Bytes(f16_bytes(*v).to_vec()))
}

pub(super) fn f16_bytes(value: f32) -> [u8; 2] {
    let scaled = f64::from(value) * 100.0;
    for exponent in 0u16..=15 {
        let mantissa = (scaled / f64::from(1u32 << exponent)).round();
        if (-2048.0..=2047.0).contains(&mantissa) {
            let twos = (mantissa as i32 & 0x0FFF) as u16;
            let word = ((twos & 0x0800) << 4) | (exponent << 11) | (twos & 0x07FF);
            return word.to_be_bytes();
        }
    }
    F16_INVALID
}

pub(super) fn decode_f16(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 2, dpt)?;
    let word = u16::from_be_bytes([b[0], b[1]]);
    let exponent = (word >> 11) & 0x0F;
    let mut mantissa = i32::from(word & 0x07FF);
    if word & 0x8000 != 0 {
        mantissa -= 2048;
    }
    let value = 0.01 * mantissa as f64 * f64::from(1u32 << exponent);
    Ok(DptValue::Float16(value as f32))
}

pub(super) fn encode_f32(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Float32(v) => Ok(GroupData::Bytes(v.to_be_bytes().to_vec())),
        _ => Err(encode_err(value, dpt, "expected a 32-bit float value")),
    }
}

pub(super) fn decode_f32(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 4, dpt)?;
    Ok(DptValue::Float32(f32::from_be_bytes([
        b[0], b[1], b[2], b[3],
    ])))
}

#[cfg(test)]
mod tests {
    use super::{f16_bytes, F16_MAX, F16_MIN};
    use crate::cemi::GroupData;
    use crate::dpt::{decode, encode, DptId, DptValue};
    use alloc::vec;

    fn decode_f16(wire: &GroupData) -> f32 {
        match decode(wire, DptId::family(9)).unwrap() {
            DptValue::Float16(v) => v,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn f16_known_fixtures() {
        // 21.0 = 0x0C1A, -30.0 = 0x8A24 are classic temperature fixtures.
        assert_eq!(f16_bytes(21.0), [0x0C, 0x1A]);
        assert_eq!(decode_f16(&GroupData::Bytes(vec![0x0C, 0x1A])), 21.0);
        assert_eq!(decode_f16(&GroupData::Bytes(vec![0x8A, 0x24])), -30.0);
        assert_eq!(f16_bytes(0.0), [0x00, 0x00]);
    }

    #[test]
    fn f16_roundtrip_error_within_resolution() {
        for v in [
            0.01f32, -0.01, 21.5, -21.5, 100.32, 669.6, -670.0, 20_000.0, F16_MAX, F16_MIN,
        ] {
            let wire = encode(&DptValue::Float16(v), DptId::new(9, 1)).unwrap();
            let back = decode_f16(&wire);
            let resolution = 0.01 * 2f32.powi(((v.abs() * 100.0 / 2047.0).log2().ceil()) as i32);
            assert!(
                (back - v).abs() <= resolution.max(0.01),
                "{v} decoded as {back}"
            );
        }
    }

    #[test]
    fn f16_max_decodes_within_resolution() {
        let wire = encode(&DptValue::Float16(F16_MAX), DptId::family(9)).unwrap();
        assert_eq!(wire, GroupData::Bytes(vec![0x7F, 0xFE]));
        assert!((decode_f16(&wire) - F16_MAX).abs() < 0.01 * 2f32.powi(15));
    }

    #[test]
    fn f16_out_of_range_emits_sentinel() {
        for v in [F16_MAX + 400.0, F16_MIN - 400.0, 1.0e9, -1.0e9] {
            assert_eq!(f16_bytes(v), [0x7F, 0xFF], "{v}");
        }
    }

    #[test]
    fn f32_roundtrip() {
        let dpt = DptId::new(14, 56);
        for v in [0.0f32, -1.5, 3.14159, f32::MAX, f32::MIN_POSITIVE] {
            let wire = encode(&DptValue::Float32(v), dpt).unwrap();
            assert_eq!(decode(&wire, dpt).unwrap(), DptValue::Float32(v));
        }
    }
}
