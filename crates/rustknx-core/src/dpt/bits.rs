//! Sub-byte datapoints: 1.* (boolean), 2.* (controlled boolean),
//! 3.* (dimming/blind step), 23.* (two-bit enumerations).
//!
//! These ride in the six value bits of the short APCI form, but an
//! eight-bit frame carrying the same bits is accepted on decode.

use super::{decode_err, encode_err, DptDecodeError, DptEncodeError, DptId, DptValue};
use crate::cemi::GroupData;

/// The low bits of a sub-byte payload, from either frame width.
fn low_bits(data: &GroupData, mask: u8, dpt: DptId) -> Result<u8, DptDecodeError> {
    let byte = match data {
        GroupData::Short(v) => *v,
        GroupData::Bytes(b) if b.len() == 1 => b[0],
        _ => return Err(decode_err(dpt, "expected a sub-byte payload")),
    };
    Ok(byte & mask)
}

pub(super) fn encode_bool(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Bool(v) => Ok(GroupData::Short(u8::from(*v))),
        _ => Err(encode_err(value, dpt, "expected a boolean")),
    }
}

pub(super) fn decode_bool(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    Ok(DptValue::Bool(low_bits(data, 0x01, dpt)? != 0))
}

pub(super) fn encode_control(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Control { control, value } => {
            Ok(GroupData::Short(u8::from(*control) << 1 | u8::from(*value)))
        }
        _ => Err(encode_err(value, dpt, "expected a controlled boolean")),
    }
}

pub(super) fn decode_control(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let bits = low_bits(data, 0x03, dpt)?;
    Ok(DptValue::Control {
        control: bits & 0x02 != 0,
        value: bits & 0x01 != 0,
    })
}

pub(super) fn encode_dimming(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::Dimming { control, step } => {
            if *step > 7 {
                return Err(encode_err(value, dpt, "step code exceeds 7"));
            }
            Ok(GroupData::Short(u8::from(*control) << 3 | step))
        }
        _ => Err(encode_err(value, dpt, "expected a dimming step")),
    }
}

pub(super) fn decode_dimming(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let bits = low_bits(data, 0x0F, dpt)?;
    Ok(DptValue::Dimming {
        control: bits & 0x08 != 0,
        step: bits & 0x07,
    })
}

pub(super) fn encode_two_bits(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    match value {
        DptValue::TwoBits { a, b } => Ok(GroupData::Short(u8::from(*a) << 1 | u8::from(*b))),
        _ => Err(encode_err(value, dpt, "expected a two-bit value")),
    }
}

pub(super) fn decode_two_bits(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let bits = low_bits(data, 0x03, dpt)?;
    Ok(DptValue::TwoBits {
        a: bits & 0x02 != 0,
        b: bits & 0x01 != 0,
    })
}

#[cfg(test)]
mod tests {
    use crate::cemi::GroupData;
    use crate::dpt::{decode, encode, DptId, DptValue};
    use alloc::vec;

    #[test]
    fn bool_roundtrip_both_frame_widths() {
        let dpt = DptId::new(1, 1);
        assert_eq!(encode(&DptValue::Bool(true), dpt).unwrap(), GroupData::Short(1));
        assert_eq!(decode(&GroupData::Short(1), dpt).unwrap(), DptValue::Bool(true));
        assert_eq!(decode(&GroupData::Short(0), dpt).unwrap(), DptValue::Bool(false));
        // eight-bit frame
        assert_eq!(
            decode(&GroupData::Bytes(vec![0x01]), dpt).unwrap(),
            DptValue::Bool(true)
        );
    }

    #[test]
    fn control_roundtrip() {
        let dpt = DptId::family(2);
        for control in [false, true] {
            for value in [false, true] {
                let v = DptValue::Control { control, value };
                let wire = encode(&v, dpt).unwrap();
                assert_eq!(decode(&wire, dpt).unwrap(), v);
            }
        }
        assert_eq!(
            encode(
                &DptValue::Control {
                    control: true,
                    value: false
                },
                dpt
            )
            .unwrap(),
            GroupData::Short(0b10)
        );
    }

    #[test]
    fn dimming_roundtrip_and_range() {
        let dpt = DptId::new(3, 7);
        for step in 0..=7 {
            let v = DptValue::Dimming {
                control: true,
                step,
            };
            let wire = encode(&v, dpt).unwrap();
            assert_eq!(decode(&wire, dpt).unwrap(), v);
        }
        assert!(encode(
            &DptValue::Dimming {
                control: false,
                step: 8
            },
            dpt
        )
        .is_err());
    }

    #[test]
    fn two_bit_roundtrip() {
        let dpt = DptId::new(23, 1);
        let v = DptValue::TwoBits { a: true, b: false };
        assert_eq!(encode(&v, dpt).unwrap(), GroupData::Short(0b10));
        assert_eq!(decode(&GroupData::Short(0b10), dpt).unwrap(), v);
    }

    #[test]
    fn wide_payload_is_rejected() {
        assert!(decode(&GroupData::Bytes(vec![0, 1]), DptId::new(1, 1)).is_err());
    }

    #[test]
    fn wrong_value_shape_is_rejected() {
        let err = encode(&DptValue::Unsigned8(1), DptId::new(1, 1)).unwrap_err();
        assert_eq!(err.dpt, DptId::new(1, 1));
    }
}
