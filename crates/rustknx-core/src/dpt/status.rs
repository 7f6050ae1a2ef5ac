//! Status and scene datapoints: 6.020 (status with mode), 15.* (access
//! data), 17/18/26 (scene numbers), 21.*/22.* (bit-field status words),
//! 27.001 (combined on/off with validity mask) and 219.001 (alarm info).

use super::{decode_err, encode_err, fixed_bytes, single_byte, DptDecodeError, DptEncodeError, DptId, DptValue};
use crate::cemi::GroupData;
use alloc::vec;

/// DPT 6.020: five status bits plus a three-bit mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusMode3 {
    pub a: bool,
    pub b: bool,
    pub c: bool,
    pub d: bool,
    pub e: bool,
    /// Raw mode field; the defined values are 0, 2 and 4.
    pub mode: u8,
}

/// DPT 15.000: a six-digit access code with status flags and an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessData {
    /// Six BCD digits, 0–999999.
    pub code: u32,
    pub error: bool,
    pub permission: bool,
    pub read_direction: bool,
    pub encrypted: bool,
    pub index: u8,
}

/// DPT 27.001: sixteen on/off states, each with a validity bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombinedOnOff {
    pub states: [bool; 16],
    pub valid: [bool; 16],
}

/// DPT 219.001: alarm info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlarmData {
    pub log_number: u8,
    pub priority: u8,
    pub application_area: u8,
    pub error_class: u8,
    /// Low nibble: attribute flags.
    pub attributes: u8,
    /// Low three bits: alarm status.
    pub status: u8,
}

pub(super) fn encode_status_mode3(
    value: &DptValue,
    dpt: DptId,
) -> Result<GroupData, DptEncodeError> {
    let DptValue::StatusMode3(s) = value else {
        return Err(encode_err(value, dpt, "expected a status-mode value"));
    };
    if !matches!(s.mode, 0 | 2 | 4) {
        return Err(encode_err(value, dpt, "mode outside {0, 2, 4}"));
    }
    let byte = u8::from(s.a) << 7
        | u8::from(s.b) << 6
        | u8::from(s.c) << 5
        | u8::from(s.d) << 4
        | u8::from(s.e) << 3
        | s.mode;
    Ok(GroupData::Bytes(vec![byte]))
}

pub(super) fn decode_status_mode3(
    data: &GroupData,
    dpt: DptId,
) -> Result<DptValue, DptDecodeError> {
    let byte = single_byte(data, dpt)?;
    let mode = byte & 0x07;
    if !matches!(mode, 0 | 2 | 4) {
        return Err(decode_err(dpt, "mode outside {0, 2, 4}"));
    }
    Ok(DptValue::StatusMode3(StatusMode3 {
        a: byte & 0x80 != 0,
        b: byte & 0x40 != 0,
        c: byte & 0x20 != 0,
        d: byte & 0x10 != 0,
        e: byte & 0x08 != 0,
        mode,
    }))
}

pub(super) fn encode_access(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Access(a) = value else {
        return Err(encode_err(value, dpt, "expected access data"));
    };
    if a.code > 999_999 {
        return Err(encode_err(value, dpt, "access code exceeds six digits"));
    }
    if a.index > 15 {
        return Err(encode_err(value, dpt, "index exceeds 15"));
    }
    let mut digits = [0u8; 6];
    let mut rest = a.code;
    for slot in digits.iter_mut().rev() {
        *slot = (rest % 10) as u8;
        rest /= 10;
    }
    let flags = u8::from(a.error) << 7
        | u8::from(a.permission) << 6
        | u8::from(a.read_direction) << 5
        | u8::from(a.encrypted) << 4;
    Ok(GroupData::Bytes(vec![
        digits[0] << 4 | digits[1],
        digits[2] << 4 | digits[3],
        digits[4] << 4 | digits[5],
        flags | a.index,
    ]))
}

pub(super) fn decode_access(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 4, dpt)?;
    let mut code: u32 = 0;
    for nibble in [
        b[0] >> 4,
        b[0] & 0x0F,
        b[1] >> 4,
        b[1] & 0x0F,
        b[2] >> 4,
        b[2] & 0x0F,
    ] {
        if nibble > 9 {
            return Err(decode_err(dpt, "digit is not BCD"));
        }
        code = code * 10 + u32::from(nibble);
    }
    Ok(DptValue::Access(AccessData {
        code,
        error: b[3] & 0x80 != 0,
        permission: b[3] & 0x40 != 0,
        read_direction: b[3] & 0x20 != 0,
        encrypted: b[3] & 0x10 != 0,
        index: b[3] & 0x0F,
    }))
}

pub(super) fn encode_scene(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Scene(scene) = value else {
        return Err(encode_err(value, dpt, "expected a scene number"));
    };
    if *scene > 63 {
        return Err(encode_err(value, dpt, "scene number exceeds 63"));
    }
    Ok(GroupData::Bytes(vec![*scene]))
}

pub(super) fn decode_scene(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    Ok(DptValue::Scene(single_byte(data, dpt)? & 0x3F))
}

pub(super) fn encode_scene_control(
    value: &DptValue,
    dpt: DptId,
) -> Result<GroupData, DptEncodeError> {
    let DptValue::SceneControl { control, scene } = value else {
        return Err(encode_err(value, dpt, "expected a scene control"));
    };
    if *scene > 63 {
        return Err(encode_err(value, dpt, "scene number exceeds 63"));
    }
    Ok(GroupData::Bytes(vec![u8::from(*control) << 7 | scene]))
}

pub(super) fn decode_scene_control(
    data: &GroupData,
    dpt: DptId,
) -> Result<DptValue, DptDecodeError> {
    let byte = single_byte(data, dpt)?;
    Ok(DptValue::SceneControl {
        control: byte & 0x80 != 0,
        scene: byte & 0x3F,
    })
}

pub(super) fn encode_scene_info(
    value: &DptValue,
    dpt: DptId,
) -> Result<GroupData, DptEncodeError> {
    let DptValue::SceneInfo { active, scene } = value else {
        return Err(encode_err(value, dpt, "expected scene info"));
    };
    if *scene > 63 {
        return Err(encode_err(value, dpt, "scene number exceeds 63"));
    }
    Ok(GroupData::Bytes(vec![u8::from(*active) << 6 | scene]))
}

pub(super) fn decode_scene_info(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let byte = single_byte(data, dpt)?;
    Ok(DptValue::SceneInfo {
        active: byte & 0x40 != 0,
        scene: byte & 0x3F,
    })
}

// Family 21 tuples are MSB-first reversed on the wire: tuple slot 0 rides
// in bit 7. Family 22 below keeps slot i in bit i.
pub(super) fn encode_bits8(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Bits8(bits) = value else {
        return Err(encode_err(value, dpt, "expected an 8-bit status"));
    };
    let mut byte = 0u8;
    for (i, bit) in bits.iter().enumerate() {
        byte |= u8::from(*bit) << (7 - i);
    }
    Ok(GroupData::Bytes(vec![byte]))
}

pub(super) fn decode_bits8(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let byte = single_byte(data, dpt)?;
    let mut bits = [false; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = byte & (1 << (7 - i)) != 0;
    }
    Ok(DptValue::Bits8(bits))
}

pub(super) fn encode_bits16(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Bits16(bits) = value else {
        return Err(encode_err(value, dpt, "expected a 16-bit status"));
    };
    let mut word = 0u16;
    for (i, bit) in bits.iter().enumerate() {
        word |= u16::from(*bit) << i;
    }
    Ok(GroupData::Bytes(word.to_be_bytes().to_vec()))
}

pub(super) fn decode_bits16(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 2, dpt)?;
    let word = u16::from_be_bytes([b[0], b[1]]);
    let mut bits = [false; 16];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = word & (1 << i) != 0;
    }
    Ok(DptValue::Bits16(bits))
}

pub(super) fn encode_combined_on_off(
    value: &DptValue,
    dpt: DptId,
) -> Result<GroupData, DptEncodeError> {
    let DptValue::CombinedOnOff(combined) = value else {
        return Err(encode_err(value, dpt, "expected combined on/off info"));
    };
    let mut mask = 0u16;
    let mut states = 0u16;
    for i in 0..16 {
        mask |= u16::from(combined.valid[i]) << i;
        states |= u16::from(combined.states[i]) << i;
    }
    let word = (u32::from(mask) << 16) | u32::from(states);
    Ok(GroupData::Bytes(word.to_be_bytes().to_vec()))
}

pub(super) fn decode_combined_on_off(
    data: &GroupData,
    dpt: DptId,
) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 4, dpt)?;
    let word = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
    let mask = (word >> 16) as u16;
    let states = word as u16;
    let mut combined = CombinedOnOff {
        states: [false; 16],
        valid: [false; 16],
    };
    for i in 0..16 {
        combined.valid[i] = mask & (1 << i) != 0;
        combined.states[i] = states & (1 << i) != 0;
    }
    Ok(DptValue::CombinedOnOff(combined))
}

pub(super) fn encode_alarm(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Alarm(alarm) = value else {
        return Err(encode_err(value, dpt, "expected alarm info"));
    };
    if alarm.attributes > 15 {
        return Err(encode_err(value, dpt, "attributes exceed 4 bits"));
    }
    if alarm.status > 7 {
        return Err(encode_err(value, dpt, "status exceeds 3 bits"));
    }
    Ok(GroupData::Bytes(vec![
        alarm.log_number,
        alarm.priority,
        alarm.application_area,
        alarm.error_class,
        alarm.attributes,
        alarm.status,
    ]))
}

pub(super) fn decode_alarm(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 6, dpt)?;
    Ok(DptValue::Alarm(AlarmData {
        log_number: b[0],
        priority: b[1],
        application_area: b[2],
        error_class: b[3],
        attributes: b[4] & 0x0F,
        status: b[5] & 0x07,
    }))
}
