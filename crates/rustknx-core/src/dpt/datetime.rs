//! Calendar datapoints: 10.001 (time of day), 11.001 (date) and 19.001
//! (date-time with status flags).

use super::{decode_err, encode_err, fixed_bytes, DptDecodeError, DptEncodeError, DptId, DptValue};
use crate::cemi::GroupData;
use alloc::vec;

/// DPT 10.001: weekday (0 = none) plus wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeOfDay {
    /// 0 = no day, 1 = Monday … 7 = Sunday.
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// DPT 11.001: a calendar date. Years span 1990–2089 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Date {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

/// The calendar part of DPT 19.001. Years span 1900–2155.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 0 = no day, 1 = Monday … 7 = Sunday.
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// DPT 19.001: a timestamp plus clock-status flags. `timestamp` is `None`
/// when the sender flagged the date or time as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DateTime {
    pub fault: bool,
    /// `None` when the working-day field is flagged as not valid.
    pub working_day: Option<bool>,
    /// Set when the sender voids the weekday field. Independent of the
    /// timestamp validity: a clock may carry a full date and time and still
    /// not vouch for the weekday.
    pub no_day_of_week: bool,
    /// Standard-time/summer-time information bit (SUTI).
    pub summer_time: bool,
    /// External clock quality (CLQ).
    pub quality: bool,
    pub timestamp: Option<Timestamp>,
}

impl DateTime {
    /// The sentinel carrying no usable calendar value.
    pub const INVALID: Self = Self {
        fault: false,
        working_day: None,
        no_day_of_week: true,
        summer_time: false,
        quality: false,
        timestamp: None,
    };
}

const FLAG_FAULT: u8 = 0x80;
const FLAG_WORKING_DAY: u8 = 0x40;
const FLAG_NO_WORKING_DAY: u8 = 0x20;
const FLAG_NO_YEAR: u8 = 0x10;
const FLAG_NO_DATE: u8 = 0x08;
const FLAG_NO_DAY_OF_WEEK: u8 = 0x04;
const FLAG_NO_TIME: u8 = 0x02;
const FLAG_SUMMER_TIME: u8 = 0x01;
const FLAG_QUALITY: u8 = 0x80;

pub(super) fn encode_time_of_day(
    value: &DptValue,
    dpt: DptId,
) -> Result<GroupData, DptEncodeError> {
    let DptValue::TimeOfDay(t) = value else {
        return Err(encode_err(value, dpt, "expected a time of day"));
    };
    if t.day > 7 {
        return Err(encode_err(value, dpt, "weekday exceeds 7"));
    }
    if t.hour > 23 || t.minute > 59 || t.second > 59 {
        return Err(encode_err(value, dpt, "time component out of range"));
    }
    Ok(GroupData::Bytes(vec![
        (t.day << 5) | t.hour,
        t.minute,
        t.second,
    ]))
}

pub(super) fn decode_time_of_day(
    data: &GroupData,
    dpt: DptId,
) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 3, dpt)?;
    let time = TimeOfDay {
        day: b[0] >> 5,
        hour: b[0] & 0x1F,
        minute: b[1] & 0x3F,
        second: b[2] & 0x3F,
    };
    if time.hour > 23 || time.minute > 59 || time.second > 59 {
        return Err(decode_err(dpt, "time component out of range"));
    }
    Ok(DptValue::TimeOfDay(time))
}

pub(super) fn encode_date(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::Date(d) = value else {
        return Err(encode_err(value, dpt, "expected a date"));
    };
    if d.day == 0 || d.day > 31 || d.month == 0 || d.month > 12 {
        return Err(encode_err(value, dpt, "date component out of range"));
    }
    if !(1990..=2089).contains(&d.year) {
        return Err(encode_err(value, dpt, "year outside 1990-2089"));
    }
    Ok(GroupData::Bytes(vec![
        d.day,
        d.month,
        (d.year % 100) as u8,
    ]))
}

pub(super) fn decode_date(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 3, dpt)?;
    let day = b[0] & 0x1F;
    let month = b[1] & 0x0F;
    let year_short = b[2] & 0x7F;
    if day == 0 || day > 31 || month == 0 || month > 12 || year_short > 99 {
        return Err(decode_err(dpt, "date component out of range"));
    }
    let year = if year_short >= 90 {
        1900 + u16::from(year_short)
    } else {
        2000 + u16::from(year_short)
    };
    Ok(DptValue::Date(Date { day, month, year }))
}

pub(super) fn encode_date_time(value: &DptValue, dpt: DptId) -> Result<GroupData, DptEncodeError> {
    let DptValue::DateTime(dt) = value else {
        return Err(encode_err(value, dpt, "expected a date-time"));
    };
    let mut flags = 0u8;
    if dt.fault {
        flags |= FLAG_FAULT;
    }
    match dt.working_day {
        Some(true) => flags |= FLAG_WORKING_DAY,
        Some(false) => {}
        None => flags |= FLAG_NO_WORKING_DAY,
    }
    if dt.no_day_of_week {
        flags |= FLAG_NO_DAY_OF_WEEK;
    }
    if dt.summer_time {
        flags |= FLAG_SUMMER_TIME;
    }
    let clq = if dt.quality { FLAG_QUALITY } else { 0 };

    let Some(ts) = dt.timestamp else {
        flags |= FLAG_NO_YEAR | FLAG_NO_DATE | FLAG_NO_TIME;
        return Ok(GroupData::Bytes(vec![0, 0, 0, 0, 0, 0, flags, clq]));
    };

    if !(1900..=2155).contains(&ts.year) {
        return Err(encode_err(value, dpt, "year outside 1900-2155"));
    }
    if ts.month == 0 || ts.month > 12 || ts.day == 0 || ts.day > 31 {
        return Err(encode_err(value, dpt, "date component out of range"));
    }
    if ts.day_of_week > 7 || ts.hour > 23 || ts.minute > 59 || ts.second > 59 {
        return Err(encode_err(value, dpt, "time component out of range"));
    }
    Ok(GroupData::Bytes(vec![
        (ts.year - 1900) as u8,
        ts.month,
        ts.day,
        (ts.day_of_week << 5) | ts.hour,
        ts.minute,
        ts.second,
        flags,
        clq,
    ]))
}

pub(super) fn decode_date_time(data: &GroupData, dpt: DptId) -> Result<DptValue, DptDecodeError> {
    let b = fixed_bytes(data, 8, dpt)?;
    let flags = b[6];
    let fault = flags & FLAG_FAULT != 0;
    let working_day = if flags & FLAG_NO_WORKING_DAY != 0 {
        None
    } else {
        Some(flags & FLAG_WORKING_DAY != 0)
    };
    let no_day_of_week = flags & FLAG_NO_DAY_OF_WEEK != 0;
    let summer_time = flags & FLAG_SUMMER_TIME != 0;
    let quality = b[7] & FLAG_QUALITY != 0;

    let invalid = flags & (FLAG_NO_YEAR | FLAG_NO_DATE | FLAG_NO_TIME) != 0;
    let timestamp = if invalid {
        None
    } else {
        let ts = Timestamp {
            year: 1900 + u16::from(b[0]),
            month: b[1] & 0x0F,
            day: b[2] & 0x1F,
            day_of_week: b[3] >> 5,
            hour: b[3] & 0x1F,
            minute: b[4] & 0x3F,
            second: b[5] & 0x3F,
        };
        if ts.month == 0 || ts.month > 12 || ts.day == 0 || ts.hour > 23 {
            return Err(decode_err(dpt, "calendar component out of range"));
        }
        Some(ts)
    };

    Ok(DptValue::DateTime(DateTime {
        fault,
        working_day,
        no_day_of_week,
        summer_time,
        quality,
        timestamp,
    }))
}

#[cfg(test)]
mod tests {
    use super::{Date, DateTime, TimeOfDay, Timestamp};
    use crate::cemi::GroupData;
    use crate::dpt::{decode, encode, DptId, DptValue};
    use alloc::vec;

    #[test]
    fn time_of_day_roundtrip() {
        let dpt = DptId::new(10, 1);
        let v = DptValue::TimeOfDay(TimeOfDay {
            day: 3,
            hour: 14,
            minute: 55,
            second: 7,
        });
        let wire = encode(&v, dpt).unwrap();
        assert_eq!(wire, GroupData::Bytes(vec![0x6E, 55, 7]));
        assert_eq!(decode(&wire, dpt).unwrap(), v);
    }

    #[test]
    fn time_of_day_range_checks() {
        let dpt = DptId::new(10, 1);
        let bad = DptValue::TimeOfDay(TimeOfDay {
            day: 1,
            hour: 24,
            minute: 0,
            second: 0,
        });
        assert!(encode(&bad, dpt).is_err());
        assert!(decode(&GroupData::Bytes(vec![0x18, 0, 0]), dpt).is_err());
    }

    #[test]
    fn date_roundtrip_and_century_split() {
        let dpt = DptId::new(11, 1);
        let v = DptValue::Date(Date {
            day: 31,
            month: 12,
            year: 2089,
        });
        let wire = encode(&v, dpt).unwrap();
        assert_eq!(wire, GroupData::Bytes(vec![31, 12, 89]));
        assert_eq!(decode(&wire, dpt).unwrap(), v);

        // Year byte 90 belongs to the previous century.
        let nineties = decode(&GroupData::Bytes(vec![1, 1, 90]), dpt).unwrap();
        assert_eq!(
            nineties,
            DptValue::Date(Date {
                day: 1,
                month: 1,
                year: 1990
            })
        );
    }

    #[test]
    fn date_rejects_out_of_range() {
        let dpt = DptId::family(11);
        for (day, month, year) in [(0, 1, 2020), (32, 1, 2020), (1, 0, 2020), (1, 13, 2020)] {
            assert!(encode(&DptValue::Date(Date { day, month, year }), dpt).is_err());
        }
        assert!(encode(
            &DptValue::Date(Date {
                day: 1,
                month: 1,
                year: 2090
            }),
            dpt
        )
        .is_err());
        assert!(decode(&GroupData::Bytes(vec![0, 1, 20]), dpt).is_err());
    }

    #[test]
    fn date_time_roundtrip() {
        let dpt = DptId::new(19, 1);
        let v = DptValue::DateTime(DateTime {
            fault: false,
            working_day: Some(true),
            no_day_of_week: false,
            summer_time: true,
            quality: true,
            timestamp: Some(Timestamp {
                year: 2026,
                month: 8,
                day: 2,
                day_of_week: 7,
                hour: 13,
                minute: 37,
                second: 59,
            }),
        });
        let wire = encode(&v, dpt).unwrap();
        assert_eq!(
            wire,
            GroupData::Bytes(vec![126, 8, 2, 0xED, 37, 59, 0x41, 0x80])
        );
        assert_eq!(decode(&wire, dpt).unwrap(), v);
    }

    #[test]
    fn date_time_invalid_sentinel_roundtrip() {
        let dpt = DptId::new(19, 1);
        let wire = encode(&DptValue::DateTime(DateTime::INVALID), dpt).unwrap();
        assert_eq!(
            wire,
            GroupData::Bytes(vec![0, 0, 0, 0, 0, 0, 0x20 | 0x10 | 0x08 | 0x04 | 0x02, 0])
        );
        assert_eq!(
            decode(&wire, dpt).unwrap(),
            DptValue::DateTime(DateTime::INVALID)
        );
    }

    #[test]
    fn date_time_year_bounds() {
        let dpt = DptId::new(19, 1);
        for year in [1900u16, 2155] {
            let v = DptValue::DateTime(DateTime {
                fault: false,
                working_day: Some(false),
                no_day_of_week: false,
                summer_time: false,
                quality: false,
                timestamp: Some(Timestamp {
                    year,
                    month: 1,
                    day: 1,
                    day_of_week: 0,
                    hour: 0,
                    minute: 0,
                    second: 0,
                }),
            });
            let wire = encode(&v, dpt).unwrap();
            assert_eq!(decode(&wire, dpt).unwrap(), v);
        }
        let out = DptValue::DateTime(DateTime {
            timestamp: Some(Timestamp {
                year: 2156,
                month: 1,
                day: 1,
                day_of_week: 0,
                hour: 0,
                minute: 0,
                second: 0,
            }),
            ..DateTime::INVALID
        });
        assert!(encode(&out, dpt).is_err());
    }

    #[test]
    fn date_time_partial_invalidity_flags() {
        let dpt = DptId::new(19, 1);
        // no-time flag alone voids the timestamp
        let wire = GroupData::Bytes(vec![126, 8, 2, 0x0D, 37, 59, 0x02, 0]);
        match decode(&wire, dpt).unwrap() {
            DptValue::DateTime(dt) => {
                assert_eq!(dt.timestamp, None);
                assert_eq!(dt.working_day, Some(false));
                assert!(!dt.no_day_of_week);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn no_day_of_week_alone_keeps_the_timestamp() {
        let dpt = DptId::new(19, 1);
        // only the no-day-of-week flag set; date and time stay valid
        let wire = GroupData::Bytes(vec![126, 8, 2, 0x0D, 37, 59, 0x04, 0]);
        let value = decode(&wire, dpt).unwrap();
        match &value {
            DptValue::DateTime(dt) => {
                assert!(dt.no_day_of_week);
                assert!(dt.timestamp.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&value, dpt).unwrap(), wire);
    }
}
