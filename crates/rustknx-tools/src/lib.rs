//! Shared argument parsing for the rustknx command-line tools.

use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::dpt::{DptId, DptValue};
use std::str::FromStr;

/// Parses `"main/middle/sub"` for clap.
pub fn parse_group_address(s: &str) -> Result<GroupAddress, String> {
    GroupAddress::from_str(s).map_err(|e| format!("{e}: {s:?}"))
}

/// Parses `"area.line.device"` for clap.
pub fn parse_individual_address(s: &str) -> Result<IndividualAddress, String> {
    IndividualAddress::from_str(s).map_err(|e| format!("{e}: {s:?}"))
}

/// Parses `"main.sub"` or `"main.*"` for clap.
pub fn parse_dpt(s: &str) -> Result<DptId, String> {
    DptId::from_str(s).map_err(|e| format!("{e}: {s:?}"))
}

/// Parses a `"1/2/3=1.001"` table entry for clap.
pub fn parse_table_entry(s: &str) -> Result<(GroupAddress, DptId), String> {
    let (address, dpt) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=DPT, got {s:?}"))?;
    Ok((parse_group_address(address)?, parse_dpt(dpt)?))
}

/// Turns a command-line string into a typed value for the given datapoint
/// type. Covers the families that have a sensible one-token text form.
pub fn parse_value(dpt: DptId, s: &str) -> Result<DptValue, String> {
    fn num<T: FromStr>(s: &str) -> Result<T, String>
    where
        T::Err: std::fmt::Display,
    {
        s.parse().map_err(|e| format!("{e}: {s:?}"))
    }

    match dpt.main() {
        1 => match s {
            "on" | "true" | "1" => Ok(DptValue::Bool(true)),
            "off" | "false" | "0" => Ok(DptValue::Bool(false)),
            _ => Err(format!("expected on/off, got {s:?}")),
        },
        4 => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(DptValue::Char(c)),
                _ => Err(format!("expected a single character, got {s:?}")),
            }
        }
        5 | 20 | 25 => num(s).map(DptValue::Unsigned8),
        6 => num(s).map(DptValue::Signed8),
        7 => num(s).map(DptValue::Unsigned16),
        8 => num(s).map(DptValue::Signed16),
        9 => num(s).map(DptValue::Float16),
        12 => num(s).map(DptValue::Unsigned32),
        13 => num(s).map(DptValue::Signed32),
        14 => num(s).map(DptValue::Float32),
        16 | 24 | 28 => Ok(DptValue::Text(s.to_string())),
        17 => num(s).map(DptValue::Scene),
        29 => num(s).map(DptValue::Signed64),
        main => Err(format!("datapoint family {main} has no command-line form")),
    }
}
