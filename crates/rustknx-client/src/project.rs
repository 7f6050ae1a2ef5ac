//! Snapshot types produced by an external ETS project parser.
//!
//! Parsing the vendor XML export is not this crate's business; whatever does
//! it hands over one of these snapshots. The clients and the cache only
//! consume the group-address map; topology is carried for callers that
//! select hydration candidates by installation structure.

use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::dpt::DptId;
use std::collections::HashMap;

/// One configured group address.
#[derive(Debug, Clone, PartialEq)]
pub struct EtsGroupAddress {
    pub address: GroupAddress,
    pub name: String,
    /// Absent when the project does not assign a datapoint type.
    pub dpt: Option<DptId>,
    /// Central function (alarms, scene recalls); excluded from hydration
    /// because reading one can trigger actuation.
    pub central: bool,
    /// Passes line couplers unfiltered.
    pub unfiltered: bool,
}

/// A device placed on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct EtsDevice {
    pub address: IndividualAddress,
    pub name: String,
}

/// A line within an area.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EtsLine {
    pub name: String,
    pub devices: Vec<EtsDevice>,
}

/// An area with its lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EtsArea {
    pub name: String,
    pub lines: HashMap<u8, EtsLine>,
}

/// A parsed ETS project.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EtsProject {
    /// Keyed by the `"main/middle/sub"` string form.
    pub group_addresses: HashMap<String, EtsGroupAddress>,
    pub topology: HashMap<u8, EtsArea>,
    pub unassigned_devices: Vec<EtsDevice>,
}

impl EtsProject {
    /// The `(address, dpt)` pairs a client can be configured with.
    pub fn group_table(&self) -> Vec<(GroupAddress, DptId)> {
        let mut pairs: Vec<_> = self
            .group_addresses
            .values()
            .filter_map(|info| Some((info.address, info.dpt?)))
            .collect();
        pairs.sort_by_key(|(address, _)| *address);
        pairs
    }

    /// Addresses safe to read during cache hydration: typed and not
    /// marked as central functions.
    pub fn hydratable_addresses(&self) -> Vec<GroupAddress> {
        let mut addresses: Vec<_> = self
            .group_addresses
            .values()
            .filter(|info| info.dpt.is_some() && !info.central)
            .map(|info| info.address)
            .collect();
        addresses.sort();
        addresses
    }
}

#[cfg(test)]
mod tests {
    use super::{EtsGroupAddress, EtsProject};
    use rustknx_core::address::GroupAddress;
    use rustknx_core::dpt::DptId;

    fn project() -> EtsProject {
        let mut project = EtsProject::default();
        for (address, dpt, central) in [
            ("1/2/3", Some(DptId::new(1, 1)), false),
            ("1/2/4", Some(DptId::new(9, 1)), false),
            ("0/0/1", Some(DptId::new(1, 1)), true),
            ("7/7/7", None, false),
        ] {
            project.group_addresses.insert(
                address.to_string(),
                EtsGroupAddress {
                    address: address.parse().unwrap(),
                    name: address.to_string(),
                    dpt,
                    central,
                    unfiltered: false,
                },
            );
        }
        project
    }

    #[test]
    fn group_table_skips_untyped_addresses() {
        let table = project().group_table();
        assert_eq!(table.len(), 3);
        assert!(table
            .iter()
            .all(|(address, _)| *address != GroupAddress::new(7, 7, 7).unwrap()));
    }

    #[test]
    fn hydratable_excludes_central_and_untyped() {
        let addresses = project().hydratable_addresses();
        assert_eq!(
            addresses,
            vec![
                GroupAddress::new(1, 2, 3).unwrap(),
                GroupAddress::new(1, 2, 4).unwrap(),
            ]
        );
    }
}
