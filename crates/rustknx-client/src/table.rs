//! The known group-address table and inbound telegram classification,
//! shared by the routing and tunnel clients.

use crate::ClientError;
use rustknx_core::address::GroupAddress;
use rustknx_core::cemi::{CemiData, Destination, GroupData};
use rustknx_core::dpt::{self, DptId, DptValue};
use rustknx_core::telegram::{Telegram, TelegramKind};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Group address to datapoint type mapping, plus the policy for addresses
/// outside it.
#[derive(Debug, Clone)]
pub struct GroupTable {
    entries: BTreeMap<GroupAddress, DptId>,
    allow_unknown: bool,
}

/// What became of an inbound cEMI data record.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A group service for a known (or tolerated) destination.
    Telegram(Telegram),
    /// A group service for an unconfigured destination.
    UnknownAddress(GroupAddress),
    /// A known destination whose payload did not match its datapoint type.
    BadPayload(GroupAddress, DptId),
    /// Not a group read/response/write at all.
    NotGroupService,
}

impl GroupTable {
    pub fn new(allow_unknown: bool) -> Self {
        Self {
            entries: BTreeMap::new(),
            allow_unknown,
        }
    }

    /// Builds a table from `"main/middle/sub" → "main.sub"` string pairs.
    pub fn from_strings<'a, I>(pairs: I, allow_unknown: bool) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = Self::new(allow_unknown);
        for (address, dpt) in pairs {
            let address = GroupAddress::from_str(address)
                .map_err(|_| ClientError::InvalidArgument("malformed group address"))?;
            let dpt = DptId::from_str(dpt)
                .map_err(|_| ClientError::InvalidArgument("malformed datapoint type"))?;
            table.insert(address, dpt);
        }
        Ok(table)
    }

    pub fn allow_unknown(&self) -> bool {
        self.allow_unknown
    }

    pub fn insert(&mut self, address: GroupAddress, dpt: DptId) {
        self.entries.insert(address, dpt);
    }

    pub fn remove(&mut self, address: GroupAddress) -> bool {
        self.entries.remove(&address).is_some()
    }

    pub fn get(&self, address: GroupAddress) -> Option<DptId> {
        self.entries.get(&address).copied()
    }

    /// The current table in string form, for the public API.
    pub fn to_strings(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(address, dpt)| (address.to_string(), dpt.to_string()))
            .collect()
    }

    /// Encodes an outgoing value for `destination`, honoring the
    /// unknown-address policy: unknown destinations accept pre-encoded raw
    /// bits only, and only when the policy allows them.
    pub fn encode_outgoing(
        &self,
        destination: GroupAddress,
        value: &DptValue,
    ) -> Result<GroupData, ClientError> {
        match self.get(destination) {
            Some(dpt) => Ok(dpt::encode(value, dpt)?),
            None if self.allow_unknown => match value {
                DptValue::Raw(data) => Ok(data.clone()),
                _ => Err(ClientError::InvalidArgument(
                    "unknown group address takes pre-encoded bits",
                )),
            },
            None => Err(ClientError::UnknownGroupAddress(destination)),
        }
    }

    /// Classifies one inbound data record.
    pub fn classify(&self, data: &CemiData) -> Inbound {
        if !data.message_code.is_data_service() {
            return Inbound::NotGroupService;
        }
        let Destination::Group(destination) = data.destination else {
            return Inbound::NotGroupService;
        };
        let Some(kind) = data.apci.and_then(TelegramKind::from_apci) else {
            return Inbound::NotGroupService;
        };

        let value = match (kind, self.get(destination)) {
            (TelegramKind::GroupRead, _) => None,
            (_, Some(dpt)) => match dpt::decode(&data.data, dpt) {
                Ok(value) => Some(value),
                Err(_) => return Inbound::BadPayload(destination, dpt),
            },
            (_, None) if self.allow_unknown => Some(DptValue::Raw(data.data.clone())),
            (_, None) => return Inbound::UnknownAddress(destination),
        };

        Inbound::Telegram(Telegram {
            kind,
            source: data.source,
            destination,
            value,
        })
    }
}
