//! The decoded group-service message model.

use crate::address::{GroupAddress, IndividualAddress};
use crate::cemi::Apci;
use crate::dpt::DptValue;

/// The three group services a client observes and emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TelegramKind {
    GroupRead,
    GroupResponse,
    GroupWrite,
}

impl TelegramKind {
    pub const fn from_apci(apci: Apci) -> Option<Self> {
        match apci {
            Apci::GroupRead => Some(Self::GroupRead),
            Apci::GroupResponse => Some(Self::GroupResponse),
            Apci::GroupWrite => Some(Self::GroupWrite),
            _ => None,
        }
    }

    pub const fn to_apci(self) -> Apci {
        match self {
            Self::GroupRead => Apci::GroupRead,
            Self::GroupResponse => Apci::GroupResponse,
            Self::GroupWrite => Apci::GroupWrite,
        }
    }
}

/// One decoded group telegram. A `GroupRead` carries no value; the other
/// kinds carry the destination's decoded datapoint value, or
/// [`DptValue::Raw`] when the destination's type is unknown to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Telegram {
    pub kind: TelegramKind,
    pub source: IndividualAddress,
    pub destination: GroupAddress,
    pub value: Option<DptValue>,
}

#[cfg(test)]
mod tests {
    use super::TelegramKind;
    use crate::cemi::Apci;

    #[test]
    fn kind_maps_to_group_apcis_only() {
        assert_eq!(TelegramKind::from_apci(Apci::GroupRead), Some(TelegramKind::GroupRead));
        assert_eq!(
            TelegramKind::from_apci(Apci::GroupWrite),
            Some(TelegramKind::GroupWrite)
        );
        assert_eq!(TelegramKind::from_apci(Apci::MemoryRead), None);
        assert_eq!(TelegramKind::GroupResponse.to_apci(), Apci::GroupResponse);
    }
}
