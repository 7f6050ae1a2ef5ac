//! The Common External Message Interface (cEMI).
//!
//! KNXnet/IP routing indications carry a cEMI link-layer telegram: a message
//! code, optional additional info, a 16-bit control field, source and
//! destination addresses and a transport/application data unit. The data
//! unit packs TPCI (2+4+2 bits), APCI (4 or 10 bits) and up to 14 octets of
//! application data; very short values share the APCI word itself.

use crate::address::{GroupAddress, IndividualAddress};
use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

/// cEMI message codes seen inside routing indications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCode {
    /// `L_Data.req` (0x11)
    DataRequest,
    /// `L_Data.ind` (0x29)
    DataIndicator,
    /// `L_Data.con` (0x2E)
    DataConnection,
    Unknown(u8),
}

impl MessageCode {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x11 => Self::DataRequest,
            0x29 => Self::DataIndicator,
            0x2E => Self::DataConnection,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::DataRequest => 0x11,
            Self::DataIndicator => 0x29,
            Self::DataConnection => 0x2E,
            Self::Unknown(v) => v,
        }
    }

    /// `true` for the two codes that carry a parseable data record.
    pub const fn is_data_service(self) -> bool {
        matches!(self, Self::DataRequest | Self::DataIndicator)
    }
}

/// KNX medium type bytes as advertised in device-info DIBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumType {
    Reserved,
    TwistedPair,
    Powerline,
    RadioFrequency,
    Ip,
    Unknown(u8),
}

impl MediumType {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::Reserved,
            0x02 => Self::TwistedPair,
            0x04 => Self::Powerline,
            0x10 => Self::RadioFrequency,
            0x20 => Self::Ip,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Reserved => 0x01,
            Self::TwistedPair => 0x02,
            Self::Powerline => 0x04,
            Self::RadioFrequency => 0x10,
            Self::Ip => 0x20,
            Self::Unknown(v) => v,
        }
    }
}

/// KNXnet/IP service family identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFamily {
    Core,
    DeviceManagement,
    Tunnelling,
    Routing,
    Unknown(u8),
}

impl ServiceFamily {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x02 => Self::Core,
            0x03 => Self::DeviceManagement,
            0x04 => Self::Tunnelling,
            0x05 => Self::Routing,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Core => 0x02,
            Self::DeviceManagement => 0x03,
            Self::Tunnelling => 0x04,
            Self::Routing => 0x05,
            Self::Unknown(v) => v,
        }
    }
}

/// The 16-bit cEMI control field (control octet 1 in the high byte, control
/// octet 2 in the low byte), with Boolean views of the bits that matter to a
/// routing client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlField(u16);

impl ControlField {
    /// Standard frame, repeat allowed, broadcast, low priority, group
    /// destination, hop count 6. The usual word for group telegrams.
    pub const GROUP_DEFAULT: Self = Self(0xBCE0);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Frame-type bit cleared means extended frame.
    pub const fn is_extended_frame(self) -> bool {
        self.0 & 0x8000 == 0
    }

    pub const fn has_do_not_repeat(self) -> bool {
        self.0 & 0x2000 != 0
    }

    /// Standard broadcast when set, system broadcast when clear.
    pub const fn is_broadcast(self) -> bool {
        self.0 & 0x1000 != 0
    }

    pub const fn has_ack_requested(self) -> bool {
        self.0 & 0x0200 != 0
    }

    pub const fn has_error(self) -> bool {
        self.0 & 0x0100 != 0
    }

    pub const fn is_destination_group(self) -> bool {
        self.0 & 0x0080 != 0
    }

    /// Returns the word with the destination-type bit forced to `group`.
    /// All other bits pass through from the caller.
    pub const fn with_destination_group(self, group: bool) -> Self {
        if group {
            Self(self.0 | 0x0080)
        } else {
            Self(self.0 & !0x0080)
        }
    }
}

impl Default for ControlField {
    fn default() -> Self {
        Self::GROUP_DEFAULT
    }
}

/// Transport-layer control codes carried by TPCI control frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportControl {
    Connect,
    Disconnect,
    Ack,
    Nak,
}

impl TransportControl {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Connect,
            1 => Self::Disconnect,
            2 => Self::Ack,
            _ => Self::Nak,
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Connect => 0,
            Self::Disconnect => 1,
            Self::Ack => 2,
            Self::Nak => 3,
        }
    }
}

/// The four TPCI frame kinds (upper 2 bits of the TPCI octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpciKind {
    UnnumberedData,
    NumberedData,
    UnnumberedControl,
    NumberedControl,
}

impl TpciKind {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::UnnumberedData,
            1 => Self::NumberedData,
            2 => Self::UnnumberedControl,
            _ => Self::NumberedControl,
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::UnnumberedData => 0,
            Self::NumberedData => 1,
            Self::UnnumberedControl => 2,
            Self::NumberedControl => 3,
        }
    }

    pub const fn is_numbered(self) -> bool {
        matches!(self, Self::NumberedData | Self::NumberedControl)
    }

    pub const fn is_control(self) -> bool {
        matches!(self, Self::UnnumberedControl | Self::NumberedControl)
    }
}

/// Decoded TPCI octet: `kind:2 | sequence:4 | control:2`.
///
/// The sequence number is present only for numbered kinds and the control
/// code only for control kinds; for data kinds the low two bits of the wire
/// octet belong to the APCI and are ignored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tpci {
    pub kind: TpciKind,
    pub sequence: Option<u8>,
    pub control: Option<TransportControl>,
}

impl Tpci {
    /// The TPCI of ordinary group telegrams.
    pub const UNNUMBERED_DATA: Self = Self {
        kind: TpciKind::UnnumberedData,
        sequence: None,
        control: None,
    };

    pub const fn from_byte(byte: u8) -> Self {
        let kind = TpciKind::from_bits(byte >> 6);
        let sequence = if kind.is_numbered() {
            Some((byte >> 2) & 0x0F)
        } else {
            None
        };
        let control = if kind.is_control() {
            Some(TransportControl::from_bits(byte))
        } else {
            None
        };
        Self {
            kind,
            sequence,
            control,
        }
    }

    pub const fn to_byte(self) -> u8 {
        let mut byte = self.kind.to_bits() << 6;
        if let Some(seq) = self.sequence {
            byte |= (seq & 0x0F) << 2;
        }
        if let Some(control) = self.control {
            byte |= control.to_bits();
        }
        byte
    }
}

/// Application-layer service codes.
///
/// The ten short services fold to their 4-bit codes; everything else is
/// carried as the raw 10-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    GroupRead,
    GroupResponse,
    GroupWrite,
    IndividualWrite,
    IndividualRead,
    IndividualResponse,
    AdcRead,
    MemoryRead,
    MemoryResponse,
    MemoryWrite,
    Other(u16),
}

impl Apci {
    /// Folds a 4-bit code from the short wire form.
    pub const fn from_short(code: u8) -> Self {
        match code {
            0 => Self::GroupRead,
            1 => Self::GroupResponse,
            2 => Self::GroupWrite,
            3 => Self::IndividualWrite,
            4 => Self::IndividualRead,
            5 => Self::IndividualResponse,
            6 => Self::AdcRead,
            8 => Self::MemoryRead,
            9 => Self::MemoryResponse,
            10 => Self::MemoryWrite,
            v => Self::Other(v as u16),
        }
    }

    /// Folds a full 10-bit APCI word, collapsing short services to their
    /// 4-bit codes. The low six bits of a folded word belong to the value
    /// and are dropped here.
    pub const fn from_word(word: u16) -> Self {
        let short = (word >> 6) & 0x0F;
        if short < 11 && short != 7 {
            Self::from_short(short as u8)
        } else {
            Self::Other(word & 0x03FF)
        }
    }

    /// The service code: 0–10 for the short services, the raw 10-bit value
    /// otherwise.
    pub const fn code(self) -> u16 {
        match self {
            Self::GroupRead => 0,
            Self::GroupResponse => 1,
            Self::GroupWrite => 2,
            Self::IndividualWrite => 3,
            Self::IndividualRead => 4,
            Self::IndividualResponse => 5,
            Self::AdcRead => 6,
            Self::MemoryRead => 8,
            Self::MemoryResponse => 9,
            Self::MemoryWrite => 10,
            Self::Other(v) => v,
        }
    }

    /// `true` for services that may use the packed `apci:4 | value:6` form.
    pub const fn is_short(self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// `true` for the three group services a routing client dispatches.
    pub const fn is_group_service(self) -> bool {
        matches!(self, Self::GroupRead | Self::GroupResponse | Self::GroupWrite)
    }
}

/// Application data carried by a group telegram.
///
/// Values up to six bits wide ride inside the APCI word itself; wider values
/// occupy whole octets after it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupData {
    /// A value of at most six bits, packed into the APCI octet pair.
    Short(u8),
    /// A byte-aligned payload following the APCI word.
    Bytes(Vec<u8>),
}

impl GroupData {
    pub const fn empty() -> Self {
        Self::Short(0)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Short(v) => *v == 0,
            Self::Bytes(b) => b.is_empty(),
        }
    }
}

/// Destination of a cEMI data record, discriminated by control-field bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Group(GroupAddress),
    Individual(IndividualAddress),
}

impl Destination {
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Group(_))
    }

    const fn raw(self) -> u16 {
        match self {
            Self::Group(ga) => ga.raw(),
            Self::Individual(ia) => ia.raw(),
        }
    }
}

/// A decoded cEMI data record (`L_Data.req` / `L_Data.ind`).
#[derive(Debug, Clone, PartialEq)]
pub struct CemiData {
    pub message_code: MessageCode,
    pub additional_info: Vec<u8>,
    pub control: ControlField,
    pub source: IndividualAddress,
    pub destination: Destination,
    pub tpci: Tpci,
    pub apci: Option<Apci>,
    pub data: GroupData,
}

impl CemiData {
    /// An `L_Data.req` group telegram with the default control word.
    pub fn group_request(
        source: IndividualAddress,
        destination: GroupAddress,
        apci: Apci,
        data: GroupData,
    ) -> Self {
        Self {
            message_code: MessageCode::DataRequest,
            additional_info: Vec::new(),
            control: ControlField::GROUP_DEFAULT,
            source,
            destination: Destination::Group(destination),
            tpci: Tpci::UNNUMBERED_DATA,
            apci: Some(apci),
            data,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.additional_info.len() > 0xFF {
            return Err(EncodeError::StructureTooLong);
        }
        w.write_u8(self.message_code.to_u8())?;
        w.write_u8(self.additional_info.len() as u8)?;
        w.write_all(&self.additional_info)?;
        let control = self
            .control
            .with_destination_group(self.destination.is_group());
        w.write_be_u16(control.raw())?;
        w.write_be_u16(self.source.raw())?;
        w.write_be_u16(self.destination.raw())?;

        let tpci = self.tpci.to_byte();
        let Some(apci) = self.apci else {
            if !self.data.is_empty() {
                return Err(EncodeError::BadDataUnit("data without apci"));
            }
            w.write_u8(0)?;
            return w.write_u8(tpci);
        };

        match &self.data {
            GroupData::Short(value) => {
                if *value > 0x3F {
                    return Err(EncodeError::ValueOutOfRange);
                }
                let word = if apci.is_short() {
                    (apci.code() << 6) | u16::from(*value)
                } else if *value == 0 {
                    apci.code()
                } else {
                    return Err(EncodeError::BadDataUnit("short value needs a short apci"));
                };
                w.write_u8(1)?;
                w.write_u8(tpci | (word >> 8) as u8)?;
                w.write_u8(word as u8)
            }
            GroupData::Bytes(bytes) => {
                if bytes.len() > 0xFE {
                    return Err(EncodeError::StructureTooLong);
                }
                let word = if apci.is_short() {
                    apci.code() << 6
                } else {
                    apci.code()
                };
                w.write_u8(bytes.len() as u8 + 1)?;
                w.write_u8(tpci | (word >> 8) as u8)?;
                w.write_u8(word as u8)?;
                w.write_all(bytes)
            }
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let message_code = MessageCode::from_u8(r.read_u8()?);
        let add_info_len = r.read_u8()? as usize;
        let additional_info = r.read_exact(add_info_len)?.to_vec();
        let control = ControlField::new(r.read_be_u16()?);
        let source = IndividualAddress::from_raw(r.read_be_u16()?);
        let dest_raw = r.read_be_u16()?;
        let destination = if control.is_destination_group() {
            Destination::Group(GroupAddress::from_raw(dest_raw))
        } else {
            Destination::Individual(IndividualAddress::from_raw(dest_raw))
        };
        let data_length = r.read_u8()? as usize;
        let unit = r.read_exact(data_length + 1)?;

        let tpci = Tpci::from_byte(if data_length == 0 {
            unit[0]
        } else {
            // Low two bits belong to the APCI for data frames.
            unit[0] & 0xFC
        });

        let (apci, data) = if data_length == 0 {
            (None, GroupData::empty())
        } else {
            let word = (u16::from(unit[0] & 0x03) << 8) | u16::from(unit[1]);
            if data_length == 1 {
                let apci = Apci::from_short((word >> 6) as u8);
                (Some(apci), GroupData::Short((word & 0x3F) as u8))
            } else {
                (Some(Apci::from_word(word)), GroupData::Bytes(unit[2..].to_vec()))
            }
        };

        Ok(Self {
            message_code,
            additional_info,
            control,
            source,
            destination,
            tpci,
            apci,
            data,
        })
    }
}

/// The payload of a routing indication: a parsed data record for the data
/// services, the raw octets (message code included) for everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum Cemi {
    Data(CemiData),
    Raw(Vec<u8>),
}

impl Cemi {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let code = MessageCode::from_u8(r.peek_u8()?);
        if code.is_data_service() {
            CemiData::decode(r).map(Self::Data)
        } else {
            Ok(Self::Raw(r.read_rest().to_vec()))
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::Data(data) => data.encode(w),
            Self::Raw(bytes) => w.write_all(bytes),
        }
    }
}
