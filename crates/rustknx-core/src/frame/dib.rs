//! Description Information Blocks.
//!
//! Search and description responses advertise device attributes as a
//! sequence of DIBs, each prefixed with `length:u8, type:u8`. Unknown types
//! are skipped; truncated blocks abort the parse.

use crate::address::IndividualAddress;
use crate::cemi::{MediumType, ServiceFamily};
use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use alloc::string::String;
use alloc::vec::Vec;
use core::net::Ipv4Addr;

const DEVICE_NAME_LEN: usize = 30;

const TRUNCATED: DecodeError = DecodeError::Truncated;

/// DIB type bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DibType {
    DeviceInfo,
    SupportedServiceFamilies,
    IpConfig,
    IpCurrentConfig,
    KnxAddresses,
    ManufacturerData,
    Unknown(u8),
}

impl DibType {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::DeviceInfo,
            0x02 => Self::SupportedServiceFamilies,
            0x03 => Self::IpConfig,
            0x04 => Self::IpCurrentConfig,
            0x05 => Self::KnxAddresses,
            0xFE => Self::ManufacturerData,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::DeviceInfo => 0x01,
            Self::SupportedServiceFamilies => 0x02,
            Self::IpConfig => 0x03,
            Self::IpCurrentConfig => 0x04,
            Self::KnxAddresses => 0x05,
            Self::ManufacturerData => 0xFE,
            Self::Unknown(v) => v,
        }
    }
}

/// IP address assignment methods advertised in IP config DIBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMethod {
    Manual,
    Dhcp,
    BootP,
    AutoIp,
}

impl AssignmentMethod {
    pub const fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            1 => Ok(Self::Manual),
            2 => Ok(Self::Dhcp),
            4 => Ok(Self::BootP),
            8 => Ok(Self::AutoIp),
            _ => Err(DecodeError::BadField("ip assignment method")),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Manual => 1,
            Self::Dhcp => 2,
            Self::BootP => 4,
            Self::AutoIp => 8,
        }
    }
}

/// Hardware description of a KNXnet/IP device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub medium: MediumType,
    pub status: u8,
    pub individual_address: IndividualAddress,
    pub project_installation_id: u16,
    pub serial: [u8; 6],
    pub multicast_address: Ipv4Addr,
    pub mac: [u8; 6],
    /// Friendly name, at most 30 bytes, NUL-trimmed on decode.
    pub name: String,
}

/// One supported service family with its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceFamilyVersion {
    pub family: ServiceFamily,
    pub version: u8,
}

/// Static IP configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpConfig {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub capabilities: u8,
    pub assignment_method: AssignmentMethod,
}

/// Currently active IP configuration. The wire layout swaps the last two
/// bytes relative to [`IpConfig`]: the assignment method sits where the
/// plain variant keeps its capabilities, followed by a reserved byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpCurrentConfig {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub assignment_method: AssignmentMethod,
}

/// A decoded Description Information Block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dib {
    DeviceInfo(DeviceInfo),
    SupportedServiceFamilies(Vec<ServiceFamilyVersion>),
    IpConfig(IpConfig),
    IpCurrentConfig(IpCurrentConfig),
    KnxAddresses {
        primary: IndividualAddress,
        additional: Vec<IndividualAddress>,
    },
    ManufacturerData(Vec<u8>),
}

impl Dib {
    pub fn dib_type(&self) -> DibType {
        match self {
            Self::DeviceInfo(_) => DibType::DeviceInfo,
            Self::SupportedServiceFamilies(_) => DibType::SupportedServiceFamilies,
            Self::IpConfig(_) => DibType::IpConfig,
            Self::IpCurrentConfig(_) => DibType::IpCurrentConfig,
            Self::KnxAddresses { .. } => DibType::KnxAddresses,
            Self::ManufacturerData(_) => DibType::ManufacturerData,
        }
    }

    /// Parses back-to-back DIBs until the reader is exhausted. Unknown
    /// types are skipped silently.
    pub fn parse_all(r: &mut Reader<'_>) -> Result<Vec<Dib>, DecodeError> {
        let mut dibs = Vec::new();
        while !r.is_empty() {
            let length = r.read_u8().map_err(|_| TRUNCATED)? as usize;
            if length < 2 {
                return Err(TRUNCATED);
            }
            let dib_type = DibType::from_u8(r.read_u8().map_err(|_| TRUNCATED)?);
            let payload = r.read_exact(length - 2).map_err(|_| TRUNCATED)?;
            let mut body = Reader::new(payload);
            match dib_type {
                DibType::DeviceInfo => dibs.push(Self::DeviceInfo(decode_device_info(&mut body)?)),
                DibType::SupportedServiceFamilies => {
                    dibs.push(Self::SupportedServiceFamilies(decode_families(&mut body)?));
                }
                DibType::IpConfig => dibs.push(Self::IpConfig(decode_ip_config(&mut body)?)),
                DibType::IpCurrentConfig => {
                    dibs.push(Self::IpCurrentConfig(decode_ip_current(&mut body)?));
                }
                DibType::KnxAddresses => dibs.push(decode_knx_addresses(&mut body)?),
                DibType::ManufacturerData => {
                    dibs.push(Self::ManufacturerData(payload.to_vec()));
                }
                DibType::Unknown(_) => {}
            }
        }
        Ok(dibs)
    }

    /// Emits one DIB with its length/type prefix.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let total = self.payload_len() + 2;
        if total > 0xFF {
            return Err(EncodeError::StructureTooLong);
        }
        w.write_u8(total as u8)?;
        w.write_u8(self.dib_type().to_u8())?;
        match self {
            Self::DeviceInfo(info) => encode_device_info(info, w),
            Self::SupportedServiceFamilies(families) => {
                for f in families {
                    w.write_u8(f.family.to_u8())?;
                    w.write_u8(f.version)?;
                }
                Ok(())
            }
            Self::IpConfig(cfg) => {
                w.write_all(&cfg.ip.octets())?;
                w.write_all(&cfg.netmask.octets())?;
                w.write_all(&cfg.gateway.octets())?;
                w.write_u8(cfg.capabilities)?;
                w.write_u8(cfg.assignment_method.to_u8())
            }
            Self::IpCurrentConfig(cfg) => {
                w.write_all(&cfg.ip.octets())?;
                w.write_all(&cfg.netmask.octets())?;
                w.write_all(&cfg.gateway.octets())?;
                w.write_u8(cfg.assignment_method.to_u8())?;
                w.write_u8(0)
            }
            Self::KnxAddresses {
                primary,
                additional,
            } => {
                w.write_be_u16(primary.raw())?;
                for addr in additional {
                    w.write_be_u16(addr.raw())?;
                }
                Ok(())
            }
            Self::ManufacturerData(data) => w.write_all(data),
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            Self::DeviceInfo(_) => 52,
            Self::SupportedServiceFamilies(families) => families.len() * 2,
            Self::IpConfig(_) | Self::IpCurrentConfig(_) => 14,
            Self::KnxAddresses { additional, .. } => 2 + additional.len() * 2,
            Self::ManufacturerData(data) => data.len(),
        }
    }
}

fn decode_device_info(r: &mut Reader<'_>) -> Result<DeviceInfo, DecodeError> {
    let medium = MediumType::from_u8(r.read_u8().map_err(|_| TRUNCATED)?);
    let status = r.read_u8().map_err(|_| TRUNCATED)?;
    let individual_address = IndividualAddress::from_raw(r.read_be_u16().map_err(|_| TRUNCATED)?);
    let project_installation_id = r.read_be_u16().map_err(|_| TRUNCATED)?;
    let mut serial = [0u8; 6];
    serial.copy_from_slice(r.read_exact(6).map_err(|_| TRUNCATED)?);
    let multicast_address = Ipv4Addr::from(r.read_be_u32().map_err(|_| TRUNCATED)?);
    let mut mac = [0u8; 6];
    mac.copy_from_slice(r.read_exact(6).map_err(|_| TRUNCATED)?);
    let name_bytes = r.read_exact(DEVICE_NAME_LEN).map_err(|_| TRUNCATED)?;
    let trimmed = match name_bytes.iter().position(|&b| b == 0) {
        Some(end) => &name_bytes[..end],
        None => name_bytes,
    };
    let name = String::from_utf8_lossy(trimmed).into_owned();
    Ok(DeviceInfo {
        medium,
        status,
        individual_address,
        project_installation_id,
        serial,
        multicast_address,
        mac,
        name,
    })
}

fn encode_device_info(info: &DeviceInfo, w: &mut Writer<'_>) -> Result<(), EncodeError> {
    if info.name.len() > DEVICE_NAME_LEN {
        return Err(EncodeError::StructureTooLong);
    }
    w.write_u8(info.medium.to_u8())?;
    w.write_u8(info.status)?;
    w.write_be_u16(info.individual_address.raw())?;
    w.write_be_u16(info.project_installation_id)?;
    w.write_all(&info.serial)?;
    w.write_all(&info.multicast_address.octets())?;
    w.write_all(&info.mac)?;
    let mut name = [0u8; DEVICE_NAME_LEN];
    name[..info.name.len()].copy_from_slice(info.name.as_bytes());
    w.write_all(&name)
}

fn decode_families(r: &mut Reader<'_>) -> Result<Vec<ServiceFamilyVersion>, DecodeError> {
    let mut families = Vec::new();
    while !r.is_empty() {
        let family = ServiceFamily::from_u8(r.read_u8().map_err(|_| TRUNCATED)?);
        let version = r.read_u8().map_err(|_| TRUNCATED)?;
        families.push(ServiceFamilyVersion { family, version });
    }
    Ok(families)
}

fn decode_ip_config(r: &mut Reader<'_>) -> Result<IpConfig, DecodeError> {
    let ip = Ipv4Addr::from(r.read_be_u32().map_err(|_| TRUNCATED)?);
    let netmask = Ipv4Addr::from(r.read_be_u32().map_err(|_| TRUNCATED)?);
    let gateway = Ipv4Addr::from(r.read_be_u32().map_err(|_| TRUNCATED)?);
    let capabilities = r.read_u8().map_err(|_| TRUNCATED)?;
    let assignment_method = AssignmentMethod::from_u8(r.read_u8().map_err(|_| TRUNCATED)?)?;
    Ok(IpConfig {
        ip,
        netmask,
        gateway,
        capabilities,
        assignment_method,
    })
}

fn decode_ip_current(r: &mut Reader<'_>) -> Result<IpCurrentConfig, DecodeError> {
    let ip = Ipv4Addr::from(r.read_be_u32().map_err(|_| TRUNCATED)?);
    let netmask = Ipv4Addr::from(r.read_be_u32().map_err(|_| TRUNCATED)?);
    let gateway = Ipv4Addr::from(r.read_be_u32().map_err(|_| TRUNCATED)?);
    // The assignment method occupies the slot the plain variant uses for
    // capabilities; the trailing byte is reserved.
    let assignment_method = AssignmentMethod::from_u8(r.read_u8().map_err(|_| TRUNCATED)?)?;
    let _reserved = r.read_u8().map_err(|_| TRUNCATED)?;
    Ok(IpCurrentConfig {
        ip,
        netmask,
        gateway,
        assignment_method,
    })
}

fn decode_knx_addresses(r: &mut Reader<'_>) -> Result<Dib, DecodeError> {
    let primary = IndividualAddress::from_raw(r.read_be_u16().map_err(|_| TRUNCATED)?);
    let mut additional = Vec::new();
    while !r.is_empty() {
        additional.push(IndividualAddress::from_raw(
            r.read_be_u16().map_err(|_| TRUNCATED)?,
        ));
    }
    Ok(Dib::KnxAddresses {
        primary,
        additional,
    })
}
