//! Host Protocol Address Information.

use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use core::net::{Ipv4Addr, SocketAddrV4};

const HPAI_LENGTH: u8 = 8;

/// Transport selector carried in an HPAI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostProtocol {
    Udp,
    Tcp,
    Unknown(u8),
}

impl HostProtocol {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::Udp,
            0x02 => Self::Tcp,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Udp => 0x01,
            Self::Tcp => 0x02,
            Self::Unknown(v) => v,
        }
    }
}

/// An eight-byte transport endpoint record: protocol, IPv4 address, port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hpai {
    pub protocol: HostProtocol,
    pub address: SocketAddrV4,
}

impl Hpai {
    pub const fn udp(address: SocketAddrV4) -> Self {
        Self {
            protocol: HostProtocol::Udp,
            address,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(HPAI_LENGTH)?;
        w.write_u8(self.protocol.to_u8())?;
        w.write_all(&self.address.ip().octets())?;
        w.write_be_u16(self.address.port())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != HPAI_LENGTH {
            return Err(DecodeError::BadStructureLength);
        }
        let protocol = HostProtocol::from_u8(r.read_u8()?);
        let ip = Ipv4Addr::from(r.read_be_u32()?);
        let port = r.read_be_u16()?;
        Ok(Self {
            protocol,
            address: SocketAddrV4::new(ip, port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{HostProtocol, Hpai};
    use crate::encoding::{Reader, Writer};
    use core::net::{Ipv4Addr, SocketAddrV4};

    #[test]
    fn hpai_roundtrip() {
        let hpai = Hpai::udp(SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 10), 3671));
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        hpai.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x08, 0x01, 192, 168, 1, 10, 0x0E, 0x57]
        );
        let mut r = Reader::new(w.as_written());
        assert_eq!(Hpai::decode(&mut r).unwrap(), hpai);
    }

    #[test]
    fn hpai_rejects_bad_length() {
        let mut r = Reader::new(&[0x07, 0x01, 0, 0, 0, 0, 0, 0]);
        assert!(Hpai::decode(&mut r).is_err());
    }

    #[test]
    fn unknown_protocol_is_carried() {
        let mut r = Reader::new(&[0x08, 0x42, 10, 0, 0, 1, 0x0E, 0x57]);
        let hpai = Hpai::decode(&mut r).unwrap();
        assert_eq!(hpai.protocol, HostProtocol::Unknown(0x42));
    }
}
