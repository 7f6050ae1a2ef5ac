//! Search and description services.

use crate::encoding::{Reader, Writer};
use crate::frame::dib::{DeviceInfo, Dib, DibType};
use crate::frame::hpai::Hpai;
use crate::frame::{FrameBody, ServiceType};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

/// Multicast discovery probe carrying the sender's reply endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRequest {
    pub endpoint: Hpai,
}

impl SearchRequest {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            endpoint: Hpai::decode(r)?,
        })
    }
}

impl FrameBody for SearchRequest {
    fn service_type(&self) -> ServiceType {
        ServiceType::SearchRequest
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.endpoint.encode(w)
    }
}

/// Reply to a search request: the responder's control endpoint plus its
/// self-description DIBs.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub endpoint: Hpai,
    pub dibs: Vec<Dib>,
}

impl SearchResponse {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            endpoint: Hpai::decode(r)?,
            dibs: Dib::parse_all(r)?,
        })
    }

    /// The device-info DIB, if the responder included one.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.dibs.iter().find_map(|dib| match dib {
            Dib::DeviceInfo(info) => Some(info),
            _ => None,
        })
    }
}

impl FrameBody for SearchResponse {
    fn service_type(&self) -> ServiceType {
        ServiceType::SearchResponse
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.endpoint.encode(w)?;
        for dib in &self.dibs {
            dib.encode(w)?;
        }
        Ok(())
    }
}

/// Unicast request for a device's self description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionRequest {
    pub endpoint: Hpai,
}

impl DescriptionRequest {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            endpoint: Hpai::decode(r)?,
        })
    }
}

impl FrameBody for DescriptionRequest {
    fn service_type(&self) -> ServiceType {
        ServiceType::DescriptionRequest
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.endpoint.encode(w)
    }
}

/// A device's self description. Exactly one device-info DIB is required;
/// further DIBs follow in wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionResponse {
    pub device_info: DeviceInfo,
    pub other_dibs: Vec<Dib>,
}

impl DescriptionResponse {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let dibs = Dib::parse_all(r)?;
        let mut device_info = None;
        let mut other_dibs = Vec::new();
        for dib in dibs {
            match dib {
                Dib::DeviceInfo(info) if device_info.is_none() => device_info = Some(info),
                Dib::DeviceInfo(_) => {
                    return Err(DecodeError::BadDibSet("duplicate device info"))
                }
                other => other_dibs.push(other),
            }
        }
        let device_info =
            device_info.ok_or(DecodeError::BadDibSet("missing device info"))?;
        Ok(Self {
            device_info,
            other_dibs,
        })
    }
}

impl FrameBody for DescriptionResponse {
    fn service_type(&self) -> ServiceType {
        ServiceType::DescriptionResponse
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        debug_assert!(!self
            .other_dibs
            .iter()
            .any(|d| d.dib_type() == DibType::DeviceInfo));
        Dib::DeviceInfo(self.device_info.clone()).encode(w)?;
        for dib in &self.other_dibs {
            dib.encode(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DescriptionResponse, SearchRequest, SearchResponse};
    use crate::address::IndividualAddress;
    use crate::cemi::{MediumType, ServiceFamily};
    use crate::encoding::{Reader, Writer};
    use crate::frame::dib::{DeviceInfo, Dib, ServiceFamilyVersion};
    use crate::frame::hpai::Hpai;
    use crate::frame::{frame_to_vec, Frame};
    use alloc::string::ToString;
    use alloc::vec;
    use core::net::{Ipv4Addr, SocketAddrV4};

    fn endpoint() -> Hpai {
        Hpai::udp(SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 34), 3671))
    }

    fn device_info() -> DeviceInfo {
        DeviceInfo {
            medium: MediumType::TwistedPair,
            status: 0,
            individual_address: IndividualAddress::new(1, 0, 0).unwrap(),
            project_installation_id: 0,
            serial: [0; 6],
            multicast_address: Ipv4Addr::new(224, 0, 23, 12),
            mac: [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF],
            name: "Gateway".to_string(),
        }
    }

    #[test]
    fn search_request_roundtrip() {
        let body = SearchRequest {
            endpoint: endpoint(),
        };
        let bytes = frame_to_vec(&body).unwrap();
        assert_eq!(bytes.len(), 14);
        match Frame::decode(&bytes).unwrap() {
            Frame::SearchRequest(decoded) => assert_eq!(decoded, body),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn search_response_roundtrip_finds_device_info() {
        let body = SearchResponse {
            endpoint: endpoint(),
            dibs: vec![
                Dib::DeviceInfo(device_info()),
                Dib::SupportedServiceFamilies(vec![ServiceFamilyVersion {
                    family: ServiceFamily::Routing,
                    version: 1,
                }]),
            ],
        };
        let bytes = frame_to_vec(&body).unwrap();
        match Frame::decode(&bytes).unwrap() {
            Frame::SearchResponse(decoded) => {
                assert_eq!(decoded, body);
                assert_eq!(decoded.device_info().unwrap().name, "Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn description_response_requires_device_info() {
        let body = SearchResponse {
            endpoint: endpoint(),
            dibs: vec![Dib::SupportedServiceFamilies(vec![])],
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        for dib in &body.dibs {
            dib.encode(&mut w).unwrap();
        }
        let mut r = Reader::new(w.as_written());
        assert!(DescriptionResponse::decode(&mut r).is_err());
    }

    #[test]
    fn description_response_roundtrip() {
        let body = DescriptionResponse {
            device_info: device_info(),
            other_dibs: vec![Dib::ManufacturerData(vec![0x00, 0xC5])],
        };
        let bytes = frame_to_vec(&body).unwrap();
        match Frame::decode(&bytes).unwrap() {
            Frame::DescriptionResponse(decoded) => assert_eq!(decoded, body),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_device_info_fails() {
        let mut buf = [0u8; 160];
        let mut w = Writer::new(&mut buf);
        Dib::DeviceInfo(device_info()).encode(&mut w).unwrap();
        Dib::DeviceInfo(device_info()).encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        assert!(DescriptionResponse::decode(&mut r).is_err());
    }
}
