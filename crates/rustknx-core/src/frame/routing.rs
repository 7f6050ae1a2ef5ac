//! Routing services: indication, busy, lost-message.

use crate::cemi::Cemi;
use crate::encoding::{Reader, Writer};
use crate::frame::{FrameBody, ServiceType};
use crate::{DecodeError, EncodeError};

/// The one-shot multicast frame carrying a cEMI telegram.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingIndication {
    pub cemi: Cemi,
}

impl RoutingIndication {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            cemi: Cemi::decode(r)?,
        })
    }
}

impl FrameBody for RoutingIndication {
    fn service_type(&self) -> ServiceType {
        ServiceType::RoutingIndication
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.cemi.encode(w)
    }
}

/// Flow-control frame asking routers to pause multicast sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingBusy {
    pub device_state: u8,
    pub wait_time_ms: u16,
    pub control: u16,
}

impl RoutingBusy {
    const STRUCTURE_LENGTH: u8 = 6;

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != Self::STRUCTURE_LENGTH {
            return Err(DecodeError::BadStructureLength);
        }
        Ok(Self {
            device_state: r.read_u8()?,
            wait_time_ms: r.read_be_u16()?,
            control: r.read_be_u16()?,
        })
    }
}

impl FrameBody for RoutingBusy {
    fn service_type(&self) -> ServiceType {
        ServiceType::RoutingBusy
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(Self::STRUCTURE_LENGTH)?;
        w.write_u8(self.device_state)?;
        w.write_be_u16(self.wait_time_ms)?;
        w.write_be_u16(self.control)
    }
}

/// Notification that a router dropped telegrams from its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingLost {
    pub device_state: u8,
    pub lost_messages: u16,
}

impl RoutingLost {
    const STRUCTURE_LENGTH: u8 = 4;

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != Self::STRUCTURE_LENGTH {
            return Err(DecodeError::BadStructureLength);
        }
        Ok(Self {
            device_state: r.read_u8()?,
            lost_messages: r.read_be_u16()?,
        })
    }
}

impl FrameBody for RoutingLost {
    fn service_type(&self) -> ServiceType {
        ServiceType::RoutingLostMessage
    }

    fn encode_body(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(Self::STRUCTURE_LENGTH)?;
        w.write_u8(self.device_state)?;
        w.write_be_u16(self.lost_messages)
    }
}
