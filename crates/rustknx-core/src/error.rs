use core::fmt;

/// Failure modes of the KNXnet/IP encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The destination buffer cannot hold the encoded form.
    BufferTooSmall,
    /// A field value does not fit its bit layout.
    ValueOutOfRange,
    /// A variable-length structure outgrew its length octet (additional
    /// info, DIB payload, cEMI data unit, frame total length).
    StructureTooLong,
    /// The APCI/payload combination has no wire form.
    BadDataUnit(&'static str),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small"),
            Self::ValueOutOfRange => f.write_str("value does not fit its bit field"),
            Self::StructureTooLong => f.write_str("structure exceeds its length octet"),
            Self::BadDataUnit(msg) => write!(f, "unencodable data unit: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Failure modes of the KNXnet/IP decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before the structure did.
    Truncated,
    /// A structure-length octet disagrees with the actual layout.
    BadStructureLength,
    /// A field carries a value outside its defined set.
    BadField(&'static str),
    /// A DIB sequence misses or duplicates a required block.
    BadDibSet(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("truncated structure"),
            Self::BadStructureLength => f.write_str("structure length mismatch"),
            Self::BadField(field) => write!(f, "undefined value in {field}"),
            Self::BadDibSet(msg) => write!(f, "bad description block set: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}
