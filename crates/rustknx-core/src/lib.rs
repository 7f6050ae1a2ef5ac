//! KNXnet/IP protocol encoding and decoding in pure Rust.
//!
//! `rustknx-core` provides zero-copy, `no_std`-compatible encoding and
//! decoding of KNXnet/IP frames, the cEMI link-layer format they carry, and
//! the KNX datapoint types (DPT) used to give group-address payloads a typed
//! meaning. It forms the foundation of the rustknx crate family and can be
//! used standalone in embedded or constrained environments.
//!
//! # Feature flags
//!
//! - **`std`** (default) — enables `std::error::Error` implementations.
//! - **`alloc`** (default) — enables the allocating codecs (frames, DIBs,
//!   datapoint values carrying strings).
//! - **`serde`** — derives `Serialize`/`Deserialize` on value-like types.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// KNX individual and group addresses.
pub mod address;
/// cEMI message codes, control-field views, TPCI/APCI and the data-record codec.
#[cfg(feature = "alloc")]
pub mod cemi;
/// Binary encoding primitives and the zero-copy reader/writer.
pub mod encoding;
/// Error types for encoding and decoding operations.
pub mod error;
/// KNXnet/IP frame header, service bodies, HPAI and DIB codecs.
#[cfg(feature = "alloc")]
pub mod frame;
/// Datapoint type (DPT) identifiers, values and the table-driven codec.
#[cfg(feature = "alloc")]
pub mod dpt;
/// The decoded group-service message model.
#[cfg(feature = "alloc")]
pub mod telegram;

pub use address::{GroupAddress, IndividualAddress};
pub use error::{DecodeError, EncodeError};
