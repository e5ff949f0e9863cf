//! Shared wire-level types
//!
//! `RaopCapabilities` and friends back the `_raop._tcp` TXT record the Service
//! Advertiser publishes alongside `_airplay._tcp` for legacy-sender compatibility.

/// RAOP (AirPlay 1) capability/TXT-record types, reused by the Service Advertiser
pub mod raop;

pub use raop::{RaopCapabilities, RaopCodec, RaopEncryption, RaopMetadataType};
