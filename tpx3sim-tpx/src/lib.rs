//! tpx3sim-tpx: Timepix3 hit acceptance and 48-bit packet codec.
//!
//! This crate turns simulated discriminator pulses into the packet stream a
//! Timepix3 chip would read out, and decodes such streams back into hits.
//!
//! # Key Components
//!
//! - [`HitAcceptance`] - per-pixel dead-time and minimum-ToT filter
//! - [`Packet`] - 48-bit pixel hit packet with bit field access
//! - [`PacketEncoder`] / [`PacketDecoder`] - hit stream ⇄ packet stream
//! - [`AcquisitionConfig`] - geometry, clocks and operating mode
//! - [`ChipDriver`] - chip control hooks
//!
//! # Encoding Pipeline
//!
//! 1. **Grouping (Sequential)**: map coordinates to addresses, group per pixel
//! 2. **Per pixel (Parallel)**: acceptance, then counter encoding
//! 3. **Merge (Sequential)**: order by decoded ToA, ties by address

pub mod acceptance;
pub mod config;
pub mod decoder;
pub mod driver;
pub mod encoder;
mod error;
pub mod hit;
pub mod packet;

pub use acceptance::{dead_time, HitAcceptance, PixelState, Verdict};
pub use config::AcquisitionConfig;
pub use decoder::{sort_records_by_start, DecodeOptions, DecodedRecord, PacketDecoder};
pub use driver::{apply_acquisition, ChipDriver, SimulatedDriver};
pub use encoder::PacketEncoder;
pub use error::{Error, Result};
pub use hit::{AcceptedHit, DiscriminatorPulse, RawHit};
pub use packet::{packets_from_bytes, packets_to_bytes, EncodedFields, Packet};

// Re-export core types for convenience
pub use tpx3sim_core::{ChipGeometry, ClockConfig, OperatingMode, PixelAddress, PixelCoord};

/// Encodes hits into the byte stream stored in a packet file.
///
/// # Errors
/// Returns an error if the configuration is invalid, a hit lies outside the
/// chip geometry or the operating mode has no packet layout.
pub fn encode_stream(hits: &[RawHit], config: &AcquisitionConfig) -> Result<Vec<u8>> {
    let packets = PacketEncoder::new(config)?.encode_hits(hits)?;
    Ok(packets_to_bytes(&packets))
}

/// Decodes a packet byte stream into hit records, keeping stream order.
///
/// # Errors
/// Returns an error if the configuration is invalid, the stream is not a
/// whole number of packets or a packet cannot be decoded.
pub fn decode_stream(
    data: &[u8],
    config: &AcquisitionConfig,
    options: DecodeOptions,
) -> Result<Vec<DecodedRecord>> {
    let packets = packets_from_bytes(data)?;
    PacketDecoder::new(config, options)?.decode_packets(&packets)
}
