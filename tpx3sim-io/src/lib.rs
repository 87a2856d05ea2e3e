//! tpx3sim-io: Packet file I/O for tpx3sim.
//!
//! Packet files hold 6-byte big-endian pixel hit packets back to back.
//! Files are read through memory maps via memmap2 and written once
//! through a buffered writer.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{MappedFileReader, PacketFileReader};
pub use writer::{DataFileWriter, PacketFileWriter};

use std::path::Path;
use tpx3sim_tpx::{AcquisitionConfig, DecodeOptions, DecodedRecord, PacketEncoder, RawHit};

/// Encodes hits and writes the packet stream to `path`, truncating it.
///
/// Returns the number of packets written.
///
/// # Errors
/// Returns an error if the configuration is invalid, encoding fails or the
/// file cannot be written.
pub fn encode_to_file<P: AsRef<Path>>(
    path: P,
    hits: &[RawHit],
    config: &AcquisitionConfig,
) -> Result<usize> {
    let packets = PacketEncoder::new(config)?.encode_hits(hits)?;
    let mut writer = PacketFileWriter::create(path)?;
    writer.write_packets(&packets)?;
    writer.finish()
}

/// Reads and decodes a packet file, keeping file order.
///
/// # Errors
/// Returns an error if the file cannot be read, is malformed or a packet
/// cannot be decoded.
pub fn decode_file<P: AsRef<Path>>(
    path: P,
    config: &AcquisitionConfig,
    options: DecodeOptions,
) -> Result<Vec<DecodedRecord>> {
    PacketFileReader::open(path)?.read_records(config, options)
}
