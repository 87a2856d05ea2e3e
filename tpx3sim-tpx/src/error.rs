//! Packet codec error types.

use thiserror::Error;

/// Result type for packet codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Packet codec error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Packet whose header nibble is not the pixel-data header.
    #[error("invalid packet header: {0:#014x}")]
    InvalidPacketHeader(u64),

    /// Byte stream whose length is not a whole number of packets.
    #[error("stream length {0} is not a multiple of {width} bytes", width = crate::Packet::BYTES)]
    MalformedStream(usize),

    /// Operating mode the packet codec has no field layout for.
    #[error("operating mode {0:?} has no packet layout")]
    UnsupportedMode(tpx3sim_core::OperatingMode),

    /// JSON configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] tpx3sim_core::Error),
}
