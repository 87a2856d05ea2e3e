//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File whose size is not a whole number of packets.
    #[error("file size {len} is not a multiple of {width} bytes", width = tpx3sim_tpx::Packet::BYTES)]
    MalformedFile {
        /// File size in bytes.
        len: usize,
    },

    /// Packet codec error.
    #[error("packet error: {0}")]
    TpxError(#[from] tpx3sim_tpx::Error),
}
