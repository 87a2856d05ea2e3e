//! Error types for tpx3sim-core.

use crate::counter::CounterKind;
use thiserror::Error;

/// Result type alias for tpx3sim-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Pixel coordinate outside the chip geometry.
    #[error("invalid pixel coordinate: ({x}, {y})")]
    InvalidCoordinate { x: u32, y: u32 },

    /// Linear address that does not map into the chip geometry.
    #[error("invalid pixel address: {0:#06x}")]
    InvalidAddress(u32),

    /// Chip geometry that cannot be expressed with 16-bit addresses.
    #[error("invalid chip geometry: {0}")]
    InvalidGeometry(String),

    /// Operating mode code without a defined meaning.
    #[error("unsupported operating mode: {0}")]
    UnsupportedMode(u8),

    /// LFSR decode exhausted the counter cycle without finding the value.
    ///
    /// [`crate::counter::decode`] maps this case to a count of 0, which cannot
    /// be told apart from a genuine zero count.
    #[error("value {value:#x} never appears in the {kind} counter sequence")]
    AmbiguousDecode { kind: CounterKind, value: u32 },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Returns true for errors caused by a value outside its valid domain
    /// (coordinates, addresses, geometry or operating mode).
    #[must_use]
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCoordinate { .. }
                | Error::InvalidAddress(_)
                | Error::InvalidGeometry(_)
                | Error::UnsupportedMode(_)
        )
    }
}
