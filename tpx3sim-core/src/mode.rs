//! Pixel operating modes.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Acquisition mode of the pixel matrix.
///
/// The discriminant is the two-bit mode code of the chip configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum OperatingMode {
    /// ToA & ToT: the 10-bit field carries the encoded ToT.
    #[default]
    ToaAndTot = 0,
    /// ToA only: the 10-bit field carries a dummy value.
    ToaOnly = 1,
    /// Event count & integral ToT.
    EventAndItot = 2,
}

impl OperatingMode {
    /// Creates a mode from its configuration code.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedMode`] for codes other than 0, 1 and 2.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(OperatingMode::ToaAndTot),
            1 => Ok(OperatingMode::ToaOnly),
            2 => Ok(OperatingMode::EventAndItot),
            _ => Err(Error::UnsupportedMode(code)),
        }
    }

    /// Configuration code of the mode.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns true if hits in this mode carry a measured ToT.
    #[must_use]
    pub fn measures_tot(self) -> bool {
        matches!(self, OperatingMode::ToaAndTot)
    }
}

impl TryFrom<u8> for OperatingMode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_code(code)
    }
}
