//! Pixel coordinates and the chip's linear pixel address.
//!
//! The readout addresses a pixel by its double column (`eoc`), its
//! super-pixel inside that column (`supr`) and the pixel inside the
//! 2×4 super-pixel (`pix`):
//!
//! ```text
//! eoc  = x / 2
//! supr = y / 4
//! pix  = (y % 4) + 4 * (x % 2)
//! addr = eoc << 9 | supr << 3 | pix      (256×256 chip)
//! ```
//!
//! For other geometries the `eoc` field starts right above the bits needed
//! for `supr`, so the default chip yields exactly the layout above.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bits of the in-super-pixel index.
const PIX_BITS: u32 = 3;

/// Pixel coordinate on the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelCoord {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
}

impl PixelCoord {
    /// Creates a new pixel coordinate.
    #[inline]
    #[must_use]
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// 16-bit linear pixel address as carried in a hit packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelAddress(pub u16);

impl PixelAddress {
    /// Returns the raw address value.
    #[inline]
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u32> for PixelAddress {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        u16::try_from(raw)
            .map(PixelAddress)
            .map_err(|_| Error::InvalidAddress(raw))
    }
}

/// Pixel matrix dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChipGeometry {
    /// Number of columns (must be even).
    pub width: u16,
    /// Number of rows (must be a multiple of 4).
    pub height: u16,
}

impl Default for ChipGeometry {
    fn default() -> Self {
        Self::timepix3()
    }
}

/// Number of bits needed to represent `max_value`.
fn bits_for(max_value: u32) -> u32 {
    u32::BITS - max_value.leading_zeros()
}

impl ChipGeometry {
    /// The 256×256 Timepix3 pixel matrix.
    #[must_use]
    pub fn timepix3() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }

    /// Creates a validated geometry.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] if the dimensions do not fit the
    /// double-column / super-pixel layout or need more than 16 address bits.
    pub fn new(width: u16, height: u16) -> Result<Self> {
        let geometry = Self { width, height };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Checks that the geometry can be addressed with 16 bits.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.width % 2 != 0 {
            return Err(Error::InvalidGeometry(format!(
                "width {} is not a positive multiple of 2",
                self.width
            )));
        }
        if self.height == 0 || self.height % 4 != 0 {
            return Err(Error::InvalidGeometry(format!(
                "height {} is not a positive multiple of 4",
                self.height
            )));
        }
        let bits = self.eoc_bits() + self.supr_bits() + PIX_BITS;
        if bits > u16::BITS {
            return Err(Error::InvalidGeometry(format!(
                "{}x{} needs {bits} address bits (max 16)",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Returns true if the coordinate lies on the chip.
    #[inline]
    #[must_use]
    pub fn contains(&self, coord: PixelCoord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    fn supr_bits(&self) -> u32 {
        bits_for(u32::from(self.height / 4).saturating_sub(1))
    }

    fn eoc_bits(&self) -> u32 {
        bits_for(u32::from(self.width / 2).saturating_sub(1))
    }

    fn eoc_shift(&self) -> u32 {
        PIX_BITS + self.supr_bits()
    }

    /// Converts a coordinate to its linear address.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCoordinate`] if the coordinate is off-chip.
    pub fn to_address(&self, coord: PixelCoord) -> Result<PixelAddress> {
        if !self.contains(coord) {
            return Err(Error::InvalidCoordinate {
                x: u32::from(coord.x),
                y: u32::from(coord.y),
            });
        }
        let x = u32::from(coord.x);
        let y = u32::from(coord.y);

        let eoc = x / 2;
        let supr = y / 4;
        let pix = (y % 4) + 4 * (x % 2);
        let addr = (eoc << self.eoc_shift()) | (supr << PIX_BITS) | pix;

        PixelAddress::try_from(addr)
    }

    /// Converts a linear address back to its coordinate.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAddress`] if the address points outside the chip.
    pub fn to_coordinate(&self, address: PixelAddress) -> Result<PixelCoord> {
        let addr = u32::from(address.0);
        let supr_mask = (1u32 << self.supr_bits()) - 1;

        let pix = addr & 0b111;
        let supr = (addr >> PIX_BITS) & supr_mask;
        let eoc = addr >> self.eoc_shift();

        let x = 2 * eoc + pix / 4;
        let y = 4 * supr + pix % 4;

        match (u16::try_from(x), u16::try_from(y)) {
            (Ok(x), Ok(y)) if self.contains(PixelCoord::new(x, y)) => Ok(PixelCoord::new(x, y)),
            _ => Err(Error::InvalidAddress(addr)),
        }
    }
}

/// Converts a coordinate on the 256×256 chip to its address.
///
/// # Errors
/// Returns [`Error::InvalidCoordinate`] if `x` or `y` is above 255.
pub fn to_address(x: u16, y: u16) -> Result<PixelAddress> {
    ChipGeometry::timepix3().to_address(PixelCoord::new(x, y))
}

/// Converts an address on the 256×256 chip to its coordinate.
///
/// # Errors
/// Never fails for the full chip, every 16-bit address is populated.
pub fn to_coordinate(address: PixelAddress) -> Result<PixelCoord> {
    ChipGeometry::timepix3().to_coordinate(address)
}
