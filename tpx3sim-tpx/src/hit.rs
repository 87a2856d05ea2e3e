//! Hit input types.

use serde::{Deserialize, Serialize};
use tpx3sim_core::PixelAddress;

/// Discriminator pulse of a single pixel, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatorPulse {
    /// Rising edge.
    pub start: f64,
    /// Falling edge (`stop >= start`).
    pub stop: f64,
}

impl DiscriminatorPulse {
    /// Creates a new pulse.
    #[inline]
    #[must_use]
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    /// Time the discriminator stays high.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.stop - self.start
    }
}

/// A simulated hit as produced by a hit generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
    /// Rising edge of the discriminator, in seconds.
    pub start: f64,
    /// Falling edge of the discriminator, in seconds.
    pub stop: f64,
}

impl RawHit {
    /// Creates a new raw hit.
    #[inline]
    #[must_use]
    pub fn new(x: u16, y: u16, start: f64, stop: f64) -> Self {
        Self { x, y, start, stop }
    }

    /// The discriminator pulse of this hit.
    #[inline]
    #[must_use]
    pub fn pulse(&self) -> DiscriminatorPulse {
        DiscriminatorPulse::new(self.start, self.stop)
    }
}

/// A pulse that passed hit acceptance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedHit {
    /// Pixel the pulse belongs to.
    pub address: PixelAddress,
    /// Rising edge, in seconds.
    pub start: f64,
    /// Falling edge, in seconds.
    pub stop: f64,
}

impl AcceptedHit {
    /// Creates an accepted hit from a pulse.
    #[inline]
    #[must_use]
    pub fn new(address: PixelAddress, pulse: DiscriminatorPulse) -> Self {
        Self {
            address,
            start: pulse.start,
            stop: pulse.stop,
        }
    }
}
