//! tpx3sim-core: Pixel addressing, counter codecs and timing conversion.
//!
//! This crate provides the bit-level building blocks of the Timepix3
//! on-chip data encoding: the linear pixel address, the Gray / saturating /
//! LFSR pixel counters and the conversion between discriminator timing and
//! the ToA, fToA and ToT counters.
//!

pub mod counter;
pub mod error;
pub mod geometry;
pub mod mode;
pub mod timing;

pub use counter::{CounterKind, CounterTable, LfsrParams};
pub use error::{Error, Result};
pub use geometry::{ChipGeometry, PixelAddress, PixelCoord};
pub use mode::OperatingMode;
pub use timing::{ClockConfig, TimeConverter, TimingValues};
