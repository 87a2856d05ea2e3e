//! Chip control hooks.
//!
//! [`ChipDriver`] is the seam a hardware backend plugs into. The simulation
//! only needs [`SimulatedDriver`], which remembers what it was asked to do.

use crate::config::AcquisitionConfig;
use crate::Result;
use tpx3sim_core::OperatingMode;

/// Control surface of a Timepix3 chip.
pub trait ChipDriver {
    /// Threshold scan limits `(from, to)` found by a pre-scan.
    ///
    /// # Errors
    /// Returns an error if the backend cannot run the pre-scan.
    fn threshold_range(&mut self) -> Result<(u16, u16)>;

    /// Switches the pixel matrix operating mode.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the mode.
    fn set_mode(&mut self, mode: OperatingMode) -> Result<()>;

    /// Sets the global DAC threshold.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the value.
    fn set_threshold(&mut self, threshold: u16) -> Result<()>;

    /// Runs the coarse threshold adjustment.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn coarse_threshold(&mut self) -> Result<()>;
}

/// Driver without hardware behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedDriver {
    range: (u16, u16),
    mode: Option<OperatingMode>,
    threshold: Option<u16>,
    coarse_runs: usize,
}

impl SimulatedDriver {
    /// Creates a driver whose pre-scan finds no range.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the range reported by [`ChipDriver::threshold_range`].
    #[must_use]
    pub fn with_threshold_range(mut self, from: u16, to: u16) -> Self {
        self.range = (from, to);
        self
    }

    /// Last mode requested.
    #[must_use]
    pub fn mode(&self) -> Option<OperatingMode> {
        self.mode
    }

    /// Last threshold requested.
    #[must_use]
    pub fn threshold(&self) -> Option<u16> {
        self.threshold
    }

    /// Number of coarse adjustments run.
    #[must_use]
    pub fn coarse_runs(&self) -> usize {
        self.coarse_runs
    }
}

impl ChipDriver for SimulatedDriver {
    fn threshold_range(&mut self) -> Result<(u16, u16)> {
        log::debug!("simulated pre-scan: threshold range {:?}", self.range);
        Ok(self.range)
    }

    fn set_mode(&mut self, mode: OperatingMode) -> Result<()> {
        log::debug!("simulated driver: mode {mode:?}");
        self.mode = Some(mode);
        Ok(())
    }

    fn set_threshold(&mut self, threshold: u16) -> Result<()> {
        log::debug!("simulated driver: threshold {threshold}");
        self.threshold = Some(threshold);
        Ok(())
    }

    fn coarse_threshold(&mut self) -> Result<()> {
        log::debug!("simulated driver: coarse threshold");
        self.coarse_runs += 1;
        Ok(())
    }
}

/// Puts a chip into the operating mode of an acquisition.
///
/// # Errors
/// Propagates driver errors.
pub fn apply_acquisition<D: ChipDriver + ?Sized>(
    driver: &mut D,
    config: &AcquisitionConfig,
) -> Result<()> {
    driver.set_mode(config.mode)
}
