//! Conversion between discriminator timing and encoded timing counters.
//!
//! A discriminator pulse is described by its `start` (rising edge) and
//! `stop` (falling edge) in seconds, relative to some external clock. The
//! ToA counter starts ticking at `epoch`.
//!
//! - **ToA**: rising system-clock edges since the epoch at detection time.
//! - **fToA**: rising fine-clock edges between the hit and the next
//!   system-clock edge (the fine clock starts at the hit).
//! - **ToT**: rising system-clock edges while the discriminator is high.
//!
//! The ToA range is limited to 2^14 system-clock periods (409.6 µs at
//! 40 MHz). Past that span the truncated Gray code reflects: the decoded
//! ToA counts back down from 16383 instead of wrapping to 0.

use crate::counter::{self, CounterKind};
use crate::mode::OperatingMode;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clock parameters of the timing counters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockConfig {
    /// System clock in Hz (default: 40 MHz).
    pub system_clock_hz: f64,
    /// Fine ToA clock in Hz (default: 640 MHz).
    pub fine_clock_hz: f64,
    /// Time at which the ToA counter starts, in seconds.
    pub epoch: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            system_clock_hz: 40e6,
            fine_clock_hz: 640e6,
            epoch: 0.0,
        }
    }
}

impl ClockConfig {
    /// Sets the system clock rate.
    #[must_use]
    pub fn with_system_clock(mut self, hz: f64) -> Self {
        self.system_clock_hz = hz;
        self
    }

    /// Sets the fine ToA clock rate.
    #[must_use]
    pub fn with_fine_clock(mut self, hz: f64) -> Self {
        self.fine_clock_hz = hz;
        self
    }

    /// Sets the ToA epoch.
    #[must_use]
    pub fn with_epoch(mut self, epoch: f64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Checks that both clock rates are finite and positive.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        for (name, hz) in [
            ("system_clock_hz", self.system_clock_hz),
            ("fine_clock_hz", self.fine_clock_hz),
        ] {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be positive, got {hz}"
                )));
            }
        }
        if !self.epoch.is_finite() {
            return Err(Error::ConfigError("epoch must be finite".to_string()));
        }
        Ok(())
    }

    /// System clock period in seconds (25 ns by default).
    #[inline]
    #[must_use]
    pub fn system_period(&self) -> f64 {
        1.0 / self.system_clock_hz
    }

    /// Fine clock period in seconds (1.5625 ns by default).
    #[inline]
    #[must_use]
    pub fn fine_period(&self) -> f64 {
        1.0 / self.fine_clock_hz
    }
}

/// Encoded timing counters of one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingValues {
    /// Gray-coded ToA.
    pub toa: u32,
    /// Saturating fToA.
    pub ftoa: u32,
    /// LFSR-coded ToT (0 in ToA-only mode).
    pub tot: u32,
}

/// Floored division whose quotient is consistent with [`floor_mod`].
///
/// Computing the quotient from `a - fmod(a, b)` keeps exact multiples of
/// the clock period on their tick instead of one tick below it.
fn floor_div(a: f64, b: f64) -> f64 {
    let rem = a % b;
    let mut div = (a - rem) / b;
    if rem != 0.0 && ((b < 0.0) != (rem < 0.0)) {
        div -= 1.0;
    }
    if div == 0.0 {
        return 0.0;
    }
    let floor = div.floor();
    if div - floor > 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Remainder with the sign of the divisor.
fn floor_mod(a: f64, b: f64) -> f64 {
    let rem = a % b;
    if rem != 0.0 && ((b < 0.0) != (rem < 0.0)) {
        rem + b
    } else {
        rem
    }
}

/// Converts a tick count to an unsigned counter input.
///
/// Times before the epoch clamp to tick 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_ticks(ticks: f64) -> u64 {
    ticks.max(0.0) as u64
}

/// Converts between hit timing and encoded counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeConverter {
    clock: ClockConfig,
}

impl TimeConverter {
    /// Creates a converter for the given clocks.
    #[must_use]
    pub fn new(clock: ClockConfig) -> Self {
        Self { clock }
    }

    /// Clock parameters in use.
    #[must_use]
    pub fn clock(&self) -> &ClockConfig {
        &self.clock
    }

    /// System-clock ticks from the epoch to `t`, rounded up to the next edge.
    #[must_use]
    pub fn toa_ticks(&self, t: f64) -> u64 {
        let elapsed = t - self.clock.epoch;
        let period = self.clock.system_period();
        let ticks = floor_div(elapsed, period);
        if floor_mod(elapsed, period) == 0.0 {
            to_ticks(ticks)
        } else {
            to_ticks(ticks + 1.0)
        }
    }

    /// Encoded ToA of a hit detected at `t`.
    #[must_use]
    pub fn time_to_toa(&self, t: f64) -> u32 {
        counter::encode(self.toa_ticks(t), CounterKind::Toa)
    }

    /// Time of the system-clock edge an encoded ToA refers to.
    #[must_use]
    pub fn toa_to_time(&self, toa: u32) -> f64 {
        let ticks = counter::decode(toa, CounterKind::Toa);
        self.clock.epoch + f64::from(ticks) / self.clock.system_clock_hz
    }

    /// Encoded fToA of a hit detected at `t`.
    #[must_use]
    pub fn time_to_ftoa(&self, t: f64) -> u32 {
        let period = self.clock.system_period();
        let last_edge =
            self.clock.epoch + period * floor_div(t - self.clock.epoch, period);
        let next_edge = last_edge + period;

        let fine_ticks = floor_div(next_edge - t, self.clock.fine_period());
        counter::encode(to_ticks(fine_ticks), CounterKind::Ftoa)
    }

    /// Detection time from encoded fToA and ToA (1.5625 ns resolution).
    #[must_use]
    pub fn ftoa_and_toa_to_time(&self, ftoa: u32, toa: u32) -> f64 {
        let fine_ticks = counter::decode(ftoa, CounterKind::Ftoa);
        self.toa_to_time(toa) - f64::from(fine_ticks) / self.clock.fine_clock_hz
    }

    /// System-clock edges while the discriminator is high.
    #[must_use]
    pub fn tot_ticks(&self, start: f64, stop: f64) -> u64 {
        let period = self.clock.system_period();
        let initial = floor_div(start - self.clock.epoch, period);
        let last = floor_div(stop - self.clock.epoch, period);
        to_ticks(last - initial)
    }

    /// Encoded ToT of a pulse.
    #[must_use]
    pub fn time_to_tot(&self, start: f64, stop: f64) -> u32 {
        counter::encode(self.tot_ticks(start, stop), CounterKind::Tot)
    }

    /// Start and stop of a hit from its encoded ToT, ToA and fToA.
    ///
    /// An fToA of 0 is treated as absent and the start falls on the ToA edge.
    #[must_use]
    pub fn tot_and_toa_to_time(&self, tot: u32, toa: u32, ftoa: u32) -> (f64, f64) {
        let start = if ftoa == 0 {
            self.toa_to_time(toa)
        } else {
            self.ftoa_and_toa_to_time(ftoa, toa)
        };
        let ticks = counter::decode(tot, CounterKind::Tot);
        let stop = start + f64::from(ticks) / self.clock.system_clock_hz;
        (start, stop)
    }

    /// Encodes a pulse into its timing counters.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedMode`] for modes without a ToA timestamp.
    pub fn time_to_values(&self, start: f64, stop: f64, mode: OperatingMode) -> Result<TimingValues> {
        let toa = self.time_to_toa(start);
        let ftoa = self.time_to_ftoa(start);

        match mode {
            OperatingMode::ToaAndTot => Ok(TimingValues {
                toa,
                ftoa,
                tot: self.time_to_tot(start, stop),
            }),
            OperatingMode::ToaOnly => Ok(TimingValues { toa, ftoa, tot: 0 }),
            OperatingMode::EventAndItot => Err(Error::UnsupportedMode(mode.code())),
        }
    }

    /// Reconstructs start and stop of a pulse from its timing counters.
    #[must_use]
    pub fn values_to_time(&self, values: TimingValues) -> (f64, f64) {
        self.tot_and_toa_to_time(values.tot, values.toa, values.ftoa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_floor_helpers() {
        assert_eq!(floor_div(1e-7, 2.5e-8), 4.0);
        assert_eq!(floor_mod(1e-7, 2.5e-8), 0.0);
        assert_eq!(floor_div(7.0, 2.0), 3.0);
        assert_eq!(floor_div(-7.0, 2.0), -4.0);
        assert_eq!(floor_mod(-7.0, 2.0), 1.0);
    }

    #[test]
    fn test_toa_rounds_up_to_next_edge() {
        let conv = TimeConverter::default();
        assert_eq!(conv.toa_ticks(0.0), 0);
        assert_eq!(conv.toa_ticks(25e-9), 1);
        assert_eq!(conv.toa_ticks(26e-9), 2);
        assert_eq!(conv.toa_ticks(1e-7), 4);
        // before the epoch
        assert_eq!(conv.toa_ticks(-1e-6), 0);
    }

    #[test]
    fn test_toa_roundtrip() {
        let conv = TimeConverter::default();
        let toa = conv.time_to_toa(1e-7);
        assert_eq!(toa, 6);
        assert_relative_eq!(conv.toa_to_time(toa), 1e-7, max_relative = 1e-12);
    }

    #[test]
    fn test_ftoa() {
        let conv = TimeConverter::default();
        // hit on a clock edge: a full period to the next edge, saturates
        assert_eq!(conv.time_to_ftoa(1e-7), 15);
        assert_eq!(conv.time_to_ftoa(1.23456e-6), 9);
    }

    #[test]
    fn test_tot() {
        let conv = TimeConverter::default();
        assert_eq!(conv.tot_ticks(0.0, 25e-9), 1);
        assert_eq!(conv.tot_ticks(1e-7, 2e-7), 4);
        assert_eq!(conv.time_to_tot(1e-7, 2e-7), 1008);
        assert_eq!(conv.tot_ticks(1e-7, 1.1e-7), 0);
    }

    #[test]
    fn test_values_roundtrip() {
        let conv = TimeConverter::default();

        let values = conv
            .time_to_values(1.23456e-6, 1.3e-6, OperatingMode::ToaAndTot)
            .unwrap();
        assert_eq!(
            values,
            TimingValues {
                toa: 43,
                ftoa: 9,
                tot: 1016
            }
        );

        let (start, stop) = conv.values_to_time(values);
        assert_relative_eq!(start, 1.235_937_5e-6, max_relative = 1e-9);
        assert_relative_eq!(stop, 1.310_937_5e-6, max_relative = 1e-9);
        // recovered within one system clock period
        assert!((start - 1.23456e-6).abs() < 25e-9);
    }

    #[test]
    fn test_toa_only_has_no_tot() {
        let conv = TimeConverter::default();
        let values = conv
            .time_to_values(1e-7, 2e-7, OperatingMode::ToaOnly)
            .unwrap();
        assert_eq!(values.tot, 0);
        assert_eq!(values.toa, 6);

        assert!(conv
            .time_to_values(1e-7, 2e-7, OperatingMode::EventAndItot)
            .is_err());
    }

    #[test]
    fn test_epoch_shift() {
        let conv = TimeConverter::new(ClockConfig::default().with_epoch(1e-6));
        let t = 1e-6 + 82e-9;
        assert_eq!(conv.toa_ticks(t), 4);
        assert_relative_eq!(conv.toa_to_time(conv.time_to_toa(t)), 1.1e-6, max_relative = 1e-9);
    }

    #[test]
    fn test_clock_validation() {
        assert!(ClockConfig::default().validate().is_ok());
        assert!(ClockConfig::default().with_system_clock(0.0).validate().is_err());
        assert!(ClockConfig::default().with_fine_clock(f64::NAN).validate().is_err());
    }
}
