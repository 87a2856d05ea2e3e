//! Per-pixel hit acceptance.
//!
//! A pixel only reports a discriminator pulse if the pulse is at least one
//! ToT tick long and starts after the dead time that follows the previously
//! accepted pulse. Acceptance is a fold over the start-ordered pulses of one
//! pixel, carrying [`PixelState`] from pulse to pulse. Rejected pulses leave
//! the state untouched, so they never move the dead-time window.

use crate::hit::{AcceptedHit, DiscriminatorPulse};
use tpx3sim_core::counter::{self, CounterKind};
use tpx3sim_core::{OperatingMode, PixelAddress, TimeConverter};

/// Dead-time offset in ToA & ToT and ToA-only modes, in clock ticks.
const DEAD_TIME_TICKS: u32 = 19;
/// Dead-time offset in event count & iToT mode, in clock ticks.
const DEAD_TIME_TICKS_EVENT: u32 = 3;

/// Pixel dead time after an accepted pulse with `previous_tot` ToT ticks.
#[must_use]
pub fn dead_time(previous_tot: u32, mode: OperatingMode, clock_hz: f64) -> f64 {
    let ticks = match mode {
        OperatingMode::ToaAndTot => DEAD_TIME_TICKS + previous_tot,
        OperatingMode::ToaOnly => DEAD_TIME_TICKS,
        OperatingMode::EventAndItot => DEAD_TIME_TICKS_EVENT + previous_tot,
    };
    f64::from(ticks) / clock_hz
}

/// What a pixel remembers about its last accepted pulse.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelState {
    /// Decoded ToT of the last accepted pulse.
    pub previous_tot: u32,
    /// Falling edge of the last accepted pulse, `None` before the first.
    pub previous_end: Option<f64>,
}

/// Outcome for a single pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The pixel reports the pulse.
    Accepted,
    /// Shorter than one ToT tick.
    TooShort,
    /// Started inside the dead time of the previous accepted pulse.
    DeadTime,
}

impl Verdict {
    /// Returns true if the pulse was accepted.
    #[inline]
    #[must_use]
    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

/// Hit acceptance for one operating mode.
#[derive(Debug, Clone, Copy)]
pub struct HitAcceptance {
    converter: TimeConverter,
    mode: OperatingMode,
}

impl HitAcceptance {
    /// Creates an acceptance filter.
    #[must_use]
    pub fn new(converter: TimeConverter, mode: OperatingMode) -> Self {
        Self { converter, mode }
    }

    /// Operating mode the dead time is computed for.
    #[must_use]
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Judges one pulse and returns the state for the next one.
    #[must_use]
    pub fn step(&self, state: PixelState, pulse: &DiscriminatorPulse) -> (PixelState, Verdict) {
        let encoded = self.converter.time_to_tot(pulse.start, pulse.stop);
        let tot = counter::decode(encoded, CounterKind::Tot);
        if tot < 1 {
            return (state, Verdict::TooShort);
        }

        if let Some(previous_end) = state.previous_end {
            let clock_hz = self.converter.clock().system_clock_hz;
            if pulse.start - previous_end < dead_time(state.previous_tot, self.mode, clock_hz) {
                return (state, Verdict::DeadTime);
            }
        }

        let next = PixelState {
            previous_tot: tot,
            previous_end: Some(pulse.stop),
        };
        (next, Verdict::Accepted)
    }

    /// Judges a start-ordered pulse sequence of one pixel.
    #[must_use]
    pub fn evaluate(&self, pulses: &[DiscriminatorPulse]) -> Vec<Verdict> {
        pulses
            .iter()
            .scan(PixelState::default(), |state, pulse| {
                let (next, verdict) = self.step(*state, pulse);
                *state = next;
                Some(verdict)
            })
            .collect()
    }

    /// Returns the accepted pulses of one pixel, in order.
    #[must_use]
    pub fn accepted(&self, address: PixelAddress, pulses: &[DiscriminatorPulse]) -> Vec<AcceptedHit> {
        let verdicts = self.evaluate(pulses);
        let rejected = verdicts.iter().filter(|v| !v.is_accepted()).count();
        if rejected > 0 {
            log::trace!(
                "pixel {:#06x}: rejected {rejected} of {} pulses",
                address.as_u16(),
                pulses.len()
            );
        }

        pulses
            .iter()
            .zip(verdicts)
            .filter(|(_, verdict)| verdict.is_accepted())
            .map(|(pulse, _)| AcceptedHit::new(address, *pulse))
            .collect()
    }
}
