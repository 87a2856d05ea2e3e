//! Pixel counter codecs.
//!
//! Timepix3 pixel counters do not count in plain binary. The ToA counter is
//! Gray coded, the fToA counter saturates at 15, and the remaining counters
//! are linear-feedback shift registers (LFSR) seeded with all ones. Some of
//! the LFSR counters stop at a fixed overflow value once they have run
//! through their full cycle.
//!
//! | Kind    | Bits | Coding      | Taps          | Overflow       |
//! |---------|------|-------------|---------------|----------------|
//! | `Toa`   | 14   | Gray        | -             | none           |
//! | `Ftoa`  | 4    | saturating  | -             | saturates at 15|
//! | `Tot`   | 10   | LFSR        | 6, 9          | `0b0111111111` |
//! | `Itot`  | 14   | LFSR        | 1, 11, 12, 13 | none           |
//! | `Pc10b` | 10   | LFSR        | 6, 9          | `0b0111111111` |
//! | `Pc4b`  | 4    | LFSR        | 3, 2          | `0b0111`       |
//!
//! LFSR values are decoded through a [`CounterTable`] built once per
//! register layout. [`search_decode`] is the step-by-step definition the
//! tables are derived from.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width of the ToA counter.
pub const TOA_BITS: u32 = 14;
/// Width of the fToA counter.
pub const FTOA_BITS: u32 = 4;
/// Largest value the fToA counter can show.
pub const FTOA_MAX: u32 = 15;

/// The pixel counters of a Timepix3 pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CounterKind {
    /// Coarse time of arrival (Gray code).
    Toa,
    /// Fine time of arrival (saturating binary).
    Ftoa,
    /// Time over threshold.
    Tot,
    /// Integral time over threshold.
    Itot,
    /// 10-bit event counter.
    Pc10b,
    /// 4-bit event counter.
    Pc4b,
}

impl CounterKind {
    /// All counter kinds.
    pub const ALL: [CounterKind; 6] = [
        CounterKind::Toa,
        CounterKind::Ftoa,
        CounterKind::Tot,
        CounterKind::Itot,
        CounterKind::Pc10b,
        CounterKind::Pc4b,
    ];

    /// Register width in bits.
    #[must_use]
    pub fn width(self) -> u32 {
        match self {
            CounterKind::Toa | CounterKind::Itot => 14,
            CounterKind::Tot | CounterKind::Pc10b => 10,
            CounterKind::Ftoa | CounterKind::Pc4b => 4,
        }
    }

    /// LFSR layout, or `None` for the Gray and saturating counters.
    #[must_use]
    pub fn lfsr(self) -> Option<LfsrParams> {
        match self {
            CounterKind::Tot | CounterKind::Pc10b => Some(LfsrParams::TOT),
            CounterKind::Itot => Some(LfsrParams::ITOT),
            CounterKind::Pc4b => Some(LfsrParams::PC4B),
            CounterKind::Toa | CounterKind::Ftoa => None,
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CounterKind::Toa => "ToA",
            CounterKind::Ftoa => "fToA",
            CounterKind::Tot => "ToT",
            CounterKind::Itot => "iToT",
            CounterKind::Pc10b => "PC10b",
            CounterKind::Pc4b => "PC4b",
        };
        f.write_str(name)
    }
}

impl FromStr for CounterKind {
    type Err = Error;

    /// Parses the counter names used in the Timepix3 manual, ignoring case.
    fn from_str(name: &str) -> Result<Self> {
        CounterKind::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::ConfigError(format!("unknown counter kind '{name}'")))
    }
}

/// Register layout of an LFSR counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfsrParams {
    width: u32,
    taps: [u32; 4],
    overflow: Option<u32>,
}

impl LfsrParams {
    /// 10-bit ToT / event counter.
    pub const TOT: LfsrParams = LfsrParams {
        width: 10,
        taps: [6, 9, 0, 0],
        overflow: Some(0b01_1111_1111),
    };

    /// 14-bit integral ToT counter.
    pub const ITOT: LfsrParams = LfsrParams {
        width: 14,
        taps: [1, 11, 12, 13],
        overflow: None,
    };

    /// 4-bit event counter.
    pub const PC4B: LfsrParams = LfsrParams {
        width: 4,
        taps: [3, 2, 0, 0],
        overflow: Some(0b0111),
    };

    /// Register width in bits.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Feedback tap offsets from the least-significant bit.
    #[must_use]
    pub fn taps(&self) -> [u32; 4] {
        self.taps
    }

    /// Fixed value shown after the counter has wrapped, if any.
    #[must_use]
    pub fn overflow(&self) -> Option<u32> {
        self.overflow
    }

    /// Reset value of the register (all ones).
    #[must_use]
    pub fn seed(&self) -> u32 {
        (1 << self.width) - 1
    }

    fn is_overflow_count(&self, count: u64) -> bool {
        self.overflow.is_some() && count >= u64::from(self.seed() - 1)
    }
}

/// Advances an LFSR register by one clock.
///
/// The register is shifted left, the bit leaving the register is dropped and
/// the XOR of the tap bits becomes the new least-significant bit. Four-tap
/// feedback is used when the third and fourth taps are both non-zero.
///
/// `width` must be below 32 and every tap below `width`.
#[inline]
#[must_use]
pub fn lfsr_step(register: u32, width: u32, taps: [u32; 4]) -> u32 {
    debug_assert!(width < u32::BITS, "LFSR width {width} does not fit a u32 register");
    let bit = |tap: u32| (register >> tap) & 1;

    let mut feedback = bit(taps[0]) ^ bit(taps[1]);
    if taps[2] != 0 && taps[3] != 0 {
        feedback ^= bit(taps[2]) ^ bit(taps[3]);
    }

    ((register << 1) & ((1 << width) - 1)) | feedback
}

/// Binary to Gray code.
#[inline]
#[must_use]
pub fn bin_to_gray(n: u64) -> u64 {
    n ^ (n >> 1)
}

/// Gray code to binary.
#[inline]
#[must_use]
pub fn gray_to_bin(mut n: u64) -> u64 {
    let mut mask = n >> 1;
    while mask != 0 {
        n ^= mask;
        mask >>= 1;
    }
    n
}

/// Encodes `count` by clocking the register `count` times from its seed.
///
/// This is the reference definition; [`CounterTable::encode`] gives the same
/// result without stepping.
#[must_use]
pub fn search_encode(count: u64, params: LfsrParams) -> u32 {
    if let Some(overflow) = params.overflow {
        if params.is_overflow_count(count) {
            return overflow;
        }
    }

    let mut register = params.seed();
    for _ in 0..count {
        register = lfsr_step(register, params.width, params.taps);
    }
    register
}

/// Decodes `value` by clocking the register from its seed until it shows
/// `value`.
///
/// Returns the number of clocks needed, or 0 if a full `seed` clocks pass
/// without a match. The overflow value decodes to `seed - 1`.
#[must_use]
pub fn search_decode(value: u32, params: LfsrParams) -> u32 {
    let seed = params.seed();
    if params.overflow == Some(value) {
        return seed - 1;
    }

    let mut register = seed;
    for count in 1..seed {
        register = lfsr_step(register, params.width, params.taps);
        if register == value {
            return count;
        }
    }
    0
}

/// Marks register values that are never reached from the seed.
const UNREACHED: u32 = u32::MAX;

/// Precomputed forward and reverse mapping for one LFSR layout.
#[derive(Debug, Clone)]
pub struct CounterTable {
    params: LfsrParams,
    /// Register value after `n` clocks, for one full period.
    forward: Vec<u32>,
    /// Count for each register value, `UNREACHED` if never shown.
    reverse: Vec<u32>,
}

impl CounterTable {
    /// Builds the table by walking the register through its cycle.
    #[must_use]
    pub fn build(params: LfsrParams) -> Self {
        let seed = params.seed();
        let states = 1usize << params.width;

        let mut forward = Vec::with_capacity(states);
        let mut register = seed;
        loop {
            forward.push(register);
            register = lfsr_step(register, params.width, params.taps);
            if register == seed || forward.len() == states {
                break;
            }
        }
        let period = forward.len();

        let mut reverse = vec![UNREACHED; states];
        for count in 1..seed {
            let value = forward[count as usize % period];
            if reverse[value as usize] == UNREACHED {
                reverse[value as usize] = count;
            }
        }
        // Reaching a value only on the final clock counts as a full cycle.
        let last = forward[seed as usize % period];
        if reverse[last as usize] == UNREACHED {
            reverse[last as usize] = 0;
        }

        log::debug!(
            "built {}-bit LFSR table, period {period}",
            params.width
        );

        Self {
            params,
            forward,
            reverse,
        }
    }

    /// Shared table for an LFSR counter kind, built on first use.
    #[must_use]
    pub fn for_kind(kind: CounterKind) -> Option<&'static CounterTable> {
        static TOT: OnceLock<CounterTable> = OnceLock::new();
        static ITOT: OnceLock<CounterTable> = OnceLock::new();
        static PC4B: OnceLock<CounterTable> = OnceLock::new();

        let (cell, params) = match kind {
            CounterKind::Tot | CounterKind::Pc10b => (&TOT, LfsrParams::TOT),
            CounterKind::Itot => (&ITOT, LfsrParams::ITOT),
            CounterKind::Pc4b => (&PC4B, LfsrParams::PC4B),
            CounterKind::Toa | CounterKind::Ftoa => return None,
        };
        Some(cell.get_or_init(|| CounterTable::build(params)))
    }

    /// Register layout this table was built from.
    #[must_use]
    pub fn params(&self) -> LfsrParams {
        self.params
    }

    /// Number of distinct register values in the cycle through the seed.
    #[must_use]
    pub fn period(&self) -> usize {
        self.forward.len()
    }

    /// Register value after `count` clocks, with overflow control applied.
    #[must_use]
    pub fn encode(&self, count: u64) -> u32 {
        if let Some(overflow) = self.params.overflow {
            if self.params.is_overflow_count(count) {
                return overflow;
            }
        }
        // period <= 2^14, the remainder always fits in usize
        #[allow(clippy::cast_possible_truncation)]
        let index = (count % self.forward.len() as u64) as usize;
        self.forward[index]
    }

    /// Count shown by `value`, or `None` when the search would exhaust the
    /// cycle without a match.
    #[must_use]
    pub fn try_decode(&self, value: u32) -> Option<u32> {
        if self.params.overflow == Some(value) {
            return Some(self.params.seed() - 1);
        }
        match self.reverse.get(value as usize) {
            Some(&UNREACHED) | None => None,
            Some(&count) => Some(count),
        }
    }

    /// Count shown by `value`; unreachable values decode to 0.
    #[must_use]
    pub fn decode(&self, value: u32) -> u32 {
        self.try_decode(value).unwrap_or(0)
    }
}

/// Encodes a sequential count into the value the hardware counter shows.
///
/// ToA ticks beyond the 14-bit span are not overflow controlled. The Gray
/// code of the full count is truncated to the register width, so past the
/// span the decoded ToA runs backwards: tick `16384 + k` decodes to
/// `16383 - k`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode(count: u64, kind: CounterKind) -> u32 {
    match kind {
        CounterKind::Toa => (bin_to_gray(count) & ((1 << TOA_BITS) - 1)) as u32,
        CounterKind::Ftoa => u32::try_from(count.min(u64::from(FTOA_MAX))).unwrap_or(FTOA_MAX),
        _ => CounterTable::for_kind(kind).map_or(0, |table| table.encode(count)),
    }
}

/// Decodes a counter value into a sequential count.
///
/// LFSR values that never appear in the counter sequence decode to 0, the
/// same as a genuine zero count. Use [`try_decode`] to tell them apart.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decode(value: u32, kind: CounterKind) -> u32 {
    match kind {
        CounterKind::Toa => gray_to_bin(u64::from(value) & ((1 << TOA_BITS) - 1)) as u32,
        CounterKind::Ftoa => value,
        _ => CounterTable::for_kind(kind).map_or(0, |table| table.decode(value)),
    }
}

/// Decodes a counter value, reporting values outside the LFSR sequence.
///
/// # Errors
/// Returns [`Error::AmbiguousDecode`] when `value` is never shown by the
/// counter (for example the all-zero register of an LFSR counter).
pub fn try_decode(value: u32, kind: CounterKind) -> Result<u32> {
    match CounterTable::for_kind(kind) {
        Some(table) => table
            .try_decode(value)
            .ok_or(Error::AmbiguousDecode { kind, value }),
        None => Ok(decode(value, kind)),
    }
}
