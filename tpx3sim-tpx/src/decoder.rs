//! Packet stream to hit records.

use crate::config::AcquisitionConfig;
use crate::packet::{EncodedFields, Packet};
use crate::{Error, Result};
use serde::Serialize;
use tpx3sim_core::counter::{self, CounterKind};
use tpx3sim_core::{ChipGeometry, OperatingMode, TimeConverter};

/// What a decoded record should contain besides the pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reconstruct start and stop times.
    pub want_time: bool,
    /// Replace raw counter values by sequential counts.
    pub want_decoded: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            want_time: true,
            want_decoded: false,
        }
    }
}

impl DecodeOptions {
    /// Raw counters only.
    #[must_use]
    pub fn raw() -> Self {
        Self {
            want_time: false,
            want_decoded: false,
        }
    }

    /// Times and decoded counters.
    #[must_use]
    pub fn full() -> Self {
        Self {
            want_time: true,
            want_decoded: true,
        }
    }

    /// Sets whether times are reconstructed.
    #[must_use]
    pub fn with_time(mut self, want_time: bool) -> Self {
        self.want_time = want_time;
        self
    }

    /// Sets whether counters are decoded.
    #[must_use]
    pub fn with_decoded(mut self, want_decoded: bool) -> Self {
        self.want_decoded = want_decoded;
        self
    }
}

/// One decoded pixel hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
    /// Reconstructed rising edge, in seconds.
    pub start: Option<f64>,
    /// Reconstructed falling edge, `None` in ToA-only mode.
    pub stop: Option<f64>,
    /// ToA, raw Gray code or tick count.
    pub toa: u32,
    /// ToT (raw LFSR value or tick count) or the ToA-only dummy.
    pub secondary: u32,
    /// fToA.
    pub ftoa: u32,
}

/// Decodes pixel hit packets.
#[derive(Debug, Clone, Copy)]
pub struct PacketDecoder {
    geometry: ChipGeometry,
    converter: TimeConverter,
    mode: OperatingMode,
    options: DecodeOptions,
}

impl PacketDecoder {
    /// Creates a decoder for the given acquisition.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedMode`] if the mode has no packet layout,
    /// or an error if the clocks or the geometry are invalid.
    pub fn new(config: &AcquisitionConfig, options: DecodeOptions) -> Result<Self> {
        config.validate()?;
        if config.mode == OperatingMode::EventAndItot {
            return Err(Error::UnsupportedMode(config.mode));
        }
        Ok(Self {
            geometry: config.geometry,
            converter: config.converter(),
            mode: config.mode,
            options,
        })
    }

    /// Options in use.
    #[must_use]
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Decodes a single packet.
    ///
    /// # Errors
    /// Returns an error if the header is not a pixel hit header or the
    /// address lies outside the chip geometry.
    pub fn decode_packet(&self, packet: Packet) -> Result<DecodedRecord> {
        let fields = packet.fields()?;
        let coord = self.geometry.to_coordinate(fields.address())?;

        let (start, stop) = if self.options.want_time {
            self.times(&fields)
        } else {
            (None, None)
        };

        let (toa, secondary, ftoa) = if self.options.want_decoded {
            self.decoded_counters(&fields)
        } else {
            (
                u32::from(fields.toa),
                u32::from(fields.secondary),
                u32::from(fields.ftoa),
            )
        };

        Ok(DecodedRecord {
            x: coord.x,
            y: coord.y,
            start,
            stop,
            toa,
            secondary,
            ftoa,
        })
    }

    /// Decodes packets, keeping stream order.
    ///
    /// # Errors
    /// Fails on the first packet [`decode_packet`](Self::decode_packet)
    /// rejects.
    pub fn decode_packets(&self, packets: &[Packet]) -> Result<Vec<DecodedRecord>> {
        let records = packets
            .iter()
            .map(|&packet| self.decode_packet(packet))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("decoded {} packets", records.len());
        Ok(records)
    }

    fn times(&self, fields: &EncodedFields) -> (Option<f64>, Option<f64>) {
        let toa = u32::from(fields.toa);
        let ftoa = u32::from(fields.ftoa);
        if self.mode.measures_tot() {
            let (start, stop) =
                self.converter
                    .tot_and_toa_to_time(u32::from(fields.secondary), toa, ftoa);
            (Some(start), Some(stop))
        } else {
            (Some(self.converter.ftoa_and_toa_to_time(ftoa, toa)), None)
        }
    }

    fn decoded_counters(&self, fields: &EncodedFields) -> (u32, u32, u32) {
        let toa = counter::decode(u32::from(fields.toa), CounterKind::Toa);
        let ftoa = counter::decode(u32::from(fields.ftoa), CounterKind::Ftoa);

        let secondary = if self.mode.measures_tot() {
            match counter::try_decode(u32::from(fields.secondary), CounterKind::Tot) {
                Ok(ticks) => ticks,
                Err(e) => {
                    log::warn!("pixel {:#06x}: {e}, using 0", fields.addr);
                    0
                }
            }
        } else {
            u32::from(fields.secondary)
        };

        (toa, secondary, ftoa)
    }
}

/// Sorts records by reconstructed start time; records without a time keep
/// their relative order at the end.
pub fn sort_records_by_start(records: &mut [DecodedRecord]) {
    records.sort_by(|a, b| match (a.start, b.start) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
