//! Hit stream to packet stream.
//!
//! Hits are grouped per pixel, each pixel runs its own acceptance and field
//! encoding, and the per-pixel results are merged into a single stream
//! ordered by decoded ToA, ties broken by pixel address.

use crate::acceptance::HitAcceptance;
use crate::config::AcquisitionConfig;
use crate::hit::{DiscriminatorPulse, RawHit};
use crate::packet::{EncodedFields, Packet};
use crate::Result;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tpx3sim_core::{ChipGeometry, OperatingMode, PixelAddress, PixelCoord, TimeConverter};

/// Encodes simulated hits into pixel hit packets.
#[derive(Debug, Clone, Copy)]
pub struct PacketEncoder {
    geometry: ChipGeometry,
    converter: TimeConverter,
    acceptance: HitAcceptance,
    mode: OperatingMode,
}

impl PacketEncoder {
    /// Creates an encoder for the given acquisition.
    ///
    /// # Errors
    /// Returns an error if the clocks or the geometry are invalid.
    pub fn new(config: &AcquisitionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            geometry: config.geometry,
            converter: config.converter(),
            acceptance: config.acceptance(),
            mode: config.mode,
        })
    }

    /// Operating mode packets are encoded for.
    #[must_use]
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Groups pulses by pixel address, each group sorted by rising edge.
    ///
    /// The sort is stable, so pulses with equal start keep their input order.
    ///
    /// # Errors
    /// Returns an error if a hit lies outside the chip geometry.
    pub fn group_by_pixel(
        &self,
        hits: &[RawHit],
    ) -> Result<BTreeMap<PixelAddress, Vec<DiscriminatorPulse>>> {
        let mut pixels: BTreeMap<PixelAddress, Vec<DiscriminatorPulse>> = BTreeMap::new();
        for hit in hits {
            let address = self.geometry.to_address(PixelCoord::new(hit.x, hit.y))?;
            pixels.entry(address).or_default().push(hit.pulse());
        }

        for pulses in pixels.values_mut() {
            pulses.sort_by(|a, b| a.start.total_cmp(&b.start));
        }
        Ok(pixels)
    }

    /// Runs acceptance and field encoding for one pixel.
    ///
    /// # Errors
    /// Returns an error if the operating mode has no packet layout.
    pub fn encode_pixel(
        &self,
        address: PixelAddress,
        pulses: &[DiscriminatorPulse],
    ) -> Result<Vec<EncodedFields>> {
        self.acceptance
            .accepted(address, pulses)
            .iter()
            .map(|hit| EncodedFields::from_hit(hit, &self.converter, self.mode))
            .collect()
    }

    /// Encodes hits into field values in stream order.
    ///
    /// # Errors
    /// Returns an error if a hit lies outside the chip geometry or the
    /// operating mode has no packet layout.
    pub fn encode_fields(&self, hits: &[RawHit]) -> Result<Vec<EncodedFields>> {
        let pixels = self.group_by_pixel(hits)?;
        let pixel_count = pixels.len();

        let per_pixel: Vec<Vec<EncodedFields>> = pixels
            .into_par_iter()
            .map(|(address, pulses)| self.encode_pixel(address, &pulses))
            .collect::<Result<_>>()?;

        let mut fields: Vec<EncodedFields> = per_pixel.into_iter().flatten().collect();
        fields.sort_by_key(|f| (f.decoded_toa(), f.addr));

        log::debug!(
            "encoded {} of {} hits on {pixel_count} pixels",
            fields.len(),
            hits.len()
        );
        Ok(fields)
    }

    /// Encodes hits into packets ordered by decoded ToA, then address.
    ///
    /// # Errors
    /// Returns an error if a hit lies outside the chip geometry or the
    /// operating mode has no packet layout.
    pub fn encode_hits(&self, hits: &[RawHit]) -> Result<Vec<Packet>> {
        Ok(self
            .encode_fields(hits)?
            .iter()
            .map(Packet::pack)
            .collect())
    }
}
