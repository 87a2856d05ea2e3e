//! 48-bit pixel hit packets.
//!
//! Bit layout, most significant first:
//!
//! ```text
//! 47..44  header     0b1010
//! 43..28  address    16 bits
//! 27..14  toa        14 bits, Gray coded
//! 13..4   secondary  10 bits, ToT (ToA & ToT) or dummy (ToA only)
//!  3..0   ftoa        4 bits
//! ```
//!
//! Packets are stored as 6 big-endian bytes without any framing.

use crate::hit::AcceptedHit;
use crate::{Error, Result};
use tpx3sim_core::counter::{self, CounterKind};
use tpx3sim_core::{OperatingMode, PixelAddress, TimeConverter};

const ADDR_MASK: u64 = 0xFFFF;
const TOA_MASK: u64 = 0x3FFF;
const SECONDARY_MASK: u64 = 0x3FF;
const FTOA_MASK: u64 = 0xF;
const HEADER_MASK: u64 = 0xF;

const FTOA_SHIFT: u32 = 0;
const SECONDARY_SHIFT: u32 = 4;
const TOA_SHIFT: u32 = 14;
const ADDR_SHIFT: u32 = 28;
const HEADER_SHIFT: u32 = 44;

/// Secondary field value in ToA-only mode.
pub const DUMMY_SECONDARY: u16 = 0;

/// Counter values carried by a packet besides its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EncodedFields {
    /// Pixel address.
    pub addr: u16,
    /// Gray-coded ToA (14 bits).
    pub toa: u16,
    /// Encoded ToT or dummy (10 bits).
    pub secondary: u16,
    /// fToA (4 bits).
    pub ftoa: u8,
}

impl EncodedFields {
    /// Encodes an accepted hit for the given mode.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedMode`] for modes without a ToA packet layout.
    // Counter values never exceed their register widths.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_hit(hit: &AcceptedHit, converter: &TimeConverter, mode: OperatingMode) -> Result<Self> {
        let values = match mode {
            OperatingMode::ToaAndTot | OperatingMode::ToaOnly => {
                converter.time_to_values(hit.start, hit.stop, mode)?
            }
            OperatingMode::EventAndItot => return Err(Error::UnsupportedMode(mode)),
        };

        let secondary = if mode.measures_tot() {
            values.tot
        } else {
            u32::from(DUMMY_SECONDARY)
        };

        Ok(Self {
            addr: hit.address.as_u16(),
            toa: values.toa as u16,
            secondary: secondary as u16,
            ftoa: values.ftoa as u8,
        })
    }

    /// Pixel address of the hit.
    #[inline]
    #[must_use]
    pub fn address(&self) -> PixelAddress {
        PixelAddress(self.addr)
    }

    /// Sequential ToA tick count.
    #[inline]
    #[must_use]
    pub fn decoded_toa(&self) -> u32 {
        counter::decode(u32::from(self.toa), CounterKind::Toa)
    }
}

/// A 48-bit pixel hit packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet(u64);

impl Packet {
    /// Header nibble of pixel hit packets.
    pub const HEADER: u8 = 0b1010;
    /// Bytes per stored packet.
    pub const BYTES: usize = 6;

    /// Wraps a raw word, keeping the low 48 bits.
    #[inline]
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw & 0xFFFF_FFFF_FFFF)
    }

    /// Assembles a packet from its fields.
    #[must_use]
    pub fn pack(fields: &EncodedFields) -> Self {
        let raw = ((u64::from(Self::HEADER) & HEADER_MASK) << HEADER_SHIFT)
            | ((u64::from(fields.addr) & ADDR_MASK) << ADDR_SHIFT)
            | ((u64::from(fields.toa) & TOA_MASK) << TOA_SHIFT)
            | ((u64::from(fields.secondary) & SECONDARY_MASK) << SECONDARY_SHIFT)
            | ((u64::from(fields.ftoa) & FTOA_MASK) << FTOA_SHIFT);
        Self(raw)
    }

    /// Raw 48-bit word.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Header nibble.
    #[inline]
    #[must_use]
    pub fn header(&self) -> u8 {
        ((self.0 >> HEADER_SHIFT) & HEADER_MASK) as u8
    }

    /// Returns true if the header marks a pixel hit.
    #[inline]
    #[must_use]
    pub fn is_pixel_hit(&self) -> bool {
        self.header() == Self::HEADER
    }

    /// Pixel address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> u16 {
        ((self.0 >> ADDR_SHIFT) & ADDR_MASK) as u16
    }

    /// Gray-coded ToA.
    #[inline]
    #[must_use]
    pub fn toa(&self) -> u16 {
        ((self.0 >> TOA_SHIFT) & TOA_MASK) as u16
    }

    /// ToT or dummy field.
    #[inline]
    #[must_use]
    pub fn secondary(&self) -> u16 {
        ((self.0 >> SECONDARY_SHIFT) & SECONDARY_MASK) as u16
    }

    /// fToA.
    #[inline]
    #[must_use]
    pub fn ftoa(&self) -> u8 {
        ((self.0 >> FTOA_SHIFT) & FTOA_MASK) as u8
    }

    /// Unpacks all fields after checking the header.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPacketHeader`] if this is not a pixel hit packet.
    pub fn fields(&self) -> Result<EncodedFields> {
        if !self.is_pixel_hit() {
            return Err(Error::InvalidPacketHeader(self.0));
        }
        Ok(EncodedFields {
            addr: self.address(),
            toa: self.toa(),
            secondary: self.secondary(),
            ftoa: self.ftoa(),
        })
    }

    /// Big-endian storage form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        let wide = self.0.to_be_bytes();
        let mut bytes = [0u8; Self::BYTES];
        bytes.copy_from_slice(&wide[8 - Self::BYTES..]);
        bytes
    }

    /// Reads a packet from its big-endian storage form.
    #[must_use]
    pub fn from_bytes(bytes: [u8; Self::BYTES]) -> Self {
        let mut wide = [0u8; 8];
        wide[8 - Self::BYTES..].copy_from_slice(&bytes);
        Self(u64::from_be_bytes(wide))
    }
}

/// Splits a byte stream into packets.
///
/// # Errors
/// Returns [`Error::MalformedStream`] if the length is not a multiple of
/// [`Packet::BYTES`].
pub fn packets_from_bytes(data: &[u8]) -> Result<Vec<Packet>> {
    if !data.len().is_multiple_of(Packet::BYTES) {
        return Err(Error::MalformedStream(data.len()));
    }

    Ok(data
        .chunks_exact(Packet::BYTES)
        .map(|chunk| {
            let mut bytes = [0u8; Packet::BYTES];
            bytes.copy_from_slice(chunk);
            Packet::from_bytes(bytes)
        })
        .collect())
}

/// Serializes packets back to back.
#[must_use]
pub fn packets_to_bytes(packets: &[Packet]) -> Vec<u8> {
    let mut data = Vec::with_capacity(packets.len() * Packet::BYTES);
    for packet in packets {
        data.extend_from_slice(&packet.to_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::DiscriminatorPulse;

    #[test]
    fn test_pack_layout() {
        let fields = EncodedFields {
            addr: 0xABCD,
            toa: 0x2AAA,
            secondary: 0x155,
            ftoa: 0x9,
        };
        let packet = Packet::pack(&fields);

        assert_eq!(packet.raw(), 0xA_ABCD_AAA9_559);
        assert_eq!(packet.header(), Packet::HEADER);
        assert_eq!(packet.fields().unwrap(), fields);
    }

    #[test]
    fn test_pack_masks_fields() {
        let fields = EncodedFields {
            addr: 0,
            toa: 0xFFFF,
            secondary: 0xFFFF,
            ftoa: 0xFF,
        };
        let packet = Packet::pack(&fields);
        assert_eq!(packet.toa(), 0x3FFF);
        assert_eq!(packet.secondary(), 0x3FF);
        assert_eq!(packet.ftoa(), 0xF);
        assert_eq!(packet.address(), 0);
    }

    #[test]
    fn test_big_endian_bytes() {
        let packet = Packet::new(0xA102_0304_0506);
        assert_eq!(packet.to_bytes(), [0xA1, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(Packet::from_bytes(packet.to_bytes()), packet);
    }

    #[test]
    fn test_invalid_header() {
        let packet = Packet::new(0xB000_0000_0000);
        assert!(!packet.is_pixel_hit());
        assert!(matches!(packet.fields(), Err(Error::InvalidPacketHeader(_))));
    }

    #[test]
    fn test_fields_from_hit() {
        let converter = TimeConverter::default();
        let hit = AcceptedHit::new(
            tpx3sim_core::geometry::to_address(10, 20).unwrap(),
            DiscriminatorPulse::new(1e-7, 2e-7),
        );

        let fields = EncodedFields::from_hit(&hit, &converter, OperatingMode::ToaAndTot).unwrap();
        assert_eq!(fields.addr, (5 << 9) | (5 << 3));
        assert_eq!(fields.toa, 6);
        assert_eq!(fields.secondary, 1008);
        assert_eq!(fields.ftoa, 15);
        assert_eq!(fields.decoded_toa(), 4);

        let toa_only = EncodedFields::from_hit(&hit, &converter, OperatingMode::ToaOnly).unwrap();
        assert_eq!(toa_only.secondary, DUMMY_SECONDARY);

        assert!(matches!(
            EncodedFields::from_hit(&hit, &converter, OperatingMode::EventAndItot),
            Err(Error::UnsupportedMode(OperatingMode::EventAndItot))
        ));
    }

    #[test]
    fn test_stream_bytes() {
        let packets = vec![Packet::new(0xA000_0000_0001), Packet::new(0xAFFF_F000_0002)];
        let data = packets_to_bytes(&packets);
        assert_eq!(data.len(), 12);
        assert_eq!(packets_from_bytes(&data).unwrap(), packets);

        assert!(matches!(
            packets_from_bytes(&data[..7]),
            Err(Error::MalformedStream(7))
        ));
    }
}
