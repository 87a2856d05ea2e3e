//! Memory-mapped packet file readers.
//!

use crate::{Error, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tpx3sim_tpx::{AcquisitionConfig, DecodeOptions, DecodedRecord, Packet, PacketDecoder};

/// Read-only view of a file through a memory map.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Maps `path` read-only.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: packet files are written once and only read afterwards.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.to_path_buf(),
        })
    }

    /// Mapped bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// True for a zero-length file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reader for packet files: 6-byte big-endian records without framing.
pub struct PacketFileReader {
    reader: MappedFileReader,
}

impl PacketFileReader {
    /// Opens a packet file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: MappedFileReader::open(path)?,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Returns the number of whole packets in the file.
    #[must_use]
    pub fn packet_count(&self) -> usize {
        self.reader.len() / Packet::BYTES
    }

    /// Reads all packets in file order.
    ///
    /// # Errors
    /// Returns [`Error::MalformedFile`] if the file size is not a multiple
    /// of the packet size.
    pub fn read_packets(&self) -> Result<Vec<Packet>> {
        if !self.reader.len().is_multiple_of(Packet::BYTES) {
            return Err(Error::MalformedFile {
                len: self.reader.len(),
            });
        }

        let packets: Vec<Packet> = self
            .reader
            .as_bytes()
            .par_chunks_exact(Packet::BYTES)
            .map(|chunk| {
                let mut bytes = [0u8; Packet::BYTES];
                bytes.copy_from_slice(chunk);
                Packet::from_bytes(bytes)
            })
            .collect();

        log::debug!(
            "read {} packets from {}",
            packets.len(),
            self.reader.path().display()
        );
        Ok(packets)
    }

    /// Reads and decodes all packets in file order.
    ///
    /// # Errors
    /// Returns an error if the file is malformed or a packet cannot be
    /// decoded.
    pub fn read_records(
        &self,
        config: &AcquisitionConfig,
        options: DecodeOptions,
    ) -> Result<Vec<DecodedRecord>> {
        let packets = self.read_packets()?;
        let decoder = PacketDecoder::new(config, options)?;
        Ok(decoder.decode_packets(&packets)?)
    }
}
