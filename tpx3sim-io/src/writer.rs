//! File writers for packet streams and decoded hits.

use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tpx3sim_tpx::{DecodedRecord, Packet};

/// Writer for binary packet files.
///
/// The file is truncated on creation and written once.
pub struct PacketFileWriter {
    writer: BufWriter<File>,
    written: usize,
}

impl PacketFileWriter {
    /// Creates (or truncates) a packet file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Appends packets as 6-byte big-endian records.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_packets(&mut self, packets: &[Packet]) -> Result<()> {
        for packet in packets {
            self.writer.write_all(&packet.to_bytes())?;
        }
        self.written += packets.len();
        Ok(())
    }

    /// Number of packets written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and closes the file, returning the packet count.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        log::debug!("wrote {} packets", self.written);
        Ok(self.written)
    }
}

/// Writer for decoded hit tables.
pub struct DataFileWriter {
    writer: BufWriter<File>,
}

impl DataFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes decoded records as CSV. Missing times are left empty.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_records_csv(&mut self, records: &[DecodedRecord]) -> Result<()> {
        writeln!(self.writer, "x,y,start,stop,toa,secondary,ftoa")?;

        for r in records {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{}",
                r.x,
                r.y,
                optional(r.start),
                optional(r.stop),
                r.toa,
                r.secondary,
                r.ftoa
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
