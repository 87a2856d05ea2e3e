use approx::assert_relative_eq;
use tempfile::NamedTempFile;
use tpx3sim_io::{
    decode_file, encode_to_file, DataFileWriter, Error, PacketFileReader, PacketFileWriter,
};
use tpx3sim_tpx::{
    AcquisitionConfig, ClockConfig, DecodeOptions, OperatingMode, PacketEncoder, RawHit,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One hit per pixel on a diagonal, spaced 1 µs apart in reverse order.
fn diagonal_hits(n: u16) -> Vec<RawHit> {
    (0..n)
        .map(|i| {
            let start = f64::from(n - i) * 1e-6 + 3e-9;
            RawHit::new(i, i, start, start + 2e-7)
        })
        .collect()
}

#[test]
fn test_file_roundtrip_in_toa_order() {
    init_logger();
    let config = AcquisitionConfig::default();
    let hits = diagonal_hits(200);
    let file = NamedTempFile::new().unwrap();

    let written = encode_to_file(file.path(), &hits, &config).unwrap();
    assert_eq!(written, 200);

    let reader = PacketFileReader::open(file.path()).unwrap();
    assert_eq!(reader.file_size(), 200 * 6);
    assert_eq!(reader.packet_count(), 200);

    let expected = PacketEncoder::new(&config).unwrap().encode_hits(&hits).unwrap();
    assert_eq!(reader.read_packets().unwrap(), expected);

    let records = reader.read_records(&config, DecodeOptions::full()).unwrap();
    assert_eq!(records.len(), 200);
    for pair in records.windows(2) {
        assert!(pair[0].toa <= pair[1].toa);
    }
    // latest hit was written first in the input, it comes out last
    assert_eq!((records[199].x, records[199].y), (0, 0));
    assert_relative_eq!(records[199].start.unwrap(), 200e-6 + 3e-9, epsilon = 1.6e-9);
}

#[test]
fn test_decode_file_matches_reader() {
    let config = AcquisitionConfig::default().with_mode(OperatingMode::ToaOnly);
    let hits = diagonal_hits(16);
    let file = NamedTempFile::new().unwrap();
    encode_to_file(file.path(), &hits, &config).unwrap();

    let records = decode_file(file.path(), &config, DecodeOptions::default()).unwrap();
    assert_eq!(records.len(), 16);
    assert!(records.iter().all(|r| r.stop.is_none()));
}

#[test]
fn test_empty_file() {
    let file = NamedTempFile::new().unwrap();
    let writer = PacketFileWriter::create(file.path()).unwrap();
    assert_eq!(writer.finish().unwrap(), 0);

    let reader = PacketFileReader::open(file.path()).unwrap();
    assert_eq!(reader.packet_count(), 0);
    assert!(reader.read_packets().unwrap().is_empty());
}

#[test]
fn test_malformed_file() {
    let config = AcquisitionConfig::default();
    let file = NamedTempFile::new().unwrap();
    encode_to_file(file.path(), &diagonal_hits(3), &config).unwrap();

    let mut data = std::fs::read(file.path()).unwrap();
    data.push(0xA0);
    std::fs::write(file.path(), &data).unwrap();

    assert!(matches!(
        decode_file(file.path(), &config, DecodeOptions::default()),
        Err(Error::MalformedFile { len: 19 })
    ));
}

#[test]
fn test_unsupported_mode() {
    let config = AcquisitionConfig::default().with_mode(OperatingMode::EventAndItot);
    let file = NamedTempFile::new().unwrap();
    assert!(matches!(
        encode_to_file(file.path(), &diagonal_hits(1), &config),
        Err(Error::TpxError(tpx3sim_tpx::Error::UnsupportedMode(_)))
    ));
}

#[test]
fn test_invalid_clock_writes_nothing() {
    let config =
        AcquisitionConfig::default().with_clock(ClockConfig::default().with_system_clock(0.0));
    let file = NamedTempFile::new().unwrap();
    assert!(matches!(
        encode_to_file(file.path(), &diagonal_hits(3), &config),
        Err(Error::TpxError(tpx3sim_tpx::Error::CoreError(_)))
    ));
    assert_eq!(std::fs::metadata(file.path()).unwrap().len(), 0);
}

#[test]
fn test_csv_export() {
    let config = AcquisitionConfig::default();
    let packet_file = NamedTempFile::new().unwrap();
    encode_to_file(packet_file.path(), &[RawHit::new(10, 20, 1e-7, 2e-7)], &config).unwrap();

    let records = decode_file(packet_file.path(), &config, DecodeOptions::full()).unwrap();
    let csv_file = NamedTempFile::new().unwrap();
    let mut writer = DataFileWriter::create(csv_file.path()).unwrap();
    writer.write_records_csv(&records).unwrap();

    let content = std::fs::read_to_string(csv_file.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("10,20,"));
    assert!(lines[1].ends_with(",4,4,15"));
}
