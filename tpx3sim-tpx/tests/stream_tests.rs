#![allow(clippy::float_cmp, clippy::unreadable_literal)]
use approx::assert_relative_eq;
use tpx3sim_core::counter::{self, CounterKind};
use tpx3sim_core::geometry::to_address;
use tpx3sim_core::TimeConverter;
use tpx3sim_tpx::{
    decode_stream, encode_stream, AcquisitionConfig, ChipGeometry, ClockConfig, DecodeOptions,
    Error, OperatingMode, PacketEncoder, RawHit,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_single_hit_roundtrip() {
    init_logger();
    let config = AcquisitionConfig::default();
    let data = encode_stream(&[RawHit::new(10, 20, 1e-7, 2e-7)], &config).unwrap();
    assert_eq!(data.len(), 6);

    let records = decode_stream(&data, &config, DecodeOptions::full()).unwrap();
    assert_eq!(records.len(), 1);
    let record = records[0];

    assert_eq!((record.x, record.y), (10, 20));
    assert_eq!(record.toa, 4);
    assert_eq!(record.secondary, 4);
    assert_eq!(record.ftoa, 15);
    assert_relative_eq!(record.start.unwrap(), 7.65625e-8, max_relative = 1e-12);
    assert_relative_eq!(record.stop.unwrap(), 1.765625e-7, max_relative = 1e-12);
}

#[test]
fn test_packet_bits_for_known_hit() {
    let config = AcquisitionConfig::default();
    let packets = PacketEncoder::new(&config)
        .unwrap()
        .encode_hits(&[RawHit::new(10, 20, 1.23456e-6, 1.3e-6)])
        .unwrap();

    let addr = u64::from(to_address(10, 20).unwrap().as_u16());
    let expected = (0b1010 << 44) | (addr << 28) | (43 << 14) | (1016 << 4) | 9;
    assert_eq!(packets[0].raw(), expected);
}

#[test]
fn test_stream_ordered_by_toa_then_address() {
    init_logger();
    let config = AcquisitionConfig::default();
    let hits = [
        RawHit::new(200, 0, 1e-6, 1.1e-6),
        RawHit::new(0, 0, 1e-6, 1.1e-6),
        RawHit::new(5, 5, 5e-7, 6e-7),
        RawHit::new(100, 100, 2e-6, 2.2e-6),
    ];

    let fields = PacketEncoder::new(&config).unwrap().encode_fields(&hits).unwrap();
    assert_eq!(fields.len(), 4);

    for pair in fields.windows(2) {
        let key = |f: &tpx3sim_tpx::EncodedFields| (f.decoded_toa(), f.addr);
        assert!(key(&pair[0]) <= key(&pair[1]));
    }

    let addresses: Vec<u16> = fields.iter().map(|f| f.addr).collect();
    let expected: Vec<u16> = [(5, 5), (0, 0), (200, 0), (100, 100)]
        .iter()
        .map(|&(x, y)| to_address(x, y).unwrap().as_u16())
        .collect();
    assert_eq!(addresses, expected);
}

#[test]
fn test_dead_time_is_per_pixel() {
    let config = AcquisitionConfig::default();
    let hits = [
        RawHit::new(3, 3, 0.0, 25e-9),
        // inside the 500 ns dead time of (3, 3)
        RawHit::new(3, 3, 425e-9, 500e-9),
        RawHit::new(3, 3, 650e-9, 700e-9),
        // same time, other pixel
        RawHit::new(4, 3, 425e-9, 500e-9),
    ];

    let records = decode_stream(
        &encode_stream(&hits, &config).unwrap(),
        &config,
        DecodeOptions::full(),
    )
    .unwrap();

    let on_pixel: Vec<_> = records.iter().filter(|r| (r.x, r.y) == (3, 3)).collect();
    assert_eq!(on_pixel.len(), 2);
    assert_eq!(on_pixel[0].toa, 0);
    let ticks = TimeConverter::default().toa_ticks(650e-9);
    assert_eq!(u64::from(on_pixel[1].toa), ticks);
    assert_eq!(records.iter().filter(|r| (r.x, r.y) == (4, 3)).count(), 1);
}

#[test]
fn test_too_short_pulses_dropped() {
    let config = AcquisitionConfig::default();
    let hits = [
        RawHit::new(1, 1, 101e-9, 120e-9),
        RawHit::new(2, 2, 300e-9, 300e-9),
    ];
    assert!(encode_stream(&hits, &config).unwrap().is_empty());
}

#[test]
fn test_toa_only_mode() {
    let config = AcquisitionConfig::default().with_mode(OperatingMode::ToaOnly);
    let hits = [
        RawHit::new(7, 9, 0.0, 250e-9),
        // 610 ns after the first stop, past the fixed 475 ns dead time
        RawHit::new(7, 9, 860e-9, 900e-9),
    ];

    let records = decode_stream(
        &encode_stream(&hits, &config).unwrap(),
        &config,
        DecodeOptions::default(),
    )
    .unwrap();

    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.secondary, 0);
        assert_eq!(record.stop, None);
    }
    assert_relative_eq!(records[1].start.unwrap(), 860e-9, epsilon = 1.6e-9);
}

#[test]
fn test_event_mode_has_no_packets() {
    let config = AcquisitionConfig::default().with_mode(OperatingMode::EventAndItot);
    assert!(matches!(
        encode_stream(&[RawHit::new(0, 0, 0.0, 1e-7)], &config),
        Err(Error::UnsupportedMode(OperatingMode::EventAndItot))
    ));
    assert!(matches!(
        decode_stream(&[], &config, DecodeOptions::default()),
        Err(Error::UnsupportedMode(_))
    ));
}

#[test]
fn test_malformed_stream() {
    let config = AcquisitionConfig::default();
    assert!(matches!(
        decode_stream(&[0xA0; 7], &config, DecodeOptions::default()),
        Err(Error::MalformedStream(7))
    ));
}

#[test]
fn test_tot_saturates_in_stream() {
    let config = AcquisitionConfig::default();
    let records = decode_stream(
        &encode_stream(&[RawHit::new(0, 0, 0.0, 50e-6)], &config).unwrap(),
        &config,
        DecodeOptions::full(),
    )
    .unwrap();
    assert_eq!(records[0].secondary, 1022);
    assert_eq!(
        counter::encode(1022, CounterKind::Tot),
        counter::encode(2000, CounterKind::Tot)
    );
}

#[test]
fn test_invalid_clock_rejected() {
    let hits = [RawHit::new(1, 1, 1e-7, 2e-7)];
    for clock in [0.0, -40e6, f64::NAN, f64::INFINITY] {
        let config =
            AcquisitionConfig::default().with_clock(ClockConfig::default().with_system_clock(clock));
        assert!(
            matches!(encode_stream(&hits, &config), Err(Error::CoreError(_))),
            "system clock {clock} accepted"
        );
    }

    let data = encode_stream(&hits, &AcquisitionConfig::default()).unwrap();
    let stopped =
        AcquisitionConfig::default().with_clock(ClockConfig::default().with_system_clock(0.0));
    assert!(matches!(
        decode_stream(&data, &stopped, DecodeOptions::default()),
        Err(Error::CoreError(_))
    ));
}

#[test]
fn test_oversized_geometry_rejected() {
    let config = AcquisitionConfig::default().with_geometry(ChipGeometry {
        width: 1024,
        height: 1024,
    });
    assert!(matches!(
        encode_stream(&[RawHit::new(1, 1, 1e-7, 2e-7)], &config),
        Err(Error::CoreError(tpx3sim_core::Error::InvalidGeometry(_)))
    ));
}
