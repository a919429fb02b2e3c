use domain::registers::{self, HOLDING_AUTO_OFFSET, INPUT_OUTDOOR_TEMP};
use domain::{
    DEFAULT_POLL_INTERVAL, KEEPALIVE_TIMEOUT, MAX_POLL_INTERVAL, RawSample, ReadBlock, Region,
    poll_blocks,
};

#[test]
fn poll_blocks_cover_register_map_in_fixed_order() {
    let blocks = poll_blocks();
    assert_eq!(
        blocks,
        vec![
            ReadBlock { region: Region::Coil, start: 0, count: 1 },
            ReadBlock { region: Region::DiscreteInput, start: 1, count: 13 },
            ReadBlock { region: Region::InputRegister, start: 0, count: 14 },
            ReadBlock { region: Region::HoldingRegister, start: 0, count: 10 },
        ]
    );
}

#[test]
fn register_lookup_reports_scale_and_sign() {
    let outdoor = registers::register(Region::InputRegister, INPUT_OUTDOOR_TEMP).unwrap();
    assert_eq!(outdoor.scale, 10.0);
    assert!(outdoor.signed);

    let offset = registers::register(Region::HoldingRegister, HOLDING_AUTO_OFFSET).unwrap();
    assert_eq!(offset.scale, 1.0);
    assert!(offset.signed);

    assert!(registers::register(Region::Coil, 5).is_none());
}

#[test]
fn raw_sample_ignores_mismatched_regions() {
    let mut sample = RawSample::new(1);
    sample.insert_bits(Region::DiscreteInput, 1, &[true, false, true]);
    sample.insert_words(Region::HoldingRegister, 0, &[4, 0, 400]);
    sample.insert_words(Region::Coil, 0, &[1]);

    assert_eq!(sample.bit(Region::DiscreteInput, 3), Some(true));
    assert_eq!(sample.word(Region::HoldingRegister, 2), Some(400));
    assert!(sample.coils.is_empty());
    assert_eq!(sample.word(Region::Coil, 0), None);
}

#[test]
fn poll_interval_keeps_keepalive_margin() {
    assert_eq!(KEEPALIVE_TIMEOUT.as_secs(), 60);
    assert!(MAX_POLL_INTERVAL * 2 <= KEEPALIVE_TIMEOUT);
    assert!(DEFAULT_POLL_INTERVAL <= MAX_POLL_INTERVAL);
}
