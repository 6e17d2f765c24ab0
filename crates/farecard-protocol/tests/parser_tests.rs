//! Integration tests pinning the documented record layouts.
//!
//! Timestamps decoded from card bytes are unverified against wall-clock
//! truth; these tests pin the interpretation, not its correctness.

use chrono::{DateTime, Datelike, Utc};
use farecard_core::bytes::{bytes_to_hex, find_tlv};
use farecard_core::{Money, TimestampSource, TransactionKind};
use farecard_protocol::{DateEncoding, ParseContext, desfire, emv, mifare};
use rstest::rstest;

// ============================================================================
// Test Data
// ============================================================================

mod test_data {
    /// DESFire record: location 0x00001001, time 1_700_000_000 s, amount -100.
    pub const DESFIRE_PURCHASE: [u8; 16] = [
        0x01, 0x10, 0x00, 0x00, 0x00, 0xF1, 0x53, 0x65, 0x00, 0x00, 0x00, 0x00, 0x9C, 0xFF, 0xFF,
        0xFF,
    ];

    /// DESFire record: same location and time, amount +100.
    pub const DESFIRE_TOP_UP: [u8; 16] = [
        0x01, 0x10, 0x00, 0x00, 0x00, 0xF1, 0x53, 0x65, 0x00, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00,
        0x00,
    ];

    /// EMV log record: 9F02 = 00000250, 9A = 24 03 15.
    pub const EMV_RECORD: [u8; 14] = [
        0x70, 0x0C, 0x9F, 0x02, 0x04, 0x00, 0x00, 0x02, 0x50, 0x9A, 0x03, 0x24, 0x03, 0x15,
    ];
}

fn ctx(encoding: DateEncoding) -> ParseContext {
    ParseContext::new(
        DateTime::<Utc>::from_timestamp(1_750_000_000, 0).unwrap(),
        encoding,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[rstest]
#[case(0x01, TransactionKind::Boarding)]
#[case(0x02, TransactionKind::Alighting)]
#[case(0x03, TransactionKind::Transfer)]
#[case(0x04, TransactionKind::Transport)]
#[case(0xFE, TransactionKind::Transport)]
fn test_mifare_type_mapping(#[case] code: u8, #[case] expected: TransactionKind) {
    let mut block = [0u8; 16];
    block[0] = code;
    block[12] = 0x01;

    let transaction = mifare::parse_block(&block, &ctx(DateEncoding::RawBinary)).unwrap();
    assert_eq!(transaction.kind, expected);
}

#[rstest]
#[case(0x00)]
#[case(0xFF)]
fn test_blank_records_are_idempotently_rejected(#[case] fill: u8) {
    let ctx = ctx(DateEncoding::RawBinary);
    let raw = [fill; 16];

    for _ in 0..2 {
        assert!(mifare::parse_block(&raw, &ctx).is_none());
        assert!(desfire::parse_record(&raw, 16, &ctx).is_none());
        assert!(emv::parse_record(&raw, &ctx).is_none());
    }
}

#[test]
fn test_desfire_negative_amount_is_purchase() {
    let transaction =
        desfire::parse_record(&test_data::DESFIRE_PURCHASE, 16, &ctx(DateEncoding::RawBinary))
            .unwrap();

    assert_eq!(transaction.kind, TransactionKind::Purchase);
    assert_eq!(transaction.amount.map(|m| m.to_string()).as_deref(), Some("1.00"));
    assert_eq!(transaction.location_code.as_deref(), Some("0000"));
    assert_eq!(transaction.timestamp_source, TimestampSource::CardSeconds);
}

#[test]
fn test_desfire_positive_amount_is_top_up() {
    let transaction =
        desfire::parse_record(&test_data::DESFIRE_TOP_UP, 16, &ctx(DateEncoding::RawBinary))
            .unwrap();

    assert_eq!(transaction.kind, TransactionKind::TopUp);
    assert_eq!(transaction.amount, Some(Money::from_minor(100)));
}

#[test]
fn test_emv_record_raw_date_convention() {
    let transaction = emv::parse_record(&test_data::EMV_RECORD, &ctx(DateEncoding::RawBinary))
        .unwrap();
    let date = transaction.occurred_at.date_naive();

    assert_eq!(transaction.amount.unwrap().to_string(), "2.50");
    assert_eq!((date.year(), date.month(), date.day()), (2036, 3, 21));
    assert_eq!(transaction.timestamp_source, TimestampSource::CardDate);
}

#[test]
fn test_emv_record_bcd_date_convention() {
    let transaction = emv::parse_record(&test_data::EMV_RECORD, &ctx(DateEncoding::Bcd)).unwrap();
    let date = transaction.occurred_at.date_naive();

    assert_eq!(transaction.amount, Some(Money::from_minor(250)));
    assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
}

#[test]
fn test_bytes_to_hex_examples() {
    assert_eq!(bytes_to_hex(&[0x0Au8, 0xFF]), "0AFF");
    assert_eq!(bytes_to_hex(&Vec::<u8>::new()), "");
}

#[test]
fn test_find_tlv_never_reads_past_buffer() {
    let record = [0x9F, 0x02, 0x06, 0x00, 0x00, 0x02];
    assert_eq!(find_tlv(&record, &[0x9F, 0x02]), None);
    assert!(emv::parse_record(&[0x9F, 0x02, 0xFF, 0, 0, 0, 0, 0, 0, 0], &ctx(DateEncoding::Bcd)).is_none());
}
