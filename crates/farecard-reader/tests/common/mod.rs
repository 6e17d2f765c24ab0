//! Simulated cards shared by the session integration tests.
//!
//! Builders return ready-to-present [`SimulatedTag`]s with realistic
//! contents; `Presented` pairs a mock adapter with a tag already in its
//! field.

#![allow(dead_code)]

use farecard_core::Technology;
use farecard_core::constants::EMV_AID_VISA;
use farecard_hardware::mock::{
    DesfireApplication, DesfireCard, DesfireFile, EmvCard, MifareMemory, MifareSector, MockNfc,
    MockNfcHandle, SimulatedTag,
};

pub const MIFARE_UID: [u8; 4] = [0x04, 0xA1, 0xB2, 0xC3];
pub const DESFIRE_UID: [u8; 7] = [0x04, 0x52, 0x2F, 0x6A, 0x91, 0x3C, 0x80];
pub const EMV_UID: [u8; 4] = [0x08, 0x12, 0x34, 0x56];
pub const NDEF_UID: [u8; 7] = [0x04, 0x3B, 0x19, 0x72, 0x2A, 0x5D, 0x81];

pub const DESFIRE_AID: [u8; 3] = [0xF4, 0x81, 0x20];

/// Well-known Text record "en" / "hello".
pub const NDEF_TEXT: [u8; 12] = [
    0xD1, 0x01, 0x08, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x65, 0x6C, 0x6C, 0x6F,
];

pub struct Presented {
    pub nfc: MockNfc,
    pub presenter: MockNfcHandle,
}

pub async fn present(tag: SimulatedTag) -> Presented {
    let (nfc, presenter) = MockNfc::new();
    presenter.present(tag).await.expect("tag presented");
    Presented { nfc, presenter }
}

pub fn mifare_block(type_code: u8, amount: u32, seconds: u32, location: [u8; 4]) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[0] = type_code;
    block[1..5].copy_from_slice(&amount.to_le_bytes());
    block[5..9].copy_from_slice(&seconds.to_le_bytes());
    block[9..13].copy_from_slice(&location);
    block
}

pub fn mifare_balance(minor: u32) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..4].copy_from_slice(&minor.to_le_bytes());
    block
}

/// Transit card: sector 1 readable with the default key, sector 2 locked
/// with an issuer key.
pub fn transit_tag() -> SimulatedTag {
    let memory = MifareMemory::new()
        .with_sector(
            1,
            MifareSector::new([0xFF; 6])
                .with_block(4, mifare_balance(2_575))
                .with_block(5, mifare_block(0x01, 350, 1_718_000_000, [0x01, 0x02, 0x03, 0x04]))
                .with_block(6, mifare_block(0x03, 0, 1_718_003_600, [0x0A, 0x0B, 0x0C, 0x0D])),
        )
        .with_sector(
            2,
            MifareSector::new([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5])
                .with_block(8, mifare_block(0x02, 350, 1_718_007_200, [0x01, 0x02, 0x03, 0x04])),
        );

    SimulatedTag::new(MIFARE_UID.to_vec())
        .with_technology(Technology::MifareClassic)
        .with_technology(Technology::NfcA)
        .with_mifare(memory)
}

pub fn desfire_record(location: u32, time: u64, amount: i32) -> Vec<u8> {
    let mut raw = Vec::with_capacity(16);
    raw.extend_from_slice(&location.to_le_bytes());
    raw.extend_from_slice(&time.to_le_bytes());
    raw.extend_from_slice(&amount.to_le_bytes());
    raw
}

/// Prepaid card: a value file and a cyclic log with a purchase and a
/// top-up.
pub fn prepaid_tag() -> SimulatedTag {
    let app = DesfireApplication::new(DESFIRE_AID)
        .with_file(0x00, DesfireFile::Value(7_430))
        .with_file(
            0x01,
            DesfireFile::CyclicRecord {
                record_size: 16,
                max_records: 5,
                records: vec![
                    desfire_record(0x2A40_1C00, 1_718_000_000, -1_250),
                    desfire_record(0x0000_0000, 1_717_900_000_000, 5_000),
                ],
            },
        );

    SimulatedTag::new(DESFIRE_UID.to_vec())
        .with_technology(Technology::IsoDep)
        .with_technology(Technology::NfcA)
        .with_desfire(DesfireCard::new().with_application(app))
}

pub fn emv_log_record(amount: [u8; 6], date: [u8; 3], time: [u8; 3]) -> Vec<u8> {
    let mut record = vec![0x70, 0x19, 0x9F, 0x02, 0x06];
    record.extend_from_slice(&amount);
    record.extend_from_slice(&[0x9A, 0x03]);
    record.extend_from_slice(&date);
    record.extend_from_slice(&[0x9F, 0x21, 0x03]);
    record.extend_from_slice(&time);
    record.extend_from_slice(&[0x5F, 0x2A, 0x02, 0x09, 0x49]);
    record
}

pub fn emv_card() -> EmvCard {
    EmvCard::new(&EMV_AID_VISA)
        .with_record(
            1,
            1,
            emv_log_record([0, 0, 0, 0, 0x02, 0x50], [0x24, 0x03, 0x15], [0x14, 0x30, 0x00]),
        )
        .with_record(
            1,
            2,
            emv_log_record([0, 0, 0, 0, 0x18, 0x75], [0x24, 0x03, 0x16], [0x09, 0x05, 0x00]),
        )
        .with_balance(vec![0x9F, 0x79, 0x06, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00])
}

/// Bank card. It also answers DESFire framing with an empty application
/// directory, which must not stop the EMV attempt.
pub fn bank_tag() -> SimulatedTag {
    SimulatedTag::new(EMV_UID.to_vec())
        .with_technology(Technology::IsoDep)
        .with_desfire(DesfireCard::new())
        .with_emv(emv_card())
}

pub fn ndef_tag() -> SimulatedTag {
    SimulatedTag::new(NDEF_UID.to_vec())
        .with_technology(Technology::Ndef)
        .with_technology(Technology::NfcA)
        .with_ndef_message(NDEF_TEXT.to_vec())
}
