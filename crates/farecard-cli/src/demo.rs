//! Built-in simulated cards for exercising the reader without hardware.

use clap::ValueEnum;
use farecard_core::Technology;
use farecard_core::constants::EMV_AID_VISA;
use farecard_hardware::mock::{
    DesfireApplication, DesfireCard, DesfireFile, EmvCard, MifareMemory, MifareSector, SimulatedTag,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoCard {
    /// MIFARE Classic transit card
    Transit,
    /// DESFire prepaid card with a cyclic log
    Prepaid,
    /// EMV contactless bank card
    Bank,
    /// Plain NDEF tag carrying a text record
    Ndef,
    /// Tag exposing no readable technology
    Blank,
}

impl DemoCard {
    pub fn tag(self) -> SimulatedTag {
        match self {
            Self::Transit => transit(),
            Self::Prepaid => prepaid(),
            Self::Bank => bank(),
            Self::Ndef => ndef(),
            Self::Blank => SimulatedTag::new(vec![0x5A, 0x00, 0x11, 0x22])
                .with_technology(Technology::NfcB),
        }
    }
}

fn transit_block(type_code: u8, amount: u32, seconds: u32, location: [u8; 4]) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[0] = type_code;
    block[1..5].copy_from_slice(&amount.to_le_bytes());
    block[5..9].copy_from_slice(&seconds.to_le_bytes());
    block[9..13].copy_from_slice(&location);
    block
}

fn transit() -> SimulatedTag {
    let mut balance = [0u8; 16];
    balance[..4].copy_from_slice(&1_840u32.to_le_bytes());

    let memory = MifareMemory::new()
        .with_sector(
            1,
            MifareSector::new([0xFF; 6])
                .with_block(4, balance)
                .with_block(5, transit_block(0x01, 250, 1_760_000_000, [0x01, 0x00, 0x07, 0x21]))
                .with_block(6, transit_block(0x03, 0, 1_760_001_800, [0x01, 0x00, 0x09, 0x03])),
        )
        .with_sector(
            2,
            MifareSector::new([0xFF; 6])
                .with_block(8, transit_block(0x04, 2_000, 1_759_900_000, [0x10, 0x01, 0x00, 0x00])),
        );

    SimulatedTag::new(vec![0x04, 0x7E, 0x21, 0x9C])
        .with_technology(Technology::MifareClassic)
        .with_technology(Technology::NfcA)
        .with_mifare(memory)
}

fn prepaid_record(location: u32, time: u64, amount: i32) -> Vec<u8> {
    let mut raw = Vec::with_capacity(16);
    raw.extend_from_slice(&location.to_le_bytes());
    raw.extend_from_slice(&time.to_le_bytes());
    raw.extend_from_slice(&amount.to_le_bytes());
    raw
}

fn prepaid() -> SimulatedTag {
    let app = DesfireApplication::new([0xF4, 0x81, 0x20])
        .with_file(0x00, DesfireFile::Value(4_275))
        .with_file(
            0x01,
            DesfireFile::CyclicRecord {
                record_size: 16,
                max_records: 8,
                records: vec![
                    prepaid_record(0x0010_0120, 1_760_100_000, -725),
                    prepaid_record(0x0020_0230, 1_760_050_000, -1_500),
                    prepaid_record(0x0000_0000, 1_760_000_000_000, 6_500),
                ],
            },
        );

    SimulatedTag::new(vec![0x04, 0x52, 0x2F, 0x6A, 0x91, 0x3C, 0x80])
        .with_technology(Technology::IsoDep)
        .with_technology(Technology::NfcA)
        .with_desfire(DesfireCard::new().with_application(app))
}

fn log_entry(amount: [u8; 6], date: [u8; 3], time: [u8; 3]) -> Vec<u8> {
    let mut record = vec![0x70, 0x19, 0x9F, 0x02, 0x06];
    record.extend_from_slice(&amount);
    record.extend_from_slice(&[0x9A, 0x03]);
    record.extend_from_slice(&date);
    record.extend_from_slice(&[0x9F, 0x21, 0x03]);
    record.extend_from_slice(&time);
    record.extend_from_slice(&[0x5F, 0x2A, 0x02, 0x09, 0x78]);
    record
}

fn bank() -> SimulatedTag {
    // Dates and times are BCD packed; read with --date-encoding bcd
    let card = EmvCard::new(&EMV_AID_VISA)
        .with_record(
            1,
            1,
            log_entry([0, 0, 0, 0, 0x04, 0x20], [0x25, 0x10, 0x02], [0x08, 0x15, 0x00]),
        )
        .with_record(
            1,
            2,
            log_entry([0, 0, 0, 0, 0x31, 0x99], [0x25, 0x10, 0x04], [0x19, 0x42, 0x30]),
        )
        .with_balance(vec![0x9F, 0x79, 0x06, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00]);

    SimulatedTag::new(vec![0x08, 0x3D, 0x44, 0x10])
        .with_technology(Technology::IsoDep)
        .with_emv(card)
}

fn ndef() -> SimulatedTag {
    let message = vec![
        0xD1, 0x01, 0x0D, 0x54, 0x02, 0x65, 0x6E, b'P', b'l', b'a', b't', b'f', b'o', b'r', b'm',
        b' ', b'4',
    ];
    SimulatedTag::new(vec![0x04, 0x3B, 0x19, 0x72, 0x2A, 0x5D, 0x81])
        .with_technology(Technology::Ndef)
        .with_technology(Technology::NfcA)
        .with_ndef_message(message)
}
