//! Reader configuration.
//!
//! Every section has a [`Default`] matching the common card layouts, and
//! every field may be omitted from a JSON config file.
//!
//! ```
//! use farecard_reader::config::ReaderConfig;
//!
//! let config: ReaderConfig = serde_json::from_str(r#"{ "event_buffer": 8 }"#).unwrap();
//! assert_eq!(config.event_buffer, 8);
//! assert_eq!(config.mifare.sectors.len(), 2);
//! ```

use farecard_core::constants::{
    EMV_AID_VISA, EMV_FIRST_RECORD, EMV_FIRST_SFI, EMV_LAST_RECORD, EMV_LAST_SFI,
    MIFARE_BLOCKS_PER_SECTOR, MIFARE_DEFAULT_KEY,
};
use farecard_protocol::DateEncoding;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Default capacity of a session event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub mifare: MifareConfig,
    pub desfire: DesfireConfig,
    pub emv: EmvConfig,

    /// Capacity to use when creating a session event channel.
    pub event_buffer: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            mifare: MifareConfig::default(),
            desfire: DesfireConfig::default(),
            emv: EmvConfig::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// MIFARE Classic layout: which sectors to authenticate and which of their
/// blocks hold the balance and the transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MifareConfig {
    /// Key A tried on every sector.
    pub key_a: [u8; 6],
    pub sectors: Vec<SectorPlan>,
}

impl Default for MifareConfig {
    fn default() -> Self {
        Self {
            key_a: MIFARE_DEFAULT_KEY,
            sectors: vec![
                SectorPlan {
                    sector: 1,
                    balance_block: Some(4),
                    transaction_blocks: vec![5, 6],
                },
                SectorPlan {
                    sector: 2,
                    balance_block: None,
                    transaction_blocks: vec![8, 9, 10],
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorPlan {
    pub sector: u8,
    pub balance_block: Option<u8>,
    pub transaction_blocks: Vec<u8>,
}

impl SectorPlan {
    /// First absolute block of the sector, used as the authentication target.
    pub fn first_block(&self) -> u8 {
        self.sector.saturating_mul(MIFARE_BLOCKS_PER_SECTOR)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesfireConfig {
    /// Optional upper bound on record reads per cyclic file. When unset,
    /// every record the file settings declare is read.
    pub max_records_per_file: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmvConfig {
    /// Application selected after the PPSE.
    pub aid: Vec<u8>,
    pub sfi_range: RangeInclusive<u8>,
    pub record_range: RangeInclusive<u8>,
    /// How tag 9A / 9F21 bytes map to calendar fields.
    pub date_encoding: DateEncoding,
}

impl Default for EmvConfig {
    fn default() -> Self {
        Self {
            aid: EMV_AID_VISA.to_vec(),
            sfi_range: EMV_FIRST_SFI..=EMV_LAST_SFI,
            record_range: EMV_FIRST_RECORD..=EMV_LAST_RECORD,
            date_encoding: DateEncoding::RawBinary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mifare_layout() {
        let config = MifareConfig::default();
        assert_eq!(config.key_a, [0xFF; 6]);
        assert_eq!(config.sectors[0].balance_block, Some(4));
        assert_eq!(config.sectors[0].transaction_blocks, vec![5, 6]);
        assert_eq!(config.sectors[1].balance_block, None);
        assert_eq!(config.sectors[1].transaction_blocks, vec![8, 9, 10]);
    }

    #[test]
    fn test_sector_first_block() {
        let plan = SectorPlan {
            sector: 2,
            ..SectorPlan::default()
        };
        assert_eq!(plan.first_block(), 8);
    }

    #[test]
    fn test_default_emv_scan() {
        let config = EmvConfig::default();
        assert_eq!(config.aid, EMV_AID_VISA.to_vec());
        assert_eq!(config.sfi_range, 1..=5);
        assert_eq!(config.record_range, 1..=10);
        assert_eq!(config.date_encoding, DateEncoding::RawBinary);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "emv": { "date_encoding": "bcd" },
            "desfire": { "max_records_per_file": 4 }
        }"#;
        let config: ReaderConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.emv.date_encoding, DateEncoding::Bcd);
        assert_eq!(config.emv.sfi_range, 1..=5);
        assert_eq!(config.desfire.max_records_per_file, Some(4));
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER);
        assert_eq!(config.mifare, MifareConfig::default());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ReaderConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ReaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
