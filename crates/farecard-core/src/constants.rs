//! Card-layout and wire constants shared by parsers and drivers.
//!
//! The command bytes below are sent verbatim to real cards. Changing any of
//! them breaks interoperability with the card families they address.
//!
//! ```
//! use farecard_core::constants::*;
//!
//! assert_eq!(MIFARE_BLOCK_SIZE, 16);
//! assert_eq!(MIFARE_DEFAULT_KEY, [0xFF; 6]);
//! assert_eq!(&EMV_PPSE_NAME[..], b"2PAY.SYS.DDF01");
//! ```

// ============================================================================
// Currency
// ============================================================================

/// Minor currency units per major unit (cards store kuruş/cents).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

// ============================================================================
// MIFARE Classic
// ============================================================================

/// Size of a MIFARE Classic data block in bytes.
pub const MIFARE_BLOCK_SIZE: usize = 16;

/// Bytes of a balance block holding the value.
pub const MIFARE_BALANCE_LEN: usize = 4;

/// Number of blocks per sector in the lower (1K-compatible) sector range.
pub const MIFARE_BLOCKS_PER_SECTOR: u8 = 4;

/// Transport-configuration key A shipped on blank cards.
pub const MIFARE_DEFAULT_KEY: [u8; 6] = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

/// Native AUTHENTICATE with key A.
pub const MIFARE_CMD_AUTH_KEY_A: u8 = 0x60;

/// Native READ (returns one 16-byte block).
pub const MIFARE_CMD_READ: u8 = 0x30;

/// Transaction type code for boarding a vehicle.
pub const MIFARE_TYPE_BOARDING: u8 = 0x01;

/// Transaction type code for alighting from a vehicle.
pub const MIFARE_TYPE_ALIGHTING: u8 = 0x02;

/// Transaction type code for a transfer between lines.
pub const MIFARE_TYPE_TRANSFER: u8 = 0x03;

// ============================================================================
// MIFARE DESFire (ISO 7816-4 wrapped native commands)
// ============================================================================

/// CLA byte for wrapped DESFire native commands.
pub const DESFIRE_CLA: u8 = 0x90;

pub const DESFIRE_INS_SELECT_APPLICATION: u8 = 0x5A;
pub const DESFIRE_INS_GET_APPLICATION_IDS: u8 = 0x6A;
pub const DESFIRE_INS_GET_FILE_IDS: u8 = 0x6F;
pub const DESFIRE_INS_GET_FILE_SETTINGS: u8 = 0xF5;
pub const DESFIRE_INS_GET_VALUE: u8 = 0x6C;
pub const DESFIRE_INS_READ_RECORDS: u8 = 0xBB;

/// Card-level (PICC) master application identifier.
pub const DESFIRE_MASTER_AID: [u8; 3] = [0x00, 0x00, 0x00];

/// Length of a DESFire application identifier.
pub const DESFIRE_AID_LEN: usize = 3;

/// SW1 of every wrapped DESFire response.
pub const DESFIRE_SW1: u8 = 0x91;

/// Operation completed.
pub const DESFIRE_STATUS_OK: u8 = 0x00;

/// More frames follow.
pub const DESFIRE_STATUS_ADDITIONAL_FRAME: u8 = 0xAF;

/// File type code of a value file.
pub const DESFIRE_FILE_TYPE_VALUE: u8 = 0x02;

/// File type code of a cyclic record file.
pub const DESFIRE_FILE_TYPE_CYCLIC_RECORD: u8 = 0x04;

/// Minimum layout size of a DESFire transaction record.
pub const DESFIRE_RECORD_MIN_LEN: usize = 16;

/// Length of a value file's contents.
pub const DESFIRE_VALUE_LEN: usize = 4;

// ============================================================================
// EMV
// ============================================================================

/// Proximity Payment System Environment directory name.
pub const EMV_PPSE_NAME: [u8; 14] = *b"2PAY.SYS.DDF01";

/// Visa credit/debit AID, the default application attempt.
pub const EMV_AID_VISA: [u8; 7] = [0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];

/// Mastercard credit/debit AID.
pub const EMV_AID_MASTERCARD: [u8; 7] = [0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10];

/// Amount, Authorised (numeric, BCD).
pub const EMV_TAG_AMOUNT: [u8; 2] = [0x9F, 0x02];

/// Transaction Date (YYMMDD).
pub const EMV_TAG_DATE: [u8; 1] = [0x9A];

/// Transaction Time (HHMMSS).
pub const EMV_TAG_TIME: [u8; 2] = [0x9F, 0x21];

/// Available offline spending amount, queried with GET DATA.
pub const EMV_TAG_BALANCE: [u8; 2] = [0x9F, 0x79];

/// First short file identifier scanned by READ RECORD.
pub const EMV_FIRST_SFI: u8 = 1;

/// Last short file identifier scanned by READ RECORD.
pub const EMV_LAST_SFI: u8 = 5;

/// First record number scanned per SFI.
pub const EMV_FIRST_RECORD: u8 = 1;

/// Last record number scanned per SFI.
pub const EMV_LAST_RECORD: u8 = 10;

/// Minimum length of a record that can carry transaction tags.
pub const EMV_RECORD_MIN_LEN: usize = 10;

/// Number of BCD bytes in a balance value.
pub const EMV_BALANCE_LEN: usize = 6;

/// Year offset applied to the two-digit EMV year.
pub const EMV_YEAR_BASE: i32 = 2000;

// ============================================================================
// Timestamp heuristics
// ============================================================================

/// Lower exclusive bound for a value to be read as Unix seconds.
pub const EPOCH_SECONDS_MIN: u64 = 1_000_000_000;

/// Upper exclusive bound for a value to be read as Unix seconds.
pub const EPOCH_SECONDS_MAX: u64 = 9_999_999_999;

/// Lower exclusive bound for a value to be read as Unix milliseconds.
pub const EPOCH_MILLIS_MIN: u64 = 1_000_000_000_000;
