//! DESFire stored-value parsers.
//!
//! Transaction records live in cyclic record files:
//!
//! ```text
//! offset  size  field
//! 0       4     location id, LE u32
//! 4       8     timestamp, LE u64 (seconds or milliseconds)
//! 12      4     amount, LE i32 minor units (negative = purchase)
//! ```
//!
//! File settings are decoded only as far as the record loop needs them.

use crate::context::ParseContext;
use crate::timestamp::interpret_epoch;
use farecard_core::bytes::{is_blank, read_le_i32, read_le_u24, read_le_u32, read_le_u64};
use farecard_core::constants::{
    DESFIRE_FILE_TYPE_CYCLIC_RECORD, DESFIRE_FILE_TYPE_VALUE, DESFIRE_RECORD_MIN_LEN,
    DESFIRE_VALUE_LEN,
};
use farecard_core::{Money, Transaction, TransactionKind};

/// Kind of file reported by GET FILE SETTINGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Value,
    CyclicRecord,
    /// Standard data, backup data, linear record and future types.
    Other(u8),
}

impl From<u8> for FileKind {
    fn from(code: u8) -> Self {
        match code {
            DESFIRE_FILE_TYPE_VALUE => FileKind::Value,
            DESFIRE_FILE_TYPE_CYCLIC_RECORD => FileKind::CyclicRecord,
            other => FileKind::Other(other),
        }
    }
}

/// Decoded GET FILE SETTINGS response (status already stripped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSettings {
    pub kind: FileKind,
    /// Record size in bytes, record files only.
    pub record_size: u32,
    /// Maximum record count, record files only.
    pub max_records: u32,
}

/// Parse file settings.
///
/// Byte 0 is the file type. For record files, bytes 4-6 carry the record
/// size and bytes 7-9 the maximum number of records, both LE u24.
pub fn parse_file_settings(raw: &[u8]) -> Option<FileSettings> {
    let kind = FileKind::from(*raw.first()?);
    let (record_size, max_records) = match kind {
        FileKind::CyclicRecord => (read_le_u24(raw, 4).ok()?, read_le_u24(raw, 7).ok()?),
        _ => (0, 0),
    };
    Some(FileSettings {
        kind,
        record_size,
        max_records,
    })
}

/// Split a GET APPLICATION IDS response into 3-byte AIDs.
pub fn parse_application_ids(raw: &[u8]) -> Vec<[u8; 3]> {
    raw.chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect()
}

/// Parse one cyclic record.
///
/// `record_size` comes from the file settings. Records shorter than either
/// the fixed layout or the declared size are ignored, as are records blank
/// across the declared size.
pub fn parse_record(raw: &[u8], record_size: usize, ctx: &ParseContext) -> Option<Transaction> {
    let record = raw.get(..record_size.max(DESFIRE_RECORD_MIN_LEN))?;
    let declared = match record_size {
        0 => record,
        size => &record[..size],
    };
    if is_blank(declared) {
        return None;
    }

    let location = read_le_u32(record, 0).ok()?;
    let raw_time = read_le_u64(record, 4).ok()?;
    let amount = read_le_i32(record, 12).ok()?;

    let (occurred_at, timestamp_source) = interpret_epoch(raw_time, ctx.read_at);
    let (kind, amount) = if amount < 0 {
        (TransactionKind::Purchase, i64::from(amount.unsigned_abs()))
    } else {
        (TransactionKind::TopUp, i64::from(amount))
    };

    let mut location_code = format!("{:08X}", location);
    location_code.truncate(4);

    Some(Transaction {
        kind,
        amount: Some(Money::from_minor(amount)),
        occurred_at,
        timestamp_source,
        location_code: Some(location_code),
        raw_payload: record.to_vec(),
    })
}

/// Parse a GET VALUE response: LE i32 minor units, possibly negative.
///
/// A blank value (all 0x00 or all 0xFF) yields `None`.
pub fn parse_value(raw: &[u8]) -> Option<Money> {
    let value = raw.get(..DESFIRE_VALUE_LEN)?;
    if is_blank(value) {
        return None;
    }
    read_le_i32(value, 0)
        .ok()
        .map(|minor| Money::from_minor(i64::from(minor)))
}
