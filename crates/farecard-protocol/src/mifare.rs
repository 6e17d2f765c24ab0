//! MIFARE Classic transit block layout.
//!
//! A transaction block is 16 bytes:
//!
//! ```text
//! offset  size  field
//! 0       1     type code (01 boarding, 02 alighting, 03 transfer)
//! 1       4     amount, LE u32 minor units (0 = not recorded)
//! 5       4     time, LE u32 Unix seconds (0 = not recorded)
//! 9       4     location code
//! 13      3     reserved
//! ```

use crate::context::ParseContext;
use crate::timestamp::interpret_seconds;
use farecard_core::bytes::{bytes_to_hex, is_blank, read_le_u32};
use farecard_core::constants::{
    MIFARE_BALANCE_LEN, MIFARE_BLOCK_SIZE, MIFARE_TYPE_ALIGHTING, MIFARE_TYPE_BOARDING,
    MIFARE_TYPE_TRANSFER,
};
use farecard_core::{Money, Transaction, TransactionKind};

/// Map a block type code to a transaction kind.
pub fn transaction_kind(type_code: u8) -> TransactionKind {
    match type_code {
        MIFARE_TYPE_BOARDING => TransactionKind::Boarding,
        MIFARE_TYPE_ALIGHTING => TransactionKind::Alighting,
        MIFARE_TYPE_TRANSFER => TransactionKind::Transfer,
        _ => TransactionKind::Transport,
    }
}

/// Parse one transaction block. Blank or short blocks yield `None`.
pub fn parse_block(raw: &[u8], ctx: &ParseContext) -> Option<Transaction> {
    let block = raw.get(..MIFARE_BLOCK_SIZE)?;
    if is_blank(block) {
        return None;
    }

    let amount = read_le_u32(block, 1).ok()?;
    let seconds = read_le_u32(block, 5).ok()?;
    let (occurred_at, timestamp_source) = interpret_seconds(seconds, ctx.read_at);

    Some(Transaction {
        kind: transaction_kind(block[0]),
        amount: (amount != 0).then(|| Money::from_minor(i64::from(amount))),
        occurred_at,
        timestamp_source,
        location_code: Some(bytes_to_hex(&block[9..13])),
        raw_payload: block.to_vec(),
    })
}

/// Parse a balance block: bytes 0-3 as LE u32 minor units.
///
/// Blank value bytes (all 0x00 or all 0xFF) mean no balance was written.
pub fn parse_balance(raw: &[u8]) -> Option<Money> {
    let value = raw.get(..MIFARE_BALANCE_LEN)?;
    if is_blank(value) {
        return None;
    }
    read_le_u32(value, 0)
        .ok()
        .map(|minor| Money::from_minor(i64::from(minor)))
}
