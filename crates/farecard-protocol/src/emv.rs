//! EMV transaction log and balance parsers.
//!
//! Records are scanned for individual tags with a flat byte search rather
//! than a full BER-TLV walk. Only the amount (`9F02`), date (`9A`) and time
//! (`9F21`) tags are used.

use crate::context::{DateEncoding, ParseContext};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use farecard_core::bytes::{bcd_byte, decode_bcd, find_tlv, is_blank};
use farecard_core::constants::{
    EMV_BALANCE_LEN, EMV_RECORD_MIN_LEN, EMV_TAG_AMOUNT, EMV_TAG_BALANCE, EMV_TAG_DATE,
    EMV_TAG_TIME, EMV_YEAR_BASE,
};
use farecard_core::{Money, TimestampSource, Transaction, TransactionKind};

fn field(byte: u8, encoding: DateEncoding) -> Option<u32> {
    match encoding {
        DateEncoding::RawBinary => Some(u32::from(byte)),
        DateEncoding::Bcd => bcd_byte(byte).map(u32::from),
    }
}

/// Decode a `YYMMDD` date value. Invalid calendar dates yield `None`.
pub fn decode_date(value: &[u8], encoding: DateEncoding) -> Option<NaiveDate> {
    let [yy, mm, dd, ..] = *value else {
        return None;
    };
    let year = EMV_YEAR_BASE + i32::try_from(field(yy, encoding)?).ok()?;
    NaiveDate::from_ymd_opt(year, field(mm, encoding)?, field(dd, encoding)?)
}

/// Decode an `HHMMSS` time value.
pub fn decode_time(value: &[u8], encoding: DateEncoding) -> Option<NaiveTime> {
    let [hh, mm, ss, ..] = *value else {
        return None;
    };
    NaiveTime::from_hms_opt(
        field(hh, encoding)?,
        field(mm, encoding)?,
        field(ss, encoding)?,
    )
}

/// Decode a BCD amount into minor units.
pub fn decode_amount(value: &[u8]) -> Option<Money> {
    let minor = decode_bcd(value)?;
    i64::try_from(minor).ok().map(Money::from_minor)
}

/// Parse one READ RECORD response (status stripped).
///
/// Returns `None` for records under 10 bytes and for records carrying
/// neither a decodable amount nor a decodable date.
///
/// ```
/// use farecard_core::Money;
/// use farecard_protocol::{ParseContext, emv};
///
/// let record = [0x70, 0x09, 0x9F, 0x02, 0x04, 0x00, 0x00, 0x02, 0x50, 0x00, 0x00];
/// let transaction = emv::parse_record(&record, &ParseContext::now()).unwrap();
/// assert_eq!(transaction.amount, Some(Money::from_minor(250)));
/// ```
pub fn parse_record(raw: &[u8], ctx: &ParseContext) -> Option<Transaction> {
    if raw.len() < EMV_RECORD_MIN_LEN {
        return None;
    }

    let amount = find_tlv(raw, &EMV_TAG_AMOUNT).and_then(decode_amount);
    let date = find_tlv(raw, &EMV_TAG_DATE).and_then(|v| decode_date(v, ctx.date_encoding));
    if amount.is_none() && date.is_none() {
        return None;
    }

    let (occurred_at, timestamp_source) = match date {
        Some(date) => {
            let time = find_tlv(raw, &EMV_TAG_TIME)
                .and_then(|v| decode_time(v, ctx.date_encoding))
                .unwrap_or(NaiveTime::MIN);
            (
                DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(time), Utc),
                TimestampSource::CardDate,
            )
        }
        None => (ctx.read_at, TimestampSource::ReadTime),
    };

    Some(Transaction {
        kind: TransactionKind::CardOperation,
        amount,
        occurred_at,
        timestamp_source,
        location_code: None,
        raw_payload: raw.to_vec(),
    })
}

/// Parse a GET DATA balance response (status stripped).
///
/// A `9F79` envelope is unwrapped when present; the first six bytes are
/// then read as BCD minor units.
pub fn parse_balance(raw: &[u8]) -> Option<Money> {
    let value = find_tlv(raw, &EMV_TAG_BALANCE).unwrap_or(raw);
    let value = value.get(..EMV_BALANCE_LEN)?;
    if is_blank(value) {
        return None;
    }
    decode_amount(value)
}
