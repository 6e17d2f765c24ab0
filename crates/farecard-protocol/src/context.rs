use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the three bytes of EMV date (`9A`) and time (`9F21`) tags are read.
///
/// The EMV standard packs `YYMMDD` as BCD. Some card issuers in the field
/// write plain binary digits instead, so the convention is configuration
/// rather than a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateEncoding {
    /// Each byte is the binary value of its field (`0x18` is year 2024).
    #[default]
    RawBinary,
    /// Each byte is two packed BCD digits (`0x24` is year 2024).
    Bcd,
}

/// Inputs a parser needs beyond the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    /// Session read time, substituted for unrecognised card timestamps.
    pub read_at: DateTime<Utc>,

    pub date_encoding: DateEncoding,
}

impl ParseContext {
    pub fn new(read_at: DateTime<Utc>, date_encoding: DateEncoding) -> Self {
        Self {
            read_at,
            date_encoding,
        }
    }

    /// Context stamped with the current time and the default date encoding.
    pub fn now() -> Self {
        Self::new(Utc::now(), DateEncoding::default())
    }

    #[must_use]
    pub fn with_date_encoding(mut self, date_encoding: DateEncoding) -> Self {
        self.date_encoding = date_encoding;
        self
    }
}
