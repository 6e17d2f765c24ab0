use crate::{
    bytes::bytes_to_hex,
    constants::MINOR_UNITS_PER_MAJOR,
    error::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Monetary value as a signed count of minor currency units.
///
/// Cards store amounts in minor units (kuruş, cents); keeping the integer
/// avoids the rounding a floating-point "÷100" would introduce.
///
/// ```
/// use farecard_core::Money;
///
/// let fare = Money::from_minor(250);
/// assert_eq!(fare.to_string(), "2.50");
/// assert_eq!(Money::from_minor(-5).to_string(), "-0.05");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero in any currency.
    pub const ZERO: Money = Money(0);

    /// Create from a minor-unit count.
    #[must_use]
    pub const fn from_minor(minor_units: i64) -> Self {
        Money(minor_units)
    }

    /// Create from whole major units and a minor remainder.
    #[must_use]
    pub const fn from_major(major: i64, minor: i64) -> Self {
        Money(major * MINOR_UNITS_PER_MAJOR + minor)
    }

    /// Raw minor-unit count.
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Absolute value.
    #[must_use]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR as u64;
        write!(
            f,
            "{}{}.{:02}",
            sign,
            magnitude / per_major,
            magnitude % per_major
        )
    }
}

/// A card balance. One per protocol exchange at most.
pub type Balance = Money;

/// Contactless technology identifiers reported by a discovered tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Technology {
    MifareClassic,
    MifareUltralight,
    /// ISO 14443-4 (DESFire, EMV and other smartcards).
    IsoDep,
    Ndef,
    NfcA,
    NfcB,
    /// Any technology the engine does not drive.
    Other(String),
}

impl Technology {
    /// Canonical short name (as reported without platform prefix).
    pub fn name(&self) -> &str {
        match self {
            Self::MifareClassic => "MifareClassic",
            Self::MifareUltralight => "MifareUltralight",
            Self::IsoDep => "IsoDep",
            Self::Ndef => "Ndef",
            Self::NfcA => "NfcA",
            Self::NfcB => "NfcB",
            Self::Other(name) => name,
        }
    }

    /// Whether this is a member of the MIFARE Classic/Ultralight family.
    pub fn is_mifare_family(&self) -> bool {
        matches!(self, Self::MifareClassic | Self::MifareUltralight)
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Technology {
    type Err = Error;

    /// Accepts bare names (`IsoDep`) and Android class names
    /// (`android.nfc.tech.IsoDep`).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidTechnology(s.to_string()));
        }
        let short = trimmed.rsplit('.').next().unwrap_or(trimmed);
        Ok(match short {
            "MifareClassic" => Self::MifareClassic,
            "MifareUltralight" => Self::MifareUltralight,
            "IsoDep" => Self::IsoDep,
            "Ndef" => Self::Ndef,
            "NfcA" => Self::NfcA,
            "NfcB" => Self::NfcB,
            other => Self::Other(other.to_string()),
        })
    }
}

/// Read-only snapshot of the technologies a tag exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologySet(BTreeSet<Technology>);

impl TechnologySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a technology. Returns `false` if it was already present.
    pub fn insert(&mut self, technology: Technology) -> bool {
        self.0.insert(technology)
    }

    pub fn contains(&self, technology: &Technology) -> bool {
        self.0.contains(technology)
    }

    /// Whether any MIFARE Classic/Ultralight technology is present.
    pub fn has_mifare_family(&self) -> bool {
        self.0.iter().any(Technology::is_mifare_family)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Technology> {
        self.0.iter()
    }

    /// Parse Android-style technology class names, skipping blanks.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }
}

impl FromIterator<Technology> for TechnologySet {
    fn from_iter<I: IntoIterator<Item = Technology>>(iter: I) -> Self {
        TechnologySet(iter.into_iter().collect())
    }
}

/// What a transaction record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Entered a vehicle or gate.
    Boarding,
    /// Left a vehicle or gate.
    Alighting,
    /// Changed lines within a fare window.
    Transfer,
    /// Transit usage with an unrecognised type code.
    Transport,
    /// Stored value spent at a merchant.
    Purchase,
    Withdrawal,
    /// Generic bank-card operation from an EMV log record.
    CardOperation,
    /// Stored value loaded onto the card.
    TopUp,
}

impl TransactionKind {
    /// Whether this kind records a journey rather than a spend.
    pub fn is_travel(&self) -> bool {
        matches!(
            self,
            Self::Boarding | Self::Alighting | Self::Transfer | Self::Transport
        )
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boarding => "Boarding",
            Self::Alighting => "Alighting",
            Self::Transfer => "Transfer",
            Self::Transport => "Transport",
            Self::Purchase => "Purchase",
            Self::Withdrawal => "Withdrawal",
            Self::CardOperation => "CardOperation",
            Self::TopUp => "TopUp",
        };
        write!(f, "{}", name)
    }
}

/// Where a transaction's timestamp came from.
///
/// Card timestamps are decoded by magnitude heuristics and are lossy; only
/// `ReadTime` is guaranteed to be a substitute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Card value interpreted as Unix seconds.
    CardSeconds,
    /// Card value interpreted as Unix milliseconds.
    CardMillis,
    /// EMV date (and optionally time) tags.
    CardDate,
    /// Encoding unrecognised; the session read time was substituted.
    ReadTime,
}

impl TimestampSource {
    pub fn is_from_card(&self) -> bool {
        !matches!(self, Self::ReadTime)
    }
}

/// One transaction or journey record decoded from a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TransactionKind,

    /// Amount in minor units. Absent when the record carries no amount.
    pub amount: Option<Money>,

    /// Best-effort record time; see `timestamp_source`.
    pub occurred_at: DateTime<Utc>,

    pub timestamp_source: TimestampSource,

    /// Raw merchant/station code, resolved to a name outside the core.
    pub location_code: Option<String>,

    /// Original record bytes, kept for audit.
    #[serde(with = "hex_bytes")]
    pub raw_payload: Vec<u8>,
}

/// The family of card a session identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// MIFARE Classic/Ultralight transit card.
    TransitCard,
    /// DESFire stored-value card.
    PrepaidCard,
    /// EMV payment card.
    BankCard,
    #[default]
    Unknown,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TransitCard => "Transit card",
            Self::PrepaidCard => "Prepaid card",
            Self::BankCard => "Bank card",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// NDEF type name format (3-bit TNF field of a record header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNameFormat {
    Empty,
    WellKnown,
    MediaType,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
    Reserved,
}

impl TypeNameFormat {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0x00 => Self::Empty,
            0x01 => Self::WellKnown,
            0x02 => Self::MediaType,
            0x03 => Self::AbsoluteUri,
            0x04 => Self::External,
            0x05 => Self::Unknown,
            0x06 => Self::Unchanged,
            _ => Self::Reserved,
        }
    }
}

/// A decoded NDEF record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdefRecord {
    pub tnf: TypeNameFormat,

    #[serde(with = "hex_bytes")]
    pub record_type: Vec<u8>,

    #[serde(with = "hex_bytes")]
    pub id: Vec<u8>,

    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,

    /// Decoded text for well-known Text (`T`) records.
    pub text: Option<String>,

    /// Language code for well-known Text records.
    pub language: Option<String>,
}

/// Terminal value of one card read session.
///
/// `success == true` with no transactions means the card was read but held
/// no history, which callers present differently from a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardReadResult {
    pub success: bool,

    /// Tag UID as uppercase hex. Empty when the tag was never identified.
    pub card_identifier: String,

    pub card_kind: CardKind,

    pub balance: Option<Balance>,

    /// Records in read order (not necessarily chronological).
    pub transactions: Vec<Transaction>,

    pub error: Option<String>,

    /// Technologies the tag reported.
    pub technologies: TechnologySet,

    /// Name of the protocol that produced the data, if any.
    pub protocol: Option<String>,

    pub ndef_records: Vec<NdefRecord>,
}

impl CardReadResult {
    /// A failed session.
    pub fn failure(card_identifier: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            card_identifier: card_identifier.into(),
            card_kind: CardKind::Unknown,
            balance: None,
            transactions: Vec::new(),
            error: Some(error.into()),
            technologies: TechnologySet::new(),
            protocol: None,
            ndef_records: Vec::new(),
        }
    }

    /// A successful session with no data yet attached.
    pub fn identified(uid: &[u8], technologies: TechnologySet) -> Self {
        Self {
            success: true,
            card_identifier: bytes_to_hex(uid),
            card_kind: CardKind::Unknown,
            balance: None,
            transactions: Vec::new(),
            error: None,
            technologies,
            protocol: None,
            ndef_records: Vec::new(),
        }
    }

    /// Card read, but nothing on it could be decoded.
    pub fn has_no_history(&self) -> bool {
        self.success && self.transactions.is_empty()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
