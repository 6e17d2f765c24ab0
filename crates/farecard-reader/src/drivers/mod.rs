//! Protocol drivers.
//!
//! A driver owns the command sequence of one card family. It returns
//! `Ok(Some(..))` when the card spoke its protocol, `Ok(None)` when it did
//! not, and `Err` only when the session cannot continue.
//!
//! Dispatch is a closed [`Protocol`] enum; [`Protocol::plan`] turns the
//! tag's technologies into the ordered list of drivers to try.

pub mod desfire;
pub mod emv;
pub mod mifare;
pub mod ndef;

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::link::SessionLink;
use farecard_core::{Balance, CardKind, NdefRecord, Technology, TechnologySet, Transaction};
use farecard_hardware::{NfcTransport, TagInfo};
use farecard_protocol::ParseContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a driver read from a card that spoke its protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolRead {
    pub card_kind: CardKind,
    pub balance: Option<Balance>,
    pub transactions: Vec<Transaction>,
    pub ndef_records: Vec<NdefRecord>,
}

impl ProtocolRead {
    pub fn new(card_kind: CardKind) -> Self {
        Self {
            card_kind,
            ..Self::default()
        }
    }

    /// Neither a balance nor any transaction was obtained.
    pub fn is_empty(&self) -> bool {
        self.balance.is_none() && self.transactions.is_empty()
    }
}

/// The card protocols the reader knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Mifare,
    DesfireIsoDep,
    EmvIsoDep,
    Ndef,
    Unknown,
}

impl Protocol {
    /// Drivers to try for a tag, in priority order.
    ///
    /// MIFARE family wins over ISO-DEP, which wins over NDEF. An ISO-DEP tag
    /// is tried as DESFire first and as EMV second. A tag matching nothing
    /// gets `[Unknown]`.
    ///
    /// ```
    /// use farecard_core::{Technology, TechnologySet};
    /// use farecard_reader::drivers::Protocol;
    ///
    /// let technologies: TechnologySet = [Technology::IsoDep, Technology::Ndef].into_iter().collect();
    /// assert_eq!(
    ///     Protocol::plan(&technologies, false),
    ///     vec![Protocol::DesfireIsoDep, Protocol::EmvIsoDep, Protocol::Ndef]
    /// );
    /// ```
    pub fn plan(technologies: &TechnologySet, has_ndef_message: bool) -> Vec<Protocol> {
        let mut plan = Vec::new();
        if technologies.has_mifare_family() {
            plan.push(Protocol::Mifare);
        }
        if technologies.contains(&Technology::IsoDep) {
            plan.extend([Protocol::DesfireIsoDep, Protocol::EmvIsoDep]);
        }
        if technologies.contains(&Technology::Ndef) || has_ndef_message {
            plan.push(Protocol::Ndef);
        }
        if plan.is_empty() {
            plan.push(Protocol::Unknown);
        }
        plan
    }

    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Mifare => "mifare",
            Protocol::DesfireIsoDep => "desfire",
            Protocol::EmvIsoDep => "emv",
            Protocol::Ndef => "ndef",
            Protocol::Unknown => "unknown",
        }
    }

    /// Run this protocol's driver against the claimed tag.
    pub async fn run<T: NfcTransport>(
        self,
        link: &mut SessionLink<'_, T>,
        tag: &TagInfo,
        config: &ReaderConfig,
        ctx: &ParseContext,
    ) -> Result<Option<ProtocolRead>> {
        match self {
            Protocol::Mifare => mifare::read(link, &tag.id, &config.mifare, ctx).await,
            Protocol::DesfireIsoDep => desfire::read(link, &config.desfire, ctx).await,
            Protocol::EmvIsoDep => emv::read(link, &config.emv, ctx).await,
            Protocol::Ndef => Ok(ndef::read(tag.ndef_message.as_deref())),
            Protocol::Unknown => Ok(None),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
