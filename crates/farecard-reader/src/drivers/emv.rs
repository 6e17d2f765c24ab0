//! EMV contactless driver.
//!
//! Selects the payment environment and application, starts the transaction
//! context with GET PROCESSING OPTIONS, then scans the configured SFI and
//! record ranges. A refused READ RECORD ends the scan of that SFI. The
//! balance query is optional.
//!
//! EMV is the last ISO-DEP protocol tried, so the driver always reports a
//! bank card with whatever it managed to read.

use super::ProtocolRead;
use crate::config::EmvConfig;
use crate::error::Result;
use crate::link::SessionLink;
use farecard_core::CardKind;
use farecard_core::bytes::bytes_to_hex;
use farecard_core::constants::EMV_TAG_BALANCE;
use farecard_hardware::NfcTransport;
use farecard_protocol::apdu::commands;
use farecard_protocol::{ParseContext, emv};
use tracing::{debug, trace, warn};

pub async fn read<T: NfcTransport>(
    link: &mut SessionLink<'_, T>,
    config: &EmvConfig,
    ctx: &ParseContext,
) -> Result<Option<ProtocolRead>> {
    let ctx = ctx.with_date_encoding(config.date_encoding);
    let mut read = ProtocolRead::new(CardKind::BankCard);

    if link.iso(&commands::emv::select_ppse()).await?.is_none() {
        debug!("PPSE not available, selecting application directly");
    }

    if link.iso(&commands::emv::select(&config.aid)).await?.is_none() {
        warn!(aid = %bytes_to_hex(&config.aid), "Application not selectable");
        return Ok(Some(read));
    }

    if link
        .iso(&commands::emv::get_processing_options())
        .await?
        .is_none()
    {
        debug!("GET PROCESSING OPTIONS refused");
    }

    for sfi in config.sfi_range.clone() {
        for record in config.record_range.clone() {
            let Some(raw) = link.iso(&commands::emv::read_record(record, sfi)).await? else {
                trace!(sfi, record, "End of records");
                break;
            };
            match emv::parse_record(&raw, &ctx) {
                Some(transaction) => read.transactions.push(transaction),
                None => trace!(sfi, record, "Record carries no transaction"),
            }
        }
    }

    read.balance = link
        .iso(&commands::emv::get_data(&EMV_TAG_BALANCE))
        .await?
        .and_then(|raw| emv::parse_balance(&raw));
    if read.balance.is_none() {
        debug!("Balance not available");
    }

    debug!(
        transactions = read.transactions.len(),
        balance = ?read.balance,
        "EMV read complete"
    );
    Ok(Some(read))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use farecard_core::constants::EMV_AID_VISA;
    use farecard_core::{Money, Technology, TransactionKind};
    use farecard_hardware::mock::{EmvCard, MockNfc, SimulatedTag};
    use farecard_hardware::{NfcTransport, TagHandle};
    use farecard_protocol::DateEncoding;
    use tokio_util::sync::CancellationToken;

    fn log_record(amount: [u8; 6], date: [u8; 3]) -> Vec<u8> {
        let mut record = vec![0x70, 0x11, 0x9F, 0x02, 0x06];
        record.extend_from_slice(&amount);
        record.extend_from_slice(&[0x9A, 0x03]);
        record.extend_from_slice(&date);
        record.extend_from_slice(&[0x9C, 0x01, 0x00]);
        record
    }

    async fn claimed(card: EmvCard) -> (MockNfc, TagHandle) {
        let (mut nfc, presenter) = MockNfc::new();
        let tag = SimulatedTag::new(vec![0x08, 0x99, 0x88, 0x77])
            .with_technology(Technology::IsoDep)
            .with_emv(card);
        presenter.present(tag).await.unwrap();
        let handle = nfc.request_technology(&[Technology::IsoDep]).await.unwrap();
        (nfc, handle)
    }

    #[tokio::test]
    async fn test_reads_records_across_sfis() {
        let card = EmvCard::new(&EMV_AID_VISA)
            .with_record(1, 1, log_record([0, 0, 0, 0, 0x02, 0x50], [0x24, 0x03, 0x15]))
            .with_record(1, 2, log_record([0, 0, 0, 0, 0x10, 0x00], [0x24, 0x03, 0x16]))
            .with_record(3, 1, log_record([0, 0, 0, 0, 0x00, 0x99], [0x24, 0x04, 0x01]))
            .with_balance(vec![0x9F, 0x79, 0x06, 0x00, 0x00, 0x00, 0x01, 0x23, 0x45]);
        let (mut nfc, handle) = claimed(card).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);
        let config = EmvConfig {
            date_encoding: DateEncoding::Bcd,
            ..EmvConfig::default()
        };

        let read = read(&mut link, &config, &ParseContext::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(read.card_kind, CardKind::BankCard);
        assert_eq!(read.balance, Some(Money::from_minor(12_345)));
        assert_eq!(read.transactions.len(), 3);
        assert!(read
            .transactions
            .iter()
            .all(|t| t.kind == TransactionKind::CardOperation));
        assert_eq!(read.transactions[0].amount, Some(Money::from_minor(250)));
        assert_eq!(
            read.transactions[0].occurred_at.date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(read.transactions[2].occurred_at.month(), 4);
    }

    #[tokio::test]
    async fn test_command_sequence() {
        let (mut nfc, handle) = claimed(EmvCard::new(&EMV_AID_VISA)).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);
        let config = EmvConfig {
            sfi_range: 1..=2,
            ..EmvConfig::default()
        };

        let read = read(&mut link, &config, &ParseContext::now())
            .await
            .unwrap()
            .unwrap();
        assert!(read.is_empty());

        let sent = nfc.sent_commands();
        assert_eq!(sent[0], commands::emv::select_ppse());
        assert_eq!(
            sent[1],
            vec![0x00, 0xA4, 0x04, 0x00, 0x07, 0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10, 0x00]
        );
        assert_eq!(sent[2], vec![0x80, 0xA8, 0x00, 0x00, 0x02, 0x83, 0x00, 0x00]);
        assert_eq!(sent[3], vec![0x00, 0xB2, 0x01, 0x0C, 0x00]);
        assert_eq!(sent[4], vec![0x00, 0xB2, 0x01, 0x14, 0x00]);
        assert_eq!(sent[5], vec![0x80, 0xCA, 0x9F, 0x79, 0x00]);
        assert_eq!(sent.len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_application_still_returns_bank_card() {
        let (mut nfc, handle) = claimed(EmvCard::new(&[0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10])).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);

        let read = read(&mut link, &EmvConfig::default(), &ParseContext::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.card_kind, CardKind::BankCard);
        assert!(read.is_empty());
        assert_eq!(link.commands_sent(), 2);
    }

    #[tokio::test]
    async fn test_missing_ppse_is_not_fatal() {
        let card = EmvCard::new(&EMV_AID_VISA)
            .without_ppse()
            .with_record(2, 1, log_record([0, 0, 0, 0, 0x01, 0x00], [0x18, 0x01, 0x02]));
        let (mut nfc, handle) = claimed(card).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);

        let read = read(&mut link, &EmvConfig::default(), &ParseContext::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.transactions.len(), 1);
        // raw binary: 0x18 is year 2024
        assert_eq!(read.transactions[0].occurred_at.year(), 2024);
        assert_eq!(read.balance, None);
    }
}
