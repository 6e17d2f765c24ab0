//! DESFire stored-value driver.
//!
//! Selects the card master application, takes the first application listed
//! there and walks its files. Cyclic record files are read one record at a
//! time until the card refuses; value files give the balance. A card that
//! yields neither is not treated as DESFire, so the session moves on to EMV.

use super::ProtocolRead;
use crate::config::DesfireConfig;
use crate::error::Result;
use crate::link::SessionLink;
use farecard_core::CardKind;
use farecard_core::bytes::bytes_to_hex;
use farecard_core::constants::DESFIRE_MASTER_AID;
use farecard_hardware::NfcTransport;
use farecard_protocol::ParseContext;
use farecard_protocol::apdu::commands;
use farecard_protocol::desfire::{self, FileKind, FileSettings};
use tracing::{debug, trace};

pub async fn read<T: NfcTransport>(
    link: &mut SessionLink<'_, T>,
    config: &DesfireConfig,
    ctx: &ParseContext,
) -> Result<Option<ProtocolRead>> {
    if link
        .desfire(&commands::desfire::select_application(&DESFIRE_MASTER_AID))
        .await?
        .is_none()
    {
        debug!("Master application not selectable, not a DESFire card");
        return Ok(None);
    }

    let Some(ids) = link.desfire(&commands::desfire::get_application_ids()).await? else {
        return Ok(None);
    };
    let Some(aid) = desfire::parse_application_ids(&ids).into_iter().next() else {
        debug!("No DESFire applications");
        return Ok(None);
    };

    if link
        .desfire(&commands::desfire::select_application(&aid))
        .await?
        .is_none()
    {
        debug!(aid = %bytes_to_hex(&aid), "Application select refused");
        return Ok(None);
    }

    let Some(file_ids) = link.desfire(&commands::desfire::get_file_ids()).await? else {
        return Ok(None);
    };

    let mut read = ProtocolRead::new(CardKind::PrepaidCard);
    for file_id in file_ids {
        let settings = link
            .desfire(&commands::desfire::get_file_settings(file_id))
            .await?
            .and_then(|raw| desfire::parse_file_settings(&raw));
        let Some(settings) = settings else {
            debug!(file_id, "File settings unreadable, skipping");
            continue;
        };

        match settings.kind {
            FileKind::CyclicRecord => {
                read_records(link, file_id, &settings, config, ctx, &mut read).await?;
            }
            FileKind::Value => {
                let value = link
                    .desfire(&commands::desfire::get_value(file_id))
                    .await?
                    .and_then(|raw| desfire::parse_value(&raw));
                if read.balance.is_none() {
                    read.balance = value;
                }
            }
            FileKind::Other(code) => trace!(file_id, code, "Ignoring file"),
        }
    }

    if read.is_empty() {
        debug!(aid = %bytes_to_hex(&aid), "DESFire application held no data");
        return Ok(None);
    }
    debug!(
        transactions = read.transactions.len(),
        balance = ?read.balance,
        "DESFire read complete"
    );
    Ok(Some(read))
}

async fn read_records<T: NfcTransport>(
    link: &mut SessionLink<'_, T>,
    file_id: u8,
    settings: &FileSettings,
    config: &DesfireConfig,
    ctx: &ParseContext,
    read: &mut ProtocolRead,
) -> Result<()> {
    let limit = match config.max_records_per_file {
        Some(cap) => settings.max_records.min(cap),
        None => settings.max_records,
    };
    let record_size = settings.record_size as usize;

    for index in 0..limit {
        let Some(raw) = link
            .desfire(&commands::desfire::read_records(file_id, index, 1))
            .await?
        else {
            trace!(file_id, index, "End of records");
            break;
        };
        match desfire::parse_record(&raw, record_size, ctx) {
            Some(transaction) => read.transactions.push(transaction),
            None => trace!(file_id, index, "Empty record"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use farecard_core::{Money, Technology, TransactionKind};
    use farecard_hardware::mock::{
        DesfireApplication, DesfireCard, DesfireFile, MockNfc, SimulatedTag,
    };
    use farecard_hardware::{NfcTransport, TagHandle};
    use tokio_util::sync::CancellationToken;

    const AID: [u8; 3] = [0x12, 0x34, 0x56];

    fn record(location: u32, time: u64, amount: i32) -> Vec<u8> {
        let mut raw = Vec::with_capacity(16);
        raw.extend_from_slice(&location.to_le_bytes());
        raw.extend_from_slice(&time.to_le_bytes());
        raw.extend_from_slice(&amount.to_le_bytes());
        raw
    }

    fn cyclic(records: Vec<Vec<u8>>, max_records: u32) -> DesfireFile {
        DesfireFile::CyclicRecord {
            record_size: 16,
            max_records,
            records,
        }
    }

    async fn claimed(card: DesfireCard) -> (MockNfc, TagHandle) {
        let (mut nfc, presenter) = MockNfc::new();
        let tag = SimulatedTag::new(vec![0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
            .with_technology(Technology::IsoDep)
            .with_desfire(card);
        presenter.present(tag).await.unwrap();
        let handle = nfc.request_technology(&[Technology::IsoDep]).await.unwrap();
        (nfc, handle)
    }

    #[tokio::test]
    async fn test_reads_records_and_value() {
        let app = DesfireApplication::new(AID)
            .with_file(0x01, DesfireFile::Value(4_250))
            .with_file(
                0x02,
                cyclic(
                    vec![
                        record(0x1234_ABCD, 1_700_000_000, -100),
                        record(0x0000_0042, 1_700_000_000_000, 100),
                    ],
                    10,
                ),
            )
            .with_file(0x03, DesfireFile::StandardData(vec![0x01; 8]));
        let (mut nfc, handle) = claimed(DesfireCard::new().with_application(app)).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);

        let read = read(&mut link, &DesfireConfig::default(), &ParseContext::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(read.card_kind, CardKind::PrepaidCard);
        assert_eq!(read.balance, Some(Money::from_minor(4_250)));
        assert_eq!(read.transactions.len(), 2);
        assert_eq!(read.transactions[0].kind, TransactionKind::Purchase);
        assert_eq!(read.transactions[0].amount, Some(Money::from_minor(100)));
        assert_eq!(read.transactions[0].location_code.as_deref(), Some("1234"));
        assert_eq!(read.transactions[1].kind, TransactionKind::TopUp);
    }

    #[tokio::test]
    async fn test_stops_at_first_missing_record() {
        let app = DesfireApplication::new(AID).with_file(
            0x05,
            cyclic(vec![record(0x0101_0101, 1_700_000_000, -250)], 8),
        );
        let (mut nfc, handle) = claimed(DesfireCard::new().with_application(app)).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);

        let read = read(&mut link, &DesfireConfig::default(), &ParseContext::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.transactions.len(), 1);

        // select, ids, select, file ids, settings, record 0, record 1 (refused)
        assert_eq!(link.commands_sent(), 7);
    }

    #[tokio::test]
    async fn test_record_cap_from_config() {
        let records = (0..6)
            .map(|i| record(0x0A0B_0C0D, 1_700_000_000 + i, 50))
            .collect();
        let app = DesfireApplication::new(AID).with_file(0x01, cyclic(records, 6));
        let (mut nfc, handle) = claimed(DesfireCard::new().with_application(app)).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);
        let config = DesfireConfig {
            max_records_per_file: Some(3),
        };

        let read = read(&mut link, &config, &ParseContext::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.transactions.len(), 3);
    }

    #[tokio::test]
    async fn test_reads_every_declared_record_by_default() {
        let records = (0..100)
            .map(|i| record(0x0A0B_0C0D, 1_700_000_000 + i, -10))
            .collect();
        let app = DesfireApplication::new(AID).with_file(0x01, cyclic(records, 100));
        let (mut nfc, handle) = claimed(DesfireCard::new().with_application(app)).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);

        let read = read(&mut link, &DesfireConfig::default(), &ParseContext::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.transactions.len(), 100);
        assert_eq!(read.transactions[99].occurred_at.timestamp(), 1_700_000_099);
    }

    #[tokio::test]
    async fn test_card_without_applications_is_not_desfire() {
        let (mut nfc, handle) = claimed(DesfireCard::new()).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);

        let read = read(&mut link, &DesfireConfig::default(), &ParseContext::now())
            .await
            .unwrap();
        assert_eq!(read, None);
    }

    #[tokio::test]
    async fn test_blank_records_only_is_not_desfire() {
        let app = DesfireApplication::new(AID).with_file(
            0x01,
            cyclic(vec![vec![0x00; 16], vec![0xFF; 16]], 2),
        );
        let (mut nfc, handle) = claimed(DesfireCard::new().with_application(app)).await;
        let token = CancellationToken::new();
        let mut link = SessionLink::new(&mut nfc, &handle, &token);

        let read = read(&mut link, &DesfireConfig::default(), &ParseContext::now())
            .await
            .unwrap();
        assert_eq!(read, None);
    }
}
