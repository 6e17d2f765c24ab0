//! MIFARE Classic driver.
//!
//! Walks the configured sectors: authenticate with key A, read the balance
//! block, then the transaction blocks. A sector that refuses the key is
//! skipped, and so is a block that fails to read. The card is always
//! reported as a transit card, even when nothing could be read.

use super::ProtocolRead;
use crate::config::{MifareConfig, SectorPlan};
use crate::error::Result;
use crate::link::SessionLink;
use farecard_core::CardKind;
use farecard_hardware::NfcTransport;
use farecard_protocol::apdu::commands;
use farecard_protocol::{ParseContext, mifare};
use tracing::{debug, trace};

pub async fn read<T: NfcTransport>(
    link: &mut SessionLink<'_, T>,
    uid: &[u8],
    config: &MifareConfig,
    ctx: &ParseContext,
) -> Result<Option<ProtocolRead>> {
    let mut read = ProtocolRead::new(CardKind::TransitCard);

    for plan in &config.sectors {
        let auth = commands::mifare::authenticate_key_a(plan.first_block(), &config.key_a, uid);
        if link.exchange(&auth).await?.is_none() {
            debug!(sector = plan.sector, "Sector authentication failed, skipping");
            continue;
        }
        read_sector(link, plan, ctx, &mut read).await?;
    }

    debug!(
        transactions = read.transactions.len(),
        balance = ?read.balance,
        "MIFARE read complete"
    );
    Ok(Some(read))
}

async fn read_sector<T: NfcTransport>(
    link: &mut SessionLink<'_, T>,
    plan: &SectorPlan,
    ctx: &ParseContext,
    read: &mut ProtocolRead,
) -> Result<()> {
    if read.balance.is_none()
        && let Some(block) = plan.balance_block
        && let Some(raw) = read_block(link, block).await?
    {
        read.balance = mifare::parse_balance(&raw);
    }

    for &block in &plan.transaction_blocks {
        let Some(raw) = read_block(link, block).await? else {
            continue;
        };
        match mifare::parse_block(&raw, ctx) {
            Some(transaction) => read.transactions.push(transaction),
            None => trace!(block, "Empty transaction block"),
        }
    }
    Ok(())
}

async fn read_block<T: NfcTransport>(
    link: &mut SessionLink<'_, T>,
    block: u8,
) -> Result<Option<Vec<u8>>> {
    let raw = link.exchange(&commands::mifare::read_block(block)).await?;
    if raw.is_none() {
        debug!(block, "Block read failed, skipping");
    }
    Ok(raw)
}
