//! Command-line front end for the card reader.
//!
//! Reads one of the built-in simulated cards through the full session
//! pipeline and prints the normalized result.

mod demo;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use demo::DemoCard;
use farecard_core::{CardReadResult, LocationDirectory, StaticLocationDirectory};
use farecard_hardware::AnyNfcTransport;
use farecard_hardware::mock::MockNfc;
use farecard_protocol::DateEncoding;
use farecard_reader::{CardSession, ReaderConfig, SessionEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "farecard")]
#[command(about = "Read transit, prepaid and bank cards over NFC", version)]
struct Args {
    /// Simulated card to present to the reader
    #[arg(short, long, value_enum, default_value_t = DemoCard::Transit)]
    card: DemoCard,

    /// JSON file with reader settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override how EMV log dates are decoded
    #[arg(long, value_enum)]
    date_encoding: Option<DateArg>,

    /// JSON object mapping location codes to display names
    #[arg(long)]
    locations: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Log session events as they happen
    #[arg(long)]
    events: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateArg {
    Raw,
    Bcd,
}

impl From<DateArg> for DateEncoding {
    fn from(arg: DateArg) -> Self {
        match arg {
            DateArg::Raw => DateEncoding::RawBinary,
            DateArg::Bcd => DateEncoding::Bcd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// One line per transaction
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ReaderConfig::default(),
    };
    if let Some(encoding) = args.date_encoding {
        config.emv.date_encoding = encoding.into();
    }
    let directory = match &args.locations {
        Some(path) => load_locations(path)?,
        None => StaticLocationDirectory::new(),
    };

    let (nfc, presenter) = MockNfc::with_name(format!("demo-{:?}", args.card).to_lowercase());
    let mut transport = AnyNfcTransport::from(nfc);
    presenter
        .present(args.card.tag())
        .await
        .context("Failed to present demo card")?;
    info!(reader = transport.name(), card = ?args.card, "Card presented");

    let mut session = CardSession::new(config);
    let cancel = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let watcher = args.events.then(|| {
        let mut rx = session.subscribe();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                log_event(&event);
            }
        })
    });

    let result = session.read(&mut transport).await;
    drop(session);
    if let Some(watcher) = watcher {
        // The sender goes away with the session, which ends the watcher
        watcher.await.context("Event watcher panicked")?;
    }

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).context("Failed to encode result")?;
            println!("{json}");
        }
        OutputFormat::Summary => print_summary(&result, &directory),
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<ReaderConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    debug!(path = %path.display(), "Config loaded");
    Ok(config)
}

fn load_locations(path: &Path) -> Result<StaticLocationDirectory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read locations {}", path.display()))?;
    let entries: HashMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid locations {}", path.display()))?;
    let directory: StaticLocationDirectory = entries.into_iter().collect();
    debug!(entries = directory.len(), "Location directory loaded");
    Ok(directory)
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::TechnologyDiscovered {
            card_identifier,
            technologies,
        } => {
            let names: Vec<_> = technologies.iter().map(|t| t.name().to_string()).collect();
            info!(card = %card_identifier, technologies = ?names, "Tag discovered");
        }
        SessionEvent::ProtocolAttempted(protocol) => info!(%protocol, "Trying protocol"),
        SessionEvent::TransactionRead(transaction) => {
            info!(kind = %transaction.kind, at = %transaction.occurred_at, "Transaction read");
        }
        SessionEvent::BalanceRead(balance) => info!(%balance, "Balance read"),
        SessionEvent::Finished(result) => info!(success = result.success, "Read finished"),
        _ => debug!(?event, "Unhandled event"),
    }
}

fn print_summary(result: &CardReadResult, directory: &impl LocationDirectory) {
    println!("Card      {}", result.card_identifier);
    println!("Type      {}", result.card_kind);
    if let Some(protocol) = &result.protocol {
        println!("Protocol  {protocol}");
    }
    if let Some(error) = &result.error {
        println!("Error     {error}");
        return;
    }
    match result.balance {
        Some(balance) => println!("Balance   {balance}"),
        None => println!("Balance   -"),
    }

    for record in &result.ndef_records {
        if let Some(text) = &record.text {
            println!("Text      {text}");
        }
    }

    if result.transactions.is_empty() {
        return;
    }
    println!();
    for transaction in &result.transactions {
        let amount = transaction
            .amount
            .map(|amount| amount.to_string())
            .unwrap_or_else(|| "-".to_string());
        let place = transaction
            .location_code
            .as_deref()
            .map(|code| directory.resolve(code))
            .unwrap_or_default();
        // read-time fallbacks are flagged with '~'
        let stamp = if transaction.timestamp_source.is_from_card() { ' ' } else { '~' };
        println!(
            "{}{} {:<10} {:>10}  {}",
            transaction.occurred_at.format("%Y-%m-%d %H:%M"),
            stamp,
            transaction.kind.to_string(),
            amount,
            place
        );
    }
}
