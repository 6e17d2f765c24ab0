//! Card session orchestrator.
//!
//! A [`CardSession`] runs one read against an [`NfcTransport`]:
//!
//! 1. Claim a technology in priority order (MIFARE family, ISO-DEP, NDEF).
//! 2. Identify the tag.
//! 3. Try the drivers of [`Protocol::plan`] in order and keep the first one
//!    that recognises the card.
//! 4. Release the technology, on every path, exactly once.
//! 5. Normalize everything into a [`CardReadResult`].
//!
//! The session can be cancelled through its [`CancellationToken`]. A pending
//! claim is abandoned immediately; an exchange in progress stops before its
//! next command.
//!
//! # Examples
//!
//! ```
//! use farecard_core::{CardKind, Technology};
//! use farecard_hardware::mock::{MockNfc, SimulatedTag};
//! use farecard_reader::{CardSession, ReaderConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (mut nfc, presenter) = MockNfc::new();
//! presenter
//!     .present(SimulatedTag::new(vec![0x04, 0x01, 0x02, 0x03]).with_technology(Technology::NfcA))
//!     .await
//!     .unwrap();
//!
//! let mut session = CardSession::new(ReaderConfig::default());
//! let result = session.read(&mut nfc).await;
//!
//! // NfcA alone is not claimable
//! assert!(!result.success);
//! assert_eq!(nfc.stats().releases, 1);
//! # }
//! ```

use crate::config::ReaderConfig;
use crate::drivers::{Protocol, ProtocolRead};
use crate::error::Result;
use crate::events::{EventSink, SessionEvent};
use crate::link::SessionLink;
use crate::state::{SessionMachine, SessionState, StateTransition};
use chrono::Utc;
use farecard_core::{CardReadResult, Technology};
use farecard_hardware::{HardwareError, NfcTransport};
use farecard_protocol::ParseContext;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Technologies requested from the transport, highest priority first.
pub const CLAIM_PRIORITY: [Technology; 4] = [
    Technology::MifareClassic,
    Technology::MifareUltralight,
    Technology::IsoDep,
    Technology::Ndef,
];

#[derive(Debug)]
pub struct CardSession {
    config: ReaderConfig,
    cancel: CancellationToken,
    events: EventSink,
    machine: SessionMachine,
    commands_sent: usize,
}

impl CardSession {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            events: EventSink::default(),
            machine: SessionMachine::new(),
            commands_sent: 0,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Report progress to `tx`. Events are dropped when the channel is full.
    pub fn with_events(mut self, tx: mpsc::Sender<SessionEvent>) -> Self {
        self.events = EventSink::new(Some(tx));
        self
    }

    /// Create an event channel sized by the configuration and attach it.
    pub fn subscribe(&mut self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        self.events = EventSink::new(Some(tx));
        rx
    }

    /// Token that cancels this session when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        *self.machine.current_state()
    }

    /// Transitions of the most recent read.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        self.machine.history()
    }

    /// States visited by the most recent read.
    pub fn path(&self) -> Vec<SessionState> {
        self.machine.path()
    }

    /// Commands sent to the tag by the most recent read.
    pub fn commands_sent(&self) -> usize {
        self.commands_sent
    }

    /// Read the next tag presented to `transport`.
    ///
    /// Never fails: transport failures and cancellation are reported through
    /// [`CardReadResult::success`] and [`CardReadResult::error`]. The
    /// transport's technology is released before this returns.
    pub async fn read<T: NfcTransport>(&mut self, transport: &mut T) -> CardReadResult {
        self.machine = SessionMachine::new();
        self.commands_sent = 0;

        let mut result = CardReadResult::identified(&[], Default::default());
        let outcome = self.exchange(transport, &mut result).await;

        if let Err(error) = transport.release_technology().await {
            warn!(%error, "Releasing technology failed");
        }
        self.advance(SessionState::HandleReleased);
        self.advance(SessionState::Done);

        let result = match outcome {
            Ok(()) => result,
            Err(error) => {
                if error.is_cancelled() {
                    info!("Card session cancelled");
                } else {
                    warn!(%error, "Card session failed");
                }
                CardReadResult {
                    technologies: result.technologies,
                    ..CardReadResult::failure(result.card_identifier, error.to_string())
                }
            }
        };

        info!(
            card = %result.card_identifier,
            success = result.success,
            kind = %result.card_kind,
            protocol = result.protocol.as_deref().unwrap_or("none"),
            transactions = result.transactions.len(),
            balance = ?result.balance.map(|balance| balance.to_string()),
            commands = self.commands_sent,
            elapsed_ms = self.machine.elapsed().as_millis() as u64,
            "Card session finished"
        );
        self.events.emit(SessionEvent::Finished(result.clone()));
        result
    }

    async fn exchange<T: NfcTransport>(
        &mut self,
        transport: &mut T,
        result: &mut CardReadResult,
    ) -> Result<()> {
        let handle = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(HardwareError::Cancelled.into()),
            granted = transport.request_technology(&CLAIM_PRIORITY) => granted?,
        };
        debug!(%handle, "Technology claimed");

        if self.cancel.is_cancelled() {
            return Err(HardwareError::Cancelled.into());
        }
        let tag = transport.get_tag(&handle).await?;
        *result = CardReadResult::identified(&tag.id, tag.technologies.clone());
        self.machine.transition_to(SessionState::TechnologyDiscovered)?;
        self.events.emit(SessionEvent::TechnologyDiscovered {
            card_identifier: result.card_identifier.clone(),
            technologies: tag.technologies.clone(),
        });

        let plan = Protocol::plan(&tag.technologies, tag.ndef_message.is_some());
        debug!(card = %result.card_identifier, ?plan, "Route planned");

        let ctx = ParseContext::new(Utc::now(), self.config.emv.date_encoding);
        let mut link = SessionLink::new(transport, &handle, &self.cancel);
        let mut committed = None;

        for protocol in plan {
            if let Some(state) = SessionState::attempting(protocol) {
                self.machine.transition_to(state)?;
            }
            self.events.emit(SessionEvent::ProtocolAttempted(protocol));

            let outcome = protocol.run(&mut link, &tag, &self.config, &ctx).await;
            self.commands_sent = link.commands_sent();
            match outcome? {
                Some(read) => {
                    committed = Some((protocol, read));
                    break;
                }
                None => warn!(%protocol, "Protocol did not match, falling through"),
            }
        }

        match committed {
            Some((protocol, read)) => self.commit(protocol, read, result),
            None => debug!(card = %result.card_identifier, "No protocol recognised the card"),
        }
        Ok(())
    }

    fn commit(&mut self, protocol: Protocol, read: ProtocolRead, result: &mut CardReadResult) {
        for transaction in &read.transactions {
            self.events.emit(SessionEvent::TransactionRead(transaction.clone()));
        }
        if let Some(balance) = read.balance {
            self.events.emit(SessionEvent::BalanceRead(balance));
        }

        result.protocol = Some(protocol.name().to_string());
        result.card_kind = read.card_kind;
        result.balance = read.balance;
        result.transactions = read.transactions;
        result.ndef_records = read.ndef_records;
    }

    fn advance(&mut self, state: SessionState) {
        if let Err(error) = self.machine.transition_to(state) {
            warn!(%error, "Session state out of order");
        }
    }
}

/// Convenience for a one-off read with default settings.
pub async fn read_card<T: NfcTransport>(transport: &mut T) -> CardReadResult {
    CardSession::new(ReaderConfig::default()).read(transport).await
}
