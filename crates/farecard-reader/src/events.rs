//! Progress events emitted while a session runs.
//!
//! Events are best effort. The session never waits on a slow consumer: when
//! the channel is full the event is dropped, and once the receiver is gone
//! the sink stops trying.

use crate::drivers::Protocol;
use farecard_core::{Balance, CardReadResult, TechnologySet, Transaction};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

/// One step of a card session.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionEvent {
    /// The tag was identified.
    TechnologyDiscovered {
        card_identifier: String,
        technologies: TechnologySet,
    },

    /// A driver is about to run.
    ProtocolAttempted(Protocol),

    /// A driver produced a transaction.
    TransactionRead(Transaction),

    /// A driver produced a balance.
    BalanceRead(Balance),

    /// The session ended and the handle was released.
    Finished(CardReadResult),
}

/// Non-blocking sender side used by the session.
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<SessionEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Option<mpsc::Sender<SessionEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&mut self, event: SessionEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                trace!(?event, "Event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped");
                self.tx = None;
            }
        }
    }
}
