//! Card reading engine: protocol drivers and the session orchestrator.
//!
//! A [`CardSession`] claims the tag through any
//! [`NfcTransport`](farecard_hardware::NfcTransport), dispatches to the
//! matching protocol driver and returns a [`CardReadResult`](farecard_core::CardReadResult).
//! Progress can be followed through [`SessionEvent`]s.

pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod link;
pub mod session;
pub mod state;

pub use config::{DesfireConfig, EmvConfig, MifareConfig, ReaderConfig, SectorPlan};
pub use drivers::{Protocol, ProtocolRead};
pub use error::{ReaderError, Result};
pub use events::SessionEvent;
pub use session::{CLAIM_PRIORITY, CardSession, read_card};
pub use state::{SessionMachine, SessionState, StateTransition};
