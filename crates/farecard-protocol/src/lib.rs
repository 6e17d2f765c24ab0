//! Card protocol parsers and command encoding.
//!
//! Parsers are pure functions over raw bytes read from one addressable unit
//! (a MIFARE block, a DESFire record, an EMV record, an NDEF message). They
//! never panic: short, blank or malformed input yields `None`.
//!
//! # Example
//!
//! ```
//! use farecard_core::TransactionKind;
//! use farecard_protocol::{ParseContext, mifare};
//!
//! let mut block = [0u8; 16];
//! block[0] = 0x01;
//! block[1] = 0x64;
//!
//! let ctx = ParseContext::now();
//! let transaction = mifare::parse_block(&block, &ctx).unwrap();
//! assert_eq!(transaction.kind, TransactionKind::Boarding);
//! assert_eq!(transaction.amount.unwrap().to_string(), "1.00");
//! ```

pub mod apdu;
pub mod context;
pub mod desfire;
pub mod emv;
pub mod error;
pub mod mifare;
pub mod ndef;
pub mod timestamp;

pub use apdu::{ApduCommand, ApduResponse};
pub use context::{DateEncoding, ParseContext};
pub use error::{ProtocolError, Result};
