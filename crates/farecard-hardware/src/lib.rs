//! NFC transport abstraction for the farecard reader.
//!
//! The reader engine never talks to a radio directly. It consumes the
//! [`NfcTransport`] capability: claim a technology on the tag in the field,
//! identify the tag, exchange raw command bytes, release.
//!
//! # Design
//!
//! - **Async-first**: native `async fn` in traits (Edition 2024).
//! - **Exclusive**: a [`TagHandle`] belongs to one session and is invalid
//!   after release.
//! - **Error-aware**: [`HardwareError::is_fatal`] separates session-ending
//!   failures from per-command ones.
//!
//! A programmable [`mock::MockNfc`] stands in for real adapters in tests
//! and in the CLI demo.

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use devices::AnyNfcTransport;
pub use error::{HardwareError, Result};
pub use traits::NfcTransport;
pub use types::{TagHandle, TagInfo};
