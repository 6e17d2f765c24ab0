//! Shared data model and byte codec utilities for the farecard workspace.
//!
//! Every parser and driver in the workspace depends on this crate: it owns
//! the typed values a card read produces ([`Transaction`], [`Money`],
//! [`CardReadResult`]) and the low-level byte helpers in [`bytes`].

pub mod bytes;
pub mod constants;
pub mod error;
pub mod location;
pub mod types;

pub use error::{Error, Result};
pub use location::{LocationDirectory, StaticLocationDirectory};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
