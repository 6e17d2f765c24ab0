//! Simulated NFC adapter and tags.
//!
//! Used by tests and by the CLI demo in place of a radio.

pub mod tag;
pub mod transport;

pub use tag::{
    DesfireApplication, DesfireCard, DesfireFile, EmvCard, MifareMemory, MifareSector,
    SimulatedTag,
};
pub use transport::{Fault, MockNfc, MockNfcHandle, MockNfcStats};
