use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Byte codec errors
    #[error("Read of {width} bytes at offset {offset} exceeds buffer of {len} bytes")]
    OutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    // Data model errors
    #[error("Invalid technology identifier: {0}")]
    InvalidTechnology(String),

    #[error("Invalid location code: {0}")]
    InvalidLocationCode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
