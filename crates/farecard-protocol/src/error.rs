use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Response too short: {len} bytes, expected at least 2")]
    ResponseTooShort { len: usize },

    #[error("Unexpected status word {sw1:02X}{sw2:02X}")]
    UnexpectedStatus { sw1: u8, sw2: u8 },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
