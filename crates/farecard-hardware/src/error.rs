//! Error types for NFC transport operations.
//!
//! Errors split into two classes. Fatal errors end the session: the tag has
//! left the field, the adapter is gone, or the session was cancelled. Every
//! other error is local to one command, and drivers skip the unit they were
//! reading and continue.

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to a tag.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The tag left the RF field.
    #[error("Tag lost: {message}")]
    TagLost { message: String },

    /// The NFC adapter is not available or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The session was cancelled before the operation completed.
    #[error("cancelled")]
    Cancelled,

    /// None of the requested technologies could be claimed.
    #[error("Technology rejected: {message}")]
    TechnologyRejected { message: String },

    /// The handle does not belong to the active session.
    #[error("Stale tag handle: {session}")]
    InvalidHandle { session: String },

    /// Operation is not supported by this transport or tag.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Transceive failed at the link layer.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// The tag answered with a refusal (failed authentication, missing file).
    #[error("Command rejected: {message}")]
    CommandRejected { message: String },
}

impl HardwareError {
    pub fn tag_lost(message: impl Into<String>) -> Self {
        Self::TagLost {
            message: message.into(),
        }
    }

    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn technology_rejected(message: impl Into<String>) -> Self {
        Self::TechnologyRejected {
            message: message.into(),
        }
    }

    pub fn invalid_handle(session: impl Into<String>) -> Self {
        Self::InvalidHandle {
            session: session.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn command_rejected(message: impl Into<String>) -> Self {
        Self::CommandRejected {
            message: message.into(),
        }
    }

    /// Whether the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TagLost { .. }
                | Self::Disconnected { .. }
                | Self::Cancelled
                | Self::InvalidHandle { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
