use farecard_hardware::HardwareError;
use thiserror::Error;

/// Errors that end a card session early.
///
/// Drivers only surface fatal transport failures; everything a driver can
/// recover from is skipped inside the driver.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error("Invalid session transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl ReaderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Hardware(HardwareError::Cancelled))
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_displays_plainly() {
        let error = ReaderError::from(HardwareError::Cancelled);
        assert!(error.is_cancelled());
        assert_eq!(error.to_string(), "cancelled");
    }

    #[test]
    fn test_transition_display() {
        let error = ReaderError::InvalidStateTransition {
            from: "idle".to_string(),
            to: "done".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid session transition from idle to done");
        assert!(!error.is_cancelled());
    }
}
