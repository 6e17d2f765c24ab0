//! Enum wrapper for transport dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn NfcTransport>`
//! is unavailable. [`AnyNfcTransport`] gives concrete dispatch over the
//! known transports instead.
//!
//! # Examples
//!
//! ```
//! use farecard_hardware::devices::AnyNfcTransport;
//! use farecard_hardware::mock::MockNfc;
//!
//! let (nfc, _handle) = MockNfc::new();
//! let transport = AnyNfcTransport::Mock(nfc);
//! assert_eq!(transport.name(), "Mock NFC Adapter");
//! ```

use crate::mock::MockNfc;
use crate::traits::NfcTransport;
use crate::types::{TagHandle, TagInfo};
use crate::Result;
use farecard_core::Technology;

#[derive(Debug)]
#[non_exhaustive]
pub enum AnyNfcTransport {
    /// Simulated adapter for development and testing.
    Mock(MockNfc),
}

impl AnyNfcTransport {
    pub fn name(&self) -> &str {
        match self {
            Self::Mock(transport) => transport.name(),
        }
    }
}

impl From<MockNfc> for AnyNfcTransport {
    fn from(transport: MockNfc) -> Self {
        Self::Mock(transport)
    }
}

impl NfcTransport for AnyNfcTransport {
    async fn request_technology(&mut self, priority: &[Technology]) -> Result<TagHandle> {
        match self {
            Self::Mock(transport) => transport.request_technology(priority).await,
        }
    }

    async fn get_tag(&mut self, handle: &TagHandle) -> Result<TagInfo> {
        match self {
            Self::Mock(transport) => transport.get_tag(handle).await,
        }
    }

    async fn transceive(&mut self, handle: &TagHandle, command: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Mock(transport) => transport.transceive(handle, command).await,
        }
    }

    async fn release_technology(&mut self) -> Result<()> {
        match self {
            Self::Mock(transport) => transport.release_technology().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::SimulatedTag;

    #[tokio::test]
    async fn test_any_transport_dispatches_to_mock() {
        let (nfc, handle) = MockNfc::new();
        let mut transport = AnyNfcTransport::from(nfc);

        handle
            .present(SimulatedTag::new(vec![0x01, 0x02, 0x03, 0x04]).with_technology(Technology::Ndef))
            .await
            .unwrap();

        let claimed = transport.request_technology(&[Technology::Ndef]).await.unwrap();
        let info = transport.get_tag(&claimed).await.unwrap();
        assert_eq!(info.uid_hex(), "01020304");
        transport.release_technology().await.unwrap();

        let AnyNfcTransport::Mock(nfc) = transport;
        assert_eq!(nfc.stats().releases, 1);
    }
}
