//! Mock NFC transport for testing and development.
//!
//! Tags are presented through a [`MockNfcHandle`], the same way a card is
//! brought into the field of a real adapter. Failures can be injected per
//! transport with [`Fault`], and call counters are kept so tests can check
//! how the session used the transport.

use super::tag::SimulatedTag;
use crate::error::{HardwareError, Result};
use crate::traits::NfcTransport;
use crate::types::{TagHandle, TagInfo};
use farecard_core::Technology;
use farecard_core::bytes::bytes_to_hex;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Failure to inject into a [`MockNfc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The next technology request is refused after the tag arrives.
    RejectTechnology,
    /// `get_tag` reports the tag lost.
    GetTagFails,
    /// The tag leaves the field once this many commands have been answered.
    TagLostAfter(usize),
    /// Commands starting with these bytes fail with a link error.
    FailCommand(Vec<u8>),
    /// Releasing the technology reports an error (the claim is still dropped).
    ReleaseFails,
}

/// Call counters of a [`MockNfc`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockNfcStats {
    pub requests: usize,
    pub grants: usize,
    pub releases: usize,
    pub transceives: usize,
}

#[derive(Debug)]
struct ActiveTag {
    tag: SimulatedTag,
    session: Uuid,
    technology: Technology,
    lost: bool,
}

/// Mock NFC adapter.
///
/// # Examples
///
/// ```
/// use farecard_core::Technology;
/// use farecard_hardware::mock::{MockNfc, SimulatedTag};
/// use farecard_hardware::traits::NfcTransport;
///
/// #[tokio::main]
/// async fn main() -> farecard_hardware::Result<()> {
///     let (mut nfc, handle) = MockNfc::new();
///
///     let tag = SimulatedTag::new(vec![0x04, 0xAB, 0xCD, 0xEF]).with_technology(Technology::Ndef);
///     handle.present(tag).await?;
///
///     let claimed = nfc.request_technology(&[Technology::IsoDep, Technology::Ndef]).await?;
///     assert_eq!(claimed.technology(), &Technology::Ndef);
///     assert_eq!(nfc.get_tag(&claimed).await?.uid_hex(), "04ABCDEF");
///
///     nfc.release_technology().await?;
///     assert_eq!(nfc.stats().releases, 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockNfc {
    tag_rx: mpsc::Receiver<SimulatedTag>,
    name: String,
    active: Option<ActiveTag>,
    faults: Vec<Fault>,
    stats: MockNfcStats,
    sent: Vec<Vec<u8>>,
}

impl MockNfc {
    /// Create a mock adapter with the default name.
    pub fn new() -> (Self, MockNfcHandle) {
        Self::with_name("Mock NFC Adapter".to_string())
    }

    pub fn with_name(name: String) -> (Self, MockNfcHandle) {
        let (tag_tx, tag_rx) = mpsc::channel(8);

        let nfc = Self {
            tag_rx,
            name: name.clone(),
            active: None,
            faults: Vec::new(),
            stats: MockNfcStats::default(),
            sent: Vec::new(),
        };

        (nfc, MockNfcHandle { tag_tx, name })
    }

    /// Add a fault. Faults stay active for the lifetime of the transport.
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    pub fn stats(&self) -> MockNfcStats {
        self.stats
    }

    /// Every command received by `transceive`, in order.
    pub fn sent_commands(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a technology is currently claimed.
    pub fn is_claimed(&self) -> bool {
        self.active.is_some()
    }

    fn has_fault(&self, fault: &Fault) -> bool {
        self.faults.contains(fault)
    }

    fn tag_lost_after(&self) -> Option<usize> {
        self.faults.iter().find_map(|fault| match fault {
            Fault::TagLostAfter(n) => Some(*n),
            _ => None,
        })
    }

    fn command_fails(&self, command: &[u8]) -> bool {
        self.faults.iter().any(|fault| match fault {
            Fault::FailCommand(prefix) => command.starts_with(prefix),
            _ => false,
        })
    }

    fn active(&mut self, handle: &TagHandle) -> Result<&mut ActiveTag> {
        match self.active.as_mut() {
            Some(active) if active.session == handle.session() => Ok(active),
            _ => Err(HardwareError::invalid_handle(handle.session().to_string())),
        }
    }
}

impl NfcTransport for MockNfc {
    async fn request_technology(&mut self, priority: &[Technology]) -> Result<TagHandle> {
        self.stats.requests += 1;

        if self.active.is_some() {
            return Err(HardwareError::technology_rejected("technology already claimed"));
        }

        let tag = self
            .tag_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected(self.name.clone()))?;

        if self.has_fault(&Fault::RejectTechnology) {
            return Err(HardwareError::technology_rejected("request refused"));
        }

        let technology = priority
            .iter()
            .find(|technology| tag.technologies().contains(technology))
            .cloned()
            .ok_or_else(|| {
                HardwareError::technology_rejected(format!(
                    "tag {} supports none of the requested technologies",
                    bytes_to_hex(tag.uid())
                ))
            })?;

        let handle = TagHandle::issue(technology.clone());
        debug!(handle = %handle, "Technology granted");

        self.active = Some(ActiveTag {
            tag,
            session: handle.session(),
            technology,
            lost: false,
        });
        self.stats.grants += 1;
        Ok(handle)
    }

    async fn get_tag(&mut self, handle: &TagHandle) -> Result<TagInfo> {
        let get_tag_fails = self.has_fault(&Fault::GetTagFails);
        let active = self.active(handle)?;

        if get_tag_fails {
            active.lost = true;
            return Err(HardwareError::tag_lost("tag left the field during discovery"));
        }

        let tag = &active.tag;
        let info = TagInfo::new(tag.uid().to_vec(), tag.technologies().clone());
        Ok(match tag.ndef_message() {
            Some(message) => info.with_ndef_message(message.to_vec()),
            None => info,
        })
    }

    async fn transceive(&mut self, handle: &TagHandle, command: &[u8]) -> Result<Vec<u8>> {
        let lost_after = self.tag_lost_after();
        let command_fails = self.command_fails(command);
        let answered = self.stats.transceives;

        self.stats.transceives += 1;
        self.sent.push(command.to_vec());
        trace!(command = %bytes_to_hex(command), "transceive");

        let active = self.active(handle)?;
        if active.lost || lost_after.is_some_and(|limit| answered >= limit) {
            active.lost = true;
            return Err(HardwareError::tag_lost("tag left the field"));
        }
        if command_fails {
            return Err(HardwareError::communication("injected link failure"));
        }

        let technology = active.technology.clone();
        active.tag.respond(&technology, command)
    }

    async fn release_technology(&mut self) -> Result<()> {
        self.stats.releases += 1;
        self.active = None;

        if self.has_fault(&Fault::ReleaseFails) {
            return Err(HardwareError::communication("release failed"));
        }
        Ok(())
    }
}

/// Handle for presenting tags to a [`MockNfc`].
#[derive(Debug, Clone)]
pub struct MockNfcHandle {
    tag_tx: mpsc::Sender<SimulatedTag>,
    name: String,
}

impl MockNfcHandle {
    /// Bring a tag into the field. It is picked up by the next
    /// `request_technology` call.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport has been dropped.
    pub async fn present(&self, tag: SimulatedTag) -> Result<()> {
        self.tag_tx
            .send(tag)
            .await
            .map_err(|_| HardwareError::disconnected(self.name.clone()))
    }

    /// Non-blocking variant of [`present`](Self::present).
    pub fn try_present(&self, tag: SimulatedTag) -> Result<()> {
        self.tag_tx
            .try_send(tag)
            .map_err(|_| HardwareError::disconnected(self.name.clone()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
