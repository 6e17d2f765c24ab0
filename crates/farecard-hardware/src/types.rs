//! Types exchanged between the session and a transport.

use chrono::{DateTime, Utc};
use farecard_core::bytes::bytes_to_hex;
use farecard_core::{Technology, TechnologySet};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Claimed connection to the tag currently in the field.
///
/// A handle is valid until the transport's technology is released. Handles
/// are not `Clone`: the session that requested the technology owns it.
#[derive(Debug, PartialEq, Eq)]
pub struct TagHandle {
    session: Uuid,
    technology: Technology,
}

impl TagHandle {
    /// Issue a handle for a fresh session. Called by transports.
    pub fn issue(technology: Technology) -> Self {
        Self {
            session: Uuid::new_v4(),
            technology,
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    /// The technology this handle was claimed for.
    pub fn technology(&self) -> &Technology {
        &self.technology
    }
}

impl fmt::Display for TagHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.technology, self.session)
    }
}

/// What a transport reports about the tag behind a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag UID (anti-collision identifier), 4-10 bytes.
    pub id: Vec<u8>,

    /// Technologies the tag exposes.
    pub technologies: TechnologySet,

    /// Raw NDEF message cached by the platform at discovery, if any.
    pub ndef_message: Option<Vec<u8>>,

    /// When the tag was discovered.
    pub discovered_at: DateTime<Utc>,
}

impl TagInfo {
    pub fn new(id: Vec<u8>, technologies: TechnologySet) -> Self {
        Self {
            id,
            technologies,
            ndef_message: None,
            discovered_at: Utc::now(),
        }
    }

    pub fn with_ndef_message(mut self, message: Vec<u8>) -> Self {
        self.ndef_message = Some(message);
        self
    }

    pub fn uid_hex(&self) -> String {
        bytes_to_hex(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_handle_sessions_are_unique() {
        let first = TagHandle::issue(Technology::IsoDep);
        let second = TagHandle::issue(Technology::IsoDep);
        assert_ne!(first.session(), second.session());
        assert_eq!(first.technology(), &Technology::IsoDep);
        assert!(first.to_string().starts_with("IsoDep@"));
    }

    #[test]
    fn test_tag_info_uid_hex() {
        let info = TagInfo::new(vec![0x04, 0xAB, 0xCD, 0xEF], TechnologySet::new())
            .with_ndef_message(vec![0xD0, 0x00, 0x00]);
        assert_eq!(info.uid_hex(), "04ABCDEF");
        assert!(info.ndef_message.is_some());
    }
}
