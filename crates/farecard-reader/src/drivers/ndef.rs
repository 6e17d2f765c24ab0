//! NDEF fallback driver.
//!
//! Needs no commands: the platform hands over the tag's NDEF message at
//! discovery. The records are reported as-is, never as transactions.

use super::ProtocolRead;
use farecard_core::CardKind;
use farecard_protocol::ndef;
use tracing::debug;

pub fn read(message: Option<&[u8]>) -> Option<ProtocolRead> {
    let Some(message) = message.filter(|message| !message.is_empty()) else {
        debug!("Tag carries no NDEF message");
        return None;
    };
    let Some(records) = ndef::parse_message(message) else {
        debug!(len = message.len(), "NDEF message malformed");
        return None;
    };

    Some(ProtocolRead {
        card_kind: CardKind::Unknown,
        ndef_records: records,
        ..ProtocolRead::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // MB|ME|SR, well-known "T", "en" + "hi"
    const TEXT_MESSAGE: [u8; 10] = [0xD1, 0x01, 0x06, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69, 0x21];

    #[test]
    fn test_text_message() {
        let read = read(Some(&TEXT_MESSAGE)).unwrap();
        assert_eq!(read.card_kind, CardKind::Unknown);
        assert!(read.transactions.is_empty());
        assert_eq!(read.ndef_records.len(), 1);
        assert_eq!(read.ndef_records[0].text.as_deref(), Some("hi!"));
        assert_eq!(read.ndef_records[0].language.as_deref(), Some("en"));
    }

    #[test]
    fn test_missing_or_malformed_message() {
        assert_eq!(read(None), None);
        assert_eq!(read(Some(&[])), None);
        assert_eq!(read(Some(&[0xD1, 0x01, 0x40, 0x54])), None);
    }
}
