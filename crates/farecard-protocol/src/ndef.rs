//! NDEF message decoding.
//!
//! A message is a sequence of records, each starting with a header byte:
//!
//! ```text
//! bit 7  MB   message begin
//! bit 6  ME   message end
//! bit 5  CF   chunked (payload continues in following records)
//! bit 4  SR   short record (1-byte payload length instead of 4)
//! bit 3  IL   id length present
//! 0-2    TNF  type name format
//! ```
//!
//! Chunked payloads are reassembled into one record. Well-known Text (`T`)
//! records have their text and language decoded.

use farecard_core::bytes::read_be_u32;
use farecard_core::{NdefRecord, TypeNameFormat};

const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;

const RTD_TEXT: &[u8] = b"T";

struct RawRecord<'a> {
    header: u8,
    record_type: &'a [u8],
    id: &'a [u8],
    payload: &'a [u8],
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn record(&mut self) -> Option<RawRecord<'a>> {
        let header = self.byte()?;
        let type_len = usize::from(self.byte()?);
        let payload_len = if header & FLAG_SR != 0 {
            usize::from(self.byte()?)
        } else {
            let bytes = self.take(4)?;
            usize::try_from(read_be_u32(bytes, 0).ok()?).ok()?
        };
        let id_len = if header & FLAG_IL != 0 {
            usize::from(self.byte()?)
        } else {
            0
        };

        Some(RawRecord {
            header,
            record_type: self.take(type_len)?,
            id: self.take(id_len)?,
            payload: self.take(payload_len)?,
        })
    }
}

/// Decode a complete NDEF message.
///
/// Returns `None` for empty input, truncated records, a message that ends
/// without the ME flag, or a chunk sequence that is not terminated.
///
/// ```
/// use farecard_protocol::ndef::parse_message;
///
/// let message = [0xD1, 0x01, 0x05, b'T', 0x02, b'e', b'n', b'h', b'i'];
/// let records = parse_message(&message).unwrap();
/// assert_eq!(records[0].text.as_deref(), Some("hi"));
/// assert_eq!(records[0].language.as_deref(), Some("en"));
/// ```
pub fn parse_message(raw: &[u8]) -> Option<Vec<NdefRecord>> {
    let mut cursor = Cursor { data: raw, pos: 0 };
    let mut records = Vec::new();
    let mut chunked: Option<NdefRecord> = None;

    while !cursor.is_empty() {
        let raw_record = cursor.record()?;
        let last = raw_record.header & FLAG_ME != 0;
        let more_chunks = raw_record.header & FLAG_CF != 0;

        match chunked.as_mut() {
            Some(pending) => {
                pending.payload.extend_from_slice(raw_record.payload);
                if !more_chunks {
                    if let Some(done) = chunked.take() {
                        records.push(finish(done));
                    }
                }
            }
            None => {
                let record = NdefRecord {
                    tnf: TypeNameFormat::from_bits(raw_record.header),
                    record_type: raw_record.record_type.to_vec(),
                    id: raw_record.id.to_vec(),
                    payload: raw_record.payload.to_vec(),
                    text: None,
                    language: None,
                };
                if more_chunks {
                    chunked = Some(record);
                } else {
                    records.push(finish(record));
                }
            }
        }

        if last {
            return chunked.is_none().then_some(records);
        }
    }

    None
}

fn finish(mut record: NdefRecord) -> NdefRecord {
    if record.tnf == TypeNameFormat::WellKnown
        && record.record_type == RTD_TEXT
        && let Some((language, text)) = decode_text(&record.payload)
    {
        record.language = Some(language);
        record.text = Some(text);
    }
    record
}

/// Decode a Text record payload into `(language, text)`.
///
/// The status byte carries the encoding in bit 7 (set = UTF-16) and the
/// language code length in bits 0-5.
pub fn decode_text(payload: &[u8]) -> Option<(String, String)> {
    let (&status, rest) = payload.split_first()?;
    let language_len = usize::from(status & 0x3F);
    let language = rest.get(..language_len)?;
    let body = rest.get(language_len..)?;

    let language = String::from_utf8(language.to_vec()).ok()?;
    let text = if status & 0x80 != 0 {
        decode_utf16(body)?
    } else {
        String::from_utf8(body.to_vec()).ok()?
    };
    Some((language, text))
}

fn decode_utf16(body: &[u8]) -> Option<String> {
    if body.len() % 2 != 0 {
        return None;
    }
    let (little_endian, body) = match body {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, body),
    };
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}
