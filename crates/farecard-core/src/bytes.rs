//! Byte codec utilities.
//!
//! Hex rendering, fixed-width little-endian integer reads, a linear TLV
//! search and packed-BCD decoding. Every function is bounds-checked: reads
//! past the end of a buffer return [`Error::OutOfRange`] or `None`, never
//! panic.

use crate::error::{Error, Result};

/// Types that can be rendered as uppercase hex.
///
/// Byte buffers are encoded; strings that already hold hex are normalized to
/// uppercase so repeated conversion is idempotent.
pub trait HexEncode {
    fn encode_hex(&self) -> String;
}

impl HexEncode for [u8] {
    fn encode_hex(&self) -> String {
        hex::encode_upper(self)
    }
}

impl<const N: usize> HexEncode for [u8; N] {
    fn encode_hex(&self) -> String {
        hex::encode_upper(self)
    }
}

impl HexEncode for Vec<u8> {
    fn encode_hex(&self) -> String {
        hex::encode_upper(self)
    }
}

impl HexEncode for str {
    fn encode_hex(&self) -> String {
        if is_hex_string(self) {
            self.to_ascii_uppercase()
        } else {
            hex::encode_upper(self.as_bytes())
        }
    }
}

impl HexEncode for String {
    fn encode_hex(&self) -> String {
        self.as_str().encode_hex()
    }
}

/// Render bytes as uppercase hex without separators.
///
/// # Examples
///
/// ```
/// use farecard_core::bytes::bytes_to_hex;
///
/// assert_eq!(bytes_to_hex(&[0x0Au8, 0xFF]), "0AFF");
/// assert_eq!(bytes_to_hex(&[0u8; 0]), "");
/// assert_eq!(bytes_to_hex("0aff"), "0AFF");
/// ```
pub fn bytes_to_hex<T: HexEncode + ?Sized>(input: &T) -> String {
    input.encode_hex()
}

/// Parse a hex string (whitespace tolerated) into bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidHex`] for odd lengths or non-hex characters.
pub fn hex_to_bytes(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|_| Error::InvalidHex(input.to_string()))
}

fn is_hex_string(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn take<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N]> {
    let out_of_range = || Error::OutOfRange {
        offset,
        width: N,
        len: bytes.len(),
    };
    let end = offset.checked_add(N).ok_or_else(out_of_range)?;
    let slice = bytes.get(offset..end).ok_or_else(out_of_range)?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

/// Little-endian unsigned 24-bit read (DESFire sizes and counts).
pub fn read_le_u24(bytes: &[u8], offset: usize) -> Result<u32> {
    let [b0, b1, b2] = take::<3>(bytes, offset)?;
    Ok(u32::from_le_bytes([b0, b1, b2, 0]))
}

/// Little-endian unsigned 32-bit read.
///
/// # Errors
///
/// Returns [`Error::OutOfRange`] if fewer than 4 bytes remain from `offset`.
///
/// ```
/// use farecard_core::bytes::read_le_u32;
///
/// assert_eq!(read_le_u32(&[0x10, 0x27, 0x00, 0x00], 0).unwrap(), 10_000);
/// assert!(read_le_u32(&[0x10, 0x27, 0x00], 0).is_err());
/// ```
pub fn read_le_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    take::<4>(bytes, offset).map(u32::from_le_bytes)
}

/// Little-endian signed 32-bit read.
pub fn read_le_i32(bytes: &[u8], offset: usize) -> Result<i32> {
    take::<4>(bytes, offset).map(i32::from_le_bytes)
}

/// Little-endian unsigned 64-bit read.
pub fn read_le_u64(bytes: &[u8], offset: usize) -> Result<u64> {
    take::<8>(bytes, offset).map(u64::from_le_bytes)
}

/// Little-endian signed 64-bit read, full precision.
pub fn read_le_i64(bytes: &[u8], offset: usize) -> Result<i64> {
    take::<8>(bytes, offset).map(i64::from_le_bytes)
}

/// Big-endian unsigned 16-bit read (status words, UTF-16 code units).
pub fn read_be_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    take::<2>(bytes, offset).map(u16::from_be_bytes)
}

/// Big-endian unsigned 32-bit read (NDEF long payload lengths).
pub fn read_be_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    take::<4>(bytes, offset).map(u32::from_be_bytes)
}

/// Find the value of `tag` by linear byte-exact scan.
///
/// The byte immediately after the first match is the value length. Returns
/// `None` when the tag does not occur, when no length byte follows it, or
/// when the declared length runs past the end of `data`.
///
/// This is a flat search: it does not walk the TLV structure, so a tag
/// pattern occurring inside another value also matches.
///
/// ```
/// use farecard_core::bytes::find_tlv;
///
/// let data = [0x70, 0x05, 0x9F, 0x02, 0x02, 0x12, 0x34];
/// assert_eq!(find_tlv(&data, &[0x9F, 0x02]), Some(&[0x12, 0x34][..]));
/// assert_eq!(find_tlv(&[0x9A, 0x05, 0x01], &[0x9A]), None);
/// ```
pub fn find_tlv<'a>(data: &'a [u8], tag: &[u8]) -> Option<&'a [u8]> {
    if tag.is_empty() || data.len() <= tag.len() {
        return None;
    }

    let start = data.windows(tag.len()).position(|window| window == tag)?;
    let length_index = start + tag.len();
    let length = *data.get(length_index)? as usize;
    let value_start = length_index + 1;
    data.get(value_start..value_start + length)
}

/// Whether every byte is 0x00 or 0xFF (erased or never-written storage).
///
/// An empty slice counts as blank.
pub fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0x00 || b == 0xFF)
}

/// Decode packed BCD (two decimal digits per byte) into an integer.
///
/// Returns `None` if any nibble is above 9, if the input is empty, or if the
/// value does not fit in a `u64`.
///
/// ```
/// use farecard_core::bytes::decode_bcd;
///
/// assert_eq!(decode_bcd(&[0x00, 0x00, 0x02, 0x50]), Some(250));
/// assert_eq!(decode_bcd(&[0x1A]), None);
/// ```
pub fn decode_bcd(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }

    bytes.iter().try_fold(0u64, |acc, &byte| {
        let high = u64::from(byte >> 4);
        let low = u64::from(byte & 0x0F);
        if high > 9 || low > 9 {
            return None;
        }
        acc.checked_mul(100)?.checked_add(high * 10 + low)
    })
}

/// Decode one packed BCD byte (`0x24` → 24).
pub fn bcd_byte(byte: u8) -> Option<u8> {
    let high = byte >> 4;
    let low = byte & 0x0F;
    (high <= 9 && low <= 9).then_some(high * 10 + low)
}
