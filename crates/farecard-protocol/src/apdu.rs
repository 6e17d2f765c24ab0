//! Command APDU construction and response status handling.
//!
//! Covers ISO 7816-4 short APDUs for EMV, DESFire native commands wrapped in
//! ISO framing (CLA `0x90`), and the raw MIFARE Classic commands, which are
//! not APDUs at all but travel over the same transceive channel.

use crate::error::{ProtocolError, Result};
use farecard_core::constants::{DESFIRE_STATUS_ADDITIONAL_FRAME, DESFIRE_STATUS_OK, DESFIRE_SW1};
use std::fmt;

/// Response split into data and status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data (without status word)
    pub data: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
}

impl ApduResponse {
    /// Split a raw response into data and trailing status word.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ResponseTooShort`] if fewer than two bytes
    /// were received.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let [data @ .., sw1, sw2] = raw else {
            return Err(ProtocolError::ResponseTooShort { len: raw.len() });
        };
        Ok(Self {
            data: data.to_vec(),
            sw1: *sw1,
            sw2: *sw2,
        })
    }

    /// ISO 7816 success (`90 00`).
    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// DESFire success (`91 00`), or more frames pending (`91 AF`).
    pub fn is_desfire_success(&self) -> bool {
        self.sw1 == DESFIRE_SW1
            && matches!(self.sw2, DESFIRE_STATUS_OK | DESFIRE_STATUS_ADDITIONAL_FRAME)
    }

    pub fn has_more_frames(&self) -> bool {
        self.sw1 == DESFIRE_SW1 && self.sw2 == DESFIRE_STATUS_ADDITIONAL_FRAME
    }

    /// Full status word as a 16-bit value.
    pub fn status_word(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// Consume the response, keeping the data only if the ISO status is `90 00`.
    pub fn into_iso_data(self) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(self.unexpected())
        }
    }

    /// Consume the response, keeping the data only on a DESFire success status.
    pub fn into_desfire_data(self) -> Result<Vec<u8>> {
        if self.is_desfire_success() {
            Ok(self.data)
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ProtocolError {
        ProtocolError::UnexpectedStatus {
            sw1: self.sw1,
            sw2: self.sw2,
        }
    }
}

impl fmt::Display for ApduResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Short APDU builder.
///
/// ```
/// use farecard_protocol::ApduCommand;
///
/// let bytes = ApduCommand::new(0x00, 0xB2, 0x01, 0x0C).le(0x00).build();
/// assert_eq!(bytes, vec![0x00, 0xB2, 0x01, 0x0C, 0x00]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    le: Option<u8>,
}

impl ApduCommand {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    /// Set command data. Short APDUs carry at most 255 bytes.
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Set expected response length
    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            apdu.push(le);
        }

        apdu
    }
}

/// Byte-exact command constructors per card family.
pub mod commands {
    /// MIFARE Classic native commands.
    pub mod mifare {
        use farecard_core::constants::{MIFARE_CMD_AUTH_KEY_A, MIFARE_CMD_READ};

        /// `60 <block> <key:6> <uid:4>`
        ///
        /// Uses the first four UID bytes, zero-padded for shorter UIDs.
        pub fn authenticate_key_a(block: u8, key: &[u8; 6], uid: &[u8]) -> Vec<u8> {
            let mut uid4 = [0u8; 4];
            for (slot, byte) in uid4.iter_mut().zip(uid) {
                *slot = *byte;
            }

            let mut cmd = Vec::with_capacity(12);
            cmd.push(MIFARE_CMD_AUTH_KEY_A);
            cmd.push(block);
            cmd.extend_from_slice(key);
            cmd.extend_from_slice(&uid4);
            cmd
        }

        /// `30 <block>`
        pub fn read_block(block: u8) -> Vec<u8> {
            vec![MIFARE_CMD_READ, block]
        }
    }

    /// DESFire native commands in ISO 7816 framing.
    pub mod desfire {
        use crate::apdu::ApduCommand;
        use farecard_core::constants::*;

        fn native(ins: u8) -> ApduCommand {
            ApduCommand::new(DESFIRE_CLA, ins, 0x00, 0x00).le(0x00)
        }

        fn le24(value: u32) -> [u8; 3] {
            let [b0, b1, b2, _] = value.to_le_bytes();
            [b0, b1, b2]
        }

        pub fn select_application(aid: &[u8; DESFIRE_AID_LEN]) -> Vec<u8> {
            native(DESFIRE_INS_SELECT_APPLICATION)
                .data(aid.to_vec())
                .build()
        }

        pub fn get_application_ids() -> Vec<u8> {
            native(DESFIRE_INS_GET_APPLICATION_IDS).build()
        }

        pub fn get_file_ids() -> Vec<u8> {
            native(DESFIRE_INS_GET_FILE_IDS).build()
        }

        pub fn get_file_settings(file_id: u8) -> Vec<u8> {
            native(DESFIRE_INS_GET_FILE_SETTINGS)
                .data(vec![file_id])
                .build()
        }

        pub fn get_value(file_id: u8) -> Vec<u8> {
            native(DESFIRE_INS_GET_VALUE).data(vec![file_id]).build()
        }

        /// Read `count` records starting `offset` records back from the newest.
        pub fn read_records(file_id: u8, offset: u32, count: u32) -> Vec<u8> {
            let mut data = Vec::with_capacity(7);
            data.push(file_id);
            data.extend_from_slice(&le24(offset));
            data.extend_from_slice(&le24(count));
            native(DESFIRE_INS_READ_RECORDS).data(data).build()
        }
    }

    /// EMV contactless commands.
    pub mod emv {
        use crate::apdu::ApduCommand;
        use farecard_core::constants::EMV_PPSE_NAME;

        /// SELECT by name
        pub fn select(name: &[u8]) -> Vec<u8> {
            ApduCommand::new(0x00, 0xA4, 0x04, 0x00)
                .data(name.to_vec())
                .le(0x00)
                .build()
        }

        pub fn select_ppse() -> Vec<u8> {
            select(&EMV_PPSE_NAME)
        }

        /// GET PROCESSING OPTIONS with an empty PDOL (`83 00`).
        pub fn get_processing_options() -> Vec<u8> {
            ApduCommand::new(0x80, 0xA8, 0x00, 0x00)
                .data(vec![0x83, 0x00])
                .le(0x00)
                .build()
        }

        pub fn read_record(record_number: u8, sfi: u8) -> Vec<u8> {
            let p2 = (sfi << 3) | 0x04;
            ApduCommand::new(0x00, 0xB2, record_number, p2)
                .le(0x00)
                .build()
        }

        /// GET DATA for a one or two byte tag.
        pub fn get_data(tag: &[u8]) -> Vec<u8> {
            let (p1, p2) = match tag {
                [single] => (0x00, *single),
                [first, second, ..] => (*first, *second),
                [] => (0x00, 0x00),
            };
            ApduCommand::new(0x80, 0xCA, p1, p2).le(0x00).build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::commands::{desfire, emv, mifare};
    use super::*;
    use farecard_core::constants::{EMV_AID_VISA, EMV_TAG_BALANCE, MIFARE_DEFAULT_KEY};

    #[test]
    fn test_response_from_bytes() {
        let response = ApduResponse::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert_eq!(response.data, vec![0x01, 0x02]);
        assert!(response.is_success());
        assert_eq!(response.status_word(), 0x9000);
        assert_eq!(response.to_string(), "9000");
    }

    #[test]
    fn test_response_too_short() {
        assert_eq!(
            ApduResponse::from_bytes(&[0x90]),
            Err(ProtocolError::ResponseTooShort { len: 1 })
        );
    }

    #[test]
    fn test_desfire_status() {
        let ok = ApduResponse::from_bytes(&[0xAA, 0x91, 0x00]).unwrap();
        assert!(ok.is_desfire_success());
        assert!(!ok.has_more_frames());
        assert_eq!(ok.into_desfire_data().unwrap(), vec![0xAA]);

        let more = ApduResponse::from_bytes(&[0x91, 0xAF]).unwrap();
        assert!(more.is_desfire_success());
        assert!(more.has_more_frames());

        let denied = ApduResponse::from_bytes(&[0x91, 0xAE]).unwrap();
        assert_eq!(
            denied.into_desfire_data(),
            Err(ProtocolError::UnexpectedStatus {
                sw1: 0x91,
                sw2: 0xAE
            })
        );
    }

    #[test]
    fn test_iso_status_rejects_desfire_ok() {
        let response = ApduResponse::from_bytes(&[0x91, 0x00]).unwrap();
        assert!(response.into_iso_data().is_err());
    }

    #[test]
    fn test_mifare_commands() {
        assert_eq!(
            mifare::authenticate_key_a(4, &MIFARE_DEFAULT_KEY, &[0x04, 0xA1, 0xB2, 0xC3]),
            vec![0x60, 0x04, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x04, 0xA1, 0xB2, 0xC3]
        );
        assert_eq!(
            mifare::authenticate_key_a(8, &MIFARE_DEFAULT_KEY, &[0x01, 0x02])[8..],
            [0x01, 0x02, 0x00, 0x00]
        );
        assert_eq!(mifare::read_block(5), vec![0x30, 0x05]);
    }

    #[test]
    fn test_desfire_commands() {
        assert_eq!(
            desfire::select_application(&[0x00, 0x00, 0x00]),
            vec![0x90, 0x5A, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            desfire::get_application_ids(),
            vec![0x90, 0x6A, 0x00, 0x00, 0x00]
        );
        assert_eq!(desfire::get_file_ids(), vec![0x90, 0x6F, 0x00, 0x00, 0x00]);
        assert_eq!(
            desfire::get_file_settings(0x01),
            vec![0x90, 0xF5, 0x00, 0x00, 0x01, 0x01, 0x00]
        );
        assert_eq!(
            desfire::get_value(0x02),
            vec![0x90, 0x6C, 0x00, 0x00, 0x01, 0x02, 0x00]
        );
        assert_eq!(
            desfire::read_records(0x03, 2, 1),
            vec![
                0x90, 0xBB, 0x00, 0x00, 0x07, 0x03, 0x02, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_emv_commands() {
        let ppse = emv::select_ppse();
        assert_eq!(&ppse[..5], &[0x00, 0xA4, 0x04, 0x00, 0x0E]);
        assert_eq!(&ppse[5..19], b"2PAY.SYS.DDF01");
        assert_eq!(ppse[19], 0x00);

        assert_eq!(
            emv::select(&EMV_AID_VISA),
            vec![0x00, 0xA4, 0x04, 0x00, 0x07, 0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10, 0x00]
        );
        assert_eq!(
            emv::get_processing_options(),
            vec![0x80, 0xA8, 0x00, 0x00, 0x02, 0x83, 0x00, 0x00]
        );
        assert_eq!(emv::read_record(1, 1), vec![0x00, 0xB2, 0x01, 0x0C, 0x00]);
        assert_eq!(emv::read_record(10, 5), vec![0x00, 0xB2, 0x0A, 0x2C, 0x00]);
        assert_eq!(
            emv::get_data(&EMV_TAG_BALANCE),
            vec![0x80, 0xCA, 0x9F, 0x79, 0x00]
        );
    }
}
