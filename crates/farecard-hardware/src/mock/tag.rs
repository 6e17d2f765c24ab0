//! Programmable simulated tags.
//!
//! A [`SimulatedTag`] answers raw commands the way the corresponding card
//! family does: MIFARE Classic sector authentication and block reads,
//! DESFire application and file commands in ISO framing, and EMV
//! application selection and record reads.

use crate::error::{HardwareError, Result};
use farecard_core::constants::*;
use farecard_core::{Technology, TechnologySet};
use std::collections::BTreeMap;

const SW_OK: [u8; 2] = [0x90, 0x00];
const SW_FILE_NOT_FOUND: [u8; 2] = [0x6A, 0x82];
const SW_RECORD_NOT_FOUND: [u8; 2] = [0x6A, 0x83];
const SW_DATA_NOT_FOUND: [u8; 2] = [0x6A, 0x88];
const SW_CONDITIONS_NOT_SATISFIED: [u8; 2] = [0x69, 0x85];
const SW_CLA_NOT_SUPPORTED: [u8; 2] = [0x6E, 0x00];
const SW_INS_NOT_SUPPORTED: [u8; 2] = [0x6D, 0x00];

const DESFIRE_OK: [u8; 2] = [DESFIRE_SW1, DESFIRE_STATUS_OK];
const DESFIRE_APPLICATION_NOT_FOUND: [u8; 2] = [DESFIRE_SW1, 0xA0];
const DESFIRE_FILE_NOT_FOUND: [u8; 2] = [DESFIRE_SW1, 0xF0];
const DESFIRE_BOUNDARY_ERROR: [u8; 2] = [DESFIRE_SW1, 0xBE];
const DESFIRE_ILLEGAL_COMMAND: [u8; 2] = [DESFIRE_SW1, 0x1C];

fn reply(data: &[u8], status: [u8; 2]) -> Vec<u8> {
    let mut response = Vec::with_capacity(data.len() + 2);
    response.extend_from_slice(data);
    response.extend_from_slice(&status);
    response
}

fn le24(value: u32) -> [u8; 3] {
    let [b0, b1, b2, _] = value.to_le_bytes();
    [b0, b1, b2]
}

// ============================================================================
// MIFARE Classic
// ============================================================================

/// One MIFARE Classic sector: key A plus its data blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MifareSector {
    pub key_a: [u8; 6],
    /// Data blocks addressed by absolute block number.
    pub blocks: BTreeMap<u8, [u8; MIFARE_BLOCK_SIZE]>,
}

impl MifareSector {
    pub fn new(key_a: [u8; 6]) -> Self {
        Self {
            key_a,
            blocks: BTreeMap::new(),
        }
    }

    pub fn with_block(mut self, block: u8, data: [u8; MIFARE_BLOCK_SIZE]) -> Self {
        self.blocks.insert(block, data);
        self
    }
}

/// MIFARE Classic memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MifareMemory {
    sectors: BTreeMap<u8, MifareSector>,
    authenticated: Option<u8>,
}

impl MifareMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sector(mut self, sector: u8, contents: MifareSector) -> Self {
        self.sectors.insert(sector, contents);
        self
    }

    fn handle(&mut self, uid: &[u8], command: &[u8]) -> Result<Vec<u8>> {
        match command {
            [MIFARE_CMD_AUTH_KEY_A, block, rest @ ..] if rest.len() >= 6 => {
                let sector = block / MIFARE_BLOCKS_PER_SECTOR;
                let key = &rest[..6];
                let uid_matches = rest.len() < 10 || uid.starts_with(&rest[6..10]);
                match self.sectors.get(&sector) {
                    Some(contents) if contents.key_a.as_slice() == key && uid_matches => {
                        self.authenticated = Some(sector);
                        Ok(Vec::new())
                    }
                    _ => {
                        self.authenticated = None;
                        Err(HardwareError::command_rejected(format!(
                            "authentication failed for sector {sector}"
                        )))
                    }
                }
            }
            [MIFARE_CMD_READ, block] => {
                let sector = block / MIFARE_BLOCKS_PER_SECTOR;
                if self.authenticated != Some(sector) {
                    return Err(HardwareError::command_rejected(format!(
                        "block {block} read without authentication"
                    )));
                }
                let data = self
                    .sectors
                    .get(&sector)
                    .and_then(|contents| contents.blocks.get(block))
                    .copied()
                    .unwrap_or([0u8; MIFARE_BLOCK_SIZE]);
                Ok(data.to_vec())
            }
            _ => Err(HardwareError::communication("malformed MIFARE command")),
        }
    }
}

// ============================================================================
// DESFire
// ============================================================================

/// Contents of a DESFire file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesfireFile {
    Value(i32),
    /// Cyclic record file. `records[0]` is the newest record.
    CyclicRecord {
        record_size: u32,
        max_records: u32,
        records: Vec<Vec<u8>>,
    },
    StandardData(Vec<u8>),
}

impl DesfireFile {
    fn settings(&self) -> Vec<u8> {
        let mut settings = Vec::with_capacity(17);
        match self {
            Self::Value(value) => {
                settings.extend_from_slice(&[DESFIRE_FILE_TYPE_VALUE, 0x00, 0x00, 0xE0]);
                settings.extend_from_slice(&i32::MIN.to_le_bytes());
                settings.extend_from_slice(&i32::MAX.to_le_bytes());
                settings.extend_from_slice(&value.to_le_bytes());
                settings.push(0x00);
            }
            Self::CyclicRecord {
                record_size,
                max_records,
                records,
            } => {
                settings.extend_from_slice(&[DESFIRE_FILE_TYPE_CYCLIC_RECORD, 0x00, 0x00, 0xE0]);
                settings.extend_from_slice(&le24(*record_size));
                settings.extend_from_slice(&le24(*max_records));
                settings.extend_from_slice(&le24(records.len() as u32));
            }
            Self::StandardData(data) => {
                settings.extend_from_slice(&[0x00, 0x00, 0x00, 0xE0]);
                settings.extend_from_slice(&le24(data.len() as u32));
            }
        }
        settings
    }
}

/// One DESFire application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesfireApplication {
    pub aid: [u8; DESFIRE_AID_LEN],
    pub files: BTreeMap<u8, DesfireFile>,
}

impl DesfireApplication {
    pub fn new(aid: [u8; DESFIRE_AID_LEN]) -> Self {
        Self {
            aid,
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, file_id: u8, file: DesfireFile) -> Self {
        self.files.insert(file_id, file);
        self
    }
}

/// DESFire card with its application directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesfireCard {
    applications: Vec<DesfireApplication>,
    selected: Option<[u8; DESFIRE_AID_LEN]>,
}

impl DesfireCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application(mut self, application: DesfireApplication) -> Self {
        self.applications.push(application);
        self
    }

    fn selected_application(&self) -> Option<&DesfireApplication> {
        let aid = self.selected?;
        self.applications.iter().find(|app| app.aid == aid)
    }

    fn handle(&mut self, ins: u8, data: &[u8]) -> Vec<u8> {
        match ins {
            DESFIRE_INS_SELECT_APPLICATION => {
                let Ok(aid) = <[u8; DESFIRE_AID_LEN]>::try_from(data) else {
                    return reply(&[], DESFIRE_ILLEGAL_COMMAND);
                };
                if aid == DESFIRE_MASTER_AID || self.applications.iter().any(|a| a.aid == aid) {
                    self.selected = Some(aid);
                    reply(&[], DESFIRE_OK)
                } else {
                    reply(&[], DESFIRE_APPLICATION_NOT_FOUND)
                }
            }
            DESFIRE_INS_GET_APPLICATION_IDS => {
                if self.selected != Some(DESFIRE_MASTER_AID) {
                    return reply(&[], DESFIRE_ILLEGAL_COMMAND);
                }
                let ids: Vec<u8> = self.applications.iter().flat_map(|app| app.aid).collect();
                reply(&ids, DESFIRE_OK)
            }
            DESFIRE_INS_GET_FILE_IDS => match self.selected_application() {
                Some(app) => {
                    let ids: Vec<u8> = app.files.keys().copied().collect();
                    reply(&ids, DESFIRE_OK)
                }
                None => reply(&[], DESFIRE_ILLEGAL_COMMAND),
            },
            DESFIRE_INS_GET_FILE_SETTINGS => match self.file(data.first()) {
                Some(file) => reply(&file.settings(), DESFIRE_OK),
                None => reply(&[], DESFIRE_FILE_NOT_FOUND),
            },
            DESFIRE_INS_GET_VALUE => match self.file(data.first()) {
                Some(DesfireFile::Value(value)) => reply(&value.to_le_bytes(), DESFIRE_OK),
                Some(_) => reply(&[], DESFIRE_ILLEGAL_COMMAND),
                None => reply(&[], DESFIRE_FILE_NOT_FOUND),
            },
            DESFIRE_INS_READ_RECORDS => self.read_records(data),
            _ => reply(&[], DESFIRE_ILLEGAL_COMMAND),
        }
    }

    fn file(&self, file_id: Option<&u8>) -> Option<&DesfireFile> {
        self.selected_application()?.files.get(file_id?)
    }

    fn read_records(&self, data: &[u8]) -> Vec<u8> {
        let [file_id, o0, o1, o2, c0, c1, c2] = *data else {
            return reply(&[], DESFIRE_ILLEGAL_COMMAND);
        };
        let offset = u32::from_le_bytes([o0, o1, o2, 0]) as usize;
        let count = u32::from_le_bytes([c0, c1, c2, 0]) as usize;

        match self.file(Some(&file_id)) {
            Some(DesfireFile::CyclicRecord { records, .. }) => {
                let end = if count == 0 { records.len() } else { offset + count };
                match records.get(offset..end) {
                    Some(slice) if !slice.is_empty() => reply(&slice.concat(), DESFIRE_OK),
                    _ => reply(&[], DESFIRE_BOUNDARY_ERROR),
                }
            }
            Some(_) => reply(&[], DESFIRE_ILLEGAL_COMMAND),
            None => reply(&[], DESFIRE_FILE_NOT_FOUND),
        }
    }
}

// ============================================================================
// EMV
// ============================================================================

/// EMV payment application with its log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmvCard {
    pub aids: Vec<Vec<u8>>,
    /// Records keyed by `(sfi, record_number)`.
    pub records: BTreeMap<(u8, u8), Vec<u8>>,
    /// Raw GET DATA `9F79` response body.
    pub balance: Option<Vec<u8>>,
    pub supports_ppse: bool,
    selected: bool,
}

impl EmvCard {
    pub fn new(aid: &[u8]) -> Self {
        Self {
            aids: vec![aid.to_vec()],
            records: BTreeMap::new(),
            balance: None,
            supports_ppse: true,
            selected: false,
        }
    }

    pub fn with_record(mut self, sfi: u8, record: u8, data: Vec<u8>) -> Self {
        self.records.insert((sfi, record), data);
        self
    }

    pub fn with_balance(mut self, body: Vec<u8>) -> Self {
        self.balance = Some(body);
        self
    }

    pub fn without_ppse(mut self) -> Self {
        self.supports_ppse = false;
        self
    }

    fn handle(&mut self, command: &[u8]) -> Vec<u8> {
        match command {
            [0x00, 0xA4, 0x04, 0x00, len, rest @ ..] => {
                let name = rest.get(..usize::from(*len)).unwrap_or_default();
                if name == EMV_PPSE_NAME.as_slice() {
                    if self.supports_ppse {
                        reply(&[0x6F, 0x00], SW_OK)
                    } else {
                        reply(&[], SW_FILE_NOT_FOUND)
                    }
                } else if self.aids.iter().any(|aid| aid.as_slice() == name) {
                    self.selected = true;
                    reply(&[0x6F, 0x00], SW_OK)
                } else {
                    reply(&[], SW_FILE_NOT_FOUND)
                }
            }
            [0x80, 0xA8, ..] if self.selected => {
                reply(&[0x77, 0x06, 0x82, 0x02, 0x00, 0x00, 0x94, 0x00], SW_OK)
            }
            [0x80, 0xA8, ..] => reply(&[], SW_CONDITIONS_NOT_SATISFIED),
            [0x00, 0xB2, record, p2, ..] => {
                let sfi = p2 >> 3;
                match self.records.get(&(sfi, *record)) {
                    Some(data) => reply(data, SW_OK),
                    None => reply(&[], SW_RECORD_NOT_FOUND),
                }
            }
            [0x80, 0xCA, 0x9F, 0x79, ..] => match &self.balance {
                Some(body) => reply(body, SW_OK),
                None => reply(&[], SW_DATA_NOT_FOUND),
            },
            [0x00 | 0x80, ..] => reply(&[], SW_INS_NOT_SUPPORTED),
            _ => reply(&[], SW_CLA_NOT_SUPPORTED),
        }
    }
}

// ============================================================================
// Tag
// ============================================================================

/// A simulated tag presented to a [`MockNfc`](super::MockNfc).
///
/// # Examples
///
/// ```
/// use farecard_core::Technology;
/// use farecard_hardware::mock::{MifareMemory, MifareSector, SimulatedTag};
///
/// let tag = SimulatedTag::new(vec![0x04, 0xA1, 0xB2, 0xC3])
///     .with_technology(Technology::MifareClassic)
///     .with_mifare(MifareMemory::new().with_sector(1, MifareSector::new([0xFF; 6])));
/// assert!(tag.technologies().has_mifare_family());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedTag {
    uid: Vec<u8>,
    technologies: TechnologySet,
    ndef_message: Option<Vec<u8>>,
    mifare: Option<MifareMemory>,
    desfire: Option<DesfireCard>,
    emv: Option<EmvCard>,
}

impl SimulatedTag {
    pub fn new(uid: Vec<u8>) -> Self {
        Self {
            uid,
            technologies: TechnologySet::new(),
            ndef_message: None,
            mifare: None,
            desfire: None,
            emv: None,
        }
    }

    pub fn with_technology(mut self, technology: Technology) -> Self {
        self.technologies.insert(technology);
        self
    }

    pub fn with_ndef_message(mut self, message: Vec<u8>) -> Self {
        self.ndef_message = Some(message);
        self
    }

    pub fn with_mifare(mut self, memory: MifareMemory) -> Self {
        self.mifare = Some(memory);
        self
    }

    pub fn with_desfire(mut self, card: DesfireCard) -> Self {
        self.desfire = Some(card);
        self
    }

    pub fn with_emv(mut self, card: EmvCard) -> Self {
        self.emv = Some(card);
        self
    }

    pub fn uid(&self) -> &[u8] {
        &self.uid
    }

    pub fn technologies(&self) -> &TechnologySet {
        &self.technologies
    }

    pub fn ndef_message(&self) -> Option<&[u8]> {
        self.ndef_message.as_deref()
    }

    /// Answer one command sent over a claimed technology.
    pub(crate) fn respond(&mut self, technology: &Technology, command: &[u8]) -> Result<Vec<u8>> {
        if technology.is_mifare_family() {
            let uid = self.uid.clone();
            return match self.mifare.as_mut() {
                Some(memory) => memory.handle(&uid, command),
                None => Err(HardwareError::communication("no MIFARE memory")),
            };
        }

        if *technology != Technology::IsoDep {
            return Err(HardwareError::unsupported(format!(
                "transceive over {technology}"
            )));
        }

        match (command, self.desfire.as_mut(), self.emv.as_mut()) {
            ([], _, _) => Err(HardwareError::communication("empty command")),
            ([DESFIRE_CLA, ins, _, _, rest @ ..], Some(desfire), _) => {
                let data = match rest {
                    [len, body @ ..] => body.get(..usize::from(*len)).unwrap_or_default(),
                    [] => &[],
                };
                Ok(desfire.handle(*ins, data))
            }
            ([DESFIRE_CLA, ..], None, _) => Ok(reply(&[], SW_CLA_NOT_SUPPORTED)),
            (_, _, Some(emv)) => Ok(emv.handle(command)),
            (_, _, None) => Ok(reply(&[], SW_FILE_NOT_FOUND)),
        }
    }
}
