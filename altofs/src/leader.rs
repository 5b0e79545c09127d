//! Decodes the leader page's `data` area at the fixed offsets of §4.7.

use crate::cursor::{FileEntry, Position};
use crate::error::Error;
use crate::page::{SerialNumber, PAGE_DATA_SIZE};

/// Alto epoch to Unix epoch offset, per §4.7/§6.
const ALTO_EPOCH_OFFSET: i64 = 2_117_503_696;

fn be_word(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn alto_timestamp(bytes: &[u8]) -> i64 {
    let hi = be_word(&bytes[0..2]) as u32;
    let lo = be_word(&bytes[2..4]) as u32;
    let raw = (hi << 16) | lo;
    raw as i32 as i64 + ALTO_EPOCH_OFFSET
}

/// Leader-page metadata: filename, timestamps, properties, hints (§3, §4.7).
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub filename: String,
    /// Unix-epoch seconds.
    pub created: i64,
    pub written: i64,
    pub read: i64,
    pub properties: Vec<u8>,
    pub prop_begin: u8,
    pub prop_length: u8,
    pub consecutive: bool,
    pub change_serial: u8,
    /// Back-pointer to the containing directory's file entry.
    pub directory_hint: FileEntry,
    pub last_page_hint: Position,
}

/// Decodes a leader page's 512-byte data area.
///
/// | offset    | field                                     |
/// | --------- | ------------------------------------------ |
/// | 0..4      | created (Alto epoch, 2 BE words)            |
/// | 4..8      | written                                     |
/// | 8..12     | read                                        |
/// | 12..52    | filename, Pascal-style length-prefixed      |
/// | 52..472   | property bytes (opaque)                     |
/// | 472..492  | spare                                       |
/// | 492       | property begin                              |
/// | 493       | property length                             |
/// | 494       | consecutive flag                            |
/// | 495       | change serial                               |
/// | 496..506  | containing-directory hint (5 BE words)      |
/// | 506..512  | last-page hint (vda, page_number, pos)      |
pub fn decode_leader(data: &[u8; PAGE_DATA_SIZE]) -> Result<FileInfo, Error> {
    let created = alto_timestamp(&data[0..4]);
    let written = alto_timestamp(&data[4..8]);
    let read = alto_timestamp(&data[8..12]);

    let name_len = data[12] as usize;
    if name_len == 0 || name_len >= 40 {
        return Err(Error::FormatViolation(format!(
            "leader filename length {name_len} out of range (0,40)"
        )));
    }
    let filename = String::from_utf8_lossy(&data[13..13 + name_len]).into_owned();

    let properties = data[52..472].to_vec();
    let prop_begin = data[492];
    let prop_length = data[493];
    let consecutive = data[494] != 0;
    let change_serial = data[495];

    let directory_hint = FileEntry {
        serial_number: SerialNumber {
            word1: be_word(&data[496..498]),
            word2: be_word(&data[498..500]),
        },
        version: be_word(&data[500..502]),
        leader_vda: be_word(&data[504..506]) as u32,
    };

    let last_page_hint = Position {
        vda: be_word(&data[506..508]) as u32,
        page_number: be_word(&data[508..510]),
        in_page_offset: be_word(&data[510..512]),
    };

    Ok(FileInfo {
        filename,
        created,
        written,
        read,
        properties,
        prop_begin,
        prop_length,
        consecutive,
        change_serial,
        directory_hint,
        last_page_hint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_leader() -> [u8; PAGE_DATA_SIZE] {
        let mut data = [0u8; PAGE_DATA_SIZE];
        // created = 0 in Alto epoch -> 2117503696 Unix seconds.
        data[0..4].copy_from_slice(&[0, 0, 0, 0]);
        data[12] = 4;
        data[13..17].copy_from_slice(b"Test");
        data[494] = 1;
        data
    }

    #[test]
    fn decodes_filename_and_timestamp() {
        let info = decode_leader(&sample_leader()).unwrap();
        assert_eq!(info.filename, "Test");
        assert_eq!(info.created, ALTO_EPOCH_OFFSET);
        assert!(info.consecutive);
    }

    #[test]
    fn rejects_zero_length_filename() {
        let mut data = sample_leader();
        data[12] = 0;
        assert!(decode_leader(&data).is_err());
    }

    #[test]
    fn rejects_overlong_filename() {
        let mut data = sample_leader();
        data[12] = 40;
        assert!(decode_leader(&data).is_err());
    }
}
