//! Directory scanning and path resolution (§4.8).

use crate::cursor::{Cursor, FileEntry};
use crate::error::Error;
use crate::geometry::Vda;
use crate::page::SerialNumber;
use crate::store::PageStore;

const MAX_ENTRY_BYTES: usize = 128;

/// Leader filenames are stored as a length byte followed by that many
/// bytes (§3); a component longer than this can never match anything and
/// is rejected before scanning.
const MAX_FILENAME_BYTES: usize = 39;

/// One decoded directory entry, as handed to a `scan_directory` callback.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub file: FileEntry,
    pub filename: String,
}

/// What a scan callback tells the scanner to do next (§4.8).
pub enum ScanControl {
    Continue,
    Stop,
    Abort(Error),
}

/// Scans `dir` (its leader, not its data, is skipped per §4.8) invoking
/// `callback` for each valid entry in order.
pub fn scan_directory(
    store: &PageStore,
    dir: FileEntry,
    mut callback: impl FnMut(&DirectoryEntry) -> ScanControl,
) -> Result<(), Error> {
    let mut cursor = Cursor::open(store, dir, false)?;

    loop {
        let mut header = [0u8; 2];
        let n = cursor.read(store, Some(&mut header), 2)?;
        if n == 0 {
            break;
        }
        if n < 2 {
            return Err(Error::FormatViolation(
                "directory entry header truncated".into(),
            ));
        }

        let word = u16::from_be_bytes(header);
        let valid = word & 0x0400 != 0;
        let length_words = (word & 0x03FF) as usize;
        if length_words == 0 {
            return Err(Error::FormatViolation(
                "directory entry has zero length".into(),
            ));
        }

        let payload_len = length_words * 2 - 2;
        let read_len = payload_len.min(MAX_ENTRY_BYTES);
        let mut buf = [0u8; MAX_ENTRY_BYTES];
        let got = cursor.read(store, Some(&mut buf[..read_len]), read_len)?;
        if got < read_len {
            return Err(Error::FormatViolation(
                "directory entry payload truncated".into(),
            ));
        }
        if payload_len > read_len {
            let skipped = payload_len - read_len;
            let skipped_read = cursor.read(store, None, skipped)?;
            if skipped_read < skipped {
                return Err(Error::FormatViolation(
                    "directory entry tail truncated".into(),
                ));
            }
        }

        if !valid {
            continue;
        }

        // `buf` holds the entry's payload, i.e. everything after the 2-byte
        // length header; spec offsets are relative to the entry as a whole,
        // so each is 2 less here: serial number at payload offset 0,
        // version at 4, leader_vda at 8, filename at 10.
        let serial_number = SerialNumber {
            word1: u16::from_be_bytes([buf[0], buf[1]]),
            word2: u16::from_be_bytes([buf[2], buf[3]]),
        };
        let version = u16::from_be_bytes([buf[4], buf[5]]);
        let leader_vda = u16::from_be_bytes([buf[8], buf[9]]) as Vda;

        let name_len = buf[10] as usize;
        if name_len == 0 || 11 + name_len > read_len {
            return Err(Error::FormatViolation(format!(
                "directory entry filename length {name_len} out of range"
            )));
        }
        let filename = String::from_utf8_lossy(&buf[11..11 + name_len]).into_owned();

        let entry = DirectoryEntry {
            file: FileEntry {
                serial_number,
                version,
                leader_vda,
            },
            filename,
        };

        match callback(&entry) {
            ScanControl::Continue => continue,
            ScanControl::Stop => break,
            ScanControl::Abort(err) => return Err(err),
        }
    }

    Ok(())
}

/// Byte-wise prefix match over the search length — the source's specified
/// (if surprising) comparison rule, preserved as-is rather than tightened
/// to equality.
fn name_matches(entry_name: &str, search: &str) -> bool {
    entry_name.as_bytes().starts_with(search.as_bytes())
}

fn find_in_directory(store: &PageStore, dir: FileEntry, name: &str) -> Result<Option<FileEntry>, Error> {
    let mut found = None;
    scan_directory(store, dir, |entry| {
        if name_matches(&entry.filename, name) {
            found = Some(entry.file);
            ScanControl::Stop
        } else {
            ScanControl::Continue
        }
    })?;
    Ok(found)
}

/// Checks whether `file` is itself a directory, by serial-number tag (§3).
fn is_directory(store: &PageStore, file: FileEntry) -> Result<bool, Error> {
    let page = store.page(file.leader_vda)?;
    Ok(page.label.serial_number.is_directory())
}

/// Resolves a path like `<Docs>Memo.txt` starting from the root at VDA 1.
///
/// `<` resets to root; a bare name runs to the next separator or the end of
/// the string; a name followed by `>` must resolve to a directory to
/// descend into, otherwise it is the final component returned to the
/// caller.
pub fn resolve_path(store: &PageStore, path: &str) -> Result<FileEntry, Error> {
    let mut current = FileEntry::root(store)?;
    let bytes = path.as_bytes();
    let mut i = 0;

    if bytes.is_empty() {
        return Ok(current);
    }

    while i < bytes.len() {
        if bytes[i] == b'<' {
            current = FileEntry::root(store)?;
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i] != b'<' && bytes[i] != b'>' {
            i += 1;
        }
        let name = std::str::from_utf8(&bytes[start..i])
            .map_err(|_| Error::FormatViolation("path component is not valid UTF-8".into()))?;

        if name.len() > MAX_FILENAME_BYTES {
            return Err(Error::NameTooLong);
        }

        let found = find_in_directory(store, current, name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        if i < bytes.len() && bytes[i] == b'>' {
            if !is_directory(store, found)? {
                return Err(Error::NotADirectory(name.to_string()));
            }
            current = found;
            i += 1;
        } else {
            return Ok(found);
        }
    }

    Ok(current)
}

/// Scans every live leader in the image (ignoring directory structure) and
/// succeeds only if exactly one file matches `name` (§4.8).
pub fn scavenge_file(store: &PageStore, name: &str) -> Result<FileEntry, Error> {
    let mut matches = Vec::new();

    for page in store.pages() {
        if page.label.is_free() || page.label.is_bad() {
            continue;
        }
        if page.label.prev_rda != 0 {
            continue; // not a leader
        }
        let info = match crate::leader::decode_leader(&page.data) {
            Ok(info) => info,
            Err(_) => continue,
        };
        if name_matches(&info.filename, name) {
            matches.push(FileEntry {
                serial_number: page.label.serial_number,
                version: page.label.version,
                leader_vda: page.vda,
            });
        }
    }

    match matches.len() {
        0 => Err(Error::ScavengeNotFound(name.to_string())),
        1 => Ok(matches[0]),
        _ => Err(Error::ScavengeAmbiguous(name.to_string())),
    }
}
