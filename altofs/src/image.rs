//! Serializes/deserializes the whole page array to/from a flat file (§4.2).
//!
//! Record layout, per VDA in order:
//!
//! | bytes | content                                          |
//! | ----- | ------------------------------------------------ |
//! | 2     | discarded on load; VDA low/high byte on save      |
//! | 22    | `page_vda`, `header[2]`, `label` — little-endian  |
//! | 512   | data, byte-pair swapped relative to in-memory     |

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Error;
use crate::geometry::{Geometry, Vda};
use crate::page::{Label, Page, SerialNumber, PAGE_DATA_SIZE};
use crate::store::PageStore;

/// Number of little-endian metadata words per record: `page_vda` (1),
/// `header` (2), `label` (8: next_rda, prev_rda, unused, nbytes,
/// file_page_number, version, serial_number.word1, serial_number.word2).
const META_WORDS: usize = 11;
const RECORD_SIZE: usize = 2 + META_WORDS * 2 + PAGE_DATA_SIZE;

/// Swaps each adjacent byte pair in place. On-disk byte `k` corresponds to
/// in-memory byte `k XOR 1`; applying this swap twice is the identity, so
/// the same helper serves both load and save.
fn swap_pairs(data: &mut [u8; PAGE_DATA_SIZE]) {
    let mut i = 0;
    while i < data.len() {
        data.swap(i, i + 1);
        i += 2;
    }
}

pub fn load_image(path: &Path, geometry: Geometry) -> Result<PageStore, Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut store = PageStore::new(geometry)?;

    for vda in 0..store.len() as Vda {
        let mut discard = [0u8; 2];
        reader.read_exact(&mut discard).map_err(eof_or_io)?;

        let page_vda = reader.read_u16::<LittleEndian>().map_err(eof_or_io)?;
        let _ = page_vda; // overwritten below per §4.2, regardless of file content

        let header = [
            reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
        ];

        let label = Label {
            next_rda: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            prev_rda: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            unused: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            nbytes: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            file_page_number: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            version: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            serial_number: SerialNumber {
                word1: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
                word2: reader.read_u16::<LittleEndian>().map_err(eof_or_io)?,
            },
        };

        let mut data = [0u8; PAGE_DATA_SIZE];
        reader.read_exact(&mut data).map_err(eof_or_io)?;
        swap_pairs(&mut data);

        let page = store.page_mut(vda)?;
        *page = Page {
            vda,
            header,
            label,
            data,
        };

        tracing::debug!(vda, "loaded page");
    }

    let mut trailing = [0u8; 1];
    match reader.read(&mut trailing)? {
        0 => Ok(store),
        _ => Err(Error::TrailingData),
    }
}

fn eof_or_io(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::UnexpectedEof
    } else {
        Error::Io(err)
    }
}

pub fn save_image(store: &PageStore, path: &Path) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for page in store.pages() {
        let vda_bytes = (page.vda as u16).to_le_bytes();
        writer.write_all(&vda_bytes)?;

        writer.write_u16::<LittleEndian>(page.vda as u16)?;
        writer.write_u16::<LittleEndian>(page.header[0])?;
        writer.write_u16::<LittleEndian>(page.header[1])?;
        writer.write_u16::<LittleEndian>(page.label.next_rda)?;
        writer.write_u16::<LittleEndian>(page.label.prev_rda)?;
        writer.write_u16::<LittleEndian>(page.label.unused)?;
        writer.write_u16::<LittleEndian>(page.label.nbytes)?;
        writer.write_u16::<LittleEndian>(page.label.file_page_number)?;
        writer.write_u16::<LittleEndian>(page.label.version)?;
        writer.write_u16::<LittleEndian>(page.label.serial_number.word1)?;
        writer.write_u16::<LittleEndian>(page.label.serial_number.word2)?;

        let mut data = page.data;
        swap_pairs(&mut data);
        writer.write_all(&data)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::VERSION_FREE;

    fn tiny_geometry() -> Geometry {
        Geometry::new(2, 1, 2).unwrap()
    }

    #[test]
    fn record_size_matches_layout() {
        assert_eq!(RECORD_SIZE, 2 + 22 + 512);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.dsk");

        let geometry = tiny_geometry();
        let mut store = PageStore::new(geometry).unwrap();
        for vda in 0..store.len() as Vda {
            let page = store.page_mut(vda).unwrap();
            page.header = [0, geometry.vda_to_rda(vda).unwrap()];
            page.label.version = VERSION_FREE;
        }

        save_image(&store, &path).unwrap();
        let loaded = load_image(&path, geometry).unwrap();

        for vda in 0..store.len() as Vda {
            assert_eq!(store.page(vda).unwrap().header, loaded.page(vda).unwrap().header);
            assert_eq!(store.page(vda).unwrap().data, loaded.page(vda).unwrap().data);
        }
    }

    #[test]
    fn rejects_trailing_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trailing.dsk");

        let geometry = tiny_geometry();
        let store = PageStore::new(geometry).unwrap();
        save_image(&store, &path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.push(0);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(load_image(&path, geometry), Err(Error::TrailingData)));
    }

    #[test]
    fn rejects_premature_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.dsk");

        let geometry = tiny_geometry();
        let store = PageStore::new(geometry).unwrap();
        save_image(&store, &path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 1);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(load_image(&path, geometry), Err(Error::UnexpectedEof)));
    }
}
