//! Public facade (§4.9): composes the lower layers into the operations a
//! caller actually wants — find, extract, replace, enumerate.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::cursor::{Cursor, FileEntry};
use crate::directory::{resolve_path, scan_directory, scavenge_file as scavenge_lookup, DirectoryEntry, ScanControl};
use crate::error::Error;
use crate::geometry::Geometry;
use crate::image::{load_image, save_image};
use crate::integrity::{check_integrity, IntegrityReport};
use crate::leader::{decode_leader, FileInfo};
use crate::store::PageStore;

/// An opened disk image: the page store plus the geometry it was loaded
/// with. This is the handle most callers hold for the lifetime of a
/// session.
pub struct AltoImage {
    store: PageStore,
}

/// Page tallies for a terminal summary (§F).
#[derive(Debug, Clone, Copy, Default)]
pub struct PageCounts {
    pub total: u32,
    pub free: u32,
    pub bad: u32,
}

/// Logs `result`'s error (if any) via `tracing::error!` immediately before
/// it propagates out of the facade, then returns it unchanged.
fn traced<T>(result: Result<T, Error>) -> Result<T, Error> {
    if let Err(ref err) = result {
        tracing::error!("{err}");
    }
    result
}

impl AltoImage {
    /// Loads an image from `path` using `geometry` to translate addresses.
    pub fn open(path: &Path, geometry: Geometry) -> Result<AltoImage, Error> {
        traced(load_image(path, geometry).map(|store| AltoImage { store }))
    }

    /// Loads an image from `path` using the default geometry (§6).
    pub fn open_default(path: &Path) -> Result<AltoImage, Error> {
        Self::open(path, Geometry::DEFAULT)
    }

    /// Writes the image back out. The host file handle is scoped to this
    /// call and released on every exit path, including error (§5).
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        traced(save_image(&self.store, path))
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PageStore {
        &mut self.store
    }

    /// Runs the whole-image integrity pass (§4.4).
    pub fn check_integrity(&self) -> IntegrityReport {
        check_integrity(&self.store)
    }

    /// Resolves `path` (e.g. `<Docs>Memo.txt`) starting at the root.
    pub fn find_file(&self, path: &str) -> Result<FileEntry, Error> {
        traced(resolve_path(&self.store, path))
    }

    /// Falls back to scanning every live leader for `name`, ignoring
    /// directory structure, succeeding only on a unique match (§4.8).
    pub fn scavenge_file(&self, name: &str) -> Result<FileEntry, Error> {
        traced(scavenge_lookup(&self.store, name))
    }

    /// Looks a file entry up by the leader VDA the caller already knows.
    pub fn file_entry(&self, leader_vda: crate::geometry::Vda) -> Result<FileEntry, Error> {
        traced(FileEntry::from_leader(&self.store, leader_vda))
    }

    /// Sum of `nbytes` across the file's data pages, excluding the leader.
    pub fn file_length(&self, file: FileEntry) -> Result<u64, Error> {
        traced((|| {
            let mut cursor = Cursor::open(&self.store, file, false)?;
            let n = cursor.read(&self.store, None, usize::MAX)?;
            Ok(n as u64)
        })())
    }

    /// Decodes the leader's metadata area (§4.7).
    pub fn file_info(&self, file: FileEntry) -> Result<FileInfo, Error> {
        traced((|| {
            let page = self.store.page(file.leader_vda)?;
            decode_leader(&page.data)
        })())
    }

    /// Walks `dir`'s entries, invoking `callback` for each one (§4.8).
    pub fn scan_directory(
        &self,
        dir: FileEntry,
        callback: impl FnMut(&DirectoryEntry) -> ScanControl,
    ) -> Result<(), Error> {
        traced(scan_directory(&self.store, dir, callback))
    }

    /// Lists every live leader in the image, ignoring directory structure —
    /// a flat inventory rather than a single directory's contents.
    pub fn scan_files(&self) -> Vec<DirectoryEntry> {
        let mut entries = Vec::new();
        for page in self.store.pages() {
            if page.label.is_free() || page.label.is_bad() || page.label.prev_rda != 0 {
                continue;
            }
            let Ok(info) = decode_leader(&page.data) else {
                continue;
            };
            entries.push(DirectoryEntry {
                file: FileEntry {
                    serial_number: page.label.serial_number,
                    version: page.label.version,
                    leader_vda: page.vda,
                },
                filename: info.filename,
            });
        }
        entries
    }

    /// Counts total, free, and bad-sector pages, for a terminal summary.
    pub fn page_counts(&self) -> PageCounts {
        let mut counts = PageCounts::default();
        for page in self.store.pages() {
            counts.total += 1;
            if page.label.is_free() {
                counts.free += 1;
            } else if page.label.is_bad() {
                counts.bad += 1;
            }
        }
        counts
    }

    /// Opens `file`, reads its full contents, and writes them to a host
    /// file at `dest` (§4.9). The destination handle is scoped to this call.
    pub fn extract_file(&self, file: FileEntry, dest: &Path) -> Result<u64, Error> {
        traced((|| {
            let mut cursor = Cursor::open(&self.store, file, false)?;
            let mut out = File::create(dest)?;
            let mut buf = [0u8; crate::page::PAGE_DATA_SIZE];
            let mut total = 0u64;

            loop {
                let n = cursor.read(&self.store, Some(&mut buf), buf.len())?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n])?;
                total += n as u64;
            }

            Ok(total)
        })())
    }

    /// Opens `file` for writing, replacing its contents with `src`'s bytes,
    /// extending the chain as needed and trimming any leftover tail pages
    /// (§4.9).
    pub fn replace_file(&mut self, file: FileEntry, src: &Path) -> Result<u64, Error> {
        let result = (|| {
            let mut input = File::open(src)?;
            let mut cursor = Cursor::open(&self.store, file, false)?;
            let mut buf = [0u8; crate::page::PAGE_DATA_SIZE];
            let mut total = 0u64;

            loop {
                let n = input.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                cursor.write(&mut self.store, &buf[..n], n, true)?;
                total += n as u64;
            }

            cursor.trim(&mut self.store)?;
            Ok(total)
        })();
        traced(result)
    }
}
