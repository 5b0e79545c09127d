//! Open-file cursor and its read/write/trim operations (§4.5).
//!
//! A cursor carries no borrow of the store: read takes `&PageStore`, write
//! and trim take `&mut PageStore`. Multiple read-only cursors can coexist
//! freely; a write or trim naturally excludes any other access to the store
//! for its duration, which is exactly the exclusivity §5 asks for.

use crate::alloc::allocate_free_page;
use crate::error::Error;
use crate::geometry::Vda;
use crate::page::{SerialNumber, PAGE_DATA_SIZE};
use crate::store::PageStore;

/// Identity handle for an open or nameable file (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub serial_number: SerialNumber,
    pub version: u16,
    pub leader_vda: Vda,
}

impl FileEntry {
    /// Builds a `FileEntry` for the file whose leader lives at `leader_vda`.
    pub fn from_leader(store: &PageStore, leader_vda: Vda) -> Result<FileEntry, Error> {
        let page = store.page(leader_vda)?;
        Ok(FileEntry {
            serial_number: page.label.serial_number,
            version: page.label.version,
            leader_vda,
        })
    }

    /// The root directory's leader lives at VDA 1 (§4.8).
    pub fn root(store: &PageStore) -> Result<FileEntry, Error> {
        FileEntry::from_leader(store, 1)
    }
}

/// `(vda, file-page-index, in-page offset)` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub vda: Vda,
    pub page_number: u16,
    pub in_page_offset: u16,
}

pub struct Cursor {
    pub file: FileEntry,
    pub position: Position,
    errored: bool,
}

impl Cursor {
    /// Opens `file` for I/O. If `include_leader` is false (the normal case)
    /// the cursor starts just past the leader, at the first data page; if
    /// true, it starts at the leader itself with `page_number = 1` and
    /// offset 0, per §4.5 (the leader's own chain-position is implicit).
    pub fn open(store: &PageStore, file: FileEntry, include_leader: bool) -> Result<Cursor, Error> {
        let limit = store.len() as u32;
        if file.leader_vda >= limit {
            return Err(Error::VdaOutOfRange {
                vda: file.leader_vda,
                limit,
            });
        }

        let position = if include_leader {
            Position {
                vda: file.leader_vda,
                page_number: 0,
                in_page_offset: 0,
            }
        } else {
            let leader = store.page(file.leader_vda)?;
            let next = leader.label.next_rda;
            let vda = if next == 0 {
                0
            } else {
                store.geometry().rda_to_vda(next)?
            };
            Position {
                vda,
                page_number: 1,
                in_page_offset: 0,
            }
        };

        Ok(Cursor {
            file,
            position,
            errored: false,
        })
    }

    fn fail<T>(&mut self, err: Error) -> Result<T, Error> {
        self.errored = true;
        Err(err)
    }

    /// Reads up to `len` bytes, copying into `dst` when present (a `None`
    /// destination just meters length). Returns the number of bytes
    /// actually transferred; a short count at end-of-chain is not an error.
    pub fn read(&mut self, store: &PageStore, mut dst: Option<&mut [u8]>, mut len: usize) -> Result<usize, Error> {
        if self.errored {
            return Err(Error::CursorInvalidated);
        }

        let mut total = 0usize;

        while len > 0 && self.position.vda != 0 {
            let page = match store.page(self.position.vda) {
                Ok(p) => p,
                Err(e) => return self.fail(e),
            };

            if page.label.file_page_number != self.position.page_number {
                return self.fail(Error::FormatViolation(format!(
                    "page {} has file_page_number {} but cursor expected {}",
                    self.position.vda, page.label.file_page_number, self.position.page_number
                )));
            }
            if self.position.in_page_offset > page.label.nbytes {
                return self.fail(Error::FormatViolation(format!(
                    "page {} cursor offset {} exceeds nbytes {}",
                    self.position.vda, self.position.in_page_offset, page.label.nbytes
                )));
            }

            if self.position.in_page_offset < page.label.nbytes {
                let available = (page.label.nbytes - self.position.in_page_offset) as usize;
                let n = len.min(available);
                let start = self.position.in_page_offset as usize;
                if let Some(buf) = dst.as_deref_mut() {
                    buf[total..total + n].copy_from_slice(&page.data[start..start + n]);
                }
                self.position.in_page_offset += n as u16;
                total += n;
                len -= n;
            } else {
                let next = page.label.next_rda;
                if next == 0 {
                    self.position.vda = 0;
                    self.position.page_number = 0;
                    break;
                }
                let next_vda = match store.geometry().rda_to_vda(next) {
                    Ok(v) => v,
                    Err(e) => return self.fail(e),
                };
                self.position.vda = next_vda;
                self.position.in_page_offset = 0;
                self.position.page_number += 1;
            }
        }

        Ok(total)
    }

    /// Writes up to `len` bytes from `src`. When the chain ends and `extend`
    /// is true, a free page is allocated and linked in; otherwise writing
    /// stops at the current end of the file, same as read.
    pub fn write(&mut self, store: &mut PageStore, src: &[u8], mut len: usize, extend: bool) -> Result<usize, Error> {
        if self.errored {
            return Err(Error::CursorInvalidated);
        }

        let mut total = 0usize;

        while len > 0 {
            if self.position.vda == 0 {
                if !extend {
                    break;
                }
                if !self.extend_chain(store) {
                    return self.fail(Error::DiskFull);
                }
                continue;
            }

            {
                let page = match store.page(self.position.vda) {
                    Ok(p) => p,
                    Err(e) => return self.fail(e),
                };
                if page.label.file_page_number != self.position.page_number {
                    return self.fail(Error::FormatViolation(format!(
                        "page {} has file_page_number {} but cursor expected {}",
                        self.position.vda, page.label.file_page_number, self.position.page_number
                    )));
                }
                if self.position.in_page_offset as usize > PAGE_DATA_SIZE {
                    return self.fail(Error::FormatViolation(format!(
                        "page {} cursor offset {} exceeds page capacity {}",
                        self.position.vda, self.position.in_page_offset, PAGE_DATA_SIZE
                    )));
                }
            }

            let offset = self.position.in_page_offset as usize;
            if offset < PAGE_DATA_SIZE {
                let page = match store.page_mut(self.position.vda) {
                    Ok(p) => p,
                    Err(e) => return self.fail(e),
                };
                let capacity = PAGE_DATA_SIZE - offset;
                let n = len.min(capacity);
                page.data[offset..offset + n].copy_from_slice(&src[total..total + n]);
                page.label.nbytes = page.label.nbytes.max((offset + n) as u16);
                self.position.in_page_offset += n as u16;
                total += n;
                len -= n;
            } else {
                let page = match store.page(self.position.vda) {
                    Ok(p) => p,
                    Err(e) => return self.fail(e),
                };
                let next = page.label.next_rda;
                if next != 0 {
                    let next_vda = match store.geometry().rda_to_vda(next) {
                        Ok(v) => v,
                        Err(e) => return self.fail(e),
                    };
                    self.position.vda = next_vda;
                    self.position.in_page_offset = 0;
                    self.position.page_number += 1;
                } else if extend {
                    if !self.extend_chain(store) {
                        return self.fail(Error::DiskFull);
                    }
                } else {
                    break;
                }
            }
        }

        Ok(total)
    }

    /// Allocates a free page and links it after the cursor's current page —
    /// or, for a file with no data pages yet, after the leader itself —
    /// then advances the cursor onto it. Returns false on disk-full.
    fn extend_chain(&mut self, store: &mut PageStore) -> bool {
        let prev_vda = if self.position.vda == 0 {
            self.file.leader_vda
        } else {
            self.position.vda
        };

        let new_vda = match allocate_free_page(store) {
            Ok(v) => v,
            Err(_) => return false,
        };

        let geometry = store.geometry();
        let prev_rda = geometry.vda_to_rda(prev_vda).unwrap();
        let prev_file_page_number = store.page(prev_vda).unwrap().label.file_page_number;
        let new_rda = geometry.vda_to_rda(new_vda).unwrap();
        let file_page_number = prev_file_page_number + 1;

        {
            let new_page = store.page_mut(new_vda).unwrap();
            new_page.label.prev_rda = prev_rda;
            new_page.label.next_rda = 0;
            new_page.label.nbytes = 0;
            new_page.label.file_page_number = file_page_number;
            new_page.label.serial_number = self.file.serial_number;
            new_page.label.version = self.file.version;
        }

        {
            let prev_page = store.page_mut(prev_vda).unwrap();
            prev_page.label.next_rda = new_rda;
        }

        self.position.vda = new_vda;
        self.position.in_page_offset = 0;
        self.position.page_number = file_page_number;
        true
    }

    /// Truncates the file at the cursor's current position (§4.5).
    pub fn trim(&mut self, store: &mut PageStore) -> Result<(), Error> {
        if self.errored {
            return Err(Error::CursorInvalidated);
        }
        if self.position.vda == 0 {
            return Ok(());
        }

        let offset = self.position.in_page_offset;
        let remaining_next = {
            let page = store.page_mut(self.position.vda)?;
            let remaining_next = page.label.next_rda;
            page.label.nbytes = offset;
            if (offset as usize) < PAGE_DATA_SIZE {
                page.label.next_rda = 0;
            }
            remaining_next
        };

        let mut rda = remaining_next;
        while rda != 0 {
            let vda = store.geometry().rda_to_vda(rda)?;
            let page = store.page_mut(vda)?;
            let next = page.label.next_rda;
            page.label.version = crate::page::VERSION_FREE;
            page.label.prev_rda = 0;
            page.label.next_rda = 0;
            page.label.nbytes = 0;
            rda = next;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::page::VERSION_FREE;
    use crate::store::PageStore;

    fn linked_store(n_data_pages: usize) -> (PageStore, FileEntry) {
        let geometry = Geometry::new(2, 1, 4).unwrap();
        let mut store = PageStore::new(geometry).unwrap();
        for vda in 0..store.len() as Vda {
            let rda = geometry.vda_to_rda(vda).unwrap();
            let page = store.page_mut(vda).unwrap();
            page.header = [0, rda];
            page.label.version = VERSION_FREE;
        }

        let sn = SerialNumber { word1: 1, word2: 1 };
        let leader_vda: Vda = 1;

        let mut prev_vda = leader_vda;
        {
            let leader = store.page_mut(leader_vda).unwrap();
            leader.label.version = 1;
            leader.label.serial_number = sn;
            leader.label.nbytes = 512;
            leader.label.file_page_number = 0;
            leader.data[12] = 4;
            leader.data[13..17].copy_from_slice(b"Test");
        }

        for i in 0..n_data_pages {
            let vda = leader_vda + 1 + i as Vda;
            let rda = geometry.vda_to_rda(vda).unwrap();
            let prev_rda = geometry.vda_to_rda(prev_vda).unwrap();
            {
                let page = store.page_mut(vda).unwrap();
                page.label.version = 1;
                page.label.serial_number = sn;
                page.label.file_page_number = (i + 1) as u16;
                page.label.prev_rda = prev_rda;
                page.label.nbytes = 512;
                for (j, b) in page.data.iter_mut().enumerate() {
                    *b = (i * 16 + j) as u8;
                }
            }
            let prev = store.page_mut(prev_vda).unwrap();
            prev.label.next_rda = rda;
            prev_vda = vda;
        }

        let file = FileEntry::from_leader(&store, leader_vda).unwrap();
        (store, file)
    }

    #[test]
    fn reads_whole_chain() {
        let (store, file) = linked_store(2);
        let mut cursor = Cursor::open(&store, file, false).unwrap();
        let mut buf = [0u8; 2048];
        let n = cursor.read(&store, Some(&mut buf), buf.len()).unwrap();
        assert_eq!(n, 1024);
        assert_eq!(cursor.position.vda, 0);
    }

    #[test]
    fn null_dst_meters_length() {
        let (store, file) = linked_store(2);
        let mut cursor = Cursor::open(&store, file, false).unwrap();
        let n = cursor.read(&store, None, usize::MAX).unwrap();
        assert_eq!(n, 1024);
    }

    #[test]
    fn zero_byte_file_reads_nothing() {
        let (store, file) = linked_store(0);
        let mut cursor = Cursor::open(&store, file, false).unwrap();
        let n = cursor.read(&store, None, usize::MAX).unwrap();
        assert_eq!(n, 0);
        assert_eq!(cursor.position.page_number, 0);
    }

    #[test]
    fn open_with_leader_reads_leader_data() {
        let (store, file) = linked_store(1);
        let mut cursor = Cursor::open(&store, file, true).unwrap();
        assert_eq!(cursor.position.page_number, 0);

        let mut buf = [0u8; 512];
        let n = cursor.read(&store, Some(&mut buf), buf.len()).unwrap();
        assert_eq!(n, 512);
        assert_eq!(buf[12], 4);
        assert_eq!(&buf[13..17], b"Test");
    }

    #[test]
    fn write_extends_and_trim_shrinks() {
        let (mut store, file) = linked_store(0);
        let mut cursor = Cursor::open(&store, file, false).unwrap();

        let payload = vec![0xABu8; 2050];
        let n = cursor.write(&mut store, &payload, payload.len(), true).unwrap();
        assert_eq!(n, 2050);

        let report = crate::integrity::check_integrity(&store);
        assert!(report.is_ok(), "{:?}", report.violations);

        let mut cursor = Cursor::open(&store, file, false).unwrap();
        let n = cursor.read(&store, None, usize::MAX).unwrap();
        assert_eq!(n, 2050);

        let mut cursor = Cursor::open(&store, file, false).unwrap();
        let mut skip = [0u8; 100];
        cursor.read(&store, Some(&mut skip), 100).unwrap();
        cursor.trim(&mut store).unwrap();

        let mut cursor = Cursor::open(&store, file, false).unwrap();
        let n = cursor.read(&store, None, usize::MAX).unwrap();
        assert_eq!(n, 100);

        let report = crate::integrity::check_integrity(&store);
        assert!(report.is_ok(), "{:?}", report.violations);
    }
}
