use crate::error::Error;
use crate::geometry::{Geometry, Vda};
use crate::page::Page;

/// An in-memory dense array of pages indexed by VDA, plus the geometry that
/// maps addresses onto it (§4.3). The store owns all page memory for the
/// image's lifetime; it is not internally synchronized, so callers
/// serialize access externally (§5).
pub struct PageStore {
    geometry: Geometry,
    pages: Vec<Page>,
}

impl PageStore {
    /// Allocates `L` zero-initialized pages for `geometry`.
    pub fn new(geometry: Geometry) -> Result<PageStore, Error> {
        let len = geometry.num_pages() as usize;
        let pages = (0..len as Vda).map(Page::empty).collect();
        Ok(PageStore { geometry, pages })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, vda: Vda) -> Result<&Page, Error> {
        self.pages.get(vda as usize).ok_or(Error::VdaOutOfRange {
            vda,
            limit: self.len() as u32,
        })
    }

    pub fn page_mut(&mut self, vda: Vda) -> Result<&mut Page, Error> {
        let limit = self.len() as u32;
        self.pages
            .get_mut(vda as usize)
            .ok_or(Error::VdaOutOfRange { vda, limit })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }
}
