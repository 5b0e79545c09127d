//! Whole-image validator (§4.4). Walks every VDA once, accumulating
//! violations but continuing past each one, so a single pass produces a
//! complete report rather than stopping at the first problem.

use thiserror::Error;

use crate::geometry::Vda;
use crate::store::PageStore;

#[derive(Debug, Clone, Error)]
pub enum Violation {
    #[error("page {vda}: header {found:?} does not match expected {expected:?}")]
    HeaderMismatch {
        vda: Vda,
        expected: [u16; 2],
        found: [u16; 2],
    },

    #[error("page {vda}: bad-sector marker has a mismatched serial number")]
    BadSectorSerialMismatch { vda: Vda },

    #[error("page {vda}: version field is 0 (invalid)")]
    InvalidVersion { vda: Vda },

    #[error("page {vda}: nbytes {nbytes} exceeds page size")]
    NBytesExceedsPageSize { vda: Vda, nbytes: u16 },

    #[error("page {vda}: predecessor {prev_vda} has a mismatched serial number")]
    PrevSerialMismatch { vda: Vda, prev_vda: Vda },

    #[error("page {vda}: file_page_number {actual} does not follow predecessor's {expected}")]
    PrevPageNumberMismatch { vda: Vda, expected: u16, actual: u16 },

    #[error("page {vda}: predecessor {prev_vda}'s next_rda does not point back to this page")]
    PrevBackLinkMismatch { vda: Vda, prev_vda: Vda },

    #[error("page {vda}: predecessor link is malformed: {reason}")]
    PrevLinkInvalid { vda: Vda, reason: String },

    #[error("page {vda}: leader page is not full (nbytes={nbytes})")]
    LeaderNotFull { vda: Vda, nbytes: u16 },

    #[error("page {vda}: leader page has nonzero file_page_number {file_page_number}")]
    LeaderPageNumberNonzero { vda: Vda, file_page_number: u16 },

    #[error("page {vda}: leader filename length {length} is out of range (0,40)")]
    LeaderFilenameLengthInvalid { vda: Vda, length: u8 },

    #[error("page {vda}: next_rda is set but page is not full (nbytes={nbytes})")]
    NextRequiresFullPage { vda: Vda, nbytes: u16 },

    #[error("page {vda}: successor {next_vda} has a mismatched serial number")]
    NextSerialMismatch { vda: Vda, next_vda: Vda },

    #[error("page {vda}: successor {next_vda}'s file_page_number {actual} does not follow {expected}")]
    NextPageNumberMismatch {
        vda: Vda,
        next_vda: Vda,
        expected: u16,
        actual: u16,
    },

    #[error("page {vda}: successor {next_vda}'s prev_rda does not point back to this page")]
    NextBackLinkMismatch { vda: Vda, next_vda: Vda },

    #[error("page {vda}: successor link is malformed: {reason}")]
    NextLinkInvalid { vda: Vda, reason: String },
}

#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Runs the full pass described in §4.4, steps 1–7.
pub fn check_integrity(store: &PageStore) -> IntegrityReport {
    let geometry = store.geometry();
    let mut report = IntegrityReport::default();

    for page in store.pages() {
        let vda = page.vda;

        // Step 1: header must equal (0, RDA(vda)).
        let expected_rda = match geometry.vda_to_rda(vda) {
            Ok(rda) => rda,
            Err(_) => continue, // can't happen: vda came from the store itself
        };
        let expected = [0u16, expected_rda];
        if page.header != expected {
            report.violations.push(Violation::HeaderMismatch {
                vda,
                expected,
                found: page.header,
            });
        }

        // Step 2: free/bad pages are skipped past the header check.
        if page.label.is_free() {
            continue;
        }
        if page.label.is_bad() {
            if page.label.serial_number != crate::page::SerialNumber::BAD {
                report.violations.push(Violation::BadSectorSerialMismatch { vda });
            }
            continue;
        }

        // Step 3: version 0 is invalid.
        if page.label.version == 0 {
            report.violations.push(Violation::InvalidVersion { vda });
        }

        // Step 4: nbytes bound.
        if page.label.nbytes as usize > crate::page::PAGE_DATA_SIZE {
            report.violations.push(Violation::NBytesExceedsPageSize {
                vda,
                nbytes: page.label.nbytes,
            });
        }

        // Step 5: predecessor cross-check.
        if page.label.prev_rda != 0 {
            match geometry.rda_to_vda(page.label.prev_rda) {
                Ok(prev_vda) => match store.page(prev_vda) {
                    Ok(prev) => {
                        if prev.label.serial_number != page.label.serial_number {
                            report.violations.push(Violation::PrevSerialMismatch { vda, prev_vda });
                        }
                        if prev.label.file_page_number + 1 != page.label.file_page_number {
                            report.violations.push(Violation::PrevPageNumberMismatch {
                                vda,
                                expected: prev.label.file_page_number + 1,
                                actual: page.label.file_page_number,
                            });
                        }
                        // VDA 0 is tolerated as a special case of the terminator sentinel.
                        if vda != 0 {
                            let back = geometry.vda_to_rda(vda).unwrap_or(0);
                            if prev.label.next_rda != back {
                                report.violations.push(Violation::PrevBackLinkMismatch { vda, prev_vda });
                            }
                        }
                    }
                    Err(e) => report.violations.push(Violation::PrevLinkInvalid {
                        vda,
                        reason: e.to_string(),
                    }),
                },
                Err(e) => report.violations.push(Violation::PrevLinkInvalid {
                    vda,
                    reason: e.to_string(),
                }),
            }
        } else {
            // Step 6: leader shape.
            if page.label.nbytes as usize != crate::page::PAGE_DATA_SIZE {
                report.violations.push(Violation::LeaderNotFull {
                    vda,
                    nbytes: page.label.nbytes,
                });
            }
            if page.label.file_page_number != 0 {
                report.violations.push(Violation::LeaderPageNumberNonzero {
                    vda,
                    file_page_number: page.label.file_page_number,
                });
            }
            let name_len = page.data[12];
            if name_len == 0 || name_len >= 40 {
                report.violations.push(Violation::LeaderFilenameLengthInvalid {
                    vda,
                    length: name_len,
                });
            }
        }

        // Step 7: successor cross-check.
        if page.label.next_rda != 0 {
            if page.label.nbytes as usize != crate::page::PAGE_DATA_SIZE {
                report.violations.push(Violation::NextRequiresFullPage {
                    vda,
                    nbytes: page.label.nbytes,
                });
            }
            match geometry.rda_to_vda(page.label.next_rda) {
                Ok(next_vda) => match store.page(next_vda) {
                    Ok(next) => {
                        if next.label.serial_number != page.label.serial_number {
                            report.violations.push(Violation::NextSerialMismatch { vda, next_vda });
                        }
                        if next.label.file_page_number != page.label.file_page_number + 1 {
                            report.violations.push(Violation::NextPageNumberMismatch {
                                vda,
                                next_vda,
                                expected: page.label.file_page_number + 1,
                                actual: next.label.file_page_number,
                            });
                        }
                        if vda != 0 {
                            let back = geometry.vda_to_rda(vda).unwrap_or(0);
                            if next.label.prev_rda != back {
                                report.violations.push(Violation::NextBackLinkMismatch { vda, next_vda });
                            }
                        }
                    }
                    Err(e) => report.violations.push(Violation::NextLinkInvalid {
                        vda,
                        reason: e.to_string(),
                    }),
                },
                Err(e) => report.violations.push(Violation::NextLinkInvalid {
                    vda,
                    reason: e.to_string(),
                }),
            }
        }
    }

    for violation in &report.violations {
        tracing::warn!("{violation}");
    }

    report
}
