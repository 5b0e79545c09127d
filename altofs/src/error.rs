use thiserror::Error;

use crate::geometry::Vda;

/// Every public operation in this crate returns a `Result` — see §7 of the
/// specification. Nothing here panics on malformed *image* data; a corrupt
/// image is a data condition, not a programmer error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid geometry: {num_cylinders} cylinders, {num_heads} heads, {num_sectors} sectors")]
    InvalidGeometry {
        num_cylinders: u16,
        num_heads: u8,
        num_sectors: u8,
    },

    #[error("virtual disk address {vda} out of range (0..{limit})")]
    VdaOutOfRange { vda: Vda, limit: u32 },

    #[error("real disk address 0x{rda:04x} has non-zero low bits")]
    RdaMisaligned { rda: u16 },

    #[error("real disk address 0x{rda:04x} is out of range for this geometry")]
    RdaOutOfRange { rda: u16 },

    #[error("path component longer than 39 bytes")]
    NameTooLong,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("scavenge found more than one match for {0:?}")]
    ScavengeAmbiguous(String),

    #[error("scavenge found no match for {0:?}")]
    ScavengeNotFound(String),

    #[error("disk full: no free page available")]
    DiskFull,

    #[error("cursor is invalidated by a previous error")]
    CursorInvalidated,

    #[error("format violation: {0}")]
    FormatViolation(String),

    #[error("trailing data after last page in image")]
    TrailingData,

    #[error("unexpected end of file while reading image")]
    UnexpectedEof,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
