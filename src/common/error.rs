//! Error types for extentstore.

use std::path::PathBuf;

use thiserror::Error as ThisError;

use super::DiskLoc;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in extentstore.
///
/// Ordinary variants describe conditions a caller can report or work around.
/// [`Error::Fatal`] is different: the file (or the caller's contract with it)
/// can no longer be trusted, and the caller must abort or stop using that file.
/// Nothing in this crate retries.
#[derive(Debug, ThisError)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data file does not exist.
    #[error("data file does not exist: {}", .0.display())]
    InvalidPath(PathBuf),

    /// The mapped-file primitive could not map an existing file.
    #[error("internal error: {0}")]
    Internal(String),

    /// Unrecoverable condition; see [`FatalError`].
    #[error("fatal: {0}")]
    Fatal(#[from] FatalError),
}

impl Error {
    /// Whether the caller must treat this error as unrecoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }

    /// The fatal condition, if this is one.
    pub fn as_fatal(&self) -> Option<&FatalError> {
        match self {
            Error::Fatal(fatal) => Some(fatal),
            _ => None,
        }
    }
}

/// Conditions after which a data file must not be used any further.
///
/// These cover corrupt on-disk state, failed mappings and caller contract
/// violations. Codes match the assertion numbers operators know from logs.
#[derive(Debug, ThisError)]
pub enum FatalError {
    /// The mapped-file primitive produced no view.
    #[error("can't map file memory{}", map_hint(.needs_64_bit))]
    MapFailed { path: PathBuf, needs_64_bit: bool },

    /// An existing file has a length no valid data file can have.
    #[error("data file {} is corrupt: {reason}", .path.display())]
    CorruptFile { path: PathBuf, reason: String },

    /// The header claims an implausible file length.
    #[error("data file header looks corrupt at file open filelength:{file_length} fileno:{file_no}")]
    CorruptHeader { file_no: u32, file_length: u32 },

    /// Only one free-list pointer holds the legacy zero pair.
    #[error("free list pointers disagree: start {start}, end {end}")]
    FreeListMismatch { start: DiskLoc, end: DiskLoc },

    #[error("shutdown in progress")]
    ShutdownInProgress,

    /// Allocation was attempted on a file whose mapping never succeeded.
    #[error("no header on new extent: mmap space exceeded?")]
    NoHeader,

    /// The caller asked for more than the file has left.
    #[error("extent of {requested} bytes exceeds {available} unused bytes")]
    ExtentTooLarge { requested: u32, available: u32 },

    /// Access outside the bytes backed by the file.
    #[error("bad offset {loc} (length {len}) accessing file {}", .path.display())]
    BadOffset { loc: DiskLoc, len: usize, path: PathBuf },

    /// open or open_existing on a file that is already mapped.
    #[error("data file {file_no} is already mapped")]
    AlreadyMapped { file_no: u32 },

    /// A computed file size broke the sizing guarantees.
    #[error("invalid data file size {size}: {reason}")]
    InvalidSize { size: u64, reason: &'static str },

    /// The durability subsystem refused a write group. Pre-images were restored.
    #[error("durable write rejected: {0}")]
    JournalRejected(String),
}

fn map_hint(needs_64_bit: &bool) -> &'static str {
    if *needs_64_bit {
        " - requires 64 bit build for larger datasets"
    } else {
        ""
    }
}

impl FatalError {
    /// Numeric assertion code.
    pub fn code(&self) -> u32 {
        match self {
            FatalError::MapFailed { needs_64_bit: true, .. } => 10084,
            FatalError::MapFailed { needs_64_bit: false, .. } => 10085,
            FatalError::ShutdownInProgress => 10357,
            FatalError::NoHeader => 10359,
            FatalError::BadOffset { .. } => 13440,
            FatalError::CorruptHeader { .. } => 13640,
            FatalError::CorruptFile { .. }
            | FatalError::FreeListMismatch { .. }
            | FatalError::ExtentTooLarge { .. }
            | FatalError::AlreadyMapped { .. }
            | FatalError::InvalidSize { .. }
            | FatalError::JournalRejected(_) => 0,
        }
    }
}
