//! The contract between data files and the durability subsystem.

use std::path::Path;

/// Which scope a group of writes belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteScope {
    /// Part of the caller's current transaction: undone if it rolls back.
    Transactional,
    /// Committed on its own. Survives a rollback of the caller's transaction.
    Independent,
}

/// One changed byte range of a mapped data file.
///
/// `pre_image` holds the bytes before the change and `post_image` the bytes
/// after it; both have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub file_no: u32,
    pub offset: usize,
    pub pre_image: Vec<u8>,
    pub post_image: Vec<u8>,
}

impl WriteRecord {
    #[inline]
    pub fn len(&self) -> usize {
        self.post_image.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.post_image.is_empty()
    }

    /// Byte range covered in the file.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// Write-ahead durability for mutations of mapped bytes.
///
/// Implementations guarantee that every group passed to
/// [`write_group`](DurableWriteGateway::write_group) either becomes visible in
/// full after a crash-recovery replay or not at all. Pre-images are provided so
/// an aborting transaction can be undone.
///
/// Returning an error rejects the group; the caller restores the pre-images.
pub trait DurableWriteGateway {
    /// Record that a brand-new file of `length` bytes exists at `path`.
    ///
    /// This is out of band: it is never part of the caller's transaction.
    fn created_file(&self, path: &Path, length: u64) -> Result<(), String>;

    /// Accept a group of writes that must persist atomically.
    fn write_group(&self, scope: WriteScope, records: Vec<WriteRecord>) -> Result<(), String>;
}
