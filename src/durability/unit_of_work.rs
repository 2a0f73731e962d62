//! Scoped write access to mapped bytes.
//!
//! - [`WriteUnitOfWork`] - A group of durable writes, committed together
//! - [`DurableWriteGuard`] - Exclusive write access to one byte range
//!
//! This is the only way to obtain mutable access to a data file's header.
//! Creating a guard captures the pre-image; dropping it records the
//! post-image as pending. Committing hands the whole group to the gateway.
//! A unit that is dropped uncommitted, or whose group the gateway rejects,
//! restores every pre-image in reverse order.

use std::ops::{Deref, DerefMut, Range};

use crate::common::{FatalError, Result};

use super::gateway::{DurableWriteGateway, WriteRecord, WriteScope};

/// A group of writes against one mapped file that persists atomically.
///
/// # Example
/// ```ignore
/// let mut unit = WriteUnitOfWork::new(view, file_no, WriteScope::Transactional, gateway);
/// unit.writing(12..20).copy_from_slice(&cursor);
/// unit.writing(20..24).copy_from_slice(&remaining);
/// unit.commit()?; // both ranges, or neither
/// ```
pub struct WriteUnitOfWork<'a> {
    view: &'a mut [u8],
    file_no: u32,
    scope: WriteScope,
    gateway: &'a dyn DurableWriteGateway,
    records: Vec<WriteRecord>,
    committed: bool,
}

impl<'a> WriteUnitOfWork<'a> {
    /// Start a unit over a file's mapped view.
    pub(crate) fn new(
        view: &'a mut [u8],
        file_no: u32,
        scope: WriteScope,
        gateway: &'a dyn DurableWriteGateway,
    ) -> Self {
        Self {
            view,
            file_no,
            scope,
            gateway,
            records: Vec::new(),
            committed: false,
        }
    }

    /// Declare intent to change `range` and get write access to it.
    ///
    /// # Panics
    /// Panics if `range` is not inside the mapped view.
    pub fn writing(&mut self, range: Range<usize>) -> DurableWriteGuard<'_, 'a> {
        assert!(
            range.start <= range.end && range.end <= self.view.len(),
            "durable write {:?} outside mapped view of {} bytes",
            range,
            self.view.len()
        );

        let pre_image = self.view[range.clone()].to_vec();
        self.records.push(WriteRecord {
            file_no: self.file_no,
            offset: range.start,
            post_image: pre_image.clone(),
            pre_image,
        });
        let index = self.records.len() - 1;

        DurableWriteGuard {
            unit: self,
            index,
            range,
        }
    }

    /// Scope this unit commits into.
    #[inline]
    pub fn scope(&self) -> WriteScope {
        self.scope
    }

    /// Number of byte ranges declared so far.
    #[inline]
    pub fn pending(&self) -> usize {
        self.records.len()
    }

    /// Hand every declared write to the gateway as one group.
    ///
    /// # Errors
    /// Returns [`FatalError::JournalRejected`] if the gateway refuses the group.
    /// The pre-images are restored before this returns.
    pub fn commit(mut self) -> Result<()> {
        if self.records.is_empty() {
            self.committed = true;
            return Ok(());
        }

        match self.gateway.write_group(self.scope, self.records.clone()) {
            Ok(()) => {
                self.committed = true;
                Ok(())
            }
            Err(reason) => {
                tracing::error!(
                    file_no = self.file_no,
                    ranges = self.records.len(),
                    %reason,
                    "durable write group rejected, restoring pre-images"
                );
                // Drop restores.
                Err(FatalError::JournalRejected(reason).into())
            }
        }
    }

    fn restore(&mut self) {
        for record in self.records.iter().rev() {
            self.view[record.range()].copy_from_slice(&record.pre_image);
        }
    }
}

impl Drop for WriteUnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.restore();
        }
    }
}

/// Exclusive write access to one declared byte range.
///
/// Derefs to the range's bytes. The post-image is recorded when the guard
/// is dropped.
pub struct DurableWriteGuard<'u, 'a> {
    unit: &'u mut WriteUnitOfWork<'a>,
    index: usize,
    range: Range<usize>,
}

impl DurableWriteGuard<'_, '_> {
    /// Offset of the range within the file.
    #[inline]
    pub fn offset(&self) -> usize {
        self.range.start
    }
}

impl Deref for DurableWriteGuard<'_, '_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.unit.view[self.range.clone()]
    }
}

impl DerefMut for DurableWriteGuard<'_, '_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.unit.view[self.range.clone()]
    }
}

impl Drop for DurableWriteGuard<'_, '_> {
    fn drop(&mut self) {
        let post = &self.unit.view[self.range.clone()];
        self.unit.records[self.index].post_image.copy_from_slice(post);
    }
}
