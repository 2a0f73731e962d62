//! Data File - one memory-mapped file of a database.
//!
//! The [`DataFile`] handles:
//! - Sizing, creating and opening the mapped file
//! - Header initialization and legacy upgrade on first open
//! - Carving extents from the unused tail of the file

use std::path::Path;

use crate::common::config::{
    StorageOptions, HEADER_SIZE, MAX_MAPPED_LENGTH, MIN_FILE_SIZE, PAGE_SIZE,
    SMALL_FILES_FLOOR, SMALL_FILES_GRANULARITY,
};
use crate::common::{DiskLoc, Error, FatalError, Result};
use crate::context::OperationContext;
use crate::durability::{JournalGroup, WriteRecord};

use super::header::{DataFileHeader, HeaderMut, InitOutcome};
use super::mapped_file::{MappedFile, MmapFile};
use super::size_policy::SizePolicy;

/// One numbered data file and its mapping.
///
/// # File Layout
/// ```text
/// ┌──────────────┬──────────┬──────────┬─────┬──────────────────┬───────┐
/// │ Header (8KB) │ Extent 0 │ Extent 1 │ ... │ unused           │ slack │
/// └──────────────┴──────────┴──────────┴─────┴──────────────────┴───────┘
/// 0            8192                        header.unused       len-16   len
/// ```
///
/// Extents are handed out front to back and never reclaimed here; reuse
/// through the free list is up to higher layers.
///
/// # Thread Safety
/// `DataFile` does no locking of its own. Callers must hold the database
/// write lock across [`open`](Self::open) and
/// [`alloc_extent_area`](Self::alloc_extent_area).
///
/// # Durability
/// The header is only changed through the durability gateway in the
/// [`OperationContext`]. Allocation writes the cursor and the remaining
/// length as one group, so after recovery they are either both advanced or
/// neither is.
#[derive(Debug)]
pub struct DataFile<M: MappedFile = MmapFile> {
    file_no: u32,
    mmf: M,
    options: StorageOptions,
    policy: SizePolicy,
}

impl DataFile<MmapFile> {
    /// Data file `file_no` backed by a file on disk.
    pub fn new(file_no: u32, options: StorageOptions) -> Self {
        Self::with_mapped_file(file_no, MmapFile::new(), options)
    }
}

impl<M: MappedFile> DataFile<M> {
    /// Data file `file_no` over any mapped-file implementation.
    pub fn with_mapped_file(file_no: u32, mmf: M, options: StorageOptions) -> Self {
        Self {
            file_no,
            mmf,
            options,
            policy: SizePolicy::new(&options),
        }
    }

    /// Replace the size policy, e.g. to model a narrow address space.
    pub fn with_size_policy(mut self, policy: SizePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn file_no(&self) -> u32 {
        self.file_no
    }

    #[inline]
    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    #[inline]
    pub fn size_policy(&self) -> &SizePolicy {
        &self.policy
    }

    /// Largest size this file may have.
    pub fn max_size(&self) -> u64 {
        self.policy.max_size()
    }

    /// Size this file is created with when nothing forces it larger.
    pub fn default_size(&self) -> u64 {
        self.policy.default_size(self.file_no)
    }

    /// Mapped length in bytes, 0 when not mapped.
    pub fn length(&self) -> u64 {
        self.mmf.length()
    }

    pub fn path(&self) -> Option<&Path> {
        self.mmf.filename()
    }

    pub fn is_mapped(&self) -> bool {
        self.mmf.view().is_some()
    }

    /// Snapshot of the header, or `None` if the file is not mapped.
    pub fn header(&self) -> Option<DataFileHeader> {
        self.mmf
            .view()
            .filter(|view| view.len() >= HEADER_SIZE)
            .map(DataFileHeader::from_bytes)
    }

    // ========================================================================
    // Opening
    // ========================================================================

    /// Map an existing data file.
    ///
    /// # Errors
    /// - [`Error::InvalidPath`] if the file does not exist
    /// - [`Error::Internal`] if it cannot be mapped
    /// - Fatal if it is already mapped, has no view, or its length is not
    ///   one a data file can have (see [`check_existing_length`])
    pub fn open_existing(&mut self, path: &Path) -> Result<()> {
        if self.is_mapped() {
            return Err(FatalError::AlreadyMapped {
                file_no: self.file_no,
            }
            .into());
        }

        if !self.mmf.exists(path) {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }

        if let Err(e) = self.mmf.open(path) {
            return Err(Error::Internal(format!(
                "DataFile::open_existing - mapping {} failed: {}",
                path.display(),
                e
            )));
        }

        if !self.is_mapped() {
            return Err(map_failed(path, self.policy.narrow_address_space()));
        }

        check_existing_length(path, self.mmf.length(), self.options.small_files)
    }

    /// Create (or reuse) and map this file at the size the policy picks for
    /// `min_size`, then initialize its header.
    ///
    /// An existing file larger than that size is mapped at its own length and
    /// never shrunk; its header must record that length.
    ///
    /// With `preallocate_only`, only asks the preallocation service to create
    /// the file in the background and returns `Ok(None)` without mapping.
    ///
    /// # Errors
    /// Fatal if the file is already mapped, the mapping produced no view, or
    /// header initialization finds corruption (including a header whose
    /// recorded length differs from the mapped length). An uninitialized header without
    /// the write lock is not an error: see [`InitOutcome::Deferred`].
    pub fn open(
        &mut self,
        ctx: &OperationContext<'_>,
        path: &Path,
        min_size: u64,
        preallocate_only: bool,
    ) -> Result<Option<InitOutcome>> {
        let size = self.policy.open_size(self.file_no, min_size)?;

        if preallocate_only {
            if self.options.prealloc {
                ctx.preallocator().request_allocation(path, size);
            }
            return Ok(None);
        }

        if self.is_mapped() {
            return Err(FatalError::AlreadyMapped {
                file_no: self.file_no,
            }
            .into());
        }

        if let Err(e) = self.mmf.create(path, size) {
            tracing::error!(path = %path.display(), size, error = %e, "creating data file mapping failed");
        }

        let length = self.mmf.length();
        if length > MAX_MAPPED_LENGTH {
            return Err(FatalError::InvalidSize {
                size: length,
                reason: "mapped length exceeds 31 bits",
            }
            .into());
        }

        let file_no = self.file_no;
        let needs_64_bit = self.policy.narrow_address_space();
        let view = self
            .mmf
            .view_mut()
            .ok_or_else(|| map_failed(path, needs_64_bit))?;

        HeaderMut::new(view, file_no)
            .init(ctx, length as u32, path)
            .map(Some)
    }

    /// Rewrite legacy free-list pointers, for files mapped with
    /// [`open_existing`](Self::open_existing).
    pub fn check_upgrade(&mut self, ctx: &OperationContext<'_>) -> Result<InitOutcome> {
        let file_no = self.file_no;
        let view = self.header_view_mut()?;
        HeaderMut::new(view, file_no).check_upgrade(ctx)
    }

    /// Write dirty pages back to disk; with `sync`, wait for them.
    pub fn flush(&self, sync: bool) -> Result<()> {
        self.mmf.flush(sync)?;
        Ok(())
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Carve `size` bytes off the front of the unused region.
    ///
    /// Returns the location of the new extent: the cursor as it was before
    /// the call. The cursor advance and the length decrement are one
    /// transactional durable write.
    ///
    /// # Errors
    /// All failures are fatal:
    /// - shutdown is in progress
    /// - the file has no header (its mapping failed, or initialization was
    ///   deferred)
    /// - `size` exceeds the unused length, which is a caller bug
    pub fn alloc_extent_area(&mut self, ctx: &OperationContext<'_>, size: u32) -> Result<DiskLoc> {
        if ctx.shutdown().in_shutdown() {
            tracing::error!(file_no = self.file_no, "extent allocation during shutdown");
            return Err(FatalError::ShutdownInProgress.into());
        }

        let file_no = self.file_no;
        let view = self.header_view_mut()?;
        let mut header = HeaderMut::new(view, file_no);
        let current = header.read();
        if current.is_uninitialized() {
            tracing::error!(file_no, "extent allocation from uninitialized header");
            return Err(FatalError::NoHeader.into());
        }

        let available = current.unused_length;
        if size > available {
            tracing::error!(file_no, size, available, "extent larger than unused space");
            return Err(FatalError::ExtentTooLarge {
                requested: size,
                available,
            }
            .into());
        }

        let loc = header.advance_unused(ctx, size)?;
        tracing::debug!(file_no, size, %loc, "allocated extent area");
        Ok(loc)
    }

    fn header_view_mut(&mut self) -> Result<&mut [u8]> {
        match self.mmf.view_mut() {
            Some(view) if view.len() >= HEADER_SIZE => Ok(view),
            _ => {
                tracing::error!(file_no = self.file_no, "data file has no header");
                Err(FatalError::NoHeader.into())
            }
        }
    }

    // ========================================================================
    // Access and recovery
    // ========================================================================

    /// Read-only access to `len` bytes at `loc`.
    ///
    /// # Errors
    /// Fatal [`FatalError::BadOffset`] if `loc` is null, names another file,
    /// or the range is not backed by this file.
    pub fn bytes(&self, loc: DiskLoc, len: usize) -> Result<&[u8]> {
        let range = (loc.offset() as usize)..(loc.offset() as usize).saturating_add(len);
        let slice = self
            .mmf
            .view()
            .filter(|_| !loc.is_null() && loc.file() == self.file_no)
            .and_then(|view| view.get(range));

        match slice {
            Some(bytes) => Ok(bytes),
            None => {
                let path = self.path().map(Path::to_path_buf).unwrap_or_default();
                tracing::error!(%loc, len, path = %path.display(), "bad offset");
                Err(FatalError::BadOffset { loc, len, path }.into())
            }
        }
    }

    /// Restore pre-images handed back by a transaction rollback.
    ///
    /// `undo` must be newest first, as `Journal::rollback_transaction`
    /// returns it. Records for other files are skipped. Returns the number
    /// of records applied.
    pub fn roll_back(&mut self, undo: &[WriteRecord]) -> usize {
        let file_no = self.file_no;
        let Some(view) = self.mmf.view_mut() else {
            return 0;
        };

        let mut applied = 0;
        for record in undo.iter().filter(|r| r.file_no == file_no) {
            if let Some(target) = view.get_mut(record.range()) {
                target.copy_from_slice(&record.pre_image);
                applied += 1;
            }
        }
        applied
    }

    /// Reapply committed groups after a crash.
    ///
    /// Groups are applied in order, each in full. Replay stops at the first
    /// group whose checksum does not match: it was torn by the crash, and
    /// nothing after it was acknowledged. Returns the number of groups applied.
    pub fn replay(&mut self, groups: &[JournalGroup]) -> usize {
        let file_no = self.file_no;
        let Some(view) = self.mmf.view_mut() else {
            return 0;
        };

        let mut applied = 0;
        for group in groups {
            if !group.verify() {
                tracing::warn!(sequence = group.sequence(), "torn journal group, stopping replay");
                break;
            }
            for record in group.records().iter().filter(|r| r.file_no == file_no) {
                if let Some(target) = view.get_mut(record.range()) {
                    target.copy_from_slice(&record.post_image);
                }
            }
            applied += 1;
        }
        applied
    }
}

fn map_failed(path: &Path, needs_64_bit: bool) -> Error {
    tracing::error!(path = %path.display(), needs_64_bit, "can't map file memory");
    FatalError::MapFailed {
        path: path.to_path_buf(),
        needs_64_bit,
    }
    .into()
}

/// Validate the length of an existing data file.
///
/// A file below 64MB outside small-files mode is accepted only if it looks
/// like it was created in small-files mode (at least 16MB and MB aligned);
/// that is logged as a configuration mismatch.
///
/// # Errors
/// Fatal [`FatalError::CorruptFile`] for lengths no data file can have.
pub fn check_existing_length(path: &Path, length: u64, small_files: bool) -> Result<()> {
    let corrupt = |reason: String| -> Result<()> {
        tracing::error!(path = %path.display(), length, %reason, "existing data file has invalid length");
        Err(FatalError::CorruptFile {
            path: path.to_path_buf(),
            reason,
        }
        .into())
    };

    if length > MAX_MAPPED_LENGTH {
        return corrupt(format!("length {} exceeds {}", length, MAX_MAPPED_LENGTH));
    }
    if length % PAGE_SIZE as u64 != 0 {
        return corrupt(format!("length {} is not a multiple of {}", length, PAGE_SIZE));
    }
    if length <= HEADER_SIZE as u64 {
        return corrupt(format!("length {} leaves no room after the header", length));
    }

    if length < MIN_FILE_SIZE && !small_files {
        if length >= SMALL_FILES_FLOOR && length % SMALL_FILES_GRANULARITY == 0 {
            tracing::info!(
                path = %path.display(),
                length,
                "existing data file has a small-files size but small files are disabled"
            );
        } else {
            return corrupt(format!(
                "length {} is less than the minimum data file size",
                length
            ));
        }
    }

    Ok(())
}
