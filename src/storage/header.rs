//! Data file header and format version.
//!
//! Every data file starts with an 8KB [`DataFileHeader`]:
//! - [`DataFileVersion`] format tag
//! - the bump-allocation cursor (`unused`, `unused_length`)
//! - head and tail of the free list
//!
//! The header is written once when the file is created, upgraded once if it
//! comes from an older format, and afterwards only the cursor moves.

use std::path::Path;

use crate::common::config::{HEADER_SIZE, HEADER_SLACK, MIN_PLAUSIBLE_FILE_LENGTH};
use crate::common::{DiskLoc, FatalError, Result};
use crate::context::OperationContext;
use crate::durability::{WriteScope, WriteUnitOfWork};

/// On-disk format version of a data file.
///
/// The minor version packs two things: the low nibble names the index
/// format, and the bits above it are feature flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataFileVersion {
    major: u32,
    minor: u32,
}

impl DataFileVersion {
    pub const CURRENT_MAJOR: u32 = 4;

    /// Index format of files written by old releases.
    pub const INDEXES_22_AND_OLDER: u32 = 5;
    /// Current index format.
    pub const INDEXES_24_AND_NEWER: u32 = 6;
    pub const INDEX_FORMAT_MASK: u32 = 0xf;

    /// The file may contain free-list entries in the current layout.
    pub const MAY_HAVE_NEW_FREELIST: u32 = 1 << 4;
    pub const USED_FEATURES_MASK: u32 = Self::MAY_HAVE_NEW_FREELIST;

    /// Version of a header that was never written.
    pub const UNINITIALIZED: DataFileVersion = DataFileVersion { major: 0, minor: 0 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Version stamped on newly created files.
    pub const fn default_for_new_files() -> Self {
        Self::new(
            Self::CURRENT_MAJOR,
            Self::INDEXES_24_AND_NEWER | Self::MAY_HAVE_NEW_FREELIST,
        )
    }

    #[inline]
    pub fn major(&self) -> u32 {
        self.major
    }

    #[inline]
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// A zero major version means the header bytes were never written.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.major != 0
    }

    #[inline]
    pub fn index_format(&self) -> u32 {
        self.minor & Self::INDEX_FORMAT_MASK
    }

    #[inline]
    pub fn may_have_new_freelist(&self) -> bool {
        self.minor & Self::MAY_HAVE_NEW_FREELIST != 0
    }

    /// Whether this build can read files of this version.
    pub fn is_compatible_with_current_code(&self) -> bool {
        if self.major != Self::CURRENT_MAJOR {
            return false;
        }
        if self.minor & !(Self::INDEX_FORMAT_MASK | Self::USED_FEATURES_MASK) != 0 {
            return false;
        }
        matches!(
            self.index_format(),
            Self::INDEXES_22_AND_OLDER | Self::INDEXES_24_AND_NEWER
        )
    }
}

/// What header initialization did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A fresh header was written.
    Initialized,
    /// The header was uninitialized but no write lock was held; nothing was
    /// written. A later open under the write lock initializes it.
    Deferred,
    /// Legacy free-list pointers were rewritten to null.
    Upgraded,
    /// Already initialized in the current format; nothing to do.
    Current,
}

/// Decoded contents of the header at offset 0 of every data file.
///
/// # Layout (8192 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     version.major
/// 4       4     version.minor
/// 8       4     file_length
/// 12      8     unused           (DiskLoc: file, offset)
/// 20      4     unused_length
/// 24      8     free_list_start  (DiskLoc)
/// 32      8     free_list_end    (DiskLoc)
/// 40      8152  reserved
/// ```
///
/// Extents are carved from `unused` onwards; `unused_length` counts the bytes
/// left, excluding the 16 slack bytes at the end of the file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataFileHeader {
    pub version: DataFileVersion,
    pub file_length: u32,
    pub unused: DiskLoc,
    pub unused_length: u32,
    pub free_list_start: DiskLoc,
    pub free_list_end: DiskLoc,
}

impl DataFileHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    /// Offset of each field within the header.
    pub const OFFSET_VERSION: usize = 0;
    pub const OFFSET_FILE_LENGTH: usize = 8;
    pub const OFFSET_UNUSED: usize = 12;
    pub const OFFSET_UNUSED_LENGTH: usize = 20;
    pub const OFFSET_FREE_LIST_START: usize = 24;
    pub const OFFSET_FREE_LIST_END: usize = 32;
    /// End of the defined fields; reserved bytes follow.
    pub const FIELDS_END: usize = 40;

    /// The header a new file `file_no` of `file_length` bytes starts with.
    pub fn for_new_file(file_no: u32, file_length: u32) -> Self {
        Self {
            version: DataFileVersion::default_for_new_files(),
            file_length,
            unused: DiskLoc::new(file_no, HEADER_SIZE as u32),
            unused_length: file_length - HEADER_SIZE as u32 - HEADER_SLACK,
            free_list_start: DiskLoc::NULL,
            free_list_end: DiskLoc::NULL,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < DataFileHeader::FIELDS_END`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(
            data.len() >= Self::FIELDS_END,
            "buffer too small for DataFileHeader"
        );

        let u32_at = |offset: usize| {
            u32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ])
        };

        Self {
            version: DataFileVersion::new(u32_at(Self::OFFSET_VERSION), u32_at(Self::OFFSET_VERSION + 4)),
            file_length: u32_at(Self::OFFSET_FILE_LENGTH),
            unused: DiskLoc::from_bytes(&data[Self::OFFSET_UNUSED..]),
            unused_length: u32_at(Self::OFFSET_UNUSED_LENGTH),
            free_list_start: DiskLoc::from_bytes(&data[Self::OFFSET_FREE_LIST_START..]),
            free_list_end: DiskLoc::from_bytes(&data[Self::OFFSET_FREE_LIST_END..]),
        }
    }

    /// Write this header's fields to the beginning of a byte slice.
    ///
    /// Reserved bytes are left untouched.
    ///
    /// # Panics
    /// Panics if `data.len() < DataFileHeader::FIELDS_END`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(
            data.len() >= Self::FIELDS_END,
            "buffer too small for DataFileHeader"
        );

        data[0..4].copy_from_slice(&self.version.major.to_le_bytes());
        data[4..8].copy_from_slice(&self.version.minor.to_le_bytes());
        data[Self::OFFSET_FILE_LENGTH..Self::OFFSET_FILE_LENGTH + 4]
            .copy_from_slice(&self.file_length.to_le_bytes());
        self.unused.write_to(&mut data[Self::OFFSET_UNUSED..]);
        data[Self::OFFSET_UNUSED_LENGTH..Self::OFFSET_UNUSED_LENGTH + 4]
            .copy_from_slice(&self.unused_length.to_le_bytes());
        self.free_list_start
            .write_to(&mut data[Self::OFFSET_FREE_LIST_START..]);
        self.free_list_end.write_to(&mut data[Self::OFFSET_FREE_LIST_END..]);
    }

    #[inline]
    pub fn is_uninitialized(&self) -> bool {
        !self.version.is_initialized()
    }

    /// True if nothing has been allocated from this file yet.
    pub fn is_empty(&self) -> bool {
        self.is_uninitialized()
            || u64::from(self.unused_length)
                == u64::from(self.file_length)
                    .saturating_sub(HEADER_SIZE as u64 + u64::from(HEADER_SLACK))
    }

    /// Free-list pointers still use the legacy zero pair.
    #[inline]
    pub fn needs_upgrade(&self) -> bool {
        self.free_list_start.is_legacy_empty()
    }
}

/// Durable write access to the header of one mapped file.
pub(crate) struct HeaderMut<'a> {
    view: &'a mut [u8],
    file_no: u32,
}

impl<'a> HeaderMut<'a> {
    /// # Panics
    /// Panics if the view is shorter than the header.
    pub(crate) fn new(view: &'a mut [u8], file_no: u32) -> Self {
        assert!(view.len() >= HEADER_SIZE, "mapped view shorter than header");
        Self { view, file_no }
    }

    pub(crate) fn read(&self) -> DataFileHeader {
        DataFileHeader::from_bytes(&self.view[..])
    }

    /// Write a fresh header if the file has none, otherwise upgrade it if it
    /// is in the legacy format.
    ///
    /// An existing header must record exactly `file_length`, the length
    /// actually mapped.
    pub(crate) fn init(
        &mut self,
        ctx: &OperationContext<'_>,
        file_length: u32,
        path: &Path,
    ) -> Result<InitOutcome> {
        let existing = self.read();
        if !existing.is_uninitialized() {
            if existing.file_length != file_length {
                tracing::error!(
                    path = %path.display(),
                    file_no = self.file_no,
                    header_length = existing.file_length,
                    mapped_length = file_length,
                    "data file length does not match its header"
                );
                return Err(FatalError::CorruptFile {
                    path: path.to_path_buf(),
                    reason: format!(
                        "header records {} bytes but {} are mapped",
                        existing.file_length, file_length
                    ),
                }
                .into());
            }
            return self.check_upgrade(ctx);
        }

        tracing::debug!(path = %path.display(), file_no = self.file_no, "initializing data file header");

        if file_length <= MIN_PLAUSIBLE_FILE_LENGTH {
            tracing::error!(path = %path.display(), file_no = self.file_no, file_length, "data file header looks corrupt");
            return Err(FatalError::CorruptHeader {
                file_no: self.file_no,
                file_length,
            }
            .into());
        }

        // TODO: refuse instead of deferring once every open path holds the
        // database write lock; until then the next locked open initializes.
        if !ctx.lock_state().is_write_locked() {
            tracing::warn!(
                path = %path.display(),
                locks = %ctx.lock_state().dump(),
                "not initializing data file header outside a write lock"
            );
            return Ok(InitOutcome::Deferred);
        }

        // Both the notice and the header go to the durability ledger directly:
        // a rollback of the caller's transaction must leave the file
        // initialized, not send it back through this path.
        ctx.durability()
            .created_file(path, u64::from(file_length))
            .map_err(FatalError::JournalRejected)?;

        let header = DataFileHeader::for_new_file(self.file_no, file_length);
        let mut unit = WriteUnitOfWork::new(
            &mut *self.view,
            self.file_no,
            WriteScope::Independent,
            ctx.durability(),
        );
        header.write_to(&mut unit.writing(0..DataFileHeader::FIELDS_END));
        unit.commit()?;

        Ok(InitOutcome::Initialized)
    }

    /// Rewrite legacy zero-pair free-list pointers to null, once.
    pub(crate) fn check_upgrade(&mut self, ctx: &OperationContext<'_>) -> Result<InitOutcome> {
        let header = self.read();
        if !header.needs_upgrade() {
            return Ok(InitOutcome::Current);
        }

        if !header.free_list_end.is_legacy_empty() {
            tracing::error!(
                file_no = self.file_no,
                start = %header.free_list_start,
                end = %header.free_list_end,
                "free list pointers half upgraded"
            );
            return Err(FatalError::FreeListMismatch {
                start: header.free_list_start,
                end: header.free_list_end,
            }
            .into());
        }

        tracing::info!(file_no = self.file_no, "upgrading legacy free list pointers");

        let mut unit = WriteUnitOfWork::new(
            &mut *self.view,
            self.file_no,
            WriteScope::Independent,
            ctx.durability(),
        );
        DiskLoc::NULL.write_to(&mut unit.writing(free_list_start_range()));
        DiskLoc::NULL.write_to(&mut unit.writing(free_list_end_range()));
        unit.commit()?;

        Ok(InitOutcome::Upgraded)
    }

    /// Move the allocation cursor forward by `size` bytes.
    ///
    /// Both fields change in one transactional group. Returns the cursor
    /// before the move. The caller has checked `size <= unused_length`.
    ///
    /// # Errors
    /// Fatal [`FatalError::CorruptHeader`] if the cursor would pass 32 bits.
    pub(crate) fn advance_unused(&mut self, ctx: &OperationContext<'_>, size: u32) -> Result<DiskLoc> {
        let header = self.read();
        let start = header.unused;
        let Some(next) = start.offset().checked_add(size) else {
            tracing::error!(file_no = self.file_no, unused = %start, size, "allocation cursor overflows");
            return Err(FatalError::CorruptHeader {
                file_no: self.file_no,
                file_length: header.file_length,
            }
            .into());
        };

        let mut unit = WriteUnitOfWork::new(
            &mut *self.view,
            self.file_no,
            WriteScope::Transactional,
            ctx.durability(),
        );
        DiskLoc::new(self.file_no, next).write_to(&mut unit.writing(unused_range()));
        unit.writing(unused_length_range())
            .copy_from_slice(&(header.unused_length - size).to_le_bytes());
        unit.commit()?;

        Ok(DiskLoc::new(self.file_no, start.offset()))
    }
}

fn unused_range() -> std::ops::Range<usize> {
    DataFileHeader::OFFSET_UNUSED..DataFileHeader::OFFSET_UNUSED + DiskLoc::SIZE
}

fn unused_length_range() -> std::ops::Range<usize> {
    DataFileHeader::OFFSET_UNUSED_LENGTH..DataFileHeader::OFFSET_UNUSED_LENGTH + 4
}

fn free_list_start_range() -> std::ops::Range<usize> {
    DataFileHeader::OFFSET_FREE_LIST_START..DataFileHeader::OFFSET_FREE_LIST_START + DiskLoc::SIZE
}

fn free_list_end_range() -> std::ops::Range<usize> {
    DataFileHeader::OFFSET_FREE_LIST_END..DataFileHeader::OFFSET_FREE_LIST_END + DiskLoc::SIZE
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{LockMode, Locker, ShutdownFlag};
    use crate::durability::Journal;
    use crate::storage::FileAllocator;

    const FILE_LENGTH: u32 = 64 * 1024 * 1024;

    struct Env {
        locker: Locker,
        shutdown: ShutdownFlag,
        journal: Journal,
        allocator: FileAllocator,
    }

    impl Env {
        fn new(mode: LockMode) -> Self {
            Self {
                locker: Locker::new(mode),
                shutdown: ShutdownFlag::new(),
                journal: Journal::new(),
                allocator: FileAllocator::new(),
            }
        }

        fn ctx(&self) -> OperationContext<'_> {
            OperationContext::new(&self.locker, &self.shutdown, &self.journal, &self.allocator)
        }
    }

    fn legacy_header(file_no: u32) -> Vec<u8> {
        let mut view = vec![0u8; HEADER_SIZE];
        let mut header = DataFileHeader::for_new_file(file_no, FILE_LENGTH);
        header.version = DataFileVersion::new(4, DataFileVersion::INDEXES_22_AND_OLDER);
        header.free_list_start = DiskLoc::LEGACY_EMPTY;
        header.free_list_end = DiskLoc::LEGACY_EMPTY;
        header.write_to(&mut view);
        view
    }

    // --- DataFileVersion tests ---

    #[test]
    fn test_version_for_new_files() {
        let version = DataFileVersion::default_for_new_files();
        assert_eq!(version.major(), 4);
        assert_eq!(version.index_format(), DataFileVersion::INDEXES_24_AND_NEWER);
        assert!(version.may_have_new_freelist());
        assert!(version.is_initialized());
        assert!(version.is_compatible_with_current_code());
    }

    #[test]
    fn test_version_compatibility() {
        assert!(DataFileVersion::new(4, 5).is_compatible_with_current_code());
        assert!(!DataFileVersion::new(3, 5).is_compatible_with_current_code());
        assert!(!DataFileVersion::new(4, 7).is_compatible_with_current_code());
        assert!(!DataFileVersion::new(4, 6 | (1 << 5)).is_compatible_with_current_code());
        assert!(!DataFileVersion::UNINITIALIZED.is_initialized());
    }

    // --- DataFileHeader tests ---

    #[test]
    fn test_header_for_new_file() {
        let header = DataFileHeader::for_new_file(2, 256 * 1024 * 1024);
        assert_eq!(header.unused, DiskLoc::new(2, 8192));
        assert_eq!(header.unused_length, 256 * 1024 * 1024 - 8208);
        assert!(header.free_list_start.is_null());
        assert!(header.free_list_end.is_null());
        assert!(header.is_empty());
        assert!(!header.needs_upgrade());
    }

    #[test]
    fn test_header_byte_layout() {
        let header = DataFileHeader {
            version: DataFileVersion::new(4, 0x16),
            file_length: 0x0400_0000,
            unused: DiskLoc::new(1, 0x2000),
            unused_length: 0x03ff_dff0,
            free_list_start: DiskLoc::NULL,
            free_list_end: DiskLoc::new(1, 0x3000),
        };

        let mut buffer = [0u8; DataFileHeader::FIELDS_END];
        header.write_to(&mut buffer);

        assert_eq!(&buffer[0..4], &[4, 0, 0, 0]);
        assert_eq!(&buffer[4..8], &[0x16, 0, 0, 0]);
        assert_eq!(&buffer[8..12], &[0, 0, 0, 4]);
        assert_eq!(&buffer[12..16], &[1, 0, 0, 0]);
        assert_eq!(&buffer[16..20], &[0, 0x20, 0, 0]);
        assert_eq!(&buffer[20..24], &[0xf0, 0xdf, 0xff, 0x03]);
        assert_eq!(&buffer[24..32], &[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0]);
        assert_eq!(&buffer[32..36], &[1, 0, 0, 0]);

        assert_eq!(DataFileHeader::from_bytes(&buffer), header);
    }

    #[test]
    fn test_zeroed_header_is_uninitialized() {
        let header = DataFileHeader::from_bytes(&[0u8; HEADER_SIZE]);
        assert!(header.is_uninitialized());
        assert!(header.is_empty());
    }

    // --- init tests ---

    #[test]
    fn test_init_writes_fresh_header() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = vec![0u8; HEADER_SIZE];

        let outcome = HeaderMut::new(&mut view, 3)
            .init(&env.ctx(), FILE_LENGTH, Path::new("db.3"))
            .unwrap();
        assert_eq!(outcome, InitOutcome::Initialized);

        let header = DataFileHeader::from_bytes(&view);
        assert_eq!(header, DataFileHeader::for_new_file(3, FILE_LENGTH));
        assert_eq!(header.file_length, FILE_LENGTH);

        let created = env.journal.created_files();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].length, u64::from(FILE_LENGTH));

        let groups = env.journal.durable_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].scope(), WriteScope::Independent);
    }

    #[test]
    fn test_init_is_idempotent() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = vec![0u8; HEADER_SIZE];
        let mut header = HeaderMut::new(&mut view, 0);

        header.init(&env.ctx(), FILE_LENGTH, Path::new("db.0")).unwrap();
        let before = header.read();

        let outcome = header.init(&env.ctx(), FILE_LENGTH, Path::new("db.0")).unwrap();
        assert_eq!(outcome, InitOutcome::Current);
        assert_eq!(header.read(), before);
        assert_eq!(env.journal.durable_groups().len(), 1);
        assert_eq!(env.journal.created_files().len(), 1);
    }

    #[test]
    fn test_init_deferred_without_write_lock() {
        let env = Env::new(LockMode::Shared);
        let mut view = vec![0u8; HEADER_SIZE];

        let outcome = HeaderMut::new(&mut view, 0)
            .init(&env.ctx(), FILE_LENGTH, Path::new("db.0"))
            .unwrap();
        assert_eq!(outcome, InitOutcome::Deferred);
        assert!(view.iter().all(|&b| b == 0));
        assert!(env.journal.created_files().is_empty());

        // Retried under the lock.
        env.locker.set_mode(LockMode::Exclusive);
        let outcome = HeaderMut::new(&mut view, 0)
            .init(&env.ctx(), FILE_LENGTH, Path::new("db.0"))
            .unwrap();
        assert_eq!(outcome, InitOutcome::Initialized);
    }

    #[test]
    fn test_init_rejects_implausible_length() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = vec![0u8; HEADER_SIZE];

        let err = HeaderMut::new(&mut view, 7)
            .init(&env.ctx(), 32 * 1024, Path::new("db.7"))
            .unwrap_err();
        assert!(matches!(
            err.as_fatal(),
            Some(FatalError::CorruptHeader { file_no: 7, file_length: 32768 })
        ));
        assert!(view.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_init_survives_transaction_rollback() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = vec![0u8; HEADER_SIZE];

        HeaderMut::new(&mut view, 0)
            .init(&env.ctx(), FILE_LENGTH, Path::new("db.0"))
            .unwrap();

        assert!(env.journal.rollback_transaction().is_empty());
        assert_eq!(env.journal.durable_groups().len(), 1);
    }

    #[test]
    fn test_init_rejects_length_mismatch() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = vec![0u8; HEADER_SIZE];
        let mut header = HeaderMut::new(&mut view, 0);
        header.init(&env.ctx(), FILE_LENGTH, Path::new("db.0")).unwrap();
        let before = header.read();

        let err = header
            .init(&env.ctx(), FILE_LENGTH / 4, Path::new("db.0"))
            .unwrap_err();
        assert!(matches!(err.as_fatal(), Some(FatalError::CorruptFile { .. })));
        assert_eq!(header.read(), before);
        assert_eq!(env.journal.durable_groups().len(), 1);
    }

    // --- upgrade tests ---

    #[test]
    fn test_legacy_header_is_upgraded_once() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = legacy_header(1);
        let mut header = HeaderMut::new(&mut view, 1);

        let outcome = header.init(&env.ctx(), FILE_LENGTH, Path::new("db.1")).unwrap();
        assert_eq!(outcome, InitOutcome::Upgraded);
        let upgraded = header.read();
        assert!(upgraded.free_list_start.is_null());
        assert!(upgraded.free_list_end.is_null());

        let outcome = header.init(&env.ctx(), FILE_LENGTH, Path::new("db.1")).unwrap();
        assert_eq!(outcome, InitOutcome::Current);
        assert_eq!(env.journal.durable_groups().len(), 1);
        assert_eq!(env.journal.durable_groups()[0].records().len(), 2);
    }

    #[test]
    fn test_half_upgraded_header_is_fatal() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = legacy_header(1);
        DiskLoc::new(1, 0x4000).write_to(&mut view[DataFileHeader::OFFSET_FREE_LIST_END..]);

        let err = HeaderMut::new(&mut view, 1).check_upgrade(&env.ctx()).unwrap_err();
        assert!(matches!(err.as_fatal(), Some(FatalError::FreeListMismatch { .. })));
        assert!(env.journal.durable_groups().is_empty());
    }

    // --- cursor tests ---

    #[test]
    fn test_advance_unused_is_one_group() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = vec![0u8; HEADER_SIZE];
        let mut header = HeaderMut::new(&mut view, 2);
        header.init(&env.ctx(), FILE_LENGTH, Path::new("db.2")).unwrap();

        let loc = header.advance_unused(&env.ctx(), 1000).unwrap();
        assert_eq!(loc, DiskLoc::new(2, 8192));
        assert_eq!(header.read().unused, DiskLoc::new(2, 9192));
        assert_eq!(header.read().unused_length, FILE_LENGTH - 8208 - 1000);

        assert_eq!(env.journal.open_transaction_len(), 1);
        assert_eq!(env.journal.commit_transaction(), 1);
        let groups = env.journal.durable_groups();
        let alloc = groups.last().unwrap();
        assert_eq!(alloc.scope(), WriteScope::Transactional);
        assert_eq!(alloc.records().len(), 2);
    }

    #[test]
    fn test_advance_unused_rejects_overflowing_cursor() {
        let env = Env::new(LockMode::Exclusive);
        let mut view = vec![0u8; HEADER_SIZE];
        let mut corrupt = DataFileHeader::for_new_file(0, FILE_LENGTH);
        corrupt.unused = DiskLoc::new(0, u32::MAX - 10);
        corrupt.write_to(&mut view);
        let mut header = HeaderMut::new(&mut view, 0);

        let err = header.advance_unused(&env.ctx(), 100).unwrap_err();
        assert_eq!(err.as_fatal().map(FatalError::code), Some(13640));
        assert_eq!(header.read(), corrupt);
        assert_eq!(env.journal.open_transaction_len(), 0);
    }
}
