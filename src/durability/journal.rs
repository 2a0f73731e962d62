//! In-memory write-ahead journal.
//!
//! [`Journal`] is a complete [`DurableWriteGateway`]: it keeps committed write
//! groups in order, each sealed with a CRC32, and holds the caller's open
//! transaction separately so it can be committed or rolled back as a whole.
//! Independent groups and file-creation notices go straight to the committed
//! ledger and are unaffected by a rollback.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::gateway::{DurableWriteGateway, WriteRecord, WriteScope};

/// A group of writes that replays atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalGroup {
    sequence: u64,
    scope: WriteScope,
    records: Vec<WriteRecord>,
    checksum: u32,
}

impl JournalGroup {
    fn new(sequence: u64, scope: WriteScope, records: Vec<WriteRecord>) -> Self {
        let checksum = Self::compute_checksum(sequence, &records);
        Self {
            sequence,
            scope,
            records,
            checksum,
        }
    }

    /// Rebuild a group read back from storage, keeping its stored checksum.
    pub fn from_parts(sequence: u64, scope: WriteScope, records: Vec<WriteRecord>, checksum: u32) -> Self {
        Self {
            sequence,
            scope,
            records,
            checksum,
        }
    }

    /// Position of this group in the journal.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn scope(&self) -> WriteScope {
        self.scope
    }

    #[inline]
    pub fn records(&self) -> &[WriteRecord] {
        &self.records
    }

    #[inline]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Compute the CRC32 over the sequence number and every record's
    /// file, offset, length and post-image.
    pub fn compute_checksum(sequence: u64, records: &[WriteRecord]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&sequence.to_le_bytes());
        for record in records {
            hasher.update(&record.file_no.to_le_bytes());
            hasher.update(&(record.offset as u64).to_le_bytes());
            hasher.update(&(record.len() as u64).to_le_bytes());
            hasher.update(&record.post_image);
        }
        hasher.finalize()
    }

    /// Whether the stored checksum matches the contents.
    ///
    /// Replay stops at the first group that fails this check: a torn group
    /// is never partially applied.
    pub fn verify(&self) -> bool {
        self.checksum == Self::compute_checksum(self.sequence, &self.records)
    }
}

/// A file-creation notice.
///
/// `sequence` is the sequence number the next group will get, so a
/// checkpoint covering that group also covers the notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedFile {
    pub sequence: u64,
    pub path: PathBuf,
    pub length: u64,
}

#[derive(Debug, Default)]
struct JournalInner {
    next_sequence: u64,
    created_files: Vec<CreatedFile>,
    durable: Vec<JournalGroup>,
    open_transaction: Vec<JournalGroup>,
}

impl JournalInner {
    fn seal(&mut self, scope: WriteScope, records: Vec<WriteRecord>) -> JournalGroup {
        let group = JournalGroup::new(self.next_sequence, scope, records);
        self.next_sequence += 1;
        group
    }
}

/// Write-ahead ledger with a single open caller transaction.
///
/// # Thread Safety
/// Internally synchronized; one journal may be shared by every data file of
/// a process.
#[derive(Debug, Default)]
pub struct Journal {
    inner: Mutex<JournalInner>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every group of the open transaction durable.
    ///
    /// Returns the number of groups committed.
    pub fn commit_transaction(&self) -> usize {
        let mut inner = self.inner.lock();
        let groups = std::mem::take(&mut inner.open_transaction);
        let count = groups.len();
        inner.durable.extend(groups);
        count
    }

    /// Discard the open transaction.
    ///
    /// Returns its records newest first, ready to be applied as undo
    /// (see `DataFile::roll_back`).
    pub fn rollback_transaction(&self) -> Vec<WriteRecord> {
        let groups = std::mem::take(&mut self.inner.lock().open_transaction);
        let undo: Vec<WriteRecord> = groups
            .into_iter()
            .rev()
            .flat_map(|group| group.records.into_iter().rev())
            .collect();
        tracing::debug!(records = undo.len(), "rolled back open transaction");
        undo
    }

    /// Drop every committed group with a sequence number up to and including
    /// `through`, together with the file-creation notices they cover.
    ///
    /// Call once the data files are flushed past those groups. The open
    /// transaction is never touched. Returns the number of groups dropped.
    pub fn checkpoint(&self, through: u64) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.durable.len();
        inner.durable.retain(|group| group.sequence > through);
        inner.created_files.retain(|notice| notice.sequence > through);
        let dropped = before - inner.durable.len();
        tracing::debug!(through, dropped, "journal checkpoint");
        dropped
    }

    /// Highest sequence number among committed groups.
    pub fn last_durable_sequence(&self) -> Option<u64> {
        self.inner.lock().durable.iter().map(JournalGroup::sequence).max()
    }

    /// Committed groups in journal order.
    pub fn durable_groups(&self) -> Vec<JournalGroup> {
        self.inner.lock().durable.clone()
    }

    /// Files announced through `created_file`.
    pub fn created_files(&self) -> Vec<CreatedFile> {
        self.inner.lock().created_files.clone()
    }

    /// Number of groups waiting in the open transaction.
    pub fn open_transaction_len(&self) -> usize {
        self.inner.lock().open_transaction.len()
    }
}

impl DurableWriteGateway for Journal {
    fn created_file(&self, path: &Path, length: u64) -> Result<(), String> {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.created_files.push(CreatedFile {
            sequence,
            path: path.to_path_buf(),
            length,
        });
        Ok(())
    }

    fn write_group(&self, scope: WriteScope, records: Vec<WriteRecord>) -> Result<(), String> {
        let mut inner = self.inner.lock();
        let group = inner.seal(scope, records);
        match scope {
            WriteScope::Independent => inner.durable.push(group),
            WriteScope::Transactional => inner.open_transaction.push(group),
        }
        Ok(())
    }
}
