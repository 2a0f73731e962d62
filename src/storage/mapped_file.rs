//! Mapped files - the memory-mapping primitive under a data file.
//!
//! The [`MappedFile`] trait is the contract a [`DataFile`](super::DataFile)
//! needs: open or create a file, hand out its mapped view, flush it.
//! - [`MmapFile`] - A file on disk mapped read/write with memmap2
//! - [`AnonymousMapping`] - Memory not backed by any file, for scratch data
//!   files and tests

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

/// A file mapped into memory.
///
/// Implementations own the mapping. `view`/`view_mut` return `None` until a
/// successful `open` or `create`, or if the mapping failed.
pub trait MappedFile {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Map an existing file.
    fn open(&mut self, path: &Path) -> io::Result<()>;

    /// Create (or reuse) the file at `path` with at least `len` bytes and map
    /// it. An existing larger file keeps its length; read it back with
    /// [`length`](Self::length).
    fn create(&mut self, path: &Path, len: u64) -> io::Result<()>;

    fn view(&self) -> Option<&[u8]>;

    fn view_mut(&mut self) -> Option<&mut [u8]>;

    /// Mapped length in bytes, 0 when nothing is mapped.
    fn length(&self) -> u64;

    /// Write dirty pages back. With `sync`, wait until they reach the disk.
    fn flush(&self, sync: bool) -> io::Result<()>;

    fn filename(&self) -> Option<&Path>;
}

/// A data file on disk, mapped shared and writable.
///
/// # Durability
/// Writes to the view reach the page cache immediately and the disk on
/// [`flush`](MappedFile::flush) or whenever the OS writes them back.
/// Crash safety comes from the durability subsystem, not from this type.
#[derive(Debug, Default)]
pub struct MmapFile {
    path: Option<PathBuf>,
    file: Option<File>,
    mmap: Option<MmapMut>,
}

impl MmapFile {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&mut self, path: &Path, file: File) -> io::Result<()> {
        // SAFETY: MmapMut::map_mut is unsafe because the file may be modified
        // outside this process while mapped. Data files are owned by a single
        // engine process, the mapping lives exactly as long as `self`, and all
        // header mutation goes through the durability layer.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        self.path = Some(path.to_path_buf());
        self.file = Some(file);
        self.mmap = Some(mmap);
        Ok(())
    }
}

impl MappedFile for MmapFile {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        self.map(path, file)
    }

    fn create(&mut self, path: &Path, len: u64) -> io::Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        // Existing files only ever grow.
        if file.metadata()?.len() < len {
            file.set_len(len)?;
        }
        self.map(path, file)
    }

    fn view(&self) -> Option<&[u8]> {
        self.mmap.as_deref()
    }

    fn view_mut(&mut self) -> Option<&mut [u8]> {
        self.mmap.as_deref_mut()
    }

    fn length(&self) -> u64 {
        self.mmap.as_ref().map_or(0, |m| m.len() as u64)
    }

    fn flush(&self, sync: bool) -> io::Result<()> {
        match &self.mmap {
            Some(mmap) if sync => mmap.flush(),
            Some(mmap) => mmap.flush_async(),
            None => Ok(()),
        }
    }

    fn filename(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Anonymous memory posing as a data file.
///
/// `create` maps zeroed memory of the requested size; nothing ever exists on
/// disk, so `exists` is always false and `open` always fails.
#[derive(Debug, Default)]
pub struct AnonymousMapping {
    path: Option<PathBuf>,
    mmap: Option<MmapMut>,
}

impl AnonymousMapping {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappedFile for AnonymousMapping {
    fn exists(&self, _path: &Path) -> bool {
        false
    }

    fn open(&mut self, path: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("anonymous mapping cannot reopen {}", path.display()),
        ))
    }

    fn create(&mut self, path: &Path, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "mapping too large"))?;
        self.mmap = Some(MmapMut::map_anon(len)?);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn view(&self) -> Option<&[u8]> {
        self.mmap.as_deref()
    }

    fn view_mut(&mut self) -> Option<&mut [u8]> {
        self.mmap.as_deref_mut()
    }

    fn length(&self) -> u64 {
        self.mmap.as_ref().map_or(0, |m| m.len() as u64)
    }

    fn flush(&self, _sync: bool) -> io::Result<()> {
        Ok(())
    }

    fn filename(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
