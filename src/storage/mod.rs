//! Storage layer - mapped data files and their headers.
//!
//! This module handles persistent storage:
//! - [`DataFile`] - One numbered data file: open, initialize, allocate extents
//! - [`header`] - Header layout and format version
//! - [`MappedFile`] - The memory-mapping primitive under a data file
//! - [`SizePolicy`] - How large each data file is
//! - [`FileAllocator`] - Background preallocation

mod data_file;
mod file_allocator;
pub mod header;
mod mapped_file;
mod size_policy;

pub use data_file::{check_existing_length, DataFile};
pub use file_allocator::FileAllocator;
pub use header::{DataFileHeader, DataFileVersion, InitOutcome};
pub use mapped_file::{AnonymousMapping, MappedFile, MmapFile};
pub use size_policy::SizePolicy;
