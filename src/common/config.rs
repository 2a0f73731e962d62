//! Configuration constants and runtime options for extentstore.

/// Allocation granularity of data files in bytes (4KB).
///
/// Every data file length is a multiple of this value, which matches the OS
/// page size on most systems so the whole file can be mapped without a tail.
pub const PAGE_SIZE: usize = 4096;

/// Size of the fixed header at offset 0 of every data file.
///
/// Application data (extents) begins immediately after it.
pub const HEADER_SIZE: usize = 8192;

/// Bytes at the end of a data file that are never handed out by the allocator.
pub const HEADER_SLACK: u32 = 16;

const MIB: u64 = 1024 * 1024;

/// Smallest file size expected outside of small-files mode (64MB).
pub const MIN_FILE_SIZE: u64 = 64 * MIB;

/// Largest file size on hosts that can address large mappings (~2047MB).
pub const LARGE_FILE_CAP: u64 = 0x7ff0_0000;

/// Largest file size when the address space is too narrow for large mappings.
pub const NARROW_MAX_SIZE: u64 = 512 * MIB;

/// Hard upper bound on a mapped data file: lengths are stored as 31-bit values.
pub const MAX_MAPPED_LENGTH: u64 = 0x7fff_ffff;

/// A header claiming a file length at or below this is corrupt.
pub const MIN_PLAUSIBLE_FILE_LENGTH: u32 = 32 * 1024;

/// Small-files mode divides default and maximum sizes by `1 << SMALL_FILES_SHIFT`.
pub const SMALL_FILES_SHIFT: u32 = 2;

/// Existing files below [`MIN_FILE_SIZE`] are still accepted when they are at
/// least this large and MB-aligned: they were created in small-files mode.
pub const SMALL_FILES_FLOOR: u64 = 16 * MIB;

/// Granularity of a legitimate small-files mode file size.
pub const SMALL_FILES_GRANULARITY: u64 = MIB;

/// Options that shape how data files are sized and created.
///
/// # Example
/// ```
/// use extentstore::StorageOptions;
///
/// let options = StorageOptions::default();
/// assert!(!options.small_files);
/// assert!(options.prealloc);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    /// Shrink default and maximum file sizes for constrained-storage deployments.
    pub small_files: bool,
    /// Allow the background preallocation service to create files ahead of need.
    pub prealloc: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            small_files: false,
            prealloc: true,
        }
    }
}

impl StorageOptions {
    /// Options with small-files mode enabled.
    pub fn small_files() -> Self {
        Self {
            small_files: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(HEADER_SIZE % PAGE_SIZE, 0);
    }

    #[test]
    fn test_caps_are_page_aligned() {
        assert_eq!(LARGE_FILE_CAP % PAGE_SIZE as u64, 0);
        assert_eq!((LARGE_FILE_CAP >> SMALL_FILES_SHIFT) % PAGE_SIZE as u64, 0);
        assert!(LARGE_FILE_CAP <= MAX_MAPPED_LENGTH);
    }

    #[test]
    fn test_default_options() {
        let options = StorageOptions::default();
        assert!(!options.small_files);
        assert!(options.prealloc);
        assert!(StorageOptions::small_files().small_files);
    }
}
