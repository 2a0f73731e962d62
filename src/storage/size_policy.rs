//! Data file size policy.
//!
//! File sizes grow geometrically with the file ordinal: early files stay
//! cheap, later files are large, and no file exceeds what the address space
//! or the small-files setting allows.
//!
//! ```text
//! file_no:   0     1      2      3      4       5+
//! size:     64MB  128MB  256MB  512MB  1024MB  ~2047MB   (÷4 with small files)
//! ```

use crate::common::config::{
    StorageOptions, LARGE_FILE_CAP, MIN_FILE_SIZE, NARROW_MAX_SIZE, PAGE_SIZE, SMALL_FILES_SHIFT,
};
use crate::common::{FatalError, Result};

/// Highest ordinal whose default size is still a power-of-two multiple of 64MB.
const LAST_GROWING_FILE_NO: u32 = 4;

/// Computes data file sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    small_files: bool,
    narrow_address_space: bool,
}

impl SizePolicy {
    /// Policy for this build's address width.
    pub fn new(options: &StorageOptions) -> Self {
        Self {
            small_files: options.small_files,
            narrow_address_space: cfg!(target_pointer_width = "32"),
        }
    }

    /// Policy for an explicit address width.
    pub fn with_address_space(options: &StorageOptions, narrow_address_space: bool) -> Self {
        Self {
            small_files: options.small_files,
            narrow_address_space,
        }
    }

    #[inline]
    pub fn small_files(&self) -> bool {
        self.small_files
    }

    #[inline]
    pub fn narrow_address_space(&self) -> bool {
        self.narrow_address_space
    }

    /// Largest size any data file may have.
    pub fn max_size(&self) -> u64 {
        if self.narrow_address_space {
            NARROW_MAX_SIZE
        } else if self.small_files {
            LARGE_FILE_CAP >> SMALL_FILES_SHIFT
        } else {
            LARGE_FILE_CAP
        }
    }

    /// Size a file gets when nothing forces it to be larger.
    pub fn default_size(&self, file_no: u32) -> u64 {
        let size = if file_no <= LAST_GROWING_FILE_NO {
            MIN_FILE_SIZE << file_no
        } else {
            LARGE_FILE_CAP
        };

        if self.small_files {
            size >> SMALL_FILES_SHIFT
        } else {
            size
        }
    }

    /// Size to create file `file_no` with so it holds at least `min_size` bytes.
    ///
    /// Doubles the default size until it fits; once doubling would pass half
    /// of [`max_size`](Self::max_size) it jumps straight to the maximum.
    /// If `min_size` exceeds the maximum the result is the maximum.
    ///
    /// # Errors
    /// Fatal if the result is not page aligned, or below 64MB outside
    /// small-files mode.
    pub fn open_size(&self, file_no: u32, min_size: u64) -> Result<u64> {
        let max = self.max_size();
        let mut size = self.default_size(file_no);

        while size < min_size {
            if size < max / 2 {
                size *= 2;
            } else {
                size = max;
                break;
            }
        }
        size = size.min(max);

        if size < MIN_FILE_SIZE && !self.small_files {
            return Err(FatalError::InvalidSize {
                size,
                reason: "below minimum data file size",
            }
            .into());
        }
        if size % PAGE_SIZE as u64 != 0 {
            return Err(FatalError::InvalidSize {
                size,
                reason: "not a multiple of the page size",
            }
            .into());
        }

        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MB: u64 = 1024 * 1024;

    fn wide() -> SizePolicy {
        SizePolicy::with_address_space(&StorageOptions::default(), false)
    }

    fn wide_small() -> SizePolicy {
        SizePolicy::with_address_space(&StorageOptions::small_files(), false)
    }

    fn narrow() -> SizePolicy {
        SizePolicy::with_address_space(&StorageOptions::default(), true)
    }

    // --- max_size ---

    #[test]
    fn test_max_size() {
        assert_eq!(wide().max_size(), 0x7ff0_0000);
        assert_eq!(wide_small().max_size(), 0x7ff0_0000 >> 2);
        assert_eq!(narrow().max_size(), 512 * MB);
    }

    #[test]
    fn test_narrow_max_ignores_small_files() {
        let policy = SizePolicy::with_address_space(&StorageOptions::small_files(), true);
        assert_eq!(policy.max_size(), 512 * MB);
    }

    // --- default_size ---

    #[test]
    fn test_default_sizes() {
        let policy = wide();
        assert_eq!(policy.default_size(0), 64 * MB);
        assert_eq!(policy.default_size(1), 128 * MB);
        assert_eq!(policy.default_size(2), 256 * MB);
        assert_eq!(policy.default_size(3), 512 * MB);
        assert_eq!(policy.default_size(4), 1024 * MB);
        assert_eq!(policy.default_size(5), 0x7ff0_0000);
        assert_eq!(policy.default_size(1000), 0x7ff0_0000);
    }

    #[test]
    fn test_default_sizes_small_files() {
        let policy = wide_small();
        assert_eq!(policy.default_size(0), 16 * MB);
        assert_eq!(policy.default_size(4), 256 * MB);
        assert_eq!(policy.default_size(5), 0x7ff0_0000 >> 2);
    }

    // --- open_size ---

    #[test]
    fn test_open_size_uses_default() {
        assert_eq!(wide().open_size(2, 0).unwrap(), 256 * MB);
        assert_eq!(wide().open_size(0, 64 * MB).unwrap(), 64 * MB);
    }

    #[test]
    fn test_open_size_doubles() {
        assert_eq!(wide().open_size(0, 64 * MB + 1).unwrap(), 128 * MB);
        assert_eq!(wide().open_size(0, 300 * MB).unwrap(), 512 * MB);
    }

    #[test]
    fn test_open_size_jumps_to_max() {
        // 1024MB is past half of the cap, so the next step is the cap itself.
        assert_eq!(wide().open_size(4, 1024 * MB + 1).unwrap(), 0x7ff0_0000);
        assert_eq!(wide().open_size(0, 1500 * MB).unwrap(), 0x7ff0_0000);
    }

    #[test]
    fn test_open_size_clamps_to_max() {
        assert_eq!(wide().open_size(0, u64::MAX).unwrap(), 0x7ff0_0000);
        assert_eq!(narrow().open_size(5, 0).unwrap(), 512 * MB);
        assert_eq!(narrow().open_size(4, 0).unwrap(), 512 * MB);
    }

    #[test]
    fn test_open_size_small_files() {
        assert_eq!(wide_small().open_size(0, 0).unwrap(), 16 * MB);
        assert_eq!(wide_small().open_size(0, 17 * MB).unwrap(), 32 * MB);
    }

    proptest! {
        #[test]
        fn prop_open_size_guarantees(
            file_no in 0u32..64,
            min_size in 0u64..(3 * 1024 * MB),
            small_files in any::<bool>(),
            narrow_space in any::<bool>(),
        ) {
            let options = StorageOptions { small_files, prealloc: true };
            let policy = SizePolicy::with_address_space(&options, narrow_space);
            let size = policy.open_size(file_no, min_size).unwrap();

            prop_assert_eq!(size % PAGE_SIZE as u64, 0);
            prop_assert!(size <= policy.max_size());
            if !small_files {
                prop_assert!(size >= MIN_FILE_SIZE);
            }
            if min_size <= policy.max_size() {
                prop_assert!(size >= min_size);
            }
        }
    }
}
