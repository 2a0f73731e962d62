//! Disk location type.

use std::fmt;

/// A logical address into the set of data files: (file ordinal, byte offset).
///
/// Two values are reserved:
/// - [`DiskLoc::NULL`] means "no location".
/// - [`DiskLoc::LEGACY_EMPTY`] is the all-zero pair older files used for
///   "empty" before a proper null existed. Headers still holding it must be
///   upgraded before the null form can be assumed.
///
/// Ordering compares the file ordinal first, then the offset.
///
/// # Example
/// ```
/// use extentstore::DiskLoc;
///
/// let loc = DiskLoc::new(2, 8192);
/// assert!(!loc.is_null());
/// assert_eq!(loc.advance(1000), DiskLoc::new(2, 9192));
/// assert_eq!(loc.to_string(), "2:0x2000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiskLoc {
    file: u32,
    offset: u32,
}

impl DiskLoc {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    /// The "no location" sentinel. The ordinal is -1 when read as `i32`.
    pub const NULL: DiskLoc = DiskLoc {
        file: u32::MAX,
        offset: 0,
    };

    /// The zero pair older files store in place of [`DiskLoc::NULL`].
    pub const LEGACY_EMPTY: DiskLoc = DiskLoc { file: 0, offset: 0 };

    /// Create a location.
    #[inline]
    pub const fn new(file: u32, offset: u32) -> Self {
        DiskLoc { file, offset }
    }

    /// File ordinal.
    #[inline]
    pub fn file(&self) -> u32 {
        self.file
    }

    /// Byte offset within the file.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.file == Self::NULL.file
    }

    #[inline]
    pub fn is_legacy_empty(&self) -> bool {
        *self == Self::LEGACY_EMPTY
    }

    /// Same file, offset moved forward by `len` bytes.
    ///
    /// # Panics
    /// Panics if the offset would overflow 32 bits.
    #[inline]
    pub fn advance(&self, len: u32) -> Self {
        let offset = self
            .offset
            .checked_add(len)
            .expect("disk location offset overflow");
        DiskLoc::new(self.file, offset)
    }

    /// Pack into a single 64-bit value: ordinal in the high half.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        (u64::from(self.file) << 32) | u64::from(self.offset)
    }

    /// Inverse of [`DiskLoc::as_u64`].
    #[inline]
    pub fn from_u64(packed: u64) -> Self {
        DiskLoc::new((packed >> 32) as u32, packed as u32)
    }

    /// Decode from 8 little-endian bytes: ordinal, then offset.
    ///
    /// # Panics
    /// Panics if `data.len() < DiskLoc::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for DiskLoc");
        let file = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let offset = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        DiskLoc { file, offset }
    }

    /// Encode into the first 8 bytes of `data`.
    ///
    /// # Panics
    /// Panics if `data.len() < DiskLoc::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for DiskLoc");
        data[..4].copy_from_slice(&self.file.to_le_bytes());
        data[4..8].copy_from_slice(&self.offset.to_le_bytes());
    }
}

impl Default for DiskLoc {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for DiskLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}:{:#x}", self.file, self.offset)
        }
    }
}
