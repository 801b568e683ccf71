//! Error types for partitioning, formatting and allocation

use core::fmt;

/// Result type for fdisk operations
pub type Result<T> = core::result::Result<T, FdiskError>;

/// Errors that can occur while partitioning, formatting or allocating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdiskError {
    /// I/O error reading or writing the block device
    Io,

    /// Device block size is not 512 bytes
    InvalidBlockSize,

    /// Device cannot hold the reserved area plus both partitions
    DeviceTooSmall,

    /// Name is not a valid 8.3 short name
    InvalidName,

    /// A file with the same short name already exists
    FileExists,

    /// No contiguous run of free clusters is large enough
    NoSpace,

    /// No valid MBR or no FAT32 partition entry
    NotFormatted,

    /// Boot sector failed verification
    InvalidBootSector,

    /// FS information sector failed verification
    InvalidFsInfo,

    /// FAT copies disagree or reserved entries are damaged
    FatMismatch,

    /// A cluster chain points outside the volume
    CorruptChain,
}

impl fmt::Display for FdiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error on block device"),
            Self::InvalidBlockSize => write!(f, "Block size is not 512 bytes"),
            Self::DeviceTooSmall => write!(f, "Device too small for MEGA65 partition layout"),
            Self::InvalidName => write!(f, "Invalid 8.3 file name"),
            Self::FileExists => write!(f, "File already exists"),
            Self::NoSpace => write!(f, "Insufficient contiguous free space"),
            Self::NotFormatted => write!(f, "No FAT32 partition found in MBR"),
            Self::InvalidBootSector => write!(f, "Invalid FAT32 boot sector"),
            Self::InvalidFsInfo => write!(f, "Invalid FS information sector"),
            Self::FatMismatch => write!(f, "FAT copies are inconsistent"),
            Self::CorruptChain => write!(f, "Cluster chain leaves the volume"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FdiskError {}
