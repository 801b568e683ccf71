//! MEGA65 fdisk core library
//!
//! Partitions a block device with an MBR, a MEGA65 system partition and a
//! FAT32 data partition, and allocates contiguous files on the fresh volume.
//! Designed to be no_std compatible; the device is anything implementing
//! `gpt_disk_io::BlockIo` with 512-byte blocks.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(clippy::new_without_default)]
#![allow(clippy::manual_div_ceil)]

pub mod config;
pub mod disk;
pub mod error;
pub mod fs;
pub mod logger;

pub use config::FormatConfig;
pub use disk::layout::DiskLayout;
pub use error::{FdiskError, Result};
pub use fs::fat32_format::{format_disk, has_gaps_between_files, verify_fat32, FormatReport};
pub use fs::fat32_ops::{
    create_contiguous_file, write_contiguous_file, Clock, CreatedFile, Fat32Volume, FixedClock,
    NoClock,
};
