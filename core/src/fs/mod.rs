// Filesystem operations

pub mod fat32_format;
pub mod fat32_ops;

pub use fat32_format::{format_disk, has_gaps_between_files, verify_fat32, FormatReport};
pub use fat32_ops::{create_contiguous_file, write_contiguous_file, Fat32Volume};
