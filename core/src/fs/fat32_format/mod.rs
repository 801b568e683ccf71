// FAT32 structure builders and the format orchestrator

pub mod boot_sector;
pub mod fat_table;
mod format;
pub mod fs_info;
pub mod root_dir;
mod verify;

pub use boot_sector::{build_dos_boot_sector, BootSector};
pub use fat_table::build_empty_fat;
pub use format::{format_disk, FormatReport};
pub use fs_info::{build_fs_information_sector, FsInfo};
pub use root_dir::build_root_dir;
pub use verify::{has_gaps_between_files, verify_fat32};
