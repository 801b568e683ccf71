// FAT entry values and the first sector of a fresh FAT

use crate::disk::sector::{get_u32, put_u32, SectorBuf, SECTOR_SIZE};

pub const FAT_ENTRY_SIZE: usize = 4;
pub const ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / FAT_ENTRY_SIZE) as u32;

/// Only the low 28 bits of an entry are significant.
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const FAT_FREE: u32 = 0;
/// End-of-chain value written for the last cluster of a file.
pub const FAT_EOC: u32 = 0x0FFF_FFF8;
pub const FAT_EOC_MIN: u32 = 0x0FFF_FFF8;

/// Entry 0 carries the media byte, entry 1 the clean-shutdown end marker,
/// entry 2 terminates the single-cluster root directory.
pub const EMPTY_FAT_HEAD: [u32; 3] = [0x0FFF_FFF8, 0x0FFF_FFFF, FAT_EOC];

pub fn is_end_of_chain(entry: u32) -> bool {
    entry & FAT_ENTRY_MASK >= FAT_EOC_MIN
}

/// FAT sector (relative to the FAT start) and byte offset of `cluster`.
pub fn entry_position(cluster: u32) -> (u32, usize) {
    (
        cluster / ENTRIES_PER_SECTOR,
        (cluster % ENTRIES_PER_SECTOR) as usize * FAT_ENTRY_SIZE,
    )
}

pub fn get_entry(buf: &SectorBuf, index: usize) -> u32 {
    get_u32(buf, index * FAT_ENTRY_SIZE)
}

pub fn set_entry(buf: &mut SectorBuf, index: usize, value: u32) {
    put_u32(buf, index * FAT_ENTRY_SIZE, value & FAT_ENTRY_MASK);
}

pub fn build_empty_fat(buf: &mut SectorBuf) {
    buf.fill(0);
    for (i, &value) in EMPTY_FAT_HEAD.iter().enumerate() {
        set_entry(buf, i, value);
    }
}
