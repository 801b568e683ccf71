// FAT32 volume checks after formatting or allocation

use gpt_disk_io::BlockIo;

use super::boot_sector::{
    BootSector, BACKUP_BOOT_SECTOR, FS_INFO_SECTOR, FS_TYPE, OEM_NAME, ROOT_CLUSTER,
};
use super::fat_table::{entry_position, get_entry, is_end_of_chain, ENTRIES_PER_SECTOR, FAT_FREE};
use super::fs_info::FsInfo;
use crate::config::FAT_COPIES;
use crate::disk::sector::{read_sector, SECTOR_SIZE};
use crate::error::{FdiskError, Result};
use crate::fs::fat32_ops::Fat32Volume;

const MEDIA_ENTRY: u32 = 0x0FFF_FFF8;

/// Verify the FAT32 structures of the partition starting at
/// `partition_lba`. Returns the parsed boot sector on success.
pub fn verify_fat32<B: BlockIo>(block_io: &mut B, partition_lba: u32) -> Result<BootSector> {
    let mut boot = [0u8; SECTOR_SIZE];
    let mut buffer = [0u8; SECTOR_SIZE];

    read_sector(block_io, partition_lba, &mut boot)?;
    let bs = BootSector::from_sector(&boot).ok_or_else(|| {
        log::warn!("boot sector at {} has no signature", partition_lba);
        FdiskError::InvalidBootSector
    })?;

    if bs.oem_name != OEM_NAME || bs.fs_type != FS_TYPE {
        log::warn!("boot sector OEM or file system type mismatch");
        return Err(FdiskError::InvalidBootSector);
    }
    if bs.bytes_per_sector as usize != SECTOR_SIZE {
        return Err(FdiskError::InvalidBlockSize);
    }
    if bs.sectors_per_cluster == 0
        || !bs.sectors_per_cluster.is_power_of_two()
        || bs.num_fats as u32 != FAT_COPIES
        || bs.fat_sectors == 0
        || bs.root_cluster != ROOT_CLUSTER
        || bs.fs_info_sector != FS_INFO_SECTOR
        || bs.backup_boot_sector != BACKUP_BOOT_SECTOR
        || bs.data_start_sector() >= bs.total_sectors
    {
        log::warn!("boot sector geometry is not valid: {:?}", bs);
        return Err(FdiskError::InvalidBootSector);
    }

    read_sector(
        block_io,
        partition_lba + bs.backup_boot_sector as u32,
        &mut buffer,
    )?;
    if buffer != boot {
        log::warn!("backup boot sector differs from primary");
        return Err(FdiskError::InvalidBootSector);
    }

    for offset in [bs.fs_info_sector as u32, bs.backup_boot_sector as u32 + 1] {
        read_sector(block_io, partition_lba + offset, &mut buffer)?;
        if FsInfo::from_sector(&buffer).is_none() {
            log::warn!("FS information sector at +{} is damaged", offset);
            return Err(FdiskError::InvalidFsInfo);
        }
    }

    let fat1 = partition_lba + bs.reserved_sectors as u32;
    let fat2 = fat1 + bs.fat_sectors;
    read_sector(block_io, fat1, &mut boot)?;
    read_sector(block_io, fat2, &mut buffer)?;
    if boot != buffer {
        log::warn!("first sectors of FAT #1 and FAT #2 differ");
        return Err(FdiskError::FatMismatch);
    }
    if get_entry(&boot, 0) != MEDIA_ENTRY
        || !is_end_of_chain(get_entry(&boot, 1))
        || get_entry(&boot, bs.root_cluster as usize) == FAT_FREE
    {
        log::warn!("reserved FAT entries are damaged");
        return Err(FdiskError::FatMismatch);
    }

    log::info!(
        "FAT32 volume at {} verified: {} sectors, {} sectors/FAT",
        partition_lba,
        bs.total_sectors,
        bs.fat_sectors
    );
    Ok(bs)
}

/// Scan FAT #1 for a free cluster followed by an allocated one. On a
/// volume where files were only ever created contiguously this never
/// happens.
pub fn has_gaps_between_files<B: BlockIo>(block_io: &mut B, volume: &Fat32Volume) -> Result<bool> {
    let mut buffer = [0u8; SECTOR_SIZE];
    let (last_sector, _) = entry_position(volume.cluster_count - 1);
    let mut seen_free = false;

    for fat_sector in 0..=last_sector {
        read_sector(block_io, volume.fat1_lba + fat_sector, &mut buffer)?;
        let first = fat_sector * ENTRIES_PER_SECTOR;
        for index in 0..ENTRIES_PER_SECTOR {
            let cluster = first + index;
            if cluster < 2 {
                continue;
            }
            if cluster >= volume.cluster_count {
                break;
            }
            if get_entry(&buffer, index as usize) == FAT_FREE {
                seen_free = true;
            } else if seen_free {
                log::warn!("cluster {} is allocated after a free cluster", cluster);
                return Ok(true);
            }
        }
    }

    Ok(false)
}
