// Whole-device format: MBR, system partition, FAT32 partition

use gpt_disk_io::BlockIo;

use super::boot_sector::{BootSector, BACKUP_BOOT_SECTOR, FS_INFO_SECTOR};
use super::fat_table::build_empty_fat;
use super::fs_info::FsInfo;
use super::root_dir::build_root_dir;
use crate::config::FormatConfig;
use crate::disk::layout::DiskLayout;
use crate::disk::mbr::MasterBootRecord;
use crate::disk::sector::{self, erase_range, write_sector, SECTOR_SIZE};
use crate::disk::system::{build_mega65_sys_sector, SystemPartitionHeader};
use crate::error::{FdiskError, Result};

/// Sectors of the system partition configuration area zeroed after the
/// header.
const SYS_CONFIG_ERASE_SECTORS: u32 = 1023;

const BACKUP_FS_INFO_SECTOR: u32 = BACKUP_BOOT_SECTOR as u32 + 1;

/// What a format run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatReport {
    pub layout: DiskLayout,
    pub system: SystemPartitionHeader,
}

/// Partition and format the whole device.
///
/// Writes, in order: the MBR, the system partition header (and clears its
/// configuration area and slot directories), both boot sectors, both FS
/// information sectors, the first sector of each FAT and the first root
/// directory sector. With `clear_structures` the remaining reserved
/// sectors, FAT sectors and root cluster sectors are zeroed afterwards.
///
/// Nothing is written when the device, or a fixed `sector_count` that
/// does not fit on it, is too small.
pub fn format_disk<B: BlockIo>(block_io: &mut B, config: &FormatConfig) -> Result<FormatReport> {
    sector::check_block_size(block_io)?;
    let total_sectors = match config.sector_count {
        Some(count) => {
            let device_sectors = sector::sector_count(block_io)?;
            if count > device_sectors {
                log::error!(
                    "fixed size of {} sectors exceeds the device's {}",
                    count,
                    device_sectors
                );
                return Err(FdiskError::DeviceTooSmall);
            }
            log::info!("using fixed size of {} sectors", count);
            count
        }
        None => sector::sector_count(block_io)?,
    };

    let layout = DiskLayout::compute(total_sectors)?;
    let mut buf = [0u8; SECTOR_SIZE];

    log::info!("writing partition table");
    MasterBootRecord::mega65(&layout).write_to(&mut buf);
    write_sector(block_io, 0, &buf)?;

    let system = write_system_partition(block_io, &layout, config, &mut buf)?;
    write_fat32_partition(block_io, &layout, config, &mut buf)?;

    if config.clear_structures {
        clear_fat32_structures(block_io, &layout)?;
    }

    sector::flush(block_io)?;
    log::info!(
        "format complete: {} MiB FAT32, {} MiB system partition",
        layout.fat_size_mb(),
        layout.sys_size_mb()
    );

    Ok(FormatReport { layout, system })
}

fn write_system_partition<B: BlockIo>(
    block_io: &mut B,
    layout: &DiskLayout,
    config: &FormatConfig,
    buf: &mut sector::SectorBuf,
) -> Result<SystemPartitionHeader> {
    let sys_start = layout.sys_partition_start;
    let sys_end = sys_start + (layout.sys_partition_sectors - 1);

    log::info!("writing MEGA65 system partition header");
    let header = build_mega65_sys_sector(buf, layout.sys_partition_sectors);
    write_sector(block_io, sys_start, buf)?;

    if config.erase_system_areas {
        log::info!("clearing system partition configuration area");
        erase_range(
            block_io,
            sys_start + 1,
            (sys_start + SYS_CONFIG_ERASE_SECTORS).min(sys_end),
        )?;

        let dir_sectors = header.freeze.dir_sectors as u32;
        log::info!("clearing freeze and service slot directories");
        for dir in [
            header.freeze_dir_lba(sys_start),
            header.service_dir_lba(sys_start),
        ] {
            // A partition without slots has its directory at the partition end
            if dir <= sys_end {
                erase_range(block_io, dir, (dir + dir_sectors - 1).min(sys_end))?;
            }
        }
    }

    Ok(header)
}

fn write_fat32_partition<B: BlockIo>(
    block_io: &mut B,
    layout: &DiskLayout,
    config: &FormatConfig,
    buf: &mut sector::SectorBuf,
) -> Result<()> {
    let start = layout.fat_partition_start;

    log::info!("writing FAT32 boot sector and backup");
    BootSector::for_layout(layout, config.volume_id, config.volume_label).to_sector(buf);
    write_sector(block_io, start, buf)?;
    write_sector(block_io, start + BACKUP_BOOT_SECTOR as u32, buf)?;

    log::info!("writing FAT32 FS information sector and backup");
    FsInfo::fresh(layout.fs_clusters).to_sector(buf);
    write_sector(block_io, start + FS_INFO_SECTOR as u32, buf)?;
    write_sector(block_io, start + BACKUP_FS_INFO_SECTOR, buf)?;

    log::info!("writing FAT #1 and FAT #2");
    build_empty_fat(buf);
    write_sector(block_io, layout.fat1_lba(), buf)?;
    write_sector(block_io, layout.fat2_lba(), buf)?;

    log::info!("writing root directory");
    build_root_dir(buf, config.volume_label);
    write_sector(block_io, layout.root_dir_lba(), buf)?;

    Ok(())
}

/// Zero everything between and behind the structures just written so
/// stale data from a previous file system cannot leak through.
fn clear_fat32_structures<B: BlockIo>(block_io: &mut B, layout: &DiskLayout) -> Result<()> {
    let start = layout.fat_partition_start;
    let spc = layout.sectors_per_cluster as u32;

    log::info!("clearing reserved sectors");
    erase_range(
        block_io,
        start + FS_INFO_SECTOR as u32 + 1,
        start + BACKUP_BOOT_SECTOR as u32 - 1,
    )?;
    erase_range(block_io, start + BACKUP_FS_INFO_SECTOR + 1, layout.fat1_lba() - 1)?;

    log::info!("clearing FAT #1 and FAT #2");
    for fat in [layout.fat1_lba(), layout.fat2_lba()] {
        erase_range(block_io, fat + 1, fat + layout.fat_sectors - 1)?;
    }

    log::info!("clearing root directory cluster");
    let root = layout.root_dir_lba();
    erase_range(block_io, root + 1, root + spc - 1)
}
