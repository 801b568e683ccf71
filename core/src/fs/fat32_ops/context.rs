// FAT32 volume geometry and FAT access

use gpt_disk_io::BlockIo;

use crate::config::FAT_COPIES;
use crate::disk::layout::DiskLayout;
use crate::disk::mbr::read_partition_table;
use crate::disk::sector::{read_sector, write_sector, SectorBuf, SECTOR_SIZE};
use crate::error::{FdiskError, Result};
use crate::fs::fat32_format::boot_sector::BootSector;
use crate::fs::fat32_format::fat_table::{
    entry_position, get_entry, set_entry, ENTRIES_PER_SECTOR, FAT_EOC, FAT_ENTRY_MASK, FAT_FREE,
};

/// Highest FAT entry count; larger values collide with the bad-cluster
/// and end-of-chain markers.
const MAX_CLUSTER_ENTRIES: u64 = 0x0FFF_FFF6;

/// An opened FAT32 volume. All sector numbers are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fat32Volume {
    pub partition_start: u32,
    pub sectors_per_cluster: u32,
    pub fat_sectors: u32,
    pub fat1_lba: u32,
    pub fat2_lba: u32,
    /// First sector of cluster 2.
    pub data_lba: u32,
    pub root_cluster: u32,
    /// FAT entries in use, counting the two reserved ones. Valid cluster
    /// numbers are `2..cluster_count`.
    pub cluster_count: u32,
}

impl Fat32Volume {
    /// Volume exactly as `format_disk` lays it out.
    pub fn from_layout(layout: &DiskLayout) -> Self {
        Self {
            partition_start: layout.fat_partition_start,
            sectors_per_cluster: layout.sectors_per_cluster as u32,
            fat_sectors: layout.fat_sectors,
            fat1_lba: layout.fat1_lba(),
            fat2_lba: layout.fat2_lba(),
            data_lba: layout.root_dir_lba(),
            root_cluster: 2,
            cluster_count: layout.fs_clusters,
        }
    }

    /// Open the volume from the boot sector at `partition_start`.
    pub fn from_partition<B: BlockIo>(block_io: &mut B, partition_start: u32) -> Result<Self> {
        let mut buf = [0u8; SECTOR_SIZE];
        read_sector(block_io, partition_start, &mut buf)?;

        let bs = BootSector::from_sector(&buf).ok_or(FdiskError::InvalidBootSector)?;
        if bs.bytes_per_sector as usize != SECTOR_SIZE
            || bs.sectors_per_cluster == 0
            || bs.num_fats as u32 != FAT_COPIES
            || bs.fat_sectors == 0
            || bs.data_start_sector() >= bs.total_sectors
        {
            log::warn!("partition at {} is not a usable FAT32 volume", partition_start);
            return Err(FdiskError::InvalidBootSector);
        }

        let spc = bs.sectors_per_cluster as u64;
        let data_clusters = (bs.total_sectors - bs.data_start_sector()) as u64 / spc + 2;
        let fat_entries = bs.fat_sectors as u64 * ENTRIES_PER_SECTOR as u64;
        let cluster_count = data_clusters.min(fat_entries).min(MAX_CLUSTER_ENTRIES) as u32;

        let fat1_lba = partition_start + bs.reserved_sectors as u32;
        Ok(Self {
            partition_start,
            sectors_per_cluster: bs.sectors_per_cluster as u32,
            fat_sectors: bs.fat_sectors,
            fat1_lba,
            fat2_lba: fat1_lba + bs.fat_sectors,
            data_lba: partition_start + bs.data_start_sector(),
            root_cluster: bs.root_cluster,
            cluster_count,
        })
    }

    /// Find the FAT32 partition through the MBR and open it.
    pub fn locate<B: BlockIo>(block_io: &mut B) -> Result<Self> {
        let mbr = read_partition_table(block_io)?.ok_or(FdiskError::NotFormatted)?;
        let partition = mbr.find_fat32().ok_or(FdiskError::NotFormatted)?;
        log::debug!(
            "FAT32 partition {} at sector {}",
            partition.index,
            partition.start_lba
        );
        Self::from_partition(block_io, partition.start_lba)
    }

    pub fn cluster_bytes(&self) -> u32 {
        self.sectors_per_cluster * SECTOR_SIZE as u32
    }

    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster < self.cluster_count
    }

    /// Absolute first sector of `cluster`.
    pub fn cluster_to_sector(&self, cluster: u32) -> u32 {
        self.data_lba + (cluster - 2) * self.sectors_per_cluster
    }

    /// Raw next-pointer stored for `cluster` in FAT #1.
    pub fn follow_cluster<B: BlockIo>(&self, block_io: &mut B, cluster: u32) -> Result<u32> {
        let (sector, offset) = entry_position(cluster);
        let mut buf = [0u8; SECTOR_SIZE];
        read_sector(block_io, self.fat1_lba + sector, &mut buf)?;
        Ok(get_entry(&buf, offset / 4) & FAT_ENTRY_MASK)
    }

    pub fn is_free_cluster<B: BlockIo>(&self, block_io: &mut B, cluster: u32) -> Result<bool> {
        Ok(self.follow_cluster(block_io, cluster)? == FAT_FREE)
    }

    /// Lowest free cluster at or after `hint`, or `None` when the rest of
    /// the FAT is allocated.
    pub fn find_free_cluster<B: BlockIo>(
        &self,
        block_io: &mut B,
        hint: u32,
    ) -> Result<Option<u32>> {
        let mut reader = FatReader::new(self.fat1_lba);
        for cluster in hint.max(2)..self.cluster_count {
            if reader.entry(block_io, cluster)? == FAT_FREE {
                return Ok(Some(cluster));
            }
        }
        Ok(None)
    }

    /// Lowest start cluster of `count` consecutive free clusters.
    pub fn find_contiguous_clusters<B: BlockIo>(
        &self,
        block_io: &mut B,
        count: u32,
    ) -> Result<u32> {
        if count == 0 {
            return Err(FdiskError::NoSpace);
        }

        let mut reader = FatReader::new(self.fat1_lba);
        let mut hint = 2;
        loop {
            let start = match self.find_free_cluster(block_io, hint)? {
                Some(start) => start,
                None => break,
            };
            if start as u64 + count as u64 > self.cluster_count as u64 {
                break;
            }

            let mut run = 1;
            while run < count && reader.entry(block_io, start + run)? == FAT_FREE {
                run += 1;
            }
            if run == count {
                log::debug!("{} free clusters at {}", count, start);
                return Ok(start);
            }
            // start + run is allocated, so the next candidate lies beyond it
            hint = start + run + 1;
        }

        log::warn!("no run of {} free clusters", count);
        Err(FdiskError::NoSpace)
    }

    /// Point `cluster` at `value` in both FATs.
    pub fn set_fat_entry<B: BlockIo>(
        &self,
        block_io: &mut B,
        cluster: u32,
        value: u32,
    ) -> Result<()> {
        let (sector, offset) = entry_position(cluster);
        let mut buf = [0u8; SECTOR_SIZE];
        read_sector(block_io, self.fat1_lba + sector, &mut buf)?;
        set_entry(&mut buf, offset / 4, value);
        self.write_fat_sector(block_io, sector, &buf)
    }

    /// Chain `start..start + count` in order, ending with end-of-chain.
    pub fn write_chain<B: BlockIo>(&self, block_io: &mut B, start: u32, count: u32) -> Result<()> {
        let end = start + count;
        let mut buf = [0u8; SECTOR_SIZE];
        let mut cluster = start;

        while cluster < end {
            let (sector, _) = entry_position(cluster);
            read_sector(block_io, self.fat1_lba + sector, &mut buf)?;

            let sector_end = ((sector + 1) * ENTRIES_PER_SECTOR).min(end);
            while cluster < sector_end {
                let next = if cluster + 1 == end {
                    FAT_EOC
                } else {
                    cluster + 1
                };
                set_entry(&mut buf, (cluster % ENTRIES_PER_SECTOR) as usize, next);
                cluster += 1;
            }

            self.write_fat_sector(block_io, sector, &buf)?;
        }
        Ok(())
    }

    /// Claim the lowest free cluster at or after `hint` as a one-cluster
    /// chain.
    pub fn allocate_cluster<B: BlockIo>(&self, block_io: &mut B, hint: u32) -> Result<u32> {
        let cluster = self
            .find_free_cluster(block_io, hint)?
            .ok_or(FdiskError::NoSpace)?;
        self.set_fat_entry(block_io, cluster, FAT_EOC)?;
        Ok(cluster)
    }

    /// Same sector contents to FAT #1 and FAT #2.
    fn write_fat_sector<B: BlockIo>(
        &self,
        block_io: &mut B,
        sector: u32,
        buf: &SectorBuf,
    ) -> Result<()> {
        write_sector(block_io, self.fat1_lba + sector, buf)?;
        write_sector(block_io, self.fat2_lba + sector, buf)
    }
}

/// FAT #1 reader that keeps the last sector it loaded.
struct FatReader {
    fat_lba: u32,
    loaded: Option<u32>,
    buf: SectorBuf,
}

impl FatReader {
    fn new(fat_lba: u32) -> Self {
        Self {
            fat_lba,
            loaded: None,
            buf: [0u8; SECTOR_SIZE],
        }
    }

    fn entry<B: BlockIo>(&mut self, block_io: &mut B, cluster: u32) -> Result<u32> {
        let (sector, offset) = entry_position(cluster);
        if self.loaded != Some(sector) {
            read_sector(block_io, self.fat_lba + sector, &mut self.buf)?;
            self.loaded = Some(sector);
        }
        Ok(get_entry(&self.buf, offset / 4) & FAT_ENTRY_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_layout() {
        let layout = DiskLayout::compute(524_288).unwrap();
        let volume = Fat32Volume::from_layout(&layout);
        assert_eq!(volume.fat1_lba, 2048 + 568);
        assert_eq!(volume.fat2_lba, 2048 + 568 + 255);
        assert_eq!(volume.data_lba, 2048 + 568 + 510);
        assert_eq!(volume.cluster_to_sector(2), volume.data_lba);
        assert_eq!(volume.cluster_to_sector(5), volume.data_lba + 24);
        assert_eq!(volume.cluster_bytes(), 4096);
        assert!(volume.is_valid_cluster(2));
        assert!(!volume.is_valid_cluster(32_635));
    }
}
