// Partition and FAT32 geometry from the raw device size

use crate::config::{
    FAT_COPIES, FAT_PARTITION_START, MAX_SYS_PARTITION_SECTORS, RESERVED_SECTORS,
    SECTORS_PER_CLUSTER,
};
use crate::error::{FdiskError, Result};

/// Smallest device that still yields a 1 MiB-aligned system partition.
pub const MIN_DEVICE_SECTORS: u32 = 6144;

/// Partition sizes are multiples of 1 MiB.
const ALIGNMENT_SECTORS: u32 = 0x0800;

const FAT_ENTRIES_PER_SECTOR: u64 = 512 / 4;

/// FAT entries including the two reserved ones; keeps cluster numbers
/// below the bad-cluster and end-of-chain values.
const MAX_FAT32_CLUSTERS: u64 = 0x0FFF_FFF6;

/// Computed disk geometry. Sector offsets without an `_lba` suffix are
/// relative to the FAT32 partition start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskLayout {
    pub total_sectors: u32,
    pub fat_partition_start: u32,
    pub fat_partition_sectors: u32,
    pub sys_partition_start: u32,
    pub sys_partition_sectors: u32,
    pub reserved_sectors: u32,
    pub sectors_per_cluster: u8,
    /// Partition sectors left after the reserved area.
    pub fat_available_sectors: u32,
    /// FAT entries, counting the two reserved entries.
    pub fs_clusters: u32,
    /// Sectors per FAT copy.
    pub fat_sectors: u32,
}

impl DiskLayout {
    pub fn compute(total_sectors: u32) -> Result<Self> {
        if total_sectors < MIN_DEVICE_SECTORS {
            log::error!(
                "device has {} sectors, at least {} required",
                total_sectors,
                MIN_DEVICE_SECTORS
            );
            return Err(FdiskError::DeviceTooSmall);
        }

        let remaining = total_sectors - FAT_PARTITION_START;
        let sys_partition_sectors =
            (remaining / 2).min(MAX_SYS_PARTITION_SECTORS) & !(ALIGNMENT_SECTORS - 1);
        let fat_partition_sectors = remaining - sys_partition_sectors;
        let fat_available_sectors = fat_partition_sectors - RESERVED_SECTORS;

        let (fs_clusters, fat_sectors) = fit_clusters(fat_available_sectors as u64);

        let layout = Self {
            total_sectors,
            fat_partition_start: FAT_PARTITION_START,
            fat_partition_sectors,
            sys_partition_start: FAT_PARTITION_START + fat_partition_sectors,
            sys_partition_sectors,
            reserved_sectors: RESERVED_SECTORS,
            sectors_per_cluster: SECTORS_PER_CLUSTER,
            fat_available_sectors,
            fs_clusters,
            fat_sectors,
        };

        log::info!(
            "FAT32 partition: {} sectors ({} available), {} clusters, {} sectors/FAT",
            layout.fat_partition_sectors,
            layout.fat_available_sectors,
            layout.fs_clusters,
            layout.fat_sectors
        );
        log::info!(
            "system partition: {} sectors at {:#x}",
            layout.sys_partition_sectors,
            layout.sys_partition_start
        );

        Ok(layout)
    }

    pub fn fat1_sector(&self) -> u32 {
        self.reserved_sectors
    }

    pub fn fat2_sector(&self) -> u32 {
        self.fat1_sector() + self.fat_sectors
    }

    /// First sector of cluster 2, where the root directory lives.
    pub fn root_dir_sector(&self) -> u32 {
        self.fat2_sector() + self.fat_sectors
    }

    pub fn fat1_lba(&self) -> u32 {
        self.fat_partition_start + self.fat1_sector()
    }

    pub fn fat2_lba(&self) -> u32 {
        self.fat_partition_start + self.fat2_sector()
    }

    pub fn root_dir_lba(&self) -> u32 {
        self.fat_partition_start + self.root_dir_sector()
    }

    pub fn data_sectors(&self) -> u32 {
        self.fs_clusters * self.sectors_per_cluster as u32
    }

    /// Free clusters on a fresh volume (the two reserved entries and the
    /// root directory are in use).
    pub fn free_clusters(&self) -> u32 {
        self.fs_clusters - 3
    }

    /// Sectors needed by both FATs plus the data region.
    pub fn sectors_required(&self) -> u32 {
        sectors_required(self.fs_clusters as u64, self.fat_sectors as u64) as u32
    }

    pub fn fat_size_mb(&self) -> u32 {
        (self.fat_partition_sectors + 1) / 2048
    }

    pub fn sys_size_mb(&self) -> u32 {
        (self.sys_partition_sectors + 1) / 2048
    }
}

fn fat_sectors_for(clusters: u64) -> u64 {
    (clusters + FAT_ENTRIES_PER_SECTOR - 1) / FAT_ENTRIES_PER_SECTOR
}

fn sectors_required(clusters: u64, fat_sectors: u64) -> u64 {
    FAT_COPIES as u64 * fat_sectors + (clusters - 2) * SECTORS_PER_CLUSTER as u64
}

/// Shrink the cluster count until both FATs and the data region fit.
/// Each pass removes at least one cluster, so the loop ends.
fn fit_clusters(available: u64) -> (u32, u32) {
    let spc = SECTORS_PER_CLUSTER as u64;
    let mut clusters = (available / spc).min(MAX_FAT32_CLUSTERS);
    let mut fat_sectors = fat_sectors_for(clusters);
    let mut required = sectors_required(clusters, fat_sectors);

    while required > available {
        let excess = required - available;
        let delta = (excess / (1 + spc)).max(1);
        log::debug!(
            "{} clusters would take {} too many sectors",
            clusters,
            excess
        );
        clusters -= delta;
        fat_sectors = fat_sectors_for(clusters);
        required = sectors_required(clusters, fat_sectors);
    }

    (clusters as u32, fat_sectors as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZES: [u32; 9] = [
        MIN_DEVICE_SECTORS,
        MIN_DEVICE_SECTORS + 1,
        8192,
        131_072,
        524_288,
        4_000_000,
        31_250_000,
        123_456_789,
        u32::MAX,
    ];

    #[test]
    fn test_256mb_card() {
        let layout = DiskLayout::compute(524_288).unwrap();
        assert_eq!(layout.fat_partition_start, 2048);
        assert_eq!(layout.fat_partition_sectors, 262_144);
        assert_eq!(layout.sys_partition_sectors, 260_096);
        assert_eq!(layout.sys_partition_start, 2048 + 262_144);
        assert_eq!(layout.fs_clusters, 32_635);
        assert_eq!(layout.fat_sectors, 255);
        assert_eq!(layout.fat1_sector(), 568);
        assert_eq!(layout.fat2_sector(), 568 + 255);
        assert_eq!(layout.root_dir_sector(), 568 + 510);
        assert_eq!(layout.root_dir_lba(), 2048 + 568 + 510);
    }

    #[test]
    fn test_partitions_cover_device() {
        for &n in SIZES.iter() {
            let layout = DiskLayout::compute(n).unwrap();
            assert_eq!(
                layout.sys_partition_sectors + layout.fat_partition_sectors + 2048,
                n,
                "size {}",
                n
            );
            assert_eq!(layout.sys_partition_sectors % 2048, 0);
            assert!(layout.sys_partition_sectors <= layout.fat_partition_sectors);
            assert!(layout.sys_partition_sectors <= MAX_SYS_PARTITION_SECTORS);
        }
    }

    #[test]
    fn test_fats_and_data_fit() {
        for &n in SIZES.iter() {
            let layout = DiskLayout::compute(n).unwrap();
            assert!(
                layout.sectors_required() <= layout.fat_available_sectors,
                "size {}",
                n
            );
            assert!(layout.fat_sectors * 128 >= layout.fs_clusters);
            assert!(layout.fs_clusters as u64 <= MAX_FAT32_CLUSTERS);
        }
    }

    #[test]
    fn test_system_partition_capped_at_2gib() {
        let layout = DiskLayout::compute(31_250_000).unwrap();
        assert_eq!(layout.sys_partition_sectors, MAX_SYS_PARTITION_SECTORS);
        assert_eq!(layout.fs_clusters, 3_375_045);
        assert_eq!(layout.fat_sectors, 26_368);
    }

    #[test]
    fn test_cluster_count_capped() {
        let layout = DiskLayout::compute(u32::MAX).unwrap();
        assert_eq!(layout.fs_clusters as u64, MAX_FAT32_CLUSTERS);
        assert_eq!(layout.fat_sectors, 2_097_152);
    }

    #[test]
    fn test_minimum_device() {
        let layout = DiskLayout::compute(MIN_DEVICE_SECTORS).unwrap();
        assert_eq!(layout.sys_partition_sectors, 2048);
        assert_eq!(layout.fat_partition_sectors, 2048);
        assert_eq!(layout.fs_clusters, 185);
        assert_eq!(layout.fat_sectors, 2);
    }

    #[test]
    fn test_too_small_devices_rejected() {
        for n in [0, 1, 2047, 2048, 4096, MIN_DEVICE_SECTORS - 1] {
            assert_eq!(DiskLayout::compute(n), Err(FdiskError::DeviceTooSmall));
        }
    }

    #[test]
    fn test_free_clusters() {
        let layout = DiskLayout::compute(524_288).unwrap();
        assert_eq!(layout.free_clusters(), 32_632);
        assert_eq!(layout.data_sectors(), 32_635 * 8);
    }
}
