//! Whole-device format tests

mod common;

use common::{BrokenDisk, LargeSectorDisk, MemoryDisk};
use m65fdisk_core::disk::mbr::read_partition_table;
use m65fdisk_core::disk::partition::PartitionType;
use m65fdisk_core::disk::system::SystemPartitionHeader;
use m65fdisk_core::fs::fat32_format::{BootSector, FsInfo};
use m65fdisk_core::{format_disk, FdiskError, FormatConfig};

const FAT_START: u32 = 2048;
const FAT1: u32 = FAT_START + 568;
const FAT2: u32 = FAT1 + 255;
const ROOT: u32 = FAT2 + 255;
const SYS_START: u32 = FAT_START + 262_144;

#[test]
fn test_format_256mb_card() {
    let mut disk = MemoryDisk::card_256mb();
    let report = format_disk(&mut disk, &FormatConfig::default()).expect("format");

    assert_eq!(report.layout.fat_partition_start, FAT_START);
    assert_eq!(report.layout.fat_partition_sectors, 262_144);
    assert_eq!(report.layout.sys_partition_start, SYS_START);
    assert_eq!(report.layout.sys_partition_sectors, 260_096);
    assert_eq!(report.system.slot_count(), 201);

    let mbr = disk.sector(0);
    assert_eq!(&mbr[0x1B8..0x1BC], &[0x83, 0x7D, 0xCB, 0xA6]);
    assert_eq!(mbr[0x1C2], 0x41);
    assert_eq!(&mbr[0x1C6..0x1CA], &SYS_START.to_le_bytes());
    assert_eq!(&mbr[0x1CA..0x1CE], &260_096u32.to_le_bytes());
    assert_eq!(mbr[0x1D2], 0x0C);
    assert_eq!(&mbr[0x1D6..0x1DA], &FAT_START.to_le_bytes());
    assert_eq!(&mbr[0x1DA..0x1DE], &262_144u32.to_le_bytes());
    assert_eq!(&mbr[510..], &[0x55, 0xAA]);

    let boot = disk.sector(FAT_START);
    assert_eq!(disk.sector(FAT_START + 6), boot);
    let bs = BootSector::from_sector(&boot).expect("boot sector");
    assert_eq!(&bs.oem_name, b"MEGA65r1");
    assert_eq!(bs.total_sectors, 262_144);
    assert_eq!(bs.fat_sectors, 255);
    assert_eq!(&bs.volume_label, b"M.E.G.A.65!");

    let fs_info = disk.sector(FAT_START + 1);
    assert_eq!(disk.sector(FAT_START + 7), fs_info);
    assert_eq!(
        FsInfo::from_sector(&fs_info),
        Some(FsInfo {
            free_clusters: 32_632,
            next_free: 3
        })
    );

    let fat_head = [
        0xF8, 0xFF, 0xFF, 0x0F, 0xFF, 0xFF, 0xFF, 0x0F, 0xF8, 0xFF, 0xFF, 0x0F,
    ];
    assert_eq!(&disk.sector(FAT1)[..12], &fat_head);
    assert_eq!(&disk.sector(FAT2)[..12], &fat_head);

    let root = disk.sector(ROOT);
    assert_eq!(&root[..11], b"M.E.G.A.65!");
    assert_eq!(root[11], 0x08);

    let header = SystemPartitionHeader::read_from(&disk.sector(SYS_START)).expect("header");
    assert_eq!(header, report.system);

    assert!(disk.flushes > 0);
}

#[test]
fn test_write_order() {
    let mut disk = MemoryDisk::card_256mb();
    format_disk(&mut disk, &FormatConfig::default().minimal()).unwrap();

    assert_eq!(
        disk.write_log,
        vec![
            0,
            SYS_START as u64,
            FAT_START as u64,
            FAT_START as u64 + 6,
            FAT_START as u64 + 1,
            FAT_START as u64 + 7,
            FAT1 as u64,
            FAT2 as u64,
            ROOT as u64,
        ]
    );
}

#[test]
fn test_partition_table_reads_back() {
    let mut disk = MemoryDisk::card_256mb();
    let report = format_disk(&mut disk, &FormatConfig::default()).unwrap();

    let mbr = read_partition_table(&mut disk).unwrap().expect("valid MBR");
    let fat = mbr.find_fat32().unwrap();
    let sys = mbr.find_system().unwrap();
    assert_eq!(fat.partition_type, PartitionType::Fat32Lba);
    assert_eq!(fat.start_lba, report.layout.fat_partition_start);
    assert_eq!(fat.sectors, report.layout.fat_partition_sectors);
    assert_eq!(sys.start_lba, report.layout.sys_partition_start);
    assert_eq!(sys.sectors, report.layout.sys_partition_sectors);
    assert!(!fat.overlaps(&sys));
    assert_eq!(sys.end_lba(), 524_287);
}

#[test]
fn test_format_is_idempotent() {
    let mut disk = MemoryDisk::card_256mb();
    format_disk(&mut disk, &FormatConfig::default()).unwrap();
    let first = disk.sectors.clone();

    format_disk(&mut disk, &FormatConfig::default()).unwrap();
    assert_eq!(disk.sectors, first);
}

#[test]
fn test_stale_data_is_cleared() {
    let mut disk = MemoryDisk::card_256mb();
    disk.fill_range(FAT_START, ROOT + 7, 0xAA);
    disk.fill_range(SYS_START, SYS_START + 1100, 0xAA);
    format_disk(&mut disk, &FormatConfig::default()).unwrap();

    let zero = [0u8; 512];
    for lba in (FAT_START + 2..=FAT_START + 5).chain(FAT_START + 8..FAT1) {
        assert_eq!(disk.sector(lba), zero, "reserved sector {}", lba);
    }
    for lba in (FAT1 + 1..FAT2).chain(FAT2 + 1..ROOT) {
        assert_eq!(disk.sector(lba), zero, "FAT sector {}", lba);
    }
    for lba in ROOT + 1..ROOT + 8 {
        assert_eq!(disk.sector(lba), zero, "root sector {}", lba);
    }
    for lba in SYS_START + 1..=SYS_START + 1023 {
        assert_eq!(disk.sector(lba), zero, "system sector {}", lba);
    }

    // Outside every cleared range
    assert_eq!(disk.sector(SYS_START + 1024), [0xAA; 512]);
    assert!(FsInfo::from_sector(&disk.sector(FAT_START + 7)).is_some());
}

#[test]
fn test_slot_directories_are_cleared() {
    let mut disk = MemoryDisk::card_256mb();
    let freeze_dir = SYS_START + 2048;
    let service_dir = freeze_dir + 640 * 201;
    disk.fill_range(freeze_dir, freeze_dir + 60, 0xAA);
    disk.fill_range(service_dir, service_dir + 60, 0xAA);

    let report = format_disk(&mut disk, &FormatConfig::default()).unwrap();
    assert_eq!(report.system.freeze_dir_lba(SYS_START), freeze_dir);
    assert_eq!(report.system.service_dir_lba(SYS_START), service_dir);

    for dir in [freeze_dir, service_dir] {
        for lba in dir..dir + 51 {
            assert_eq!(disk.sector(lba), [0u8; 512]);
        }
        assert_eq!(disk.sector(dir + 51), [0xAA; 512]);
    }
}

#[test]
fn test_minimal_format_leaves_gaps_alone() {
    let mut disk = MemoryDisk::card_256mb();
    disk.fill_range(FAT_START + 2, FAT_START + 2, 0xAA);
    format_disk(&mut disk, &FormatConfig::default().minimal()).unwrap();
    assert_eq!(disk.sector(FAT_START + 2), [0xAA; 512]);
}

#[test]
fn test_custom_label() {
    let mut disk = MemoryDisk::card_256mb();
    format_disk(&mut disk, &FormatConfig::default().label("games")).unwrap();
    assert_eq!(&disk.sector(FAT_START)[0x47..0x52], b"GAMES      ");
    assert_eq!(&disk.sector(ROOT)[..11], b"GAMES      ");
}

#[test]
fn test_too_small_device_is_untouched() {
    let mut disk = MemoryDisk::new(6143);
    assert_eq!(
        format_disk(&mut disk, &FormatConfig::default()),
        Err(FdiskError::DeviceTooSmall)
    );
    assert!(disk.write_log.is_empty());
}

#[test]
fn test_smallest_device() {
    let mut disk = MemoryDisk::new(6144);
    let report = format_disk(&mut disk, &FormatConfig::default()).unwrap();
    assert_eq!(report.system.slot_count(), 0);
    assert!(disk.write_log.iter().all(|&lba| lba < 6144));
}

#[test]
fn test_sector_count_override() {
    let mut disk = MemoryDisk::new(1_000_000);
    let report = format_disk(&mut disk, &FormatConfig::default().sectors(524_288)).unwrap();
    assert_eq!(report.layout.total_sectors, 524_288);
    assert!(disk.write_log.iter().all(|&lba| lba < 524_288));
}

#[test]
fn test_sector_count_larger_than_device() {
    let mut disk = MemoryDisk::new(8192);
    assert_eq!(
        format_disk(&mut disk, &FormatConfig::default().sectors(524_288)),
        Err(FdiskError::DeviceTooSmall)
    );
    assert!(disk.write_log.is_empty());
    assert_eq!(disk.flushes, 0);
}

#[test]
fn test_device_beyond_32_bits_is_clamped() {
    let mut disk = MemoryDisk::new(u32::MAX as u64 + 4096);
    let report = format_disk(&mut disk, &FormatConfig::default().minimal()).unwrap();
    assert_eq!(report.layout.total_sectors, u32::MAX);
}

#[test]
fn test_block_size_must_be_512() {
    assert_eq!(
        format_disk(&mut LargeSectorDisk, &FormatConfig::default()),
        Err(FdiskError::InvalidBlockSize)
    );
}

#[test]
fn test_device_errors_surface() {
    assert_eq!(
        format_disk(&mut BrokenDisk, &FormatConfig::default()),
        Err(FdiskError::Io)
    );
}
