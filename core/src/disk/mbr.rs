// Master boot record: builder, parser and partition table display

use core::fmt;

use super::layout::DiskLayout;
use super::partition::{PartitionInfo, PartitionType};
use super::sector::{get_u32, put_u32, read_sector, write_sector, SectorBuf, SECTOR_SIZE};
use crate::error::Result;
use gpt_disk_io::BlockIo;

/// Fixed disk signature written at 0x1B8.
pub const DISK_SIGNATURE: [u8; 4] = [0x83, 0x7D, 0xCB, 0xA6];

const DISK_SIGNATURE_OFFSET: usize = 0x1B8;
const PARTITION_TABLE_OFFSET: usize = 0x1BE;
const PARTITION_ENTRY_SIZE: usize = 16;
const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Cylinder/head/sector address as packed in a partition entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Chs {
    pub head: u8,
    pub sector: u8,
    pub cylinder: u16,
}

impl Chs {
    fn decode(raw: [u8; 3]) -> Self {
        Self {
            head: raw[0],
            sector: raw[1] & 0x3F,
            cylinder: (((raw[1] as u16) << 2) & 0x300) | raw[2] as u16,
        }
    }
}

/// One 16-byte partition table slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct PartitionEntry {
    pub status: u8,
    pub chs_start: [u8; 3],
    pub partition_type: u8,
    pub chs_end: [u8; 3],
    pub lba_start: u32,
    pub sectors: u32,
}

impl PartitionEntry {
    /// LBA-only entry; CHS fields stay zero and the entry is not bootable.
    pub fn lba(partition_type: PartitionType, lba_start: u32, sectors: u32) -> Self {
        Self {
            partition_type: partition_type.id(),
            lba_start,
            sectors,
            ..Default::default()
        }
    }

    pub fn is_used(&self) -> bool {
        self.partition_type != 0
    }

    pub fn is_active(&self) -> bool {
        self.status & 0x80 != 0
    }

    pub fn kind(&self) -> PartitionType {
        PartitionType::from_id(self.partition_type)
    }

    pub fn start_chs(&self) -> Chs {
        Chs::decode(self.chs_start)
    }

    pub fn end_chs(&self) -> Chs {
        Chs::decode(self.chs_end)
    }

    pub fn end_lba(&self) -> u32 {
        self.lba_start
            .saturating_add(self.sectors)
            .saturating_sub(1)
    }

    fn read(raw: &[u8]) -> Self {
        Self {
            status: raw[0],
            chs_start: [raw[1], raw[2], raw[3]],
            partition_type: raw[4],
            chs_end: [raw[5], raw[6], raw[7]],
            lba_start: get_u32(raw, 8),
            sectors: get_u32(raw, 12),
        }
    }

    fn write(&self, raw: &mut [u8]) {
        raw[0] = self.status;
        raw[1..4].copy_from_slice(&self.chs_start);
        raw[4] = self.partition_type;
        raw[5..8].copy_from_slice(&self.chs_end);
        put_u32(raw, 8, self.lba_start);
        put_u32(raw, 12, self.sectors);
    }
}

impl fmt::Display for PartitionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start_chs();
        let end = self.end_chs();
        write!(
            f,
            "{:02X}{} : Start={:3}/{:2}/{:4} or {:08X} / End={:3}/{:2}/{:4} or {:08X}",
            self.partition_type,
            if self.is_active() { '*' } else { ' ' },
            start.head,
            start.sector,
            start.cylinder,
            self.lba_start,
            end.head,
            end.sector,
            end.cylinder,
            self.end_lba()
        )
    }
}

/// Decoded sector 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MasterBootRecord {
    pub disk_signature: [u8; 4],
    pub entries: [PartitionEntry; 4],
}

impl MasterBootRecord {
    /// MEGA65 table: system partition in slot 0, FAT32 in slot 1.
    pub fn mega65(layout: &DiskLayout) -> Self {
        Self::new(
            layout.sys_partition_start,
            layout.sys_partition_sectors,
            layout.fat_partition_start,
            layout.fat_partition_sectors,
        )
    }

    pub fn new(sys_start: u32, sys_sectors: u32, fat_start: u32, fat_sectors: u32) -> Self {
        let mut entries = [PartitionEntry::default(); 4];
        entries[0] = PartitionEntry::lba(PartitionType::Mega65System, sys_start, sys_sectors);
        entries[1] = PartitionEntry::lba(PartitionType::Fat32Lba, fat_start, fat_sectors);
        Self {
            disk_signature: DISK_SIGNATURE,
            entries,
        }
    }

    pub fn write_to(&self, buf: &mut SectorBuf) {
        buf.fill(0);
        buf[DISK_SIGNATURE_OFFSET..DISK_SIGNATURE_OFFSET + 4]
            .copy_from_slice(&self.disk_signature);
        for (i, entry) in self.entries.iter().enumerate() {
            let offset = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
            entry.write(&mut buf[offset..offset + PARTITION_ENTRY_SIZE]);
        }
        buf[SECTOR_SIZE - 2..].copy_from_slice(&BOOT_SIGNATURE);
    }

    /// Parse sector 0. Returns `None` without the 0x55AA signature.
    pub fn read_from(buf: &SectorBuf) -> Option<Self> {
        if buf[SECTOR_SIZE - 2..] != BOOT_SIGNATURE {
            return None;
        }

        let mut entries = [PartitionEntry::default(); 4];
        for (i, entry) in entries.iter_mut().enumerate() {
            let offset = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
            *entry = PartitionEntry::read(&buf[offset..offset + PARTITION_ENTRY_SIZE]);
        }

        let mut disk_signature = [0u8; 4];
        disk_signature.copy_from_slice(&buf[DISK_SIGNATURE_OFFSET..DISK_SIGNATURE_OFFSET + 4]);

        Some(Self {
            disk_signature,
            entries,
        })
    }

    pub fn partitions(&self) -> impl Iterator<Item = PartitionInfo> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_used())
            .map(|(i, e)| PartitionInfo {
                index: i as u32,
                partition_type: e.kind(),
                start_lba: e.lba_start,
                sectors: e.sectors,
            })
    }

    pub fn find_fat32(&self) -> Option<PartitionInfo> {
        self.partitions().find(|p| p.partition_type.is_fat32())
    }

    pub fn find_system(&self) -> Option<PartitionInfo> {
        self.partitions()
            .find(|p| p.partition_type == PartitionType::Mega65System)
    }
}

/// Fill `buf` with the MEGA65 partition table.
pub fn build_mbr(
    buf: &mut SectorBuf,
    sys_start: u32,
    sys_sectors: u32,
    fat_start: u32,
    fat_sectors: u32,
) {
    MasterBootRecord::new(sys_start, sys_sectors, fat_start, fat_sectors).write_to(buf);
}

/// Read sector 0. `Ok(None)` means there is no valid partition table.
pub fn read_partition_table<B: BlockIo>(block_io: &mut B) -> Result<Option<MasterBootRecord>> {
    let mut buf = [0u8; SECTOR_SIZE];
    read_sector(block_io, 0, &mut buf)?;
    Ok(MasterBootRecord::read_from(&buf))
}

pub fn write_partition_table<B: BlockIo>(block_io: &mut B, mbr: &MasterBootRecord) -> Result<()> {
    let mut buf = [0u8; SECTOR_SIZE];
    mbr.write_to(&mut buf);
    write_sector(block_io, 0, &buf)
}
