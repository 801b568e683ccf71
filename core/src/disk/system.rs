// MEGA65 system partition header
//
// The system partition holds two equal slot areas, one for frozen programs
// and one for system services, each with its own slot directory. Every slot
// stores 128KB RAM + 128KB ROM + 32KB colour RAM + 32KB IO (320KB) and owns a
// 128-byte directory entry, so a freeze/service slot pair costs ~641KB.

use super::sector::{get_u16, get_u32, put_u16, put_u32, SectorBuf, SECTOR_SIZE};

pub const SYS_PART_MAGIC: [u8; 11] = *b"MEGA65SYS00";

/// Sectors per slot (320 KiB).
pub const SLOT_SECTORS: u32 = 320 * 1024 / 512;

/// Configuration area at the front of the partition (1 MiB).
pub const CONFIG_AREA_SECTORS: u32 = 1024 * 1024 / 512;

/// Footprint of one freeze slot plus one service slot, with directory
/// entries, in whole sectors.
const SLOT_PAIR_SECTORS: u32 = 641 * 1024 / 512;

const FREEZE_AREA_OFFSET: usize = 0x10;
const SERVICE_AREA_OFFSET: usize = 0x20;

/// Descriptor of one slot area, 16 bytes on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotArea {
    pub start: u32,
    pub size: u32,
    pub slot_size: u32,
    pub slot_count: u16,
    pub dir_sectors: u16,
}

impl SlotArea {
    fn read(raw: &[u8]) -> Self {
        Self {
            start: get_u32(raw, 0),
            size: get_u32(raw, 4),
            slot_size: get_u32(raw, 8),
            slot_count: get_u16(raw, 12),
            dir_sectors: get_u16(raw, 14),
        }
    }

    fn write(&self, raw: &mut [u8]) {
        put_u32(raw, 0, self.start);
        put_u32(raw, 4, self.size);
        put_u32(raw, 8, self.slot_size);
        put_u16(raw, 12, self.slot_count);
        put_u16(raw, 14, self.dir_sectors);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemPartitionHeader {
    pub freeze: SlotArea,
    pub service: SlotArea,
}

impl SystemPartitionHeader {
    /// Size both slot areas for a partition of `sys_sectors` sectors.
    pub fn for_partition(sys_sectors: u32) -> Self {
        let slot_count = (sys_sectors.saturating_sub(CONFIG_AREA_SECTORS) / SLOT_PAIR_SECTORS)
            .min(0xFFFF) as u16;
        let dir_sectors = 1 + slot_count / 4;
        let area_size = SLOT_SECTORS * slot_count as u32 + dir_sectors as u32;

        let freeze = SlotArea {
            start: 0,
            size: area_size,
            slot_size: SLOT_SECTORS,
            slot_count,
            dir_sectors,
        };
        let service = SlotArea {
            start: area_size,
            ..freeze
        };

        Self { freeze, service }
    }

    pub fn slot_count(&self) -> u16 {
        self.freeze.slot_count
    }

    /// Freeze slot directory, relative to the partition start.
    pub fn freeze_dir_offset(&self) -> u32 {
        CONFIG_AREA_SECTORS
    }

    /// Service slot directory, relative to the partition start.
    pub fn service_dir_offset(&self) -> u32 {
        self.freeze_dir_offset() + self.freeze.slot_size * self.freeze.slot_count as u32
    }

    pub fn freeze_dir_lba(&self, sys_start: u32) -> u32 {
        sys_start + self.freeze_dir_offset()
    }

    pub fn service_dir_lba(&self, sys_start: u32) -> u32 {
        sys_start + self.service_dir_offset()
    }

    pub fn write_to(&self, buf: &mut SectorBuf) {
        buf.fill(0);
        buf[..SYS_PART_MAGIC.len()].copy_from_slice(&SYS_PART_MAGIC);
        self.freeze
            .write(&mut buf[FREEZE_AREA_OFFSET..FREEZE_AREA_OFFSET + 16]);
        self.service
            .write(&mut buf[SERVICE_AREA_OFFSET..SERVICE_AREA_OFFSET + 16]);
    }

    /// Parse a header sector; `None` if the magic is missing.
    pub fn read_from(buf: &SectorBuf) -> Option<Self> {
        if buf[..SYS_PART_MAGIC.len()] != SYS_PART_MAGIC {
            return None;
        }
        Some(Self {
            freeze: SlotArea::read(&buf[FREEZE_AREA_OFFSET..FREEZE_AREA_OFFSET + 16]),
            service: SlotArea::read(&buf[SERVICE_AREA_OFFSET..SERVICE_AREA_OFFSET + 16]),
        })
    }
}

/// Fill `buf` with the header for a system partition of `sys_sectors`.
pub fn build_mega65_sys_sector(buf: &mut SectorBuf, sys_sectors: u32) -> SystemPartitionHeader {
    let header = SystemPartitionHeader::for_partition(sys_sectors);
    header.write_to(buf);
    log::info!(
        "{} freeze and OS service slots, {} directory sectors each",
        header.slot_count(),
        header.freeze.dir_sectors
    );
    header
}

const _: () = assert!(SERVICE_AREA_OFFSET + 16 <= SECTOR_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_256mb_card_slots() {
        let mut buf = [0xFFu8; SECTOR_SIZE];
        let header = build_mega65_sys_sector(&mut buf, 260_096);

        assert_eq!(header.slot_count(), 201);
        assert_eq!(header.freeze.dir_sectors, 51);
        assert_eq!(header.freeze.size, 640 * 201 + 51);
        assert_eq!(header.service.start, 640 * 201 + 51);
        assert_eq!(header.freeze_dir_offset(), 2048);
        assert_eq!(header.service_dir_offset(), 2048 + 640 * 201);

        assert_eq!(&buf[..11], b"MEGA65SYS00");
        assert_eq!(&buf[0x10..0x14], &[0, 0, 0, 0]);
        assert_eq!(&buf[0x14..0x18], &(640u32 * 201 + 51).to_le_bytes());
        assert_eq!(&buf[0x18..0x1C], &640u32.to_le_bytes());
        assert_eq!(&buf[0x1C..0x1E], &201u16.to_le_bytes());
        assert_eq!(&buf[0x1E..0x20], &51u16.to_le_bytes());
        assert_eq!(&buf[0x20..0x24], &(640u32 * 201 + 51).to_le_bytes());
        assert_eq!(&buf[0x24..0x28], &(640u32 * 201 + 51).to_le_bytes());
        assert_eq!(&buf[0x28..0x2C], &640u32.to_le_bytes());
        assert_eq!(&buf[0x2C..0x2E], &201u16.to_le_bytes());
        assert_eq!(&buf[0x2E..0x30], &51u16.to_le_bytes());
        assert!(buf[0x30..].iter().all(|&b| b == 0));

        assert_eq!(SystemPartitionHeader::read_from(&buf), Some(header));
    }

    #[test]
    fn test_minimum_partition_has_no_slots() {
        let header = SystemPartitionHeader::for_partition(2048);
        assert_eq!(header.slot_count(), 0);
        assert_eq!(header.freeze.dir_sectors, 1);
        assert_eq!(header.freeze.size, 1);
        assert_eq!(header.service_dir_offset(), header.freeze_dir_offset());
    }

    #[test]
    fn test_slot_count_clamped_to_16_bits() {
        let header = SystemPartitionHeader::for_partition(u32::MAX);
        assert_eq!(header.slot_count(), 0xFFFF);
        assert_eq!(header.freeze.dir_sectors, 1 + 0xFFFF / 4);
    }

    #[test]
    fn test_rejects_missing_magic() {
        let buf = [0u8; SECTOR_SIZE];
        assert!(SystemPartitionHeader::read_from(&buf).is_none());
    }
}
