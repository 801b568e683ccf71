// FAT32 boot sector (first sector of the partition, backup at +6)

use crate::config::{FAT_COPIES, RESERVED_SECTORS, SECTORS_PER_CLUSTER};
use crate::disk::layout::DiskLayout;
use crate::disk::sector::{get_u16, get_u32, put_u16, put_u32, SectorBuf, SECTOR_SIZE};

pub const OEM_NAME: [u8; 8] = *b"MEGA65r1";
pub const FS_TYPE: [u8; 8] = *b"FAT32   ";
pub const FS_INFO_SECTOR: u16 = 1;
pub const BACKUP_BOOT_SECTOR: u16 = 6;
pub const ROOT_CLUSTER: u32 = 2;

const JUMP: [u8; 3] = [0xEB, 0x58, 0x90];
const MEDIA_FIXED_DISK: u8 = 0xF8;
const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
const BOOT_CODE_OFFSET: usize = 0x5A;

/// x86 stub that prints the message below through the BIOS, waits for a
/// key and reboots.
const BOOT_STUB: [u8; 29] = [
    0x0E, 0x1F, 0xBE, 0x77, 0x7C, 0xAC, 0x22, 0xC0, 0x74, 0x0B, 0x56, 0xB4, 0x0E, 0xBB, 0x07,
    0x00, 0xCD, 0x10, 0x5E, 0xEB, 0xF0, 0x32, 0xE4, 0xCD, 0x16, 0xCD, 0x19, 0xEB, 0xFE,
];

const BOOT_MESSAGE: &[u8] = b"MEGA65 KICKSTART V00.11\r\n\r?NO 45GS02, 4510, 65[ce]02, 6510 OR 8510 PROCESSOR  ERROR\r\nINSERT DISK IN REAL COMPUTER AND TRY AGAIN.\n\nREADY.\r\n";

const _: () = assert!(BOOT_CODE_OFFSET + BOOT_STUB.len() + BOOT_MESSAGE.len() <= SECTOR_SIZE - 2);

/// BIOS parameter block plus the FAT32 extended fields we care about.
/// CHS geometry and hidden sectors are always zero (LBA only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSector {
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub media: u8,
    pub total_sectors: u32,
    pub fat_sectors: u32,
    pub root_cluster: u32,
    pub fs_info_sector: u16,
    pub backup_boot_sector: u16,
    pub drive_number: u8,
    pub volume_id: [u8; 4],
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

impl BootSector {
    pub fn new(
        total_sectors: u32,
        fat_sectors: u32,
        volume_id: [u8; 4],
        volume_label: [u8; 11],
    ) -> Self {
        Self {
            oem_name: OEM_NAME,
            bytes_per_sector: SECTOR_SIZE as u16,
            sectors_per_cluster: SECTORS_PER_CLUSTER,
            reserved_sectors: RESERVED_SECTORS as u16,
            num_fats: FAT_COPIES as u8,
            media: MEDIA_FIXED_DISK,
            total_sectors,
            fat_sectors,
            root_cluster: ROOT_CLUSTER,
            fs_info_sector: FS_INFO_SECTOR,
            backup_boot_sector: BACKUP_BOOT_SECTOR,
            drive_number: 0x80,
            volume_id,
            volume_label,
            fs_type: FS_TYPE,
        }
    }

    pub fn for_layout(layout: &DiskLayout, volume_id: [u8; 4], volume_label: [u8; 11]) -> Self {
        Self::new(
            layout.fat_partition_sectors,
            layout.fat_sectors,
            volume_id,
            volume_label,
        )
    }

    pub fn to_sector(&self, buf: &mut SectorBuf) {
        buf.fill(0);
        buf[0..3].copy_from_slice(&JUMP);
        buf[0x03..0x0B].copy_from_slice(&self.oem_name);
        put_u16(buf, 0x0B, self.bytes_per_sector);
        buf[0x0D] = self.sectors_per_cluster;
        put_u16(buf, 0x0E, self.reserved_sectors);
        buf[0x10] = self.num_fats;
        // 0x11 root entries, 0x13 total16: zero on FAT32
        buf[0x15] = self.media;
        // 0x16 FAT16 size, 0x18 CHS geometry, 0x1C hidden sectors: zero
        put_u32(buf, 0x20, self.total_sectors);
        put_u32(buf, 0x24, self.fat_sectors);
        // 0x28 flags, 0x2A version: zero
        put_u32(buf, 0x2C, self.root_cluster);
        put_u16(buf, 0x30, self.fs_info_sector);
        put_u16(buf, 0x32, self.backup_boot_sector);
        buf[0x40] = self.drive_number;
        buf[0x42] = EXTENDED_BOOT_SIGNATURE;
        buf[0x43..0x47].copy_from_slice(&self.volume_id);
        buf[0x47..0x52].copy_from_slice(&self.volume_label);
        buf[0x52..0x5A].copy_from_slice(&self.fs_type);

        let stub_end = BOOT_CODE_OFFSET + BOOT_STUB.len();
        buf[BOOT_CODE_OFFSET..stub_end].copy_from_slice(&BOOT_STUB);
        buf[stub_end..stub_end + BOOT_MESSAGE.len()].copy_from_slice(BOOT_MESSAGE);

        buf[510] = 0x55;
        buf[511] = 0xAA;
    }

    /// Parse a boot sector. `None` without the 0x55AA signature.
    pub fn from_sector(buf: &SectorBuf) -> Option<Self> {
        if buf[510] != 0x55 || buf[511] != 0xAA {
            return None;
        }

        let mut oem_name = [0u8; 8];
        oem_name.copy_from_slice(&buf[0x03..0x0B]);
        let mut volume_id = [0u8; 4];
        volume_id.copy_from_slice(&buf[0x43..0x47]);
        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&buf[0x47..0x52]);
        let mut fs_type = [0u8; 8];
        fs_type.copy_from_slice(&buf[0x52..0x5A]);

        Some(Self {
            oem_name,
            bytes_per_sector: get_u16(buf, 0x0B),
            sectors_per_cluster: buf[0x0D],
            reserved_sectors: get_u16(buf, 0x0E),
            num_fats: buf[0x10],
            media: buf[0x15],
            total_sectors: get_u32(buf, 0x20),
            fat_sectors: get_u32(buf, 0x24),
            root_cluster: get_u32(buf, 0x2C),
            fs_info_sector: get_u16(buf, 0x30),
            backup_boot_sector: get_u16(buf, 0x32),
            drive_number: buf[0x40],
            volume_id,
            volume_label,
            fs_type,
        })
    }

    /// First sector of the data region, relative to the partition.
    pub fn data_start_sector(&self) -> u32 {
        (self.num_fats as u32)
            .saturating_mul(self.fat_sectors)
            .saturating_add(self.reserved_sectors as u32)
    }
}

/// Fill `buf` with the MEGA65 boot sector for a FAT32 partition of
/// `data_sectors` sectors.
pub fn build_dos_boot_sector(
    buf: &mut SectorBuf,
    volume_label: [u8; 11],
    data_sectors: u32,
    fat_sectors: u32,
) {
    BootSector::new(
        data_sectors,
        fat_sectors,
        crate::config::DEFAULT_VOLUME_ID,
        volume_label,
    )
    .to_sector(buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_bytes() {
        let mut buf = [0xAAu8; SECTOR_SIZE];
        build_dos_boot_sector(&mut buf, *b"M.E.G.A.65!", 0x0004_0000, 255);

        assert_eq!(
            &buf[..0x20],
            &[
                0xEB, 0x58, 0x90, b'M', b'E', b'G', b'A', b'6', b'5', b'r', b'1', 0x00, 0x02,
                0x08, 0x38, 0x02, 0x02, 0x00, 0x00, 0x00, 0x00, 0xF8, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ]
        );
        assert_eq!(&buf[0x20..0x24], &[0x00, 0x00, 0x04, 0x00]);
        assert_eq!(&buf[0x24..0x28], &[0xFF, 0x00, 0x00, 0x00]);
        assert_eq!(&buf[0x28..0x2C], &[0, 0, 0, 0]);
        assert_eq!(&buf[0x2C..0x30], &[0x02, 0, 0, 0]);
        assert_eq!(&buf[0x30..0x34], &[0x01, 0x00, 0x06, 0x00]);
        assert!(buf[0x34..0x40].iter().all(|&b| b == 0));
        assert_eq!(&buf[0x40..0x47], &[0x80, 0x00, 0x29, 0x6D, 0x66, 0x62, 0x61]);
        assert_eq!(&buf[0x47..0x52], b"M.E.G.A.65!");
        assert_eq!(&buf[0x52..0x5A], b"FAT32   ");
        assert_eq!(&buf[0x5A..0x5E], &[0x0E, 0x1F, 0xBE, 0x77]);
        assert_eq!(&buf[0x77..0x7F], b"MEGA65 K");
        assert_eq!(&buf[0x5A + 167 - 2..0x5A + 167], b"\r\n");
        assert!(buf[0x5A + 167..510].iter().all(|&b| b == 0));
        assert_eq!(&buf[510..], &[0x55, 0xAA]);
    }

    #[test]
    fn test_parse_matches_built_record() {
        let layout = DiskLayout::compute(524_288).unwrap();
        let record = BootSector::for_layout(&layout, *b"mfba", *b"GAMES      ");
        let mut buf = [0u8; SECTOR_SIZE];
        record.to_sector(&mut buf);

        let parsed = BootSector::from_sector(&buf).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.data_start_sector(), layout.root_dir_sector());
    }

    #[test]
    fn test_unsigned_sector_rejected() {
        let buf = [0u8; SECTOR_SIZE];
        assert!(BootSector::from_sector(&buf).is_none());
    }
}
