// Partition information and management

/// MBR partition type byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartitionType {
    Empty,
    Mega65System,
    Fat32Lba,
    Fat32Chs,
    Other(u8),
}

impl PartitionType {
    pub const MEGA65_SYSTEM: u8 = 0x41;
    pub const FAT32_LBA: u8 = 0x0C;
    pub const FAT32_CHS: u8 = 0x0B;

    pub fn from_id(id: u8) -> Self {
        match id {
            0x00 => PartitionType::Empty,
            Self::MEGA65_SYSTEM => PartitionType::Mega65System,
            Self::FAT32_LBA => PartitionType::Fat32Lba,
            Self::FAT32_CHS => PartitionType::Fat32Chs,
            other => PartitionType::Other(other),
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            PartitionType::Empty => 0x00,
            PartitionType::Mega65System => Self::MEGA65_SYSTEM,
            PartitionType::Fat32Lba => Self::FAT32_LBA,
            PartitionType::Fat32Chs => Self::FAT32_CHS,
            PartitionType::Other(id) => *id,
        }
    }

    pub fn is_fat32(&self) -> bool {
        matches!(self, PartitionType::Fat32Lba | PartitionType::Fat32Chs)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PartitionType::Empty => "Empty",
            PartitionType::Mega65System => "MEGA65 System",
            PartitionType::Fat32Lba => "VFAT32 (LBA)",
            PartitionType::Fat32Chs => "VFAT32",
            PartitionType::Other(_) => "Unknown",
        }
    }
}

/// A used partition slot, as found in the partition table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartitionInfo {
    pub index: u32,
    pub partition_type: PartitionType,
    pub start_lba: u32,
    pub sectors: u32,
}

impl PartitionInfo {
    /// Last sector of the partition (inclusive).
    pub fn end_lba(&self) -> u32 {
        self.start_lba + self.sectors.saturating_sub(1)
    }

    pub fn size_mb(&self) -> u64 {
        (self.sectors as u64 * 512) / (1024 * 1024)
    }

    pub fn overlaps(&self, other: &PartitionInfo) -> bool {
        let a_end = self.start_lba as u64 + self.sectors as u64;
        let b_end = other.start_lba as u64 + other.sectors as u64;
        (self.start_lba as u64) < b_end && (other.start_lba as u64) < a_end
    }
}
