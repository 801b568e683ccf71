// FAT32 directory entry record and DOS timestamps

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::disk::sector::{get_u16, get_u32, put_u16, put_u32};

pub const DIR_ENTRY_SIZE: usize = 32;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

/// First name byte of a slot that was never used; also ends the directory.
pub const SLOT_END: u8 = 0x00;
/// First name byte of a deleted entry.
pub const SLOT_DELETED: u8 = 0xE5;

/// FAT32 directory entry (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub attr: u8,
    pub nt_reserved: u8,
    pub create_time_tenth: u8,
    pub create_time: u16,
    pub create_date: u16,
    pub access_date: u16,
    pub cluster_high: u16,
    pub modify_time: u16,
    pub modify_date: u16,
    pub cluster_low: u16,
    pub file_size: u32,
}

impl DirEntry {
    /// Archive entry for a new file.
    pub fn file(name: [u8; 11], first_cluster: u32, file_size: u32, stamp: DosTimestamp) -> Self {
        let mut entry = Self {
            name,
            attr: ATTR_ARCHIVE,
            create_time: stamp.time,
            create_date: stamp.date,
            access_date: stamp.date,
            modify_time: stamp.time,
            modify_date: stamp.date,
            file_size,
            ..Default::default()
        };
        entry.set_first_cluster(first_cluster);
        entry
    }

    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[..11]);
        Self {
            name,
            attr: raw[0x0B],
            nt_reserved: raw[0x0C],
            create_time_tenth: raw[0x0D],
            create_time: get_u16(raw, 0x0E),
            create_date: get_u16(raw, 0x10),
            access_date: get_u16(raw, 0x12),
            cluster_high: get_u16(raw, 0x14),
            modify_time: get_u16(raw, 0x16),
            modify_date: get_u16(raw, 0x18),
            cluster_low: get_u16(raw, 0x1A),
            file_size: get_u32(raw, 0x1C),
        }
    }

    pub fn write_to(&self, raw: &mut [u8]) {
        raw[..11].copy_from_slice(&self.name);
        raw[0x0B] = self.attr;
        raw[0x0C] = self.nt_reserved;
        raw[0x0D] = self.create_time_tenth;
        put_u16(raw, 0x0E, self.create_time);
        put_u16(raw, 0x10, self.create_date);
        put_u16(raw, 0x12, self.access_date);
        put_u16(raw, 0x14, self.cluster_high);
        put_u16(raw, 0x16, self.modify_time);
        put_u16(raw, 0x18, self.modify_date);
        put_u16(raw, 0x1A, self.cluster_low);
        put_u32(raw, 0x1C, self.file_size);
    }

    pub fn is_end(&self) -> bool {
        self.name[0] == SLOT_END
    }

    pub fn is_deleted(&self) -> bool {
        self.name[0] == SLOT_DELETED
    }

    pub fn is_long_name(&self) -> bool {
        self.attr & ATTR_LONG_NAME == ATTR_LONG_NAME
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0 && !self.is_long_name()
    }

    pub fn first_cluster(&self) -> u32 {
        ((self.cluster_high as u32) << 16) | (self.cluster_low as u32)
    }

    pub fn set_first_cluster(&mut self, cluster: u32) {
        self.cluster_high = (cluster >> 16) as u16;
        self.cluster_low = (cluster & 0xFFFF) as u16;
    }
}

/// Packed DOS time and date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DosTimestamp {
    pub time: u16,
    pub date: u16,
}

impl DosTimestamp {
    /// Years outside 1980..=2107 are clamped to the representable range.
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        if dt.year() < 1980 {
            return Self {
                time: 0,
                date: (1 << 5) | 1,
            };
        }
        let year = (dt.year() - 1980).min(127) as u16;
        Self {
            time: ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | (dt.second() as u16 / 2),
            date: (year << 9) | ((dt.month() as u16) << 5) | dt.day() as u16,
        }
    }
}

/// Source of file timestamps.
pub trait Clock {
    /// Current local date and time, or `None` without a real-time clock.
    fn now(&self) -> Option<NaiveDateTime>;

    fn timestamp(&self) -> DosTimestamp {
        self.now()
            .map(|dt| DosTimestamp::from_datetime(&dt))
            .unwrap_or_default()
    }
}

/// No real-time clock: timestamps are written as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl Clock for NoClock {
    fn now(&self) -> Option<NaiveDateTime> {
        None
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> Option<NaiveDateTime> {
        Some(self.0)
    }
}
