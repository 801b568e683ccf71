// FAT32 FS information sector (partition +1, backup at +7)

use crate::disk::sector::{get_u32, put_u32, SectorBuf};

pub const LEAD_SIGNATURE: [u8; 4] = *b"RRaA";
pub const STRUCT_SIGNATURE: [u8; 4] = *b"rrAa";

const STRUCT_SIGNATURE_OFFSET: usize = 0x1E4;
const FREE_COUNT_OFFSET: usize = 0x1E8;
const NEXT_FREE_OFFSET: usize = 0x1EC;

/// First cluster handed out after format (cluster 2 is the root).
pub const FIRST_FREE_CLUSTER: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    pub free_clusters: u32,
    pub next_free: u32,
}

impl FsInfo {
    /// Fresh volume with `fs_clusters` FAT entries: two reserved entries and
    /// the root directory are in use.
    pub fn fresh(fs_clusters: u32) -> Self {
        Self {
            free_clusters: fs_clusters.saturating_sub(3),
            next_free: FIRST_FREE_CLUSTER,
        }
    }

    pub fn to_sector(&self, buf: &mut SectorBuf) {
        buf.fill(0);
        buf[0..4].copy_from_slice(&LEAD_SIGNATURE);
        buf[STRUCT_SIGNATURE_OFFSET..STRUCT_SIGNATURE_OFFSET + 4]
            .copy_from_slice(&STRUCT_SIGNATURE);
        put_u32(buf, FREE_COUNT_OFFSET, self.free_clusters);
        put_u32(buf, NEXT_FREE_OFFSET, self.next_free);
        buf[510] = 0x55;
        buf[511] = 0xAA;
    }

    /// `None` unless all three signatures are present.
    pub fn from_sector(buf: &SectorBuf) -> Option<Self> {
        if buf[0..4] != LEAD_SIGNATURE
            || buf[STRUCT_SIGNATURE_OFFSET..STRUCT_SIGNATURE_OFFSET + 4] != STRUCT_SIGNATURE
            || buf[510] != 0x55
            || buf[511] != 0xAA
        {
            return None;
        }
        Some(Self {
            free_clusters: get_u32(buf, FREE_COUNT_OFFSET),
            next_free: get_u32(buf, NEXT_FREE_OFFSET),
        })
    }
}

pub fn build_fs_information_sector(buf: &mut SectorBuf, fs_clusters: u32) {
    FsInfo::fresh(fs_clusters).to_sector(buf);
}
