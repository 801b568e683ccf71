// Root directory slot search and extension

use gpt_disk_io::BlockIo;

use super::context::Fat32Volume;
use super::filename::ShortName;
use super::types::{DirEntry, DIR_ENTRY_SIZE};
use crate::disk::sector::{erase_range, read_sector, write_sector, SECTOR_SIZE};
use crate::error::{FdiskError, Result};
use crate::fs::fat32_format::fat_table::is_end_of_chain;

const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;

/// A directory entry position on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirSlot {
    pub lba: u32,
    pub index: usize,
}

enum Walk<T> {
    /// The visitor stopped the walk.
    Found(T),
    /// First never-used slot; nothing follows it.
    End(DirSlot),
    /// Every slot is in use; carries the last cluster of the chain.
    Full(u32),
}

/// Visit live file entries (not deleted, not labels, not long-name parts)
/// of the directory starting at `dir_cluster` until `visit` returns `Some`.
fn walk<B, T, F>(
    block_io: &mut B,
    volume: &Fat32Volume,
    dir_cluster: u32,
    mut visit: F,
) -> Result<Walk<T>>
where
    B: BlockIo,
    F: FnMut(DirSlot, &DirEntry) -> Option<T>,
{
    let mut buf = [0u8; SECTOR_SIZE];
    let mut cluster = dir_cluster;

    // A chain cannot be longer than the volume; anything else is a loop
    for _ in 0..volume.cluster_count {
        if !volume.is_valid_cluster(cluster) {
            log::error!("directory chain reaches invalid cluster {:#x}", cluster);
            return Err(FdiskError::CorruptChain);
        }

        let first = volume.cluster_to_sector(cluster);
        for lba in first..first + volume.sectors_per_cluster {
            read_sector(block_io, lba, &mut buf)?;
            for index in 0..ENTRIES_PER_SECTOR {
                let offset = index * DIR_ENTRY_SIZE;
                let entry = DirEntry::from_bytes(&buf[offset..offset + DIR_ENTRY_SIZE]);
                let slot = DirSlot { lba, index };
                if entry.is_end() {
                    return Ok(Walk::End(slot));
                }
                if entry.is_deleted() || entry.is_volume_label() || entry.is_long_name() {
                    continue;
                }
                if let Some(found) = visit(slot, &entry) {
                    return Ok(Walk::Found(found));
                }
            }
        }

        let next = volume.follow_cluster(block_io, cluster)?;
        if is_end_of_chain(next) {
            return Ok(Walk::Full(cluster));
        }
        cluster = next;
    }

    Err(FdiskError::CorruptChain)
}

/// First free slot in the directory starting at `dir_cluster`. Fails with
/// `FileExists` when `name` is already present. A full directory is
/// extended by one zeroed cluster.
pub fn find_free_slot<B: BlockIo>(
    block_io: &mut B,
    volume: &Fat32Volume,
    dir_cluster: u32,
    name: &ShortName,
) -> Result<DirSlot> {
    match walk(block_io, volume, dir_cluster, |_, entry| {
        (entry.name == name.0).then_some(())
    })? {
        Walk::Found(()) => {
            log::warn!("{} already exists", name);
            Err(FdiskError::FileExists)
        }
        Walk::End(slot) => {
            log::debug!("free directory slot {} in sector {}", slot.index, slot.lba);
            Ok(slot)
        }
        Walk::Full(last) => {
            let cluster = extend_directory(block_io, volume, last)?;
            Ok(DirSlot {
                lba: volume.cluster_to_sector(cluster),
                index: 0,
            })
        }
    }
}

/// Look `name` up in the directory starting at `dir_cluster`.
pub fn find_entry<B: BlockIo>(
    block_io: &mut B,
    volume: &Fat32Volume,
    dir_cluster: u32,
    name: &ShortName,
) -> Result<Option<(DirSlot, DirEntry)>> {
    let found = walk(block_io, volume, dir_cluster, |slot, entry| {
        (entry.name == name.0).then_some((slot, *entry))
    })?;
    Ok(match found {
        Walk::Found(hit) => Some(hit),
        Walk::End(_) | Walk::Full(_) => None,
    })
}

/// Call `f` for every file entry of the directory.
pub fn for_each_entry<B: BlockIo>(
    block_io: &mut B,
    volume: &Fat32Volume,
    dir_cluster: u32,
    mut f: impl FnMut(&DirEntry),
) -> Result<()> {
    walk(block_io, volume, dir_cluster, |_, entry| -> Option<()> {
        f(entry);
        None
    })?;
    Ok(())
}

/// Append a zeroed cluster to the chain ending at `last`.
fn extend_directory<B: BlockIo>(block_io: &mut B, volume: &Fat32Volume, last: u32) -> Result<u32> {
    let cluster = volume.allocate_cluster(block_io, 2)?;
    volume.set_fat_entry(block_io, last, cluster)?;

    let first = volume.cluster_to_sector(cluster);
    erase_range(block_io, first, first + volume.sectors_per_cluster - 1)?;

    log::info!("directory extended with cluster {}", cluster);
    Ok(cluster)
}

pub fn write_entry<B: BlockIo>(block_io: &mut B, slot: DirSlot, entry: &DirEntry) -> Result<()> {
    let mut buf = [0u8; SECTOR_SIZE];
    read_sector(block_io, slot.lba, &mut buf)?;
    let offset = slot.index * DIR_ENTRY_SIZE;
    entry.write_to(&mut buf[offset..offset + DIR_ENTRY_SIZE]);
    write_sector(block_io, slot.lba, &buf)
}
