// Contiguous file creation

use gpt_disk_io::BlockIo;

use super::context::Fat32Volume;
use super::directory::{find_free_slot, write_entry, DirSlot};
use super::filename::ShortName;
use super::types::{Clock, DirEntry};
use crate::disk::sector::{flush, write_sector, SECTOR_SIZE};
use crate::error::{FdiskError, Result};

/// A file laid out as one run of clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedFile {
    pub name: ShortName,
    pub size: u32,
    /// 0 for an empty file.
    pub start_cluster: u32,
    pub clusters: u32,
    /// Absolute first data sector; `None` for an empty file.
    pub first_sector: Option<u32>,
    /// Where the directory entry was written.
    pub slot: DirSlot,
}

impl CreatedFile {
    /// Absolute sector range `first..end` covered by the file's clusters.
    pub fn sectors(&self, volume: &Fat32Volume) -> core::ops::Range<u32> {
        match self.first_sector {
            Some(first) => first..first + self.clusters * volume.sectors_per_cluster,
            None => 0..0,
        }
    }
}

/// Create `name` in the root directory with `size` bytes reserved in one
/// contiguous cluster run. The data sectors are left as they are.
pub fn create_contiguous_file<B, C>(
    block_io: &mut B,
    volume: &Fat32Volume,
    name: &str,
    size: u32,
    clock: &C,
) -> Result<CreatedFile>
where
    B: BlockIo,
    C: Clock + ?Sized,
{
    let name = ShortName::parse(name)?;
    let cluster_bytes = volume.cluster_bytes() as u64;
    let clusters = ((size as u64 + cluster_bytes - 1) / cluster_bytes) as u32;

    let slot = find_free_slot(block_io, volume, volume.root_cluster, &name)?;

    let start_cluster = if clusters > 0 {
        let start = volume.find_contiguous_clusters(block_io, clusters)?;
        volume.write_chain(block_io, start, clusters)?;
        start
    } else {
        0
    };

    let entry = DirEntry::file(name.0, start_cluster, size, clock.timestamp());
    write_entry(block_io, slot, &entry)?;
    flush(block_io)?;

    let first_sector = (clusters > 0).then(|| volume.cluster_to_sector(start_cluster));
    log::info!(
        "created {} ({} bytes, {} clusters from {})",
        name,
        size,
        clusters,
        start_cluster
    );

    Ok(CreatedFile {
        name,
        size,
        start_cluster,
        clusters,
        first_sector,
        slot,
    })
}

/// Create a contiguous file holding `data`. The last sector is padded
/// with zeros.
pub fn write_contiguous_file<B, C>(
    block_io: &mut B,
    volume: &Fat32Volume,
    name: &str,
    data: &[u8],
    clock: &C,
) -> Result<CreatedFile>
where
    B: BlockIo,
    C: Clock + ?Sized,
{
    let size = u32::try_from(data.len()).map_err(|_| FdiskError::NoSpace)?;
    let file = create_contiguous_file(block_io, volume, name, size, clock)?;

    if let Some(first) = file.first_sector {
        let mut buf = [0u8; SECTOR_SIZE];
        for (lba, chunk) in (first..).zip(data.chunks(SECTOR_SIZE)) {
            buf[..chunk.len()].copy_from_slice(chunk);
            buf[chunk.len()..].fill(0);
            write_sector(block_io, lba, &buf)?;
        }
        flush(block_io)?;
        log::info!("wrote {} bytes to {}", size, file.name);
    }

    Ok(file)
}
