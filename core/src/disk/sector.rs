// Sector-granular access to the block device

use crate::error::{FdiskError, Result};
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

pub const SECTOR_SIZE: usize = 512;

/// One sector staging buffer. Callers own their buffer; nothing is shared.
pub type SectorBuf = [u8; SECTOR_SIZE];

/// Sectors written per request when zero-filling a range.
const ERASE_CHUNK_SECTORS: usize = 16;

pub fn read_sector<B: BlockIo>(block_io: &mut B, lba: u32, buf: &mut SectorBuf) -> Result<()> {
    block_io.read_blocks(Lba(lba as u64), buf).map_err(|e| {
        log::error!("read of sector {} failed: {}", lba, e);
        FdiskError::Io
    })
}

pub fn write_sector<B: BlockIo>(block_io: &mut B, lba: u32, buf: &SectorBuf) -> Result<()> {
    #[cfg(feature = "sector_trace")]
    log::trace!("write sector {:#x}", lba);

    block_io.write_blocks(Lba(lba as u64), buf).map_err(|e| {
        log::error!("write of sector {} failed: {}", lba, e);
        FdiskError::Io
    })
}

/// Zero-fill the inclusive range `first..=last`. An empty range
/// (`last < first`) is a no-op.
pub fn erase_range<B: BlockIo>(block_io: &mut B, first: u32, last: u32) -> Result<()> {
    if last < first {
        return Ok(());
    }
    log::debug!("erasing sectors {}..={}", first, last);

    let zeros = [0u8; SECTOR_SIZE * ERASE_CHUNK_SECTORS];
    let mut lba = first as u64;
    let end = last as u64 + 1;
    while lba < end {
        let count = (end - lba).min(ERASE_CHUNK_SECTORS as u64) as usize;
        block_io
            .write_blocks(Lba(lba), &zeros[..count * SECTOR_SIZE])
            .map_err(|e| {
                log::error!("erase at sector {} failed: {}", lba, e);
                FdiskError::Io
            })?;
        lba += count as u64;
    }
    Ok(())
}

pub fn flush<B: BlockIo>(block_io: &mut B) -> Result<()> {
    block_io.flush().map_err(|e| {
        log::error!("flush failed: {}", e);
        FdiskError::Io
    })
}

pub fn check_block_size<B: BlockIo>(block_io: &B) -> Result<()> {
    if block_io.block_size() != BlockSize::BS_512 {
        log::error!("device block size is {} bytes", block_io.block_size().to_u32());
        return Err(FdiskError::InvalidBlockSize);
    }
    Ok(())
}

/// Total addressable sectors. Devices beyond the 32-bit LBA range of an
/// MBR are clamped to `u32::MAX` sectors.
pub fn sector_count<B: BlockIo>(block_io: &mut B) -> Result<u32> {
    check_block_size(block_io)?;

    let blocks = block_io.num_blocks().map_err(|e| {
        log::error!("cannot query device size: {}", e);
        FdiskError::Io
    })?;

    if blocks > u32::MAX as u64 {
        log::warn!(
            "device has {} sectors, only the first {} are addressable",
            blocks,
            u32::MAX
        );
        return Ok(u32::MAX);
    }
    Ok(blocks as u32)
}

pub(crate) fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn get_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub(crate) fn get_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}
