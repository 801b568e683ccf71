//! File-backed block device
//!
//! Wraps a disk image or a raw device node (`/dev/sdX`) and implements
//! `gpt_disk_io::BlockIo` with 512-byte blocks.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

const BLOCK_SIZE: u64 = 512;

pub struct ImageDevice {
    file: File,
    num_blocks: u64,
}

impl ImageDevice {
    pub fn open(path: &Path, writable: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;

        // Device nodes report a zero length in their metadata; seeking works
        // for both nodes and regular files
        let bytes = file
            .seek(SeekFrom::End(0))
            .with_context(|| format!("cannot size {}", path.display()))?;
        log::debug!("{}: {} bytes", path.display(), bytes);

        Ok(Self {
            file,
            num_blocks: bytes / BLOCK_SIZE,
        })
    }

    /// Create (or truncate) an image file of `sectors` blocks.
    pub fn create(path: &Path, sectors: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        file.set_len(u64::from(sectors) * BLOCK_SIZE)
            .with_context(|| format!("cannot size {}", path.display()))?;

        Ok(Self {
            file,
            num_blocks: u64::from(sectors),
        })
    }

    fn seek_to(&mut self, lba: Lba, len: usize) -> io::Result<()> {
        let end = lba.0.saturating_add(len as u64 / BLOCK_SIZE);
        if len as u64 % BLOCK_SIZE != 0 || end > self.num_blocks {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("access to LBA {} ({} bytes) outside device", lba.0, len),
            ));
        }
        self.file.seek(SeekFrom::Start(lba.0 * BLOCK_SIZE))?;
        Ok(())
    }
}

impl BlockIo for ImageDevice {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.num_blocks)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.seek_to(start_lba, dst.len())?;
        self.file.read_exact(dst)
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        self.seek_to(start_lba, src.len())?;
        self.file.write_all(src)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.file.flush()?;
        self.file.sync_data()
    }
}
