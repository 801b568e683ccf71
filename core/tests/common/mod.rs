//! Common test utilities and an in-memory block device

#![allow(dead_code)]

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use std::collections::HashMap;
use std::io;

use m65fdisk_core::disk::sector::SECTOR_SIZE;

/// Sparse in-memory block device. Sectors never written read as zero.
#[derive(Debug, Clone)]
pub struct MemoryDisk {
    pub sectors: HashMap<u64, [u8; SECTOR_SIZE]>,
    pub num_sectors: u64,
    /// Every sector number written, in order.
    pub write_log: Vec<u64>,
    pub flushes: usize,
}

impl MemoryDisk {
    pub fn new(num_sectors: u64) -> Self {
        Self {
            sectors: HashMap::new(),
            num_sectors,
            write_log: Vec::new(),
            flushes: 0,
        }
    }

    /// 256 MiB card
    pub fn card_256mb() -> Self {
        Self::new(524_288)
    }

    pub fn sector(&self, lba: u32) -> [u8; SECTOR_SIZE] {
        self.sectors
            .get(&(lba as u64))
            .copied()
            .unwrap_or([0u8; SECTOR_SIZE])
    }

    pub fn put_sector(&mut self, lba: u32, data: [u8; SECTOR_SIZE]) {
        self.sectors.insert(lba as u64, data);
    }

    /// Fill the whole device with a byte so clearing passes are visible.
    pub fn fill_range(&mut self, first: u32, last: u32, byte: u8) {
        for lba in first..=last {
            self.sectors.insert(lba as u64, [byte; SECTOR_SIZE]);
        }
    }

    pub fn was_written(&self, lba: u32) -> bool {
        self.write_log.contains(&(lba as u64))
    }

    pub fn clear_log(&mut self) {
        self.write_log.clear();
    }
}

impl BlockIo for MemoryDisk {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.num_sectors)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let count = (dst.len() / SECTOR_SIZE) as u64;
        if start_lba.0 + count > self.num_sectors {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        for (i, chunk) in dst.chunks_mut(SECTOR_SIZE).enumerate() {
            match self.sectors.get(&(start_lba.0 + i as u64)) {
                Some(data) => chunk.copy_from_slice(data),
                None => chunk.fill(0),
            }
        }
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        let count = (src.len() / SECTOR_SIZE) as u64;
        if start_lba.0 + count > self.num_sectors {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "write beyond end of device",
            ));
        }
        for (i, chunk) in src.chunks(SECTOR_SIZE).enumerate() {
            let lba = start_lba.0 + i as u64;
            let mut data = [0u8; SECTOR_SIZE];
            data.copy_from_slice(chunk);
            self.sectors.insert(lba, data);
            self.write_log.push(lba);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

/// Device whose reads and writes always fail.
pub struct BrokenDisk;

impl BlockIo for BrokenDisk {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(524_288)
    }

    fn read_blocks(&mut self, _start_lba: Lba, _dst: &mut [u8]) -> Result<(), Self::Error> {
        Err(io::Error::new(io::ErrorKind::Other, "media error"))
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Err(io::Error::new(io::ErrorKind::Other, "media error"))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// 4096-byte sector device, rejected by the formatter.
pub struct LargeSectorDisk;

impl BlockIo for LargeSectorDisk {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_4096
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(65_536)
    }

    fn read_blocks(&mut self, _start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        dst.fill(0);
        Ok(())
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
