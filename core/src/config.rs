//! Format configuration.
//!
//! Geometry constants fixed by the MEGA65 layout, plus the few knobs a
//! caller may change when formatting.

/// Sectors per cluster (4 KiB clusters).
pub const SECTORS_PER_CLUSTER: u8 = 8;

/// Reserved sectors in front of FAT1.
pub const RESERVED_SECTORS: u32 = 568;

/// Number of mirrored FAT copies.
pub const FAT_COPIES: u32 = 2;

/// First sector of the FAT32 partition (1 MiB).
pub const FAT_PARTITION_START: u32 = 0x0800;

/// Upper bound for the MEGA65 system partition (2 GiB in sectors).
pub const MAX_SYS_PARTITION_SECTORS: u32 = 2 * 1024 * 1024 * 1024 / 512;

/// Default volume label, also written as the root volume-ID entry.
pub const DEFAULT_VOLUME_LABEL: [u8; 11] = *b"M.E.G.A.65!";

/// Default volume serial ("mfba").
pub const DEFAULT_VOLUME_ID: [u8; 4] = *b"mfba";

/// Format configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    /// Volume label, space padded.
    pub volume_label: [u8; 11],
    /// Volume serial number bytes as stored at boot sector offset 0x43.
    pub volume_id: [u8; 4],
    /// Zero the gaps between FAT32 structures and the FAT/root remainders.
    pub clear_structures: bool,
    /// Zero the system partition configuration area and slot directories.
    pub erase_system_areas: bool,
    /// Use this sector count instead of asking the device.
    pub sector_count: Option<u32>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            volume_label: DEFAULT_VOLUME_LABEL,
            volume_id: DEFAULT_VOLUME_ID,
            clear_structures: true,
            erase_system_areas: true,
            sector_count: None,
        }
    }
}

impl FormatConfig {
    /// Set the volume label. Longer labels are truncated, shorter ones
    /// padded with spaces; lowercase ASCII is upper-cased.
    pub fn label(mut self, label: &str) -> Self {
        let mut out = [b' '; 11];
        for (dst, src) in out.iter_mut().zip(label.bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        self.volume_label = out;
        self
    }

    /// Set the volume serial number.
    pub fn volume_id(mut self, id: [u8; 4]) -> Self {
        self.volume_id = id;
        self
    }

    /// Report a fixed device size instead of probing the device.
    pub fn sectors(mut self, count: u32) -> Self {
        self.sector_count = Some(count);
        self
    }

    /// Only write the structures themselves, skipping every zero-fill pass.
    pub fn minimal(mut self) -> Self {
        self.clear_structures = false;
        self.erase_system_areas = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label() {
        assert_eq!(&FormatConfig::default().volume_label, b"M.E.G.A.65!");
    }

    #[test]
    fn test_label_is_padded_and_upper_cased() {
        let config = FormatConfig::default().label("games");
        assert_eq!(&config.volume_label, b"GAMES      ");
    }

    #[test]
    fn test_label_is_truncated() {
        let config = FormatConfig::default().label("a-very-long-label");
        assert_eq!(&config.volume_label, b"A-VERY-LONG");
    }

    #[test]
    fn test_minimal_disables_erasure() {
        let config = FormatConfig::default().minimal().sectors(8192);
        assert!(!config.clear_structures);
        assert!(!config.erase_system_areas);
        assert_eq!(config.sector_count, Some(8192));
    }
}
