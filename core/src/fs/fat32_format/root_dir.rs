// First sector of the root directory: the volume label entry

use crate::disk::sector::SectorBuf;

/// Attribute, timestamps and dates of the volume label entry
/// (attr 0x08, created/modified 2017-04-19 21:50:38).
const LABEL_ENTRY_TAIL: [u8; 15] = [
    0x08, 0x00, 0x00, 0x53, 0xAE, 0x93, 0x4A, 0x93, 0x4A, 0x00, 0x00, 0x53, 0xAE, 0x93, 0x4A,
];

pub fn build_root_dir(buf: &mut SectorBuf, volume_label: [u8; 11]) {
    buf.fill(0);
    buf[..11].copy_from_slice(&volume_label);
    buf[11..26].copy_from_slice(&LABEL_ENTRY_TAIL);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::sector::SECTOR_SIZE;
    use crate::fs::fat32_ops::types::{DirEntry, ATTR_VOLUME_ID};

    #[test]
    fn test_root_dir_bytes() {
        let mut buf = [0xFFu8; SECTOR_SIZE];
        build_root_dir(&mut buf, *b"M.E.G.A.65!");
        assert_eq!(&buf[..11], b"M.E.G.A.65!");
        assert_eq!(
            &buf[11..26],
            &[8, 0, 0, 0x53, 0xAE, 0x93, 0x4A, 0x93, 0x4A, 0, 0, 0x53, 0xAE, 0x93, 0x4A]
        );
        assert!(buf[26..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_label_entry_decodes() {
        let mut buf = [0u8; SECTOR_SIZE];
        build_root_dir(&mut buf, *b"M.E.G.A.65!");
        let entry = DirEntry::from_bytes(&buf[..32]);
        assert_eq!(entry.attr, ATTR_VOLUME_ID);
        assert!(entry.is_volume_label());
        assert_eq!(entry.first_cluster(), 0);
        assert_eq!(entry.file_size, 0);
    }
}
