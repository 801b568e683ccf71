// 8.3 short file names

use core::fmt;

use crate::error::{FdiskError, Result};

/// Space-padded 8.3 name as stored in a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortName(pub [u8; 11]);

impl ShortName {
    /// Accepts `NAME.EXT` or the raw padded 11-character form
    /// (`"MEGA65  ROM"`). Lowercase letters are upper-cased.
    pub fn parse(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        let mut out = [b' '; 11];

        if !name.contains('.') && bytes.len() == 11 {
            for (dst, &b) in out.iter_mut().zip(bytes) {
                *dst = normalize(b, true)?;
            }
            if out[0] == b' ' {
                return Err(FdiskError::InvalidName);
            }
            return Ok(Self(out));
        }

        let (base, ext) = match name.split_once('.') {
            Some((base, ext)) => (base.as_bytes(), ext.as_bytes()),
            None => (bytes, &[][..]),
        };
        if base.is_empty() || base.len() > 8 || ext.len() > 3 || ext.contains(&b'.') {
            return Err(FdiskError::InvalidName);
        }

        for (dst, &b) in out[..8].iter_mut().zip(base) {
            *dst = normalize(b, false)?;
        }
        for (dst, &b) in out[8..].iter_mut().zip(ext) {
            *dst = normalize(b, false)?;
        }
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 11] {
        &self.0
    }
}

fn normalize(b: u8, allow_space: bool) -> Result<u8> {
    match b {
        b'A'..=b'Z' | b'0'..=b'9' => Ok(b),
        b'a'..=b'z' => Ok(b.to_ascii_uppercase()),
        b' ' if allow_space => Ok(b),
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'(' | b')' | b'-' | b'@' | b'^' | b'_'
        | b'`' | b'{' | b'}' | b'~' => Ok(b),
        _ => Err(FdiskError::InvalidName),
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn trim(part: &[u8]) -> &str {
            let end = part.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
            core::str::from_utf8(&part[..end]).unwrap_or("?")
        }
        let ext = trim(&self.0[8..]);
        if ext.is_empty() {
            write!(f, "{}", trim(&self.0[..8]))
        } else {
            write!(f, "{}.{}", trim(&self.0[..8]), ext)
        }
    }
}
