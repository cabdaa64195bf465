//! Utility functions for binary parsing and name comparison.

use crate::error::{RegistryError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Reads a u32 from a byte slice at the given offset.
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    if offset + 4 > data.len() {
        return Err(RegistryError::truncated(
            offset as u64,
            4,
            data.len().saturating_sub(offset),
        ));
    }

    let mut cursor = Cursor::new(&data[offset..offset + 4]);
    Ok(cursor.read_u32::<LittleEndian>()?)
}

/// Reads a u16 from a byte slice at the given offset.
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    if offset + 2 > data.len() {
        return Err(RegistryError::truncated(
            offset as u64,
            2,
            data.len().saturating_sub(offset),
        ));
    }

    let mut cursor = Cursor::new(&data[offset..offset + 2]);
    Ok(cursor.read_u16::<LittleEndian>()?)
}

/// Checks a 4-byte signature at the start of `data`.
pub fn check_signature(data: &[u8], expected: &[u8; 4]) -> Result<()> {
    if data.len() < 4 {
        return Err(RegistryError::truncated(0, 4, data.len()));
    }
    if &data[0..4] != expected {
        return Err(RegistryError::invalid_signature(expected, &data[0..4]));
    }
    Ok(())
}

/// Returns true if a 4-byte signature is present at the start of `data`.
pub fn has_signature(data: &[u8], expected: &[u8; 4]) -> bool {
    data.len() >= 4 && &data[0..4] == expected
}

/// Interprets a stored offset, where any negative value means "none".
#[inline]
pub fn optional_offset(raw: u32) -> Option<u32> {
    if (raw as i32) < 0 {
        None
    } else {
        Some(raw)
    }
}

/// Compares two registry names the way Windows does: case-insensitively,
/// one character at a time.
pub fn names_equal(left: &str, right: &str) -> bool {
    left.chars().map(upper_char).eq(right.chars().map(upper_char))
}

/// Maps a character to its uppercase form, keeping characters whose
/// uppercase form is more than one character (such as `ß`).
fn upper_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => c,
    }
}

/// Splits a `\`-separated key path into its non-empty segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32_le(&data, 0).unwrap(), 0x04030201);
        assert!(read_u32_le(&data, 1).is_err());
    }

    #[test]
    fn test_read_u16_le() {
        let data = [0x34, 0x12];
        assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
        assert!(matches!(
            read_u16_le(&data, 1),
            Err(RegistryError::TruncatedData { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_signature() {
        assert!(check_signature(b"CREG\x00\x00", b"CREG").is_ok());
        assert!(matches!(
            check_signature(b"regf", b"CREG"),
            Err(RegistryError::InvalidSignature { .. })
        ));
        assert!(has_signature(b"RGDB1234", b"RGDB"));
        assert!(!has_signature(b"RG", b"RGDB"));
    }

    #[test]
    fn test_optional_offset() {
        assert_eq!(optional_offset(0x20), Some(0x20));
        assert_eq!(optional_offset(0xFFFF_FFFF), None);
    }

    #[test]
    fn test_names_equal() {
        assert!(names_equal("Software", "SOFTWARE"));
        assert!(!names_equal("straße", "STRASSE"));
        assert!(names_equal("Straße", "STRAßE"));
        assert!(names_equal("Éditeur", "éditeur"));
        assert!(!names_equal("Software", "Softwar"));
    }

    #[test]
    fn test_path_segments() {
        let segments: Vec<&str> = path_segments("\\Software\\\\Microsoft\\").collect();
        assert_eq!(segments, vec!["Software", "Microsoft"]);
        assert_eq!(path_segments("").count(), 0);
    }
}
