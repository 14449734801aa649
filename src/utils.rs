//! Utility functions for binary parsing and string conversion.

use crate::error::{PolicyError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::UTF_16LE;
use std::io::Cursor;

/// UTF-16LE NUL code unit.
pub const UTF16_NUL: [u8; 2] = [0x00, 0x00];

/// UTF-16LE `;` code unit, the field separator of policy records.
pub const UTF16_SEMICOLON: [u8; 2] = [0x3B, 0x00];

/// Decodes UTF-16LE bytes, replacing malformed sequences.
///
/// No BOM sniffing is done: a leading `FF FE` is decoded as U+FEFF like any
/// other unit. A dangling odd byte becomes U+FFFD.
pub fn decode_utf16_lossy(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    let (decoded, _had_errors) = UTF_16LE.decode_without_bom_handling(data);
    decoded.into_owned()
}

/// Strips every trailing `00 00` pair from a byte slice.
///
/// The check looks at the last two bytes regardless of unit alignment.
pub fn trim_utf16_nuls(mut data: &[u8]) -> &[u8] {
    while data.ends_with(&UTF16_NUL) {
        data = &data[..data.len() - 2];
    }
    data
}

/// Reads a fixed-length ASCII field, mapping NULs to spaces and trimming.
pub fn read_fixed_ascii(data: &[u8], len: usize) -> String {
    data.iter()
        .take(len)
        .map(|&b| if b == 0 { ' ' } else { b as char })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Reads a u32 from a byte slice at the given offset.
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    if offset + 4 > data.len() {
        return Err(PolicyError::out_of_bounds(offset, 4, data.len()));
    }

    let mut cursor = Cursor::new(&data[offset..offset + 4]);
    Ok(cursor.read_u32::<LittleEndian>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_decode_utf16_lossy() {
        assert_eq!(decode_utf16_lossy(&utf16("Software\\Policies")), "Software\\Policies");
        assert_eq!(decode_utf16_lossy(&[]), "");
    }

    #[test]
    fn test_decode_utf16_keeps_leading_bom() {
        let mut data = vec![0xFF, 0xFE];
        data.extend(utf16("x"));
        assert_eq!(decode_utf16_lossy(&data), "\u{FEFF}x");
    }

    #[test]
    fn test_trim_utf16_nuls() {
        let mut data = utf16("abc");
        data.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(trim_utf16_nuls(&data), utf16("abc").as_slice());

        // Embedded terminators of a multi-string survive
        let multi = utf16("a\0b\0\0");
        assert_eq!(decode_utf16_lossy(trim_utf16_nuls(&multi)), "a\0b");
    }

    #[test]
    fn test_trim_all_nuls() {
        assert!(trim_utf16_nuls(&[0, 0, 0, 0]).is_empty());
    }

    #[test]
    fn test_read_fixed_ascii() {
        assert_eq!(read_fixed_ascii(b"PReg\0\0", 6), "PReg");
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32_le(&data, 0).unwrap(), 0x04030201);
        assert!(read_u32_le(&data, 1).unwrap_err().is_end_of_stream());
    }
}
