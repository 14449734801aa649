//! Registry.pol file header.
//!
//! Every policy blob starts with an 8-byte header: the ASCII signature `PReg`
//! followed by a little-endian u32 format version (1 in every known file).
//! The decoder skips these bytes unconditionally; the parsed header is only
//! surfaced for diagnostics and is never used to reject a file.

use crate::error::{PolicyError, Result};
use crate::utils::{read_fixed_ascii, read_u32_le};
use std::fmt;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Expected signature of a policy blob ("PReg").
pub const PREG_SIGNATURE: &[u8; 4] = b"PReg";

/// Format version written by every known producer.
pub const PREG_VERSION: u32 = 1;

/// Policy blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyHeader {
    /// Signature bytes, normally "PReg".
    pub signature: [u8; 4],

    /// Format version.
    pub version: u32,
}

impl PolicyHeader {
    /// Reads the header from the start of a buffer.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` if the buffer is shorter than [`HEADER_SIZE`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(PolicyError::out_of_bounds(0, HEADER_SIZE, data.len()));
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&data[0..4]);
        let version = read_u32_le(data, 4)?;

        Ok(Self { signature, version })
    }

    /// Returns true if the header carries the expected signature and version.
    pub fn is_well_formed(&self) -> bool {
        &self.signature == PREG_SIGNATURE && self.version == PREG_VERSION
    }
}

impl fmt::Display for PolicyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{}",
            read_fixed_ascii(&self.signature, self.signature.len()),
            self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let data = b"PReg\x01\x00\x00\x00[";
        let header = PolicyHeader::parse(data).unwrap();
        assert_eq!(&header.signature, PREG_SIGNATURE);
        assert_eq!(header.version, 1);
        assert!(header.is_well_formed());
        assert_eq!(header.to_string(), "PReg v1");
    }

    #[test]
    fn test_foreign_signature_is_not_an_error() {
        let header = PolicyHeader::parse(b"XXXX\x02\x00\x00\x00").unwrap();
        assert!(!header.is_well_formed());
    }

    #[test]
    fn test_too_small() {
        let result = PolicyHeader::parse(b"PReg");
        assert!(matches!(result.unwrap_err(), PolicyError::OutOfBounds { .. }));
    }
}
