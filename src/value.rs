//! Policy value data decoding and rendering.

use crate::utils::{decode_utf16_lossy, trim_utf16_nuls};
use crate::value_type::ValueType;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Payloads larger than this many bytes are not interpreted.
pub const DEFAULT_BLOB_THRESHOLD: usize = 1024;

/// Rendering of a payload above the blob threshold.
pub const BLOB_MARKER: &str = "(BLOB)";

/// Rendering of a payload that was not decoded.
pub const UNRESOLVED_MARKER: &str = "??";

/// Decoded policy value data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueData {
    /// Payload above the blob threshold, any type.
    Blob,

    /// REG_SZ, REG_EXPAND_SZ or REG_MULTI_SZ text with trailing NULs removed.
    ///
    /// Multi-string separators are kept as embedded `\0` characters.
    String(String),

    /// REG_DWORD payload, raw bytes in stored (little-endian) order.
    Dword(Vec<u8>),

    /// Any other kind; not decoded.
    Unresolved,
}

impl ValueData {
    /// Returns the DWORD as an integer when the payload is exactly 4 bytes.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ValueData::Dword(bytes) if bytes.len() == 4 => Some(LittleEndian::read_u32(bytes)),
            _ => None,
        }
    }

    /// Returns true if the payload was left undecoded.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ValueData::Unresolved)
    }
}

impl fmt::Display for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueData::Blob => f.write_str(BLOB_MARKER),
            ValueData::String(s) => f.write_str(s),
            ValueData::Dword(bytes) => {
                let flipped: Vec<u8> = bytes.iter().rev().copied().collect();
                write!(f, "0x{}", hex::encode(flipped))
            }
            ValueData::Unresolved => f.write_str(UNRESOLVED_MARKER),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ValueData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Interprets a raw payload according to its value type.
///
/// The size check comes first: anything over `blob_threshold` bytes is a
/// [`ValueData::Blob`] whatever its type.
pub fn decode_value(value_type: ValueType, data: &[u8], blob_threshold: usize) -> ValueData {
    if data.len() > blob_threshold {
        return ValueData::Blob;
    }

    match value_type {
        ValueType::String | ValueType::ExpandString | ValueType::MultiString => {
            ValueData::String(decode_utf16_lossy(trim_utf16_nuls(data)))
        }
        ValueType::Dword => ValueData::Dword(data.to_vec()),
        _ => ValueData::Unresolved,
    }
}
