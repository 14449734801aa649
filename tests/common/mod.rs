//! Builders for synthetic Registry.pol blobs.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const REG_SZ: u32 = 1;
pub const REG_BINARY: u32 = 3;
pub const REG_DWORD: u32 = 4;
pub const REG_QWORD: u32 = 11;

pub fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// UTF-16LE text with the trailing NUL the format stores for strings.
pub fn utf16z(s: &str) -> Vec<u8> {
    let mut out = utf16(s);
    out.extend([0, 0]);
    out
}

/// Writes `[key;value;type;size;data]` records after a PReg v1 header.
#[derive(Debug, Clone)]
pub struct PolBuilder {
    bytes: Vec<u8>,
}

impl Default for PolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolBuilder {
    pub fn new() -> Self {
        Self {
            bytes: b"PReg\x01\x00\x00\x00".to_vec(),
        }
    }

    pub fn record(mut self, key: &str, value: &str, code: u32, data: &[u8]) -> Self {
        self.bytes.extend(utf16("["));
        self.bytes.extend(utf16(key));
        self.bytes.extend([0, 0, 0x3B, 0]);
        self.bytes.extend(utf16(value));
        self.bytes.extend([0, 0, 0x3B, 0]);
        self.bytes.extend(code.to_le_bytes());
        self.bytes.extend([0x3B, 0]);
        self.bytes.extend((data.len() as u32).to_le_bytes());
        self.bytes.extend([0x3B, 0]);
        self.bytes.extend_from_slice(data);
        self.bytes.extend(utf16("]"));
        self
    }

    pub fn dword(self, key: &str, value: &str, n: u32) -> Self {
        self.record(key, value, REG_DWORD, &n.to_le_bytes())
    }

    pub fn string(self, key: &str, value: &str, s: &str) -> Self {
        self.record(key, value, REG_SZ, &utf16z(s))
    }

    /// Appends raw bytes, e.g. a record cut short.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Writes `bytes` to `dir/relative`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}
