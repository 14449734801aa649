//! Sequential, bounds-checked reader over an immutable byte buffer.
//!
//! `ByteCursor` tracks a single read offset. Every peek or advance that would
//! run past the end of the buffer fails with [`PolicyError::OutOfBounds`],
//! which decoders treat as end-of-stream.

use crate::error::{PolicyError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// A position-tracking reader over a borrowed byte slice.
///
/// # Example
///
/// ```
/// use regpol_parser::cursor::ByteCursor;
///
/// let data = [0x3B, 0x00, 0x04, 0x00, 0x00, 0x00];
/// let mut cursor = ByteCursor::new(&data);
///
/// assert_eq!(cursor.read(2).unwrap(), &[0x3B, 0x00]);
/// assert_eq!(cursor.read_u32().unwrap(), 4);
/// assert!(cursor.is_exhausted());
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of bytes left from the current offset.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns true once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns `count` bytes starting `skip` bytes past the current offset,
    /// without moving.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` if the range ends past the buffer.
    pub fn peek_at(&self, skip: usize, count: usize) -> Result<&'a [u8]> {
        let start = self
            .pos
            .checked_add(skip)
            .ok_or_else(|| PolicyError::out_of_bounds(self.pos, usize::MAX, self.data.len()))?;
        let end = start
            .checked_add(count)
            .ok_or_else(|| PolicyError::out_of_bounds(start, count, self.data.len()))?;

        if end > self.data.len() {
            return Err(PolicyError::out_of_bounds(start, count, self.data.len()));
        }

        Ok(&self.data[start..end])
    }

    /// Returns the next `count` bytes without moving.
    pub fn peek(&self, count: usize) -> Result<&'a [u8]> {
        self.peek_at(0, count)
    }

    /// Returns true if the bytes `skip` past the offset equal `pattern`.
    ///
    /// A range that runs past the buffer is an error, not a mismatch.
    pub fn matches_at(&self, skip: usize, pattern: &[u8]) -> Result<bool> {
        Ok(self.peek_at(skip, pattern.len())? == pattern)
    }

    /// Moves the offset forward by `count` bytes.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` if the new offset would pass the end of the buffer.
    /// The offset is left unchanged on error.
    pub fn advance(&mut self, count: usize) -> Result<()> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| PolicyError::out_of_bounds(self.pos, count, self.data.len()))?;
        self.pos = end;
        Ok(())
    }

    /// Reads `count` bytes and advances past them.
    pub fn read(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(count)?;
        self.pos += count;
        Ok(bytes)
    }

    /// Reads a little-endian u32 and advances past it.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read(4)?))
    }
}
