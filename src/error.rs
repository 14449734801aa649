//! Error types for policy parsing operations.
//!
//! Nothing in this crate is fatal to a batch: per-file errors are collected
//! as [`FileFailure`](crate::batch::FileFailure) values, stream errors end the
//! decode of a single file, and only an empty final result set is reported as
//! [`PolicyError::NothingFound`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors that can occur while reading or decoding policy artifacts.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// I/O error without path context.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A policy file could not be opened or read.
    #[error("Cannot access {}: {source}", path.display())]
    FileAccess {
        /// Path of the file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A read or advance would go past the end of the buffer.
    ///
    /// Decoders treat this as end-of-stream.
    #[error("Out of bounds at offset {offset:#x}: requested {requested} bytes, {available} available")]
    OutOfBounds {
        /// Cursor offset at the time of the request.
        offset: usize,
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes left in the buffer.
        available: usize,
    },

    /// Type code outside the fixed registry value type table.
    #[error("Unknown value type code {code} at offset {offset:#x}")]
    UnknownTypeCode {
        /// Raw type code (low byte of the type field).
        code: u32,
        /// Offset of the type field.
        offset: usize,
    },

    /// The size field terminator was not where the format expects it.
    #[error("Malformed size field at offset {offset:#x}")]
    MalformedSizeField {
        /// Offset of the size field.
        offset: usize,
    },

    /// Key/value line outside of any section in a strict INF parse.
    #[error("INF key outside of a section at line {line}")]
    InfSyntax {
        /// 1-based line number.
        line: usize,
    },

    /// A preference file is not well-formed XML.
    #[error("Invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Search term is not a valid regular expression.
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Result serialization failed.
    #[cfg(feature = "json")]
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Every input was processed and no entries survived.
    #[error("No data found ({attempted} files attempted, {failed} failed)")]
    NothingFound {
        /// Number of files handed to the batch.
        attempted: usize,
        /// Number of files that could not be read.
        failed: usize,
    },
}

impl PolicyError {
    /// Creates a file access error with path context.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use regpol_parser::error::PolicyError;
    /// let err = PolicyError::file_access(
    ///     "Machine/Registry.pol",
    ///     std::io::Error::from(std::io::ErrorKind::NotFound),
    /// );
    /// assert!(err.to_string().contains("Registry.pol"));
    /// ```
    pub fn file_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Creates an out-of-bounds error for a cursor request.
    pub fn out_of_bounds(offset: usize, requested: usize, len: usize) -> Self {
        Self::OutOfBounds {
            offset,
            requested,
            available: len.saturating_sub(offset),
        }
    }

    /// Returns true if this error only means the stream ran out of bytes.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}
