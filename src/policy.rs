//! Policy blob files and single-file decoding.

use crate::error::{PolicyError, Result};
use crate::header::{PolicyHeader, HEADER_SIZE};
use crate::hive::Hive;
use crate::machine::{DecodeOptions, FieldMachine};
use crate::record::RecordEntry;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Policy file bytes, either memory-mapped or owned.
enum PolicyData {
    /// Memory-mapped file data.
    Mapped(Mmap),
    /// Owned data (in-memory input or empty files).
    Owned(Vec<u8>),
}

impl PolicyData {
    fn as_slice(&self) -> &[u8] {
        match self {
            PolicyData::Mapped(mmap) => mmap,
            PolicyData::Owned(data) => data,
        }
    }
}

/// An immutable policy blob plus the label its hive is derived from.
///
/// # Examples
///
/// ```no_run
/// use regpol_parser::{DecodeOptions, PolicyFile};
///
/// let file = PolicyFile::open(r"Policies/{31B2F340}/Machine/Registry.pol").unwrap();
/// for record in file.records(DecodeOptions::default()) {
///     println!("{}", record);
/// }
/// ```
pub struct PolicyFile {
    data: PolicyData,
    label: String,
    hive: Hive,
}

impl PolicyFile {
    /// Opens a policy file read-only.
    ///
    /// The label is the path's display form, so the hive follows the
    /// `User` / `Machine` directory the file lives in.
    ///
    /// # Errors
    ///
    /// Returns `FileAccess` if the file cannot be opened, inspected or mapped.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PolicyError::file_access(path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| PolicyError::file_access(path, e))?
            .len();

        let data = if file_size == 0 {
            debug!("Empty policy file");
            PolicyData::Owned(Vec::new())
        } else {
            // SAFETY: the file is opened read-only, the mapping lives exactly
            // as long as this PolicyFile, and every access goes through
            // bounds-checked slices.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| PolicyError::file_access(path, e))?;
            debug!(size = mmap.len(), "Memory mapped policy file");
            PolicyData::Mapped(mmap)
        };

        Ok(Self::from_data(data, path.display().to_string()))
    }

    /// Wraps an in-memory blob.
    pub fn from_vec(data: Vec<u8>, label: impl Into<String>) -> Self {
        Self::from_data(PolicyData::Owned(data), label.into())
    }

    /// Wraps an existing memory map.
    pub fn from_mmap(mmap: Mmap, label: impl Into<String>) -> Self {
        Self::from_data(PolicyData::Mapped(mmap), label.into())
    }

    fn from_data(data: PolicyData, label: String) -> Self {
        let hive = Hive::from_label(&label);
        Self { data, label, hive }
    }

    /// Returns the source label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the hive every record of this file is tagged with.
    pub fn hive(&self) -> Hive {
        self.hive
    }

    /// Returns the raw bytes, header included.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Parses the 8-byte header.
    pub fn header(&self) -> Result<PolicyHeader> {
        PolicyHeader::parse(self.as_bytes())
    }

    /// Returns the record stream after the header.
    ///
    /// Files shorter than the header have an empty body.
    pub fn body(&self) -> &[u8] {
        let bytes = self.as_bytes();
        &bytes[HEADER_SIZE.min(bytes.len())..]
    }

    /// Returns a streaming decoder over this file's records.
    pub fn records(&self, options: DecodeOptions) -> FieldMachine<'_> {
        match self.header() {
            Ok(header) if header.is_well_formed() => debug!(source = %self.label, %header, "Policy header"),
            Ok(header) => debug!(source = %self.label, %header, "Unexpected policy header; decoding anyway"),
            Err(_) => debug!(source = %self.label, size = self.as_bytes().len(), "File shorter than header"),
        }
        FieldMachine::new(self.body(), self.hive, &self.label, options)
    }

    /// Decodes every complete record in the file.
    ///
    /// Never fails: a malformed or truncated stream yields the records that
    /// completed before the damage.
    pub fn decode(&self, options: DecodeOptions) -> Vec<RecordEntry> {
        let mut machine = self.records(options);
        let records: Vec<RecordEntry> = machine.by_ref().collect();

        if machine.is_truncated() {
            warn!(source = %self.label, records = records.len(), "Policy file truncated");
        }
        info!(source = %self.label, hive = %self.hive, records = records.len(), "Decoded policy file");
        records
    }
}

impl std::fmt::Debug for PolicyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyFile")
            .field("label", &self.label)
            .field("hive", &self.hive)
            .field("len", &self.as_bytes().len())
            .finish()
    }
}
