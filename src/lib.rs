//! # Group Policy Registry.pol Parser
//!
//! A fast, memory-mapped decoder for Group Policy `Registry.pol` files, with
//! readers for `GptTmpl.inf` security templates and preference XML files.
//!
//! ## Features
//!
//! - **Streaming decode**: records are produced one at a time by a field-level
//!   state machine over a bounds-checked cursor
//! - **Deterministic batches**: files decode in parallel and merge in input order
//! - **Normalization**: duplicate settings collapse, typeless and unresolved
//!   values are dropped
//! - **Preferences**: `Groups.xml`, `ScheduledTasks.xml` and friends reduced to
//!   their interesting fields
//! - **Search**: case-insensitive matching over decoded records, templates and
//!   preference entries
//!
//! ## Binary Layout
//!
//! ```text
//! [Header - 8 bytes]
//!   - Signature: "PReg"
//!   - Version: u32 (1)
//!
//! [Records - repeated, UTF-16LE text]
//!   [ key 00 00 ; 00 value 00 00 ; 00 type(u32) ; 00 size(u32) ; 00 data ]
//! ```
//!
//! The hive of every record comes from the file's location: a path containing
//! `User` is HKCU, one containing `Machine` is HKLM.
//!
//! ## Examples
//!
//! ### Single file
//!
//! ```no_run
//! use regpol_parser::{DecodeOptions, PolicyFile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = PolicyFile::open("Policies/{GUID}/Machine/Registry.pol")?;
//! for record in file.records(DecodeOptions::default()) {
//!     println!("{}", record);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Batch with search
//!
//! ```no_run
//! use regpol_parser::{decode_files, DecodeOptions, SearchPattern};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = ["gpo1/Machine/Registry.pol", "gpo1/User/Registry.pol"];
//! let report = decode_files(&paths, DecodeOptions::default())?;
//!
//! let pattern = SearchPattern::new("defender")?;
//! for record in pattern.find_records(&report.results) {
//!     println!("{} {} = {}", record.hive, record.key, record.data);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod cursor;
pub mod error;
pub mod header;
pub mod hive;
pub mod inf;
pub mod machine;
pub mod normalize;
pub mod policy;
pub mod record;
pub mod search;
pub mod utils;
pub mod value;
pub mod value_type;
pub mod xml;

// Python bindings (only compiled when python feature is enabled)
#[cfg(feature = "python")]
pub mod python;

// Re-export main types for convenience
pub use batch::{decode_buffers, decode_files, BatchReport, FileFailure};
pub use cursor::ByteCursor;
pub use error::{PolicyError, Result};
pub use header::PolicyHeader;
pub use hive::Hive;
pub use inf::{InfDocument, InfParser, InfReport};
pub use machine::{DecodeOptions, FieldMachine, FieldState, SizeFieldPolicy};
pub use normalize::{Fingerprint, NormalizedResultSet, Normalizer};
pub use policy::PolicyFile;
pub use record::RecordEntry;
pub use search::{InfMatch, SearchPattern, XmlMatch};
pub use value::{decode_value, ValueData};
pub use value_type::{ValueType, TYPE_TABLE};
pub use xml::{extract, ArtifactFile, ArtifactKind, XmlMap, XmlParser, XmlReport, XmlValue};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
