//! Field state machine for the Registry.pol record stream.
//!
//! After the 8-byte header, a policy blob is a flat sequence of records:
//!
//! ```text
//! [ key ;value ;type ;size ;data ]
//!
//! key    UTF-16LE text, NUL-terminated, followed by ';'   (00 00 3B 00)
//! value  UTF-16LE text, NUL-terminated                     (00 00)
//! type   u32 LE, followed by ';' at +4                     (3B 00)
//! size   u32 LE, followed by ';' at +4                     (3B 00)
//! data   `size` raw bytes
//! ```
//!
//! The brackets are not parsed as delimiters. The closing `]` of one record and
//! the opening `[` of the next accumulate into the next key's text and are
//! stripped, and the `;` left behind by the key terminator becomes the first
//! unit of the value-name text and is dropped there.
//!
//! [`FieldMachine`] owns its cursor and record builder; no state survives a
//! decode. It yields completed [`RecordEntry`] values and stops at the first
//! read that the buffer cannot satisfy, discarding any partial record.

use crate::cursor::ByteCursor;
use crate::error::{PolicyError, Result};
use crate::hive::Hive;
use crate::record::RecordEntry;
use crate::utils::{decode_utf16_lossy, UTF16_NUL, UTF16_SEMICOLON};
use crate::value::{decode_value, DEFAULT_BLOB_THRESHOLD};
use crate::value_type::ValueType;
use std::iter::FusedIterator;
use tracing::{debug, warn};

/// Terminator of the key field: NUL followed by `;`.
pub const KEY_TERMINATOR: [u8; 4] = [0x00, 0x00, 0x3B, 0x00];

/// Prefix marking a value deletion policy.
pub const DELETE_MARKER: &str = "**del.";

/// Width of the type and size fields including their `;` terminator.
const NUMERIC_FIELD_LEN: usize = 6;

/// Offset of the `;` terminator inside a numeric field.
const NUMERIC_TERMINATOR_OFFSET: usize = 4;

/// What to do when the size field terminator is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeFieldPolicy {
    /// Stop decoding the file, keeping completed records.
    #[default]
    FailFast,
    /// Step forward one code unit at a time, at most `max_skips` times, then
    /// stop as with `FailFast`.
    Realign {
        /// Maximum number of 2-byte steps per size field.
        max_skips: usize,
    },
}

/// Decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Payloads larger than this many bytes render as `(BLOB)`.
    pub blob_threshold: usize,
    /// Recovery policy for a misplaced size terminator.
    pub size_field_policy: SizeFieldPolicy,
    /// Decode batches of files on the rayon pool.
    pub parallel: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            blob_threshold: DEFAULT_BLOB_THRESHOLD,
            size_field_policy: SizeFieldPolicy::default(),
            parallel: true,
        }
    }
}

impl DecodeOptions {
    /// Sets the blob threshold.
    pub fn with_blob_threshold(mut self, blob_threshold: usize) -> Self {
        self.blob_threshold = blob_threshold;
        self
    }

    /// Sets the size field recovery policy.
    pub fn with_size_field_policy(mut self, policy: SizeFieldPolicy) -> Self {
        self.size_field_policy = policy;
        self
    }

    /// Enables or disables parallel batch decoding.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Field the next bytes belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    /// Accumulating the key path.
    AwaitKey,
    /// Accumulating the value name.
    AwaitValueName,
    /// Looking for the type code.
    AwaitType,
    /// Looking for the data size.
    AwaitSize,
    /// Reading the payload.
    AwaitData,
}

/// Fields of the record under construction.
#[derive(Debug, Default)]
struct RawRecord {
    key: String,
    value_name: String,
    /// `None` until the type field is read, and for codes outside the table.
    value_type: Option<ValueType>,
    type_code: u32,
    data_size: usize,
}

/// Outcome of one state handler.
enum Step {
    /// Move to (or stay in) a state.
    Next(FieldState),
    /// A record completed.
    Emit(RecordEntry),
    /// A record completed but cannot be represented; drop it.
    Discard,
}

/// Streaming decoder over the body of one policy blob.
///
/// ```
/// use regpol_parser::{DecodeOptions, FieldMachine, Hive};
///
/// let body: Vec<u8> = Vec::new();
/// let mut machine = FieldMachine::new(&body, Hive::Unknown, "empty", DecodeOptions::default());
/// assert!(machine.next().is_none());
/// assert!(!machine.is_truncated());
/// ```
#[derive(Debug)]
pub struct FieldMachine<'a> {
    cursor: ByteCursor<'a>,
    state: FieldState,
    text: Vec<u8>,
    record: RawRecord,
    size_skips: usize,
    hive: Hive,
    source: &'a str,
    options: DecodeOptions,
    stop: Option<PolicyError>,
    truncated: bool,
}

impl<'a> FieldMachine<'a> {
    /// Creates a machine over a record stream (header already removed).
    pub fn new(body: &'a [u8], hive: Hive, source: &'a str, options: DecodeOptions) -> Self {
        Self {
            cursor: ByteCursor::new(body),
            state: FieldState::AwaitKey,
            text: Vec::new(),
            record: RawRecord::default(),
            size_skips: 0,
            hive,
            source,
            options,
            stop: None,
            truncated: false,
        }
    }

    /// Returns the active state.
    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Returns the cursor offset within the body.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Returns the error that ended decoding, once it has ended.
    ///
    /// A clean end of file is reported as `OutOfBounds` too.
    pub fn termination(&self) -> Option<&PolicyError> {
        self.stop.as_ref()
    }

    /// Returns true if decoding ended with a partial record discarded.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn step(&mut self) -> Result<Step> {
        match self.state {
            FieldState::AwaitKey => self.on_key(),
            FieldState::AwaitValueName => self.on_value_name(),
            FieldState::AwaitType => self.on_type(),
            FieldState::AwaitSize => self.on_size(),
            FieldState::AwaitData => self.on_data(),
        }
    }

    fn on_key(&mut self) -> Result<Step> {
        if self.cursor.peek(KEY_TERMINATOR.len())? != KEY_TERMINATOR {
            self.text.extend_from_slice(self.cursor.read(2)?);
            return Ok(Step::Next(FieldState::AwaitKey));
        }

        let mut key = self.take_text();
        if key.contains('[') {
            key.retain(|c| c != '[' && c != ']');
        }
        self.record.key = key;
        // Only the NUL is consumed; the ';' leads the value-name text.
        self.cursor.advance(2)?;
        Ok(Step::Next(FieldState::AwaitValueName))
    }

    fn on_value_name(&mut self) -> Result<Step> {
        if self.cursor.peek(UTF16_NUL.len())? != UTF16_NUL {
            self.text.extend_from_slice(self.cursor.read(2)?);
            return Ok(Step::Next(FieldState::AwaitValueName));
        }

        let mut name = self.take_text();
        let lead = name.chars().next().map_or(0, char::len_utf8);
        if name[lead..].contains(DELETE_MARKER) {
            name = name.replace(DELETE_MARKER, "");
        }
        self.record.value_name = name.chars().skip(1).collect();
        self.cursor.advance(2)?;
        Ok(Step::Next(FieldState::AwaitType))
    }

    fn on_type(&mut self) -> Result<Step> {
        if !self
            .cursor
            .matches_at(NUMERIC_TERMINATOR_OFFSET, &UTF16_SEMICOLON)?
        {
            self.cursor.advance(2)?;
            return Ok(Step::Next(FieldState::AwaitType));
        }

        // Only the low byte carries the code.
        let code = u32::from(self.cursor.peek(1)?[0]);
        self.record.type_code = code;
        self.record.value_type = ValueType::from_code(code);
        if self.record.value_type.is_none() {
            let err = PolicyError::UnknownTypeCode {
                code,
                offset: self.cursor.position(),
            };
            warn!(error = %err, source = self.source, "Value type outside the type table");
        }
        self.cursor.advance(NUMERIC_FIELD_LEN)?;
        Ok(Step::Next(FieldState::AwaitSize))
    }

    fn on_size(&mut self) -> Result<Step> {
        let offset = self.cursor.position();
        if !self
            .cursor
            .matches_at(NUMERIC_TERMINATOR_OFFSET, &UTF16_SEMICOLON)?
        {
            return match self.options.size_field_policy {
                SizeFieldPolicy::Realign { max_skips } if self.size_skips < max_skips => {
                    self.size_skips += 1;
                    warn!(source = self.source, offset, skip = self.size_skips, "Realigning size field");
                    self.cursor.advance(2)?;
                    Ok(Step::Next(FieldState::AwaitSize))
                }
                _ => Err(PolicyError::MalformedSizeField { offset }),
            };
        }

        self.record.data_size = self.cursor.read_u32()? as usize;
        self.cursor.advance(NUMERIC_FIELD_LEN - 4)?;
        self.size_skips = 0;
        Ok(Step::Next(FieldState::AwaitData))
    }

    fn on_data(&mut self) -> Result<Step> {
        let data = self.cursor.read(self.record.data_size)?;
        let record = std::mem::take(&mut self.record);

        let Some(value_type) = record.value_type else {
            warn!(
                key = %record.key,
                value = %record.value_name,
                code = record.type_code,
                "Dropping record with unknown value type"
            );
            return Ok(Step::Discard);
        };

        let entry = RecordEntry {
            hive: self.hive,
            key: record.key,
            value_name: record.value_name,
            value_type,
            data: decode_value(value_type, data, self.options.blob_threshold),
            source: self.source.to_string(),
        };
        debug!(key = %entry.key, value = %entry.value_name, value_type = %entry.value_type, "Decoded record");
        Ok(Step::Emit(entry))
    }

    fn take_text(&mut self) -> String {
        let text = decode_utf16_lossy(&self.text);
        self.text.clear();
        text
    }

    fn reset(&mut self) {
        self.state = FieldState::AwaitKey;
        self.record = RawRecord::default();
        self.text.clear();
        self.size_skips = 0;
    }

    /// True if bytes of an unfinished record are pending.
    ///
    /// Stray brackets and NUL padding between records do not count.
    fn has_partial_record(&self) -> bool {
        self.state != FieldState::AwaitKey
            || decode_utf16_lossy(&self.text)
                .chars()
                .any(|c| !matches!(c, '[' | ']' | '\0'))
    }

    fn halt(&mut self, err: PolicyError) {
        self.truncated = self.has_partial_record();
        if !err.is_end_of_stream() {
            warn!(error = %err, source = self.source, state = ?self.state, "Stopping decode on malformed input");
        } else if self.truncated {
            warn!(
                source = self.source,
                state = ?self.state,
                offset = self.cursor.position(),
                "Stream ended inside a record; partial record discarded"
            );
        } else {
            debug!(source = self.source, "End of record stream");
        }
        self.stop = Some(err);
    }
}

impl Iterator for FieldMachine<'_> {
    type Item = RecordEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stop.is_some() {
            return None;
        }

        loop {
            match self.step() {
                Ok(Step::Next(state)) => self.state = state,
                Ok(Step::Emit(entry)) => {
                    self.reset();
                    return Some(entry);
                }
                Ok(Step::Discard) => self.reset(),
                Err(err) => {
                    self.halt(err);
                    return None;
                }
            }
        }
    }
}

impl FusedIterator for FieldMachine<'_> {}
