//! Cross-file merging, deduplication and filtering of decoded records.
//!
//! Records are keyed by the literal `(key, value name, rendered data)` triple.
//! A later duplicate replaces the earlier entry in place, so the set keeps
//! first-seen order while the last file processed wins. Filtering happens
//! after the merge, in [`Normalizer::finish`].

use crate::record::RecordEntry;
use crate::value::UNRESOLVED_MARKER;
use std::collections::HashMap;
use tracing::debug;

/// Identity of a record for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Key path.
    pub key: String,
    /// Value name.
    pub value_name: String,
    /// Rendered payload.
    pub data: String,
}

impl Fingerprint {
    /// Builds the fingerprint of an entry.
    pub fn of(entry: &RecordEntry) -> Self {
        Self {
            key: entry.key.clone(),
            value_name: entry.value_name.clone(),
            data: entry.rendered_data(),
        }
    }
}

/// Returns true if an entry may appear in a normalized result set.
///
/// REG_NONE and REG_BINARY entries are dropped, as is anything whose
/// rendered data still carries the unresolved placeholder.
pub fn is_retained(entry: &RecordEntry) -> bool {
    !entry.value_type.is_excluded() && !entry.rendered_data().contains(UNRESOLVED_MARKER)
}

/// Insertion-ordered map from fingerprint to entry.
#[derive(Debug, Clone, Default)]
struct FingerprintMap {
    entries: Vec<RecordEntry>,
    index: HashMap<Fingerprint, usize>,
}

impl FingerprintMap {
    /// Inserts or replaces; returns true if the fingerprint was new.
    fn upsert(&mut self, entry: RecordEntry) -> bool {
        let fingerprint = Fingerprint::of(&entry);
        match self.index.get(&fingerprint) {
            Some(&slot) => {
                self.entries[slot] = entry;
                false
            }
            None => {
                self.index.insert(fingerprint, self.entries.len());
                self.entries.push(entry);
                true
            }
        }
    }
}

/// Accumulates records from any number of files.
#[derive(Debug, Default)]
pub struct Normalizer {
    map: FingerprintMap,
    received: usize,
}

impl Normalizer {
    /// Creates an empty normalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one record; returns true if its fingerprint was not seen before.
    pub fn insert(&mut self, entry: RecordEntry) -> bool {
        self.received += 1;
        self.map.upsert(entry)
    }

    /// Merges a file's worth of records.
    pub fn extend<I: IntoIterator<Item = RecordEntry>>(&mut self, entries: I) {
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Number of distinct fingerprints merged so far, before filtering.
    pub fn len(&self) -> usize {
        self.map.entries.len()
    }

    /// Returns true if nothing has been merged.
    pub fn is_empty(&self) -> bool {
        self.map.entries.is_empty()
    }

    /// Applies the filter and freezes the result.
    pub fn finish(self) -> NormalizedResultSet {
        let distinct = self.map.entries.len();
        let mut result = NormalizedResultSet::default();
        for entry in self.map.entries.into_iter().filter(is_retained) {
            result.map.upsert(entry);
        }
        debug!(
            received = self.received,
            distinct,
            retained = result.len(),
            "Normalized policy records"
        );
        result
    }
}

/// Deduplicated, filtered records from one invocation.
///
/// Holds at most one entry per fingerprint and never a REG_NONE, REG_BINARY
/// or unresolved entry.
#[derive(Debug, Clone, Default)]
pub struct NormalizedResultSet {
    map: FingerprintMap,
}

impl NormalizedResultSet {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.entries.len()
    }

    /// Returns true if no entries survived.
    pub fn is_empty(&self) -> bool {
        self.map.entries.is_empty()
    }

    /// Iterates over entries in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, RecordEntry> {
        self.map.entries.iter()
    }

    /// Looks up an entry by fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&RecordEntry> {
        self.map
            .index
            .get(fingerprint)
            .map(|&slot| &self.map.entries[slot])
    }

    /// Merges another set into this one, keeping the dedup invariant.
    pub fn merge(&mut self, other: NormalizedResultSet) {
        for entry in other.map.entries {
            self.map.upsert(entry);
        }
    }

    /// Returns the entries as a vector.
    pub fn into_vec(self) -> Vec<RecordEntry> {
        self.map.entries
    }

    /// Serializes the entries as a JSON array.
    #[cfg(feature = "json")]
    pub fn to_json(&self, pretty: bool) -> crate::error::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(&self.map.entries)?
        } else {
            serde_json::to_string(&self.map.entries)?
        };
        Ok(json)
    }
}

impl<'a> IntoIterator for &'a NormalizedResultSet {
    type Item = &'a RecordEntry;
    type IntoIter = std::slice::Iter<'a, RecordEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for NormalizedResultSet {
    type Item = RecordEntry;
    type IntoIter = std::vec::IntoIter<RecordEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.entries.into_iter()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for NormalizedResultSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
