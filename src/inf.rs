//! GptTmpl.inf security template parsing.
//!
//! Security templates are INF-style text files, normally UTF-16LE with a BOM:
//!
//! ```text
//! [Unicode]
//! Unicode=yes
//! [System Access]
//! MinimumPasswordAge = 1
//! ```
//!
//! Parsing is line-oriented. Comments (`;`) and blank lines are ignored,
//! sections are reused when they repeat, and a repeated key overwrites the
//! earlier value.

use crate::batch::FileFailure;
use crate::error::{PolicyError, Result};
use encoding_rs::{Encoding, UTF_16LE, UTF_8};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Key/value pairs of one section.
pub type InfSection = BTreeMap<String, String>;

/// Merged contents of one or more security templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct InfDocument {
    sections: BTreeMap<String, InfSection>,
}

impl InfDocument {
    /// Returns a section by name.
    pub fn section(&self, name: &str) -> Option<&InfSection> {
        self.sections.get(name)
    }

    /// Returns a single value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Iterates over sections in name order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &InfSection)> {
        self.sections.iter().map(|(name, section)| (name.as_str(), section))
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns true if no section was found.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Serializes the document as a JSON object.
    #[cfg(feature = "json")]
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Outcome of parsing several templates.
#[derive(Debug, Default)]
pub struct InfReport {
    /// Merged document.
    pub document: InfDocument,
    /// Files that could not be read or parsed.
    pub failures: Vec<FileFailure>,
}

/// Line-oriented security template parser.
#[derive(Debug, Clone)]
pub struct InfParser {
    section: Regex,
    key_value: Regex,
    strict: bool,
}

impl InfParser {
    /// Creates a lenient parser.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if a line pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Both patterns are anchored at the start of the line only.
            section: Regex::new(r"^\[\s*(.*?)\s*\]")?,
            key_value: Regex::new(r"^(\S+)\s*=\s*(.*)")?,
            strict: false,
        })
    }

    /// In strict mode a key/value line before any section is an error
    /// instead of being skipped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parses template text into `document`.
    ///
    /// # Errors
    ///
    /// Returns `InfSyntax` in strict mode for a key outside any section.
    pub fn parse_str(&self, text: &str, document: &mut InfDocument) -> Result<()> {
        let mut current: Option<String> = None;

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if let Some(caps) = self.section.captures(line) {
                let name = caps[1].to_string();
                document.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let Some(caps) = self.key_value.captures(line) else {
                debug!(line = number + 1, "Ignoring unrecognized INF line");
                continue;
            };

            match &current {
                Some(section) => {
                    document
                        .sections
                        .entry(section.clone())
                        .or_default()
                        .insert(caps[1].to_string(), caps[2].to_string());
                }
                None if self.strict => return Err(PolicyError::InfSyntax { line: number + 1 }),
                None => warn!(line = number + 1, "INF key outside of a section"),
            }
        }

        Ok(())
    }

    /// Decodes template bytes and parses them into `document`.
    ///
    /// A UTF-16 or UTF-8 BOM selects the encoding; without one the text is
    /// taken as UTF-16LE, which is what Group Policy writes, unless the bytes
    /// look like plain ASCII.
    pub fn parse_bytes(&self, bytes: &[u8], document: &mut InfDocument) -> Result<()> {
        let encoding = match Encoding::for_bom(bytes) {
            Some((encoding, _)) => encoding,
            None if bytes.len() >= 2 && bytes[1] == 0 => UTF_16LE,
            None => UTF_8,
        };
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            debug!(encoding = encoding.name(), "Replaced malformed sequences in INF text");
        }
        self.parse_str(&text, document)
    }

    /// Parses one template file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<InfDocument> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| PolicyError::file_access(path, e))?;
        let mut document = InfDocument::default();
        self.parse_bytes(&bytes, &mut document)?;
        Ok(document)
    }

    /// Parses many template files into one document.
    ///
    /// A file that cannot be read or parsed is recorded and skipped; the
    /// sections it contributed before a strict-mode error are kept.
    pub fn parse_files<P: AsRef<Path>>(&self, paths: &[P]) -> InfReport {
        let mut report = InfReport::default();

        for path in paths {
            let path: &Path = path.as_ref();
            let outcome = fs::read(path)
                .map_err(|e| PolicyError::file_access(path, e))
                .and_then(|bytes| self.parse_bytes(&bytes, &mut report.document));

            if let Err(error) = outcome {
                warn!(path = %path.display(), %error, "Skipping security template");
                report.failures.push(FileFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }

        info!(
            files = paths.len(),
            failed = report.failures.len(),
            sections = report.document.len(),
            "Parsed security templates"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "[Unicode]\r\nUnicode=yes\r\n; comment\r\n\r\n[System Access]\r\nMinimumPasswordAge = 1\r\nMaximumPasswordAge = 42\r\n[Version]\r\nsignature=\"$CHICAGO$\"\r\nRevision=1\r\n";

    fn utf16_with_bom(s: &str) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFE];
        out.extend(s.encode_utf16().flat_map(u16::to_le_bytes));
        out
    }

    #[test]
    fn test_parse_sections() {
        let mut doc = InfDocument::default();
        InfParser::new().unwrap().parse_str(TEMPLATE, &mut doc).unwrap();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get("System Access", "MaximumPasswordAge"), Some("42"));
        assert_eq!(doc.get("Version", "signature"), Some("\"$CHICAGO$\""));
        assert_eq!(doc.get("Unicode", "; comment"), None);
    }

    #[test]
    fn test_parse_utf16_bytes() {
        let mut doc = InfDocument::default();
        InfParser::new()
            .unwrap()
            .parse_bytes(&utf16_with_bom(TEMPLATE), &mut doc)
            .unwrap();
        assert_eq!(doc.get("Unicode", "Unicode"), Some("yes"));
    }

    #[test]
    fn test_bomless_utf16() {
        let bytes: Vec<u8> = "[A]\nk=v\n".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut doc = InfDocument::default();
        InfParser::new().unwrap().parse_bytes(&bytes, &mut doc).unwrap();
        assert_eq!(doc.get("A", "k"), Some("v"));
    }

    #[test]
    fn test_sections_reused_and_keys_overwritten() {
        let mut doc = InfDocument::default();
        let parser = InfParser::new().unwrap();
        parser.parse_str("[A]\nx=1\n[B]\ny=2\n[ A ]\nx=3\n", &mut doc).unwrap();

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("A", "x"), Some("3"));
    }

    #[test]
    fn test_key_outside_section() {
        let mut doc = InfDocument::default();
        InfParser::new().unwrap().parse_str("orphan=1\n[A]\nk=v\n", &mut doc).unwrap();
        assert_eq!(doc.len(), 1);

        let mut doc = InfDocument::default();
        let err = InfParser::new()
            .unwrap()
            .strict(true)
            .parse_str("\norphan=1\n", &mut doc)
            .unwrap_err();
        assert!(matches!(err, PolicyError::InfSyntax { line: 2 }));
    }

    #[test]
    fn test_parse_files_merges_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.inf");
        let second = dir.path().join("b.inf");
        fs::write(&first, utf16_with_bom("[A]\nk=1\n")).unwrap();
        fs::write(&second, utf16_with_bom("[B]\nk=2\n")).unwrap();

        let report = InfParser::new().unwrap().parse_files(&[first, dir.path().join("missing.inf"), second]);
        assert_eq!(report.document.len(), 2);
        assert_eq!(report.failures.len(), 1);
    }
}
