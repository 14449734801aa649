//! Case-insensitive search over parsed results.

use crate::error::Result;
use crate::inf::InfDocument;
use crate::normalize::NormalizedResultSet;
use crate::record::RecordEntry;
use crate::xml::{XmlReport, XmlValue};
use regex::{Regex, RegexBuilder};
use std::path::Path;

/// A compiled, case-insensitive search term.
///
/// The term is a regular expression; a plain word matches anywhere in a
/// field.
///
/// ```
/// use regpol_parser::SearchPattern;
///
/// let pattern = SearchPattern::new("windowsupdate").unwrap();
/// assert!(pattern.is_match(r"Software\Policies\Microsoft\Windows\WindowsUpdate"));
/// ```
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
}

/// An INF line that matched a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfMatch<'a> {
    /// Section name.
    pub section: &'a str,
    /// Key.
    pub key: &'a str,
    /// Value.
    pub value: &'a str,
}

/// A map or list holding at least one matching text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlMatch<'a> {
    /// Dotted path of the container, usable with [`XmlValue::get_path`].
    /// Empty for the root.
    pub path: String,
    /// The container itself.
    pub container: &'a XmlValue,
}

impl SearchPattern {
    /// Compiles a search term.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if the term is not a valid regular expression.
    pub fn new(term: &str) -> Result<Self> {
        let regex = RegexBuilder::new(term).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// Returns the term as given.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Tests a single string.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Tests every text field of a record.
    pub fn matches_record(&self, entry: &RecordEntry) -> bool {
        [
            entry.hive.as_str(),
            entry.key.as_str(),
            entry.value_name.as_str(),
            entry.type_name(),
            entry.source.as_str(),
        ]
        .iter()
        .any(|field| self.is_match(field))
            || self.is_match(&entry.rendered_data())
    }

    /// Returns the records with at least one matching field.
    pub fn find_records<'a>(&self, results: &'a NormalizedResultSet) -> Vec<&'a RecordEntry> {
        results.iter().filter(|entry| self.matches_record(entry)).collect()
    }

    /// Returns the INF lines whose key or value matches.
    pub fn find_inf<'a>(&self, document: &'a InfDocument) -> Vec<InfMatch<'a>> {
        document
            .sections()
            .flat_map(|(section, pairs)| {
                pairs.iter().map(move |(key, value)| InfMatch {
                    section,
                    key: key.as_str(),
                    value: value.as_str(),
                })
            })
            .filter(|m| self.is_match(m.key) || self.is_match(m.value))
            .collect()
    }

    /// Returns every map or list with a matching text value, once each.
    ///
    /// Only values are tested, not keys. A container appears at the point
    /// its first matching value is reached, after any matching descendants
    /// visited before it.
    pub fn find_xml<'a>(&self, root: &'a XmlValue) -> Vec<XmlMatch<'a>> {
        let mut found = Vec::new();
        self.walk(root, &mut Vec::new(), &mut found);
        found
    }

    /// Searches the extracted entries of a preference report.
    ///
    /// Paths are relative to the file's entry list, so they start with the
    /// entry index.
    pub fn find_artifacts<'a>(&self, report: &'a XmlReport) -> Vec<(&'a Path, XmlMatch<'a>)> {
        let mut found = Vec::new();
        for file in &report.files {
            let mut hits = Vec::new();
            for (index, entry) in file.entries.iter().enumerate() {
                match entry {
                    XmlValue::Text(text) if self.is_match(text) => hits.push(XmlMatch {
                        path: index.to_string(),
                        container: entry,
                    }),
                    _ => self.walk(entry, &mut vec![index.to_string()], &mut hits),
                }
            }
            found.extend(hits.into_iter().map(|hit| (file.path.as_path(), hit)));
        }
        found
    }

    fn walk<'a>(&self, node: &'a XmlValue, path: &mut Vec<String>, found: &mut Vec<XmlMatch<'a>>) {
        let mut recorded = false;
        match node {
            XmlValue::Map(map) => {
                for (key, child) in map.iter() {
                    self.visit(node, key.to_string(), child, path, found, &mut recorded);
                }
            }
            XmlValue::List(items) => {
                for (index, child) in items.iter().enumerate() {
                    self.visit(node, index.to_string(), child, path, found, &mut recorded);
                }
            }
            XmlValue::Null | XmlValue::Text(_) => {}
        }
    }

    fn visit<'a>(
        &self,
        container: &'a XmlValue,
        segment: String,
        child: &'a XmlValue,
        path: &mut Vec<String>,
        found: &mut Vec<XmlMatch<'a>>,
        recorded: &mut bool,
    ) {
        match child {
            XmlValue::Text(text) => {
                if !*recorded && self.is_match(text) {
                    *recorded = true;
                    found.push(XmlMatch {
                        path: path.join("."),
                        container,
                    });
                }
            }
            XmlValue::Map(_) | XmlValue::List(_) => {
                path.push(segment);
                self.walk(child, path, found);
                path.pop();
            }
            XmlValue::Null => {}
        }
    }
}
