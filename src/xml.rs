//! Group Policy Preferences XML artifacts.
//!
//! Preference files (`Groups.xml`, `ScheduledTasks.xml`, `Drives.xml`, ...)
//! are converted into a generic tree and then reduced to a handful of
//! interesting fields per item:
//!
//! ```text
//! <Groups clsid="...">                      { "clsid": "...",
//!   <User name="svc" changed="...">    =>     "User": { "name": "svc",
//!     <Properties cpassword="..."/>                     "changed": "...",
//!   </User>                                             "Properties": { "cpassword": "..." } } }
//! </Groups>
//! ```
//!
//! An element becomes a map of its attributes. Child elements are added
//! under their tag name, and a tag seen more than once becomes a list. A
//! leaf element keeps its trimmed text under `_text`.

use crate::batch::FileFailure;
use crate::error::{PolicyError, Result};
use encoding_rs::{Encoding, UTF_16LE, UTF_8};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Key under which a leaf element's text is stored.
pub const TEXT_KEY: &str = "_text";

/// Root attribute left out of extracted entries.
const CLASS_ID_KEY: &str = "clsid";

/// Output field name and dotted path into an item.
pub type ValuePaths = &'static [(&'static str, &'static str)];

/// A node of a converted XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// A path that did not resolve during extraction.
    Null,
    /// Attribute value or element text.
    Text(String),
    /// Attributes and child elements in document order.
    Map(XmlMap),
    /// Repeated child elements.
    List(Vec<XmlValue>),
}

/// Insertion-ordered string map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlMap {
    entries: Vec<(String, XmlValue)>,
}

impl XmlMap {
    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut XmlValue> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts a value. An existing key keeps its position and takes the new
    /// value.
    pub fn insert(&mut self, key: impl Into<String>, value: XmlValue) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &XmlValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl XmlValue {
    /// Returns the text of a `Text` node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the map of a `Map` node.
    pub fn as_map(&self) -> Option<&XmlMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the items of a `List` node.
    pub fn as_list(&self) -> Option<&[XmlValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// False for `Null` and for empty text, maps and lists.
    pub fn has_content(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Text(text) => !text.is_empty(),
            Self::Map(map) => !map.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Follows a dotted path such as `Properties.Members.Member.0.name`.
    ///
    /// Segments index into lists when the current node is a list; negative
    /// indices count from the end. Returns `None` as soon as a segment does
    /// not resolve.
    ///
    /// ```
    /// use regpol_parser::XmlParser;
    ///
    /// let tree = XmlParser::new()
    ///     .parse_str(r#"<Task><Properties runAs="SYSTEM"/></Task>"#)
    ///     .unwrap();
    /// let run_as = tree.get_path("Properties.runAs").and_then(|v| v.as_text());
    /// assert_eq!(run_as, Some("SYSTEM"));
    /// ```
    pub fn get_path(&self, path: &str) -> Option<&XmlValue> {
        path.split('.').try_fold(self, |node, segment| match node {
            Self::Map(map) => map.get(segment),
            Self::List(items) => {
                let index: isize = segment.parse().ok()?;
                let index = if index < 0 {
                    items.len().checked_sub(index.unsigned_abs())?
                } else {
                    index.unsigned_abs()
                };
                items.get(index)
            }
            Self::Null | Self::Text(_) => None,
        })
    }

    /// Serializes the tree as JSON.
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

#[cfg(feature = "serde")]
impl serde::Serialize for XmlValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Map(map) => serializer.collect_map(map.iter()),
            Self::List(items) => serializer.collect_seq(items),
        }
    }
}

/// Preference artifact types and the fields kept for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Shortcuts.xml
    Shortcuts,
    /// ScheduledTasks.xml
    ScheduledTasks,
    /// Drives.xml
    Drives,
    /// Groups.xml (local users and groups)
    Groups,
    /// Printers.xml
    Printers,
    /// Registry.xml
    RegistryXml,
    /// EnvironmentVariables.xml
    EnvironmentVariables,
    /// Files.xml
    Files,
    /// Services.xml
    Services,
    /// Folders.xml
    Folders,
    /// InternetSettings.xml
    InternetSettings,
}

impl ArtifactKind {
    /// Every XML artifact type.
    pub const ALL: [ArtifactKind; 11] = [
        Self::Shortcuts,
        Self::ScheduledTasks,
        Self::Drives,
        Self::Groups,
        Self::Printers,
        Self::RegistryXml,
        Self::EnvironmentVariables,
        Self::Files,
        Self::Services,
        Self::Folders,
        Self::InternetSettings,
    ];

    /// Short name used as a result key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Shortcuts => "shortcuts",
            Self::ScheduledTasks => "scheduledtasks",
            Self::Drives => "drives",
            Self::Groups => "groups",
            Self::Printers => "printers",
            Self::RegistryXml => "registryxml",
            Self::EnvironmentVariables => "envvars",
            Self::Files => "files",
            Self::Services => "services",
            Self::Folders => "folders",
            Self::InternetSettings => "internetsettings",
        }
    }

    /// File name, compared case-insensitively.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Shortcuts => "shortcuts.xml",
            Self::ScheduledTasks => "scheduledtasks.xml",
            Self::Drives => "drives.xml",
            Self::Groups => "groups.xml",
            Self::Printers => "printers.xml",
            Self::RegistryXml => "registry.xml",
            Self::EnvironmentVariables => "environmentvariables.xml",
            Self::Files => "files.xml",
            Self::Services => "services.xml",
            Self::Folders => "folders.xml",
            Self::InternetSettings => "internetsettings.xml",
        }
    }

    /// Looks up a kind by its short name.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Infers the kind from the last component of a path.
    pub fn from_file_name(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|kind| kind.file_name().eq_ignore_ascii_case(name))
    }

    /// Fields extracted from each item.
    pub fn value_paths(&self) -> ValuePaths {
        match self {
            Self::Shortcuts => &[
                ("name", "name"),
                ("status", "status"),
                ("changed", "changed"),
                ("targetPath", "Properties.targetPath"),
            ],
            Self::ScheduledTasks => &[
                ("name", "name"),
                ("changed", "changed"),
                ("disabled", "disabled"),
                ("action", "Properties.action"),
                ("runAs", "Properties.runAs"),
                ("logonType", "Properties.logonType"),
                ("command", "Properties.Task.Actions.Exec.Command._text"),
                ("arguments", "Properties.Task.Actions.Exec.Arguments._text"),
            ],
            Self::Drives => &[
                ("name", "name"),
                ("status", "status"),
                ("changed", "changed"),
                ("action", "Properties.action"),
                ("userName", "Properties.userName"),
                ("path", "Properties.path"),
                ("FilterUser", "Filters.FilterUser"),
            ],
            Self::Groups => &[
                ("name", "name"),
                ("changed", "changed"),
                ("FilterComputer", "Filters.FilterComputer"),
                ("member", "Properties.Members.Member"),
                ("newName", "Properties.newName"),
                ("fullName", "Properties.fullName"),
                ("description", "Properties.description"),
                ("cpassword", "Properties.cpassword"),
                ("neverExpires", "Properties.neverExpires"),
                ("acctDisabled", "Properties.acctDisabled"),
                ("userName", "Properties.userName"),
            ],
            Self::Printers => &[
                ("changed", "changed"),
                ("disabled", "disabled"),
                ("status", "status"),
                ("snmpCommunity", "Properties.snmpCommunity"),
                ("snmpEnabled", "Properties.snmpEnabled"),
                ("portNumber", "Properties.portNumber"),
                ("ipAddress", "Properties.ipAddress"),
                ("localName", "Properties.localName"),
                ("comment", "Properties.comment"),
                ("path", "Properties.path"),
                ("FilterGroup", "Filters.FilterGroup"),
            ],
            Self::RegistryXml => &[
                ("name", "Properties.name"),
                ("status", "status"),
                ("changed", "changed"),
                ("action", "Properties.action"),
                ("default", "Properties.default"),
                ("hive", "Properties.hive"),
                ("key", "Properties.key"),
                ("type", "Properties.type"),
                ("value", "Properties.value"),
            ],
            Self::EnvironmentVariables => &[
                ("name", "Properties.name"),
                ("status", "status"),
                ("changed", "changed"),
                ("userContext", "userContext"),
                ("action", "Properties.action"),
                ("value", "Properties.value"),
                ("user", "Properties.user"),
                ("partial", "Properties.partial"),
            ],
            Self::Files => &[
                ("name", "name"),
                ("status", "status"),
                ("changed", "changed"),
                ("action", "Properties.action"),
                ("fromPath", "Properties.fromPath"),
                ("targetPath", "Properties.targetPath"),
                ("readOnly", "Properties.readOnly"),
                ("archive", "Properties.archive"),
                ("hidden", "Properties.hidden"),
            ],
            Self::Services => &[
                ("name", "name"),
                ("changed", "changed"),
                ("userContext", "userContext"),
                ("startupType", "Properties.startupType"),
                ("serviceName", "Properties.serviceName"),
                ("serviceAction", "Properties.serviceAction"),
            ],
            Self::Folders => &[
                ("name", "name"),
                ("status", "status"),
                ("changed", "changed"),
                ("action", "Properties.action"),
                ("path", "Properties.path"),
                ("readOnly", "Properties.readOnly"),
                ("archive", "Properties.archive"),
                ("hidden", "Properties.hidden"),
            ],
            Self::InternetSettings => &[
                ("name", "Collection.Registry.Properties.name"),
                ("status", "status"),
                ("changed", "changed"),
                ("type", "Collection.Registry.Properties.type"),
                ("disabled", "Collection.disabled"),
                ("action", "Collection.Registry.Properties.action"),
                ("default", "Collection.Registry.Properties.default"),
                ("hive", "Collection.Registry.Properties.hive"),
                ("key", "Collection.Registry.Properties.key"),
                ("value", "Collection.Registry.Properties.value"),
                ("Reg", "Properties.Reg"),
            ],
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reduces the top level of a converted document to the configured fields.
///
/// For each child of the root:
/// - a list yields one map per item holding every field, `Null` where the
///   path does not resolve
/// - a map yields one map holding only the fields with content
/// - text is copied when non-empty
pub fn extract(root: &XmlValue, paths: ValuePaths) -> XmlMap {
    let mut extracted = XmlMap::default();
    let Some(map) = root.as_map() else {
        return extracted;
    };

    for (key, value) in map.iter() {
        match value {
            XmlValue::List(items) => {
                let items = items.iter().map(|item| extract_all(item, paths)).collect();
                extracted.insert(key, XmlValue::List(items));
            }
            XmlValue::Map(_) => extracted.insert(key, extract_present(value, paths)),
            other if other.has_content() => extracted.insert(key, other.clone()),
            _ => {}
        }
    }
    extracted
}

fn extract_all(item: &XmlValue, paths: ValuePaths) -> XmlValue {
    let mut fields = XmlMap::default();
    for (name, path) in paths {
        let value = item.get_path(path).cloned().unwrap_or(XmlValue::Null);
        fields.insert(*name, value);
    }
    XmlValue::Map(fields)
}

fn extract_present(item: &XmlValue, paths: ValuePaths) -> XmlValue {
    let mut fields = XmlMap::default();
    for (name, path) in paths {
        if let Some(value) = item.get_path(path).filter(|v| v.has_content()) {
            fields.insert(*name, value.clone());
        }
    }
    XmlValue::Map(fields)
}

/// Extracted entries of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// File the entries came from.
    pub path: PathBuf,
    /// Extracted top-level entries, without the root class ID.
    pub entries: Vec<XmlValue>,
}

/// Outcome of parsing several files of one artifact type.
#[derive(Debug)]
pub struct XmlReport {
    /// Artifact type the files were reduced with.
    pub kind: ArtifactKind,
    /// Files with at least one extracted entry, in input order.
    pub files: Vec<ArtifactFile>,
    /// Files that could not be read or parsed.
    pub failures: Vec<FileFailure>,
}

impl XmlReport {
    /// Total number of extracted entries.
    pub fn entry_count(&self) -> usize {
        self.files.iter().map(|file| file.entries.len()).sum()
    }

    /// Serializes the entries as an object keyed by file path.
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

#[cfg(feature = "serde")]
impl serde::Serialize for XmlReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.files
                .iter()
                .map(|file| (file.path.display().to_string(), &file.entries)),
        )
    }
}

/// Converts preference XML into [`XmlValue`] trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser;

impl XmlParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parses XML text. The result is always a `Map`.
    ///
    /// # Errors
    ///
    /// Returns `Xml` if the text is not well-formed.
    pub fn parse_str(&self, text: &str) -> Result<XmlValue> {
        let document = roxmltree::Document::parse(text)?;
        Ok(convert(document.root_element()))
    }

    /// Decodes bytes and parses them.
    ///
    /// A BOM selects the encoding; without one the bytes are UTF-8 unless
    /// the second byte is zero.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<XmlValue> {
        let encoding = match Encoding::for_bom(bytes) {
            Some((encoding, _)) => encoding,
            None if bytes.len() >= 2 && bytes[1] == 0 => UTF_16LE,
            None => UTF_8,
        };
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            debug!(encoding = encoding.name(), "Replaced malformed sequences in XML text");
        }
        self.parse_str(&text)
    }

    /// Parses one file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<XmlValue> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| PolicyError::file_access(path, e))?;
        self.parse_bytes(&bytes)
    }

    /// Parses files of one artifact type and extracts their fields.
    ///
    /// A file that cannot be read or parsed is recorded and skipped. A file
    /// that yields no entries is left out of the report.
    pub fn parse_files<P: AsRef<Path>>(&self, kind: ArtifactKind, paths: &[P]) -> XmlReport {
        let mut report = XmlReport {
            kind,
            files: Vec::new(),
            failures: Vec::new(),
        };

        for path in paths {
            let path: &Path = path.as_ref();
            let tree = match self.parse_file(path) {
                Ok(tree) => tree,
                Err(error) => {
                    warn!(path = %path.display(), %error, %kind, "Skipping preference file");
                    report.failures.push(FileFailure {
                        path: path.to_path_buf(),
                        error,
                    });
                    continue;
                }
            };

            let entries: Vec<XmlValue> = extract(&tree, kind.value_paths())
                .iter()
                .filter(|(key, _)| *key != CLASS_ID_KEY)
                .map(|(_, value)| value.clone())
                .collect();
            if entries.is_empty() {
                debug!(path = %path.display(), %kind, "No entries extracted");
                continue;
            }
            report.files.push(ArtifactFile {
                path: path.to_path_buf(),
                entries,
            });
        }

        info!(
            %kind,
            files = paths.len(),
            failed = report.failures.len(),
            entries = report.entry_count(),
            "Parsed preference files"
        );
        report
    }
}

fn convert(element: roxmltree::Node<'_, '_>) -> XmlValue {
    let mut node = XmlMap::default();
    for attribute in element.attributes() {
        node.insert(attribute.name(), XmlValue::Text(attribute.value().to_string()));
    }

    let mut children = XmlMap::default();
    for child in element.children().filter(|n| n.is_element()) {
        let tag = child.tag_name().name();
        let value = convert(child);
        match children.get_mut(tag) {
            Some(XmlValue::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, XmlValue::Null);
                *existing = XmlValue::List(vec![first, value]);
            }
            None => children.insert(tag, value),
        }
    }

    if children.is_empty() {
        if let Some(text) = element.text().map(str::trim).filter(|t| !t.is_empty()) {
            node.insert(TEXT_KEY, XmlValue::Text(text.to_string()));
        }
    } else {
        for (tag, value) in children.entries {
            node.insert(tag, value);
        }
    }
    XmlValue::Map(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Groups clsid="{3125E937-EB16-4b4c-9934-544FC6D24D26}">
  <User clsid="{DF5F1855-51E5-4d24-8B1A-D9BDE98BA1D1}" name="LocalAdmin" image="2" changed="2023-01-01 10:00:00" uid="{A}">
    <Properties action="U" newName="" fullName="" description="" cpassword="j1Uyj3Vx8TY9LtLZil2uAuZkFQA" neverExpires="1" acctDisabled="0" userName="LocalAdmin"/>
  </User>
  <Group clsid="{6D4A79E4-529C-4481-ABD0-F5BD7EA93BA7}" name="Administrators (built-in)" image="2" changed="2023-01-02 11:00:00" uid="{B}">
    <Properties action="U" newName="" description="" groupSid="S-1-5-32-544" groupName="Administrators (built-in)">
      <Members>
        <Member name="CORP\Domain Admins" action="ADD" sid="S-1-5-21-1-512"/>
        <Member name="CORP\Helpdesk" action="ADD" sid="S-1-5-21-1-1105"/>
      </Members>
    </Properties>
  </Group>
</Groups>
"#;

    const DRIVES: &str = r#"<Drives clsid="{8FDDCC1A-0C3C-43cd-A6B4-71A6DF20DA8C}">
  <Drive name="S:" status="S:" changed="2023-02-01 09:00:00">
    <Properties action="U" userName="" path="\\fs01\share" letter="S"/>
  </Drive>
  <Drive name="T:" status="T:" changed="2023-02-02 09:00:00">
    <Properties action="C" path="\\fs01\team" letter="T"/>
    <Filters><FilterUser not="0" name="CORP\alice"/></Filters>
  </Drive>
</Drives>"#;

    fn text(value: Option<&XmlValue>) -> Option<&str> {
        value.and_then(XmlValue::as_text)
    }

    fn keys(value: &XmlValue) -> Vec<&str> {
        value.as_map().unwrap().iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_attributes_then_children() {
        let tree = XmlParser::new().parse_str(GROUPS).unwrap();
        assert_eq!(keys(&tree), vec!["clsid", "User", "Group"]);

        let user = tree.get_path("User").unwrap();
        assert_eq!(keys(user), vec!["clsid", "name", "image", "changed", "uid", "Properties"]);
        assert_eq!(text(user.get_path("Properties.userName")), Some("LocalAdmin"));
    }

    #[test]
    fn test_repeated_tag_becomes_list() {
        let tree = XmlParser::new().parse_str(GROUPS).unwrap();
        let members = tree.get_path("Group.Properties.Members.Member").unwrap();
        assert_eq!(members.as_list().map(<[XmlValue]>::len), Some(2));

        let triple = XmlParser::new().parse_str("<a><b/><b/><b/><c/></a>").unwrap();
        assert_eq!(triple.get_path("b").and_then(XmlValue::as_list).map(<[XmlValue]>::len), Some(3));
        assert_eq!(triple.get_path("c"), Some(&XmlValue::Map(XmlMap::default())));
    }

    #[test]
    fn test_leaf_text() {
        let tree = XmlParser::new()
            .parse_str("<Exec><Command>  cmd.exe  </Command><Arguments>\n  \n</Arguments></Exec>")
            .unwrap();
        assert_eq!(text(tree.get_path("Command._text")), Some("cmd.exe"));
        assert_eq!(tree.get_path("Arguments"), Some(&XmlValue::Map(XmlMap::default())));

        // Text next to child elements is dropped
        let mixed = XmlParser::new().parse_str("<a>text<b>inner</b></a>").unwrap();
        assert_eq!(keys(&mixed), vec!["b"]);
    }

    #[test]
    fn test_child_replaces_attribute_in_place() {
        let tree = XmlParser::new()
            .parse_str(r#"<a name="attr" other="x"><name>child</name></a>"#)
            .unwrap();
        assert_eq!(keys(&tree), vec!["name", "other"]);
        assert_eq!(text(tree.get_path("name._text")), Some("child"));
    }

    #[test]
    fn test_get_path() {
        let tree = XmlParser::new().parse_str(GROUPS).unwrap();
        let base = "Group.Properties.Members.Member";
        assert_eq!(text(tree.get_path(&format!("{base}.1.name"))), Some(r"CORP\Helpdesk"));
        assert_eq!(text(tree.get_path(&format!("{base}.-2.name"))), Some(r"CORP\Domain Admins"));
        assert_eq!(tree.get_path(&format!("{base}.2.name")), None);
        assert_eq!(tree.get_path(&format!("{base}.-3")), None);
        assert_eq!(tree.get_path(&format!("{base}.name")), None);
        assert_eq!(tree.get_path("User.name.deeper"), None);
        assert_eq!(tree.get_path("Missing"), None);
    }

    #[test]
    fn test_extract_single_items_keep_present_fields() {
        let tree = XmlParser::new().parse_str(GROUPS).unwrap();
        let extracted = extract(&tree, ArtifactKind::Groups.value_paths());

        let names: Vec<&str> = extracted.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["clsid", "User", "Group"]);

        let user = extracted.get("User").unwrap();
        assert_eq!(
            keys(user),
            vec!["name", "changed", "cpassword", "neverExpires", "acctDisabled", "userName"]
        );
        // "0" is content, only empty strings are dropped
        assert_eq!(text(user.get_path("acctDisabled")), Some("0"));

        let group = extracted.get("Group").unwrap();
        assert_eq!(keys(group), vec!["name", "changed", "member"]);
        assert_eq!(group.get_path("member").and_then(XmlValue::as_list).map(<[XmlValue]>::len), Some(2));
    }

    #[test]
    fn test_extract_list_items_keep_every_field() {
        let tree = XmlParser::new().parse_str(DRIVES).unwrap();
        let extracted = extract(&tree, ArtifactKind::Drives.value_paths());
        let drives = extracted.get("Drive").and_then(XmlValue::as_list).unwrap();
        assert_eq!(drives.len(), 2);

        let first = &drives[0];
        assert_eq!(
            keys(first),
            vec!["name", "status", "changed", "action", "userName", "path", "FilterUser"]
        );
        assert_eq!(text(first.get_path("userName")), Some(""));
        assert_eq!(first.get_path("FilterUser"), Some(&XmlValue::Null));

        let second = &drives[1];
        assert_eq!(second.get_path("userName"), Some(&XmlValue::Null));
        assert_eq!(text(second.get_path("FilterUser.name")), Some(r"CORP\alice"));
        assert_eq!(text(second.get_path("path")), Some(r"\\fs01\team"));
    }

    #[test]
    fn test_extract_skips_empty_scalars() {
        let tree = XmlParser::new().parse_str(r#"<Root a="" b="1"/>"#).unwrap();
        let extracted = extract(&tree, ArtifactKind::Files.value_paths());
        assert_eq!(extracted.len(), 1);
        assert_eq!(text(extracted.get("b")), Some("1"));
    }

    #[test]
    fn test_parse_bytes_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend("<a k=\"v\"/>".encode_utf16().flat_map(u16::to_le_bytes));
        let tree = XmlParser::new().parse_bytes(&bytes).unwrap();
        assert_eq!(text(tree.get_path("k")), Some("v"));

        let mut utf8 = vec![0xEF, 0xBB, 0xBF];
        utf8.extend_from_slice(b"<a k=\"w\"/>");
        assert_eq!(text(XmlParser::new().parse_bytes(&utf8).unwrap().get_path("k")), Some("w"));
    }

    #[test]
    fn test_malformed_xml() {
        let err = XmlParser::new().parse_str("<Groups><User></Groups>").unwrap_err();
        assert!(matches!(err, PolicyError::Xml(_)));
    }

    #[test]
    fn test_artifact_kind_lookup() {
        assert_eq!(
            ArtifactKind::from_file_name("Preferences/Groups/Groups.xml"),
            Some(ArtifactKind::Groups)
        );
        assert_eq!(
            ArtifactKind::from_file_name("EnvironmentVariables.XML"),
            Some(ArtifactKind::EnvironmentVariables)
        );
        assert_eq!(ArtifactKind::from_file_name("Registry.pol"), None);
        assert_eq!(ArtifactKind::from_key("envvars"), Some(ArtifactKind::EnvironmentVariables));
        for kind in ArtifactKind::ALL {
            assert_eq!(ArtifactKind::from_key(kind.key()), Some(kind));
            assert!(!kind.value_paths().is_empty());
        }
    }

    #[test]
    fn test_parse_files_drops_class_id_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Groups.xml");
        let empty = dir.path().join("empty/Groups.xml");
        let broken = dir.path().join("broken/Groups.xml");
        fs::write(&good, GROUPS).unwrap();
        fs::create_dir_all(empty.parent().unwrap()).unwrap();
        fs::write(&empty, r#"<Groups clsid="{X}"/>"#).unwrap();
        fs::create_dir_all(broken.parent().unwrap()).unwrap();
        fs::write(&broken, "<Groups>").unwrap();

        let report = XmlParser::new().parse_files(ArtifactKind::Groups, &[good.clone(), empty, broken]);
        assert_eq!(report.kind, ArtifactKind::Groups);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].path, good);
        assert_eq!(report.entry_count(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, PolicyError::Xml(_)));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_tree_json() {
        let tree = XmlParser::new().parse_str(DRIVES).unwrap();
        let extracted = XmlValue::Map(extract(&tree, ArtifactKind::Drives.value_paths()));
        let parsed: serde_json::Value = serde_json::from_str(&extracted.to_json(false).unwrap()).unwrap();
        assert_eq!(parsed["Drive"][0]["name"], "S:");
        assert!(parsed["Drive"][0]["FilterUser"].is_null());
    }
}
