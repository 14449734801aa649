//! Decoded policy records.

use crate::hive::Hive;
use crate::value::ValueData;
use crate::value_type::ValueType;
use std::fmt;

/// One decoded `[key;value;type;size;data]` tuple plus hive and source tags.
///
/// Records are only produced by a completed decode cycle and are not
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RecordEntry {
    /// Hive inferred from the source path.
    #[cfg_attr(feature = "serde", serde(rename = "Hive"))]
    pub hive: Hive,

    /// Registry key path, brackets stripped.
    #[cfg_attr(feature = "serde", serde(rename = "Key"))]
    pub key: String,

    /// Value name, delete markers stripped.
    #[cfg_attr(feature = "serde", serde(rename = "Value"))]
    pub value_name: String,

    /// Value kind from the fixed type table.
    #[cfg_attr(feature = "serde", serde(rename = "Type"))]
    pub value_type: ValueType,

    /// Decoded payload.
    #[cfg_attr(feature = "serde", serde(rename = "Data"))]
    pub data: ValueData,

    /// Label of the file the record came from.
    #[cfg_attr(feature = "serde", serde(rename = "name"))]
    pub source: String,
}

impl RecordEntry {
    /// Returns the payload as rendered text.
    pub fn rendered_data(&self) -> String {
        self.data.to_string()
    }

    /// Returns the `REG_*` type name.
    pub fn type_name(&self) -> &'static str {
        self.value_type.name()
    }
}

impl fmt::Display for RecordEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\\{}\\{} ({}) = {}",
            self.hive, self.key, self.value_name, self.value_type, self.data
        )
    }
}
