//! Registry value kinds and the fixed, order-significant type table.

use std::fmt;

/// Registry value data types.
///
/// Discriminants are the on-disk type codes; the order of [`TYPE_TABLE`]
/// mirrors them and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// No value type.
    None = 0,

    /// String (null-terminated).
    String = 1,

    /// String with environment variables.
    ExpandString = 2,

    /// Binary data.
    Binary = 3,

    /// 32-bit little-endian integer.
    Dword = 4,

    /// 32-bit big-endian integer.
    DwordBigEndian = 5,

    /// Symbolic link (Unicode).
    Link = 6,

    /// Multiple strings.
    MultiString = 7,

    /// Resource list.
    ResourceList = 8,

    /// Full resource descriptor.
    FullResourceDescriptor = 9,

    /// Resource requirements list.
    ResourceRequirementsList = 10,

    /// 64-bit little-endian integer.
    Qword = 11,
}

/// Type table indexed by type code.
pub const TYPE_TABLE: [ValueType; 12] = [
    ValueType::None,
    ValueType::String,
    ValueType::ExpandString,
    ValueType::Binary,
    ValueType::Dword,
    ValueType::DwordBigEndian,
    ValueType::Link,
    ValueType::MultiString,
    ValueType::ResourceList,
    ValueType::FullResourceDescriptor,
    ValueType::ResourceRequirementsList,
    ValueType::Qword,
];

impl ValueType {
    /// Looks up a type code in the table.
    ///
    /// Returns `None` for codes past the end of the table.
    pub fn from_code(code: u32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| TYPE_TABLE.get(index))
            .copied()
    }

    /// Returns the on-disk type code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Returns the canonical `REG_*` name of this value type.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::None => "REG_NONE",
            ValueType::String => "REG_SZ",
            ValueType::ExpandString => "REG_EXPAND_SZ",
            ValueType::Binary => "REG_BINARY",
            ValueType::Dword => "REG_DWORD",
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN",
            ValueType::Link => "REG_LINK",
            ValueType::MultiString => "REG_MULTI_SZ",
            ValueType::ResourceList => "REG_RESOURCE_LIST",
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR",
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST",
            ValueType::Qword => "REG_QWORD",
        }
    }

    /// Returns true for the kinds decoded as UTF-16 text.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ValueType::String | ValueType::ExpandString | ValueType::MultiString
        )
    }

    /// Returns true for the kinds that never survive normalization.
    pub fn is_excluded(self) -> bool {
        matches!(self, ValueType::None | ValueType::Binary)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ValueType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_codes() {
        for (index, value_type) in TYPE_TABLE.iter().enumerate() {
            assert_eq!(value_type.code() as usize, index);
        }
    }

    #[test]
    fn test_from_code() {
        assert_eq!(ValueType::from_code(1), Some(ValueType::String));
        assert_eq!(ValueType::from_code(4), Some(ValueType::Dword));
        assert_eq!(ValueType::from_code(11), Some(ValueType::Qword));
        assert_eq!(ValueType::from_code(12), None);
        assert_eq!(ValueType::from_code(u32::MAX), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(ValueType::String.name(), "REG_SZ");
        assert_eq!(ValueType::Dword.to_string(), "REG_DWORD");
    }

    #[test]
    fn test_classification() {
        assert!(ValueType::MultiString.is_text());
        assert!(!ValueType::Dword.is_text());
        assert!(ValueType::Binary.is_excluded());
        assert!(!ValueType::Qword.is_excluded());
    }
}
