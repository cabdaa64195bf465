//! Registry value data types.

use std::fmt;

/// Registry value data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    /// No value type.
    None,

    /// String (null-terminated).
    String,

    /// String with environment variables.
    ExpandString,

    /// Binary data.
    Binary,

    /// 32-bit little-endian integer.
    Dword,

    /// 32-bit big-endian integer.
    DwordBigEndian,

    /// Symbolic link.
    Link,

    /// Multiple strings.
    MultiString,

    /// Resource list.
    ResourceList,

    /// Full resource descriptor.
    FullResourceDescriptor,

    /// Resource requirements list.
    ResourceRequirementsList,

    /// 64-bit little-endian integer.
    Qword,

    /// Unknown or non-standard value type.
    /// Contains the raw type value.
    Unknown(u32),
}

impl ValueType {
    /// Converts a stored type number into a value type.
    ///
    /// Types 0-11 are predefined. Any other number is preserved as
    /// `ValueType::Unknown`.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ValueType::None,
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            5 => ValueType::DwordBigEndian,
            6 => ValueType::Link,
            7 => ValueType::MultiString,
            8 => ValueType::ResourceList,
            9 => ValueType::FullResourceDescriptor,
            10 => ValueType::ResourceRequirementsList,
            11 => ValueType::Qword,
            _ => ValueType::Unknown(value),
        }
    }

    /// Returns the stored type number.
    pub fn as_u32(&self) -> u32 {
        match self {
            ValueType::None => 0,
            ValueType::String => 1,
            ValueType::ExpandString => 2,
            ValueType::Binary => 3,
            ValueType::Dword => 4,
            ValueType::DwordBigEndian => 5,
            ValueType::Link => 6,
            ValueType::MultiString => 7,
            ValueType::ResourceList => 8,
            ValueType::FullResourceDescriptor => 9,
            ValueType::ResourceRequirementsList => 10,
            ValueType::Qword => 11,
            ValueType::Unknown(value) => *value,
        }
    }

    /// Returns the identifier of this value type, such as `REG_SZ`.
    pub fn identifier(&self) -> &'static str {
        match self {
            ValueType::None => "REG_NONE",
            ValueType::String => "REG_SZ",
            ValueType::ExpandString => "REG_EXPAND_SZ",
            ValueType::Binary => "REG_BINARY",
            ValueType::Dword => "REG_DWORD_LITTLE_ENDIAN",
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN",
            ValueType::Link => "REG_LINK",
            ValueType::MultiString => "REG_MULTI_SZ",
            ValueType::ResourceList => "REG_RESOURCE_LIST",
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR",
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST",
            ValueType::Qword => "REG_QWORD_LITTLE_ENDIAN",
            ValueType::Unknown(_) => "_UNKNOWN_",
        }
    }

    /// Returns a human-readable description of this value type.
    pub fn description(&self) -> &'static str {
        match self {
            ValueType::None => "Undefined",
            ValueType::String => "String",
            ValueType::ExpandString => "String with expandable variables",
            ValueType::Binary => "Binary data",
            ValueType::Dword => "Integer 32-bit signed little-endian",
            ValueType::DwordBigEndian => "Integer 32-bit signed big-endian",
            ValueType::Link => "Link",
            ValueType::MultiString => "Array of strings",
            ValueType::ResourceList => "Resource list",
            ValueType::FullResourceDescriptor => "Full resource descriptor",
            ValueType::ResourceRequirementsList => "Resource requirements list",
            ValueType::Qword => "Integer 64-bit signed little-endian",
            ValueType::Unknown(_) => "Unknown",
        }
    }

    /// Returns true for types whose data is a codepage-encoded string.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            ValueType::String | ValueType::ExpandString | ValueType::Link
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Unknown(value) => write!(f, "{} ({:#010x})", self.identifier(), value),
            _ => f.write_str(self.identifier()),
        }
    }
}
