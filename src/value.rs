//! Value entry parsing and data extraction.

use crate::codepage::Codepage;
use crate::error::{RegistryError, Result};
use crate::utils::{read_u16_le, read_u32_le};
use crate::value_type::ValueType;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Size of a value entry header in bytes.
pub const VALUE_ENTRY_HEADER_SIZE: usize = 12;

/// Value entry structure.
///
/// Represents a registry value with its raw name, type, and data.
#[derive(Debug, Clone)]
pub struct ValueEntry {
    /// Absolute file offset of the entry.
    pub offset: u64,

    /// Value data type.
    pub data_type: ValueType,

    /// Value name, still encoded in the file's codepage.
    pub name: Vec<u8>,

    /// Raw value data.
    pub data: Vec<u8>,
}

impl ValueEntry {
    /// Parses a value entry from raw bytes.
    ///
    /// # Arguments
    ///
    /// * `data` - Bytes starting at the value entry header, up to the end of
    ///   the enclosing key name entry's used area.
    /// * `offset` - Absolute file offset of the entry for error reporting.
    ///
    /// # Errors
    ///
    /// Returns an error if the header, the name or the data extends past the
    /// end of `data`.
    pub fn parse(data: &[u8], offset: u64) -> Result<Self> {
        if data.len() < VALUE_ENTRY_HEADER_SIZE {
            return Err(RegistryError::truncated(
                offset,
                VALUE_ENTRY_HEADER_SIZE,
                data.len(),
            ));
        }

        let data_type = ValueType::from_u32(read_u32_le(data, 0x00)?);
        let name_size = read_u16_le(data, 0x08)? as usize;
        let data_size = read_u16_le(data, 0x0A)? as usize;

        let entry_size = VALUE_ENTRY_HEADER_SIZE + name_size + data_size;
        if entry_size > data.len() {
            return Err(RegistryError::truncated(offset, entry_size, data.len()));
        }

        let name_end = VALUE_ENTRY_HEADER_SIZE + name_size;

        Ok(ValueEntry {
            offset,
            data_type,
            name: data[VALUE_ENTRY_HEADER_SIZE..name_end].to_vec(),
            data: data[name_end..entry_size].to_vec(),
        })
    }

    /// Returns the number of bytes this entry occupies.
    pub fn size(&self) -> usize {
        VALUE_ENTRY_HEADER_SIZE + self.name.len() + self.data.len()
    }
}

/// Parsed registry value data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueData {
    /// No data.
    None,

    /// String value.
    String(String),

    /// Expandable string value.
    ExpandString(String),

    /// Symbolic link.
    Link(String),

    /// Binary data.
    Binary(Vec<u8>),

    /// 32-bit integer.
    Dword(u32),

    /// 32-bit big-endian integer.
    DwordBigEndian(u32),

    /// Multiple strings.
    MultiString(Vec<String>),

    /// 64-bit integer.
    Qword(u64),

    /// Resource descriptors and unknown types, kept raw.
    Unknown(Vec<u8>),
}

impl ValueData {
    /// Parses value data based on the value type.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw value data bytes.
    /// * `value_type` - Type of the value.
    /// * `codepage` - Codepage used to decode string data.
    /// * `offset` - Offset for error reporting.
    pub fn parse(
        data: &[u8],
        value_type: ValueType,
        codepage: Codepage,
        offset: u64,
    ) -> Result<Self> {
        if data.is_empty() {
            return Ok(ValueData::None);
        }

        match value_type {
            ValueType::None => Ok(ValueData::None),
            ValueType::String => Ok(ValueData::String(codepage.decode(data))),
            ValueType::ExpandString => Ok(ValueData::ExpandString(codepage.decode(data))),
            ValueType::Link => Ok(ValueData::Link(codepage.decode(data))),
            ValueType::Binary => Ok(ValueData::Binary(data.to_vec())),
            ValueType::Dword => Ok(ValueData::Dword(read_dword(data, false, offset)?)),
            ValueType::DwordBigEndian => {
                Ok(ValueData::DwordBigEndian(read_dword(data, true, offset)?))
            }
            ValueType::Qword => Ok(ValueData::Qword(read_qword(data, offset)?)),
            ValueType::MultiString => {
                let strings = data
                    .split(|&b| b == 0)
                    .filter(|s| !s.is_empty())
                    .map(|s| codepage.decode(s))
                    .collect();
                Ok(ValueData::MultiString(strings))
            }
            _ => Ok(ValueData::Unknown(data.to_vec())),
        }
    }

    /// Converts the value data to a string representation.
    pub fn to_string(&self) -> String {
        match self {
            ValueData::None => String::from("(none)"),
            ValueData::String(s) | ValueData::ExpandString(s) | ValueData::Link(s) => s.clone(),
            ValueData::Binary(b) => hex::encode(b),
            ValueData::Dword(d) => format!("{} (0x{:08X})", d, d),
            ValueData::DwordBigEndian(d) => format!("{} (0x{:08X})", d, d),
            ValueData::Qword(q) => format!("{} (0x{:016X})", q, q),
            ValueData::MultiString(strings) => strings.join(", "),
            ValueData::Unknown(b) => hex::encode(b),
        }
    }
}

/// Reads a 32-bit integer from value data.
///
/// The data must be exactly 4 bytes.
pub(crate) fn read_dword(data: &[u8], big_endian: bool, offset: u64) -> Result<u32> {
    if data.len() < 4 {
        return Err(RegistryError::truncated(offset, 4, data.len()));
    }
    if data.len() > 4 {
        return Err(RegistryError::format_error(format!(
            "32-bit value data at {:#x} has {} bytes",
            offset,
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    let value = if big_endian {
        cursor.read_u32::<BigEndian>()?
    } else {
        cursor.read_u32::<LittleEndian>()?
    };
    Ok(value)
}

/// Reads a 64-bit little-endian integer from value data.
pub(crate) fn read_qword(data: &[u8], offset: u64) -> Result<u64> {
    if data.len() < 8 {
        return Err(RegistryError::truncated(offset, 8, data.len()));
    }
    if data.len() > 8 {
        return Err(RegistryError::format_error(format!(
            "64-bit value data at {:#x} has {} bytes",
            offset,
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    Ok(cursor.read_u64::<LittleEndian>()?)
}
