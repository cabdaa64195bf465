//! Key name entry parsing.
//!
//! A key name entry stores a key's name together with its value entries.
//! Entries live inside data blocks and are found by position.

use crate::error::{RegistryError, Result};
use crate::utils::{read_u16_le, read_u32_le};
use crate::value::ValueEntry;

/// Size of a key name entry header in bytes.
pub const KEY_NAME_ENTRY_HEADER_SIZE: usize = 20;

/// Key name entry structure.
#[derive(Debug, Clone)]
pub struct KeyNameEntry {
    /// Absolute file offset of the entry.
    pub offset: u64,

    /// Size of the entry in bytes.
    pub size: u32,

    /// Index of the entry, as recorded by the writer.
    pub index: u16,

    /// Number of bytes in use, including the header.
    pub used_size: u32,

    /// Key name, still encoded in the file's codepage.
    pub name: Vec<u8>,

    /// Value entries in on-disk order.
    pub values: Vec<ValueEntry>,
}

impl KeyNameEntry {
    /// Parses a key name entry and its value entries.
    ///
    /// # Arguments
    ///
    /// * `data` - The entry bytes, as indexed by its data block.
    /// * `offset` - Absolute file offset of the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry size, the used size or the name size is
    /// out of bounds, or if a value entry runs past the used area.
    pub fn parse(data: &[u8], offset: u64) -> Result<Self> {
        if data.len() < KEY_NAME_ENTRY_HEADER_SIZE {
            return Err(RegistryError::truncated(
                offset,
                KEY_NAME_ENTRY_HEADER_SIZE,
                data.len(),
            ));
        }

        let size = read_u32_le(data, 0x00)?;
        if (size as usize) < KEY_NAME_ENTRY_HEADER_SIZE || size as usize > data.len() {
            return Err(RegistryError::format_error(format!(
                "Key name entry at {:#x} has invalid size {}",
                offset, size
            )));
        }

        let index = read_u16_le(data, 0x04)?;
        let used_size = read_u32_le(data, 0x08)?;
        let name_size = read_u16_le(data, 0x0C)? as usize;
        let number_of_values = read_u16_le(data, 0x0E)?;

        if (used_size as usize) < KEY_NAME_ENTRY_HEADER_SIZE || used_size > size {
            return Err(RegistryError::format_error(format!(
                "Key name entry at {:#x} has invalid used size {}",
                offset, used_size
            )));
        }

        let name_end = KEY_NAME_ENTRY_HEADER_SIZE + name_size;
        if name_end > used_size as usize {
            return Err(RegistryError::format_error(format!(
                "Key name entry at {:#x} has name size {} beyond its used size",
                offset, name_size
            )));
        }
        let name = data[KEY_NAME_ENTRY_HEADER_SIZE..name_end].to_vec();

        let values_data = &data[name_end..used_size as usize];
        let mut values = Vec::with_capacity(number_of_values as usize);
        let mut values_offset = 0usize;

        for _ in 0..number_of_values {
            let value = ValueEntry::parse(
                &values_data[values_offset..],
                offset + (name_end + values_offset) as u64,
            )?;
            values_offset += value.size();
            values.push(value);
        }

        Ok(KeyNameEntry {
            offset,
            size,
            index,
            used_size,
            name,
            values,
        })
    }
}
