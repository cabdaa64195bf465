//! Key navigation block (RGKN) parsing.
//!
//! The key navigation block directly follows the file header and holds the
//! key hierarchy: a flat array of fixed-size entries linked by offsets into
//! a tree. All offsets inside the block are relative to its start.

use crate::error::{RegistryError, Result};
use crate::header::FILE_HEADER_SIZE;
use crate::utils::{check_signature, read_u32_le};

/// Expected signature for the key navigation block ("RGKN").
pub const RGKN_SIGNATURE: &[u8; 4] = b"RGKN";

/// Absolute file offset of the key navigation block.
pub const KEY_NAVIGATION_OFFSET: u64 = FILE_HEADER_SIZE as u64;

/// Size of the key navigation header in bytes.
pub const KEY_NAVIGATION_HEADER_SIZE: usize = 32;

/// Key navigation block header.
#[derive(Debug, Clone)]
pub struct KeyNavigationHeader {
    /// Size of the block in bytes, including this header.
    pub size: u32,

    /// Offset of the root key hierarchy entry, relative to the block start.
    pub root_key_offset: u32,
}

impl KeyNavigationHeader {
    /// Parses a key navigation header from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is not "RGKN", or if the recorded
    /// size cannot hold the header and the root entry.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < KEY_NAVIGATION_HEADER_SIZE {
            return Err(RegistryError::truncated(
                KEY_NAVIGATION_OFFSET,
                KEY_NAVIGATION_HEADER_SIZE,
                data.len(),
            ));
        }
        check_signature(data, RGKN_SIGNATURE)?;

        let size = read_u32_le(data, 0x04)?;
        let root_key_offset = read_u32_le(data, 0x08)?;

        if (size as usize) < KEY_NAVIGATION_HEADER_SIZE {
            return Err(RegistryError::format_error(format!(
                "Key navigation size {} is smaller than its header",
                size
            )));
        }

        Ok(KeyNavigationHeader {
            size,
            root_key_offset,
        })
    }

    /// Checks that a hierarchy entry at `offset` lies inside the block.
    pub fn check_entry_offset(&self, offset: u32) -> Result<()> {
        let end = u64::from(offset) + KEY_HIERARCHY_ENTRY_SIZE as u64;
        if (offset as usize) < KEY_NAVIGATION_HEADER_SIZE || end > u64::from(self.size) {
            return Err(RegistryError::InvalidOffset {
                offset: u64::from(offset),
                limit: u64::from(self.size),
            });
        }
        Ok(())
    }

    /// Converts a block-relative offset to an absolute file offset.
    #[inline]
    pub fn absolute_offset(&self, offset: u32) -> u64 {
        KEY_NAVIGATION_OFFSET + u64::from(offset)
    }
}

/// Size of a key hierarchy entry in bytes.
pub const KEY_HIERARCHY_ENTRY_SIZE: usize = 28;

/// A node of the key hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHierarchyEntry {
    /// Hash of the key name, as stored by the writer.
    pub name_hash: u32,

    /// Offset of the parent entry (negative if none).
    pub parent_key_offset: u32,

    /// Offset of the first sub key entry (negative if none).
    pub sub_key_offset: u32,

    /// Offset of the next sibling entry (negative if none).
    pub next_key_offset: u32,

    /// Position of the key name entry in its data block.
    pub key_name_entry_number: u16,

    /// Index of the data block holding the key name entry (negative if none).
    pub data_block_number: u16,
}

impl KeyHierarchyEntry {
    /// Parses a key hierarchy entry from raw bytes.
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < KEY_HIERARCHY_ENTRY_SIZE {
            return Err(RegistryError::truncated(
                u64::from(offset),
                KEY_HIERARCHY_ENTRY_SIZE,
                data.len(),
            ));
        }

        let key_id = read_u32_le(data, 0x18)?;

        Ok(KeyHierarchyEntry {
            name_hash: read_u32_le(data, 0x04)?,
            parent_key_offset: read_u32_le(data, 0x0C)?,
            sub_key_offset: read_u32_le(data, 0x10)?,
            next_key_offset: read_u32_le(data, 0x14)?,
            key_name_entry_number: (key_id & 0xFFFF) as u16,
            data_block_number: (key_id >> 16) as u16,
        })
    }

    /// Returns the data block and entry position of the key name entry, if
    /// this key has one.
    pub fn name_entry_location(&self) -> Option<(u16, u16)> {
        if (self.data_block_number as i16) < 0 {
            None
        } else {
            Some((self.data_block_number, self.key_name_entry_number))
        }
    }
}
