//! Data block (RGDB) parsing.
//!
//! Data blocks follow the key navigation block and hold the key name
//! entries. Each block has a 32-byte header followed by a sequence of
//! variable-sized entries; an entry is addressed by its position in the
//! block.

use crate::error::{RegistryError, Result};
use crate::key_name_entry::KEY_NAME_ENTRY_HEADER_SIZE;
use crate::utils::{check_signature, read_u16_le, read_u32_le};
use tracing::warn;

/// Expected signature for data blocks ("RGDB").
pub const RGDB_SIGNATURE: &[u8; 4] = b"RGDB";

/// Size of a data block header in bytes.
pub const DATA_BLOCK_HEADER_SIZE: usize = 32;

/// Data block header structure.
#[derive(Debug, Clone)]
pub struct DataBlockHeader {
    /// Absolute file offset of the block.
    pub offset: u64,

    /// Size of the block in bytes (including header).
    pub size: u32,

    /// Number of unused bytes in the block.
    pub unused_size: u32,

    /// Index of the block, as recorded by the writer.
    pub index: u16,

    /// Number of used bytes in the block (including header). A negative
    /// value means the whole block is in use.
    pub used_size: u32,
}

impl DataBlockHeader {
    /// Parses a data block header from raw bytes.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw bytes starting at the block header.
    /// * `offset` - Absolute file offset of the block.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is too small
    /// - Signature is invalid
    /// - The block size cannot hold its own header
    pub fn parse(data: &[u8], offset: u64) -> Result<Self> {
        if data.len() < DATA_BLOCK_HEADER_SIZE {
            return Err(RegistryError::truncated(
                offset,
                DATA_BLOCK_HEADER_SIZE,
                data.len(),
            ));
        }
        check_signature(data, RGDB_SIGNATURE)?;

        let size = read_u32_le(data, 0x04)?;
        if (size as usize) < DATA_BLOCK_HEADER_SIZE {
            return Err(RegistryError::format_error(format!(
                "Data block at {:#x} has invalid size {}",
                offset, size
            )));
        }

        Ok(DataBlockHeader {
            offset,
            size,
            unused_size: read_u32_le(data, 0x08)?,
            index: read_u16_le(data, 0x0E)?,
            used_size: read_u32_le(data, 0x10)?,
        })
    }

    /// Returns the size of the data area (excluding the header).
    pub fn data_size(&self) -> usize {
        self.size as usize - DATA_BLOCK_HEADER_SIZE
    }

    /// Returns the number of bytes of the data area holding entries.
    pub fn entries_size(&self) -> usize {
        if (self.used_size as i32) < 0 {
            return self.data_size();
        }

        let used = (self.used_size as usize).saturating_sub(DATA_BLOCK_HEADER_SIZE);
        if used > self.data_size() {
            warn!(
                offset = self.offset,
                used_size = self.used_size,
                size = self.size,
                "Data block used size exceeds block size"
            );
            return self.data_size();
        }
        used
    }

    /// Returns the absolute offset of the block that follows this one.
    pub fn next_offset(&self) -> u64 {
        self.offset + u64::from(self.size)
    }
}

/// Location of an entry inside a data block's data area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlockEntry {
    /// Offset relative to the start of the data area.
    pub offset: usize,
    /// Size of the entry in bytes.
    pub size: usize,
}

/// A fully read data block with its entries indexed.
#[derive(Debug)]
pub struct DataBlock {
    header: DataBlockHeader,
    data: Vec<u8>,
    entries: Vec<DataBlockEntry>,
}

impl DataBlock {
    /// Builds a data block from its header and data area, indexing the
    /// entries it contains.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry size is smaller than a key name entry
    /// header or runs past the end of the data area.
    pub fn new(header: DataBlockHeader, data: Vec<u8>) -> Result<Self> {
        let entries_size = header.entries_size().min(data.len());
        let mut entries = Vec::new();
        let mut offset = 0usize;

        while offset < entries_size {
            let remaining = data.len() - offset;
            if remaining < KEY_NAME_ENTRY_HEADER_SIZE {
                warn!(
                    block = header.offset,
                    offset,
                    remaining,
                    "Trailing bytes in data block too small for an entry"
                );
                break;
            }

            let size = read_u32_le(&data, offset)? as usize;
            if size < KEY_NAME_ENTRY_HEADER_SIZE || size > remaining {
                return Err(RegistryError::format_error(format!(
                    "Data block at {:#x} entry {} at offset {:#x} has invalid size {}",
                    header.offset,
                    entries.len(),
                    offset,
                    size
                )));
            }

            entries.push(DataBlockEntry { offset, size });
            offset += size;
        }

        Ok(DataBlock {
            header,
            data,
            entries,
        })
    }

    /// Returns the block header.
    pub fn header(&self) -> &DataBlockHeader {
        &self.header
    }

    /// Returns the number of entries in the block.
    pub fn number_of_entries(&self) -> usize {
        self.entries.len()
    }

    /// Returns the bytes of the entry at `index`, with its absolute file
    /// offset.
    pub fn entry(&self, index: usize) -> Option<(u64, &[u8])> {
        let entry = self.entries.get(index)?;
        let absolute =
            self.header.offset + DATA_BLOCK_HEADER_SIZE as u64 + entry.offset as u64;
        Some((absolute, &self.data[entry.offset..entry.offset + entry.size]))
    }
}
