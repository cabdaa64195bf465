//! Registry file header parsing.
//!
//! The file header is the first 32 bytes of a Windows 9x/Me registry file.
//! It carries the format version and the location of the data blocks; the
//! key navigation block follows it directly.

use crate::error::{RegistryError, Result};
use crate::utils::{check_signature, has_signature, read_u16_le, read_u32_le};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Size of the file header in bytes.
pub const FILE_HEADER_SIZE: usize = 32;

/// Expected signature for a registry file ("CREG").
pub const CREG_SIGNATURE: &[u8; 4] = b"CREG";

/// Checks whether the file at `path` starts with the "CREG" signature.
///
/// Only the first 4 bytes are read; the rest of the file is not validated.
///
/// # Errors
///
/// Returns an error if the path is empty, the file cannot be read or it is
/// shorter than the signature.
pub fn check_file_signature<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(RegistryError::invalid_argument(
            "check_file_signature",
            "empty path",
        ));
    }

    let mut file = std::fs::File::open(path)?;
    check_stream_signature(&mut file)
}

/// Checks whether a stream starts with the "CREG" signature.
///
/// The stream is read from its start, regardless of its current position.
pub fn check_stream_signature<R: Read + Seek>(mut reader: R) -> Result<bool> {
    reader.seek(SeekFrom::Start(0))?;

    let mut signature = Vec::with_capacity(CREG_SIGNATURE.len());
    reader
        .take(CREG_SIGNATURE.len() as u64)
        .read_to_end(&mut signature)?;
    if signature.len() < CREG_SIGNATURE.len() {
        return Err(RegistryError::truncated(
            0,
            CREG_SIGNATURE.len(),
            signature.len(),
        ));
    }

    Ok(has_signature(&signature, CREG_SIGNATURE))
}

/// Classification of an opened registry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HiveType {
    /// Regular Windows 9x/Me registry file (format version 1.x).
    Ordinary,
    /// Structurally valid file with an unrecognised format version.
    Unknown {
        /// Major format version found in the header.
        major: u16,
        /// Minor format version found in the header.
        minor: u16,
    },
}

impl HiveType {
    /// Returns a short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            HiveType::Ordinary => "ordinary hive",
            HiveType::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for HiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HiveType::Ordinary => f.write_str(self.description()),
            HiveType::Unknown { major, minor } => {
                write!(f, "{} (version {}.{})", self.description(), major, minor)
            }
        }
    }
}

/// Registry file header.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileHeader {
    /// Minor version of the file format.
    pub minor_version: u16,

    /// Major version of the file format.
    pub major_version: u16,

    /// Absolute offset of the first data block.
    pub data_blocks_list_offset: u32,

    /// Number of data blocks, as recorded by the writer.
    pub number_of_data_blocks: u16,
}

impl FileHeader {
    /// Parses a file header from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is shorter than [`FILE_HEADER_SIZE`] or
    /// the signature is not "CREG".
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(RegistryError::truncated(0, FILE_HEADER_SIZE, data.len()));
        }
        check_signature(data, CREG_SIGNATURE)?;

        Ok(FileHeader {
            minor_version: read_u16_le(data, 0x04)?,
            major_version: read_u16_le(data, 0x06)?,
            data_blocks_list_offset: read_u32_le(data, 0x08)?,
            number_of_data_blocks: read_u16_le(data, 0x10)?,
        })
    }

    /// Determines the file type from the format version.
    pub fn hive_type(&self) -> HiveType {
        if self.major_version == 1 {
            HiveType::Ordinary
        } else {
            HiveType::Unknown {
                major: self.major_version,
                minor: self.minor_version,
            }
        }
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registry File Header:\n\
             - Version: {}.{}\n\
             - Data Blocks Offset: {:#x}\n\
             - Data Blocks: {}",
            self.major_version,
            self.minor_version,
            self.data_blocks_list_offset,
            self.number_of_data_blocks
        )
    }
}
