//! # Windows 9x/Me Registry File Parser
//!
//! A read-only parser for the `CREG` registry files used by Windows 95, 98
//! and Me (`SYSTEM.DAT`, `USER.DAT`).
//!
//! ## Features
//!
//! - **Memory-mapped or streamed**: open by path (mapped) or from any
//!   `Read + Seek` stream
//! - **Lazy evaluation**: keys, names and values are read only when accessed
//! - **Codepage aware**: names and strings are decoded with a configurable
//!   extended-ASCII codepage (cp1252 by default)
//! - **Comprehensive error handling**: every error carries a coarse
//!   [`ErrorKind`]
//!
//! ## Architecture
//!
//! The parser is built on several layers:
//!
//! 1. **File Header**: signature, format version, data blocks location
//! 2. **Key Navigation (RGKN)**: the key tree as linked hierarchy entries
//! 3. **Data Blocks (RGDB)**: key name entries, found by position
//! 4. **Key Name Entries**: a key's name followed by its value entries
//! 5. **Value Entries**: typed values with name and data
//!
//! ## Binary Layout
//!
//! ```text
//! [File Header - 32 bytes]
//!   - Signature: "CREG"
//!   - Version, data blocks offset, number of data blocks
//!
//! [Key Navigation - variable size, at 0x20]
//!   [Header - 32 bytes]
//!     - Signature: "RGKN"
//!     - Size, root key offset
//!   [Key Hierarchy Entries - 28 bytes each]
//!     - Parent, first sub key and next sibling offsets
//!     - Data block number, key name entry number
//!
//! [Data Blocks - variable size, back to back until end of file]
//!   [Header - 32 bytes]
//!     - Signature: "RGDB"
//!     - Size, unused size, used size
//!   [Key Name Entries]
//!     - Size, name, value entries
//! ```
//!
//! ## Examples
//!
//! ### Basic Usage
//!
//! ```no_run
//! use creg_parser::{AccessMode, File};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut file = File::new();
//! file.open("SYSTEM.DAT", AccessMode::Read)?;
//! println!("Type: {}", file.file_type()?);
//!
//! let root = file.root_key()?;
//! for subkey in root.sub_keys()? {
//!     println!("  Subkey: {}", subkey.name()?);
//! }
//!
//! for value in root.values()? {
//!     println!("  Value: {} = {}", value.name(), value.parsed()?.to_string());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Accessing Specific Values
//!
//! ```no_run
//! use creg_parser::{AccessMode, File, ValueData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut file = File::new();
//! file.set_ascii_codepage("cp1251")?;
//! file.open("USER.DAT", AccessMode::Read)?;
//!
//! let key = file.key_by_path("Software\\Microsoft\\Windows\\CurrentVersion")?;
//! let value = key.value_by_name("ProgramFilesDir")?;
//! match value.parsed()? {
//!     ValueData::String(s) => println!("String value: {}", s),
//!     ValueData::Dword(d) => println!("DWORD value: {}", d),
//!     _ => println!("Other type"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codepage;
pub mod data_block;
pub mod error;
pub mod file;
pub mod header;
pub mod hive;
pub mod key_name_entry;
pub mod navigation;
pub mod source;
pub mod utils;
pub mod value;
pub mod value_type;

// Re-export main types for convenience
pub use codepage::Codepage;
pub use data_block::DataBlockHeader;
pub use error::{ErrorKind, RegistryError, Result};
pub use file::{AbortHandle, AccessMode, File};
pub use header::{check_file_signature, check_stream_signature, FileHeader, HiveType};
pub use hive::{Hive, Key, Value};
pub use source::ReadSeek;
pub use value::ValueData;
pub use value_type::ValueType;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
