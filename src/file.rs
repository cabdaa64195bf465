//! Registry file handle with an explicit open/close lifecycle.

use crate::codepage::Codepage;
use crate::error::{RegistryError, Result};
use crate::header::HiveType;
use crate::hive::{Hive, Key, MINIMUM_FILE_SIZE};
use crate::source::{ByteSource, ReadSeek};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument};

/// Requested access to a registry file.
///
/// Only [`AccessMode::Read`] is supported; opening with
/// [`AccessMode::Write`] fails with [`RegistryError::UnsupportedMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// Read-only access.
    #[default]
    Read,
    /// Write access.
    Write,
}

impl FromStr for AccessMode {
    type Err = RegistryError;

    /// Parses a mode string such as `"r"` or `"rb"`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" | "rb" => Ok(AccessMode::Read),
            "w" | "wb" | "a" | "ab" | "r+" | "rb+" | "r+b" | "w+" | "wb+" | "w+b" | "a+"
            | "ab+" | "a+b" => Ok(AccessMode::Write),
            _ => Err(RegistryError::UnsupportedMode {
                operation: "open",
                mode: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("r"),
            AccessMode::Write => f.write_str("w"),
        }
    }
}

/// Handle for signalling an abort from another thread.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Requests that the current or next long-running operation stop.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// A Windows 9x/Me registry file handle.
///
/// The handle starts closed. A successful [`File::open`] or
/// [`File::open_stream`] attaches a byte source and validates the file;
/// [`File::close`] releases it again, after which the handle may be
/// reopened. Keys and values borrow the handle, so the borrow checker
/// rejects any use of them after a close.
///
/// # Examples
///
/// ```no_run
/// use creg_parser::{AccessMode, File};
///
/// # fn main() -> creg_parser::Result<()> {
/// let mut file = File::new();
/// file.open("USER.DAT", AccessMode::Read)?;
///
/// let root = file.root_key()?;
/// for key in root.sub_keys()? {
///     println!("{}", key.name()?);
/// }
///
/// file.close()?;
/// # Ok(())
/// # }
/// ```
pub struct File {
    hive: Option<Hive>,
    codepage: Codepage,
    abort: Arc<AtomicBool>,
}

impl File {
    /// Creates a closed file handle using the default codepage (cp1252).
    pub fn new() -> Self {
        Self {
            hive: None,
            codepage: Codepage::default(),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens a registry file by path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the registry file.
    /// * `mode` - Access mode; only [`AccessMode::Read`] is supported.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The mode is not read
    /// - The handle is already open
    /// - The path is empty or does not name a regular file
    /// - The file is not a valid registry file
    ///
    /// On error the handle stays closed.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(&mut self, path: P, mode: AccessMode) -> Result<()> {
        self.check_can_open("open", mode)?;

        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(RegistryError::invalid_argument("open", "empty path"));
        }

        let source = ByteSource::map_path(path, MINIMUM_FILE_SIZE)?;
        self.attach(source)
    }

    /// Opens a registry file from a caller-supplied seekable stream.
    ///
    /// The stream is moved into the handle and released on close, so the
    /// caller does not need to keep it alive.
    #[instrument(skip(self, stream))]
    pub fn open_stream<R: ReadSeek + 'static>(&mut self, stream: R, mode: AccessMode) -> Result<()> {
        self.check_can_open("open_stream", mode)?;

        let source = ByteSource::from_stream(Box::new(stream), MINIMUM_FILE_SIZE)?;
        self.attach(source)
    }

    fn check_can_open(&self, operation: &'static str, mode: AccessMode) -> Result<()> {
        if mode != AccessMode::Read {
            return Err(RegistryError::UnsupportedMode {
                operation,
                mode: mode.to_string(),
            });
        }
        if self.hive.is_some() {
            return Err(RegistryError::AlreadyOpen { operation });
        }
        Ok(())
    }

    fn attach(&mut self, source: ByteSource) -> Result<()> {
        let hive = Hive::from_source(source, self.codepage, Arc::clone(&self.abort))?;
        self.hive = Some(hive);
        Ok(())
    }

    /// Closes the file, releasing its byte source.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotOpen`] if the handle is not open.
    pub fn close(&mut self) -> Result<()> {
        match self.hive.take() {
            Some(_) => {
                info!("Closed registry file");
                Ok(())
            }
            None => Err(RegistryError::NotOpen { operation: "close" }),
        }
    }

    /// Returns true if a file is currently open.
    pub fn is_open(&self) -> bool {
        self.hive.is_some()
    }

    /// Signals the current or next long-running operation to abort.
    pub fn signal_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    /// Returns a handle that can signal an abort from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.abort))
    }

    /// Returns the codepage used for extended-ASCII strings.
    pub fn ascii_codepage(&self) -> Codepage {
        self.codepage
    }

    /// Sets the codepage used for extended-ASCII strings.
    ///
    /// The setting may be changed whether or not a file is open; an open
    /// file applies it to every subsequent read.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedCodepage`] for identifiers outside
    /// the supported set, leaving the current codepage unchanged.
    pub fn set_ascii_codepage(&mut self, name: &str) -> Result<()> {
        let codepage = Codepage::from_name(name)?;
        self.codepage = codepage;
        if let Some(hive) = self.hive.as_mut() {
            hive.set_codepage(codepage);
        }
        Ok(())
    }

    fn hive(&self, operation: &'static str) -> Result<&Hive> {
        self.hive
            .as_ref()
            .ok_or(RegistryError::NotOpen { operation })
    }

    /// Returns the type of the open file.
    pub fn file_type(&self) -> Result<HiveType> {
        Ok(self.hive("file_type")?.hive_type())
    }

    /// Returns the (major, minor) format version of the open file.
    pub fn format_version(&self) -> Result<(u16, u16)> {
        let header = self.hive("format_version")?.file_header();
        Ok((header.major_version, header.minor_version))
    }

    /// Returns the root key of the open file.
    pub fn root_key(&self) -> Result<Key<'_>> {
        self.hive("root_key")?.root_key()
    }

    /// Resolves a `\`-separated key path from the root key.
    pub fn key_by_path(&self, path: &str) -> Result<Key<'_>> {
        self.hive("key_by_path")?.key_by_path(path)
    }
}

impl Default for File {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("hive", &self.hive)
            .field("codepage", &self.codepage)
            .finish()
    }
}
