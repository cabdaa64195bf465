//! Byte sources backing an open registry file.
//!
//! A source is either a memory-mapped file opened by path or a caller-supplied
//! stream. Both expose positioned, bounds-checked reads so the parsers never
//! depend on a concrete stream type.

use crate::error::{RegistryError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Minimal capability interface for caller-supplied streams.
pub trait ReadSeek: Read + Seek + Send {
    /// Returns the current position in the stream.
    fn tell(&mut self) -> std::io::Result<u64> {
        self.stream_position()
    }
}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Random-access byte source owned by an open registry file.
pub enum ByteSource {
    /// Memory-mapped file data.
    Mapped(Mmap),
    /// Caller-supplied seekable stream.
    Stream {
        /// The stream, serialised behind a lock since reads move its cursor.
        stream: Mutex<Box<dyn ReadSeek>>,
        /// Stream length, determined once when the source is created.
        size: u64,
    },
}

impl ByteSource {
    /// Memory-maps the file at `path`.
    ///
    /// Files shorter than `minimum` bytes are rejected before mapping.
    pub fn map_path(path: &Path, minimum: u64) -> Result<Self> {
        let file = File::open(path)?;

        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(RegistryError::invalid_argument(
                "open",
                format!("{} is not a regular file", path.display()),
            ));
        }
        if metadata.len() < minimum {
            return Err(RegistryError::FileTooSmall {
                size: metadata.len(),
                minimum,
            });
        }

        // SAFETY: the file is opened read-only, its size has been validated to
        // be non-zero, and every access to the map goes through `read_at`,
        // which bounds-checks against the mapped length.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(size = mmap.len(), "Memory mapped registry file");

        Ok(ByteSource::Mapped(mmap))
    }

    /// Wraps a caller-supplied stream, measuring its length.
    pub fn from_stream(mut stream: Box<dyn ReadSeek>, minimum: u64) -> Result<Self> {
        let size = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;

        if size < minimum {
            return Err(RegistryError::FileTooSmall { size, minimum });
        }
        debug!(size, "Attached registry stream");

        Ok(ByteSource::Stream {
            stream: Mutex::new(stream),
            size,
        })
    }

    /// Returns the size of the source in bytes.
    pub fn size(&self) -> u64 {
        match self {
            ByteSource::Mapped(mmap) => mmap.len() as u64,
            ByteSource::Stream { size, .. } => *size,
        }
    }

    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TruncatedData`] if the read would extend past
    /// the end of the source.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let size = self.size();
        let end = offset.checked_add(buf.len() as u64);
        match end {
            Some(end) if end <= size => {}
            _ => {
                return Err(RegistryError::truncated(
                    offset,
                    buf.len(),
                    size.saturating_sub(offset) as usize,
                ))
            }
        }

        match self {
            ByteSource::Mapped(mmap) => {
                let start = offset as usize;
                buf.copy_from_slice(&mmap[start..start + buf.len()]);
            }
            ByteSource::Stream { stream, .. } => {
                let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
                stream.seek(SeekFrom::Start(offset))?;
                stream.read_exact(buf)?;
            }
        }
        Ok(())
    }

    /// Reads `length` bytes starting at `offset` into a new buffer.
    pub fn read_vec(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; length];
        self.read_at(offset, &mut data)?;
        Ok(data)
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteSource::Mapped(mmap) => f.debug_tuple("Mapped").field(&mmap.len()).finish(),
            ByteSource::Stream { size, .. } => {
                f.debug_struct("Stream").field("size", size).finish_non_exhaustive()
            }
        }
    }
}
