//! Open registry file session with lazy key and value access.

use crate::codepage::Codepage;
use crate::data_block::{DataBlock, DataBlockHeader, DATA_BLOCK_HEADER_SIZE, RGDB_SIGNATURE};
use crate::error::{RegistryError, Result};
use crate::header::{FileHeader, HiveType, FILE_HEADER_SIZE};
use crate::key_name_entry::KeyNameEntry;
use crate::navigation::{
    KeyHierarchyEntry, KeyNavigationHeader, KEY_HIERARCHY_ENTRY_SIZE, KEY_NAVIGATION_HEADER_SIZE,
    KEY_NAVIGATION_OFFSET,
};
use crate::source::{ByteSource, ReadSeek};
use crate::utils::{has_signature, names_equal, optional_offset, path_segments};
use crate::value::{read_dword, read_qword, ValueData, ValueEntry};
use crate::value_type::ValueType;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// Smallest file that can hold the file header and the key navigation header.
pub const MINIMUM_FILE_SIZE: u64 = (FILE_HEADER_SIZE + KEY_NAVIGATION_HEADER_SIZE) as u64;

/// Main registry file parser.
///
/// A `Hive` owns the byte source of one open registry file together with
/// the headers validated at open. Keys and values are transient views that
/// borrow the hive, so none of them can outlive it.
///
/// # Caching
///
/// Data blocks and key name entries are read on first use and cached. The
/// caches use interior mutability via `RwLock` so navigation only needs
/// `&self`.
pub struct Hive {
    /// Backing bytes of the file.
    source: ByteSource,

    /// Parsed file header.
    header: FileHeader,

    /// Parsed key navigation header.
    navigation: KeyNavigationHeader,

    /// Headers of all data blocks, in file order.
    data_blocks: Vec<DataBlockHeader>,

    /// Cache of read data blocks (position -> block).
    block_cache: RwLock<HashMap<u16, Arc<DataBlock>>>,

    /// Cache of parsed key name entries ((block, entry) -> entry).
    entry_cache: RwLock<HashMap<(u16, u16), Arc<KeyNameEntry>>>,

    /// Codepage applied to names and string data.
    codepage: Codepage,

    /// Cooperative abort flag shared with the owning file handle.
    abort: Arc<AtomicBool>,
}

impl Hive {
    /// Opens a registry file by path, memory-mapping it.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the registry file (`SYSTEM.DAT`, `USER.DAT`).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be opened or is not a regular file
    /// - File is not a valid CREG registry file
    /// - A header or data block is corrupted
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use creg_parser::Hive;
    ///
    /// let hive = Hive::open("SYSTEM.DAT").unwrap();
    /// ```
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = ByteSource::map_path(path.as_ref(), MINIMUM_FILE_SIZE)?;
        Self::from_source(source, Codepage::default(), Arc::new(AtomicBool::new(false)))
    }

    /// Opens a registry file from a seekable stream.
    ///
    /// The stream is moved into the hive and read on demand.
    pub fn from_reader<R: ReadSeek + 'static>(reader: R) -> Result<Self> {
        let source = ByteSource::from_stream(Box::new(reader), MINIMUM_FILE_SIZE)?;
        Self::from_source(source, Codepage::default(), Arc::new(AtomicBool::new(false)))
    }

    /// Validates the headers of `source` and indexes its data blocks.
    pub(crate) fn from_source(
        source: ByteSource,
        codepage: Codepage,
        abort: Arc<AtomicBool>,
    ) -> Result<Self> {
        check_abort(&abort, "open")?;

        let header = FileHeader::parse(&source.read_vec(0, FILE_HEADER_SIZE)?)?;
        debug!(
            major = header.major_version,
            minor = header.minor_version,
            "File header validated"
        );

        let navigation = KeyNavigationHeader::parse(
            &source.read_vec(KEY_NAVIGATION_OFFSET, KEY_NAVIGATION_HEADER_SIZE)?,
        )?;
        let navigation_end = KEY_NAVIGATION_OFFSET + u64::from(navigation.size);
        if navigation_end > source.size() {
            return Err(RegistryError::truncated(
                KEY_NAVIGATION_OFFSET,
                navigation.size as usize,
                source.size().saturating_sub(KEY_NAVIGATION_OFFSET) as usize,
            ));
        }

        let data_blocks = scan_data_blocks(&source, &header, &abort)?;

        let hive_type = header.hive_type();
        if let HiveType::Unknown { major, minor } = hive_type {
            warn!(major, minor, "Unsupported format version");
        }
        info!(
            hive_type = %hive_type,
            data_blocks = data_blocks.len(),
            size = source.size(),
            "Opened registry file"
        );

        Ok(Self {
            source,
            header,
            navigation,
            data_blocks,
            block_cache: RwLock::new(HashMap::new()),
            entry_cache: RwLock::new(HashMap::new()),
            codepage,
            abort,
        })
    }

    /// Returns a reference to the file header.
    pub fn file_header(&self) -> &FileHeader {
        &self.header
    }

    /// Returns the type of the registry file.
    pub fn hive_type(&self) -> HiveType {
        self.header.hive_type()
    }

    /// Returns the size of the underlying file in bytes.
    pub fn size(&self) -> u64 {
        self.source.size()
    }

    /// Returns the headers of the data blocks, in file order.
    pub fn data_blocks(&self) -> &[DataBlockHeader] {
        &self.data_blocks
    }

    /// Returns the codepage used to decode names and strings.
    pub fn codepage(&self) -> Codepage {
        self.codepage
    }

    /// Changes the codepage used by subsequent reads.
    pub fn set_codepage(&mut self, codepage: Codepage) {
        self.codepage = codepage;
    }

    /// Returns the root key of the registry file.
    ///
    /// # Errors
    ///
    /// Returns an error if the root hierarchy entry is missing or cannot be
    /// parsed.
    #[instrument(skip(self))]
    pub fn root_key(&self) -> Result<Key<'_>> {
        let offset = optional_offset(self.navigation.root_key_offset).ok_or_else(|| {
            RegistryError::format_error("Key navigation has no root key".to_string())
        })?;
        debug!(offset = %format!("{:#x}", offset), "Accessing root key");
        self.key_at(offset)
    }

    /// Resolves a `\`-separated key path relative to the root key.
    pub fn key_by_path(&self, path: &str) -> Result<Key<'_>> {
        self.root_key()?.sub_key_by_path(path)
    }

    /// Builds a key view for the hierarchy entry at `offset`.
    fn key_at(&self, offset: u32) -> Result<Key<'_>> {
        Ok(Key {
            hive: self,
            offset,
            entry: self.hierarchy_entry(offset)?,
        })
    }

    /// Reads the key hierarchy entry at a navigation-relative offset.
    fn hierarchy_entry(&self, offset: u32) -> Result<KeyHierarchyEntry> {
        self.navigation.check_entry_offset(offset)?;
        let data = self.source.read_vec(
            self.navigation.absolute_offset(offset),
            KEY_HIERARCHY_ENTRY_SIZE,
        )?;
        KeyHierarchyEntry::parse(&data, offset)
    }

    /// Returns the data block at `number`, reading it on first use.
    fn data_block(&self, number: u16) -> Result<Arc<DataBlock>> {
        if let Some(block) = self
            .block_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&number)
        {
            return Ok(Arc::clone(block));
        }

        let header = self.data_blocks.get(number as usize).ok_or_else(|| {
            RegistryError::format_error(format!(
                "Data block {} out of range ({} blocks)",
                number,
                self.data_blocks.len()
            ))
        })?;
        debug!(number, offset = %format!("{:#x}", header.offset), "Cache miss, reading data block");

        let data = self.source.read_vec(
            header.offset + DATA_BLOCK_HEADER_SIZE as u64,
            header.data_size(),
        )?;
        let block = Arc::new(DataBlock::new(header.clone(), data)?);

        self.block_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(number, Arc::clone(&block));
        Ok(block)
    }

    /// Returns the key name entry referenced by a hierarchy entry, if any.
    fn key_name_entry(&self, entry: &KeyHierarchyEntry) -> Result<Option<Arc<KeyNameEntry>>> {
        let Some(location) = entry.name_entry_location() else {
            return Ok(None);
        };

        if let Some(name_entry) = self
            .entry_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&location)
        {
            return Ok(Some(Arc::clone(name_entry)));
        }

        let (block_number, entry_number) = location;
        let block = self.data_block(block_number)?;
        let (offset, data) = block.entry(entry_number as usize).ok_or_else(|| {
            RegistryError::format_error(format!(
                "Key name entry {} out of range in data block {} ({} entries)",
                entry_number,
                block_number,
                block.number_of_entries()
            ))
        })?;
        let name_entry = Arc::new(KeyNameEntry::parse(data, offset)?);

        self.entry_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location, Arc::clone(&name_entry));
        Ok(Some(name_entry))
    }

    /// Fails with `Aborted` if an abort was signalled, clearing the signal.
    fn check_abort(&self, operation: &'static str) -> Result<()> {
        check_abort(&self.abort, operation)
    }
}

impl std::fmt::Debug for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hive")
            .field("source", &self.source)
            .field("hive_type", &self.hive_type())
            .field("data_blocks", &self.data_blocks.len())
            .field("codepage", &self.codepage)
            .finish()
    }
}

fn check_abort(abort: &AtomicBool, operation: &'static str) -> Result<()> {
    if abort.swap(false, Ordering::AcqRel) {
        warn!(operation, "Operation aborted");
        return Err(RegistryError::Aborted(operation));
    }
    Ok(())
}

/// Reads the data block headers from the data blocks list to the end of the
/// file.
fn scan_data_blocks(
    source: &ByteSource,
    header: &FileHeader,
    abort: &AtomicBool,
) -> Result<Vec<DataBlockHeader>> {
    let size = source.size();
    let mut blocks = Vec::new();
    let mut offset = u64::from(header.data_blocks_list_offset);

    while offset < size {
        check_abort(abort, "open")?;

        if offset + DATA_BLOCK_HEADER_SIZE as u64 > size {
            warn!(
                offset = %format!("{:#x}", offset),
                remaining = size - offset,
                "Trailing bytes after last data block"
            );
            break;
        }

        let data = source.read_vec(offset, DATA_BLOCK_HEADER_SIZE)?;
        if !has_signature(&data, RGDB_SIGNATURE) {
            if blocks.is_empty() {
                debug!(offset = %format!("{:#x}", offset), "No data blocks present");
                break;
            }
            return Err(RegistryError::format_error(format!(
                "Missing data block signature at {:#x}",
                offset
            )));
        }

        let block = DataBlockHeader::parse(&data, offset)?;
        if block.next_offset() > size {
            return Err(RegistryError::truncated(
                offset,
                block.size as usize,
                (size - offset) as usize,
            ));
        }
        debug!(
            index = block.index,
            offset = %format!("{:#x}", offset),
            size = block.size,
            "Found data block"
        );

        offset = block.next_offset();
        blocks.push(block);
    }

    if blocks.len() != header.number_of_data_blocks as usize {
        warn!(
            expected = header.number_of_data_blocks,
            found = blocks.len(),
            "Data block count differs from file header"
        );
    }

    Ok(blocks)
}

/// A registry key with access to its hive.
#[derive(Clone)]
pub struct Key<'a> {
    hive: &'a Hive,
    offset: u32,
    entry: KeyHierarchyEntry,
}

impl<'a> Key<'a> {
    /// Returns the offset of the key hierarchy entry, relative to the key
    /// navigation block.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns the name hash stored in the hierarchy entry.
    pub fn name_hash(&self) -> u32 {
        self.entry.name_hash
    }

    /// Returns the key name, decoded with the current codepage.
    ///
    /// Keys without a key name entry (such as the root key) have an empty
    /// name.
    pub fn name(&self) -> Result<String> {
        Ok(self
            .hive
            .key_name_entry(&self.entry)?
            .map(|entry| self.hive.codepage.decode(&entry.name))
            .unwrap_or_default())
    }

    /// Returns the parent key, or `None` for the root key.
    pub fn parent(&self) -> Result<Option<Key<'a>>> {
        match optional_offset(self.entry.parent_key_offset) {
            Some(offset) => Ok(Some(self.hive.key_at(offset)?)),
            None => Ok(None),
        }
    }

    /// Walks the sibling chain of this key's sub keys, in on-disk order,
    /// until `visit` returns `true` or the chain ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain revisits an entry or an entry cannot be
    /// read.
    fn walk_sub_keys<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(Key<'a>) -> Result<bool>,
    {
        let mut visited = HashSet::new();
        visited.insert(self.offset);

        let mut next = optional_offset(self.entry.sub_key_offset);
        while let Some(offset) = next {
            self.hive.check_abort("sub_keys")?;

            if !visited.insert(offset) {
                return Err(RegistryError::format_error(format!(
                    "Cycle in sub key chain of key at {:#x}: entry {:#x} revisited",
                    self.offset, offset
                )));
            }

            let key = self.hive.key_at(offset)?;
            next = optional_offset(key.entry.next_key_offset);
            if visit(key)? {
                break;
            }
        }

        Ok(())
    }

    /// Returns the number of sub keys.
    pub fn number_of_sub_keys(&self) -> Result<usize> {
        let mut count = 0;
        self.walk_sub_keys(|_| {
            count += 1;
            Ok(false)
        })?;
        Ok(count)
    }

    /// Returns the sub key at `index`, in on-disk order.
    ///
    /// Only the part of the sibling chain up to `index` is read.
    pub fn sub_key(&self, index: usize) -> Result<Key<'a>> {
        let mut position = 0;
        let mut found = None;
        self.walk_sub_keys(|key| {
            if position == index {
                found = Some(key);
                return Ok(true);
            }
            position += 1;
            Ok(false)
        })?;

        found.ok_or_else(|| {
            RegistryError::invalid_argument(
                "sub_key",
                format!("index {} out of range ({} sub keys)", index, position),
            )
        })
    }

    /// Returns all sub keys, in on-disk order.
    pub fn sub_keys(&self) -> Result<Vec<Key<'a>>> {
        let mut keys = Vec::new();
        self.walk_sub_keys(|key| {
            keys.push(key);
            Ok(false)
        })?;
        Ok(keys)
    }

    /// Finds the first sub key whose name matches, ignoring case.
    fn find_sub_key(&self, name: &str) -> Result<Option<Key<'a>>> {
        let mut found = None;
        self.walk_sub_keys(|key| {
            if names_equal(&key.name()?, name) {
                found = Some(key);
                return Ok(true);
            }
            Ok(false)
        })?;
        Ok(found)
    }

    /// Gets a specific sub key by name.
    ///
    /// Matching is case-insensitive. When several sub keys share a name the
    /// first one in on-disk order is returned.
    pub fn sub_key_by_name(&self, name: &str) -> Result<Key<'a>> {
        self.find_sub_key(name)?
            .ok_or_else(|| RegistryError::not_found("sub key", name))
    }

    /// Resolves a `\`-separated path relative to this key.
    ///
    /// Empty segments are ignored, so an empty path returns this key.
    pub fn sub_key_by_path(&self, path: &str) -> Result<Key<'a>> {
        let mut key = self.clone();
        for segment in path_segments(path) {
            self.hive.check_abort("sub_key_by_path")?;
            key = key
                .find_sub_key(segment)?
                .ok_or_else(|| RegistryError::not_found("key path", path))?;
        }
        Ok(key)
    }

    /// Returns the number of values.
    pub fn number_of_values(&self) -> Result<usize> {
        Ok(self
            .hive
            .key_name_entry(&self.entry)?
            .map_or(0, |entry| entry.values.len()))
    }

    /// Returns the value at `index`, in on-disk order.
    pub fn value(&self, index: usize) -> Result<Value<'a>> {
        let entry = self.hive.key_name_entry(&self.entry)?;
        let count = entry.as_ref().map_or(0, |entry| entry.values.len());
        match entry {
            Some(key_entry) if index < count => Ok(Value {
                hive: self.hive,
                key_entry,
                index,
            }),
            _ => Err(RegistryError::invalid_argument(
                "value",
                format!("index {} out of range ({} values)", index, count),
            )),
        }
    }

    /// Returns all values, in on-disk order.
    pub fn values(&self) -> Result<Vec<Value<'a>>> {
        let Some(entry) = self.hive.key_name_entry(&self.entry)? else {
            return Ok(Vec::new());
        };

        Ok((0..entry.values.len())
            .map(|index| Value {
                hive: self.hive,
                key_entry: Arc::clone(&entry),
                index,
            })
            .collect())
    }

    /// Gets a specific value by name.
    ///
    /// Matching is case-insensitive and returns the first match in on-disk
    /// order. The unnamed default value is found with an empty name.
    pub fn value_by_name(&self, name: &str) -> Result<Value<'a>> {
        for value in self.values()? {
            if names_equal(&value.name(), name) {
                return Ok(value);
            }
        }

        Err(RegistryError::not_found("value", name))
    }
}

impl std::fmt::Debug for Key<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("offset", &format_args!("{:#x}", self.offset))
            .field("entry", &self.entry)
            .finish()
    }
}

/// A registry value.
#[derive(Clone)]
pub struct Value<'a> {
    hive: &'a Hive,
    key_entry: Arc<KeyNameEntry>,
    index: usize,
}

impl<'a> Value<'a> {
    fn entry(&self) -> &ValueEntry {
        &self.key_entry.values[self.index]
    }

    /// Returns the absolute file offset of the value entry.
    pub fn offset(&self) -> u64 {
        self.entry().offset
    }

    /// Returns the value name, decoded with the current codepage.
    ///
    /// The default value of a key has an empty name.
    pub fn name(&self) -> String {
        self.hive.codepage.decode(&self.entry().name)
    }

    /// Returns the value data type.
    pub fn value_type(&self) -> ValueType {
        self.entry().data_type
    }

    /// Returns the raw value data.
    pub fn data(&self) -> &[u8] {
        &self.entry().data
    }

    /// Returns the size of the raw value data in bytes.
    pub fn data_size(&self) -> usize {
        self.entry().data.len()
    }

    /// Returns the parsed value data.
    pub fn parsed(&self) -> Result<ValueData> {
        let entry = self.entry();
        ValueData::parse(&entry.data, entry.data_type, self.hive.codepage, entry.offset)
    }

    /// Returns the data of a 32-bit integer value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ValueTypeMismatch`] unless the value is a
    /// little- or big-endian REG_DWORD.
    pub fn value_32bit(&self) -> Result<u32> {
        let entry = self.entry();
        match entry.data_type {
            ValueType::Dword => read_dword(&entry.data, false, entry.offset),
            ValueType::DwordBigEndian => read_dword(&entry.data, true, entry.offset),
            other => Err(self.type_mismatch("value_32bit", other)),
        }
    }

    /// Returns the data of a 64-bit integer value.
    pub fn value_64bit(&self) -> Result<u64> {
        let entry = self.entry();
        match entry.data_type {
            ValueType::Qword => read_qword(&entry.data, entry.offset),
            other => Err(self.type_mismatch("value_64bit", other)),
        }
    }

    /// Returns the data of a string value, decoded with the current
    /// codepage.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ValueTypeMismatch`] unless the value is a
    /// REG_SZ, REG_EXPAND_SZ or REG_LINK.
    pub fn value_string(&self) -> Result<String> {
        let entry = self.entry();
        if !entry.data_type.is_string() {
            return Err(self.type_mismatch("value_string", entry.data_type));
        }
        Ok(self.hive.codepage.decode(&entry.data))
    }

    /// Returns the data of a binary value.
    pub fn binary_data(&self) -> Result<&[u8]> {
        let entry = self.entry();
        match entry.data_type {
            ValueType::Binary => Ok(&entry.data),
            other => Err(self.type_mismatch("binary_data", other)),
        }
    }

    fn type_mismatch(&self, requested: &'static str, actual: ValueType) -> RegistryError {
        RegistryError::ValueTypeMismatch {
            requested,
            actual: actual.identifier().to_string(),
        }
    }
}

impl std::fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("offset", &format_args!("{:#x}", self.offset()))
            .field("value_type", &self.value_type())
            .field("data_size", &self.data_size())
            .finish()
    }
}
