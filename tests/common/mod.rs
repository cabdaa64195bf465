//! Synthetic CREG image builder shared by the integration tests.

#![allow(dead_code)]

use creg_parser::File;
use creg_parser::AccessMode;
use std::io::Cursor;

pub const REG_SZ: u32 = 1;
pub const REG_EXPAND_SZ: u32 = 2;
pub const REG_BINARY: u32 = 3;
pub const REG_DWORD: u32 = 4;
pub const REG_DWORD_BIG_ENDIAN: u32 = 5;
pub const REG_LINK: u32 = 6;
pub const REG_MULTI_SZ: u32 = 7;
pub const REG_QWORD: u32 = 11;

/// Size of a key hierarchy entry.
pub const HIERARCHY_ENTRY_SIZE: usize = 28;

/// A key to be written into a synthetic image.
#[derive(Debug, Clone, Default)]
pub struct KeySpec {
    pub name: Option<Vec<u8>>,
    pub values: Vec<(u32, Vec<u8>, Vec<u8>)>,
    pub children: Vec<KeySpec>,
}

impl KeySpec {
    /// The root key, which has no key name entry.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self::raw(name.as_bytes())
    }

    pub fn raw(name: &[u8]) -> Self {
        Self {
            name: Some(name.to_vec()),
            ..Self::default()
        }
    }

    pub fn value(self, data_type: u32, name: &str, data: &[u8]) -> Self {
        self.raw_value(data_type, name.as_bytes(), data)
    }

    pub fn raw_value(mut self, data_type: u32, name: &[u8], data: &[u8]) -> Self {
        self.values.push((data_type, name.to_vec(), data.to_vec()));
        self
    }

    pub fn child(mut self, child: KeySpec) -> Self {
        self.children.push(child);
        self
    }
}

struct FlatKey<'a> {
    node: &'a KeySpec,
    parent: Option<usize>,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
    location: Option<(u16, u16)>,
}

fn flatten<'a>(node: &'a KeySpec, parent: Option<usize>, keys: &mut Vec<FlatKey<'a>>) -> usize {
    let index = keys.len();
    keys.push(FlatKey {
        node,
        parent,
        first_child: None,
        next_sibling: None,
        location: None,
    });

    let mut previous: Option<usize> = None;
    for child in &node.children {
        let child_index = flatten(child, Some(index), keys);
        match previous {
            Some(prev) => keys[prev].next_sibling = Some(child_index),
            None => keys[index].first_child = Some(child_index),
        }
        previous = Some(child_index);
    }
    index
}

/// Offset of hierarchy entry `index`, relative to the RGKN block.
pub fn hierarchy_offset(index: usize) -> u32 {
    (0x20 + index * HIERARCHY_ENTRY_SIZE) as u32
}

/// Absolute file offset of hierarchy entry `index`.
pub fn hierarchy_file_offset(index: usize) -> usize {
    0x20 + hierarchy_offset(index) as usize
}

fn encode_offset(index: Option<usize>) -> u32 {
    index.map_or(0xFFFF_FFFF, hierarchy_offset)
}

fn key_name_entry(node: &KeySpec, index: u16) -> Vec<u8> {
    let name = node.name.as_deref().unwrap_or_default();
    let mut values = Vec::new();
    for (data_type, value_name, data) in &node.values {
        values.extend_from_slice(&data_type.to_le_bytes());
        values.extend_from_slice(&0u32.to_le_bytes());
        values.extend_from_slice(&(value_name.len() as u16).to_le_bytes());
        values.extend_from_slice(&(data.len() as u16).to_le_bytes());
        values.extend_from_slice(value_name);
        values.extend_from_slice(data);
    }

    let size = 20 + name.len() + values.len();
    let mut entry = Vec::with_capacity(size);
    entry.extend_from_slice(&(size as u32).to_le_bytes());
    entry.extend_from_slice(&index.to_le_bytes());
    entry.extend_from_slice(&0u16.to_le_bytes());
    entry.extend_from_slice(&(size as u32).to_le_bytes());
    entry.extend_from_slice(&(name.len() as u16).to_le_bytes());
    entry.extend_from_slice(&(node.values.len() as u16).to_le_bytes());
    entry.extend_from_slice(&0u32.to_le_bytes());
    entry.extend_from_slice(name);
    entry.extend_from_slice(&values);
    entry
}

/// Builds an image with every key name entry in a single data block.
pub fn build(root: &KeySpec) -> Vec<u8> {
    build_with_block_capacity(root, usize::MAX)
}

/// Builds an image, starting a new data block every `per_block` entries.
pub fn build_with_block_capacity(root: &KeySpec, per_block: usize) -> Vec<u8> {
    let mut keys = Vec::new();
    flatten(root, None, &mut keys);

    let mut blocks: Vec<Vec<Vec<u8>>> = Vec::new();
    for key in keys.iter_mut() {
        if key.node.name.is_none() {
            continue;
        }
        if blocks.last().map_or(true, |block| block.len() >= per_block) {
            blocks.push(Vec::new());
        }
        let block_number = blocks.len() - 1;
        let block = &mut blocks[block_number];
        let entry_number = block.len();
        block.push(key_name_entry(key.node, entry_number as u16));
        key.location = Some((block_number as u16, entry_number as u16));
    }

    let navigation_size = 0x20 + keys.len() * HIERARCHY_ENTRY_SIZE;
    let data_blocks_offset = 0x20 + navigation_size;

    let mut image = vec![0u8; 0x20];
    image[0..4].copy_from_slice(b"CREG");
    image[4..6].copy_from_slice(&0u16.to_le_bytes());
    image[6..8].copy_from_slice(&1u16.to_le_bytes());
    image[8..12].copy_from_slice(&(data_blocks_offset as u32).to_le_bytes());
    image[16..18].copy_from_slice(&(blocks.len() as u16).to_le_bytes());

    let mut navigation = vec![0u8; 0x20];
    navigation[0..4].copy_from_slice(b"RGKN");
    navigation[4..8].copy_from_slice(&(navigation_size as u32).to_le_bytes());
    navigation[8..12].copy_from_slice(&hierarchy_offset(0).to_le_bytes());
    image.extend_from_slice(&navigation);

    for key in &keys {
        let mut entry = [0u8; HIERARCHY_ENTRY_SIZE];
        entry[0x0C..0x10].copy_from_slice(&encode_offset(key.parent).to_le_bytes());
        entry[0x10..0x14].copy_from_slice(&encode_offset(key.first_child).to_le_bytes());
        entry[0x14..0x18].copy_from_slice(&encode_offset(key.next_sibling).to_le_bytes());
        let key_id = match key.location {
            Some((block, number)) => (u32::from(block) << 16) | u32::from(number),
            None => 0xFFFF_FFFF,
        };
        entry[0x18..0x1C].copy_from_slice(&key_id.to_le_bytes());
        image.extend_from_slice(&entry);
    }

    for (index, entries) in blocks.iter().enumerate() {
        let entries_size: usize = entries.iter().map(Vec::len).sum();
        let size = 0x20 + entries_size;

        let mut header = [0u8; 0x20];
        header[0..4].copy_from_slice(b"RGDB");
        header[4..8].copy_from_slice(&(size as u32).to_le_bytes());
        header[0x0E..0x10].copy_from_slice(&(index as u16).to_le_bytes());
        header[0x10..0x14].copy_from_slice(&(size as u32).to_le_bytes());
        image.extend_from_slice(&header);
        for entry in entries {
            image.extend_from_slice(entry);
        }
    }

    image
}

/// A small tree exercising names, duplicates, codepages and every
/// accessor type.
pub fn sample_tree() -> KeySpec {
    KeySpec::root()
        .child(
            KeySpec::named("Software")
                .value(REG_SZ, "", b"default\0")
                .value(REG_SZ, "Version", b"4.10.2222\0")
                .value(REG_DWORD, "Flags", &7u32.to_le_bytes())
                .value(REG_SZ, "VERSION", b"shadowed\0")
                .child(
                    KeySpec::named("Microsoft")
                        .child(KeySpec::named("Windows").value(
                            REG_EXPAND_SZ,
                            "SystemRoot",
                            b"%windir%\0",
                        ))
                        .child(KeySpec::named("Office")),
                ),
        )
        .child(
            KeySpec::named("System")
                .value(REG_DWORD_BIG_ENDIAN, "Order", &[0x00, 0x00, 0x01, 0x02])
                .value(REG_QWORD, "Large", &0x0102_0304_0506_0708u64.to_le_bytes())
                .value(REG_BINARY, "Blob", &[0xDE, 0xAD, 0xBE, 0xEF])
                .value(REG_MULTI_SZ, "List", b"one\0two\0\0")
                .value(REG_LINK, "Target", b"Software\0")
                .value(0x42, "Odd", &[1, 2, 3]),
        )
        .child(KeySpec::named("SOFTWARE").value(REG_SZ, "Marker", b"second\0"))
        .child(KeySpec::raw(b"Caf\xe9").raw_value(REG_SZ, b"Na\xefve", b"r\xe9sum\xe9\0"))
}

/// Opens `image` as a stream in a fresh file handle.
pub fn open_image(image: Vec<u8>) -> File {
    let mut file = File::new();
    file.open_stream(Cursor::new(image), AccessMode::Read)
        .expect("synthetic image should open");
    file
}
