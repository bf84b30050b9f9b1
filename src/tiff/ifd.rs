//! Image File Directory (IFD) structures and methods
//!
//! An IFD describes one image (one plane, for the readers in this crate) as
//! a collection of tag entries. Values that fit in the entry's value field
//! are stored inline; larger values live at an offset in the file and are
//! resolved by [`TiffReader::read_tag_values`](crate::tiff::TiffReader::read_tag_values).

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;

use log::trace;

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{field_types, tags};

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD, in file order
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Tag number to index into `entries`
    tag_map: HashMap<u16, usize>,
}

/// Represents an entry in an Image File Directory (IFD)
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Raw bytes of the value field (4 bytes for TIFF, 8 for BigTIFF)
    pub raw_value: Vec<u8>,
    /// The value field interpreted as an offset
    pub value_offset: u64,
}

/// Size in bytes of one value of the given field type
pub fn field_type_size(field_type: u16) -> Option<usize> {
    match field_type {
        field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => Some(1),
        field_types::SHORT | field_types::SSHORT => Some(2),
        field_types::LONG | field_types::SLONG | field_types::FLOAT => Some(4),
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => Some(8),
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => Some(8),
        _ => None,
    }
}

impl IFDEntry {
    pub fn new(tag: u16, field_type: u16, count: u64, raw_value: Vec<u8>, value_offset: u64) -> Self {
        IFDEntry { tag, field_type, count, raw_value, value_offset }
    }

    /// Total size of the entry's values in bytes
    pub fn byte_len(&self) -> u64 {
        field_type_size(self.field_type).unwrap_or(1) as u64 * self.count
    }

    /// Determines if the value is stored inline in the value field
    pub fn is_value_inline(&self) -> bool {
        self.byte_len() <= self.raw_value.len() as u64
    }

    /// Decodes inline values, or None if the values live at an offset
    pub fn inline_values(&self, byte_order: ByteOrder) -> Option<Vec<u64>> {
        if !self.is_value_inline() {
            return None;
        }
        let mut cursor = Cursor::new(&self.raw_value[..]);
        let mut values = Vec::with_capacity(self.count as usize);
        for _ in 0..self.count {
            let value = match self.field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => {
                    let pos = cursor.position() as usize;
                    cursor.set_position(pos as u64 + 1);
                    self.raw_value[pos] as u64
                }
                field_types::SHORT | field_types::SSHORT => byte_order.read_u16(&mut cursor).ok()? as u64,
                field_types::LONG | field_types::SLONG | field_types::FLOAT => {
                    byte_order.read_u32(&mut cursor).ok()? as u64
                }
                field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => byte_order.read_u64(&mut cursor).ok()?,
                _ => return None,
            };
            values.push(value);
        }
        Some(values)
    }
}

impl IFD {
    /// Creates an empty IFD with the given number and file offset
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry and updates the tag lookup
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("IFD #{}: tag {} type {} count {}", self.number, entry.tag, entry.field_type, entry.count);
        self.tag_map.insert(entry.tag, self.entries.len());
        self.entries.push(entry);
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag).map(|&i| &self.entries[i])
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// First inline value of a tag
    ///
    /// Only meaningful for tags whose value fits in the entry; offset-valued
    /// tags must be read through the TIFF reader.
    pub fn get_tag_value(&self, tag: u16, byte_order: ByteOrder) -> Option<u64> {
        self.get_entry(tag)
            .and_then(|entry| entry.inline_values(byte_order))
            .and_then(|values| values.first().copied())
    }

    /// Width and height, if both tags are present
    pub fn get_dimensions(&self, byte_order: ByteOrder) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH, byte_order)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH, byte_order)?;
        Some((width, height))
    }

    /// Number of samples per pixel (1 if not specified)
    pub fn get_samples_per_pixel(&self, byte_order: ByteOrder) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL, byte_order).unwrap_or(1)
    }

    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;
        for entry in &self.entries {
            writeln!(f, "    tag {} type {} count {} value/offset {}",
                     entry.tag, entry.field_type, entry.count, entry.value_offset)?;
        }
        Ok(())
    }
}
