//! TIFF file reader implementation
//!
//! Parses the header and the chain of Image File Directories of a TIFF or
//! BigTIFF container. Pixel data is not touched here; plane decoding lives
//! in [`crate::formats::tiff_reader`].

use log::{debug, info, warn};
use std::collections::HashSet;
use std::io::{Read, SeekFrom};

use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;

/// Upper bound on the IFD chain length
const MAX_IFDS: usize = 1 << 20;

/// Reader for TIFF and BigTIFF files
#[derive(Debug, Default)]
pub struct TiffReader {
    /// Byte order of the current file, once the header has been read
    byte_order: Option<ByteOrder>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Quick check for a TIFF or BigTIFF signature
    pub fn has_signature(bytes: &[u8]) -> bool {
        if bytes.len() < 4 {
            return false;
        }
        let order = match [bytes[0], bytes[1]] {
            header::LITTLE_ENDIAN_MARKER => ByteOrder::LittleEndian,
            header::BIG_ENDIAN_MARKER => ByteOrder::BigEndian,
            _ => return false,
        };
        matches!(order.u16_from(&bytes[2..4]), header::TIFF_VERSION | header::BIG_TIFF_VERSION)
    }

    fn byte_order(&self) -> TiffResult<ByteOrder> {
        self.byte_order
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Reads a TIFF file from the given reader
    ///
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read all IFDs (Image File Directories)
    ///
    /// # Arguments
    /// * `reader` - Any struct implementing the SeekableReader trait
    ///
    /// # Returns
    /// A TIFF structure containing the file's directories
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        self.byte_order = Some(byte_order);

        let version = byte_order.read_u16(reader)?;
        self.is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, byte_order)?;
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };
        debug!("TIFF version {} ({})", version, if self.is_big_tiff { "BigTIFF" } else { "classic" });

        let first_ifd_offset = self.read_offset(reader)?;
        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        info!("Read {} IFDs from TIFF file", tiff.ifds.len());
        Ok(tiff)
    }

    /// Reads an offset-sized value (u32 for TIFF, u64 for BigTIFF)
    fn read_offset(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let byte_order = self.byte_order()?;
        if self.is_big_tiff {
            Ok(byte_order.read_u64(reader)?)
        } else {
            Ok(byte_order.read_u32(reader)? as u64)
        }
    }

    /// Reads a chain of IFDs starting from the given offset
    ///
    /// A broken link ends the chain with a warning; directories read so far
    /// are kept.
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut seen = HashSet::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if !seen.insert(ifd_offset) {
                warn!("IFD chain loops back to offset {}, stopping", ifd_offset);
                break;
            }
            if validation::validate_ifd_offset(ifd_offset, file_size).is_err() {
                warn!("IFD offset {} outside file of {} bytes, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) => {
                    if ifds.is_empty() {
                        return Err(e);
                    }
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };

            // read_ifd leaves the reader positioned at the next-IFD link
            let next = match self.read_offset(reader) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    ifds.push(ifd);
                    break;
                }
            };
            debug!("IFD #{} at {} has {} entries, next at {}", ifd.number, ifd_offset, ifd.entry_count(), next);

            ifds.push(ifd);
            ifd_offset = next;
        }

        Ok(ifds)
    }

    /// Reads an IFD from the reader
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `offset` - Offset in the file where the IFD starts
    /// * `number` - The index of this IFD in the file
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        let byte_order = self.byte_order()?;
        reader.seek(SeekFrom::Start(offset))?;

        let entry_count = if self.is_big_tiff {
            byte_order.read_u64(reader)?
        } else {
            byte_order.read_u16(reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }
        Ok(ifd)
    }

    /// Reads a single IFD entry, keeping the raw value field
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let byte_order = self.byte_order()?;

        let tag = byte_order.read_u16(reader)?;
        let field_type = byte_order.read_u16(reader)?;
        let count = if self.is_big_tiff {
            byte_order.read_u64(reader)?
        } else {
            byte_order.read_u32(reader)? as u64
        };

        let mut raw_value = vec![0u8; if self.is_big_tiff { 8 } else { 4 }];
        reader.read_exact(&mut raw_value)?;
        let value_offset = if self.is_big_tiff {
            byte_order.read_u64(&mut &raw_value[..])?
        } else {
            byte_order.u32_from(&raw_value) as u64
        };

        Ok(IFDEntry::new(tag, field_type, count, raw_value, value_offset))
    }

    /// Reads a tag's values as a vector of u64
    ///
    /// Inline values are decoded from the entry; others are read from the
    /// file at the entry's offset.
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `ifd` - The IFD containing the tag
    /// * `tag` - The tag number to read
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let byte_order = self.byte_order()?;
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;

        if let Some(values) = entry.inline_values(byte_order) {
            return Ok(values);
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            let value = match entry.field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => {
                    let mut byte = [0u8; 1];
                    reader.read_exact(&mut byte)?;
                    byte[0] as u64
                }
                field_types::SHORT | field_types::SSHORT => byte_order.read_u16(reader)? as u64,
                field_types::LONG | field_types::SLONG | field_types::FLOAT => byte_order.read_u32(reader)? as u64,
                field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => byte_order.read_u64(reader)?,
                other => return Err(TiffError::UnsupportedFieldType(other)),
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Reads an ASCII tag, trimming trailing NULs
    ///
    /// Returns None when the tag is absent.
    pub fn read_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Option<String>> {
        let entry = match ifd.get_entry(tag) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if entry.field_type != field_types::ASCII && entry.field_type != field_types::UNDEFINED {
            return Err(TiffError::UnsupportedFieldType(entry.field_type));
        }

        let mut buffer = if entry.is_value_inline() {
            entry.raw_value[..entry.count as usize].to_vec()
        } else {
            reader.seek(SeekFrom::Start(entry.value_offset))?;
            let mut buffer = vec![0u8; entry.count as usize];
            reader.read_exact(&mut buffer)?;
            buffer
        };

        while buffer.last() == Some(&0) {
            buffer.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }
}
