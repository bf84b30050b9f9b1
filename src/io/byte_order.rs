//! Byte order handling for TIFF files
//!
//! TIFF containers announce their byte order in the first two bytes of the
//! header. Every multi-byte value read from or written to the container goes
//! through the [`ByteOrder`] selected there.

use byteorder::ByteOrder as _;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Result, Write};

use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Represents the byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the TIFF header
    pub fn detect<R: Read + ?Sized>(reader: &mut R) -> TiffResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        Self::from_marker(marker)
    }

    /// Maps the raw header marker (read little-endian) to a byte order
    pub fn from_marker(marker: u16) -> TiffResult<Self> {
        match marker.to_le_bytes() {
            header::LITTLE_ENDIAN_MARKER => Ok(ByteOrder::LittleEndian),
            header::BIG_ENDIAN_MARKER => Ok(ByteOrder::BigEndian),
            _ => Err(TiffError::InvalidByteOrder(marker)),
        }
    }

    /// The two marker bytes written at the start of a TIFF header
    pub fn marker(&self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => header::LITTLE_ENDIAN_MARKER,
            ByteOrder::BigEndian => header::BIG_ENDIAN_MARKER,
        }
    }

    /// Returns a string representation of this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    pub fn is_little_endian(&self) -> bool {
        matches!(self, ByteOrder::LittleEndian)
    }

    pub fn read_u16<R: Read + ?Sized>(&self, reader: &mut R) -> Result<u16> {
        match self {
            ByteOrder::LittleEndian => reader.read_u16::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_u16::<BigEndian>(),
        }
    }

    pub fn read_u32<R: Read + ?Sized>(&self, reader: &mut R) -> Result<u32> {
        match self {
            ByteOrder::LittleEndian => reader.read_u32::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_u32::<BigEndian>(),
        }
    }

    pub fn read_u64<R: Read + ?Sized>(&self, reader: &mut R) -> Result<u64> {
        match self {
            ByteOrder::LittleEndian => reader.read_u64::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_u64::<BigEndian>(),
        }
    }

    pub fn write_u16<W: Write + ?Sized>(&self, writer: &mut W, value: u16) -> Result<()> {
        match self {
            ByteOrder::LittleEndian => writer.write_u16::<LittleEndian>(value),
            ByteOrder::BigEndian => writer.write_u16::<BigEndian>(value),
        }
    }

    pub fn write_u32<W: Write + ?Sized>(&self, writer: &mut W, value: u32) -> Result<()> {
        match self {
            ByteOrder::LittleEndian => writer.write_u32::<LittleEndian>(value),
            ByteOrder::BigEndian => writer.write_u32::<BigEndian>(value),
        }
    }

    /// Decodes a u16 from the first two bytes of a buffer
    pub fn u16_from(&self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => LittleEndian::read_u16(bytes),
            ByteOrder::BigEndian => BigEndian::read_u16(bytes),
        }
    }

    /// Encodes a u16 into the first two bytes of a buffer
    pub fn u16_into(&self, bytes: &mut [u8], value: u16) {
        match self {
            ByteOrder::LittleEndian => LittleEndian::write_u16(bytes, value),
            ByteOrder::BigEndian => BigEndian::write_u16(bytes, value),
        }
    }

    /// Decodes a u32 from the first four bytes of a buffer
    pub fn u32_from(&self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => LittleEndian::read_u32(bytes),
            ByteOrder::BigEndian => BigEndian::read_u32(bytes),
        }
    }

    /// Encodes a u32 into the first four bytes of a buffer
    pub fn u32_into(&self, bytes: &mut [u8], value: u32) {
        match self {
            ByteOrder::LittleEndian => LittleEndian::write_u32(bytes, value),
            ByteOrder::BigEndian => BigEndian::write_u32(bytes, value),
        }
    }
}
