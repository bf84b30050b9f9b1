//! TIFF validation utilities
//!
//! Bounds checks applied while walking a container, so malformed files
//! surface as errors instead of runaway seeks.

use log::{debug, error, warn};
use std::io::SeekFrom;

use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Validates an IFD offset to ensure it's within reasonable bounds
///
/// # Arguments
/// * `offset` - The offset to validate
/// * `file_size` - The file size for validation
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < header::TIFF_HEADER_SIZE {
        return Err(TiffError::InvalidIfdOffset { offset, file_size });
    }
    Ok(())
}

/// Gets the file size for validation purposes
///
/// The reader position is restored afterwards. Returns u64::MAX if the
/// size cannot be determined.
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;
    Ok(file_size)
}

/// Validates the BigTIFF header fields following the version number
///
/// BigTIFF stores the offset size (always 8) and a reserved zero after
/// the version.
pub fn validate_bigtiff_header(reader: &mut dyn SeekableReader, byte_order: ByteOrder) -> TiffResult<()> {
    let offset_size = byte_order.read_u16(reader)?;
    let zeros = byte_order.read_u16(reader)?;

    debug!("BigTIFF offset size: {}, reserved: {}", offset_size, zeros);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTiffHeader(offset_size));
    }

    Ok(())
}

/// Checks that a block of data lies entirely within the file
pub fn validate_data_range(offset: u64, len: u64, file_size: u64) -> TiffResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::GenericError(format!(
            "Data block at {} (+{} bytes) exceeds file size {}",
            offset, len, file_size
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifd_offset_bounds() {
        assert!(validate_ifd_offset(8, 100).is_ok());
        assert!(validate_ifd_offset(4, 100).is_err());
        assert!(validate_ifd_offset(100, 100).is_err());
    }

    #[test]
    fn test_data_range() {
        assert!(validate_data_range(10, 90, 100).is_ok());
        assert!(validate_data_range(10, 91, 100).is_err());
        assert!(validate_data_range(u64::MAX, 2, 100).is_err());
    }
}
