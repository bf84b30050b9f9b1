//! TIFF writing utilities
//!
//! Helper functions for writing TIFF files, handling word alignment.

use crate::tiff::errors::TiffResult;
use std::io::Write;

/// Calculate padding required to align to 4-byte boundary
pub fn calculate_padding(data_len: usize) -> usize {
    (4 - (data_len % 4)) % 4
}

/// Write padding bytes to align to 4-byte boundary
///
/// After writing a block of data, this function adds the necessary
/// padding bytes so the next write starts on a word boundary.
pub fn write_padding(writer: &mut impl Write, data_len: usize) -> TiffResult<()> {
    let padding = calculate_padding(data_len);
    if padding > 0 {
        writer.write_all(&[0u8; 4][..padding])?;
    }
    Ok(())
}
