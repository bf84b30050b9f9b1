//! Error types for TIFF container parsing

use std::io;
use thiserror::Error;

/// TIFF-specific error types
#[derive(Debug, Error)]
pub enum TiffError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Invalid byte order marker
    #[error("Invalid byte order marker: {0:#06x}")]
    InvalidByteOrder(u16),

    /// Invalid BigTIFF header
    #[error("Invalid BigTIFF header: offset size {0}, expected 8")]
    InvalidBigTiffHeader(u16),

    /// Unsupported TIFF version
    #[error("Unsupported TIFF version: {0}")]
    UnsupportedVersion(u16),

    /// IFD offset outside the file
    #[error("Invalid IFD offset {offset} (file size {file_size})")]
    InvalidIfdOffset { offset: u64, file_size: u64 },

    /// Tag not found
    #[error("Tag not found: {0}")]
    TagNotFound(u16),

    /// Unsupported field type
    #[error("Unsupported field type: {0}")]
    UnsupportedFieldType(u16),

    /// Unsupported compression method
    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u64),

    /// Pixel layout this reader cannot decode
    #[error("Unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// Image dimensions not found
    #[error("Image dimensions not found")]
    MissingDimensions,

    /// The file contains no image directories
    #[error("TIFF file contains no images")]
    NoImages,

    /// Generic error with message
    #[error("TIFF error: {0}")]
    GenericError(String),
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;
