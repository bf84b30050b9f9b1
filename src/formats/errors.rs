//! Error types for single-file readers

use std::io;
use thiserror::Error;

use crate::tiff::errors::TiffError;

/// Errors raised while detecting, opening or reading one file
#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Tiff(#[from] TiffError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No registered format recognizes the file
    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    /// Malformed `.fake` file name
    #[error("Invalid fake file name {name}: {reason}")]
    InvalidFakeName { name: String, reason: String },

    /// Operation needs an open file
    #[error("No file is open")]
    NotOpen,

    #[error("Series {series} out of range (series count {count})")]
    SeriesOutOfRange { series: usize, count: usize },

    #[error("Plane {plane} out of range (image count {count})")]
    PlaneOutOfRange { plane: usize, count: usize },

    #[error("Region {region} outside {size_x}x{size_y} plane")]
    RegionOutOfBounds { region: String, size_x: usize, size_y: usize },

    #[error("Unsupported pixel type: {0}")]
    UnsupportedPixelType(String),

    #[error("Invalid dimension order: {0}")]
    InvalidDimensionOrder(String),

    /// Metadata that violates the 5-D model
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
}

/// Result type for reader operations
pub type FormatResult<T> = Result<T, FormatError>;
