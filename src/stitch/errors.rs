//! Error types for file stitching

use std::io;

use thiserror::Error;

use crate::formats::errors::FormatError;
use crate::tiff::errors::TiffError;

/// Errors raised while grouping files and reading stitched planes
#[derive(Debug, Error)]
pub enum StitchError {
    /// The pattern cannot reproduce the file list it describes
    #[error("Invalid file pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Nothing on disk matches the seed
    #[error("No files matching {0}")]
    NoMatchingFiles(String),

    /// Files that each contain several series cannot also be grouped
    #[error("Unsupported grouping: {files} files each containing {series} series; rename the files or disable grouping")]
    UnsupportedGrouping { files: usize, series: usize },

    /// A pattern block could not be assigned to an axis
    #[error("Unknown axis type for block #{index}")]
    UnknownAxis { index: usize },

    /// A file of the pattern does not exist
    #[error("File #{index} ({path}) does not exist")]
    FileNotFound { index: usize, path: String },

    #[error("Stitcher is not initialized")]
    NotInitialized,

    #[error("Series {series} out of range (series count {count})")]
    SeriesOutOfRange { series: usize, count: usize },

    #[error("Plane {plane} out of range (image count {count})")]
    PlaneOutOfRange { plane: usize, count: usize },

    #[error("Region {region} outside {size_x}x{size_y} plane")]
    RegionOutOfBounds { region: String, size_x: usize, size_y: usize },

    /// Axis types supplied for a pattern with a different block count
    #[error("Expected {expected} axis types, got {actual}")]
    AxisCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing planes out failed
    #[error("Export failed: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<TiffError> for StitchError {
    fn from(err: TiffError) -> Self {
        StitchError::Format(FormatError::Tiff(err))
    }
}

impl StitchError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        StitchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for stitching operations
pub type StitchResult<T> = Result<T, StitchError>;
