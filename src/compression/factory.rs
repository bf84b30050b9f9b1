//! Factory for creating compression handlers

use super::codecs::{Codec, DEFAULT_ZSTD_LEVEL};
use super::handler::CompressionHandler;
use crate::tiff::errors::{TiffError, TiffResult};

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given TIFF compression code
    ///
    /// Legacy codes (32946 for deflate, 50000 for zstd) map to the same
    /// handlers as their standard counterparts.
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        let codec = Codec::from_code(code).ok_or(TiffError::UnsupportedCompression(code))?;
        Ok(Box::new(codec))
    }

    /// Get a handler by name
    pub fn get_handler_by_name(name: &str) -> TiffResult<Box<dyn CompressionHandler>> {
        let codec = Codec::from_name(name)
            .ok_or_else(|| TiffError::GenericError(format!("Unknown compression type: {}", name)))?;
        Ok(Box::new(codec))
    }

    /// Get all available compression handlers
    pub fn get_available_handlers() -> Vec<Box<dyn CompressionHandler>> {
        vec![
            Box::new(Codec::Uncompressed),
            Box::new(Codec::Deflate),
            Box::new(Codec::zstd(DEFAULT_ZSTD_LEVEL)),
        ]
    }
}
