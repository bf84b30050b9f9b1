//! Compression handler trait definition

use log::warn;

use crate::tiff::errors::TiffResult;

/// Strategy trait for the codecs of TIFF strips and tiles
pub trait CompressionHandler: Send + Sync {
    /// Decompress one block
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Compress one block
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the TIFF compression code written for this method
    fn code(&self) -> u64;

    /// Decompresses a block that should hold `expected` bytes
    ///
    /// Short blocks are zero-padded; extra trailing bytes are kept.
    fn decode_block(&self, data: &[u8], expected: usize) -> TiffResult<Vec<u8>> {
        let mut decoded = self.decompress(data)?;
        if decoded.len() < expected {
            warn!("{} block is short: {} of {} bytes", self.name(), decoded.len(), expected);
            decoded.resize(expected, 0);
        }
        Ok(decoded)
    }
}
