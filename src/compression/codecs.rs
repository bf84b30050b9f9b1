//! Codecs for TIFF strips and tiles

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;

use super::handler::CompressionHandler;
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};

/// Zstandard level used when none is given
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// The compression schemes planes can be stored with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Uncompressed,
    /// Adobe Deflate (zlib stream)
    Deflate,
    /// Zstandard at the given level (1-22)
    Zstd { level: i32 },
}

impl Codec {
    /// Codec of a TIFF compression code; legacy deflate and zstd codes included
    pub fn from_code(code: u64) -> Option<Codec> {
        match code {
            compression::NONE => Some(Codec::Uncompressed),
            compression::DEFLATE | compression::DEFLATE_OLD => Some(Codec::Deflate),
            compression::ZSTD | compression::ZSTD_OLD => Some(Codec::zstd(DEFAULT_ZSTD_LEVEL)),
            _ => None,
        }
    }

    /// Codec named on the command line (`none`, `deflate`/`zip`, `zstd`)
    pub fn from_name(name: &str) -> Option<Codec> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" => Some(Codec::Uncompressed),
            "deflate" | "zip" | "adobe deflate" => Some(Codec::Deflate),
            "zstd" => Some(Codec::zstd(DEFAULT_ZSTD_LEVEL)),
            _ => None,
        }
    }

    pub fn zstd(level: i32) -> Codec {
        Codec::Zstd { level: level.clamp(1, 22) }
    }
}

impl CompressionHandler for Codec {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        match self {
            Codec::Uncompressed => Ok(data.to_vec()),
            Codec::Deflate => {
                let mut decoded = Vec::new();
                ZlibDecoder::new(data).read_to_end(&mut decoded)?;
                Ok(decoded)
            }
            Codec::Zstd { .. } => {
                if data.is_empty() {
                    return Ok(Vec::new());
                }
                let decoded = zstd::decode_all(data)
                    .map_err(|e| TiffError::GenericError(format!("ZSTD decompression error: {}", e)))?;
                debug!("ZSTD decompressed {} bytes to {}", data.len(), decoded.len());
                Ok(decoded)
            }
        }
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        match self {
            Codec::Uncompressed => Ok(data.to_vec()),
            Codec::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Codec::Zstd { level } => {
                if data.is_empty() {
                    return Ok(Vec::new());
                }
                zstd::encode_all(data, *level)
                    .map_err(|e| TiffError::GenericError(format!("ZSTD compression error: {}", e)))
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Codec::Uncompressed => "Uncompressed",
            Codec::Deflate => "Adobe Deflate",
            Codec::Zstd { .. } => "ZSTD",
        }
    }

    fn code(&self) -> u64 {
        match self {
            Codec::Uncompressed => compression::NONE,
            Codec::Deflate => compression::DEFLATE,
            Codec::Zstd { .. } => compression::ZSTD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_level_is_clamped() {
        assert_eq!(Codec::zstd(0), Codec::Zstd { level: 1 });
        assert_eq!(Codec::zstd(40), Codec::Zstd { level: 22 });
    }

    #[test]
    fn test_short_block_is_padded() {
        let packed = Codec::Deflate.compress(&[1, 2, 3]).unwrap();
        assert_eq!(Codec::Deflate.decode_block(&packed, 5).unwrap(), vec![1, 2, 3, 0, 0]);
        assert_eq!(Codec::Uncompressed.decode_block(&[9; 4], 2).unwrap(), vec![9; 4]);
    }

    #[test]
    fn test_corrupt_deflate_is_an_error() {
        assert!(Codec::Deflate.decompress(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
