//! Compression handling for TIFF planes
//!
//! This module implements strategies for the compression schemes the TIFF
//! plane decoder and the export writer understand.

mod handler;
mod codecs;
mod factory;

pub use codecs::Codec;
pub use factory::CompressionFactory;
pub use handler::CompressionHandler;
