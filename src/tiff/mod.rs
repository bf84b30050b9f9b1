//! TIFF container module
//!
//! This module provides structures and functions for reading the directory
//! structure of TIFF and BigTIFF files and for writing multi-page stacks.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod writer;
pub mod constants;
pub(crate) mod validation;
#[cfg(test)]
mod tests;

pub use crate::io::byte_order::ByteOrder;
pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
pub use writer::{PageLayout, TiffWriter};
