//! Single-file readers
//!
//! A [`FormatReader`] opens one physical file and exposes its series as
//! 5-D planes. The [`ReaderRegistry`] picks the reader for a file and wraps
//! it in a [`DimensionSwapper`], the stage the stitcher uses to relabel
//! axes and re-index planes.

pub mod core;
pub mod errors;
pub mod reader;
pub mod fake_reader;
pub mod tiff_reader;
pub mod swapper;
pub mod registry;

pub use self::core::{CoreMetadata, DimensionOrder, PixelType, Region};
pub use errors::{FormatError, FormatResult};
pub use fake_reader::FakeReader;
pub use reader::FormatReader;
pub use registry::{FormatKind, ReaderRegistry};
pub use swapper::DimensionSwapper;
pub use tiff_reader::TiffFormatReader;
