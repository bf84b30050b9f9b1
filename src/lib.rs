pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod formats;
pub mod stitch;
pub mod config;
pub mod commands;
pub mod api;

pub use crate::api::StitchKit;

pub use config::StitchConfig;
pub use formats::{CoreMetadata, DimensionOrder, FormatReader, PixelType, Region};
pub use io::location::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use stitch::{AxisType, FilePattern, FileStitcher, StitchError, StitchResult};
pub use tiff::TiffReader;
