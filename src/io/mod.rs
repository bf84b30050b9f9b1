//! I/O utilities for file handling
//!
//! This module provides the byte order strategies used by the TIFF layer,
//! the seekable reader abstraction, and the file-system surface the
//! stitcher uses to list sibling files.

pub mod seekable;
pub mod byte_order;
pub mod location;

pub use byte_order::ByteOrder;
pub use location::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use seekable::SeekableReader;
