//! Seekable reader trait
//!
//! Readers handed out by a [`FileSystem`](crate::io::FileSystem) must support
//! both reading and seeking, and must be movable across threads so that a
//! stitched reader can be handed to a worker.

use std::io::{Read, Seek};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
