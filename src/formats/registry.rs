//! Format detection and reader construction
//!
//! The registry is a closed table: every supported [`FormatKind`] has one
//! entry pairing a detection predicate with a constructor. Detection runs
//! once per dataset; every file of a family is then opened with the reader
//! kind detected for its first file.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use log::{debug, trace};

use crate::formats::errors::{FormatError, FormatResult};
use crate::formats::fake_reader::{self, FakeReader};
use crate::formats::reader::FormatReader;
use crate::formats::swapper::DimensionSwapper;
use crate::formats::tiff_reader::TiffFormatReader;
use crate::io::location::FileSystem;
use crate::tiff::reader::TiffReader;

/// Number of leading bytes handed to detection predicates
const HEADER_PROBE_LEN: usize = 16;

/// Reader kinds known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Tiff,
    Fake,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Tiff => write!(f, "TIFF"),
            FormatKind::Fake => write!(f, "fake"),
        }
    }
}

/// Detection predicate over the path and the first bytes of the file
type DetectFn = fn(&str, &[u8]) -> bool;

/// Constructor for a reader kind
type ConstructFn = fn(Arc<dyn FileSystem>) -> Box<dyn FormatReader>;

struct FormatEntry {
    kind: FormatKind,
    detect: DetectFn,
    construct: ConstructFn,
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn detect_fake(path: &str, _header: &[u8]) -> bool {
    fake_reader::is_fake(path)
}

fn detect_tiff(path: &str, header: &[u8]) -> bool {
    TiffReader::has_signature(header) || (header.is_empty() && has_extension(path, &["tif", "tiff", "btf"]))
}

fn construct_fake(_fs: Arc<dyn FileSystem>) -> Box<dyn FormatReader> {
    Box::new(FakeReader::new())
}

fn construct_tiff(fs: Arc<dyn FileSystem>) -> Box<dyn FormatReader> {
    Box::new(TiffFormatReader::new(fs))
}

/// Maps files to the reader able to open them
pub struct ReaderRegistry {
    fs: Arc<dyn FileSystem>,
    entries: Vec<FormatEntry>,
}

impl ReaderRegistry {
    /// Creates a registry with every built-in format
    ///
    /// Entries are tried in order; the fake reader comes first because it
    /// is recognized from the name alone.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        ReaderRegistry {
            fs,
            entries: vec![
                FormatEntry { kind: FormatKind::Fake, detect: detect_fake, construct: construct_fake },
                FormatEntry { kind: FormatKind::Tiff, detect: detect_tiff, construct: construct_tiff },
            ],
        }
    }

    /// The file system readers are opened through
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Reader kinds in detection order
    pub fn kinds(&self) -> Vec<FormatKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }

    /// Reads the first bytes of a file, or nothing if it cannot be opened
    fn probe(&self, path: &str) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_PROBE_LEN);
        match self.fs.open(path) {
            Ok(handle) => {
                if let Err(e) = handle.take(HEADER_PROBE_LEN as u64).read_to_end(&mut header) {
                    trace!("Could not probe {}: {}", path, e);
                    header.clear();
                }
            }
            Err(e) => trace!("Could not open {} for probing: {}", path, e),
        }
        header
    }

    /// Determines the reader kind for a file
    ///
    /// # Arguments
    /// * `path` - Path of the file to identify
    ///
    /// # Returns
    /// The first kind whose predicate accepts the file, or `UnknownFormat`
    pub fn detect(&self, path: &str) -> FormatResult<FormatKind> {
        let header = if fake_reader::is_fake(path) { Vec::new() } else { self.probe(path) };
        let kind = self
            .entries
            .iter()
            .find(|entry| (entry.detect)(path, &header))
            .map(|entry| entry.kind)
            .ok_or_else(|| FormatError::UnknownFormat(path.to_string()))?;
        debug!("Detected {} format for {}", kind, path);
        Ok(kind)
    }

    /// Creates an unopened reader of the given kind, wrapped in a dimension stage
    pub fn create(&self, kind: FormatKind) -> DimensionSwapper {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.construct)
            .unwrap_or(construct_tiff);
        DimensionSwapper::new(entry(Arc::clone(&self.fs)))
    }

    /// Detects the format of a file and opens it
    pub fn open(&self, path: &str) -> FormatResult<(FormatKind, DimensionSwapper)> {
        let kind = self.detect(path)?;
        let mut reader = self.create(kind);
        reader.set_id(path)?;
        Ok((kind, reader))
    }
}
