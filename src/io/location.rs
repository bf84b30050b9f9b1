//! File-system surface used by readers and the stitcher
//!
//! Everything that touches paths goes through [`FileSystem`]: existence
//! checks, directory listings used to discover sibling files, and opening a
//! file for reading. [`LocalFileSystem`] is backed by `std::fs`;
//! [`MemoryFileSystem`] keeps named buffers in memory, which is how virtual
//! datasets and test fixtures are assembled without touching disk.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor};
use std::path::Path;
use std::sync::{Arc, RwLock};

use log::{debug, trace};

use super::seekable::SeekableReader;

/// Read-only view of a file system
pub trait FileSystem: Send + Sync {
    /// Returns true if the path names an existing file
    fn exists(&self, path: &str) -> bool;

    /// Lists the file names (not full paths) contained in a directory
    fn list_dir(&self, dir: &str) -> io::Result<Vec<String>>;

    /// Opens a file for reading
    fn open(&self, path: &str) -> io::Result<Box<dyn SeekableReader>>;
}

/// Returns the directory part of a path, or "" for bare file names
pub fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns the file name part of a path
pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Joins a directory and a file name the way [`parent_dir`] splits them
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        Path::new(dir).join(name).to_string_lossy().into_owned()
    }
}

/// File system backed by the local disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn list_dir(&self, dir: &str) -> io::Result<Vec<String>> {
        let dir = if dir.is_empty() { "." } else { dir };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        debug!("Listed {} files in {}", names.len(), dir);
        Ok(names)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn SeekableReader>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::with_capacity(1024 * 1024, file)))
    }
}

/// In-memory file system keyed by path
///
/// Cloning shares the underlying map, so a test can keep a handle and
/// remove files after a stitcher has been initialized over it.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<BTreeMap<String, Arc<[u8]>>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file
    pub fn insert(&self, path: &str, data: Vec<u8>) {
        trace!("Memory file system: insert {} ({} bytes)", path, data.len());
        if let Ok(mut files) = self.files.write() {
            files.insert(path.to_string(), Arc::from(data));
        }
    }

    /// Adds an empty file, typically a `.fake` placeholder
    pub fn touch(&self, path: &str) {
        self.insert(path, Vec::new());
    }

    /// Removes a file, returning true if it existed
    pub fn remove(&self, path: &str) -> bool {
        self.files
            .write()
            .map(|mut files| files.remove(path).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|files| files.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &str) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn list_dir(&self, dir: &str) -> io::Result<Vec<String>> {
        let files = self
            .files
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory file system lock poisoned"))?;
        Ok(files
            .keys()
            .filter(|path| parent_dir(path) == dir)
            .map(|path| file_name(path))
            .collect())
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn SeekableReader>> {
        let files = self
            .files
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory file system lock poisoned"))?;
        match files.get(path) {
            Some(data) => Ok(Box::new(Cursor::new(Arc::clone(data)))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found in memory file system", path),
            )),
        }
    }
}
