//! Data source abstraction for local DBF files.
//!
//! Opens files as seekable streams with threshold-based I/O selection:
//! - Files below [`MMAP_THRESHOLD`]: `BufReader<File>`
//! - Files at or above it: memory-mapped, so many split scanners of one
//!   large file share the page cache instead of each buffering reads

use crate::error::Result;
use crate::io::dbf::DbfHeader;
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Memory-mapped file threshold (50 MB)
pub const MMAP_THRESHOLD: u64 = 50 * 1024 * 1024;

/// A readable, seekable stream.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// A local DBF file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Local file path
    Local(PathBuf),
}

impl DataSource {
    /// Create a local file data source
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        DataSource::Local(path.as_ref().to_path_buf())
    }

    pub fn path(&self) -> &Path {
        match self {
            DataSource::Local(path) => path,
        }
    }

    /// Current file length in bytes.
    pub fn len(&self) -> Result<u64> {
        Ok(fs::metadata(self.path())?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Open the source as a seekable stream positioned at byte 0.
    pub fn open(&self) -> Result<Box<dyn ReadSeek + Send>> {
        match self {
            DataSource::Local(path) => open_local_file(path),
        }
    }

    /// Decode just the header, closing the file before returning.
    pub fn read_header(&self) -> Result<DbfHeader> {
        let mut reader = self.open()?;
        DbfHeader::read(&mut reader)
    }
}

fn open_local_file(path: &Path) -> Result<Box<dyn ReadSeek + Send>> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();

    if file_size >= MMAP_THRESHOLD {
        debug!(path = %path.display(), size = file_size, "memory-mapping file");
        // SAFETY: the map is read-only; a file truncated underneath us is the
        // same hazard every mmap-based reader accepts.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Box::new(Cursor::new(mmap)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// True if the file name ends in `.dbf`, ignoring case.
pub fn is_dbf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dbf"))
}

/// Expand a path into the DBF files to process.
///
/// A file is returned as-is. A directory yields its regular `.dbf` files
/// (case-insensitive, not recursive), sorted by path.
pub fn discover<P: AsRef<Path>>(path: P) -> Result<Vec<DataSource>> {
    let path = path.as_ref();
    if !fs::metadata(path)?.is_dir() {
        return Ok(vec![DataSource::from_path(path)]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry.file_type()?.is_file() && is_dbf_path(&entry_path) {
            files.push(entry_path);
        }
    }
    files.sort();
    debug!(dir = %path.display(), files = files.len(), "discovered DBF files");
    Ok(files.into_iter().map(DataSource::Local).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mmap_threshold_constant() {
        assert_eq!(MMAP_THRESHOLD, 50 * 1024 * 1024);
    }

    #[test]
    fn test_is_dbf_path() {
        assert!(is_dbf_path(Path::new("a/b/roads.dbf")));
        assert!(is_dbf_path(Path::new("ROADS.DBF")));
        assert!(!is_dbf_path(Path::new("roads.shp")));
        assert!(!is_dbf_path(Path::new("dbf")));
    }

    #[test]
    fn test_discover_directory() {
        let dir = tempdir().unwrap();
        for name in ["b.dbf", "A.DBF", "c.shp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.dbf")).unwrap();

        let found = discover(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|s| s.path().file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["A.DBF", "b.dbf"]);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("data.bin");
        fs::write(&file, b"x").unwrap();
        assert_eq!(discover(&file).unwrap(), vec![DataSource::from_path(&file)]);
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let dir = tempdir().unwrap();
        let err = discover(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, crate::DbfError::Io(_)));
    }
}
