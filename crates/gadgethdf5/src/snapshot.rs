//! Locating snapshot files on disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::detect::is_hdf5;

/// Suffix of the first file of a multi-file snapshot set.
pub const FIRST_FILE_SUFFIX: &str = ".0.hdf5";

/// The first file of the snapshot set whose base name is `path`.
pub fn first_file_of(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(FIRST_FILE_SUFFIX);
    PathBuf::from(name)
}

/// File `index` of the snapshot set whose base name is `path`.
pub fn nth_file_of(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}.hdf5"));
    PathBuf::from(name)
}

/// The base name of a set, when `path` names its first file.
pub fn set_base_of(path: &Path) -> Option<PathBuf> {
    let name = path.to_str()?;
    name.strip_suffix(FIRST_FILE_SUFFIX)
        .filter(|base| !base.is_empty())
        .map(PathBuf::from)
}

/// Pick the file to open for `path`: `path` itself when it is an HDF5
/// file, else `<path>.0.hdf5` when that is. Nothing is created.
pub fn resolve_snapshot_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let original = path.as_ref();
    if is_hdf5(original) {
        debug!(path = %original.display(), "using snapshot path as given");
        return Ok(original.to_path_buf());
    }
    let fallback = first_file_of(original);
    if is_hdf5(&fallback) {
        debug!(path = %fallback.display(), "using first file of snapshot set");
        return Ok(fallback);
    }
    Err(Error::SnapshotNotFound {
        original: original.to_path_buf(),
        fallback,
    })
}
