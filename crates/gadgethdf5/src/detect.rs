//! Cheap detection of HDF5 files on disk.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use gadgethdf5_format::signature::{candidate_offsets, HDF5_SIGNATURE};
use tracing::trace;

/// True when `path` is a readable file carrying the HDF5 signature at one of
/// the offsets a superblock may start at.
///
/// Only the candidate offsets are read. Any I/O failure (missing file,
/// directory, permission denied, short read) counts as "not HDF5".
pub fn is_hdf5<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    match scan(path) {
        Ok(found) => found,
        Err(e) => {
            trace!(path = %path.display(), error = %e, "signature check failed");
            false
        }
    }
}

fn scan(path: &Path) -> io::Result<bool> {
    let mut file = fs::File::open(path)?;
    let len = file.metadata()?.len();
    let mut magic = [0u8; 8];
    for offset in candidate_offsets(len) {
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut magic)?;
        if magic == HDF5_SIGNATURE {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_at_start_and_after_user_block() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.hdf5");
        fs::write(&plain, HDF5_SIGNATURE).unwrap();
        assert!(is_hdf5(&plain));

        let mut shifted = vec![0u8; 512];
        shifted.extend_from_slice(&HDF5_SIGNATURE);
        let ub = dir.path().join("userblock.hdf5");
        fs::write(&ub, shifted).unwrap();
        assert!(is_hdf5(&ub));
    }

    #[test]
    fn rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        fs::write(&text, "Gadget snapshot notes\n").unwrap();
        assert!(!is_hdf5(&text));

        let empty = dir.path().join("empty");
        fs::write(&empty, b"").unwrap();
        assert!(!is_hdf5(&empty));
    }

    #[test]
    fn missing_path_and_directory_are_not_hdf5() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_hdf5(dir.path().join("snap_000")));
        assert!(!is_hdf5(dir.path()));
    }
}
