//! Errors for the high-level API.

use std::path::PathBuf;

use gadgethdf5_format::error::FormatError;
use thiserror::Error;

/// Failures of the high-level API.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening or reading a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes do not decode as HDF5.
    #[error("HDF5 format error: {0}")]
    Format(#[from] FormatError),

    /// Neither the given path nor its `.0.hdf5` sibling is an HDF5 file.
    #[error(
        "neither {} nor {} is an HDF5 file",
        original.display(),
        fallback.display()
    )]
    SnapshotNotFound {
        /// The path as given.
        original: PathBuf,
        /// The first-file-of-a-set name derived from it.
        fallback: PathBuf,
    },

    /// No member of that name, or the path runs through a missing group.
    #[error("group not found: {0}")]
    MissingGroup(String),

    /// The object has no attribute of that name.
    #[error("attribute not found: {0}")]
    MissingAttribute(String),

    /// An attribute exists but cannot be read as the expected shape or type.
    #[error("attribute {name} has the wrong shape: {reason}")]
    BadAttributeShape {
        /// Attribute name.
        name: String,
        /// What was expected.
        reason: String,
    },

    /// The member exists but is a dataset or link, not a group.
    #[error("not a group: {0}")]
    NotAGroup(String),

    /// The group has no member of that name.
    #[error("dataset not found: {0}")]
    MissingDataset(String),

    /// The member exists but is not a dataset.
    #[error("not a dataset: {0}")]
    NotADataset(String),

    /// A row range reaches past the end of a dataset.
    #[error("rows {start}..{start}+{count} are outside {path}, which has {rows}")]
    RowsOutOfRange {
        /// Dataset path.
        path: String,
        /// First row asked for.
        start: u64,
        /// Rows asked for.
        count: u64,
        /// Rows stored.
        rows: u64,
    },

    /// A block's value count does not match its particle count.
    #[error("block {name} holds {found} values, expected {expected}")]
    BlockSize {
        /// Block name.
        name: String,
        /// Particles times components.
        expected: usize,
        /// Values supplied.
        found: usize,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_both_paths() {
        let e = Error::SnapshotNotFound {
            original: "snap_005".into(),
            fallback: "snap_005.0.hdf5".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("snap_005 "));
        assert!(msg.contains("snap_005.0.hdf5"));
    }

    #[test]
    fn format_errors_convert() {
        let e: Error = FormatError::SignatureNotFound.into();
        assert!(matches!(e, Error::Format(FormatError::SignatureNotFound)));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn row_range_message() {
        let e = Error::RowsOutOfRange {
            path: "PartType1/Masses".into(),
            start: 4,
            count: 2,
            rows: 5,
        };
        assert_eq!(
            e.to_string(),
            "rows 4..4+2 are outside PartType1/Masses, which has 5"
        );
    }
}
