//! Data layout message (type 0x0008) and access to a dataset's raw bytes.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::error::FormatError;
use crate::util::{ensure_len, is_undefined, read_sized, read_u16, to_index};

/// Where a dataset keeps its elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// Elements stored inside the message itself.
    Compact {
        /// The raw element bytes.
        data: Vec<u8>,
    },
    /// Elements stored in one block of the file.
    Contiguous {
        /// Address of the block; `None` until data is written.
        address: Option<u64>,
        /// Size of the block in bytes.
        size: u64,
    },
    /// Elements split into chunks behind an index. Only recognised.
    Chunked {
        /// Layout message version.
        version: u8,
    },
    /// Virtual dataset mapping other datasets. Only recognised.
    Virtual,
}

impl DataLayout {
    /// Parse a layout message of version 3 or 4.
    pub fn parse(data: &[u8], offset_size: u8, length_size: u8) -> Result<DataLayout, FormatError> {
        ensure_len(data, 0, 2)?;
        let (version, class) = (data[0], data[1]);
        if !matches!(version, 3 | 4) {
            return Err(FormatError::InvalidLayoutVersion(version));
        }
        match class {
            0 => {
                let size = read_u16(data, 2)? as usize;
                ensure_len(data, 4, size)?;
                Ok(DataLayout::Compact {
                    data: data[4..4 + size].to_vec(),
                })
            }
            1 => {
                let address = read_sized(data, 2, offset_size)?;
                let size = read_sized(data, 2 + offset_size as usize, length_size)?;
                Ok(DataLayout::Contiguous {
                    address: (!is_undefined(address, offset_size)).then_some(address),
                    size,
                })
            }
            2 => Ok(DataLayout::Chunked { version }),
            3 if version == 4 => Ok(DataLayout::Virtual),
            other => Err(FormatError::InvalidLayoutClass(other)),
        }
    }

    /// The raw bytes of a dataset whose dataspace and datatype need
    /// `expected` bytes. An unallocated contiguous block reads as zeros,
    /// the HDF5 default fill value.
    pub fn raw_bytes<'a>(
        &'a self,
        file: &'a [u8],
        expected: usize,
    ) -> Result<RawData<'a>, FormatError> {
        let bytes = match self {
            DataLayout::Compact { data } => data.as_slice(),
            DataLayout::Contiguous { address: None, .. } => {
                return Ok(RawData::Filled(vec![0; expected]))
            }
            DataLayout::Contiguous {
                address: Some(address),
                size,
            } => {
                let at = to_index(*address)?;
                let len = to_index(*size)?;
                ensure_len(file, at, len)?;
                &file[at..at + len]
            }
            DataLayout::Chunked { .. } => {
                return Err(FormatError::LayoutUnsupported("chunked"))
            }
            DataLayout::Virtual => return Err(FormatError::LayoutUnsupported("virtual")),
        };
        if bytes.len() < expected {
            return Err(FormatError::DataSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(RawData::Stored(&bytes[..expected]))
    }
}

/// Dataset bytes, either borrowed from the file or synthesized fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawData<'a> {
    Stored(&'a [u8]),
    Filled(Vec<u8>),
}

impl AsRef<[u8]> for RawData<'_> {
    fn as_ref(&self) -> &[u8] {
        match self {
            RawData::Stored(b) => b,
            RawData::Filled(v) => v,
        }
    }
}
