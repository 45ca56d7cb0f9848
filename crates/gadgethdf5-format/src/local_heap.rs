//! Local heap (`HEAP`) holding the link names of old-style groups.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use crate::error::FormatError;
use crate::util::{ensure_len, read_sized, to_index};

/// Parsed local heap header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeap {
    /// Size of the data segment in bytes.
    pub data_segment_size: u64,
    /// Address of the data segment.
    pub data_segment_address: u64,
}

impl LocalHeap {
    /// Parse the heap header at `offset`.
    pub fn parse(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<LocalHeap, FormatError> {
        ensure_len(data, offset, 8)?;
        if &data[offset..offset + 4] != b"HEAP" {
            return Err(FormatError::InvalidLocalHeapSignature);
        }
        if data[offset + 4] != 0 {
            return Err(FormatError::InvalidLocalHeapVersion(data[offset + 4]));
        }
        let ls = length_size as usize;
        let data_segment_size = read_sized(data, offset + 8, length_size)?;
        // free-list head offset follows the size
        let data_segment_address = read_sized(data, offset + 8 + 2 * ls, offset_size)?;
        Ok(LocalHeap {
            data_segment_size,
            data_segment_address,
        })
    }

    /// Read the NUL-terminated string at `offset` within the data segment.
    pub fn string_at(&self, data: &[u8], offset: u64) -> Result<String, FormatError> {
        if offset >= self.data_segment_size {
            return Err(FormatError::UnexpectedEof {
                expected: to_index(offset)?,
                available: to_index(self.data_segment_size)?,
            });
        }
        let start = to_index(self.data_segment_address)? + to_index(offset)?;
        let end = to_index(self.data_segment_address)? + to_index(self.data_segment_size)?;
        ensure_len(data, start, end - start)?;
        let segment = &data[start..end];
        let len = segment.iter().position(|&b| b == 0).unwrap_or(segment.len());
        Ok(String::from_utf8_lossy(&segment[..len]).into_owned())
    }
}
