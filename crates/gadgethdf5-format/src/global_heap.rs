//! Global heap collections (`GCOL`), where variable-length data lives.

use crate::error::FormatError;
use crate::util::{ensure_len, read_sized, read_u16, read_u32, to_index};

/// A reference to one global heap object, as stored in variable-length elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalHeapId {
    /// Address of the collection.
    pub collection: u64,
    /// Object index within the collection.
    pub index: u32,
}

impl GlobalHeapId {
    /// Decode a variable-length element: sequence length, collection address, index.
    /// Returns the sequence length alongside the ID.
    pub fn parse_vlen(element: &[u8], offset_size: u8) -> Result<(u32, GlobalHeapId), FormatError> {
        let len = read_u32(element, 0)?;
        let collection = read_sized(element, 4, offset_size)?;
        let index = read_u32(element, 4 + offset_size as usize)?;
        Ok((len, GlobalHeapId { collection, index }))
    }
}

/// Return the bytes of the referenced object, borrowed from `data`.
pub fn read_object<'a>(
    data: &'a [u8],
    id: GlobalHeapId,
    length_size: u8,
) -> Result<&'a [u8], FormatError> {
    let at = to_index(id.collection)?;
    ensure_len(data, at, 8)?;
    if &data[at..at + 4] != b"GCOL" {
        return Err(FormatError::InvalidGlobalHeapSignature);
    }
    let ls = length_size as usize;
    let collection_size = to_index(read_sized(data, at + 8, length_size)?)?;
    let end = at + collection_size;
    ensure_len(data, at, collection_size)?;

    let mut pos = at + 8 + ls;
    while pos + 8 + ls <= end {
        let index = read_u16(data, pos)?;
        let size = to_index(read_sized(data, pos + 8, length_size)?)?;
        let body = pos + 8 + ls;
        if index == 0 {
            // free space runs to the end of the collection
            break;
        }
        if index as u32 == id.index {
            ensure_len(data, body, size)?;
            return Ok(&data[body..body + size]);
        }
        pos = body + size.div_ceil(8) * 8;
    }
    Err(FormatError::GlobalHeapObjectNotFound(id.index as u64))
}
