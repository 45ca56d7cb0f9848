//! Link Info message (type 0x0002) of new-style groups.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::error::FormatError;
use crate::util::{ensure_len, is_undefined, read_sized, read_u64};

/// Parsed Link Info message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    /// Link creation order is tracked.
    pub creation_order_tracked: bool,
    /// Link creation order is indexed by a B-tree.
    pub creation_order_indexed: bool,
    /// Highest creation index handed out so far.
    pub max_creation_index: Option<u64>,
    /// Fractal heap holding dense link messages.
    pub fractal_heap_address: Option<u64>,
    /// B-tree v2 indexing dense links by name hash.
    pub name_index_address: Option<u64>,
    /// B-tree v2 indexing dense links by creation order.
    pub order_index_address: Option<u64>,
}

impl LinkInfo {
    /// Parse from raw message bytes.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkInfo, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 0 {
            return Err(FormatError::InvalidLinkInfoVersion(data[0]));
        }
        let flags = data[1];
        let tracked = flags & 0x01 != 0;
        let indexed = flags & 0x02 != 0;
        let mut pos = 2;
        let max_creation_index = if tracked {
            pos += 8;
            Some(read_u64(data, 2)?)
        } else {
            None
        };

        let os = offset_size as usize;
        let fractal_heap = read_sized(data, pos, offset_size)?;
        let name_index = read_sized(data, pos + os, offset_size)?;
        let order_index = if indexed {
            Some(read_sized(data, pos + 2 * os, offset_size)?)
        } else {
            None
        };
        let defined = |a: u64| (!is_undefined(a, offset_size)).then_some(a);

        Ok(LinkInfo {
            creation_order_tracked: tracked,
            creation_order_indexed: indexed,
            max_creation_index,
            fractal_heap_address: defined(fractal_heap),
            name_index_address: defined(name_index),
            order_index_address: order_index.and_then(defined),
        })
    }

    /// Encode a link info message for a compact group without creation order.
    pub fn serialize_compact(offset_size: u8) -> Vec<u8> {
        let mut out = vec![0u8, 0];
        out.resize(2 + 2 * offset_size as usize, 0xFF);
        out
    }
}
