//! Attribute Info message (type 0x0015): where dense attributes live.

use crate::error::FormatError;
use crate::util::{ensure_len, is_undefined, read_sized, read_u16};

/// Parsed Attribute Info message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Attribute creation order is tracked.
    pub creation_order_tracked: bool,
    /// Attribute creation order is indexed by a B-tree.
    pub creation_order_indexed: bool,
    /// Highest creation index handed out so far.
    pub max_creation_index: Option<u16>,
    /// Fractal heap holding dense attribute messages.
    pub fractal_heap_address: Option<u64>,
    /// B-tree v2 indexing dense attributes by name.
    pub name_index_address: Option<u64>,
    /// B-tree v2 indexing dense attributes by creation order.
    pub order_index_address: Option<u64>,
}

impl AttributeInfo {
    /// Parse from raw message bytes.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<AttributeInfo, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 0 {
            return Err(FormatError::InvalidAttributeInfoVersion(data[0]));
        }
        let flags = data[1];
        let tracked = flags & 0x01 != 0;
        let indexed = flags & 0x02 != 0;
        let mut pos = 2;
        let max_creation_index = if tracked {
            pos += 2;
            Some(read_u16(data, 2)?)
        } else {
            None
        };
        let os = offset_size as usize;
        let mut addr = || -> Result<Option<u64>, FormatError> {
            let a = read_sized(data, pos, offset_size)?;
            pos += os;
            Ok((!is_undefined(a, offset_size)).then_some(a))
        };
        let fractal_heap_address = addr()?;
        let name_index_address = addr()?;
        let order_index_address = if indexed { addr()? } else { None };

        Ok(AttributeInfo {
            creation_order_tracked: tracked,
            creation_order_indexed: indexed,
            max_creation_index,
            fractal_heap_address,
            name_index_address,
            order_index_address,
        })
    }

    /// True when attributes are stored densely rather than as header messages.
    pub fn is_dense(&self) -> bool {
        self.fractal_heap_address.is_some()
    }
}
