//! Symbol table message (type 0x0011) and symbol table nodes (`SNOD`).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::FormatError;
use crate::util::{ensure_len, read_sized, read_u16, read_u32, to_index};

/// Symbol table message of an old-style group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTable {
    /// Group B-tree (v1, node type 0).
    pub btree_address: u64,
    /// Local heap holding the link names.
    pub local_heap_address: u64,
}

impl SymbolTable {
    /// Parse from raw message bytes.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<SymbolTable, FormatError> {
        Ok(SymbolTable {
            btree_address: read_sized(data, 0, offset_size)?,
            local_heap_address: read_sized(data, offset_size as usize, offset_size)?,
        })
    }
}

/// One entry of a symbol table node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Offset of the name in the group's local heap.
    pub name_offset: u64,
    /// Object header address of the child.
    pub object_header_address: u64,
    /// Scratch-pad cache type: 0 none, 1 group, 2 soft link.
    pub cache_type: u32,
}

/// Parse the entries of the symbol table node at `offset`.
pub fn parse_symbol_node(
    data: &[u8],
    offset: u64,
    offset_size: u8,
) -> Result<Vec<SymbolEntry>, FormatError> {
    let at = to_index(offset)?;
    ensure_len(data, at, 8)?;
    if &data[at..at + 4] != b"SNOD" {
        return Err(FormatError::InvalidSymbolTableNodeSignature);
    }
    if data[at + 4] != 1 {
        return Err(FormatError::InvalidSymbolTableNodeVersion(data[at + 4]));
    }
    let count = read_u16(data, at + 6)? as usize;
    let os = offset_size as usize;
    // name offset, header address, cache type, reserved, 16-byte scratch pad
    let entry_size = 2 * os + 24;
    ensure_len(data, at + 8, count * entry_size)?;

    (0..count)
        .map(|i| {
            let pos = at + 8 + i * entry_size;
            Ok(SymbolEntry {
                name_offset: read_sized(data, pos, offset_size)?,
                object_header_address: read_sized(data, pos + os, offset_size)?,
                cache_type: read_u32(data, pos + 2 * os)?,
            })
        })
        .collect()
}
