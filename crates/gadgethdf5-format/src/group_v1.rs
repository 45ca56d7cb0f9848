//! Children of old-style groups (symbol table, B-tree v1, local heap).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::btree_v1::symbol_node_addresses;
use crate::error::FormatError;
use crate::group::GroupChild;
use crate::local_heap::LocalHeap;
use crate::symbol_table::{parse_symbol_node, SymbolTable};
use crate::util::to_index;

/// List the children of a symbol-table group.
///
/// The B-tree keeps symbol nodes sorted by name, so the result is already
/// in ascending name order.
pub fn symbol_table_children(
    data: &[u8],
    table: &SymbolTable,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<GroupChild>, FormatError> {
    let heap = LocalHeap::parse(
        data,
        to_index(table.local_heap_address)?,
        offset_size,
        length_size,
    )?;
    let mut children = Vec::new();
    for node in symbol_node_addresses(data, table.btree_address, offset_size, length_size)? {
        for entry in parse_symbol_node(data, node, offset_size)? {
            children.push(GroupChild {
                name: heap.string_at(data, entry.name_offset)?,
                // cache type 2 marks a soft link; its address field is unused
                address: (entry.cache_type != 2).then_some(entry.object_header_address),
                creation_order: None,
            });
        }
    }
    Ok(children)
}
