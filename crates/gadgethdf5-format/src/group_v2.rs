//! Children of new-style groups: link messages, compact or dense.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::btree_v2::BTreeV2;
use crate::error::FormatError;
use crate::fractal_heap::FractalHeap;
use crate::group::GroupChild;
use crate::link_info::LinkInfo;
use crate::link_message::{Link, LinkTarget};
use crate::message_type::MessageType;
use crate::object_header::ObjectHeader;
use crate::util::to_index;

/// Name-hash records (type 5) start with a 4-byte hash, then the heap ID.
const NAME_RECORD_ID_OFFSET: usize = 4;

/// List the children of a link-based group in the library's default
/// iteration order: creation order when tracked, otherwise name order.
pub fn link_children(
    data: &[u8],
    header: &ObjectHeader,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<GroupChild>, FormatError> {
    let info = header
        .find(MessageType::LinkInfo)
        .map(|m| LinkInfo::parse(&m.data, offset_size))
        .transpose()?;

    let links = match &info {
        Some(LinkInfo {
            fractal_heap_address: Some(heap_addr),
            name_index_address,
            ..
        }) => dense_links(
            data,
            *heap_addr,
            *name_index_address,
            offset_size,
            length_size,
        )?,
        _ => header
            .messages_of(MessageType::Link)
            .map(|m| Link::parse(&m.data, offset_size))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let mut children: Vec<GroupChild> = links
        .into_iter()
        .map(|link| GroupChild {
            address: match link.target {
                LinkTarget::Hard(addr) => Some(addr),
                _ => None,
            },
            name: link.name,
            creation_order: link.creation_order,
        })
        .collect();

    if info.is_some_and(|i| i.creation_order_tracked) {
        children.sort_by_key(|c| c.creation_order);
    } else {
        children.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    }
    Ok(children)
}

fn dense_links(
    data: &[u8],
    heap_addr: u64,
    name_index: Option<u64>,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<Link>, FormatError> {
    let Some(index) = name_index else {
        return Ok(Vec::new());
    };
    let heap = FractalHeap::parse(data, to_index(heap_addr)?, offset_size, length_size)?;
    let tree = BTreeV2::parse(data, to_index(index)?, offset_size, length_size)?;
    let id_len = heap.heap_id_length as usize;

    tree.records(data)?
        .into_iter()
        .map(|record| {
            let id = record
                .get(NAME_RECORD_ID_OFFSET..NAME_RECORD_ID_OFFSET + id_len)
                .ok_or(FormatError::UnexpectedEof {
                    expected: NAME_RECORD_ID_OFFSET + id_len,
                    available: record.len(),
                })?;
            Link::parse(heap.read_object(data, id)?, offset_size)
        })
        .collect()
}
