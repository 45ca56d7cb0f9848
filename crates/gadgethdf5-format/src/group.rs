//! Group membership and path lookup across both group storage styles.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::error::FormatError;
use crate::group_v1::symbol_table_children;
use crate::group_v2::link_children;
use crate::message_type::MessageType;
use crate::object_header::ObjectHeader;
use crate::symbol_table::SymbolTable;
use crate::util::to_index;

/// A named member of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChild {
    pub name: String,
    /// Object header address; `None` for soft and external links.
    pub address: Option<u64>,
    /// Link creation order, when the group tracks it.
    pub creation_order: Option<u64>,
}

/// True when the object header describes a group of either style.
pub fn is_group(header: &ObjectHeader) -> bool {
    header.messages.iter().any(|m| {
        matches!(
            m.msg_type,
            MessageType::SymbolTable | MessageType::LinkInfo | MessageType::Link
        )
    })
}

/// Children of the group described by `header`, in iteration order.
pub fn group_children(
    data: &[u8],
    header: &ObjectHeader,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<GroupChild>, FormatError> {
    if let Some(msg) = header.find(MessageType::SymbolTable) {
        let table = SymbolTable::parse(&msg.data, offset_size)?;
        return symbol_table_children(data, &table, offset_size, length_size);
    }
    if is_group(header) {
        return link_children(data, header, offset_size, length_size);
    }
    Err(FormatError::NotAGroup(String::new()))
}

/// Follow a slash-separated path from the object at `start` and return the
/// object header address it names. Empty components are ignored, so `/`
/// and `""` name `start` itself.
pub fn resolve_path(
    data: &[u8],
    start: u64,
    path: &str,
    offset_size: u8,
    length_size: u8,
) -> Result<u64, FormatError> {
    let mut current = start;
    let mut walked = String::new();
    for component in path.split('/').filter(|c| !c.is_empty()) {
        let header = ObjectHeader::parse(data, to_index(current)?, offset_size, length_size)?;
        if !is_group(&header) {
            return Err(FormatError::NotAGroup(walked));
        }
        walked.push('/');
        walked.push_str(component);
        current = group_children(data, &header, offset_size, length_size)?
            .into_iter()
            .find(|c| c.name == component)
            .and_then(|c| c.address)
            .ok_or_else(|| FormatError::PathNotFound(walked.clone()))?;
    }
    Ok(current)
}
