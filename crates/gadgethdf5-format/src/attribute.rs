//! Attribute messages (type 0x000C), compact and dense, in iteration order.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec, vec::Vec};

use crate::attribute_info::AttributeInfo;
use crate::btree_v2::BTreeV2;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::fractal_heap::FractalHeap;
use crate::message_type::MessageType;
use crate::object_header::ObjectHeader;
use crate::util::{ensure_len, read_u16, read_u32, to_index};

/// Attribute flag bits marking a shared datatype or dataspace.
const SHARED_COMPONENTS: u8 = 0x03;

/// Dense attribute name-index records (type 8) start with an 8-byte heap ID,
/// then a flags byte and the 4-byte creation order.
const DENSE_ID_LEN: usize = 8;
const DENSE_ORDER_AT: usize = 9;

/// A parsed attribute with its raw value bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// Raw element bytes, `dataspace.num_elements() * datatype.size()` long.
    pub data: Vec<u8>,
    /// Creation order, when the owning object tracks it.
    pub creation_order: Option<u64>,
}

fn pad8(n: usize) -> usize {
    n.div_ceil(8) * 8
}

impl Attribute {
    pub fn new(name: &str, datatype: Datatype, dataspace: Dataspace, data: Vec<u8>) -> Attribute {
        Attribute {
            name: name.into(),
            datatype,
            dataspace,
            data,
            creation_order: None,
        }
    }

    /// Parse an attribute message (versions 1 to 3).
    pub fn parse(data: &[u8], length_size: u8) -> Result<Attribute, FormatError> {
        ensure_len(data, 0, 8)?;
        let version = data[0];
        if !(1..=3).contains(&version) {
            return Err(FormatError::InvalidAttributeVersion(version));
        }
        if version >= 2 && data[1] & SHARED_COMPONENTS != 0 {
            return Err(FormatError::SharedMessageUnsupported);
        }
        let name_len = read_u16(data, 2)? as usize;
        let dt_len = read_u16(data, 4)? as usize;
        let ds_len = read_u16(data, 6)? as usize;
        // v3 adds a name character-set byte; v1 pads each part to 8 bytes
        let mut pos = if version == 3 { 9 } else { 8 };
        let step = |n: usize| if version == 1 { pad8(n) } else { n };

        ensure_len(data, pos, name_len)?;
        let raw_name = &data[pos..pos + name_len];
        let end = raw_name.iter().position(|&b| b == 0).unwrap_or(name_len);
        let name = String::from_utf8_lossy(&raw_name[..end]).into_owned();
        pos += step(name_len);

        ensure_len(data, pos, dt_len)?;
        let (datatype, _) = Datatype::parse(&data[pos..pos + dt_len])?;
        pos += step(dt_len);

        ensure_len(data, pos, ds_len)?;
        let dataspace = Dataspace::parse(&data[pos..pos + ds_len], length_size)?;
        pos += step(ds_len);

        let value_len = dataspace.byte_len(datatype.size())?;
        ensure_len(data, pos, value_len)?;

        Ok(Attribute {
            name,
            datatype,
            dataspace,
            data: data[pos..pos + value_len].to_vec(),
            creation_order: None,
        })
    }

    /// Encode as a version 3 attribute message with an ASCII name.
    pub fn serialize(&self, length_size: u8) -> Result<Vec<u8>, FormatError> {
        let dt = self.datatype.serialize()?;
        let ds = self.dataspace.serialize(length_size);
        let name_len = self.name.len() + 1;
        let mut out = vec![3u8, 0];
        out.extend_from_slice(&(name_len as u16).to_le_bytes());
        out.extend_from_slice(&(dt.len() as u16).to_le_bytes());
        out.extend_from_slice(&(ds.len() as u16).to_le_bytes());
        out.push(0);
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
        out.extend_from_slice(&dt);
        out.extend_from_slice(&ds);
        out.extend_from_slice(&self.data);
        Ok(out)
    }
}

/// All attributes of an object in the library's default iteration order:
/// creation order when the object tracks it, otherwise ascending name.
pub fn collect_attributes(
    data: &[u8],
    header: &ObjectHeader,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<Attribute>, FormatError> {
    let mut attrs = Vec::new();
    for msg in header.messages_of(MessageType::Attribute) {
        if msg.is_shared() {
            return Err(FormatError::SharedMessageUnsupported);
        }
        let mut attr = Attribute::parse(&msg.data, length_size)?;
        attr.creation_order = msg.creation_order.map(u64::from);
        attrs.push(attr);
    }

    let info = header
        .find(MessageType::AttributeInfo)
        .map(|m| AttributeInfo::parse(&m.data, offset_size))
        .transpose()?;
    if let Some(AttributeInfo {
        fractal_heap_address: Some(heap_addr),
        name_index_address: Some(index_addr),
        ..
    }) = info
    {
        let heap = FractalHeap::parse(data, to_index(heap_addr)?, offset_size, length_size)?;
        let tree = BTreeV2::parse(data, to_index(index_addr)?, offset_size, length_size)?;
        for record in tree.records(data)? {
            ensure_len(record, 0, DENSE_ORDER_AT + 4)?;
            let object = heap.read_object(data, &record[..DENSE_ID_LEN])?;
            let mut attr = Attribute::parse(object, length_size)?;
            attr.creation_order = Some(read_u32(record, DENSE_ORDER_AT)? as u64);
            attrs.push(attr);
        }
    }

    let tracked = header.tracks_attribute_order()
        || info.as_ref().is_some_and(|i| i.creation_order_tracked);
    if tracked {
        attrs.sort_by_key(|a| a.creation_order);
    } else {
        attrs.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    }
    Ok(attrs)
}
