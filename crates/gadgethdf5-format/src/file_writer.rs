//! Whole-file encoding: a version 3 superblock, compact link groups and
//! contiguous datasets, each object with compact attributes.
//!
//! All addresses and lengths are written 8 bytes wide. Object headers come
//! first in depth-first order, followed by the raw dataset bytes.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec, vec::Vec};

use crate::attribute::Attribute;
use crate::checksum::jenkins_lookup3;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::link_info::LinkInfo;
use crate::link_message::Link;
use crate::message_type::MessageType;
use crate::object_header_writer::{ObjectHeaderWriter, MSG_FLAG_CONSTANT};
use crate::signature::HDF5_SIGNATURE;
use crate::util::{push_uint, to_index};

pub const OFFSET_SIZE: u8 = 8;
pub const LENGTH_SIZE: u8 = 8;
pub const SUPERBLOCK_SIZE: usize = 48;

const UNDEFINED: u64 = u64::MAX;

fn upsert(attrs: &mut Vec<Attribute>, attr: Attribute) {
    match attrs.iter_mut().find(|a| a.name == attr.name) {
        Some(slot) => *slot = attr,
        None => attrs.push(attr),
    }
}

/// A dataset stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetNode {
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    pub data: Vec<u8>,
    pub attributes: Vec<Attribute>,
}

impl DatasetNode {
    /// Add an attribute, replacing one of the same name in place.
    pub fn set_attr(&mut self, attr: Attribute) -> &mut Self {
        upsert(&mut self.attributes, attr);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(GroupNode),
    Dataset(DatasetNode),
}

/// A group whose links are stored in its object header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupNode {
    pub children: Vec<(String, Node)>,
    pub attributes: Vec<Attribute>,
    /// Record attribute creation order so readers iterate in insertion order.
    pub track_attribute_order: bool,
}

impl GroupNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty child group and return it.
    pub fn add_group(&mut self, name: &str) -> &mut GroupNode {
        self.children.push((name.into(), Node::Group(GroupNode::new())));
        match self.children.last_mut() {
            Some((_, Node::Group(g))) => g,
            _ => unreachable!("just pushed a group"),
        }
    }

    /// Add a dataset. `data` must hold `num_elements * datatype.size()` bytes.
    pub fn add_dataset(
        &mut self,
        name: &str,
        datatype: Datatype,
        dims: &[u64],
        data: Vec<u8>,
    ) -> Result<&mut DatasetNode, FormatError> {
        let dataspace = if dims.is_empty() {
            Dataspace::scalar()
        } else {
            Dataspace::simple(dims)
        };
        let expected = dataspace.byte_len(datatype.size())?;
        if data.len() != expected {
            return Err(FormatError::UnexpectedEof {
                expected,
                available: data.len(),
            });
        }
        self.children.push((
            name.into(),
            Node::Dataset(DatasetNode {
                datatype,
                dataspace,
                data,
                attributes: Vec::new(),
            }),
        ));
        match self.children.last_mut() {
            Some((_, Node::Dataset(d))) => Ok(d),
            _ => unreachable!("just pushed a dataset"),
        }
    }

    /// Add an attribute, replacing one of the same name in place.
    pub fn set_attr(&mut self, attr: Attribute) -> &mut Self {
        upsert(&mut self.attributes, attr);
        self
    }
}

/// Objects in header order, with links as indices into the same list.
enum Flat<'a> {
    Group {
        node: &'a GroupNode,
        links: Vec<(&'a str, usize)>,
    },
    Dataset(&'a DatasetNode),
}

fn flatten<'a>(group: &'a GroupNode, out: &mut Vec<Flat<'a>>) -> usize {
    let index = out.len();
    out.push(Flat::Group {
        node: group,
        links: Vec::new(),
    });
    let mut links = Vec::with_capacity(group.children.len());
    for (name, child) in &group.children {
        let child_index = match child {
            Node::Group(g) => flatten(g, out),
            Node::Dataset(d) => {
                out.push(Flat::Dataset(d));
                out.len() - 1
            }
        };
        links.push((name.as_str(), child_index));
    }
    if let Flat::Group { links: slot, .. } = &mut out[index] {
        *slot = links;
    }
    index
}

fn group_header(
    node: &GroupNode,
    links: &[(&str, usize)],
    addresses: &[u64],
) -> Result<Vec<u8>, FormatError> {
    let mut w = ObjectHeaderWriter::new();
    w.track_attribute_order(node.track_attribute_order);
    w.add_message(MessageType::LinkInfo, LinkInfo::serialize_compact(OFFSET_SIZE));
    w.add_message(MessageType::GroupInfo, vec![0, 0]);
    for &(name, target) in links {
        w.add_message(
            MessageType::Link,
            Link::hard(name, addresses[target]).serialize(OFFSET_SIZE)?,
        );
    }
    for attr in &node.attributes {
        w.add_message(MessageType::Attribute, attr.serialize(LENGTH_SIZE)?);
    }
    w.serialize()
}

fn dataset_header(node: &DatasetNode, data_address: u64) -> Result<Vec<u8>, FormatError> {
    let mut w = ObjectHeaderWriter::new();
    w.add_message(MessageType::Dataspace, node.dataspace.serialize(LENGTH_SIZE));
    w.add_message_with_flags(
        MessageType::Datatype,
        node.datatype.serialize()?,
        MSG_FLAG_CONSTANT,
    );
    // fill value v3: allocation time late, write if user-defined, no value
    w.add_message_with_flags(MessageType::FillValue, vec![3, 0x0a], MSG_FLAG_CONSTANT);
    // layout v3, class 1 (contiguous)
    let mut layout = vec![3u8, 1];
    let raw_address = if node.data.is_empty() {
        UNDEFINED
    } else {
        data_address
    };
    push_uint(&mut layout, raw_address, OFFSET_SIZE as usize);
    push_uint(&mut layout, node.data.len() as u64, LENGTH_SIZE as usize);
    w.add_message(MessageType::DataLayout, layout);
    for attr in &node.attributes {
        w.add_message(MessageType::Attribute, attr.serialize(LENGTH_SIZE)?);
    }
    w.serialize()
}

fn encode_all(
    objects: &[Flat<'_>],
    addresses: &[u64],
    data_addresses: &[u64],
) -> Result<Vec<Vec<u8>>, FormatError> {
    objects
        .iter()
        .zip(data_addresses)
        .map(|(obj, &data_address)| match obj {
            Flat::Group { node, links } => group_header(node, links, addresses),
            Flat::Dataset(d) => dataset_header(d, data_address),
        })
        .collect()
}

fn superblock(root: u64, eof: u64) -> Vec<u8> {
    let mut sb = Vec::with_capacity(SUPERBLOCK_SIZE);
    sb.extend_from_slice(&HDF5_SIGNATURE);
    sb.extend_from_slice(&[3, OFFSET_SIZE, LENGTH_SIZE, 0]);
    push_uint(&mut sb, 0, 8);
    push_uint(&mut sb, UNDEFINED, 8);
    push_uint(&mut sb, eof, 8);
    push_uint(&mut sb, root, 8);
    let checksum = jenkins_lookup3(&sb);
    sb.extend_from_slice(&checksum.to_le_bytes());
    sb
}

/// Builds a complete file image in memory.
#[derive(Debug, Clone, Default)]
pub struct FileWriter {
    root: GroupNode,
}

impl FileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&mut self) -> &mut GroupNode {
        &mut self.root
    }

    /// Lay out every object and return the file bytes.
    pub fn finish(&self) -> Result<Vec<u8>, FormatError> {
        let mut objects = Vec::new();
        flatten(&self.root, &mut objects);

        // Header sizes do not depend on addresses, so one sizing pass
        // fixes the layout.
        let zeros = vec![0u64; objects.len()];
        let sizes: Vec<usize> = encode_all(&objects, &zeros, &zeros)?
            .iter()
            .map(Vec::len)
            .collect();

        let mut cursor = SUPERBLOCK_SIZE as u64;
        let mut addresses = Vec::with_capacity(objects.len());
        for size in &sizes {
            addresses.push(cursor);
            cursor += *size as u64;
        }
        let mut data_addresses = Vec::with_capacity(objects.len());
        for obj in &objects {
            data_addresses.push(cursor);
            if let Flat::Dataset(d) = obj {
                cursor += d.data.len() as u64;
            }
        }

        let headers = encode_all(&objects, &addresses, &data_addresses)?;
        let mut out = superblock(addresses[0], cursor);
        out.reserve(to_index(cursor)?.saturating_sub(SUPERBLOCK_SIZE));
        for header in &headers {
            out.extend_from_slice(header);
        }
        for obj in &objects {
            if let Flat::Dataset(d) = obj {
                out.extend_from_slice(&d.data);
            }
        }
        Ok(out)
    }
}
