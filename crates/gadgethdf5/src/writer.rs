//! Writing Gadget-layout snapshot files.

use std::path::Path;

use gadgethdf5_format::attribute::Attribute;
use gadgethdf5_format::dataspace::Dataspace;
use gadgethdf5_format::datatype::Datatype;
use gadgethdf5_format::file_writer::{FileWriter, GroupNode, Node};
use tracing::debug;

use crate::error::{Error, Result};
use crate::header::GadgetHeader;
use crate::types::AttrValue;

/// Per-particle data for one block, `components` values per particle.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Stored as native `f32`, like positions, velocities and masses.
    Float(Vec<f32>),
    /// Stored as `i64`, like particle IDs.
    Int(Vec<i64>),
}

impl Block {
    fn len(&self) -> usize {
        match self {
            Block::Float(v) => v.len(),
            Block::Int(v) => v.len(),
        }
    }

    fn into_parts(self) -> (Datatype, Vec<u8>) {
        match self {
            Block::Float(v) => (Datatype::float(4), v.iter().flat_map(|x| x.to_le_bytes()).collect()),
            Block::Int(v) => (
                Datatype::integer(8, true),
                v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ),
        }
    }
}

/// Name of the group holding particles of type `part_type`.
pub fn part_type_group(part_type: usize) -> String {
    format!("PartType{part_type}")
}

/// Builds a snapshot file: a `Header` group of attributes and one
/// `PartTypeN` group per particle type present in this file.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    writer: FileWriter,
    num_part: Vec<u64>,
}

impl SnapshotBuilder {
    /// Start a file holding `num_part[t]` particles of type `t`. Groups are
    /// only created for types with a nonzero count, and the counts are
    /// written as `NumPart_ThisFile`. An empty `num_part` leaves the header
    /// bare.
    pub fn new(num_part: &[u64]) -> SnapshotBuilder {
        let mut writer = FileWriter::new();
        for (part_type, _) in num_part.iter().enumerate().filter(|&(_, &n)| n > 0) {
            writer.root().add_group(&part_type_group(part_type));
        }
        let header = writer.root().add_group("Header");
        if !num_part.is_empty() {
            header.set_attr(Attribute::new(
                "NumPart_ThisFile",
                Datatype::integer(8, false),
                Dataspace::simple(&[num_part.len() as u64]),
                num_part.iter().flat_map(|n| n.to_le_bytes()).collect(),
            ));
        }
        SnapshotBuilder {
            writer,
            num_part: num_part.to_vec(),
        }
    }

    /// Start a file from a full Gadget header and write its attributes.
    pub fn from_header(header: &GadgetHeader) -> Result<SnapshotBuilder> {
        let mut builder = SnapshotBuilder::new(&header.num_part_this_file);
        for (name, value) in header.to_attrs() {
            builder.set_header_attr(name, value)?;
        }
        Ok(builder)
    }

    /// Record `Header` attribute creation order, so readers list them in the
    /// order they were set instead of by name.
    pub fn track_header_order(&mut self, on: bool) -> &mut Self {
        if let Some(header) = self.group_mut("Header") {
            header.track_attribute_order = on;
        }
        self
    }

    pub fn set_header_attr(&mut self, name: &str, value: AttrValue) -> Result<&mut Self> {
        let attr = value.to_attribute(name)?;
        if let Some(header) = self.group_mut("Header") {
            header.set_attr(attr);
        }
        Ok(self)
    }

    /// Add a dataset named `name` to the group of `part_type`. One particle
    /// per row; blocks with more than one component are written as 2-D.
    pub fn write_block(
        &mut self,
        name: &str,
        part_type: usize,
        components: usize,
        block: Block,
    ) -> Result<&mut Self> {
        let group_name = part_type_group(part_type);
        let count = self.num_part.get(part_type).copied().unwrap_or(0);
        let expected = count as usize * components;
        if block.len() != expected {
            return Err(Error::BlockSize {
                name: name.into(),
                expected,
                found: block.len(),
            });
        }
        let dims = if components > 1 {
            vec![count, components as u64]
        } else {
            vec![count]
        };
        let group = self
            .group_mut(&group_name)
            .ok_or_else(|| Error::MissingGroup(group_name.clone()))?;
        let (datatype, data) = block.into_parts();
        group.add_dataset(name, datatype, &dims, data)?;
        debug!(block = name, group = %group_name, count, "added block");
        Ok(self)
    }

    /// The encoded file.
    pub fn finish(&self) -> Result<Vec<u8>> {
        Ok(self.writer.finish()?)
    }

    /// Encode and write to `path`, replacing any existing file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path.as_ref(), bytes)?;
        debug!(path = %path.as_ref().display(), "wrote snapshot");
        Ok(())
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut GroupNode> {
        self.writer
            .root()
            .children
            .iter_mut()
            .find_map(|(n, node)| match node {
                Node::Group(g) if n.as_str() == name => Some(g),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::File;

    #[test]
    fn groups_only_for_present_types() {
        let b = SnapshotBuilder::new(&[4, 0, 2, 0, 0, 0]);
        let file = File::from_bytes(b.finish().unwrap()).unwrap();
        assert_eq!(file.root().keys().unwrap(), ["Header", "PartType0", "PartType2"]);
    }

    #[test]
    fn counts_are_written_to_the_header() {
        let b = SnapshotBuilder::new(&[4, 0, 2]);
        let file = File::from_bytes(b.finish().unwrap()).unwrap();
        let header = file.group("Header").unwrap();
        assert_eq!(crate::header::num_part_this_file(&header).unwrap(), [4, 0, 2]);

        let bare = SnapshotBuilder::new(&[]);
        let file = File::from_bytes(bare.finish().unwrap()).unwrap();
        assert!(file.group("Header").unwrap().attrs().unwrap().is_empty());
    }

    #[test]
    fn blocks_have_particle_rows() {
        let mut b = SnapshotBuilder::new(&[2, 1]);
        b.write_block("Coordinates", 0, 3, Block::Float(vec![0.0; 6]))
            .unwrap()
            .write_block("ParticleIDs", 1, 1, Block::Int(vec![7]))
            .unwrap();
        let file = File::from_bytes(b.finish().unwrap()).unwrap();
        assert_eq!(file.group("PartType0").unwrap().datasets().unwrap(), ["Coordinates"]);
        assert_eq!(file.group("PartType1").unwrap().datasets().unwrap(), ["ParticleIDs"]);
    }

    #[test]
    fn block_errors() {
        let mut b = SnapshotBuilder::new(&[2, 0]);
        assert!(matches!(
            b.write_block("Masses", 0, 1, Block::Float(vec![1.0])),
            Err(Error::BlockSize { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            b.write_block("Masses", 1, 1, Block::Float(vec![])),
            Err(Error::MissingGroup(g)) if g == "PartType1"
        ));
    }

    #[test]
    fn tracked_header_keeps_set_order() {
        let mut b = SnapshotBuilder::new(&[]);
        b.track_header_order(true);
        b.set_header_attr("Redshift", AttrValue::Float(2.0)).unwrap();
        b.set_header_attr("BoxSize", AttrValue::Float(100.0)).unwrap();
        let file = File::from_bytes(b.finish().unwrap()).unwrap();
        let names: Vec<String> = file
            .group("Header")
            .unwrap()
            .attrs()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, ["Redshift", "BoxSize"]);
    }
}
