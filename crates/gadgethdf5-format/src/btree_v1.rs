//! Version 1 B-tree (`TREE`) traversal for group symbol tables.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::FormatError;
use crate::util::{ensure_len, read_sized, read_u16, to_index};

/// Node type of group B-trees; type 1 indexes raw data chunks.
const GROUP_NODE: u8 = 0;

/// Depth limit guarding against cyclic child pointers.
const MAX_LEVEL: u8 = 64;

/// Addresses of all symbol table nodes (`SNOD`) reachable from the group
/// B-tree at `address`, left to right.
pub fn symbol_node_addresses(
    data: &[u8],
    address: u64,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<u64>, FormatError> {
    let mut out = Vec::new();
    visit(data, address, offset_size, length_size, None, &mut out)?;
    Ok(out)
}

fn visit(
    data: &[u8],
    address: u64,
    offset_size: u8,
    length_size: u8,
    expected_level: Option<u8>,
    out: &mut Vec<u64>,
) -> Result<(), FormatError> {
    let at = to_index(address)?;
    ensure_len(data, at, 8)?;
    if &data[at..at + 4] != b"TREE" {
        return Err(FormatError::InvalidBTreeSignature);
    }
    let node_type = data[at + 4];
    if node_type != GROUP_NODE {
        return Err(FormatError::InvalidBTreeNodeType(node_type));
    }
    let level = data[at + 5];
    if level > MAX_LEVEL || expected_level.is_some_and(|l| l != level) {
        return Err(FormatError::InvalidBTreeSignature);
    }
    let entries = read_u16(data, at + 6)? as usize;

    let (os, ls) = (offset_size as usize, length_size as usize);
    // siblings, then key0 child0 key1 child1 ... keyN
    let mut pos = at + 8 + 2 * os + ls;
    for _ in 0..entries {
        let child = read_sized(data, pos, offset_size)?;
        pos += os + ls;
        if level == 0 {
            out.push(child);
        } else {
            visit(data, child, offset_size, length_size, Some(level - 1), out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(level: u8, children: &[u64]) -> Vec<u8> {
        let mut b = b"TREE".to_vec();
        b.push(0);
        b.push(level);
        b.extend_from_slice(&(children.len() as u16).to_le_bytes());
        b.extend_from_slice(&u64::MAX.to_le_bytes());
        b.extend_from_slice(&u64::MAX.to_le_bytes());
        for (i, c) in children.iter().enumerate() {
            b.extend_from_slice(&(i as u64 * 8).to_le_bytes());
            b.extend_from_slice(&c.to_le_bytes());
        }
        b.extend_from_slice(&(children.len() as u64 * 8).to_le_bytes());
        b
    }

    fn put(file: &mut Vec<u8>, at: usize, bytes: &[u8]) {
        if file.len() < at + bytes.len() {
            file.resize(at + bytes.len(), 0);
        }
        file[at..at + bytes.len()].copy_from_slice(bytes);
    }

    #[test]
    fn leaf_children() {
        let file = node(0, &[0x300, 0x400]);
        assert_eq!(
            symbol_node_addresses(&file, 0, 8, 8).unwrap(),
            vec![0x300, 0x400]
        );
    }

    #[test]
    fn two_levels() {
        let mut file = Vec::new();
        put(&mut file, 0, &node(1, &[0x100, 0x200]));
        put(&mut file, 0x100, &node(0, &[0x1000]));
        put(&mut file, 0x200, &node(0, &[0x2000, 0x3000]));
        assert_eq!(
            symbol_node_addresses(&file, 0, 8, 8).unwrap(),
            vec![0x1000, 0x2000, 0x3000]
        );
    }

    #[test]
    fn chunk_tree_rejected() {
        let mut file = node(0, &[]);
        file[4] = 1;
        assert_eq!(
            symbol_node_addresses(&file, 0, 8, 8),
            Err(FormatError::InvalidBTreeNodeType(1))
        );
    }

    #[test]
    fn self_referencing_tree_fails() {
        let file = node(1, &[0]);
        assert_eq!(
            symbol_node_addresses(&file, 0, 8, 8),
            Err(FormatError::InvalidBTreeSignature)
        );
    }
}
