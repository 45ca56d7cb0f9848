//! Version 2 B-tree (`BTHD`/`BTIN`/`BTLF`) traversal.
//!
//! Records are returned raw; their layout depends on the tree type:
//! 5 (link name hash), 6 (link creation order), 8 (attribute name hash),
//! 9 (attribute creation order).

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::error::FormatError;
use crate::util::{ensure_len, is_undefined, read_sized, read_u16, read_u32, read_uint, to_index};

/// Node prefix: signature, version, type and trailing checksum.
const NODE_OVERHEAD: usize = 10;

/// Parsed B-tree v2 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BTreeV2 {
    /// Record type stored in the tree.
    pub record_type: u8,
    /// Size of every node in bytes.
    pub node_size: u32,
    /// Size of one record in bytes.
    pub record_size: u16,
    /// Depth of the tree; 0 means the root is a leaf.
    pub depth: u16,
    /// Root node address, absent for an empty tree.
    pub root_address: Option<u64>,
    /// Number of records in the root node.
    pub root_records: u16,
    /// Number of records in the whole tree.
    pub total_records: u64,
    offset_size: u8,
}

/// Per-depth widths of the child pointer fields.
struct PointerWidths {
    /// Width of a child's record count.
    records: usize,
    /// Width of a child's subtree total, indexed by the child's depth.
    totals: Vec<usize>,
}

fn enc_width(max: u64) -> usize {
    (63 - max.max(1).leading_zeros()) as usize / 8 + 1
}

impl BTreeV2 {
    /// Parse the B-tree header at `offset`.
    pub fn parse(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<BTreeV2, FormatError> {
        ensure_len(data, offset, 16)?;
        if &data[offset..offset + 4] != b"BTHD" {
            return Err(FormatError::InvalidBTreeV2Signature);
        }
        let version = data[offset + 4];
        if version != 0 {
            return Err(FormatError::InvalidBTreeV2Version(version));
        }
        let record_type = data[offset + 5];
        let node_size = read_u32(data, offset + 6)?;
        let record_size = read_u16(data, offset + 10)?;
        let depth = read_u16(data, offset + 12)?;
        // split and merge percentages at 14 and 15
        let mut pos = offset + 16;
        let root = read_sized(data, pos, offset_size)?;
        pos += offset_size as usize;
        let root_records = read_u16(data, pos)?;
        let total_records = read_sized(data, pos + 2, length_size)?;

        if record_size == 0 || (node_size as usize) <= NODE_OVERHEAD {
            return Err(FormatError::InvalidBTreeV2Signature);
        }

        Ok(BTreeV2 {
            record_type,
            node_size,
            record_size,
            depth,
            root_address: (!is_undefined(root, offset_size)).then_some(root),
            root_records,
            total_records,
            offset_size,
        })
    }

    fn pointer_widths(&self) -> PointerWidths {
        let node = self.node_size as u64;
        let rec = self.record_size as u64;
        let leaf_max = (node - NODE_OVERHEAD as u64) / rec;
        let records = enc_width(leaf_max);

        let mut totals = vec![0usize];
        let mut cumulative = leaf_max;
        for d in 1..self.depth as usize {
            let pointer = self.offset_size as u64 + records as u64 + totals[d - 1] as u64;
            let max = node.saturating_sub(NODE_OVERHEAD as u64 + pointer) / (rec + pointer);
            cumulative = (max + 1) * cumulative + max;
            totals.push(enc_width(cumulative));
        }
        PointerWidths { records, totals }
    }

    /// All records of the tree, in key order, as slices of `data`.
    pub fn records<'a>(&self, data: &'a [u8]) -> Result<Vec<&'a [u8]>, FormatError> {
        let mut out = Vec::with_capacity(self.total_records.min(1 << 16) as usize);
        if let Some(root) = self.root_address {
            let widths = self.pointer_widths();
            self.walk(data, root, self.depth as usize, self.root_records as usize, &widths, &mut out)?;
        }
        Ok(out)
    }

    fn walk<'a>(
        &self,
        data: &'a [u8],
        addr: u64,
        depth: usize,
        nrec: usize,
        widths: &PointerWidths,
        out: &mut Vec<&'a [u8]>,
    ) -> Result<(), FormatError> {
        let at = to_index(addr)?;
        let signature: &[u8; 4] = if depth == 0 { b"BTLF" } else { b"BTIN" };
        ensure_len(data, at, 6)?;
        if &data[at..at + 4] != signature {
            return Err(FormatError::InvalidBTreeV2Signature);
        }
        let rs = self.record_size as usize;
        let records_at = at + 6;
        ensure_len(data, records_at, nrec * rs)?;
        let record = |i: usize| &data[records_at + i * rs..records_at + (i + 1) * rs];

        if depth == 0 {
            out.extend((0..nrec).map(record));
            return Ok(());
        }

        let os = self.offset_size as usize;
        let total_width = if depth > 1 { widths.totals[depth - 1] } else { 0 };
        let mut pos = records_at + nrec * rs;
        for i in 0..=nrec {
            let child = read_sized(data, pos, self.offset_size)?;
            let child_records = read_uint(data, pos + os, widths.records)? as usize;
            pos += os + widths.records + total_width;
            self.walk(data, child, depth - 1, child_records, widths, out)?;
            if i < nrec {
                out.push(record(i));
            }
        }
        Ok(())
    }
}
