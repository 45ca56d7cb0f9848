//! Fractal heap (`FRHP`) reader for dense link and attribute storage.
//!
//! Heap offsets are laid out by a doubling table: rows 0 and 1 hold blocks
//! of the starting size, each later row doubles. An indirect block spans its
//! rows in order, and the offset of an object inside a direct block counts
//! from the start of that block, header included.

use crate::error::FormatError;
use crate::util::{ensure_len, is_undefined, read_sized, read_u16, read_u32, read_uint, to_index};

const FRHP: &[u8; 4] = b"FRHP";
const FHIB: &[u8; 4] = b"FHIB";

/// Heap ID types stored in bits 4-5 of the first ID byte.
const ID_MANAGED: u8 = 0;
const ID_TINY: u8 = 2;

/// Parsed fractal heap header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FractalHeap {
    /// Length of heap IDs in bytes.
    pub heap_id_length: u16,
    /// Largest object stored in managed blocks.
    pub max_managed_object_size: u32,
    /// Number of blocks per doubling-table row.
    pub table_width: u16,
    /// Size of blocks in rows 0 and 1.
    pub starting_block_size: u64,
    /// Largest direct block size.
    pub max_direct_block_size: u64,
    /// Bits needed to address any heap offset.
    pub max_heap_size_bits: u16,
    /// Root block, if any object was ever stored.
    pub root_block_address: Option<u64>,
    /// Rows in the root indirect block; 0 means the root is a direct block.
    pub root_indirect_rows: u16,
    /// Number of managed objects in the heap.
    pub managed_objects: u64,
    offset_size: u8,
}

/// `value << by`, failing instead of shifting bits out.
fn shifted(value: u64, by: usize) -> Result<u64, FormatError> {
    u32::try_from(by)
        .ok()
        .filter(|&by| by < 64 && value.leading_zeros() >= by)
        .map(|by| value << by)
        .ok_or(FormatError::SizeOverflow("fractal heap row"))
}

impl FractalHeap {
    /// Parse the heap header at `offset`.
    pub fn parse(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<FractalHeap, FormatError> {
        ensure_len(data, offset, 14)?;
        if &data[offset..offset + 4] != FRHP {
            return Err(FormatError::InvalidFractalHeapSignature);
        }
        let version = data[offset + 4];
        if version != 0 {
            return Err(FormatError::InvalidFractalHeapVersion(version));
        }
        let heap_id_length = read_u16(data, offset + 5)?;
        if read_u16(data, offset + 7)? != 0 {
            return Err(FormatError::FilteredHeapUnsupported);
        }
        let max_managed_object_size = read_u32(data, offset + 10)?;

        let (os, ls) = (offset_size as usize, length_size as usize);
        // huge-object id/B-tree, free-space size/manager, three space counters
        let managed_at = offset + 14 + 2 * os + 5 * ls;
        let managed_objects = read_sized(data, managed_at, length_size)?;
        // managed count plus huge and tiny size/count
        let mut pos = managed_at + 5 * ls;

        let table_width = read_u16(data, pos)?;
        pos += 2;
        let starting_block_size = read_sized(data, pos, length_size)?;
        pos += ls;
        let max_direct_block_size = read_sized(data, pos, length_size)?;
        pos += ls;
        let max_heap_size_bits = read_u16(data, pos)?;
        // skip the starting row count, which only matters when writing
        pos += 4;
        let root = read_sized(data, pos, offset_size)?;
        pos += os;
        let root_indirect_rows = read_u16(data, pos)?;

        if table_width == 0
            || !starting_block_size.is_power_of_two()
            || !max_direct_block_size.is_power_of_two()
        {
            return Err(FormatError::InvalidFractalHeapSignature);
        }

        Ok(FractalHeap {
            heap_id_length,
            max_managed_object_size,
            table_width,
            starting_block_size,
            max_direct_block_size,
            max_heap_size_bits,
            root_block_address: (!is_undefined(root, offset_size)).then_some(root),
            root_indirect_rows,
            managed_objects,
            offset_size,
        })
    }

    /// Bytes used for the offset field of a managed heap ID.
    fn id_offset_bytes(&self) -> usize {
        (self.max_heap_size_bits as usize).div_ceil(8)
    }

    /// Bytes used for the length field of a managed heap ID.
    fn id_length_bytes(&self) -> usize {
        let by_block = (self.max_direct_block_size.trailing_zeros() as usize).div_ceil(8);
        let by_object = (31 - self.max_managed_object_size.max(1).leading_zeros()) as usize / 8 + 1;
        by_block.min(by_object)
    }

    /// Size of each block in doubling-table row `row`.
    fn row_block_size(&self, row: usize) -> Result<u64, FormatError> {
        if row <= 1 {
            return Ok(self.starting_block_size);
        }
        shifted(self.starting_block_size, row - 1)
    }

    /// Heap offset of row `row` relative to the start of its indirect block.
    fn row_start(&self, row: usize) -> Result<u64, FormatError> {
        if row == 0 {
            return Ok(0);
        }
        let span = (self.table_width as u64)
            .checked_mul(self.starting_block_size)
            .ok_or(FormatError::SizeOverflow("fractal heap row"))?;
        shifted(span, row - 1)
    }

    /// Rows of an indirect block that point at direct blocks.
    fn max_direct_rows(&self) -> usize {
        let max = self.max_direct_block_size.trailing_zeros();
        let start = self.starting_block_size.trailing_zeros();
        (max.saturating_sub(start) + 2) as usize
    }

    /// Resolve a heap ID to the object bytes, borrowed from `data` or,
    /// for tiny objects, from the ID itself.
    pub fn read_object<'a>(&self, data: &'a [u8], heap_id: &'a [u8]) -> Result<&'a [u8], FormatError> {
        ensure_len(heap_id, 0, 1)?;
        match (heap_id[0] >> 4) & 0x03 {
            ID_MANAGED => {
                let off_bytes = self.id_offset_bytes();
                let offset = read_uint(heap_id, 1, off_bytes)?;
                let length = to_index(read_uint(heap_id, 1 + off_bytes, self.id_length_bytes())?)?;
                let (block, block_offset) = self.locate(data, offset)?;
                let pos = to_index(block)?
                    .checked_add(to_index(offset - block_offset)?)
                    .ok_or(FormatError::SizeOverflow("fractal heap object"))?;
                ensure_len(data, pos, length)?;
                Ok(&data[pos..pos + length])
            }
            ID_TINY => {
                let length = (heap_id[0] & 0x0F) as usize + 1;
                ensure_len(heap_id, 1, length)?;
                Ok(&heap_id[1..1 + length])
            }
            other => Err(FormatError::UnsupportedHeapIdType(other)),
        }
    }

    /// Find the direct block containing heap offset `target`; returns its
    /// address and the heap offset where it starts.
    fn locate(&self, data: &[u8], target: u64) -> Result<(u64, u64), FormatError> {
        let root = self
            .root_block_address
            .ok_or(FormatError::HeapOffsetOutOfRange(target))?;
        if self.root_indirect_rows == 0 {
            if target >= self.starting_block_size {
                return Err(FormatError::HeapOffsetOutOfRange(target));
            }
            return Ok((root, 0));
        }
        self.locate_in_indirect(data, root, self.root_indirect_rows as usize, 0, target)
    }

    fn locate_in_indirect(
        &self,
        data: &[u8],
        block: u64,
        rows: usize,
        base: u64,
        target: u64,
    ) -> Result<(u64, u64), FormatError> {
        let at = to_index(block)?;
        ensure_len(data, at, 4)?;
        if &data[at..at + 4] != FHIB {
            return Err(FormatError::InvalidFractalHeapSignature);
        }
        let os = self.offset_size as usize;
        let mut pos = at + 5 + os + self.id_offset_bytes();
        let width = self.table_width as usize;
        let direct_rows = self.max_direct_rows();

        for row in 0..rows {
            let size = self.row_block_size(row)?;
            let row_base = base
                .checked_add(self.row_start(row)?)
                .ok_or(FormatError::HeapOffsetOutOfRange(target))?;
            for col in 0..width {
                let child = read_sized(data, pos, self.offset_size)?;
                pos += os;
                let Some(start) = (col as u64)
                    .checked_mul(size)
                    .and_then(|o| row_base.checked_add(o))
                else {
                    return Err(FormatError::HeapOffsetOutOfRange(target));
                };
                if target < start || target - start >= size {
                    continue;
                }
                if is_undefined(child, self.offset_size) {
                    return Err(FormatError::HeapOffsetOutOfRange(target));
                }
                if row < direct_rows {
                    return Ok((child, start));
                }
                let span = self.row_start(1)?;
                let child_rows = size
                    .trailing_zeros()
                    .checked_sub(span.trailing_zeros())
                    .ok_or(FormatError::HeapOffsetOutOfRange(target))? as usize
                    + 1;
                return self.locate_in_indirect(data, child, child_rows, start, target);
            }
        }
        Err(FormatError::HeapOffsetOutOfRange(target))
    }
}
