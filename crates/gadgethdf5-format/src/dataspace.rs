//! Dataspace message (type 0x0001) parsing and encoding.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::error::FormatError;
use crate::util::{ensure_len, push_uint, read_sized};

/// Shape class of a dataspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceKind {
    Scalar,
    Simple,
    Null,
}

/// A parsed dataspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    pub kind: DataspaceKind,
    /// Current dimension sizes (empty for scalar and null spaces).
    pub dims: Vec<u64>,
    /// Maximum dimension sizes, when stored.
    pub max_dims: Option<Vec<u64>>,
}

impl Dataspace {
    /// A scalar (single element) dataspace.
    pub fn scalar() -> Dataspace {
        Dataspace {
            kind: DataspaceKind::Scalar,
            dims: Vec::new(),
            max_dims: None,
        }
    }

    /// A simple dataspace with fixed dimensions.
    pub fn simple(dims: &[u64]) -> Dataspace {
        Dataspace {
            kind: DataspaceKind::Simple,
            dims: dims.to_vec(),
            max_dims: None,
        }
    }

    /// Parse a version 1 or 2 dataspace message.
    pub fn parse(data: &[u8], length_size: u8) -> Result<Dataspace, FormatError> {
        ensure_len(data, 0, 4)?;
        let version = data[0];
        let rank = data[1] as usize;
        let flags = data[2];
        let (kind, mut pos) = match version {
            // v1 has no type byte; rank 0 means scalar.
            1 => (
                if rank == 0 {
                    DataspaceKind::Scalar
                } else {
                    DataspaceKind::Simple
                },
                8,
            ),
            2 => (
                match data[3] {
                    0 => DataspaceKind::Scalar,
                    1 => DataspaceKind::Simple,
                    2 => DataspaceKind::Null,
                    other => return Err(FormatError::InvalidDataspaceType(other)),
                },
                4,
            ),
            other => return Err(FormatError::InvalidDataspaceVersion(other)),
        };

        let ls = length_size as usize;
        let read_dims = |pos: &mut usize| -> Result<Vec<u64>, FormatError> {
            let mut dims = Vec::with_capacity(rank);
            for _ in 0..rank {
                dims.push(read_sized(data, *pos, length_size)?);
                *pos += ls;
            }
            Ok(dims)
        };
        let dims = read_dims(&mut pos)?;
        let max_dims = if flags & 0x01 != 0 {
            Some(read_dims(&mut pos)?)
        } else {
            None
        };

        Ok(Dataspace {
            kind,
            dims,
            max_dims,
        })
    }

    /// Number of elements (0 for a null space, 1 for a scalar).
    pub fn num_elements(&self) -> Result<u64, FormatError> {
        match self.kind {
            DataspaceKind::Null => Ok(0),
            DataspaceKind::Scalar => Ok(1),
            DataspaceKind::Simple => self
                .dims
                .iter()
                .try_fold(1u64, |n, &d| n.checked_mul(d))
                .ok_or(FormatError::SizeOverflow("dataspace size")),
        }
    }

    /// Bytes taken by the elements of this space at `element_size` each.
    pub fn byte_len(&self, element_size: u32) -> Result<usize, FormatError> {
        usize::try_from(self.num_elements()?)
            .ok()
            .and_then(|n| n.checked_mul(element_size as usize))
            .ok_or(FormatError::SizeOverflow("dataspace size"))
    }

    /// Extent of the first dimension: 0 for a null space, 1 for a scalar.
    pub fn rows(&self) -> u64 {
        match self.kind {
            DataspaceKind::Null => 0,
            DataspaceKind::Scalar => 1,
            DataspaceKind::Simple => self.dims.first().copied().unwrap_or(1),
        }
    }

    /// True for rank-0 spaces.
    pub fn is_scalar(&self) -> bool {
        self.kind == DataspaceKind::Scalar
    }

    /// Encode as a version 2 dataspace message.
    pub fn serialize(&self, length_size: u8) -> Vec<u8> {
        let kind = match self.kind {
            DataspaceKind::Scalar => 0,
            DataspaceKind::Simple => 1,
            DataspaceKind::Null => 2,
        };
        let flags = u8::from(self.max_dims.is_some());
        let mut out = vec![2, self.dims.len() as u8, flags, kind];
        for &d in &self.dims {
            push_uint(&mut out, d, length_size as usize);
        }
        for &d in self.max_dims.iter().flatten() {
            push_uint(&mut out, d, length_size as usize);
        }
        out
    }
}
