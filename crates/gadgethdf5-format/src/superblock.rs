//! HDF5 superblock parsing, versions 0 through 3.

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::signature::HDF5_SIGNATURE;
use crate::util::{ensure_len, read_sized, read_u16, read_u32};

/// The fields of a superblock that locating objects needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Superblock {
    /// Superblock version (0 to 3).
    pub version: u8,
    /// Size of file addresses in bytes (2, 4, or 8).
    pub offset_size: u8,
    /// Size of length fields in bytes (2, 4, or 8).
    pub length_size: u8,
    /// Absolute address every other address is relative to.
    pub base_address: u64,
    /// End-of-file address.
    pub eof_address: u64,
    /// Object header address of the root group.
    pub root_group_address: u64,
    /// Symbol-table leaf K; absent from version 2 on.
    pub group_leaf_node_k: Option<u16>,
    /// Symbol-table internal K; absent from version 2 on.
    pub group_internal_node_k: Option<u16>,
    /// Consistency flags as stored; never interpreted.
    pub consistency_flags: u32,
    /// Extension object header, when one is recorded.
    pub extension_address: Option<u64>,
}

fn check_widths(offsets: u8, lengths: u8) -> Result<(), FormatError> {
    let ok = |w: u8| matches!(w, 2 | 4 | 8);
    match (ok(offsets), ok(lengths)) {
        (false, _) => Err(FormatError::InvalidOffsetSize(offsets)),
        (_, false) => Err(FormatError::InvalidLengthSize(lengths)),
        _ => Ok(()),
    }
}

impl Superblock {
    /// Parse the superblock whose signature starts at `signature_offset`.
    pub fn parse(data: &[u8], at: usize) -> Result<Superblock, FormatError> {
        ensure_len(data, at, 9)?;
        let sb = &data[at..];
        if !sb.starts_with(&HDF5_SIGNATURE) {
            return Err(FormatError::SignatureNotFound);
        }
        match sb[8] {
            v @ (0 | 1) => Self::parse_symbol_table_era(sb, v),
            v @ (2 | 3) => Self::parse_checksummed(sb, v),
            other => Err(FormatError::UnsupportedVersion(other)),
        }
    }

    fn parse_symbol_table_era(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        // Fixed part: sig(8) versions(4) reserved... offset/length sizes at 13/14,
        // K values at 16/18, v1 adds indexed-storage K and 2 reserved bytes.
        let fixed = if version == 0 { 24 } else { 28 };
        ensure_len(d, 0, fixed)?;
        let offset_size = d[13];
        let length_size = d[14];
        check_widths(offset_size, length_size)?;

        let leaf_k = read_u16(d, 16)?;
        let internal_k = read_u16(d, 18)?;
        let consistency_flags = read_u32(d, fixed - 4)?;

        let os = offset_size as usize;
        // base, free-space, eof, driver-info addresses, then the root symbol
        // table entry whose second field is the root object header address.
        let mut pos = fixed;
        let base_address = read_sized(d, pos, offset_size)?;
        pos += 2 * os;
        let eof_address = read_sized(d, pos, offset_size)?;
        pos += 2 * os;
        let root_group_address = read_sized(d, pos + os, offset_size)?;

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            group_leaf_node_k: Some(leaf_k),
            group_internal_node_k: Some(internal_k),
            consistency_flags,
            extension_address: None,
        })
    }

    fn parse_checksummed(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        ensure_len(d, 0, 12)?;
        let offset_size = d[9];
        let length_size = d[10];
        check_widths(offset_size, length_size)?;
        let consistency_flags = u32::from(d[11]);

        let os = offset_size as usize;
        let checksum_pos = 12 + 4 * os;
        ensure_len(d, checksum_pos, 4)?;
        let stored = read_u32(d, checksum_pos)?;
        let computed = jenkins_lookup3(&d[..checksum_pos]);
        if stored != computed {
            return Err(FormatError::ChecksumMismatch { expected: stored, computed });
        }

        let base_address = read_sized(d, 12, offset_size)?;
        let extension = read_sized(d, 12 + os, offset_size)?;
        let eof_address = read_sized(d, 12 + 2 * os, offset_size)?;
        let root_group_address = read_sized(d, 12 + 3 * os, offset_size)?;

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            group_leaf_node_k: None,
            group_internal_node_k: None,
            consistency_flags,
            extension_address: (!crate::util::is_undefined(extension, offset_size))
                .then_some(extension),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v0_bytes(root: u64) -> Vec<u8> {
        let mut d = Vec::new();
        d.extend_from_slice(&HDF5_SIGNATURE);
        d.extend_from_slice(&[0, 0, 0, 0, 0, 8, 8, 0]);
        d.extend_from_slice(&4u16.to_le_bytes());
        d.extend_from_slice(&16u16.to_le_bytes());
        d.extend_from_slice(&0u32.to_le_bytes());
        d.extend_from_slice(&0u64.to_le_bytes()); // base
        d.extend_from_slice(&u64::MAX.to_le_bytes()); // free space
        d.extend_from_slice(&4096u64.to_le_bytes()); // eof
        d.extend_from_slice(&u64::MAX.to_le_bytes()); // driver
        d.extend_from_slice(&0u64.to_le_bytes()); // link name offset
        d.extend_from_slice(&root.to_le_bytes());
        d.extend_from_slice(&[0u8; 24]);
        d
    }

    fn v2_bytes(root: u64) -> Vec<u8> {
        let mut d = Vec::new();
        d.extend_from_slice(&HDF5_SIGNATURE);
        d.extend_from_slice(&[2, 8, 8, 0]);
        d.extend_from_slice(&0u64.to_le_bytes());
        d.extend_from_slice(&u64::MAX.to_le_bytes());
        d.extend_from_slice(&1000u64.to_le_bytes());
        d.extend_from_slice(&root.to_le_bytes());
        let sum = jenkins_lookup3(&d);
        d.extend_from_slice(&sum.to_le_bytes());
        d
    }

    #[test]
    fn parse_v0() {
        let sb = Superblock::parse(&v0_bytes(96), 0).unwrap();
        assert_eq!((sb.version, sb.offset_size, sb.length_size), (0, 8, 8));
        assert_eq!((sb.root_group_address, sb.eof_address), (96, 4096));
        assert_eq!((sb.group_leaf_node_k, sb.group_internal_node_k), (Some(4), Some(16)));
    }

    #[test]
    fn parse_v2() {
        let sb = Superblock::parse(&v2_bytes(48), 0).unwrap();
        assert_eq!((sb.version, sb.root_group_address, sb.eof_address), (2, 48, 1000));
        assert_eq!(sb.extension_address, None);
    }

    #[test]
    fn parse_after_user_block() {
        let mut data = vec![0u8; 512];
        data.extend(v2_bytes(48));
        assert_eq!(Superblock::parse(&data, 512).unwrap().root_group_address, 48);
    }

    #[test]
    fn v2_checksum_mismatch() {
        let mut d = v2_bytes(48);
        d[20] ^= 0xFF;
        assert!(matches!(
            Superblock::parse(&d, 0),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut d = v2_bytes(48);
        d[8] = 7;
        assert_eq!(
            Superblock::parse(&d, 0),
            Err(FormatError::UnsupportedVersion(7))
        );
    }

    #[test]
    fn bad_offset_size() {
        let mut d = v0_bytes(96);
        d[13] = 3;
        assert_eq!(
            Superblock::parse(&d, 0),
            Err(FormatError::InvalidOffsetSize(3))
        );
    }

    #[test]
    fn truncated() {
        let d = v0_bytes(96);
        assert!(matches!(
            Superblock::parse(&d[..40], 0),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
