//! Little-endian field readers shared by the structure parsers.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

/// Fail with `UnexpectedEof` unless `data[pos..pos + needed]` is in bounds.
pub(crate) fn ensure_len(data: &[u8], pos: usize, needed: usize) -> Result<(), FormatError> {
    match pos.checked_add(needed) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(FormatError::UnexpectedEof {
            expected: pos.saturating_add(needed),
            available: data.len(),
        }),
    }
}

/// Read a little-endian unsigned integer of 1 to 8 bytes.
pub(crate) fn read_uint(data: &[u8], pos: usize, width: usize) -> Result<u64, FormatError> {
    if !(1..=8).contains(&width) {
        return Err(FormatError::InvalidFieldWidth(width));
    }
    ensure_len(data, pos, width)?;
    Ok(LittleEndian::read_uint(&data[pos..pos + width], width))
}

pub(crate) fn read_u8(data: &[u8], pos: usize) -> Result<u8, FormatError> {
    ensure_len(data, pos, 1)?;
    Ok(data[pos])
}

pub(crate) fn read_u16(data: &[u8], pos: usize) -> Result<u16, FormatError> {
    ensure_len(data, pos, 2)?;
    Ok(LittleEndian::read_u16(&data[pos..]))
}

pub(crate) fn read_u32(data: &[u8], pos: usize) -> Result<u32, FormatError> {
    ensure_len(data, pos, 4)?;
    Ok(LittleEndian::read_u32(&data[pos..]))
}

pub(crate) fn read_u64(data: &[u8], pos: usize) -> Result<u64, FormatError> {
    ensure_len(data, pos, 8)?;
    Ok(LittleEndian::read_u64(&data[pos..]))
}

/// Read a file address or length field whose width comes from the superblock.
pub(crate) fn read_sized(data: &[u8], pos: usize, size: u8) -> Result<u64, FormatError> {
    read_uint(data, pos, size as usize)
}

/// True when `value` is the all-ones "undefined address" for a field of `size` bytes.
pub(crate) fn is_undefined(value: u64, size: u8) -> bool {
    if size >= 8 {
        value == u64::MAX
    } else {
        value == (1u64 << (size as u32 * 8)) - 1
    }
}

/// Number of bytes needed to hold `value` (at least one).
pub(crate) fn bytes_needed(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

/// Convert a file address to a slice index.
pub(crate) fn to_index(addr: u64) -> Result<usize, FormatError> {
    usize::try_from(addr).map_err(|_| FormatError::UnexpectedEof {
        expected: usize::MAX,
        available: 0,
    })
}

/// Append `value` as a little-endian integer of `width` bytes.
pub(crate) fn push_uint(buf: &mut Vec<u8>, value: u64, width: usize) {
    buf.extend_from_slice(&value.to_le_bytes()[..width]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_odd_widths() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(read_uint(&data, 0, 3).unwrap(), 0x030201);
        assert_eq!(read_uint(&data, 1, 1).unwrap(), 0x02);
        assert_eq!(read_uint(&data, 0, 5).unwrap(), 0x0504030201);
    }

    #[test]
    fn rejects_out_of_bounds() {
        let data = [0u8; 4];
        assert!(matches!(
            read_u64(&data, 0),
            Err(FormatError::UnexpectedEof {
                expected: 8,
                available: 4
            })
        ));
        assert!(ensure_len(&data, usize::MAX, 2).is_err());
    }

    #[test]
    fn rejects_bad_width() {
        assert_eq!(
            read_uint(&[0u8; 16], 0, 9),
            Err(FormatError::InvalidFieldWidth(9))
        );
    }

    #[test]
    fn undefined_addresses() {
        assert!(is_undefined(u64::MAX, 8));
        assert!(is_undefined(0xFFFF_FFFF, 4));
        assert!(!is_undefined(0xFFFF_FFFE, 4));
        assert!(is_undefined(0xFFFF, 2));
    }

    #[test]
    fn byte_widths() {
        assert_eq!(bytes_needed(0), 1);
        assert_eq!(bytes_needed(255), 1);
        assert_eq!(bytes_needed(256), 2);
        assert_eq!(bytes_needed(u64::MAX), 8);
    }
}
