//! HDF5 file signature detection.

use crate::error::FormatError;

/// The 8-byte HDF5 format signature.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Offsets at which a signature may start in a file of `file_len` bytes:
/// 0, then 512 doubling (a user block shifts the superblock).
pub fn candidate_offsets(file_len: u64) -> impl Iterator<Item = u64> {
    core::iter::once(0u64)
        .chain(core::iter::successors(Some(512u64), |o| o.checked_mul(2)))
        .take_while(move |&o| o.saturating_add(8) <= file_len)
}

/// Locate the signature in `data` and return its byte offset.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    candidate_offsets(data.len() as u64)
        .map(|o| o as usize)
        .find(|&o| data[o..o + 8] == HDF5_SIGNATURE)
        .ok_or(FormatError::SignatureNotFound)
}
