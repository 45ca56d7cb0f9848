//! Object header parsing (v1 and v2), following continuation chunks.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::util::{ensure_len, read_sized, read_u16, read_u32, read_uint, to_index};

const OHDR_SIGNATURE: &[u8; 4] = b"OHDR";
const OCHK_SIGNATURE: &[u8; 4] = b"OCHK";

/// v2 header flag: each message carries a 2-byte creation order.
pub const FLAG_ATTR_CREATION_ORDER_TRACKED: u8 = 0x04;
/// v2 header flag: attribute creation order is indexed.
pub const FLAG_ATTR_CREATION_ORDER_INDEXED: u8 = 0x08;
/// v2 header flag: compact/dense attribute thresholds are stored.
pub const FLAG_ATTR_PHASE_CHANGE: u8 = 0x10;
/// v2 header flag: access/modification/change/birth times are stored.
pub const FLAG_TIMES: u8 = 0x20;

/// Message flag: message lives in the shared-message heap.
const MSG_FLAG_SHARED: u8 = 0x02;
/// Message flag: readers must fail if they do not know the type.
const MSG_FLAG_MUST_UNDERSTAND: u8 = 0x80;

/// Upper bound on chunks followed per header, which stops continuation loops.
const MAX_CHUNKS: usize = 4096;

/// A single header message with its raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMessage {
    /// Message type.
    pub msg_type: MessageType,
    /// Message flags byte.
    pub flags: u8,
    /// Creation order (v2 headers that track it).
    pub creation_order: Option<u16>,
    /// Raw message payload.
    pub data: Vec<u8>,
}

impl HeaderMessage {
    /// True when the payload is stored in the shared-message heap.
    pub fn is_shared(&self) -> bool {
        self.flags & MSG_FLAG_SHARED != 0
    }
}

/// A parsed object header.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHeader {
    /// Header version (1 or 2).
    pub version: u8,
    /// v2 header flags (0 for v1).
    pub flags: u8,
    /// Non-nil messages from every chunk, in storage order.
    pub messages: Vec<HeaderMessage>,
    /// Maximum number of compact attributes (v2 with phase-change values).
    pub max_compact_attributes: Option<u16>,
    /// Minimum number of dense attributes (v2 with phase-change values).
    pub min_dense_attributes: Option<u16>,
}

impl ObjectHeader {
    /// Parse the object header at `offset`.
    pub fn parse(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 4)?;
        if &data[offset..offset + 4] == OHDR_SIGNATURE {
            Self::parse_v2(data, offset, offset_size, length_size)
        } else {
            Self::parse_v1(data, offset, offset_size, length_size)
        }
    }

    /// First message of the given type.
    pub fn find(&self, msg_type: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }

    /// All messages of the given type, in storage order.
    pub fn messages_of(&self, msg_type: MessageType) -> impl Iterator<Item = &HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == msg_type)
    }

    /// True when attribute creation order is tracked in this header.
    pub fn tracks_attribute_order(&self) -> bool {
        self.version == 2 && self.flags & FLAG_ATTR_CREATION_ORDER_TRACKED != 0
    }

    fn parse_v1(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 16)?;
        let version = data[offset];
        if version != 1 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let header_size = read_u32(data, offset + 8)? as usize;

        let mut messages = Vec::new();
        // The prefix is 12 bytes, padded so messages start 8-aligned.
        let mut chunks = vec![(offset + 16, header_size)];
        let mut next = 0;
        while next < chunks.len() {
            if next >= MAX_CHUNKS {
                return Err(FormatError::InvalidObjectHeaderSignature);
            }
            let (start, len) = chunks[next];
            next += 1;
            ensure_len(data, start, len)?;
            let end = start + len;
            let mut pos = start;
            while pos + 8 <= end {
                let raw_type = read_u16(data, pos)?;
                let size = read_u16(data, pos + 2)? as usize;
                let flags = data[pos + 4];
                pos += 8;
                ensure_len(data, pos, size)?;
                let body = &data[pos..pos + size];
                pos += size;
                if let Some(chunk) =
                    Self::accept(&mut messages, raw_type, flags, None, body, offset_size, length_size)?
                {
                    chunks.push(chunk);
                }
            }
        }

        Ok(ObjectHeader {
            version,
            flags: 0,
            messages,
            max_compact_attributes: None,
            min_dense_attributes: None,
        })
    }

    fn parse_v2(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 6)?;
        let version = data[offset + 4];
        if version != 2 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let flags = data[offset + 5];
        let mut pos = offset + 6;
        if flags & FLAG_TIMES != 0 {
            pos += 16;
        }
        let (mut max_compact, mut min_dense) = (None, None);
        if flags & FLAG_ATTR_PHASE_CHANGE != 0 {
            max_compact = Some(read_u16(data, pos)?);
            min_dense = Some(read_u16(data, pos + 2)?);
            pos += 4;
        }
        let width = 1usize << (flags & 0x03);
        let chunk0_len = read_uint(data, pos, width)? as usize;
        pos += width;

        let tracked = flags & FLAG_ATTR_CREATION_ORDER_TRACKED != 0;
        let chunk0_end = pos
            .checked_add(chunk0_len)
            .ok_or(FormatError::SizeOverflow("object header chunk"))?;
        verify_chunk(data, offset, chunk0_end)?;

        let mut messages = Vec::new();
        let mut chunks = vec![(pos, chunk0_len)];
        let mut next = 0;
        while next < chunks.len() {
            if next >= MAX_CHUNKS {
                return Err(FormatError::InvalidObjectHeaderSignature);
            }
            let (start, len) = chunks[next];
            next += 1;
            ensure_len(data, start, len)?;
            let end = start + len;
            let prefix = if tracked { 6 } else { 4 };
            let mut p = start;
            // Trailing bytes shorter than a message prefix are a gap.
            while p + prefix <= end {
                let raw_type = data[p] as u16;
                let size = read_u16(data, p + 1)? as usize;
                let msg_flags = data[p + 3];
                let creation_order = if tracked {
                    Some(read_u16(data, p + 4)?)
                } else {
                    None
                };
                p += prefix;
                ensure_len(data, p, size)?;
                let body = &data[p..p + size];
                p += size;
                if let Some((addr, clen)) = Self::accept(
                    &mut messages,
                    raw_type,
                    msg_flags,
                    creation_order,
                    body,
                    offset_size,
                    length_size,
                )? {
                    ensure_len(data, addr, 4)?;
                    if &data[addr..addr + 4] != OCHK_SIGNATURE || clen < 8 {
                        return Err(FormatError::InvalidObjectHeaderSignature);
                    }
                    let sum_at = addr
                        .checked_add(clen - 4)
                        .ok_or(FormatError::SizeOverflow("continuation chunk"))?;
                    verify_chunk(data, addr, sum_at)?;
                    chunks.push((addr + 4, clen - 8));
                }
            }
        }

        Ok(ObjectHeader {
            version,
            flags,
            messages,
            max_compact_attributes: max_compact,
            min_dense_attributes: min_dense,
        })
    }

    /// Record one message; a continuation yields the next chunk to visit.
    fn accept(
        messages: &mut Vec<HeaderMessage>,
        raw_type: u16,
        flags: u8,
        creation_order: Option<u16>,
        body: &[u8],
        offset_size: u8,
        length_size: u8,
    ) -> Result<Option<(usize, usize)>, FormatError> {
        let msg_type = MessageType::from_u16(raw_type);
        match msg_type {
            MessageType::Nil => Ok(None),
            MessageType::Continuation => {
                let addr = read_sized(body, 0, offset_size)?;
                let len = read_sized(body, offset_size as usize, length_size)?;
                Ok(Some((to_index(addr)?, to_index(len)?)))
            }
            MessageType::Unknown(raw) if flags & MSG_FLAG_MUST_UNDERSTAND != 0 => {
                Err(FormatError::UnsupportedMessage(raw))
            }
            _ => {
                messages.push(HeaderMessage {
                    msg_type,
                    flags,
                    creation_order,
                    data: body.to_vec(),
                });
                Ok(None)
            }
        }
    }
}

/// Check the lookup3 checksum stored right after `data[start..end]`.
fn verify_chunk(data: &[u8], start: usize, end: usize) -> Result<(), FormatError> {
    let stored = read_u32(data, end)?;
    let computed = jenkins_lookup3(&data[start..end]);
    if stored != computed {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(())
}
