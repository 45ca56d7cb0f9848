//! Link message (type 0x0006) parsing and encoding.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec, vec::Vec};

use crate::error::FormatError;
use crate::util::{bytes_needed, ensure_len, push_uint, read_sized, read_u16, read_u64, read_uint};

const FLAG_NAME_WIDTH: u8 = 0x03;
const FLAG_CREATION_ORDER: u8 = 0x04;
const FLAG_LINK_TYPE: u8 = 0x08;
const FLAG_CHARSET: u8 = 0x10;

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Object header address in this file.
    Hard(u64),
    /// Path inside this file.
    Soft(String),
    /// Object in another file.
    External { file: String, path: String },
    /// User-defined link type, kept opaque.
    Other(u8),
}

/// A parsed link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub target: LinkTarget,
    /// Creation order, when the group tracks it.
    pub creation_order: Option<u64>,
}

fn read_text(data: &[u8], pos: usize, len: usize) -> Result<String, FormatError> {
    ensure_len(data, pos, len)?;
    Ok(String::from_utf8_lossy(&data[pos..pos + len]).into_owned())
}

impl Link {
    /// A hard link named `name` pointing at `address`.
    pub fn hard(name: &str, address: u64) -> Link {
        Link {
            name: name.into(),
            target: LinkTarget::Hard(address),
            creation_order: None,
        }
    }

    /// Parse from raw message bytes.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<Link, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 1 {
            return Err(FormatError::InvalidLinkVersion(data[0]));
        }
        let flags = data[1];
        let mut pos = 2;

        let link_type = if flags & FLAG_LINK_TYPE != 0 {
            pos += 1;
            crate::util::read_u8(data, 2)?
        } else {
            0
        };
        let creation_order = if flags & FLAG_CREATION_ORDER != 0 {
            let v = read_u64(data, pos)?;
            pos += 8;
            Some(v)
        } else {
            None
        };
        if flags & FLAG_CHARSET != 0 {
            pos += 1;
        }
        let width = 1usize << (flags & FLAG_NAME_WIDTH);
        let name_len = read_uint(data, pos, width)? as usize;
        pos += width;
        let name = read_text(data, pos, name_len)?;
        pos += name_len;

        let target = match link_type {
            0 => LinkTarget::Hard(read_sized(data, pos, offset_size)?),
            1 => {
                let len = read_u16(data, pos)? as usize;
                LinkTarget::Soft(read_text(data, pos + 2, len)?)
            }
            64 => {
                let len = read_u16(data, pos)? as usize;
                ensure_len(data, pos + 2, len)?;
                // version/flags byte, then two NUL-terminated strings
                let blob = &data[pos + 2..pos + 2 + len];
                let mut parts = blob.get(1..).unwrap_or_default().split(|&b| b == 0);
                let file = String::from_utf8_lossy(parts.next().unwrap_or_default()).into_owned();
                let path = String::from_utf8_lossy(parts.next().unwrap_or_default()).into_owned();
                LinkTarget::External { file, path }
            }
            2..=63 => return Err(FormatError::InvalidLinkType(link_type)),
            other => LinkTarget::Other(other),
        };

        Ok(Link {
            name,
            target,
            creation_order,
        })
    }

    /// Encode as a link message. Only hard and soft links are written.
    pub fn serialize(&self, offset_size: u8) -> Result<Vec<u8>, FormatError> {
        let width = bytes_needed(self.name.len() as u64);
        let width_bits = match width {
            1 => 0,
            2 => 1,
            3 | 4 => 2,
            _ => 3,
        };
        let mut flags = width_bits;
        if self.creation_order.is_some() {
            flags |= FLAG_CREATION_ORDER;
        }
        let soft = matches!(self.target, LinkTarget::Soft(_));
        if soft {
            flags |= FLAG_LINK_TYPE;
        }

        let mut out = vec![1u8, flags];
        if soft {
            out.push(1);
        }
        if let Some(order) = self.creation_order {
            out.extend_from_slice(&order.to_le_bytes());
        }
        push_uint(&mut out, self.name.len() as u64, 1 << width_bits);
        out.extend_from_slice(self.name.as_bytes());
        match &self.target {
            LinkTarget::Hard(addr) => push_uint(&mut out, *addr, offset_size as usize),
            LinkTarget::Soft(path) => {
                out.extend_from_slice(&(path.len() as u16).to_le_bytes());
                out.extend_from_slice(path.as_bytes());
            }
            _ => return Err(FormatError::TypeMismatch("link type cannot be encoded")),
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_link_roundtrip() {
        let link = Link::hard("PartType0", 0x1234);
        let bytes = link.serialize(8).unwrap();
        assert_eq!(bytes[1], 0);
        assert_eq!(Link::parse(&bytes, 8).unwrap(), link);
    }

    #[test]
    fn soft_link_with_order() {
        let link = Link {
            name: "alias".into(),
            target: LinkTarget::Soft("/Header".into()),
            creation_order: Some(3),
        };
        let bytes = link.serialize(8).unwrap();
        assert_eq!(bytes[1], FLAG_CREATION_ORDER | FLAG_LINK_TYPE);
        assert_eq!(Link::parse(&bytes, 8).unwrap(), link);
    }

    #[test]
    fn h5py_style_hard_link_with_charset() {
        // flags: creation order + charset present, 1-byte name length
        let mut b = vec![1u8, 0x14];
        b.extend_from_slice(&7u64.to_le_bytes());
        b.push(1);
        b.push(6);
        b.extend_from_slice(b"Header");
        b.extend_from_slice(&0x320u64.to_le_bytes());
        let link = Link::parse(&b, 8).unwrap();
        assert_eq!(link.name, "Header");
        assert_eq!(link.creation_order, Some(7));
        assert_eq!(link.target, LinkTarget::Hard(0x320));
    }

    #[test]
    fn external_link() {
        let mut b = vec![1u8, 0x08, 64, 4];
        b.extend_from_slice(b"ext!");
        let blob = b"\0other.h5\0/data\0";
        b.extend_from_slice(&(blob.len() as u16).to_le_bytes());
        b.extend_from_slice(blob);
        let link = Link::parse(&b, 8).unwrap();
        assert_eq!(
            link.target,
            LinkTarget::External {
                file: "other.h5".into(),
                path: "/data".into()
            }
        );
    }

    #[test]
    fn bad_version() {
        assert_eq!(
            Link::parse(&[2, 0], 8),
            Err(FormatError::InvalidLinkVersion(2))
        );
    }
}
