//! Datatype message (type 0x0003) parsing and encoding.
//!
//! All type classes are parsed so that nested and trailing structures are
//! consumed correctly; value decoding (see [`crate::data_read`]) covers the
//! numeric, string and enumeration classes.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec::Vec};

use crate::error::FormatError;
use crate::util::{ensure_len, read_u32, read_uint};

/// Byte order of numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
    Vax,
}

/// Padding of fixed-length strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringPadding {
    NullTerminate,
    NullPad,
    SpacePad,
}

/// Character encoding of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSet {
    Ascii,
    Utf8,
}

/// A member of a compound datatype.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundMember {
    pub name: String,
    pub byte_offset: u64,
    pub datatype: Datatype,
}

/// A member of an enumeration datatype.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    /// Raw value bytes, as wide as the base type.
    pub value: Vec<u8>,
}

/// A parsed HDF5 datatype.
#[derive(Debug, Clone, PartialEq)]
pub enum Datatype {
    FixedPoint {
        size: u32,
        endian: Endian,
        signed: bool,
    },
    FloatingPoint {
        size: u32,
        endian: Endian,
    },
    Time {
        size: u32,
    },
    String {
        size: u32,
        padding: StringPadding,
        charset: CharacterSet,
    },
    BitField {
        size: u32,
        endian: Endian,
    },
    Opaque {
        size: u32,
        tag: String,
    },
    Compound {
        size: u32,
        members: Vec<CompoundMember>,
    },
    Reference {
        size: u32,
    },
    Enumeration {
        size: u32,
        base: Box<Datatype>,
        members: Vec<EnumMember>,
    },
    /// Variable-length sequence, or string when `string` is set.
    VariableLength {
        size: u32,
        string: Option<(StringPadding, CharacterSet)>,
        base: Box<Datatype>,
    },
    Array {
        size: u32,
        dims: Vec<u32>,
        base: Box<Datatype>,
    },
}

fn padding_of(bits: u8) -> Result<StringPadding, FormatError> {
    match bits {
        0 => Ok(StringPadding::NullTerminate),
        1 => Ok(StringPadding::NullPad),
        2 => Ok(StringPadding::SpacePad),
        other => Err(FormatError::InvalidStringPadding(other)),
    }
}

fn charset_of(bits: u8) -> Result<CharacterSet, FormatError> {
    match bits {
        0 => Ok(CharacterSet::Ascii),
        1 => Ok(CharacterSet::Utf8),
        other => Err(FormatError::InvalidCharacterSet(other)),
    }
}

fn endian_of(flags: u8) -> Endian {
    match (flags & 0x40 != 0, flags & 0x01 != 0) {
        (false, false) => Endian::Little,
        (false, true) => Endian::Big,
        (true, _) => Endian::Vax,
    }
}

/// Read a NUL-terminated name at `pos`; returns the name and its length including the NUL.
fn read_name(data: &[u8], pos: usize) -> Result<(String, usize), FormatError> {
    ensure_len(data, pos, 1)?;
    let len = data[pos..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(FormatError::UnexpectedEof {
            expected: data.len() + 1,
            available: data.len(),
        })?;
    let name = String::from_utf8_lossy(&data[pos..pos + len]).into_owned();
    Ok((name, len + 1))
}

fn pad8(n: usize) -> usize {
    n.div_ceil(8) * 8
}

impl Datatype {
    /// Parse a datatype message, returning it with the number of bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Datatype, usize), FormatError> {
        ensure_len(data, 0, 8)?;
        let class = data[0] & 0x0F;
        let version = data[0] >> 4;
        let (f0, f1) = (data[1], data[2]);
        let size = read_u32(data, 4)?;
        let mut pos = 8;

        let dt = match class {
            0 => {
                ensure_len(data, pos, 4)?;
                pos += 4;
                Datatype::FixedPoint {
                    size,
                    endian: endian_of(f0 & 0x01),
                    signed: f0 & 0x08 != 0,
                }
            }
            1 => {
                ensure_len(data, pos, 12)?;
                pos += 12;
                Datatype::FloatingPoint {
                    size,
                    endian: endian_of(f0),
                }
            }
            2 => {
                ensure_len(data, pos, 2)?;
                pos += 2;
                Datatype::Time { size }
            }
            3 => Datatype::String {
                size,
                padding: padding_of(f0 & 0x0F)?,
                charset: charset_of(f0 >> 4)?,
            },
            4 => {
                ensure_len(data, pos, 4)?;
                pos += 4;
                Datatype::BitField {
                    size,
                    endian: endian_of(f0 & 0x01),
                }
            }
            5 => {
                let tag_len = f0 as usize;
                ensure_len(data, pos, tag_len)?;
                let raw = &data[pos..pos + tag_len];
                let end = raw.iter().position(|&b| b == 0).unwrap_or(tag_len);
                let tag = String::from_utf8_lossy(&raw[..end]).into_owned();
                pos += pad8(tag_len);
                Datatype::Opaque { size, tag }
            }
            6 => {
                let count = u16::from_le_bytes([f0, f1]) as usize;
                let mut members = Vec::with_capacity(count);
                for _ in 0..count {
                    let (name, name_len) = read_name(data, pos)?;
                    let byte_offset;
                    match version {
                        1 | 2 => {
                            pos += pad8(name_len);
                            byte_offset = read_u32(data, pos)? as u64;
                            pos += 4;
                            if version == 1 {
                                // dimensionality, reserved, permutation, reserved, 4 dim sizes
                                pos += 1 + 3 + 4 + 4 + 16;
                            }
                        }
                        3 => {
                            pos += name_len;
                            let width = crate::util::bytes_needed(size as u64);
                            byte_offset = read_uint(data, pos, width)?;
                            pos += width;
                        }
                        _ => return Err(FormatError::InvalidDatatypeVersion { class, version }),
                    }
                    ensure_len(data, pos, 0)?;
                    let (datatype, used) = Datatype::parse(&data[pos..])?;
                    pos += used;
                    members.push(CompoundMember {
                        name,
                        byte_offset,
                        datatype,
                    });
                }
                Datatype::Compound { size, members }
            }
            7 => Datatype::Reference { size },
            8 => {
                let count = u16::from_le_bytes([f0, f1]) as usize;
                ensure_len(data, pos, 0)?;
                let (base, used) = Datatype::parse(&data[pos..])?;
                pos += used;
                let mut names = Vec::with_capacity(count);
                for _ in 0..count {
                    let (name, name_len) = read_name(data, pos)?;
                    pos += if version >= 3 { name_len } else { pad8(name_len) };
                    names.push(name);
                }
                let width = base.size() as usize;
                ensure_len(data, pos, width * count)?;
                let members = names
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| EnumMember {
                        name,
                        value: data[pos + i * width..pos + (i + 1) * width].to_vec(),
                    })
                    .collect();
                pos += width * count;
                Datatype::Enumeration {
                    size,
                    base: Box::new(base),
                    members,
                }
            }
            9 => {
                let string = if f0 & 0x0F == 1 {
                    Some((padding_of(f0 >> 4)?, charset_of(f1 & 0x0F)?))
                } else {
                    None
                };
                ensure_len(data, pos, 0)?;
                let (base, used) = Datatype::parse(&data[pos..])?;
                pos += used;
                Datatype::VariableLength {
                    size,
                    string,
                    base: Box::new(base),
                }
            }
            10 => {
                ensure_len(data, pos, 1)?;
                let rank = data[pos] as usize;
                pos += if version >= 3 { 1 } else { 4 };
                let mut dims = Vec::with_capacity(rank);
                for i in 0..rank {
                    dims.push(read_u32(data, pos + 4 * i)?);
                }
                pos += 4 * rank;
                if version < 3 {
                    // permutation indices
                    pos += 4 * rank;
                }
                ensure_len(data, pos, 0)?;
                let (base, used) = Datatype::parse(&data[pos..])?;
                pos += used;
                Datatype::Array {
                    size,
                    dims,
                    base: Box::new(base),
                }
            }
            other => return Err(FormatError::InvalidDatatypeClass(other)),
        };
        Ok((dt, pos))
    }

    /// Size in bytes of one element.
    pub fn size(&self) -> u32 {
        match self {
            Datatype::FixedPoint { size, .. }
            | Datatype::FloatingPoint { size, .. }
            | Datatype::Time { size }
            | Datatype::String { size, .. }
            | Datatype::BitField { size, .. }
            | Datatype::Opaque { size, .. }
            | Datatype::Compound { size, .. }
            | Datatype::Reference { size }
            | Datatype::Enumeration { size, .. }
            | Datatype::VariableLength { size, .. }
            | Datatype::Array { size, .. } => *size,
        }
    }

    /// Human-readable class name.
    pub fn class_name(&self) -> &'static str {
        match self {
            Datatype::FixedPoint { .. } => "integer",
            Datatype::FloatingPoint { .. } => "float",
            Datatype::Time { .. } => "time",
            Datatype::String { .. } => "string",
            Datatype::BitField { .. } => "bitfield",
            Datatype::Opaque { .. } => "opaque",
            Datatype::Compound { .. } => "compound",
            Datatype::Reference { .. } => "reference",
            Datatype::Enumeration { .. } => "enum",
            Datatype::VariableLength { string: Some(_), .. } => "vlen string",
            Datatype::VariableLength { .. } => "vlen sequence",
            Datatype::Array { .. } => "array",
        }
    }

    /// Little-endian signed or unsigned integer of `size` bytes.
    pub fn integer(size: u32, signed: bool) -> Datatype {
        Datatype::FixedPoint {
            size,
            endian: Endian::Little,
            signed,
        }
    }

    /// Little-endian IEEE float of 4 or 8 bytes.
    pub fn float(size: u32) -> Datatype {
        Datatype::FloatingPoint {
            size,
            endian: Endian::Little,
        }
    }

    /// Null-padded ASCII string of fixed width.
    pub fn fixed_string(size: u32) -> Datatype {
        Datatype::String {
            size,
            padding: StringPadding::NullPad,
            charset: CharacterSet::Ascii,
        }
    }

    /// Encode as a version 1 datatype message.
    ///
    /// Only the little-endian numeric and fixed-string classes are written.
    pub fn serialize(&self) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(20);
        match self {
            Datatype::FixedPoint {
                size,
                endian: Endian::Little,
                signed,
            } => {
                out.extend_from_slice(&[0x10, if *signed { 0x08 } else { 0 }, 0, 0]);
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(&0u16.to_le_bytes());
                out.extend_from_slice(&((*size * 8) as u16).to_le_bytes());
            }
            Datatype::FloatingPoint {
                size: size @ (4 | 8),
                endian: Endian::Little,
            } => {
                // (sign bit, exponent location, exponent size, mantissa size, bias)
                let (sign, exp_loc, exp_size, mant_size, bias): (u8, u8, u8, u8, u32) =
                    if *size == 8 {
                        (63, 52, 11, 52, 1023)
                    } else {
                        (31, 23, 8, 23, 127)
                    };
                // mantissa normalization: implied leading one
                out.extend_from_slice(&[0x11, 0x20, sign, 0]);
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(&0u16.to_le_bytes());
                out.extend_from_slice(&((*size * 8) as u16).to_le_bytes());
                out.extend_from_slice(&[exp_loc, exp_size, 0, mant_size]);
                out.extend_from_slice(&bias.to_le_bytes());
            }
            Datatype::String {
                size,
                padding,
                charset,
            } => {
                let pad = match padding {
                    StringPadding::NullTerminate => 0,
                    StringPadding::NullPad => 1,
                    StringPadding::SpacePad => 2,
                };
                let cset = match charset {
                    CharacterSet::Ascii => 0,
                    CharacterSet::Utf8 => 1,
                };
                out.extend_from_slice(&[0x13, pad | (cset << 4), 0, 0]);
                out.extend_from_slice(&size.to_le_bytes());
            }
            _ => return Err(FormatError::TypeMismatch("datatype cannot be encoded")),
        }
        Ok(out)
    }
}
