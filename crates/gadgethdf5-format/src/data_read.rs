//! Decoding of raw element bytes into typed values.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::datatype::{Datatype, Endian, StringPadding};
use crate::error::FormatError;
use crate::global_heap::{self, GlobalHeapId};

/// Decoded elements, flattened in storage order.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    Str(Vec<String>),
    /// Member names of an enumeration, one per element.
    Enum(Vec<String>),
}

impl Values {
    /// Number of decoded elements.
    pub fn len(&self) -> usize {
        match self {
            Values::Int(v) => v.len(),
            Values::UInt(v) => v.len(),
            Values::Float(v) => v.len(),
            Values::Str(v) | Values::Enum(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move the elements of `other` onto the end of `self`. Both must be
    /// the same kind.
    pub fn append(&mut self, other: Values) -> Result<(), FormatError> {
        match (self, other) {
            (Values::Int(a), Values::Int(b)) => a.extend(b),
            (Values::UInt(a), Values::UInt(b)) => a.extend(b),
            (Values::Float(a), Values::Float(b)) => a.extend(b),
            (Values::Str(a), Values::Str(b)) | (Values::Enum(a), Values::Enum(b)) => a.extend(b),
            _ => return Err(FormatError::TypeMismatch("appending values of another kind")),
        }
        Ok(())
    }
}

/// Where variable-length data is stored: the whole file plus address widths.
#[derive(Debug, Clone, Copy)]
pub struct HeapContext<'a> {
    pub file: &'a [u8],
    pub offset_size: u8,
    pub length_size: u8,
}

fn elements(raw: &[u8], size: u32) -> Result<core::slice::ChunksExact<'_, u8>, FormatError> {
    let size = size as usize;
    if size == 0 || raw.len() % size != 0 {
        return Err(FormatError::TypeMismatch("data length is not a multiple of the element size"));
    }
    Ok(raw.chunks_exact(size))
}

fn read_unsigned(bytes: &[u8], endian: Endian) -> Result<u64, FormatError> {
    if bytes.len() > 8 {
        return Err(FormatError::TypeMismatch("integer wider than 64 bits"));
    }
    match endian {
        Endian::Little => Ok(LittleEndian::read_uint(bytes, bytes.len())),
        Endian::Big => Ok(BigEndian::read_uint(bytes, bytes.len())),
        Endian::Vax => Err(FormatError::TypeMismatch("VAX byte order")),
    }
}

fn read_signed(bytes: &[u8], endian: Endian) -> Result<i64, FormatError> {
    if bytes.len() > 8 {
        return Err(FormatError::TypeMismatch("integer wider than 64 bits"));
    }
    match endian {
        Endian::Little => Ok(LittleEndian::read_int(bytes, bytes.len())),
        Endian::Big => Ok(BigEndian::read_int(bytes, bytes.len())),
        Endian::Vax => Err(FormatError::TypeMismatch("VAX byte order")),
    }
}

fn read_float(bytes: &[u8], endian: Endian) -> Result<f64, FormatError> {
    match (bytes.len(), endian) {
        (4, Endian::Little) => Ok(LittleEndian::read_f32(bytes) as f64),
        (4, Endian::Big) => Ok(BigEndian::read_f32(bytes) as f64),
        (8, Endian::Little) => Ok(LittleEndian::read_f64(bytes)),
        (8, Endian::Big) => Ok(BigEndian::read_f64(bytes)),
        _ => Err(FormatError::TypeMismatch("unsupported float layout")),
    }
}

fn trim_string(bytes: &[u8], padding: StringPadding) -> String {
    let end = match padding {
        StringPadding::NullTerminate => bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len()),
        StringPadding::NullPad => bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1),
        StringPadding::SpacePad => bytes.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1),
    };
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Decode `raw` (a whole number of elements of `dt`) into values.
///
/// Array types are flattened into their base elements. Variable-length
/// strings are fetched from the global heap through `heap`.
pub fn decode_values(raw: &[u8], dt: &Datatype, heap: HeapContext<'_>) -> Result<Values, FormatError> {
    match dt {
        Datatype::FixedPoint {
            size,
            endian,
            signed: true,
        } => elements(raw, *size)?
            .map(|e| read_signed(e, *endian))
            .collect::<Result<_, _>>()
            .map(Values::Int),
        Datatype::FixedPoint {
            size,
            endian,
            signed: false,
        } => elements(raw, *size)?
            .map(|e| read_unsigned(e, *endian))
            .collect::<Result<_, _>>()
            .map(Values::UInt),
        Datatype::FloatingPoint { size, endian } => elements(raw, *size)?
            .map(|e| read_float(e, *endian))
            .collect::<Result<_, _>>()
            .map(Values::Float),
        Datatype::String { size, padding, .. } => Ok(Values::Str(
            elements(raw, *size)?.map(|e| trim_string(e, *padding)).collect(),
        )),
        Datatype::VariableLength {
            size,
            string: Some((padding, _)),
            ..
        } => elements(raw, *size)?
            .map(|e| {
                let (len, id) = GlobalHeapId::parse_vlen(e, heap.offset_size)?;
                if len == 0 || id.collection == 0 {
                    return Ok(String::new());
                }
                let bytes = global_heap::read_object(heap.file, id, heap.length_size)?;
                let bytes = &bytes[..(len as usize).min(bytes.len())];
                Ok(trim_string(bytes, *padding))
            })
            .collect::<Result<_, _>>()
            .map(Values::Str),
        Datatype::Enumeration {
            size,
            base,
            members,
        } => {
            let endian = match base.as_ref() {
                Datatype::FixedPoint { endian, .. } => *endian,
                _ => return Err(FormatError::TypeMismatch("enumeration over a non-integer base")),
            };
            elements(raw, *size)?
                .map(|e| {
                    let value = read_unsigned(e, endian)?;
                    members
                        .iter()
                        .find(|m| read_unsigned(&m.value, endian).is_ok_and(|v| v == value))
                        .map(|m| m.name.clone())
                        .ok_or(FormatError::TypeMismatch("value is not an enumeration member"))
                })
                .collect::<Result<_, _>>()
                .map(Values::Enum)
        }
        Datatype::Array { base, .. } => decode_values(raw, base, heap),
        _ => Err(FormatError::TypeMismatch("datatype class cannot be decoded")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::{CharacterSet, EnumMember};

    const NO_HEAP: HeapContext<'static> = HeapContext {
        file: &[],
        offset_size: 8,
        length_size: 8,
    };

    #[test]
    fn little_endian_ints() {
        let raw: Vec<u8> = [-3i32, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(
            decode_values(&raw, &Datatype::integer(4, true), NO_HEAP).unwrap(),
            Values::Int(vec![-3, 7])
        );
    }

    #[test]
    fn big_endian_unsigned() {
        let dt = Datatype::FixedPoint {
            size: 2,
            endian: Endian::Big,
            signed: false,
        };
        assert_eq!(
            decode_values(&[0x01, 0x02], &dt, NO_HEAP).unwrap(),
            Values::UInt(vec![0x0102])
        );
    }

    #[test]
    fn floats_of_both_widths() {
        let raw = 0.5f32.to_le_bytes();
        assert_eq!(
            decode_values(&raw, &Datatype::float(4), NO_HEAP).unwrap(),
            Values::Float(vec![0.5])
        );
        let be = Datatype::FloatingPoint {
            size: 8,
            endian: Endian::Big,
        };
        assert_eq!(
            decode_values(&2.25f64.to_be_bytes(), &be, NO_HEAP).unwrap(),
            Values::Float(vec![2.25])
        );
    }

    #[test]
    fn string_padding_rules() {
        let pad = |padding| Datatype::String {
            size: 6,
            padding,
            charset: CharacterSet::Ascii,
        };
        assert_eq!(
            decode_values(b"ab\0cd\0", &pad(StringPadding::NullTerminate), NO_HEAP).unwrap(),
            Values::Str(vec!["ab".into()])
        );
        assert_eq!(
            decode_values(b"ab\0cd\0", &pad(StringPadding::NullPad), NO_HEAP).unwrap(),
            Values::Str(vec!["ab\0cd".into()])
        );
        assert_eq!(
            decode_values(b"gas   ", &pad(StringPadding::SpacePad), NO_HEAP).unwrap(),
            Values::Str(vec!["gas".into()])
        );
    }

    #[test]
    fn enum_names() {
        let dt = Datatype::Enumeration {
            size: 1,
            base: Box::new(Datatype::integer(1, true)),
            members: vec![
                EnumMember {
                    name: "FALSE".into(),
                    value: vec![0],
                },
                EnumMember {
                    name: "TRUE".into(),
                    value: vec![1],
                },
            ],
        };
        assert_eq!(
            decode_values(&[1, 0], &dt, NO_HEAP).unwrap(),
            Values::Enum(vec!["TRUE".into(), "FALSE".into()])
        );
        assert!(decode_values(&[5], &dt, NO_HEAP).is_err());
    }

    #[test]
    fn vlen_string_from_global_heap() {
        let mut file = vec![0u8; 16];
        file.extend_from_slice(b"GCOL\x01\0\0\0");
        file.extend_from_slice(&56u64.to_le_bytes());
        file.extend_from_slice(&1u16.to_le_bytes());
        file.extend_from_slice(&[1, 0, 0, 0, 0, 0]);
        file.extend_from_slice(&5u64.to_le_bytes());
        file.extend_from_slice(b"hello\0\0\0");
        file.extend_from_slice(&[0u8; 16]);
        let dt = Datatype::VariableLength {
            size: 16,
            string: Some((StringPadding::NullTerminate, CharacterSet::Utf8)),
            base: Box::new(Datatype::integer(1, false)),
        };
        let element = |collection: u64| {
            let mut raw = 5u32.to_le_bytes().to_vec();
            raw.extend_from_slice(&collection.to_le_bytes());
            raw.extend_from_slice(&1u32.to_le_bytes());
            raw
        };
        let ctx = HeapContext {
            file: &file,
            offset_size: 8,
            length_size: 8,
        };
        assert_eq!(
            decode_values(&element(16), &dt, ctx).unwrap(),
            Values::Str(vec!["hello".into()])
        );
        assert_eq!(
            decode_values(&element(0), &dt, ctx).unwrap(),
            Values::Str(vec![String::new()])
        );
    }

    #[test]
    fn array_flattens_to_base() {
        let dt = Datatype::Array {
            size: 16,
            dims: vec![2],
            base: Box::new(Datatype::float(8)),
        };
        let raw: Vec<u8> = [1.0f64, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(
            decode_values(&raw, &dt, NO_HEAP).unwrap(),
            Values::Float(vec![1.0, 2.0])
        );
    }

    #[test]
    fn opaque_is_rejected() {
        let dt = Datatype::Opaque {
            size: 4,
            tag: String::new(),
        };
        assert!(matches!(
            decode_values(&[0; 4], &dt, NO_HEAP),
            Err(FormatError::TypeMismatch(_))
        ));
    }

    #[test]
    fn append_keeps_kind() {
        let mut v = Values::Float(vec![1.0]);
        v.append(Values::Float(vec![2.0, 3.0])).unwrap();
        assert_eq!(v, Values::Float(vec![1.0, 2.0, 3.0]));
        assert!(v.append(Values::Int(vec![4])).is_err());
    }
}
