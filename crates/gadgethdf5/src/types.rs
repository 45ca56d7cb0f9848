//! Attribute values as handed to callers.

use std::fmt;

use gadgethdf5_format::attribute::Attribute;
use gadgethdf5_format::data_read::{decode_values, HeapContext, Values};
use gadgethdf5_format::dataspace::Dataspace;
use gadgethdf5_format::datatype::{Datatype, EnumMember};
use gadgethdf5_format::error::FormatError;

/// A decoded attribute value.
///
/// Scalar variants come from rank-0 dataspaces; the `*Array` variants from
/// simple dataspaces of any rank, flattened in storage order.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Signed integer of any width.
    Int(i64),
    /// Signed integers.
    IntArray(Vec<i64>),
    /// Unsigned integer of any width.
    UInt(u64),
    /// Unsigned integers.
    UIntArray(Vec<u64>),
    /// 32- or 64-bit float, widened.
    Float(f64),
    /// Floats, widened.
    FloatArray(Vec<f64>),
    /// Fixed or variable-length string, padding removed.
    Str(String),
    /// Strings, padding removed.
    StrArray(Vec<String>),
    /// An enumeration with exactly the members `FALSE` and `TRUE`.
    Bool(bool),
    /// Booleans stored as that enumeration.
    BoolArray(Vec<bool>),
    /// A value whose class is not decoded, kept as raw bytes.
    Opaque {
        /// Datatype class name, e.g. `compound`.
        class: &'static str,
        /// The stored bytes.
        bytes: Vec<u8>,
    },
}

/// Members of the two-valued enum h5py uses for booleans.
fn is_bool_enum(members: &[EnumMember]) -> bool {
    let mut names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    names.sort_unstable();
    names == ["FALSE", "TRUE"]
}

impl AttrValue {
    /// Decode an attribute read from a file image `file`.
    pub fn from_attribute(attr: &Attribute, heap: HeapContext<'_>) -> Result<AttrValue, FormatError> {
        let scalar = attr.dataspace.is_scalar();
        let values = match decode_values(&attr.data, &attr.datatype, heap) {
            Ok(v) => v,
            Err(FormatError::TypeMismatch(_)) => {
                return Ok(AttrValue::Opaque {
                    class: attr.datatype.class_name(),
                    bytes: attr.data.clone(),
                })
            }
            Err(e) => return Err(e),
        };
        let bool_enum =
            matches!(&attr.datatype, Datatype::Enumeration { members, .. } if is_bool_enum(members));

        Ok(match values {
            Values::Enum(names) if bool_enum => {
                let flags: Vec<bool> = names.iter().map(|n| n == "TRUE").collect();
                collapse(scalar, flags, AttrValue::Bool, AttrValue::BoolArray)
            }
            Values::Int(v) => collapse(scalar, v, AttrValue::Int, AttrValue::IntArray),
            Values::UInt(v) => collapse(scalar, v, AttrValue::UInt, AttrValue::UIntArray),
            Values::Float(v) => collapse(scalar, v, AttrValue::Float, AttrValue::FloatArray),
            Values::Str(v) | Values::Enum(v) => {
                collapse(scalar, v, AttrValue::Str, AttrValue::StrArray)
            }
        })
    }

    /// Encode as an attribute named `name`, little-endian, 8-byte numbers.
    pub fn to_attribute(&self, name: &str) -> Result<Attribute, FormatError> {
        fn le<T, const N: usize>(v: &[T], f: impl Fn(&T) -> [u8; N]) -> Vec<u8> {
            v.iter().flat_map(f).collect()
        }
        let array = |n: usize| Dataspace::simple(&[n as u64]);
        let (datatype, dataspace, data) = match self {
            AttrValue::Int(v) => (Datatype::integer(8, true), Dataspace::scalar(), v.to_le_bytes().to_vec()),
            AttrValue::IntArray(v) => (Datatype::integer(8, true), array(v.len()), le(v, |x| x.to_le_bytes())),
            AttrValue::UInt(v) => (Datatype::integer(8, false), Dataspace::scalar(), v.to_le_bytes().to_vec()),
            AttrValue::UIntArray(v) => (Datatype::integer(8, false), array(v.len()), le(v, |x| x.to_le_bytes())),
            AttrValue::Float(v) => (Datatype::float(8), Dataspace::scalar(), v.to_le_bytes().to_vec()),
            AttrValue::FloatArray(v) => (Datatype::float(8), array(v.len()), le(v, |x| x.to_le_bytes())),
            AttrValue::Str(s) => {
                let size = s.len().max(1);
                let mut data = s.as_bytes().to_vec();
                data.resize(size, 0);
                (Datatype::fixed_string(size as u32), Dataspace::scalar(), data)
            }
            AttrValue::StrArray(v) => {
                let size = v.iter().map(String::len).max().unwrap_or(0).max(1);
                let mut data = Vec::with_capacity(size * v.len());
                for s in v {
                    let start = data.len();
                    data.extend_from_slice(s.as_bytes());
                    data.resize(start + size, 0);
                }
                (Datatype::fixed_string(size as u32), array(v.len()), data)
            }
            AttrValue::Bool(_) | AttrValue::BoolArray(_) | AttrValue::Opaque { .. } => {
                return Err(FormatError::TypeMismatch("attribute value cannot be encoded"))
            }
        };
        Ok(Attribute::new(name, datatype, dataspace, data))
    }

    /// True for the array variants.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            AttrValue::IntArray(_)
                | AttrValue::UIntArray(_)
                | AttrValue::FloatArray(_)
                | AttrValue::StrArray(_)
                | AttrValue::BoolArray(_)
        )
    }

    /// Number of elements; scalars count as one.
    pub fn len(&self) -> usize {
        match self {
            AttrValue::IntArray(v) => v.len(),
            AttrValue::UIntArray(v) => v.len(),
            AttrValue::FloatArray(v) => v.len(),
            AttrValue::StrArray(v) => v.len(),
            AttrValue::BoolArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer elements as `u64`, or `None` for non-integer values or
    /// negative entries.
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            AttrValue::UInt(v) => Some(vec![*v]),
            AttrValue::UIntArray(v) => Some(v.clone()),
            AttrValue::Int(v) => u64::try_from(*v).ok().map(|v| vec![v]),
            AttrValue::IntArray(v) => v.iter().map(|&x| u64::try_from(x).ok()).collect(),
            _ => None,
        }
    }

    /// Numeric elements as `f64`.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::Float(v) => Some(vec![*v]),
            AttrValue::FloatArray(v) => Some(v.clone()),
            AttrValue::Int(v) => Some(vec![*v as f64]),
            AttrValue::IntArray(v) => Some(v.iter().map(|&x| x as f64).collect()),
            AttrValue::UInt(v) => Some(vec![*v as f64]),
            AttrValue::UIntArray(v) => Some(v.iter().map(|&x| x as f64).collect()),
            _ => None,
        }
    }

    /// The single numeric element of a scalar or one-element array.
    pub fn as_f64(&self) -> Option<f64> {
        match self.as_f64_vec()?.as_slice() {
            [x] => Some(*x),
            _ => None,
        }
    }

    /// The single integer element of a scalar or one-element array.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::IntArray(v) if v.len() == 1 => Some(v[0]),
            AttrValue::UInt(v) => i64::try_from(*v).ok(),
            AttrValue::UIntArray(v) if v.len() == 1 => i64::try_from(v[0]).ok(),
            _ => None,
        }
    }

    /// The value with arrays bracketed, as in `[2 3]`; scalars are unchanged.
    pub fn labelled(&self) -> String {
        if self.is_array() {
            format!("[{self}]")
        } else {
            self.to_string()
        }
    }
}

fn collapse<T>(
    scalar: bool,
    mut values: Vec<T>,
    one: impl FnOnce(T) -> AttrValue,
    many: impl FnOnce(Vec<T>) -> AttrValue,
) -> AttrValue {
    if scalar && values.len() == 1 {
        if let Some(v) = values.pop() {
            return one(v);
        }
    }
    many(values)
}

fn join<T>(f: &mut fmt::Formatter<'_>, items: &[T], each: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        each(f, item)?;
    }
    Ok(())
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// The bare value: scalars as is, arrays space-separated (`2 3`).
/// Floats use `Debug` formatting so whole numbers keep a `.0`.
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::UInt(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v:?}"),
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Bool(b) => f.write_str(py_bool(*b)),
            AttrValue::IntArray(v) => join(f, v, |f, x| write!(f, "{x}")),
            AttrValue::UIntArray(v) => join(f, v, |f, x| write!(f, "{x}")),
            AttrValue::FloatArray(v) => join(f, v, |f, x| write!(f, "{x:?}")),
            AttrValue::StrArray(v) => join(f, v, |f, x| f.write_str(x)),
            AttrValue::BoolArray(v) => join(f, v, |f, x| f.write_str(py_bool(*x))),
            AttrValue::Opaque { class, bytes } => write!(f, "<{class}, {} bytes>", bytes.len()),
        }
    }
}
