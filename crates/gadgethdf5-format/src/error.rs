//! Failures while decoding or encoding on-disk HDF5 structures.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use core::fmt;

/// Everything that can go wrong below the `File`/`Group` layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// No signature at 0, 512, 1024, ... within the data.
    SignatureNotFound,
    /// Superblock version above 3.
    UnsupportedVersion(u8),
    /// A structure runs past the end of the data.
    UnexpectedEof {
        /// Bytes the structure needs.
        expected: usize,
        /// Bytes left.
        available: usize,
    },
    /// Address width other than 2, 4 or 8.
    InvalidOffsetSize(u8),
    /// Length width other than 2, 4 or 8.
    InvalidLengthSize(u8),
    /// Integer field width outside 1..=8 bytes.
    InvalidFieldWidth(usize),
    /// `OHDR` missing where a v2 header was expected.
    InvalidObjectHeaderSignature,
    /// Object header version other than 1 or 2.
    InvalidObjectHeaderVersion(u8),
    /// A message we cannot decode, flagged fail-if-unknown.
    UnsupportedMessage(u16),
    /// Jenkins lookup3 checksum mismatch.
    ChecksumMismatch {
        /// Stored value.
        expected: u32,
        /// Value over the bytes read.
        computed: u32,
    },
    /// Unknown datatype class.
    InvalidDatatypeClass(u8),
    /// Unsupported datatype version for a class.
    InvalidDatatypeVersion {
        /// Datatype class.
        class: u8,
        /// Version found.
        version: u8,
    },
    /// Unknown string padding type.
    InvalidStringPadding(u8),
    /// Unknown character set.
    InvalidCharacterSet(u8),
    /// Unknown byte order bit pattern.
    InvalidByteOrder(u8),
    /// Unsupported dataspace version.
    InvalidDataspaceVersion(u8),
    /// Unknown dataspace type.
    InvalidDataspaceType(u8),
    /// Unsupported attribute message version.
    InvalidAttributeVersion(u8),
    /// Unsupported attribute info message version.
    InvalidAttributeInfoVersion(u8),
    /// Unsupported link message version.
    InvalidLinkVersion(u8),
    /// Unknown link type.
    InvalidLinkType(u8),
    /// Unsupported link info message version.
    InvalidLinkInfoVersion(u8),
    /// Unsupported symbol table message contents.
    InvalidSymbolTableNodeSignature,
    /// Unsupported symbol table node version.
    InvalidSymbolTableNodeVersion(u8),
    /// Local heap signature `HEAP` missing.
    InvalidLocalHeapSignature,
    /// Unsupported local heap version.
    InvalidLocalHeapVersion(u8),
    /// B-tree v1 signature `TREE` missing.
    InvalidBTreeSignature,
    /// B-tree v1 node type other than the one requested.
    InvalidBTreeNodeType(u8),
    /// B-tree v2 signature (`BTHD`, `BTIN`, `BTLF`) missing.
    InvalidBTreeV2Signature,
    /// Unsupported B-tree v2 version.
    InvalidBTreeV2Version(u8),
    /// Fractal heap signature (`FRHP`, `FHDB`, `FHIB`) missing.
    InvalidFractalHeapSignature,
    /// Unsupported fractal heap version.
    InvalidFractalHeapVersion(u8),
    /// Heap ID type other than managed.
    UnsupportedHeapIdType(u8),
    /// The fractal heap uses I/O filters, which are not decoded.
    FilteredHeapUnsupported,
    /// Fractal heap offset that lies outside every block.
    HeapOffsetOutOfRange(u64),
    /// Global heap collection signature `GCOL` missing.
    InvalidGlobalHeapSignature,
    /// Object index not present in a global heap collection.
    GlobalHeapObjectNotFound(u64),
    /// A message is stored in the shared-message heap.
    SharedMessageUnsupported,
    /// A path component does not exist.
    PathNotFound(String),
    /// The object is not a group.
    NotAGroup(String),
    /// Data cannot be decoded as the requested type.
    TypeMismatch(&'static str),
    /// A datatype needed for decoding is absent from the object header.
    MissingMessage(&'static str),
    /// A size or offset computed from file fields does not fit in memory.
    SizeOverflow(&'static str),
    /// Data layout message version other than 3 or 4.
    InvalidLayoutVersion(u8),
    /// Unknown data layout class.
    InvalidLayoutClass(u8),
    /// A layout class whose data is not read (chunked, virtual).
    LayoutUnsupported(&'static str),
    /// Stored data is shorter than its dataspace and datatype require.
    DataSizeMismatch {
        /// Bytes required.
        expected: usize,
        /// Bytes stored.
        actual: usize,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureNotFound => write!(f, "HDF5 signature not found"),
            FormatError::UnsupportedVersion(v) => write!(f, "unsupported superblock version: {v}"),
            FormatError::UnexpectedEof {
                expected,
                available,
            } => write!(
                f,
                "unexpected end of data: need {expected} bytes, have {available}"
            ),
            FormatError::InvalidOffsetSize(s) => write!(f, "invalid offset size: {s}"),
            FormatError::InvalidLengthSize(s) => write!(f, "invalid length size: {s}"),
            FormatError::InvalidFieldWidth(s) => write!(f, "invalid integer field width: {s}"),
            FormatError::InvalidObjectHeaderSignature => f.write_str("bad object header signature"),
            FormatError::InvalidObjectHeaderVersion(v) => write!(f, "object header version {v}"),
            FormatError::UnsupportedMessage(t) => {
                write!(f, "unsupported must-understand message type: {t:#06x}")
            }
            FormatError::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum mismatch: stored {expected:#010x}, computed {computed:#010x}"
            ),
            FormatError::InvalidDatatypeClass(c) => write!(f, "invalid datatype class: {c}"),
            FormatError::InvalidDatatypeVersion { class, version } => {
                write!(f, "invalid datatype version {version} for class {class}")
            }
            FormatError::InvalidStringPadding(p) => write!(f, "invalid string padding: {p}"),
            FormatError::InvalidCharacterSet(c) => write!(f, "invalid character set: {c}"),
            FormatError::InvalidByteOrder(b) => write!(f, "invalid byte order: {b}"),
            FormatError::InvalidDataspaceVersion(v) => {
                write!(f, "invalid dataspace version: {v}")
            }
            FormatError::InvalidDataspaceType(t) => write!(f, "invalid dataspace type: {t}"),
            FormatError::InvalidAttributeVersion(v) => {
                write!(f, "invalid attribute message version: {v}")
            }
            FormatError::InvalidAttributeInfoVersion(v) => {
                write!(f, "invalid attribute info version: {v}")
            }
            FormatError::InvalidLinkVersion(v) => write!(f, "invalid link message version: {v}"),
            FormatError::InvalidLinkType(t) => write!(f, "invalid link type: {t}"),
            FormatError::InvalidLinkInfoVersion(v) => write!(f, "invalid link info version: {v}"),
            FormatError::InvalidSymbolTableNodeSignature => {
                write!(f, "invalid symbol table node signature")
            }
            FormatError::InvalidSymbolTableNodeVersion(v) => {
                write!(f, "invalid symbol table node version: {v}")
            }
            FormatError::InvalidLocalHeapSignature => write!(f, "invalid local heap signature"),
            FormatError::InvalidLocalHeapVersion(v) => {
                write!(f, "invalid local heap version: {v}")
            }
            FormatError::InvalidBTreeSignature => write!(f, "invalid B-tree v1 signature"),
            FormatError::InvalidBTreeNodeType(t) => write!(f, "unexpected B-tree v1 node type: {t}"),
            FormatError::InvalidBTreeV2Signature => write!(f, "invalid B-tree v2 signature"),
            FormatError::InvalidBTreeV2Version(v) => write!(f, "invalid B-tree v2 version: {v}"),
            FormatError::InvalidFractalHeapSignature => write!(f, "invalid fractal heap signature"),
            FormatError::InvalidFractalHeapVersion(v) => {
                write!(f, "invalid fractal heap version: {v}")
            }
            FormatError::UnsupportedHeapIdType(t) => {
                write!(f, "unsupported fractal heap ID type: {t}")
            }
            FormatError::FilteredHeapUnsupported => {
                write!(f, "filtered fractal heaps are not supported")
            }
            FormatError::HeapOffsetOutOfRange(o) => {
                write!(f, "fractal heap offset {o} is outside the heap")
            }
            FormatError::InvalidGlobalHeapSignature => {
                write!(f, "invalid global heap collection signature")
            }
            FormatError::GlobalHeapObjectNotFound(i) => {
                write!(f, "global heap object {i} not found")
            }
            FormatError::SharedMessageUnsupported => {
                write!(f, "shared header messages are not supported")
            }
            FormatError::PathNotFound(p) => write!(f, "path not found: {p}"),
            FormatError::NotAGroup(p) => write!(f, "not a group: {p}"),
            FormatError::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            FormatError::MissingMessage(m) => write!(f, "missing {m} message"),
            FormatError::SizeOverflow(what) => write!(f, "{what} overflows the address space"),
            FormatError::InvalidLayoutVersion(v) => write!(f, "invalid data layout version: {v}"),
            FormatError::InvalidLayoutClass(c) => write!(f, "invalid data layout class: {c}"),
            FormatError::LayoutUnsupported(kind) => {
                write!(f, "{kind} dataset layout is not supported")
            }
            FormatError::DataSizeMismatch { expected, actual } => {
                write!(f, "dataset holds {actual} bytes, expected {expected}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
