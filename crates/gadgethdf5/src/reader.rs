//! Read-only `File` and `Group` handles.
//!
//! With the `mmap` feature (the default), [`File::open`] maps the file into
//! memory; otherwise the whole file is read into a buffer. The handle owns
//! its storage and releases it on drop.

use std::path::Path;

use gadgethdf5_format::attribute::collect_attributes;
use gadgethdf5_format::data_layout::DataLayout;
use gadgethdf5_format::data_read::{decode_values, HeapContext, Values};
use gadgethdf5_format::dataspace::Dataspace;
use gadgethdf5_format::datatype::Datatype;
use gadgethdf5_format::error::FormatError;
use gadgethdf5_format::group::{self, GroupChild};
use gadgethdf5_format::message_type::MessageType;
use gadgethdf5_format::object_header::ObjectHeader;
use gadgethdf5_format::signature;
use gadgethdf5_format::superblock::Superblock;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::types::AttrValue;

enum FileData {
    Owned(Vec<u8>),
    #[cfg(feature = "mmap")]
    Mmap(memmap2::Mmap),
}

impl FileData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            FileData::Owned(v) => v,
            #[cfg(feature = "mmap")]
            FileData::Mmap(m) => m,
        }
    }
}

/// An open HDF5 file.
pub struct File {
    data: FileData,
    /// Start of the superblock; every file address is relative to it.
    base: usize,
    superblock: Superblock,
}

impl File {
    /// Open `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<File> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening HDF5 file");
        #[cfg(feature = "mmap")]
        {
            let file = std::fs::File::open(path)?;
            // SAFETY: the mapping is read-only; the file must not be
            // truncated by another process while it is open.
            let mmap = unsafe { memmap2::Mmap::map(&file)? };
            Self::from_data(FileData::Mmap(mmap))
        }
        #[cfg(not(feature = "mmap"))]
        {
            Self::from_bytes(std::fs::read(path)?)
        }
    }

    /// Use an in-memory file image.
    pub fn from_bytes(data: Vec<u8>) -> Result<File> {
        Self::from_data(FileData::Owned(data))
    }

    fn from_data(data: FileData) -> Result<File> {
        let bytes = data.as_bytes();
        let base = signature::find_signature(bytes)?;
        let superblock = Superblock::parse(bytes, base)?;
        debug!(
            version = superblock.version,
            base,
            root = superblock.root_group_address,
            "parsed superblock"
        );
        Ok(File {
            data,
            base,
            superblock,
        })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// True when the file is backed by a memory map.
    pub fn is_mmap(&self) -> bool {
        match self.data {
            FileData::Owned(_) => false,
            #[cfg(feature = "mmap")]
            FileData::Mmap(_) => true,
        }
    }

    /// The root group.
    pub fn root(&self) -> Group<'_> {
        Group {
            file: self,
            path: "/".into(),
            address: self.superblock.root_group_address,
        }
    }

    /// The group at a slash-separated path; `/` and `""` are the root.
    pub fn group(&self, path: &str) -> Result<Group<'_>> {
        let address = group::resolve_path(
            self.bytes(),
            self.superblock.root_group_address,
            path,
            self.superblock.offset_size,
            self.superblock.length_size,
        )
        .map_err(|e| match e {
            FormatError::PathNotFound(_) => Error::MissingGroup(path.into()),
            FormatError::NotAGroup(_) => Error::NotAGroup(path.into()),
            other => Error::Format(other),
        })?;
        let header = self.header(address)?;
        if !group::is_group(&header) {
            return Err(Error::NotAGroup(path.into()));
        }
        Ok(Group {
            file: self,
            path: path.into(),
            address,
        })
    }

    /// Addresses in the file are relative to the superblock.
    fn bytes(&self) -> &[u8] {
        &self.data.as_bytes()[self.base..]
    }

    fn header(&self, address: u64) -> Result<ObjectHeader> {
        let bytes = self.bytes();
        let offset = usize::try_from(address).map_err(|_| FormatError::UnexpectedEof {
            expected: usize::MAX,
            available: bytes.len(),
        })?;
        Ok(ObjectHeader::parse(
            bytes,
            offset,
            self.superblock.offset_size,
            self.superblock.length_size,
        )?)
    }

    fn heap(&self) -> HeapContext<'_> {
        HeapContext {
            file: self.bytes(),
            offset_size: self.superblock.offset_size,
            length_size: self.superblock.length_size,
        }
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("size", &self.data.as_bytes().len())
            .field("superblock_version", &self.superblock.version)
            .field("mmap", &self.is_mmap())
            .finish()
    }
}

/// A group inside an open [`File`].
#[derive(Debug, Clone)]
pub struct Group<'f> {
    file: &'f File,
    path: String,
    address: u64,
}

impl<'f> Group<'f> {
    /// The path this group was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Names of all members in iteration order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.children()?.into_iter().map(|c| c.name).collect())
    }

    /// Names of member groups.
    pub fn groups(&self) -> Result<Vec<String>> {
        self.members_where(group::is_group)
    }

    /// Names of member datasets.
    pub fn datasets(&self) -> Result<Vec<String>> {
        self.members_where(|h| h.find(MessageType::DataLayout).is_some())
    }

    /// A direct member group.
    pub fn group(&self, name: &str) -> Result<Group<'f>> {
        let path = self.child_path(name);
        let child = self
            .children()?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::MissingGroup(path.clone()))?;
        let address = child.address.ok_or_else(|| Error::NotAGroup(path.clone()))?;
        if !group::is_group(&self.file.header(address)?) {
            return Err(Error::NotAGroup(path));
        }
        Ok(Group {
            file: self.file,
            path,
            address,
        })
    }

    /// A direct member dataset.
    pub fn dataset(&self, name: &str) -> Result<Dataset<'f>> {
        let path = self.child_path(name);
        let address = self
            .children()?
            .into_iter()
            .find(|c| c.name == name)
            .and_then(|c| c.address)
            .ok_or_else(|| Error::MissingDataset(path.clone()))?;
        let header = self.file.header(address)?;
        if header.find(MessageType::DataLayout).is_none() {
            return Err(Error::NotADataset(path));
        }
        Ok(Dataset {
            file: self.file,
            path,
            header,
        })
    }

    /// All attributes in the file's iteration order.
    pub fn attrs(&self) -> Result<Vec<(String, AttrValue)>> {
        let header = self.file.header(self.address)?;
        let sb = &self.file.superblock;
        let attrs = collect_attributes(self.file.bytes(), &header, sb.offset_size, sb.length_size)?;
        trace!(group = %self.path, count = attrs.len(), "read attributes");
        attrs
            .iter()
            .map(|a| Ok((a.name.clone(), AttrValue::from_attribute(a, self.file.heap())?)))
            .collect()
    }

    /// One attribute by name.
    pub fn attr(&self, name: &str) -> Result<AttrValue> {
        self.attrs()?
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| Error::MissingAttribute(name.into()))
    }

    fn child_path(&self, name: &str) -> String {
        if self.path.ends_with('/') {
            format!("{}{name}", self.path)
        } else {
            format!("{}/{name}", self.path)
        }
    }

    fn children(&self) -> Result<Vec<GroupChild>> {
        let header = self.file.header(self.address)?;
        let sb = &self.file.superblock;
        let children = group::group_children(self.file.bytes(), &header, sb.offset_size, sb.length_size)
            .map_err(|e| match e {
                FormatError::NotAGroup(_) => Error::NotAGroup(self.path.clone()),
                other => Error::Format(other),
            })?;
        trace!(group = %self.path, count = children.len(), "listed members");
        Ok(children)
    }

    fn members_where(&self, pred: impl Fn(&ObjectHeader) -> bool) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for child in self.children()? {
            let Some(address) = child.address else { continue };
            if pred(&self.file.header(address)?) {
                names.push(child.name);
            }
        }
        Ok(names)
    }
}

/// A dataset inside an open [`File`]. Contiguous and compact datasets can
/// be read; chunked ones report [`FormatError::LayoutUnsupported`].
#[derive(Debug)]
pub struct Dataset<'f> {
    file: &'f File,
    path: String,
    header: ObjectHeader,
}

impl<'f> Dataset<'f> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dimensions; empty for a scalar.
    pub fn shape(&self) -> Result<Vec<u64>> {
        Ok(self.dataspace()?.dims)
    }

    pub fn datatype(&self) -> Result<Datatype> {
        let msg = self
            .header
            .find(MessageType::Datatype)
            .ok_or(FormatError::MissingMessage("datatype"))?;
        Ok(Datatype::parse(&msg.data)?.0)
    }

    /// Length of the first dimension; a scalar counts as one row.
    pub fn rows(&self) -> Result<u64> {
        Ok(self.dataspace()?.rows())
    }

    /// Every element, flattened in storage order.
    pub fn read(&self) -> Result<Values> {
        let rows = self.rows()?;
        self.read_rows(0, rows)
    }

    /// `count` rows starting at row `start`. A row is one element of the
    /// first dimension with all of its trailing components, so reading
    /// rows of an `N x 3` block yields `3 * count` values.
    pub fn read_rows(&self, start: u64, count: u64) -> Result<Values> {
        let dataspace = self.dataspace()?;
        let datatype = self.datatype()?;
        let rows = dataspace.rows();
        if start.checked_add(count).map_or(true, |end| end > rows) {
            return Err(Error::RowsOutOfRange {
                path: self.path.clone(),
                start,
                count,
                rows,
            });
        }
        let row_len = Dataspace::simple(dataspace.dims.get(1..).unwrap_or(&[]))
            .byte_len(datatype.size())?;
        let total = dataspace.byte_len(datatype.size())?;
        let span = |n: u64| {
            usize::try_from(n)
                .ok()
                .and_then(|n| n.checked_mul(row_len))
                .ok_or(FormatError::SizeOverflow("row range"))
        };
        let (from, len) = (span(start)?, span(count)?);

        let sb = &self.file.superblock;
        let msg = self
            .header
            .find(MessageType::DataLayout)
            .ok_or(FormatError::MissingMessage("data layout"))?;
        let layout = DataLayout::parse(&msg.data, sb.offset_size, sb.length_size)?;
        let raw = layout.raw_bytes(self.file.bytes(), total)?;
        trace!(dataset = %self.path, start, count, bytes = len, "reading rows");
        Ok(decode_values(
            &raw.as_ref()[from..from + len],
            &datatype,
            self.file.heap(),
        )?)
    }

    fn dataspace(&self) -> Result<Dataspace> {
        let msg = self
            .header
            .find(MessageType::Dataspace)
            .ok_or(FormatError::MissingMessage("dataspace"))?;
        Ok(Dataspace::parse(&msg.data, self.file.superblock.length_size)?)
    }
}
