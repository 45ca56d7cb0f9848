//! Byte-level HDF5 parsing for Gadget snapshot files.
//!
//! Every parser works on a borrowed slice of the whole file, so callers can
//! hand in either a memory map or an owned buffer. The crate builds without
//! `std` (only `alloc` is needed) when the default `std` feature is off.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod attribute;
pub mod attribute_info;
pub mod btree_v1;
pub mod btree_v2;
pub mod checksum;
pub mod data_layout;
pub mod data_read;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod file_writer;
pub mod fractal_heap;
pub mod global_heap;
pub mod group;
pub mod group_v1;
pub mod group_v2;
pub mod link_info;
pub mod link_message;
pub mod local_heap;
pub mod message_type;
pub mod object_header;
pub mod object_header_writer;
pub mod signature;
pub mod superblock;
pub mod symbol_table;

pub(crate) mod util;

pub use error::FormatError;
