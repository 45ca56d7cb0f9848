//! Reading and writing Gadget-HDF5 simulation snapshots.
//!
//! Built on `gadgethdf5-format`. A snapshot is an HDF5 file with a `Header`
//! group of attributes and `PartTypeN` groups of per-particle datasets.
//!
//! # Reading
//!
//! ```no_run
//! use gadgethdf5::{resolve_snapshot_path, File, GadgetHeader};
//!
//! let path = resolve_snapshot_path("output/snap_005").unwrap();
//! let file = File::open(&path).unwrap();
//! let header = GadgetHeader::from_group(&file.group("Header").unwrap()).unwrap();
//! println!("z = {}, box = {}", header.redshift, header.box_size);
//! ```
//!
//! # Writing
//!
//! ```no_run
//! use gadgethdf5::{AttrValue, Block, SnapshotBuilder};
//!
//! let mut snap = SnapshotBuilder::new(&[2, 0, 0, 0, 0, 0]);
//! snap.set_header_attr("BoxSize", AttrValue::FloatArray(vec![100.0])).unwrap();
//! snap.write_block("Coordinates", 0, 3, Block::Float(vec![0.0; 6])).unwrap();
//! snap.write("snap_000.hdf5").unwrap();
//! ```
//!
//! # Multi-file sets
//!
//! ```no_run
//! use gadgethdf5::{SnapshotSet, Values};
//!
//! let set = SnapshotSet::open("output/snap_005").unwrap();
//! // every halo particle's position, gathered from all files
//! if let Values::Float(pos) = set.read_type_block("Coordinates", 1).unwrap() {
//!     println!("{} halo particles", pos.len() / 3);
//! }
//! ```

pub mod detect;
pub mod error;
pub mod header;
pub mod reader;
pub mod set;
pub mod snapshot;
pub mod types;
pub mod writer;

pub use detect::is_hdf5;
pub use error::{Error, Result};
pub use header::{num_part_this_file, populated_types, GadgetHeader, N_TYPE};
pub use gadgethdf5_format::data_read::Values;
pub use reader::{Dataset, File, Group};
pub use set::SnapshotSet;
pub use snapshot::{nth_file_of, resolve_snapshot_path};
pub use types::AttrValue;
pub use writer::{Block, SnapshotBuilder};
