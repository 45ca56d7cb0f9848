//! Walks files produced by the writer through the public parsing API, the
//! way a reader opens a snapshot from scratch.

use gadgethdf5_format::attribute::{collect_attributes, Attribute};
use gadgethdf5_format::data_read::{decode_values, HeapContext, Values};
use gadgethdf5_format::dataspace::Dataspace;
use gadgethdf5_format::datatype::Datatype;
use gadgethdf5_format::file_writer::FileWriter;
use gadgethdf5_format::group::{group_children, is_group, resolve_path};
use gadgethdf5_format::object_header::ObjectHeader;
use gadgethdf5_format::signature::find_signature;
use gadgethdf5_format::superblock::Superblock;
use gadgethdf5_format::FormatError;

fn gadget_file() -> Vec<u8> {
    let mut w = FileWriter::new();
    let header = w.root().add_group("Header");
    header
        .set_attr(Attribute::new(
            "NumPart_ThisFile",
            Datatype::integer(4, false),
            Dataspace::simple(&[6]),
            [2u32, 1, 0, 0, 0, 0].iter().flat_map(|v| v.to_le_bytes()).collect(),
        ))
        .set_attr(Attribute::new(
            "Redshift",
            Datatype::float(8),
            Dataspace::simple(&[1]),
            0.0f64.to_le_bytes().to_vec(),
        ));
    for name in ["PartType1", "PartType0"] {
        w.root()
            .add_group(name)
            .add_dataset(
                "ParticleIDs",
                Datatype::integer(8, false),
                &[1],
                7u64.to_le_bytes().to_vec(),
            )
            .unwrap();
    }
    w.finish().unwrap()
}

#[test]
fn open_from_signature() {
    let data = gadget_file();
    let offset = find_signature(&data).expect("signature not found");
    assert_eq!(offset, 0);
    let sb = Superblock::parse(&data, offset).unwrap();
    assert_eq!(sb.version, 3);
    assert_eq!(sb.offset_size, 8);
    assert_eq!(sb.length_size, 8);
    assert_eq!(sb.base_address, 0);
    assert_eq!(sb.extension_address, None);

    let root = ObjectHeader::parse(&data, sb.root_group_address as usize, 8, 8).unwrap();
    assert!(is_group(&root));
    let names: Vec<String> = group_children(&data, &root, 8, 8)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Header", "PartType0", "PartType1"]);
}

#[test]
fn header_values_decode() {
    let data = gadget_file();
    let sb = Superblock::parse(&data, 0).unwrap();
    let addr = resolve_path(&data, sb.root_group_address, "/Header", 8, 8).unwrap();
    let header = ObjectHeader::parse(&data, addr as usize, 8, 8).unwrap();
    let attrs = collect_attributes(&data, &header, 8, 8).unwrap();
    let heap = HeapContext {
        file: &data,
        offset_size: 8,
        length_size: 8,
    };

    assert_eq!(attrs[0].name, "NumPart_ThisFile");
    assert_eq!(
        decode_values(&attrs[0].data, &attrs[0].datatype, heap).unwrap(),
        Values::UInt(vec![2, 1, 0, 0, 0, 0])
    );
    assert_eq!(attrs[1].name, "Redshift");
    assert_eq!(
        decode_values(&attrs[1].data, &attrs[1].datatype, heap).unwrap(),
        Values::Float(vec![0.0])
    );
}

#[test]
fn path_errors() {
    let data = gadget_file();
    let root = Superblock::parse(&data, 0).unwrap().root_group_address;
    assert_eq!(
        resolve_path(&data, root, "PartType2/Coordinates", 8, 8),
        Err(FormatError::PathNotFound("/PartType2".into()))
    );
    assert_eq!(
        resolve_path(&data, root, "PartType0/ParticleIDs/x", 8, 8),
        Err(FormatError::NotAGroup("/PartType0/ParticleIDs".into()))
    );
}

#[test]
fn corrupted_superblock_checksum() {
    let mut data = gadget_file();
    data[20] ^= 0xFF;
    assert!(matches!(
        Superblock::parse(&data, 0),
        Err(FormatError::ChecksumMismatch { .. })
    ));
}

#[test]
fn corrupted_object_header_checksum() {
    let mut data = gadget_file();
    let root = Superblock::parse(&data, 0).unwrap().root_group_address as usize;
    data[root + 8] ^= 0xFF;
    assert!(matches!(
        ObjectHeader::parse(&data, root, 8, 8),
        Err(FormatError::ChecksumMismatch { .. })
    ));
}
