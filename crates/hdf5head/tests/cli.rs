//! Runs the `hdf5head` binary against snapshots written to a scratch dir.

use std::path::Path;

use assert_cmd::Command;
use gadgethdf5::{AttrValue, Block, SnapshotBuilder};
use gadgethdf5_format::file_writer::FileWriter;
use predicates::prelude::*;

fn hdf5head() -> Command {
    Command::cargo_bin("hdf5head").unwrap()
}

/// Header `{A: 1, B: [2, 3], NumPart_ThisFile: counts}` plus one block per
/// populated particle type.
fn write_snapshot(path: &Path, counts: [u64; 2]) {
    let mut snap = SnapshotBuilder::new(&counts);
    snap.set_header_attr("A", AttrValue::Int(1))
        .unwrap()
        .set_header_attr("B", AttrValue::IntArray(vec![2, 3]))
        .unwrap()
        .set_header_attr("NumPart_ThisFile", AttrValue::UIntArray(counts.to_vec()))
        .unwrap();
    for (part_type, &n) in counts.iter().enumerate() {
        if n > 0 {
            snap.write_block("Coordinates", part_type, 3, Block::Float(vec![0.0; 3 * n as usize]))
                .unwrap()
                .write_block("ParticleIDs", part_type, 1, Block::Int((0..n as i64).collect()))
                .unwrap();
        }
    }
    snap.write(path).unwrap();
}

#[test]
fn prints_bare_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap_000.hdf5");
    write_snapshot(&path, [2, 1]);
    hdf5head()
        .arg("-f")
        .arg(&path)
        .assert()
        .success()
        .stdout("1\n2 3\n2 1\n");
}

#[test]
fn verbose_labels_and_lists_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap_000.hdf5");
    write_snapshot(&path, [2, 1]);
    hdf5head()
        .arg("--verbose")
        .arg(format!("--file={}", path.display()))
        .assert()
        .success()
        .stdout(concat!(
            "A = 1\n",
            "B = [2 3]\n",
            "NumPart_ThisFile = [2 1]\n",
            "['Header', 'PartType0', 'PartType1']\n",
            "['Coordinates', 'ParticleIDs']\n",
            "['Coordinates', 'ParticleIDs']\n",
        ));
}

#[test]
fn empty_type_is_not_listed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap_000.hdf5");
    write_snapshot(&path, [0, 4]);
    hdf5head()
        .args(["-v", "-f"])
        .arg(&path)
        .assert()
        .success()
        .stdout(concat!(
            "A = 1\n",
            "B = [2 3]\n",
            "NumPart_ThisFile = [0 4]\n",
            "['Header', 'PartType1']\n",
            "['Coordinates', 'ParticleIDs']\n",
        ));
}

#[test]
fn falls_back_to_first_file_of_set() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("snap_007.0.hdf5");
    write_snapshot(&first, [1, 1]);

    let direct = hdf5head().args(["-v", "-f"]).arg(&first).output().unwrap();
    assert!(direct.status.success());
    hdf5head()
        .args(["-v", "-f"])
        .arg(dir.path().join("snap_007"))
        .assert()
        .success()
        .stdout(String::from_utf8(direct.stdout).unwrap());
}

#[test]
fn invalid_original_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("snap_007");
    std::fs::write(&base, "not a snapshot").unwrap();
    write_snapshot(&dir.path().join("snap_007.0.hdf5"), [1, 0]);
    hdf5head()
        .arg("-f")
        .arg(&base)
        .assert()
        .success()
        .stdout("1\n2 3\n1 0\n");
}

#[test]
fn neither_path_exists() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("snap_404");
    hdf5head()
        .arg("-f")
        .arg(&base)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(base.display().to_string()))
        .stderr(predicate::str::contains("snap_404.0.hdf5"));
    assert!(!base.exists());
}

#[test]
fn missing_file_flag_is_a_usage_error() {
    hdf5head()
        .arg("-v")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("--file"));
}

#[test]
fn stray_operands_do_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap_000.hdf5");
    write_snapshot(&path, [1, 1]);
    let plain = hdf5head().arg("-f").arg(&path).output().unwrap();
    assert!(plain.status.success());
    hdf5head()
        .arg("-f")
        .arg(&path)
        .arg("extra")
        .assert()
        .success()
        .stdout(String::from_utf8(plain.stdout).unwrap());
}

#[test]
fn missing_header_group_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.hdf5");
    let mut writer = FileWriter::new();
    writer.root().add_group("PartType0");
    std::fs::write(&path, writer.finish().unwrap()).unwrap();
    hdf5head()
        .arg("-f")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Header"));
}

