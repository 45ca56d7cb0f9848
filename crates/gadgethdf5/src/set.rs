//! Multi-file snapshot sets.
//!
//! A large snapshot is split over `NumFilesPerSnapshot` files named
//! `<base>.0.hdf5`, `<base>.1.hdf5`, ... Each file carries its own
//! `Header` with the set-wide totals and its own share of every block.
//! [`SnapshotSet`] opens them all and reads a block as one stream: files in
//! order, and within a file the particle types in order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use gadgethdf5_format::data_read::Values;
use gadgethdf5_format::error::FormatError;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::header::{GadgetHeader, N_TYPE};
use crate::reader::{File, Group};
use crate::snapshot::{nth_file_of, resolve_snapshot_path, set_base_of};
use crate::writer::part_type_group;

struct Member {
    path: PathBuf,
    file: File,
    header: GadgetHeader,
}

impl Member {
    fn open(path: PathBuf) -> Result<Member> {
        let file = File::open(&path)?;
        let header = GadgetHeader::from_group(&file.group("Header")?)?;
        Ok(Member { path, file, header })
    }

    /// Groups of the particle types present in this file, by type.
    fn part_groups(&self) -> Result<Vec<(usize, Group<'_>)>> {
        let mut groups = Vec::new();
        for part_type in 0..N_TYPE {
            match self.file.group(&part_type_group(part_type)) {
                Ok(g) => groups.push((part_type, g)),
                Err(Error::MissingGroup(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(groups)
    }
}

/// Every readable file of one snapshot.
pub struct SnapshotSet {
    members: Vec<Member>,
    files_expected: usize,
}

impl SnapshotSet {
    /// Open the set named by `path`: either a single snapshot file, the
    /// first file of a set, or the base name the set's files share.
    ///
    /// The first file must open. Later files that are missing, unreadable
    /// or whose header disagrees with the first are skipped with a warning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SnapshotSet> {
        let first_path = resolve_snapshot_path(path.as_ref())?;
        let first = Member::open(first_path.clone())?;
        let files_expected = usize::try_from(first.header.num_files_per_snapshot)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| Error::BadAttributeShape {
                name: "NumFilesPerSnapshot".into(),
                reason: format!(
                    "expected at least one file, found {}",
                    first.header.num_files_per_snapshot
                ),
            })?;
        let base = set_base_of(&first_path);
        debug!(path = %first_path.display(), files_expected, "opening snapshot set");

        let mut set = SnapshotSet {
            members: vec![first],
            files_expected,
        };
        if files_expected > 1 {
            match base {
                Some(base) => set.open_rest(&base),
                None => warn!(
                    path = %first_path.display(),
                    files_expected,
                    "file is not named <base>.0.hdf5; reading it alone"
                ),
            }
        }
        set.check_totals();
        Ok(set)
    }

    fn open_rest(&mut self, base: &Path) {
        for index in 1..self.files_expected {
            let path = nth_file_of(base, index);
            let member = match Member::open(path.clone()) {
                Ok(m) => m,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "could not open file {index} of {}",
                        self.files_expected
                    );
                    continue;
                }
            };
            if !member.header.same_snapshot(&self.members[0].header) {
                warn!(
                    path = %path.display(),
                    "header disagrees with file 0; ignoring file {index}"
                );
                continue;
            }
            self.members.push(member);
        }
    }

    fn check_totals(&self) {
        for part_type in 0..N_TYPE {
            let found: u64 = self
                .members
                .iter()
                .filter_map(|m| m.header.num_part_this_file.get(part_type))
                .sum();
            let expected = self.npart(part_type);
            if found != expected {
                warn!(part_type, expected, found, "particle count differs from header total");
            }
        }
    }

    /// Files actually read.
    pub fn num_files(&self) -> usize {
        self.members.len()
    }

    /// `NumFilesPerSnapshot` of the first file.
    pub fn files_expected(&self) -> usize {
        self.files_expected
    }

    /// Paths of the files read, in set order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.members.iter().map(|m| m.path.as_path())
    }

    /// Header of the first file.
    pub fn header(&self) -> &GadgetHeader {
        &self.members[0].header
    }

    /// Header of file `index` among those read.
    pub fn file_header(&self, index: usize) -> Option<&GadgetHeader> {
        self.members.get(index).map(|m| &m.header)
    }

    /// Particles of `part_type` in the whole snapshot, high word included.
    pub fn npart(&self, part_type: usize) -> u64 {
        self.header()
            .total_particles()
            .get(part_type)
            .copied()
            .unwrap_or(0)
    }

    /// Names of every block stored for any particle type in any file.
    pub fn blocks(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for member in &self.members {
            for (_, group) in member.part_groups()? {
                names.extend(group.datasets()?);
            }
        }
        Ok(names)
    }

    pub fn has_block(&self, name: &str) -> Result<bool> {
        Ok(self.blocks()?.contains(name))
    }

    /// Particles stored in block `name`, summed over types and files.
    pub fn block_particles(&self, name: &str) -> Result<u64> {
        let mut total = 0;
        for member in &self.members {
            for (_, group) in member.part_groups()? {
                match group.dataset(name) {
                    Ok(ds) => {
                        total = ds
                            .rows()?
                            .checked_add(total)
                            .ok_or(FormatError::SizeOverflow("particle count"))?
                    }
                    Err(Error::MissingDataset(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(total)
    }

    /// Read up to `npart_toread` particles of block `name`, after skipping
    /// the first `start_part` particles of the stream. Types whose bit is
    /// set in `skip_types` (bit `t` for `PartTypet`) are left out of the
    /// stream entirely.
    ///
    /// Values come back flattened, components of each particle together.
    /// Reading stops early, with a warning, when the set runs out.
    pub fn read_block(
        &self,
        name: &str,
        npart_toread: u64,
        start_part: u64,
        skip_types: u32,
    ) -> Result<Values> {
        if !self.has_block(name)? {
            return Err(Error::MissingDataset(name.into()));
        }
        let mut to_skip = start_part;
        let mut left = npart_toread;
        let mut out: Option<Values> = None;

        'files: for (index, member) in self.members.iter().enumerate() {
            for (part_type, group) in member.part_groups()? {
                if skip_types & (1 << part_type) != 0 {
                    continue;
                }
                let ds = match group.dataset(name) {
                    Ok(ds) => ds,
                    Err(Error::MissingDataset(_)) => continue,
                    Err(e) => return Err(e),
                };
                let rows = ds.rows()?;
                let start = to_skip.min(rows);
                let take = (rows - start).min(left);
                to_skip -= start;
                debug!(block = name, file = index, part_type, start, take, "reading");
                let values = ds.read_rows(start, take)?;
                left -= take;
                match out.as_mut() {
                    Some(all) => all.append(values)?,
                    None => out = Some(values),
                }
                if left == 0 {
                    break 'files;
                }
            }
        }
        if left > 0 && npart_toread != u64::MAX {
            warn!(block = name, wanted = npart_toread, short_by = left, "snapshot set ran out of particles");
        }
        out.ok_or_else(|| Error::MissingDataset(name.into()))
    }

    /// Every particle of one type in block `name`, across all files.
    pub fn read_type_block(&self, name: &str, part_type: usize) -> Result<Values> {
        let keep = u32::try_from(part_type)
            .ok()
            .and_then(|t| 1u32.checked_shl(t))
            .unwrap_or(0);
        self.read_block(name, u64::MAX, 0, !keep)
    }
}

impl std::fmt::Debug for SnapshotSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotSet")
            .field("paths", &self.paths().collect::<Vec<_>>())
            .field("files_expected", &self.files_expected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::first_file_of;
    use crate::writer::{Block, SnapshotBuilder};

    const TOTALS: [u64; 6] = [3, 3, 0, 0, 0, 0];

    fn header(this_file: [u64; 6]) -> GadgetHeader {
        GadgetHeader {
            num_part_this_file: this_file.to_vec(),
            num_part_total: TOTALS.to_vec(),
            num_part_total_high_word: Some(vec![0; 6]),
            mass_table: vec![0.0; 6],
            time: 0.5,
            redshift: 1.0,
            box_size: 10.0,
            num_files_per_snapshot: 2,
            ..GadgetHeader::default()
        }
    }

    /// Gas IDs 1..=3 and halo IDs 10..=12, split 2+1 and 1+2 over two files.
    fn write_member(path: &Path, hdr: &GadgetHeader, gas: &[i64], halo: &[i64]) {
        let mut b = SnapshotBuilder::from_header(hdr).unwrap();
        for (part_type, ids) in [(0, gas), (1, halo)] {
            let coords = ids.iter().flat_map(|&id| [id as f32, 0.5, -1.0]).collect();
            b.write_block("Coordinates", part_type, 3, Block::Float(coords))
                .unwrap()
                .write_block("ParticleIDs", part_type, 1, Block::Int(ids.to_vec()))
                .unwrap();
        }
        b.write(path).unwrap();
    }

    fn two_file_set(dir: &Path) -> PathBuf {
        let base = dir.join("snap_010");
        write_member(&nth_file_of(&base, 0), &header([2, 1, 0, 0, 0, 0]), &[1, 2], &[10]);
        write_member(&nth_file_of(&base, 1), &header([1, 2, 0, 0, 0, 0]), &[3], &[11, 12]);
        base
    }

    #[test]
    fn opens_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = two_file_set(dir.path());
        let set = SnapshotSet::open(&base).unwrap();
        assert_eq!((set.num_files(), set.files_expected()), (2, 2));
        assert_eq!(set.paths().next(), Some(first_file_of(&base).as_path()));
        assert_eq!(set.file_header(1).unwrap().num_part_this_file[1], 2);
        assert_eq!((set.npart(0), set.npart(1), set.npart(5)), (3, 3, 0));
        let blocks: Vec<_> = set.blocks().unwrap().into_iter().collect();
        assert_eq!(blocks, ["Coordinates", "ParticleIDs"]);
        assert!(!set.has_block("Masses").unwrap());
        assert_eq!(set.block_particles("ParticleIDs").unwrap(), 6);
    }

    #[test]
    fn opening_the_first_file_finds_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let base = two_file_set(dir.path());
        assert_eq!(SnapshotSet::open(first_file_of(&base)).unwrap().num_files(), 2);
    }

    #[test]
    fn whole_block_streams_files_then_types() {
        let dir = tempfile::tempdir().unwrap();
        let set = SnapshotSet::open(two_file_set(dir.path())).unwrap();
        assert_eq!(
            set.read_block("ParticleIDs", u64::MAX, 0, 0).unwrap(),
            Values::Int(vec![1, 2, 10, 3, 11, 12])
        );
    }

    #[test]
    fn start_and_count_cross_file_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let set = SnapshotSet::open(two_file_set(dir.path())).unwrap();
        assert_eq!(
            set.read_block("ParticleIDs", 3, 2, 0).unwrap(),
            Values::Int(vec![10, 3, 11])
        );
        assert_eq!(
            set.read_block("ParticleIDs", 1, 5, 0).unwrap(),
            Values::Int(vec![12])
        );
    }

    #[test]
    fn skipped_types_leave_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let set = SnapshotSet::open(two_file_set(dir.path())).unwrap();
        assert_eq!(
            set.read_block("ParticleIDs", 10, 1, 0b1).unwrap(),
            Values::Int(vec![11, 12])
        );
        assert_eq!(
            set.read_type_block("ParticleIDs", 0).unwrap(),
            Values::Int(vec![1, 2, 3])
        );
    }

    #[test]
    fn coordinates_keep_their_components() {
        let dir = tempfile::tempdir().unwrap();
        let set = SnapshotSet::open(two_file_set(dir.path())).unwrap();
        assert_eq!(
            set.read_type_block("Coordinates", 1).unwrap(),
            Values::Float(vec![
                10.0, 0.5, -1.0, //
                11.0, 0.5, -1.0, //
                12.0, 0.5, -1.0,
            ])
        );
    }

    #[test]
    fn empty_reads_keep_the_block_kind() {
        let dir = tempfile::tempdir().unwrap();
        let set = SnapshotSet::open(two_file_set(dir.path())).unwrap();
        assert_eq!(set.read_block("ParticleIDs", 0, 0, 0).unwrap(), Values::Int(vec![]));
        assert_eq!(set.read_block("Coordinates", 4, 100, 0).unwrap(), Values::Float(vec![]));
    }

    #[test]
    fn missing_block_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let set = SnapshotSet::open(two_file_set(dir.path())).unwrap();
        assert!(matches!(
            set.read_block("Masses", 1, 0, 0),
            Err(Error::MissingDataset(n)) if n == "Masses"
        ));
    }

    #[test]
    fn missing_member_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let base = two_file_set(dir.path());
        std::fs::remove_file(nth_file_of(&base, 1)).unwrap();
        let set = SnapshotSet::open(&base).unwrap();
        assert_eq!((set.num_files(), set.files_expected()), (1, 2));
        assert_eq!(
            set.read_type_block("ParticleIDs", 1).unwrap(),
            Values::Int(vec![10])
        );
    }

    #[test]
    fn inconsistent_member_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let base = two_file_set(dir.path());
        let mut other = header([1, 2, 0, 0, 0, 0]);
        other.redshift = 0.0;
        write_member(&nth_file_of(&base, 1), &other, &[3], &[11, 12]);
        assert_eq!(SnapshotSet::open(&base).unwrap().num_files(), 1);
    }

    #[test]
    fn single_file_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap_000.hdf5");
        let mut hdr = header([3, 3, 0, 0, 0, 0]);
        hdr.num_files_per_snapshot = 1;
        write_member(&path, &hdr, &[1, 2, 3], &[10, 11, 12]);
        let set = SnapshotSet::open(&path).unwrap();
        assert_eq!(set.num_files(), 1);
        assert_eq!(set.read_block("ParticleIDs", 2, 2, 0).unwrap(), Values::Int(vec![3, 10]));
    }

    #[test]
    fn zero_files_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap_000.hdf5");
        let mut hdr = header([3, 3, 0, 0, 0, 0]);
        hdr.num_files_per_snapshot = 0;
        write_member(&path, &hdr, &[1, 2, 3], &[10, 11, 12]);
        assert!(matches!(
            SnapshotSet::open(&path),
            Err(Error::BadAttributeShape { name, .. }) if name == "NumFilesPerSnapshot"
        ));
    }
}
