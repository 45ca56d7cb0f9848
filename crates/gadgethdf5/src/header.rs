//! Typed view of the Gadget `Header` group.

use crate::error::{Error, Result};
use crate::reader::Group;
use crate::types::AttrValue;

/// Number of particle types in a Gadget snapshot.
pub const N_TYPE: usize = 6;

/// The standard Gadget header attributes.
///
/// Per-type arrays hold whatever length the file stores; Gadget writes
/// [`N_TYPE`] entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GadgetHeader {
    pub num_part_this_file: Vec<u64>,
    pub num_part_total: Vec<u64>,
    pub num_part_total_high_word: Option<Vec<u64>>,
    pub mass_table: Vec<f64>,
    pub time: f64,
    pub redshift: f64,
    pub box_size: f64,
    pub num_files_per_snapshot: i64,
    pub omega0: Option<f64>,
    pub omega_lambda: Option<f64>,
    pub hubble_param: Option<f64>,
    pub flag_sfr: Option<i64>,
    pub flag_cooling: Option<i64>,
    pub flag_stellar_age: Option<i64>,
    pub flag_metals: Option<i64>,
    pub flag_feedback: Option<i64>,
    pub flag_double_precision: Option<i64>,
    pub flag_ic_info: Option<i64>,
}

fn bad_shape(name: &str, reason: &str) -> Error {
    Error::BadAttributeShape {
        name: name.into(),
        reason: reason.into(),
    }
}

/// Attribute lookup that keeps the iteration order read once.
struct Attrs(Vec<(String, AttrValue)>);

impl Attrs {
    fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn require(&self, name: &str) -> Result<&AttrValue> {
        self.get(name).ok_or_else(|| Error::MissingAttribute(name.into()))
    }

    fn counts(&self, name: &str) -> Result<Vec<u64>> {
        self.require(name)?
            .as_u64_vec()
            .ok_or_else(|| bad_shape(name, "expected non-negative integers"))
    }

    fn float(&self, name: &str) -> Result<f64> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| bad_shape(name, "expected a single number"))
    }

    fn int(&self, name: &str) -> Result<i64> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| bad_shape(name, "expected a single integer"))
    }

    fn optional<T>(&self, name: &str, read: impl Fn(&Self, &str) -> Result<T>) -> Result<Option<T>> {
        match self.get(name) {
            Some(_) => read(self, name).map(Some),
            None => Ok(None),
        }
    }
}

impl GadgetHeader {
    /// Read the header attributes of `group` (normally `/Header`).
    ///
    /// Particle counts, mass table, time, redshift, box size and file count
    /// are required; the cosmology parameters and flags are optional.
    pub fn from_group(group: &Group<'_>) -> Result<GadgetHeader> {
        let attrs = Attrs(group.attrs()?);
        let mass_table = attrs
            .require("MassTable")?
            .as_f64_vec()
            .ok_or_else(|| bad_shape("MassTable", "expected numbers"))?;
        Ok(GadgetHeader {
            num_part_this_file: attrs.counts("NumPart_ThisFile")?,
            num_part_total: attrs.counts("NumPart_Total")?,
            num_part_total_high_word: attrs.optional("NumPart_Total_HighWord", Attrs::counts)?,
            mass_table,
            time: attrs.float("Time")?,
            redshift: attrs.float("Redshift")?,
            box_size: attrs.float("BoxSize")?,
            num_files_per_snapshot: attrs.int("NumFilesPerSnapshot")?,
            omega0: attrs.optional("Omega0", Attrs::float)?,
            omega_lambda: attrs.optional("OmegaLambda", Attrs::float)?,
            hubble_param: attrs.optional("HubbleParam", Attrs::float)?,
            flag_sfr: attrs.optional("Flag_Sfr", Attrs::int)?,
            flag_cooling: attrs.optional("Flag_Cooling", Attrs::int)?,
            flag_stellar_age: attrs.optional("Flag_StellarAge", Attrs::int)?,
            flag_metals: attrs.optional("Flag_Metals", Attrs::int)?,
            flag_feedback: attrs.optional("Flag_Feedback", Attrs::int)?,
            flag_double_precision: attrs.optional("Flag_DoublePrecision", Attrs::int)?,
            flag_ic_info: attrs.optional("Flag_IC_Info", Attrs::int)?,
        })
    }

    /// Attributes as Gadget's HDF5 writer stores them: unsigned counts,
    /// doubles and ints, every value a one-element or per-type array.
    pub fn to_attrs(&self) -> Vec<(&'static str, AttrValue)> {
        let one_f = |v: f64| AttrValue::FloatArray(vec![v]);
        let one_i = |v: i64| AttrValue::IntArray(vec![v]);
        let mut out = vec![
            ("NumPart_ThisFile", AttrValue::UIntArray(self.num_part_this_file.clone())),
            ("NumPart_Total", AttrValue::UIntArray(self.num_part_total.clone())),
        ];
        if let Some(hw) = &self.num_part_total_high_word {
            out.push(("NumPart_Total_HighWord", AttrValue::UIntArray(hw.clone())));
        }
        out.push(("MassTable", AttrValue::FloatArray(self.mass_table.clone())));
        out.push(("Time", one_f(self.time)));
        out.push(("Redshift", one_f(self.redshift)));
        out.push(("BoxSize", one_f(self.box_size)));
        out.push(("NumFilesPerSnapshot", one_i(self.num_files_per_snapshot)));
        let floats = [
            ("Omega0", self.omega0),
            ("OmegaLambda", self.omega_lambda),
            ("HubbleParam", self.hubble_param),
        ];
        out.extend(floats.into_iter().filter_map(|(n, v)| v.map(|v| (n, one_f(v)))));
        let flags = [
            ("Flag_Sfr", self.flag_sfr),
            ("Flag_Cooling", self.flag_cooling),
            ("Flag_StellarAge", self.flag_stellar_age),
            ("Flag_Metals", self.flag_metals),
            ("Flag_Feedback", self.flag_feedback),
            ("Flag_DoublePrecision", self.flag_double_precision),
            ("Flag_IC_Info", self.flag_ic_info),
        ];
        out.extend(flags.into_iter().filter_map(|(n, v)| v.map(|v| (n, one_i(v)))));
        out
    }

    /// Total particle count of each type across all files, combining the
    /// high words when present.
    pub fn total_particles(&self) -> Vec<u64> {
        self.num_part_total
            .iter()
            .enumerate()
            .map(|(i, &low)| {
                let high = self
                    .num_part_total_high_word
                    .as_ref()
                    .and_then(|hw| hw.get(i).copied())
                    .unwrap_or(0);
                (high << 32) | (low & 0xFFFF_FFFF)
            })
            .collect()
    }

    /// True when `other` can belong to the same snapshot set: every field
    /// that describes the whole set is identical. Per-file counts may differ.
    pub fn same_snapshot(&self, other: &GadgetHeader) -> bool {
        self.time == other.time
            && self.redshift == other.redshift
            && self.box_size == other.box_size
            && self.num_files_per_snapshot == other.num_files_per_snapshot
            && self.omega0 == other.omega0
            && self.omega_lambda == other.omega_lambda
            && self.hubble_param == other.hubble_param
            && self.flag_sfr == other.flag_sfr
            && self.flag_feedback == other.flag_feedback
            && self.flag_stellar_age == other.flag_stellar_age
            && self.flag_metals == other.flag_metals
            && self.mass_table == other.mass_table
            && self.total_particles() == other.total_particles()
    }
}

/// `NumPart_ThisFile` of a header group, without reading the rest.
pub fn num_part_this_file(group: &Group<'_>) -> Result<Vec<u64>> {
    let value = group.attr("NumPart_ThisFile")?;
    value
        .as_u64_vec()
        .ok_or_else(|| bad_shape("NumPart_ThisFile", "expected non-negative integers"))
}

/// Whether each particle type holds particles in this file, judged from
/// `NumPart_ThisFile` as plain numbers. Float or negative counts are
/// accepted; a count only populates its type when it is above zero.
pub fn populated_types(group: &Group<'_>) -> Result<Vec<bool>> {
    let value = group.attr("NumPart_ThisFile")?;
    let counts = value
        .as_f64_vec()
        .ok_or_else(|| bad_shape("NumPart_ThisFile", "expected numbers"))?;
    Ok(counts.into_iter().map(|n| n > 0.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::File;
    use gadgethdf5_format::file_writer::FileWriter;

    fn header() -> GadgetHeader {
        GadgetHeader {
            num_part_this_file: vec![8, 8, 0, 0, 0, 0],
            num_part_total: vec![16, 16, 0, 0, 0, 0],
            num_part_total_high_word: Some(vec![0, 1, 0, 0, 0, 0]),
            mass_table: vec![0.0, 0.5, 0.0, 0.0, 0.0, 0.0],
            time: 0.25,
            redshift: 3.0,
            box_size: 25000.0,
            num_files_per_snapshot: 2,
            omega0: Some(0.3),
            omega_lambda: Some(0.7),
            hubble_param: Some(0.7),
            flag_sfr: Some(1),
            flag_cooling: Some(1),
            ..GadgetHeader::default()
        }
    }

    fn file_with(attrs: &[(&str, AttrValue)]) -> File {
        let mut w = FileWriter::new();
        let g = w.root().add_group("Header");
        for (name, value) in attrs {
            g.set_attr(value.to_attribute(name).unwrap());
        }
        File::from_bytes(w.finish().unwrap()).unwrap()
    }

    #[test]
    fn reads_back_what_it_writes() {
        let h = header();
        let file = file_with(&h.to_attrs());
        let back = GadgetHeader::from_group(&file.group("Header").unwrap()).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn high_words_extend_totals() {
        assert_eq!(header().total_particles()[..2], [16u64, (1u64 << 32) + 16]);
    }

    #[test]
    fn missing_required_field() {
        let mut attrs = header().to_attrs();
        attrs.retain(|(n, _)| *n != "BoxSize");
        let file = file_with(&attrs);
        let err = GadgetHeader::from_group(&file.group("Header").unwrap()).unwrap_err();
        assert!(matches!(err, Error::MissingAttribute(n) if n == "BoxSize"));
    }

    #[test]
    fn wrong_shape_is_reported() {
        let file = file_with(&[("NumPart_ThisFile", AttrValue::Str("many".into()))]);
        let err = num_part_this_file(&file.group("Header").unwrap()).unwrap_err();
        assert!(matches!(err, Error::BadAttributeShape { name, .. } if name == "NumPart_ThisFile"));
    }

    #[test]
    fn populated_types_accept_any_number() {
        let file = file_with(&[("NumPart_ThisFile", AttrValue::IntArray(vec![-1, 3, 0]))]);
        let hdr = file.group("Header").unwrap();
        assert_eq!(populated_types(&hdr).unwrap(), [false, true, false]);
        assert!(num_part_this_file(&hdr).is_err());

        let file = file_with(&[("NumPart_ThisFile", AttrValue::FloatArray(vec![0.0, 2.0]))]);
        let hdr = file.group("Header").unwrap();
        assert_eq!(populated_types(&hdr).unwrap(), [false, true]);

        let file = file_with(&[("NumPart_ThisFile", AttrValue::Str("none".into()))]);
        let err = populated_types(&file.group("Header").unwrap()).unwrap_err();
        assert!(matches!(err, Error::BadAttributeShape { .. }));
    }

    #[test]
    fn standalone_counts() {
        let file = file_with(&[("NumPart_ThisFile", AttrValue::IntArray(vec![3, 0]))]);
        assert_eq!(num_part_this_file(&file.group("Header").unwrap()).unwrap(), [3, 0]);
    }

    #[test]
    fn per_file_counts_do_not_split_a_set() {
        let first = header();
        let mut second = header();
        second.num_part_this_file = vec![8, 7, 0, 0, 0, 0];
        assert!(first.same_snapshot(&second));
        second.redshift = 2.5;
        assert!(!first.same_snapshot(&second));
    }
}
