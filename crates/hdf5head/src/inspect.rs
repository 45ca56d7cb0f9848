//! Resolve, open and print a snapshot header.

use std::io::Write;

use anyhow::{Context, Result};
use gadgethdf5::writer::part_type_group;
use gadgethdf5::{populated_types, resolve_snapshot_path, Error, File};
use tracing::debug;

use crate::Args;

/// Particle types whose keys are listed in verbose mode.
const LISTED_TYPES: usize = 2;

/// Run the inspector, writing everything it prints to `out`.
pub fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let path = resolve_snapshot_path(&args.file)?;
    debug!(path = %path.display(), verbose = args.verbose, "inspecting snapshot");
    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    print_header(&file, args.verbose, out)
}

/// Print every `Header` attribute, then in verbose mode the top-level names
/// and the keys of the first particle groups that hold particles.
pub fn print_header<W: Write>(file: &File, verbose: bool, out: &mut W) -> Result<()> {
    let header = file.group("Header").context("cannot read the snapshot header")?;
    for (name, value) in header.attrs()? {
        if verbose {
            writeln!(out, "{name} = {}", value.labelled())?;
        } else {
            writeln!(out, "{value}")?;
        }
    }
    if !verbose {
        return Ok(());
    }

    writeln!(out, "{}", py_list(&file.root().keys()?))?;
    let populated = populated_types(&header)?;
    if populated.len() < LISTED_TYPES {
        return Err(Error::BadAttributeShape {
            name: "NumPart_ThisFile".into(),
            reason: format!("expected at least {LISTED_TYPES} entries, found {}", populated.len()),
        }
        .into());
    }
    for (part_type, &present) in populated.iter().enumerate().take(LISTED_TYPES) {
        if present {
            let group = file.group(&part_type_group(part_type))?;
            writeln!(out, "{}", py_list(&group.keys()?))?;
        }
    }
    Ok(())
}

/// Render names the way Python prints a list of strings.
fn py_list(names: &[String]) -> String {
    let items: Vec<String> = names.iter().map(|n| py_str(n)).collect();
    format!("[{}]", items.join(", "))
}

fn py_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgethdf5::{AttrValue, SnapshotBuilder};

    fn render(file: &File, verbose: bool) -> Result<String> {
        let mut out = Vec::new();
        print_header(file, verbose, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn snapshot(num_part: &[u64], attrs: &[(&str, AttrValue)]) -> File {
        let mut b = SnapshotBuilder::new(num_part);
        for (name, value) in attrs {
            b.set_header_attr(name, value.clone()).unwrap();
        }
        File::from_bytes(b.finish().unwrap()).unwrap()
    }

    #[test]
    fn python_list_repr() {
        assert_eq!(py_list(&[]), "[]");
        assert_eq!(
            py_list(&["Header".into(), "PartType0".into()]),
            "['Header', 'PartType0']"
        );
        assert_eq!(py_str("it's"), "\"it's\"");
        assert_eq!(py_str("a'b\"c"), "'a\\'b\"c'");
        assert_eq!(py_str("tab\there"), "'tab\\there'");
    }

    #[test]
    fn plain_values() {
        let file = snapshot(
            &[],
            &[("A", AttrValue::Int(1)), ("B", AttrValue::IntArray(vec![2, 3]))],
        );
        assert_eq!(render(&file, false).unwrap(), "1\n2 3\n");
    }

    #[test]
    fn verbose_lists_populated_types() {
        let file = snapshot(
            &[0, 5],
            &[("NumPart_ThisFile", AttrValue::UIntArray(vec![0, 5]))],
        );
        assert_eq!(
            render(&file, true).unwrap(),
            "NumPart_ThisFile = [0 5]\n['Header', 'PartType1']\n[]\n"
        );
    }

    #[test]
    fn non_positive_counts_list_nothing() {
        let file = snapshot(
            &[],
            &[("NumPart_ThisFile", AttrValue::FloatArray(vec![-1.0, 0.0]))],
        );
        assert_eq!(
            render(&file, true).unwrap(),
            "NumPart_ThisFile = [-1.0 0.0]\n['Header']\n"
        );
    }

    #[test]
    fn verbose_needs_two_counts() {
        let file = snapshot(&[], &[("NumPart_ThisFile", AttrValue::UIntArray(vec![0]))]);
        let err = render(&file, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::BadAttributeShape { .. })
        ));
    }

    #[test]
    fn verbose_needs_counts() {
        let file = snapshot(&[], &[("BoxSize", AttrValue::Float(1.0))]);
        let err = render(&file, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingAttribute(n)) if n == "NumPart_ThisFile"
        ));
        // non-verbose never looks at the counts
        assert_eq!(render(&file, false).unwrap(), "1.0\n");
    }

    #[test]
    fn gated_group_must_exist() {
        // counts say PartType0 is populated but the file has no such group
        let file = snapshot(&[], &[("NumPart_ThisFile", AttrValue::UIntArray(vec![1, 0]))]);
        let err = render(&file, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingGroup(g)) if g == "PartType0"
        ));
    }
}
