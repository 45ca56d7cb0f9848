//! Core of the `hdf5head` inspector, kept apart from `main` so it can be
//! driven with any writer.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

pub mod inspect;

/// Print the header from a Gadget-HDF5 formatted snapshot.
#[derive(Parser, Debug, Clone)]
#[command(name = "hdf5head", version, about)]
pub struct Args {
    /// File to read
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: PathBuf,

    /// Label each quantity
    #[arg(short, long)]
    pub verbose: bool,

    /// Stray operands; accepted and ignored.
    #[arg(hide = true)]
    pub ignored: Vec<OsString>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stray_operands_are_ignored() {
        let args = Args::try_parse_from(["hdf5head", "-f", "snap", "extra", "more"]).unwrap();
        assert_eq!(args.file, PathBuf::from("snap"));
        assert_eq!(args.ignored, ["extra", "more"]);
        assert!(!args.verbose);
    }

    #[test]
    fn file_is_required() {
        let err = Args::try_parse_from(["hdf5head", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
