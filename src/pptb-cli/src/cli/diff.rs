//! Diff command CLI definitions

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum DiffCommand {
    /// Compare two PIB images sharing one layout
    Pib {
        /// First (old) PIB image
        #[arg(short, long)]
        file: PathBuf,

        /// Second (new) PIB image
        #[arg(short = 'F', long)]
        other: PathBuf,

        /// PIB reader program (uses configured default if not provided)
        #[arg(short, long, env = "PPTB_GETPIB")]
        getpib: Option<PathBuf>,

        /// XML layout
        #[arg(short, long)]
        layout: PathBuf,

        /// Write the differences as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only show changed 16-byte windows
        #[arg(short, long)]
        brief: bool,
    },

    /// Compare two GGL archives or raw paramconfig images
    Ggl {
        /// First (old) file
        #[arg(short, long)]
        file: PathBuf,

        /// Second (new) file
        #[arg(short = 'F', long)]
        other: PathBuf,

        /// CSV layout for the first file, if it is a raw image
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// CSV layout for the second file, if it is a raw image
        #[arg(short = 'L', long)]
        other_layout: Option<PathBuf>,

        /// Write the differences as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only show changed 16-byte windows
        #[arg(short, long)]
        brief: bool,
    },
}
