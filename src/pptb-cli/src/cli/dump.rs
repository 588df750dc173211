//! Dump command CLI definitions

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum DumpCommand {
    /// Hex dump of any file
    Raw {
        /// File to dump
        #[arg(short, long)]
        file: PathBuf,

        /// Start offset (decimal or 0x-prefixed hex)
        #[arg(long, default_value = "0", value_parser = super::parse_number)]
        offset: u64,

        /// Number of bytes to dump (default: to end of file)
        #[arg(long, value_parser = super::parse_number)]
        length: Option<u64>,
    },

    /// Parameters of a PIB image, read through the PIB reader
    Pib {
        /// PIB image
        #[arg(short, long)]
        file: PathBuf,

        /// PIB reader program (uses configured default if not provided)
        #[arg(short, long, env = "PPTB_GETPIB")]
        getpib: Option<PathBuf>,

        /// XML layout
        #[arg(short, long)]
        layout: PathBuf,

        /// Print JSON instead of the aligned listing
        #[arg(short, long)]
        all: bool,
    },

    /// Parameters of a GGL archive or raw paramconfig image
    Ggl {
        /// GGL archive or paramconfig image
        #[arg(short, long)]
        file: PathBuf,

        /// CSV layout, required for a raw paramconfig image
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Print JSON instead of the aligned listing
        #[arg(short, long)]
        all: bool,
    },
}
