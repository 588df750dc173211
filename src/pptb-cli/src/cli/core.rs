//! Core CLI definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::diff::DiffCommand;
use super::dump::DumpCommand;

#[derive(Parser)]
#[command(name = "pptb")]
#[command(about = "PLC parameter toolbox: dump and compare PIB and GGL parameter files", long_about = None)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the parameters of a single file
    #[command(visible_alias = "d")]
    Dump {
        #[command(subcommand)]
        command: DumpCommand,
    },

    /// Compare the parameters of two files
    #[command(visible_alias = "x")]
    Diff {
        #[command(subcommand)]
        command: DiffCommand,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Set default PIB reader program
        #[arg(long)]
        getpib: Option<PathBuf>,

        /// Set per-field PIB reader timeout in seconds
        #[arg(long)]
        helper_timeout: Option<u64>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}
