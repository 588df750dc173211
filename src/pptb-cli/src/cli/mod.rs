//! CLI argument definitions for pptb
//!
//! This module contains all clap-derived structs and enums for CLI parsing.

mod core;
mod diff;
mod dump;

pub use core::{Cli, Commands};
pub use diff::DiffCommand;
pub use dump::DumpCommand;

/// Parse a decimal or `0x`-prefixed hex number
pub fn parse_number(text: &str) -> Result<u64, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", text, e))
}
