//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up pptb CLI defaults.

use crate::config::Config;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Handle the configure command
///
/// # Arguments
/// * `getpib` - Optional PIB reader program to set as default
/// * `helper_timeout` - Optional per-field reader timeout in seconds
/// * `show` - If true, show current configuration
pub fn handle(getpib: Option<PathBuf>, helper_timeout: Option<u64>, show: bool) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        print!("{}", describe(&config));
        if let Ok(path) = Config::config_path() {
            println!("Config file: {}", path.display());
        }
        return Ok(());
    }

    if getpib.is_none() && helper_timeout.is_none() {
        show_usage();
        return Ok(());
    }

    update(&mut config, getpib, helper_timeout)?;
    config.save()?;

    print!("{}", describe(&config));
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

/// Apply the given settings to `config`
fn update(config: &mut Config, getpib: Option<PathBuf>, helper_timeout: Option<u64>) -> Result<()> {
    if let Some(program) = getpib {
        if !program.is_file() {
            tracing::warn!("PIB reader {} does not exist (yet)", program.display());
        }
        config.getpib = Some(program);
    }

    if let Some(secs) = helper_timeout {
        if secs == 0 {
            bail!("Helper timeout must be at least one second");
        }
        config.helper_timeout_secs = Some(secs);
    }

    Ok(())
}

fn describe(config: &Config) -> String {
    let mut out = String::new();
    match config.getpib() {
        Some(program) => out.push_str(&format!("PIB reader: {}\n", program.display())),
        None => out.push_str("No PIB reader configured\n"),
    }
    out.push_str(&format!(
        "Helper timeout: {}s\n",
        config.helper_timeout().as_secs()
    ));
    out
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: pptb configure --getpib PATH [--helper-timeout SECS]");
    println!("   or: pptb configure --show");
    println!();
    println!("Note: PIB images are read through an external reader (getpib).");
    println!("      The configured path is used when -g is not given.");
}
