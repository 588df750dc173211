//! Command handlers for pptb CLI
//!
//! Each subcommand has its own module. Handlers return the text destined for
//! stdout; status messages and failure summaries go to stderr.

pub mod configure;
pub mod diff;
pub mod dump;

use crate::config::Config;
use anyhow::{bail, Result};
use pptb::{ParameterSet, ProcessHelper};
use std::path::PathBuf;

/// Pick the PIB reader: the command-line value (or `PPTB_GETPIB`) wins over
/// the configured default
pub fn resolve_helper(getpib: Option<PathBuf>, config: &Config) -> Result<ProcessHelper> {
    let program = match getpib.or_else(|| config.getpib().map(PathBuf::from)) {
        Some(program) => program,
        None => bail!(
            "No PIB reader configured. Pass -g PATH, set PPTB_GETPIB, \
             or run: pptb configure --getpib PATH"
        ),
    };

    let helper = ProcessHelper::new(program).with_timeout(Some(config.helper_timeout()));
    tracing::info!(
        "Using PIB reader {} (timeout {:?})",
        helper.program().display(),
        config.helper_timeout()
    );
    Ok(helper)
}

/// Print every failed field of `set` to stderr, returning how many failed
pub fn report_failures(label: &str, set: &ParameterSet) -> usize {
    let mut count = 0;
    for value in set.failures() {
        if let Some(error) = &value.error {
            eprintln!("{}: {} ({:#06X}): {}", label, value.key(), value.descriptor.offset, error);
            count += 1;
        }
    }
    if count > 0 {
        eprintln!("{}: {} of {} fields could not be read", label, count, set.len());
    }
    count
}
