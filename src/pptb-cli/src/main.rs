mod cli;
mod commands;
mod config;
mod file_io;

use anyhow::Result;
use clap::Parser;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::*;

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Configure {
            getpib,
            helper_timeout,
            show,
        } => {
            commands::configure::handle(getpib, helper_timeout, show)?;
        }

        Commands::Dump { command } => match command {
            DumpCommand::Raw {
                file,
                offset,
                length,
            } => {
                print!("{}", commands::dump::raw(&file, offset, length)?);
            }

            DumpCommand::Pib {
                file,
                getpib,
                layout,
                all,
            } => {
                let helper = commands::resolve_helper(getpib, &Config::load()?)?;
                print!("{}", commands::dump::pib(&file, helper, &layout, all)?);
            }

            DumpCommand::Ggl { file, layout, all } => {
                print!("{}", commands::dump::ggl(&file, layout.as_deref(), all)?);
            }
        },

        Commands::Diff { command } => match command {
            DiffCommand::Pib {
                file,
                other,
                getpib,
                layout,
                output,
                brief,
            } => {
                let helper = commands::resolve_helper(getpib, &Config::load()?)?;
                print!(
                    "{}",
                    commands::diff::pib(&file, &other, helper, &layout, output.as_deref(), brief)?
                );
            }

            DiffCommand::Ggl {
                file,
                other,
                layout,
                other_layout,
                output,
                brief,
            } => {
                print!(
                    "{}",
                    commands::diff::ggl(
                        &file,
                        &other,
                        layout.as_deref(),
                        other_layout.as_deref(),
                        output.as_deref(),
                        brief,
                    )?
                );
            }
        },
    }

    Ok(())
}
