//! This is the `gosim` app.
#![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]

use clap::{Parser, Subcommand};
use gosim::{aggregate, common, compare, score};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Semantic similarity of Gene Ontology annotations",
    long_about = "Gosim scores predicted Gene Ontology annotations against known ones using \
    the best-match average of Resnik similarities, and compares the scores of two tools"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of sub commands.
#[derive(Debug, Subcommand)]
enum Commands {
    Score(score::Args),
    Aggregate(aggregate::Args),
    Compare(compare::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Score(args) => {
                score::run(&cli.common, args)?;
            }
            Commands::Aggregate(args) => {
                aggregate::run(&cli.common, args)?;
            }
            Commands::Compare(args) => {
                compare::run(&cli.common, args)?;
            }
        }

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
